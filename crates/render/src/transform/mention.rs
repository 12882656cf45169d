//! Mention and hashtag anchor recognition.

use crate::node::RenderNode;
use crate::options::TransformOptions;
use crate::tables::{MentionAccount, MentionResolver};
use fedimark_core::microformat::{
    LinkRole, ProfileUrl, is_h_card, link_role, parse_profile_url, parse_tag_url,
};
use fedimark_core::tokenize::{Attribute, attr};
use fedimark_core::{ContentWarning, Diagnostics};

/// Replaces recognized anchors with link nodes, in place.
///
/// A `mention` anchor becomes a [`RenderNode::MentionLink`] only when its
/// parent carries `h-card`; hashtag anchors are recognized anywhere when
/// hashtags are enabled.
pub fn recognize_links(
    nodes: &mut [RenderNode],
    options: &TransformOptions,
    mentions: Option<&dyn MentionResolver>,
    diagnostics: &mut Diagnostics,
) {
    rewrite(nodes, false, options, mentions, diagnostics);
}

fn rewrite(
    nodes: &mut [RenderNode],
    in_card: bool,
    options: &TransformOptions,
    mentions: Option<&dyn MentionResolver>,
    diagnostics: &mut Diagnostics,
) {
    for node in nodes.iter_mut() {
        let RenderNode::Element {
            tag,
            attributes,
            children,
        } = node
        else {
            continue;
        };

        let replacement = if tag.as_str() == "a" {
            match link_role(attributes) {
                LinkRole::Mention if in_card => Some(mention_link(
                    attributes,
                    children,
                    options,
                    mentions,
                    diagnostics,
                )),
                LinkRole::Hashtag if options.enable_hashtags => {
                    hashtag_link(attributes, children, options)
                }
                _ => None,
            }
        } else {
            None
        };

        match replacement {
            Some(link) => *node = link,
            None => {
                let card = is_h_card(attributes);
                rewrite(children, card, options, mentions, diagnostics);
            }
        }
    }
}

fn mention_link(
    attributes: &[Attribute],
    children: &[RenderNode],
    options: &TransformOptions,
    mentions: Option<&dyn MentionResolver>,
    diagnostics: &mut Diagnostics,
) -> RenderNode {
    let href = attr(attributes, "href").unwrap_or_default();
    let visible = visible_text(children);
    let visible = visible
        .trim()
        .trim_start_matches('@')
        .split('@')
        .next()
        .unwrap_or_default()
        .to_string();

    let (account, handle) = match mentions.and_then(|m| m.resolve_mention(href)) {
        Some(account) => {
            let handle = [visible.as_str(), account.username.as_str()]
                .into_iter()
                .find(|h| !h.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| fallback_handle(href));
            (account, handle)
        }
        None => {
            let account = stub_account(href, &visible);
            let handle = account.username.clone();
            log::debug!("unresolved mention {} rendered as @{}", href, handle);
            diagnostics.add_warning(ContentWarning::UnresolvedMention {
                href: href.to_string(),
                handle: handle.clone(),
            });
            (account, handle)
        }
    };

    let acct = if account.acct.is_empty() {
        &account.username
    } else {
        &account.acct
    };
    RenderNode::MentionLink {
        href: options.account_route(acct),
        account,
        handle,
    }
}

/// Account synthesized from the anchor when no table entry matches.
fn stub_account(href: &str, visible: &str) -> MentionAccount {
    let profile = parse_profile_url(href);
    let username = if !visible.is_empty() {
        visible.to_string()
    } else if let Some(profile) = profile {
        profile.username.to_string()
    } else {
        fallback_handle(href)
    };
    let acct = match profile {
        Some(profile) => ProfileUrl {
            username: &username,
            ..profile
        }
        .acct(),
        None => username.clone(),
    };
    MentionAccount {
        id: String::new(),
        username,
        url: href.to_string(),
        acct,
    }
}

/// Last path segment of the URL, or `unknown`.
fn fallback_handle(href: &str) -> String {
    href.split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(|segment| segment.trim_start_matches('@'))
        .filter(|segment| !segment.is_empty() && !segment.ends_with(':'))
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

fn hashtag_link(
    attributes: &[Attribute],
    children: &[RenderNode],
    options: &TransformOptions,
) -> Option<RenderNode> {
    let name = match attr(attributes, "href").and_then(parse_tag_url) {
        Some(tag) => tag.name.to_string(),
        None => visible_text(children).trim().trim_start_matches('#').to_string(),
    };
    if name.is_empty() {
        return None;
    }
    Some(RenderNode::HashtagLink {
        href: options.tag_route(&name),
        name,
    })
}

fn visible_text(nodes: &[RenderNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.walk(&mut |n| {
            if let RenderNode::Text { value } = n {
                out.push_str(value);
            }
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::MentionTable;

    fn anchor(href: &str, class: &str, children: Vec<RenderNode>) -> RenderNode {
        RenderNode::element(
            "a",
            vec![Attribute::new("href", href), Attribute::new("class", class)],
            children,
        )
    }

    fn card(inner: RenderNode) -> Vec<RenderNode> {
        vec![RenderNode::element(
            "span",
            vec![Attribute::new("class", "h-card")],
            vec![inner],
        )]
    }

    fn handle_span(name: &str) -> Vec<RenderNode> {
        vec![
            RenderNode::text("@"),
            RenderNode::element("span", vec![], vec![RenderNode::text(name)]),
        ]
    }

    #[test]
    fn unresolved_mention_gets_a_stub() {
        let mut nodes = card(anchor(
            "https://mas.to/@vitest",
            "u-url mention",
            handle_span("vitest"),
        ));
        let mut diagnostics = Diagnostics::new();
        recognize_links(&mut nodes, &TransformOptions::default(), None, &mut diagnostics);

        let RenderNode::MentionLink {
            account,
            href,
            handle,
        } = &nodes[0].children()[0]
        else {
            panic!("expected mention link, got {:?}", nodes[0]);
        };
        assert_eq!(handle, "vitest");
        assert_eq!(href, "/@vitest@mas.to");
        assert_eq!(account.acct, "vitest@mas.to");
        assert_eq!(account.id, "");
        assert_eq!(diagnostics.count(), 1);
    }

    #[test]
    fn table_match_wins() {
        let table = MentionTable::new(vec![MentionAccount {
            id: "42".into(),
            username: "pilipinas".into(),
            url: "https://lemmy.ml/c/pilipinas".into(),
            acct: "pilipinas@lemmy.ml".into(),
        }]);
        let mut nodes = card(anchor(
            "https://lemmy.ml/c/pilipinas",
            "u-url mention",
            handle_span("pilipinas"),
        ));
        let mut diagnostics = Diagnostics::new();
        recognize_links(
            &mut nodes,
            &TransformOptions::default(),
            Some(&table as &dyn MentionResolver),
            &mut diagnostics,
        );

        match &nodes[0].children()[0] {
            RenderNode::MentionLink { account, href, .. } => {
                assert_eq!(account.id, "42");
                assert_eq!(href, "/@pilipinas@lemmy.ml");
            }
            other => panic!("expected mention link, got {:?}", other),
        }
        assert!(!diagnostics.has_warnings());
    }

    #[test]
    fn empty_handle_falls_back_to_url() {
        let mut nodes = card(anchor("https://example.org/people/zed", "u-url mention", vec![]));
        let mut diagnostics = Diagnostics::new();
        recognize_links(&mut nodes, &TransformOptions::default(), None, &mut diagnostics);
        match &nodes[0].children()[0] {
            RenderNode::MentionLink { handle, href, .. } => {
                assert_eq!(handle, "zed");
                assert_eq!(href, "/@zed");
            }
            other => panic!("expected mention link, got {:?}", other),
        }
    }

    #[test]
    fn mention_outside_card_stays_an_anchor() {
        let mut nodes = vec![anchor(
            "https://mas.to/@vitest",
            "u-url mention",
            handle_span("vitest"),
        )];
        let mut diagnostics = Diagnostics::new();
        recognize_links(&mut nodes, &TransformOptions::default(), None, &mut diagnostics);
        assert!(nodes[0].is_element("a"));
    }

    #[test]
    fn hashtags_are_recognized() {
        let mut nodes = vec![RenderNode::element(
            "p",
            vec![],
            vec![anchor(
                "https://mas.to/tags/rust",
                "mention hashtag",
                vec![
                    RenderNode::text("#"),
                    RenderNode::element("span", vec![], vec![RenderNode::text("rust")]),
                ],
            )],
        )];
        let options = TransformOptions {
            home_server: Some("mas.to".into()),
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::new();
        recognize_links(&mut nodes, &options, None, &mut diagnostics);
        assert_eq!(
            nodes[0].children()[0],
            RenderNode::HashtagLink {
                name: "rust".into(),
                href: "/mas.to/tags/rust".into()
            }
        );
    }

    #[test]
    fn hashtags_can_be_disabled() {
        let mut nodes = vec![anchor("https://mas.to/tags/rust", "mention hashtag", vec![])];
        let options = TransformOptions {
            enable_hashtags: false,
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::new();
        recognize_links(&mut nodes, &options, None, &mut diagnostics);
        assert!(nodes[0].is_element("a"));
    }
}
