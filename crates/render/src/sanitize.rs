//! Allow-list sanitizer applied to raw status HTML before parsing.

use fedimark_core::ContentError;
use lol_html::{RewriteStrSettings, element, rewrite_str};

/// Elements federated servers are allowed to send.
const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "span", "a", "del", "s", "pre", "blockquote", "code", "b", "strong", "u", "i",
    "em", "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5", "ruby", "rt", "rp",
];

/// Elements removed together with their content.
const DROPPED_TAGS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template",
];

const ALLOWED_ATTRIBUTES: &[&str] = &["href", "rel", "target", "class", "title", "lang", "translate"];

const UNSAFE_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:"];

/// Rewrites `html` so only allow-listed elements and attributes remain.
///
/// Disallowed elements are unwrapped (their content is kept) except for the
/// dropped set, which disappears entirely.
pub fn sanitize(html: &str) -> Result<String, ContentError> {
    if !html.contains('<') {
        return Ok(html.to_string());
    }

    let element_content_handlers = vec![element!("*", |el| {
        let tag = el.tag_name();
        if DROPPED_TAGS.contains(&tag.as_str()) {
            el.remove();
            return Ok(());
        }
        if !ALLOWED_TAGS.contains(&tag.as_str()) {
            el.remove_and_keep_content();
            return Ok(());
        }

        let names: Vec<String> = el.attributes().iter().map(|a| a.name()).collect();
        for name in names {
            if !ALLOWED_ATTRIBUTES.contains(&name.as_str()) {
                el.remove_attribute(&name);
            }
        }
        if let Some(href) = el.get_attribute("href")
            && is_unsafe_href(&href)
        {
            el.remove_attribute("href");
        }
        Ok(())
    })];

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers,
            ..RewriteStrSettings::new()
        },
    )
    .map_err(|err| ContentError::rewrite(err.to_string()))
}

fn is_unsafe_href(href: &str) -> bool {
    let normalized: String = href
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    UNSAFE_SCHEMES.iter().any(|scheme| normalized.starts_with(scheme))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(sanitize("Daniel Roe :nuxt:").unwrap(), "Daniel Roe :nuxt:");
    }

    #[test]
    fn mention_markup_passes_through() {
        let input = r#"<p><span class="h-card"><a href="https://mas.to/@vitest" class="u-url mention" rel="nofollow noopener noreferrer" target="_blank">@<span>vitest</span></a></span></p>"#;
        assert_eq!(sanitize(input).unwrap(), input);
    }

    #[test]
    fn escaped_markup_in_text_is_preserved() {
        let input = "<p>```html<br>&lt;span class=\"x\"&gt;&lt;/span&gt;<br>```</p>";
        assert_eq!(sanitize(input).unwrap(), input);
    }

    #[test]
    fn scripts_are_dropped_with_content() {
        let out = sanitize("<p>hi<script>alert(1)</script></p>").unwrap();
        assert_eq!(out, "<p>hi</p>");
    }

    #[test]
    fn unknown_elements_are_unwrapped() {
        let out = sanitize("<div><p>a<img src=\"x.png\">b</p></div>").unwrap();
        assert_eq!(out, "<p>ab</p>");
    }

    #[test]
    fn disallowed_attributes_are_stripped() {
        let out = sanitize(r#"<p onclick="steal()" class="c">t</p>"#).unwrap();
        assert!(!out.contains("onclick"));
        assert!(out.contains("class=\"c\""));
    }

    #[test]
    fn javascript_links_lose_href() {
        let out = sanitize(r#"<a href=" JavaScript:alert(1)">x</a>"#).unwrap();
        assert!(!out.contains("href"));
        assert!(out.contains(">x</a>"));
    }
}
