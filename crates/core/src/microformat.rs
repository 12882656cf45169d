//! Recognizers for the microformat class conventions of federated content.
//!
//! Mastodon-compatible servers mark a linked account as
//! `<span class="h-card"><a class="u-url mention" href="…">@<span>name</span></a></span>`
//! and a hashtag as `<a class="mention hashtag" href="…/tags/name">#<span>name</span></a>`.
//! These predicates work on parsed attributes so callers never sniff raw markup.

use crate::tokenize::{Attribute, attr};

/// Class marking a person/account card.
pub const H_CARD: &str = "h-card";
/// Class marking the canonical URL of a card.
pub const U_URL: &str = "u-url";
/// Class marking a mention anchor.
pub const MENTION: &str = "mention";
/// Class marking a hashtag anchor.
pub const HASHTAG: &str = "hashtag";

/// Semantic role of an anchor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    /// Links to an account (`mention`, usually with `u-url`).
    Mention,
    /// Links to a hashtag timeline.
    Hashtag,
    /// Any other link.
    Plain,
}

/// Returns true if the `class` attribute contains `token` as a whole word.
pub fn has_class(attributes: &[Attribute], token: &str) -> bool {
    attr(attributes, "class")
        .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == token))
}

/// Returns true for an element carrying the `h-card` marker.
pub fn is_h_card(attributes: &[Attribute]) -> bool {
    has_class(attributes, H_CARD)
}

/// Classifies an anchor by its classes and href.
pub fn link_role(attributes: &[Attribute]) -> LinkRole {
    let href = attr(attributes, "href");
    if has_class(attributes, HASHTAG)
        || (has_class(attributes, MENTION) && href.and_then(parse_tag_url).is_some())
    {
        return LinkRole::Hashtag;
    }
    if has_class(attributes, MENTION) {
        return LinkRole::Mention;
    }
    LinkRole::Plain
}

/// Account location extracted from a profile URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileUrl<'a> {
    /// Server host (`mas.to`).
    pub host: &'a str,
    /// Local username without `@`.
    pub username: &'a str,
}

impl ProfileUrl<'_> {
    /// Full `user@host` account address.
    pub fn acct(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }
}

/// Hashtag location extracted from a tag URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagUrl<'a> {
    /// Server host.
    pub host: &'a str,
    /// Tag name without `#`.
    pub name: &'a str,
}

/// Parses `https://host/@user` and the common variants (`/users/x`, `/u/x`, `/c/x`).
///
/// ```
/// use fedimark_core::microformat::parse_profile_url;
///
/// let profile = parse_profile_url("https://mas.to/@vitest").unwrap();
/// assert_eq!(profile.acct(), "vitest@mas.to");
///
/// let group = parse_profile_url("https://lemmy.ml/c/pilipinas").unwrap();
/// assert_eq!(group.username, "pilipinas");
/// ```
pub fn parse_profile_url(href: &str) -> Option<ProfileUrl<'_>> {
    let (host, path) = split_url(href)?;
    let path = path.trim_end_matches('/');

    let username = if let Some(name) = path.strip_prefix('@') {
        name
    } else {
        let (prefix, name) = path.split_once('/')?;
        if !matches!(prefix, "users" | "u" | "c" | "profile") {
            return None;
        }
        name
    };

    if username.is_empty() || username.contains('/') {
        return None;
    }
    Some(ProfileUrl { host, username })
}

/// Parses `https://host/tags/name`.
pub fn parse_tag_url(href: &str) -> Option<TagUrl<'_>> {
    let (host, path) = split_url(href)?;
    let name = path.trim_end_matches('/').strip_prefix("tags/")?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    Some(TagUrl { host, name })
}

/// Splits an absolute http(s) URL into host and path (without leading `/`, query or fragment).
fn split_url(href: &str) -> Option<(&str, &str)> {
    let rest = href
        .strip_prefix("https://")
        .or_else(|| href.strip_prefix("http://"))?;
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
    if host.is_empty() {
        return None;
    }
    Some((host, path))
}
