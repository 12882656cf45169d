//! Mention and emoji side tables, and the resolver traits the transformer consults.
//!
//! The transformer never looks anything up globally: callers hand it resolvers
//! through [`crate::TransformContext`]. The tables below are the usual
//! implementations; closures work too, which keeps test doubles trivial.

use fedimark_core::ContentError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An account referenced by a status (`StatusMention` in the federated API).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MentionAccount {
    /// Account id on the home server (empty for synthesized stubs).
    #[serde(default)]
    pub id: String,
    /// Local username.
    pub username: String,
    /// Canonical profile URL.
    pub url: String,
    /// `user@host` address (or bare `user` for local accounts).
    pub acct: String,
}

/// A custom emoji definition (`CustomEmoji` in the federated API).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEmoji {
    /// Shortcode without colons.
    pub shortcode: String,
    /// Animated image URL.
    pub url: String,
    /// Static image URL.
    pub static_url: String,
    /// Whether the emoji is offered in the picker.
    #[serde(default)]
    pub visible_in_picker: bool,
    /// Picker category, when the server groups emoji.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Resolves a mention anchor's href to an account.
pub trait MentionResolver: Send + Sync {
    /// Returns the account whose profile URL is `href`.
    fn resolve_mention(&self, href: &str) -> Option<MentionAccount>;
}

impl<F> MentionResolver for F
where
    F: Fn(&str) -> Option<MentionAccount> + Send + Sync,
{
    fn resolve_mention(&self, href: &str) -> Option<MentionAccount> {
        (self)(href)
    }
}

/// Resolves a shortcode to a custom emoji.
pub trait EmojiResolver: Send + Sync {
    /// Returns the emoji registered under `shortcode`.
    fn resolve_emoji(&self, shortcode: &str) -> Option<CustomEmoji>;
}

impl<F> EmojiResolver for F
where
    F: Fn(&str) -> Option<CustomEmoji> + Send + Sync,
{
    fn resolve_emoji(&self, shortcode: &str) -> Option<CustomEmoji> {
        (self)(shortcode)
    }
}

/// Ordered mentions of a status, looked up by profile URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MentionTable {
    mentions: Vec<MentionAccount>,
}

impl MentionTable {
    /// Creates a table from mentions in status order.
    pub fn new(mentions: Vec<MentionAccount>) -> Self {
        Self { mentions }
    }

    /// Parses the `mentions` array of a status JSON payload.
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Finds the first mention whose URL equals `url`.
    pub fn find_by_url(&self, url: &str) -> Option<&MentionAccount> {
        self.mentions.iter().find(|m| m.url == url)
    }

    /// Mentions in status order.
    pub fn iter(&self) -> impl Iterator<Item = &MentionAccount> {
        self.mentions.iter()
    }

    /// Number of mentions.
    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }
}

impl MentionResolver for MentionTable {
    fn resolve_mention(&self, href: &str) -> Option<MentionAccount> {
        self.find_by_url(href).cloned()
    }
}

/// Custom emoji keyed by shortcode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmojiTable {
    emojis: HashMap<String, CustomEmoji>,
}

impl EmojiTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from a list of definitions; later duplicates win.
    pub fn from_list(emojis: impl IntoIterator<Item = CustomEmoji>) -> Self {
        let emojis = emojis
            .into_iter()
            .map(|e| (e.shortcode.clone(), e))
            .collect();
        Self { emojis }
    }

    /// Parses either a JSON array of emoji or an object keyed by shortcode.
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Payload {
            List(Vec<CustomEmoji>),
            Map(HashMap<String, CustomEmoji>),
        }

        Ok(match serde_json::from_str(json)? {
            Payload::List(list) => Self::from_list(list),
            Payload::Map(emojis) => Self { emojis },
        })
    }

    /// Adds or replaces a definition under `shortcode`.
    pub fn insert(&mut self, shortcode: impl Into<String>, emoji: CustomEmoji) {
        self.emojis.insert(shortcode.into(), emoji);
    }

    /// Looks up a shortcode.
    pub fn get(&self, shortcode: &str) -> Option<&CustomEmoji> {
        self.emojis.get(shortcode)
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.emojis.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.emojis.is_empty()
    }
}

impl EmojiResolver for EmojiTable {
    fn resolve_emoji(&self, shortcode: &str) -> Option<CustomEmoji> {
        self.get(shortcode).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUXT_JSON: &str = r#"{
        "nuxt": {
            "shortcode": "nuxt",
            "url": "https://media.mas.to/original/nuxt.png",
            "staticUrl": "https://media.mas.to/static/nuxt.png",
            "visibleInPicker": true
        }
    }"#;

    #[test]
    fn emoji_table_from_keyed_object() {
        let table = EmojiTable::from_json(NUXT_JSON).unwrap();
        let nuxt = table.get("nuxt").unwrap();
        assert_eq!(nuxt.static_url, "https://media.mas.to/static/nuxt.png");
        assert!(nuxt.visible_in_picker);
        assert_eq!(nuxt.category, None);
    }

    #[test]
    fn emoji_table_from_list() {
        let json = r#"[{"shortcode":"blobcat","url":"u","staticUrl":"s","visibleInPicker":false,"category":"blobs"}]"#;
        let table = EmojiTable::from_json(json).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.resolve_emoji("blobcat").and_then(|e| e.category),
            Some("blobs".to_string())
        );
        assert_eq!(table.resolve_emoji("nuxt"), None);
    }

    #[test]
    fn emoji_table_rejects_garbage() {
        assert!(EmojiTable::from_json("[1, 2]").is_err());
    }

    #[test]
    fn mention_table_lookup_by_url() {
        let table = MentionTable::from_json(
            r#"[{"id":"","username":"pilipinas","url":"https://lemmy.ml/c/pilipinas","acct":"pilipinas@lemmy.ml"}]"#,
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        let account = table.resolve_mention("https://lemmy.ml/c/pilipinas").unwrap();
        assert_eq!(account.acct, "pilipinas@lemmy.ml");
        assert!(table.resolve_mention("https://lemmy.ml/c/other").is_none());
    }

    #[test]
    fn closures_are_resolvers() {
        let fake = |href: &str| {
            (href == "https://example.social/@me").then(|| MentionAccount {
                username: "me".into(),
                url: href.into(),
                acct: "me".into(),
                ..Default::default()
            })
        };
        let resolver: &dyn MentionResolver = &fake;
        assert_eq!(
            resolver
                .resolve_mention("https://example.social/@me")
                .map(|a| a.username),
            Some("me".to_string())
        );
    }
}
