//! Transformation options.

use fedimark_core::CodeOptions;
use serde::{Deserialize, Serialize};

/// Options for the content transformer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOptions {
    /// Whether to run the allow-list sanitizer before parsing.
    #[serde(default = "default_true")]
    pub enable_sanitize: bool,
    /// Whether to collapse triple-backtick fences into code blocks.
    #[serde(default = "default_true")]
    pub enable_code_blocks: bool,
    /// Whether to collapse single-backtick spans into inline code.
    #[serde(default = "default_true")]
    pub enable_inline_code: bool,
    /// Whether to substitute `:shortcode:` tokens with emoji nodes.
    #[serde(default = "default_true")]
    pub enable_emoji: bool,
    /// Whether hashtag anchors become hashtag nodes.
    #[serde(default = "default_true")]
    pub enable_hashtags: bool,
    /// Server the viewer browses from; prefixes in-app routes when set
    /// (`/mas.to/@user` instead of `/@user`).
    #[serde(default)]
    pub home_server: Option<String>,
}

fn default_true() -> bool {
    true
}

impl TransformOptions {
    /// Code pass selection for the core tokenizer passes.
    pub fn code_options(&self) -> CodeOptions {
        CodeOptions {
            fences: self.enable_code_blocks,
            inline: self.enable_inline_code,
        }
    }

    /// In-app route for an account address.
    pub fn account_route(&self, acct: &str) -> String {
        match &self.home_server {
            Some(server) => format!("/{}/@{}", server, acct),
            None => format!("/@{}", acct),
        }
    }

    /// In-app route for a hashtag.
    pub fn tag_route(&self, name: &str) -> String {
        match &self.home_server {
            Some(server) => format!("/{}/tags/{}", server, name),
            None => format!("/tags/{}", name),
        }
    }
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            enable_sanitize: true,
            enable_code_blocks: true,
            enable_inline_code: true,
            enable_emoji: true,
            enable_hashtags: true,
            home_server: None,
        }
    }
}
