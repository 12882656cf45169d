#![deny(missing_docs)]
//! fedimark core: markup token stream, code span detection, microformat
//! recognizers and emoji shortcodes for federated status content.

/// Code fence and inline code detection over tokens.
pub mod code_fence;
/// Core error and diagnostic types.
pub mod error;
/// Microformat (`h-card`, `u-url mention`, `hashtag`) recognizers.
pub mod microformat;
/// Custom emoji shortcode segmentation.
pub mod shortcode;
/// HTML subset token stream and character-reference decoding.
pub mod tokenize;

pub use code_fence::{CodeOptions, collapse_code, collapse_fences, collapse_inline_code};
pub use error::{ContentError, ContentWarning, Diagnostics, SourceLocation};
pub use microformat::{LinkRole, ProfileUrl, TagUrl, link_role, parse_profile_url, parse_tag_url};
pub use shortcode::{Segment, split_shortcodes};
pub use tokenize::{Attribute, Tag, Token, TokenKind, decode_text, tokenize};
