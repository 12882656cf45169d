#![deny(missing_docs)]
//! fedimark render: turns federated status HTML into a typed render tree.
//!
//! ```
//! use fedimark_render::{EmojiTable, TransformContext, to_html, transform};
//!
//! let emojis = EmojiTable::new();
//! let context = TransformContext::new().with_emojis(&emojis);
//! let nodes = transform("<p>Inline `code`</p>", &context);
//! assert_eq!(to_html(&nodes), "<p>Inline <code>code</code></p>");
//! ```

/// Parallel batch transformation.
pub mod batch;
/// HTML and plain-text serializers.
pub mod html;
/// Render tree node types.
pub mod node;
/// Transformation options.
pub mod options;
/// The transformation pipeline and its entry points.
pub mod pipeline;
/// Allow-list sanitizer.
pub mod sanitize;
/// Mention and emoji side tables.
pub mod tables;
/// Tree rewriting stages.
pub mod transform;
/// Structural tree builder.
pub mod tree;

pub use batch::{BatchInput, BatchOptions, BatchOutput, BatchResult, BatchStats, transform_batch};
pub use fedimark_core::{Attribute, ContentError, ContentWarning, Diagnostics};
pub use html::{plain_text, to_html};
pub use node::{RenderNode, count_nodes};
pub use options::TransformOptions;
pub use pipeline::{
    ContentPipeline, TransformContext, TransformOutput, is_degraded, transform,
    transform_with_diagnostics, transform_with_options,
};
pub use sanitize::sanitize;
pub use tables::{CustomEmoji, EmojiResolver, EmojiTable, MentionAccount, MentionResolver, MentionTable};
pub use transform::NodeTransform;
pub use tree::build_tree;
