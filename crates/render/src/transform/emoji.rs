//! Custom emoji substitution.

use crate::node::RenderNode;
use crate::tables::EmojiResolver;
use fedimark_core::shortcode::{Segment, split_shortcodes};
use fedimark_core::{ContentWarning, Diagnostics};

/// Replaces known `:shortcode:` tokens in visible text with emoji nodes.
///
/// Code, link and `pre`/`code` element content is left alone. Every
/// well-formed shortcode the resolver does not know is recorded and stays
/// literal.
pub fn substitute_emoji(
    nodes: &mut Vec<RenderNode>,
    emojis: &dyn EmojiResolver,
    diagnostics: &mut Diagnostics,
) {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes.drain(..) {
        match node {
            RenderNode::Text { value } => split_text(value, emojis, diagnostics, &mut out),
            RenderNode::Element {
                tag,
                attributes,
                mut children,
            } => {
                if !matches!(tag.as_str(), "pre" | "code") {
                    substitute_emoji(&mut children, emojis, diagnostics);
                }
                out.push(RenderNode::Element {
                    tag,
                    attributes,
                    children,
                });
            }
            other => out.push(other),
        }
    }
    *nodes = out;
}

fn split_text(
    value: String,
    emojis: &dyn EmojiResolver,
    diagnostics: &mut Diagnostics,
    out: &mut Vec<RenderNode>,
) {
    let mut resolved = Vec::new();
    let segments = split_shortcodes(&value, |name| match emojis.resolve_emoji(name) {
        Some(emoji) => {
            resolved.push(emoji);
            true
        }
        None => {
            log::debug!("unknown emoji shortcode :{}:", name);
            diagnostics.add_warning(ContentWarning::UnknownShortcode {
                shortcode: name.to_string(),
            });
            false
        }
    });

    if resolved.is_empty() {
        out.push(RenderNode::Text { value });
        return;
    }

    let mut resolved = resolved.into_iter();
    for segment in segments {
        match segment {
            Segment::Text(text) if !text.is_empty() => out.push(RenderNode::text(text)),
            Segment::Text(_) => {}
            Segment::Shortcode(_) => {
                if let Some(emoji) = resolved.next() {
                    out.push(RenderNode::Emoji { emoji });
                }
            }
        }
    }
}
