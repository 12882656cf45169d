//! Render tree node types.

use crate::tables::{CustomEmoji, MentionAccount};
use fedimark_core::{Attribute, decode_text};
use serde::Serialize;
use std::borrow::Cow;

/// A node of the render tree handed to the presentation layer.
///
/// The tree is built fresh for every call and owned by the caller.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderNode {
    /// Visible text with character references decoded.
    Text {
        /// The text content.
        value: String,
    },

    /// A structural element kept from the source markup.
    Element {
        /// Lowercased tag name (`p`, `br`, `span`, `a`, ...).
        tag: String,
        /// Attributes in source order.
        attributes: Vec<Attribute>,
        /// Child nodes.
        children: Vec<RenderNode>,
    },

    /// A link to an account.
    MentionLink {
        /// The resolved or synthesized account.
        account: MentionAccount,
        /// In-app route for the account.
        href: String,
        /// Display handle without the leading `@`; never empty.
        handle: String,
    },

    /// A link to a hashtag timeline.
    HashtagLink {
        /// Tag name without `#`.
        name: String,
        /// In-app route for the tag.
        href: String,
    },

    /// Inline code span.
    CodeInline {
        /// Raw span text; character references are not decoded.
        code: String,
    },

    /// Fenced code block.
    CodeBlock {
        /// Raw fence body; character references are not decoded.
        code: String,
        /// Language identifier following the opening fence.
        lang: Option<String>,
    },

    /// A custom emoji image.
    Emoji {
        /// The emoji definition the shortcode resolved to.
        emoji: CustomEmoji,
    },
}

impl RenderNode {
    /// Creates a text node.
    pub fn text(value: impl Into<String>) -> Self {
        RenderNode::Text {
            value: value.into(),
        }
    }

    /// Creates an element node.
    pub fn element(tag: impl Into<String>, attributes: Vec<Attribute>, children: Vec<RenderNode>) -> Self {
        RenderNode::Element {
            tag: tag.into(),
            attributes,
            children,
        }
    }

    /// Returns the tag name if this is an element.
    pub fn tag(&self) -> Option<&str> {
        match self {
            RenderNode::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Returns true if this is an element with the given tag.
    pub fn is_element(&self, name: &str) -> bool {
        self.tag() == Some(name)
    }

    /// Returns the children of an element, or an empty slice.
    pub fn children(&self) -> &[RenderNode] {
        match self {
            RenderNode::Element { children, .. } => children,
            _ => &[],
        }
    }

    /// Returns true for text nodes holding only whitespace.
    pub fn is_blank_text(&self) -> bool {
        matches!(self, RenderNode::Text { value } if value.trim().is_empty())
    }

    /// Decoded code text for code nodes.
    ///
    /// Code keeps its character references so escaped markup survives the
    /// transformation; this decodes them once for display.
    pub fn code_text(&self) -> Option<Cow<'_, str>> {
        match self {
            RenderNode::CodeInline { code } | RenderNode::CodeBlock { code, .. } => {
                Some(decode_text(code))
            }
            _ => None,
        }
    }

    /// Visits this node and all descendants depth-first.
    pub fn walk<'n>(&'n self, visit: &mut impl FnMut(&'n RenderNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}

/// Counts nodes matching `predicate` in a forest.
pub fn count_nodes(nodes: &[RenderNode], predicate: impl Fn(&RenderNode) -> bool) -> usize {
    let mut count = 0;
    for node in nodes {
        node.walk(&mut |n| {
            if predicate(n) {
                count += 1;
            }
        });
    }
    count
}
