//! Serializers for the render tree.

use crate::node::RenderNode;
use fedimark_core::tokenize::is_void_element;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;

const BLOCK_ELEMENTS: &[&str] = &["p", "pre", "blockquote", "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5"];

/// Serializes a render forest to HTML.
///
/// Link nodes are emitted in the microformat shape federated servers use, so
/// the output can be fed back through the transformer.
pub fn to_html(nodes: &[RenderNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_html(node, &mut out);
    }
    out
}

fn write_html(node: &RenderNode, out: &mut String) {
    match node {
        RenderNode::Text { value } => out.push_str(&encode_text(value)),
        RenderNode::Element {
            tag,
            attributes,
            children,
        } => {
            out.push('<');
            out.push_str(tag);
            for attribute in attributes {
                let _ = write!(
                    out,
                    " {}=\"{}\"",
                    attribute.name,
                    encode_double_quoted_attribute(&attribute.value)
                );
            }
            out.push('>');
            if is_void_element(tag) {
                return;
            }
            for child in children {
                write_html(child, out);
            }
            let _ = write!(out, "</{}>", tag);
        }
        RenderNode::MentionLink { href, handle, .. } => {
            let _ = write!(
                out,
                "<a href=\"{}\" class=\"u-url mention\">@<span>{}</span></a>",
                encode_double_quoted_attribute(href),
                encode_text(handle)
            );
        }
        RenderNode::HashtagLink { name, href } => {
            let _ = write!(
                out,
                "<a href=\"{}\" class=\"mention hashtag\">#<span>{}</span></a>",
                encode_double_quoted_attribute(href),
                encode_text(name)
            );
        }
        RenderNode::CodeInline { .. } => {
            out.push_str("<code>");
            push_code(node, out);
            out.push_str("</code>");
        }
        RenderNode::CodeBlock { lang, .. } => {
            match lang {
                Some(lang) => {
                    let _ = write!(
                        out,
                        "<pre><code class=\"language-{}\">",
                        encode_double_quoted_attribute(lang)
                    );
                }
                None => out.push_str("<pre><code>"),
            }
            push_code(node, out);
            out.push_str("</code></pre>");
        }
        RenderNode::Emoji { emoji } => {
            let shortcode = encode_double_quoted_attribute(&emoji.shortcode);
            let _ = write!(
                out,
                "<img src=\"{}\" alt=\":{sc}:\" title=\":{sc}:\" class=\"custom-emoji\" data-emoji-id=\"{sc}\">",
                encode_double_quoted_attribute(&emoji.url),
                sc = shortcode
            );
        }
    }
}

fn push_code(node: &RenderNode, out: &mut String) {
    if let Some(code) = node.code_text() {
        out.push_str(&encode_text(&code));
    }
}

/// Visible text of a render forest.
///
/// Block elements are separated by a blank line, `<br>` becomes a newline,
/// code is decoded and emoji fall back to their shortcode.
pub fn plain_text(nodes: &[RenderNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_text(node, &mut out);
    }
    out.trim_end().to_string()
}

fn write_text(node: &RenderNode, out: &mut String) {
    match node {
        RenderNode::Text { value } => out.push_str(value),
        RenderNode::Element { tag, children, .. } => {
            if tag == "br" {
                out.push('\n');
                return;
            }
            let block = BLOCK_ELEMENTS.contains(&tag.as_str());
            if block {
                separate_block(out);
            }
            for child in children {
                write_text(child, out);
            }
            if block {
                separate_block(out);
            }
        }
        RenderNode::MentionLink { handle, .. } => {
            out.push('@');
            out.push_str(handle);
        }
        RenderNode::HashtagLink { name, .. } => {
            out.push('#');
            out.push_str(name);
        }
        RenderNode::CodeInline { .. } => {
            if let Some(code) = node.code_text() {
                out.push_str(&code);
            }
        }
        RenderNode::CodeBlock { .. } => {
            separate_block(out);
            if let Some(code) = node.code_text() {
                out.push_str(&code);
            }
            separate_block(out);
        }
        RenderNode::Emoji { emoji } => {
            let _ = write!(out, ":{}:", emoji.shortcode);
        }
    }
}

fn separate_block(out: &mut String) {
    if out.is_empty() || out.ends_with("\n\n") {
        return;
    }
    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    out.push_str("\n\n");
}
