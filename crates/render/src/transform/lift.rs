//! Lifts block code out of paragraphs.

use crate::node::RenderNode;
use fedimark_core::Attribute;

/// Splits every paragraph holding a [`RenderNode::CodeBlock`] around it.
///
/// The halves keep the paragraph's attributes; `<br>` and blank text at the
/// split edges are trimmed and halves left empty are dropped.
pub fn lift_code_blocks(nodes: &mut Vec<RenderNode>) {
    let mut lifted = Vec::with_capacity(nodes.len());
    for mut node in nodes.drain(..) {
        if let RenderNode::Element { children, .. } = &mut node {
            lift_code_blocks(children);
        }
        match node {
            RenderNode::Element {
                tag,
                attributes,
                children,
            } if tag == "p" && children.iter().any(is_code_block) => {
                split_paragraph(attributes, children, &mut lifted)
            }
            other => lifted.push(other),
        }
    }
    *nodes = lifted;
}

fn is_code_block(node: &RenderNode) -> bool {
    matches!(node, RenderNode::CodeBlock { .. })
}

fn split_paragraph(attributes: Vec<Attribute>, children: Vec<RenderNode>, out: &mut Vec<RenderNode>) {
    let mut half = Vec::new();
    for child in children {
        if is_code_block(&child) {
            push_half(&attributes, std::mem::take(&mut half), out);
            out.push(child);
        } else {
            half.push(child);
        }
    }
    push_half(&attributes, half, out);
}

fn push_half(attributes: &[Attribute], mut half: Vec<RenderNode>, out: &mut Vec<RenderNode>) {
    let is_edge = |node: &RenderNode| node.is_element("br") || node.is_blank_text();
    while half.last().is_some_and(is_edge) {
        half.pop();
    }
    let lead = half.iter().take_while(|n| is_edge(*n)).count();
    half.drain(..lead);
    if !half.is_empty() {
        out.push(RenderNode::element("p", attributes.to_vec(), half));
    }
}
