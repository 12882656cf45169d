//! Structural tree construction from the token stream.

use crate::node::RenderNode;
use fedimark_core::tokenize::{Attribute, is_void_element};
use fedimark_core::{Diagnostics, Token, TokenKind, decode_text};

struct OpenElement {
    tag: String,
    attributes: Vec<Attribute>,
    children: Vec<RenderNode>,
}

impl OpenElement {
    fn into_node(self) -> RenderNode {
        RenderNode::Element {
            tag: self.tag,
            attributes: self.attributes,
            children: self.children,
        }
    }
}

/// Stack-based builder; every recovery is reported, never raised.
struct TreeBuilder<'d> {
    root: Vec<RenderNode>,
    stack: Vec<OpenElement>,
    diagnostics: &'d mut Diagnostics,
}

impl<'d> TreeBuilder<'d> {
    fn new(diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            root: Vec::new(),
            stack: Vec::new(),
            diagnostics,
        }
    }

    fn container(&mut self) -> &mut Vec<RenderNode> {
        match self.stack.last_mut() {
            Some(open) => &mut open.children,
            None => &mut self.root,
        }
    }

    fn push_text(&mut self, raw: &str) {
        let decoded = decode_text(raw);
        if decoded.is_empty() {
            return;
        }
        let container = self.container();
        if let Some(RenderNode::Text { value }) = container.last_mut() {
            value.push_str(&decoded);
        } else {
            container.push(RenderNode::text(decoded));
        }
    }

    fn push_node(&mut self, node: RenderNode) {
        self.container().push(node);
    }

    /// Pops the top element and attaches it to its parent.
    fn close_top(&mut self) {
        if let Some(open) = self.stack.pop() {
            let node = open.into_node();
            self.push_node(node);
        }
    }

    fn start(&mut self, name: String, attributes: Vec<Attribute>, self_closing: bool, offset: usize) {
        if name == "p" && self.stack.iter().any(|open| open.tag == "p") {
            self.diagnostics
                .add_structural(offset, "paragraph opened inside an open paragraph");
            self.close_through("p");
        }

        if self_closing || is_void_element(&name) {
            self.push_node(RenderNode::element(name, attributes, Vec::new()));
            return;
        }
        self.stack.push(OpenElement {
            tag: name,
            attributes,
            children: Vec::new(),
        });
    }

    fn end(&mut self, name: &str, offset: usize) {
        if is_void_element(name) {
            return;
        }
        let Some(index) = self.stack.iter().rposition(|open| open.tag == name) else {
            self.diagnostics
                .add_structural(offset, format!("stray end tag </{}>", name));
            return;
        };
        if index + 1 < self.stack.len() {
            self.diagnostics.add_structural(
                offset,
                format!("</{}> closes {} unclosed element(s)", name, self.stack.len() - index - 1),
            );
        }
        self.close_through(name);
    }

    /// Closes elements up to and including the innermost `name`.
    fn close_through(&mut self, name: &str) {
        while let Some(open) = self.stack.last() {
            let done = open.tag == name;
            self.close_top();
            if done {
                break;
            }
        }
    }

    fn finish(mut self, end: usize) -> Vec<RenderNode> {
        while let Some(open) = self.stack.last() {
            let message = format!("unclosed <{}> at end of input", open.tag);
            self.diagnostics.add_structural(end, message);
            self.close_top();
        }
        self.root
    }
}

/// Builds the render forest for a token stream.
///
/// Text is entity-decoded here; code tokens keep their raw bodies.
pub fn build_tree(tokens: Vec<Token<'_>>, diagnostics: &mut Diagnostics) -> Vec<RenderNode> {
    let end = tokens.last().map_or(0, |t| t.offset);
    let mut builder = TreeBuilder::new(diagnostics);

    for token in tokens {
        let offset = token.offset;
        match token.kind {
            TokenKind::Text(text) => builder.push_text(&text),
            TokenKind::StartTag(tag) => {
                builder.start(tag.name, tag.attributes, tag.self_closing, offset)
            }
            TokenKind::EndTag(name) => builder.end(&name, offset),
            TokenKind::CodeBlock { code, lang } => {
                builder.push_node(RenderNode::CodeBlock { code, lang })
            }
            TokenKind::CodeInline(code) => builder.push_node(RenderNode::CodeInline { code }),
        }
    }

    builder.finish(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedimark_core::tokenize;

    fn build(input: &str) -> (Vec<RenderNode>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = tokenize(input, &mut diagnostics);
        let nodes = build_tree(tokens, &mut diagnostics);
        (nodes, diagnostics)
    }

    #[test]
    fn nests_elements_and_decodes_text() {
        let (nodes, diagnostics) = build("<p>a &amp; <span>b</span></p>");
        assert!(!diagnostics.has_warnings());
        assert_eq!(
            nodes,
            vec![RenderNode::element(
                "p",
                vec![],
                vec![
                    RenderNode::text("a & "),
                    RenderNode::element("span", vec![], vec![RenderNode::text("b")]),
                ],
            )]
        );
    }

    #[test]
    fn void_elements_take_no_children() {
        let (nodes, _) = build("<p>a<br>b</p>");
        let children = nodes[0].children();
        assert_eq!(children.len(), 3);
        assert!(children[1].is_element("br"));
        assert!(children[1].children().is_empty());
    }

    #[test]
    fn nested_paragraph_closes_the_open_one() {
        let (nodes, diagnostics) = build("<p>one<p>two</p>");
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.is_element("p")));
        assert_eq!(diagnostics.count(), 1);
    }

    fn start(name: &str) -> Token<'static> {
        Token::new(
            TokenKind::StartTag(fedimark_core::Tag {
                name: name.into(),
                attributes: vec![],
                self_closing: false,
            }),
            0,
        )
    }

    fn end(name: &str) -> Token<'static> {
        Token::new(TokenKind::EndTag(name.into()), 0)
    }

    #[test]
    fn legacy_references_are_decoded() {
        let (nodes, _) = build("<p>fish &amp chips</p>");
        assert_eq!(nodes[0].children(), &[RenderNode::text("fish & chips")]);
    }

    #[test]
    fn stray_end_tag_is_ignored() {
        let (nodes, _) = build("a</span>b");
        assert_eq!(nodes, vec![RenderNode::text("ab")]);

        let mut diagnostics = Diagnostics::new();
        let tokens = vec![Token::text("a", 0), end("span"), Token::text("b", 0)];
        let nodes = build_tree(tokens, &mut diagnostics);
        assert_eq!(nodes, vec![RenderNode::text("ab")]);
        assert_eq!(diagnostics.count(), 1);
    }

    #[test]
    fn unclosed_elements_close_at_end() {
        let (nodes, diagnostics) = build("<p><span>open");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].children()[0].children(), &[RenderNode::text("open")]);
        assert_eq!(diagnostics.count(), 2);
    }

    #[test]
    fn misnested_end_tag_closes_inner_elements() {
        let mut diagnostics = Diagnostics::new();
        let tokens = vec![
            start("p"),
            start("b"),
            Token::text("bold", 0),
            end("p"),
            Token::text("after", 0),
        ];
        let nodes = build_tree(tokens, &mut diagnostics);
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].children()[0].is_element("b"));
        assert_eq!(nodes[1], RenderNode::text("after"));
        assert_eq!(diagnostics.count(), 1);
    }

    #[test]
    fn code_tokens_become_code_nodes() {
        let mut diagnostics = Diagnostics::new();
        let tokens = vec![Token::new(
            TokenKind::CodeBlock {
                code: "x".into(),
                lang: Some("rs".into()),
            },
            0,
        )];
        let nodes = build_tree(tokens, &mut diagnostics);
        assert_eq!(
            nodes,
            vec![RenderNode::CodeBlock {
                code: "x".into(),
                lang: Some("rs".into())
            }]
        );
    }
}
