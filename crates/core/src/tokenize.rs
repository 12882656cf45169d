//! Token stream over the HTML subset carried by federated status content.
//!
//! Markup is read with `lol_html`, which follows the HTML tokenization rules:
//! comments and doctypes are skipped, `script` and `style` bodies are raw
//! text, and end tags without a matching start tag are dropped. Text tokens
//! keep their character references untouched so code bodies survive
//! verbatim; [`decode_text`] decodes them for display. Attribute values are
//! decoded.

use crate::error::Diagnostics;
use html5ever::tokenizer::states::{RawKind, State};
use html5ever::tokenizer::{
    BufferQueue, Token as HtmlToken, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use lol_html::html_content::EndTag;
use lol_html::{RewriteStrSettings, doc_text, element, rewrite_str};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;
use tendril::StrTendril;

/// Elements that never have content or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose boundaries end a visual line of text.
const LINE_BREAK_ELEMENTS: &[&str] = &[
    "br",
    "p",
    "div",
    "li",
    "ul",
    "ol",
    "pre",
    "blockquote",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hr",
    "table",
    "tr",
];

/// Returns true for elements that cannot take children.
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Returns true for elements that start or end a line of text.
pub fn is_line_break(name: &str) -> bool {
    LINE_BREAK_ELEMENTS.contains(&name)
}

/// A decoded `name="value"` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Lowercased attribute name.
    pub name: String,
    /// Attribute value with character references decoded.
    pub value: String,
}

impl Attribute {
    /// Creates an attribute.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A start tag with its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Lowercased tag name.
    pub name: String,
    /// Attributes in source order; duplicates keep the first occurrence.
    pub attributes: Vec<Attribute>,
    /// Whether the tag was written as `<name />`.
    pub self_closing: bool,
}

impl Tag {
    /// Looks up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        attr(&self.attributes, name)
    }

    /// Whether this tag can never have children.
    pub fn is_void(&self) -> bool {
        self.self_closing || is_void_element(&self.name)
    }
}

/// Looks up an attribute value by name in a slice of attributes.
pub fn attr<'s>(attributes: &'s [Attribute], name: &str) -> Option<&'s str> {
    attributes
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.value.as_str())
}

/// Token payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind<'a> {
    /// Raw text; character references are still encoded.
    Text(Cow<'a, str>),
    /// A start tag.
    StartTag(Tag),
    /// An end tag (lowercased name).
    EndTag(String),
    /// A collapsed triple-backtick fence.
    CodeBlock {
        /// Fence body, character references untouched.
        code: String,
        /// Language identifier following the opening fence.
        lang: Option<String>,
    },
    /// A collapsed single-backtick span.
    CodeInline(String),
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// Token payload.
    pub kind: TokenKind<'a>,
    /// Byte offset in the tokenized input. Located after the fact, so it is
    /// a best guess when the same text also appears inside earlier markup.
    pub offset: usize,
}

impl<'a> Token<'a> {
    /// Creates a token.
    pub fn new(kind: TokenKind<'a>, offset: usize) -> Self {
        Self { kind, offset }
    }

    /// Creates a text token.
    pub fn text(text: impl Into<Cow<'a, str>>, offset: usize) -> Self {
        Self::new(TokenKind::Text(text.into()), offset)
    }

    /// Returns the raw text of a text token.
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the tag name for start and end tags.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::StartTag(tag) => Some(&tag.name),
            TokenKind::EndTag(name) => Some(name),
            _ => None,
        }
    }

    /// Whether this token ends a visual line (`<br>`, paragraph boundaries, ...).
    pub fn is_line_break(&self) -> bool {
        self.tag_name().is_some_and(is_line_break)
    }
}

/// Slices a `Cow` without giving up a borrow when there is one.
pub fn slice_cow<'a>(text: &Cow<'a, str>, range: Range<usize>) -> Cow<'a, str> {
    match text {
        Cow::Borrowed(s) => Cow::Borrowed(&s[range]),
        Cow::Owned(s) => Cow::Owned(s[range].to_string()),
    }
}

/// Merges runs of adjacent text tokens and drops empty ones.
pub fn coalesce_text(tokens: Vec<Token<'_>>) -> Vec<Token<'_>> {
    let mut out: Vec<Token<'_>> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if let TokenKind::Text(text) = &token.kind {
            if text.is_empty() {
                continue;
            }
            if let Some(Token {
                kind: TokenKind::Text(prev),
                ..
            }) = out.last_mut()
            {
                prev.to_mut().push_str(text);
                continue;
            }
        }
        out.push(token);
    }
    out
}

/// One callback from the rewriter, before offsets are located.
enum Event {
    Text(String),
    Start(Tag),
    End(String),
}

/// Splits `input` into tokens. Never fails.
///
/// Adjacent text is merged, so comments between two runs of text vanish.
pub fn tokenize<'a>(input: &'a str, diagnostics: &mut Diagnostics) -> Vec<Token<'a>> {
    if input.is_empty() {
        return Vec::new();
    }

    let events: Rc<RefCell<Vec<Event>>> = Rc::default();
    let on_element = Rc::clone(&events);
    let on_text = Rc::clone(&events);

    let settings = RewriteStrSettings {
        element_content_handlers: vec![element!("*", move |el| {
            let mut attributes: Vec<Attribute> = Vec::new();
            for attribute in el.attributes() {
                let name = attribute.name();
                if !attributes.iter().any(|a| a.name == name) {
                    let value = html_escape::decode_html_entities(&attribute.value()).into_owned();
                    attributes.push(Attribute { name, value });
                }
            }
            on_element.borrow_mut().push(Event::Start(Tag {
                name: el.tag_name(),
                attributes,
                self_closing: el.is_self_closing(),
            }));

            if let Some(handlers) = el.end_tag_handlers() {
                let on_end = Rc::clone(&on_element);
                handlers.push(Box::new(move |end: &mut EndTag<'_>| {
                    on_end
                        .borrow_mut()
                        .push(Event::End(end.name().to_ascii_lowercase()));
                    Ok(())
                }) as lol_html::EndTagHandler<'static>);
            }
            Ok(())
        })],
        document_content_handlers: vec![doc_text!(move |chunk| {
            if !chunk.as_str().is_empty() {
                on_text
                    .borrow_mut()
                    .push(Event::Text(chunk.as_str().to_string()));
            }
            Ok(())
        })],
        ..RewriteStrSettings::new()
    };

    if let Err(err) = rewrite_str(input, settings) {
        diagnostics.add_structural(0, format!("markup kept as text: {}", err));
        return vec![Token::text(input, 0)];
    }

    let mut cursor = Cursor { input, pos: 0 };
    let tokens = events
        .take()
        .into_iter()
        .map(|event| match event {
            Event::Text(text) => cursor.text(text),
            Event::Start(tag) => cursor.markup(TokenKind::StartTag(tag)),
            Event::End(name) => cursor.markup(TokenKind::EndTag(name)),
        })
        .collect();
    coalesce_text(tokens)
}

/// Walks the input alongside the rewriter events to recover offsets.
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn text(&mut self, text: String) -> Token<'a> {
        match self.input[self.pos..].find(text.as_str()) {
            Some(i) => {
                let at = self.pos + i;
                self.pos = at + text.len();
                Token::text(&self.input[at..self.pos], at)
            }
            None => Token::text(text, self.pos),
        }
    }

    fn markup(&mut self, kind: TokenKind<'a>) -> Token<'a> {
        let mut at = self.next_lt(self.pos);
        while self.input[at..].starts_with("<!") || self.input[at..].starts_with("<?") {
            let skip = if self.input[at..].starts_with("<!--") {
                self.input[at..].find("-->").map(|i| i + 3)
            } else {
                self.input[at..].find('>').map(|i| i + 1)
            };
            match skip {
                Some(len) => at = self.next_lt(at + len),
                None => break,
            }
        }
        self.pos = self.input[at..].find('>').map_or(at, |i| at + i + 1);
        Token::new(kind, at)
    }

    fn next_lt(&self, from: usize) -> usize {
        self.input[from..].find('<').map_or(from, |i| from + i)
    }
}

/// Decodes character references in a run of text, legacy forms included.
///
/// `<` is kept literally, so decoding is safe on text that was already
/// split out of its markup.
///
/// ```
/// use fedimark_core::decode_text;
///
/// assert_eq!(decode_text("&lt;b&gt; &amp co"), "<b> & co");
/// assert_eq!(decode_text("1 < 2"), "1 < 2");
/// ```
pub fn decode_text(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }

    let opts = TokenizerOpts {
        initial_state: Some(State::RawData(RawKind::Rcdata)),
        ..TokenizerOpts::default()
    };
    let tokenizer = Tokenizer::new(TextSink::default(), opts);
    let mut buffer = BufferQueue::default();
    buffer.push_back(StrTendril::from(raw));
    let _ = tokenizer.feed(&mut buffer);
    tokenizer.end();
    Cow::Owned(tokenizer.sink.text.take())
}

#[derive(Default)]
struct TextSink {
    text: RefCell<String>,
}

impl TokenSink for TextSink {
    type Handle = ();

    fn process_token(&self, token: HtmlToken, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            HtmlToken::CharacterTokens(chars) => self.text.borrow_mut().push_str(&chars),
            HtmlToken::NullCharacterToken => self.text.borrow_mut().push('\0'),
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        let mut diagnostics = Diagnostics::new();
        tokenize(input, &mut diagnostics)
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn plain_text_is_one_token() {
        assert_eq!(
            kinds("Daniel Roe :nuxt:"),
            vec![TokenKind::Text("Daniel Roe :nuxt:".into())]
        );
    }

    #[test]
    fn empty_input_has_no_tokens() {
        assert!(kinds("").is_empty());
    }

    #[test]
    fn parses_tags_and_attributes() {
        let tokens = kinds(r#"<p><a href="https://mas.to/@vitest" class='u-url mention' data-x=1>@</a></p>"#);
        assert_eq!(tokens.len(), 5);
        let TokenKind::StartTag(anchor) = &tokens[1] else {
            panic!("expected anchor start tag");
        };
        assert_eq!(anchor.name, "a");
        assert_eq!(anchor.attr("href"), Some("https://mas.to/@vitest"));
        assert_eq!(anchor.attr("class"), Some("u-url mention"));
        assert_eq!(anchor.attr("data-x"), Some("1"));
        assert_eq!(tokens[3], TokenKind::EndTag("a".into()));
        assert_eq!(tokens[4], TokenKind::EndTag("p".into()));
    }

    #[test]
    fn self_closing_and_void_tags() {
        let tokens = kinds("a<br />b<BR>c");
        let TokenKind::StartTag(first) = &tokens[1] else {
            panic!("expected br");
        };
        assert!(first.self_closing);
        let TokenKind::StartTag(second) = &tokens[3] else {
            panic!("expected br");
        };
        assert_eq!(second.name, "br");
        assert!(!second.self_closing);
        assert!(second.is_void());
        assert_eq!(tokens.len(), 5);
    }

    #[test]
    fn text_keeps_character_references() {
        assert_eq!(
            kinds("&lt;span&gt; &#39;x&#39;"),
            vec![TokenKind::Text("&lt;span&gt; &#39;x&#39;".into())]
        );
    }

    #[test]
    fn attribute_values_are_decoded() {
        let tokens = kinds(r#"<a title="a &amp; b" title="second">x</a>"#);
        let TokenKind::StartTag(tag) = &tokens[0] else {
            panic!("expected start tag");
        };
        assert_eq!(tag.attr("title"), Some("a & b"));
        assert_eq!(tag.attributes.len(), 1);
    }

    #[test]
    fn stray_angle_brackets_are_text() {
        assert_eq!(
            kinds("1 < 2 and 3 <= 4"),
            vec![TokenKind::Text("1 < 2 and 3 <= 4".into())]
        );
    }

    #[test]
    fn comments_and_doctype_are_skipped() {
        assert_eq!(
            kinds("<!DOCTYPE html>a<!-- note --><br>"),
            vec![
                TokenKind::Text("a".into()),
                TokenKind::StartTag(Tag {
                    name: "br".into(),
                    attributes: vec![],
                    self_closing: false,
                }),
            ]
        );
    }

    #[test]
    fn unmatched_end_tags_are_dropped() {
        let tokens = kinds("a</span>b");
        assert!(!tokens.iter().any(|k| matches!(k, TokenKind::EndTag(_))));
    }

    #[test]
    fn script_content_is_raw_text() {
        let tokens = kinds("<script>if (a < b) {}</script>");
        assert_eq!(tokens[1], TokenKind::Text("if (a < b) {}".into()));
        assert_eq!(tokens[2], TokenKind::EndTag("script".into()));
    }

    #[test]
    fn offsets_point_into_input() {
        let mut diagnostics = Diagnostics::new();
        let tokens = tokenize("ab<br>cd", &mut diagnostics);
        let offsets: Vec<usize> = tokens.iter().map(|t| t.offset).collect();
        assert_eq!(offsets, vec![0, 2, 6]);
        assert!(matches!(tokens[2].kind, TokenKind::Text(Cow::Borrowed("cd"))));
    }

    #[test]
    fn offsets_skip_comments() {
        let mut diagnostics = Diagnostics::new();
        let tokens = tokenize("<!-- <br> --><br>", &mut diagnostics);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].offset, 13);
    }

    #[test]
    fn decodes_named_numeric_and_legacy_references() {
        assert_eq!(decode_text("a &amp; b"), "a & b");
        assert_eq!(decode_text("&amp b"), "& b");
        assert_eq!(decode_text("&#39;x&#x27;"), "'x'");
        assert_eq!(decode_text("&lt;/p&gt; </p>"), "</p> </p>");
        assert_eq!(decode_text("&bogus; 1 < 2"), "&bogus; 1 < 2");
    }

    #[test]
    fn decode_borrows_without_references() {
        assert!(matches!(decode_text("plain <text>"), Cow::Borrowed(_)));
    }

    #[test]
    fn coalesce_merges_adjacent_text() {
        let tokens = vec![
            Token::text("a", 0),
            Token::text("", 1),
            Token::text("b", 1),
            Token::new(TokenKind::EndTag("p".into()), 2),
            Token::text("c", 6),
        ];
        let merged = coalesce_text(tokens);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].as_text(), Some("ab"));
    }

    #[test]
    fn line_break_classification() {
        assert!(is_line_break("br"));
        assert!(is_line_break("p"));
        assert!(!is_line_break("span"));
        assert!(!is_line_break("a"));
    }
}
