//! Code span detection over the token stream.
//!
//! Status content carries no `<pre>` for code: authors type Markdown-style
//! backticks which the server leaves as text, split across `<br>` and
//! paragraph boundaries. These passes run before tree construction and
//! collapse such spans into [`TokenKind::CodeBlock`] and
//! [`TokenKind::CodeInline`] tokens.

use crate::error::{ContentWarning, Diagnostics, SourceLocation};
use crate::tokenize::{Tag, Token, TokenKind, coalesce_text, is_line_break, slice_cow};
use std::borrow::Cow;
use std::collections::VecDeque;

/// Fence delimiter.
const FENCE: &str = "```";

/// Which code passes to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeOptions {
    /// Collapse triple-backtick fences into code blocks.
    pub fences: bool,
    /// Collapse single-backtick spans into inline code.
    pub inline: bool,
}

impl Default for CodeOptions {
    fn default() -> Self {
        Self {
            fences: true,
            inline: true,
        }
    }
}

/// Runs the enabled passes: fences first, then inline spans.
pub fn collapse_code<'a>(
    tokens: Vec<Token<'a>>,
    options: CodeOptions,
    diagnostics: &mut Diagnostics,
) -> Vec<Token<'a>> {
    let mut tokens = coalesce_text(tokens);
    if options.fences {
        tokens = collapse_fences(tokens, diagnostics);
    }
    if options.inline {
        tokens = collapse_inline_code(tokens);
    }
    tokens
}

/// Collapses every terminated triple-backtick fence into a code block token.
///
/// `<br>` inside the fence becomes `\n`, a paragraph end becomes `\n\n`, and
/// other tags are dropped. A word right after the opener is the language only
/// when a line break follows it. The body keeps character references
/// verbatim. A fence that never closes, or whose scan meets the end of an
/// element it was opened in (other than a paragraph), leaves the remaining
/// tokens untouched and records a [`ContentWarning::UnterminatedFence`].
pub fn collapse_fences<'a>(
    tokens: Vec<Token<'a>>,
    diagnostics: &mut Diagnostics,
) -> Vec<Token<'a>> {
    let mut queue: VecDeque<Token<'a>> = tokens.into();
    let mut out = Vec::with_capacity(queue.len());
    let mut verbatim = 0usize;

    while let Some(token) = queue.pop_front() {
        track_verbatim(&token, &mut verbatim);
        let offset = token.offset;
        let text = match token.kind {
            TokenKind::Text(text) if verbatim == 0 => text,
            kind => {
                out.push(Token::new(kind, offset));
                continue;
            }
        };

        let Some(open) = text.find(FENCE) else {
            out.push(Token::text(text, offset));
            continue;
        };
        let (lang_len, info_len) = fence_info_len(&text[open + FENCE.len()..]);
        let body_start = open + FENCE.len() + info_len;

        let Some(scan) = scan_for_close(&text[body_start..], &queue, fence_text_step, fence_tag_step)
        else {
            let context: String = text[open..].chars().take(24).collect();
            log::warn!("unterminated code fence at byte {}", offset + open);
            diagnostics.add_warning(ContentWarning::UnterminatedFence {
                location: SourceLocation::new(offset + open),
                context,
            });
            out.push(Token::text(text, offset));
            out.extend(queue.drain(..));
            break;
        };

        if open > 0 {
            out.push(Token::text(slice_cow(&text, 0..open), offset));
        }
        let lang = &text[open + FENCE.len()..open + FENCE.len() + lang_len];
        out.push(Token::new(
            TokenKind::CodeBlock {
                code: trim_fence_body(scan.body),
                lang: (!lang.is_empty()).then(|| lang.to_string()),
            },
            offset + open,
        ));

        let resumed = resume_after_close(scan.site, &text, body_start, offset, FENCE.len(), &mut queue);
        if !resumed
            && let Some(TokenKind::StartTag(tag)) = queue.front().map(|t| &t.kind)
            && tag.name == "br"
        {
            queue.pop_front();
        }
    }

    coalesce_text(out)
}

/// Collapses single-backtick spans that stay on one line into inline code tokens.
///
/// The opening backtick must be followed by non-whitespace, neither backtick
/// may be part of a longer run, and the span may not cross a line break.
/// Tags inside the span (typically a link) are dropped and their text kept.
pub fn collapse_inline_code(tokens: Vec<Token<'_>>) -> Vec<Token<'_>> {
    let mut queue: VecDeque<Token<'_>> = tokens.into();
    let mut out = Vec::with_capacity(queue.len());
    let mut verbatim = 0usize;

    while let Some(token) = queue.pop_front() {
        track_verbatim(&token, &mut verbatim);
        let offset = token.offset;
        let text = match token.kind {
            TokenKind::Text(text) if verbatim == 0 => text,
            kind => {
                out.push(Token::new(kind, offset));
                continue;
            }
        };

        let Some(open) = find_inline_opener(&text) else {
            out.push(Token::text(text, offset));
            continue;
        };

        match scan_for_close(&text[open + 1..], &queue, inline_text_step, inline_tag_step) {
            Some(scan) if is_inline_body(&scan.body) => {
                if open > 0 {
                    out.push(Token::text(slice_cow(&text, 0..open), offset));
                }
                out.push(Token::new(TokenKind::CodeInline(scan.body), offset + open));
                resume_after_close(scan.site, &text, open + 1, offset, 1, &mut queue);
            }
            _ => {
                out.push(Token::text(slice_cow(&text, 0..open + 1), offset));
                if open + 1 < text.len() {
                    queue.push_front(Token::text(
                        slice_cow(&text, open + 1..text.len()),
                        offset + open + 1,
                    ));
                }
            }
        }
    }

    coalesce_text(out)
}

/// What a scan does with a text token.
enum TextStep {
    /// Closing marker found at this byte offset.
    Close(usize),
    /// Whole text belongs to the body.
    Continue,
    /// The span cannot close here.
    Abort,
}

/// What a scan does with a non-text token.
enum TagStep {
    /// Append this separator to the body and keep going.
    Join(&'static str),
    /// The span cannot continue past this token.
    Abort,
}

/// Where the closing marker was found.
enum CloseSite {
    /// Inside the token that held the opener, relative to the scanned slice.
    First(usize),
    /// Inside `queue[index]`, at byte `at`.
    Queued { index: usize, at: usize },
}

struct Scan {
    body: String,
    site: CloseSite,
}

/// Elements started after the opener, innermost last.
#[derive(Default)]
struct OpenedInside(Vec<String>);

impl OpenedInside {
    fn start(&mut self, tag: &Tag) {
        if !tag.is_void() {
            self.0.push(tag.name.clone());
        }
    }

    /// Whether `name` ends an element started after the opener.
    fn end(&mut self, name: &str) -> bool {
        match self.0.iter().rposition(|open| open == name) {
            Some(index) => {
                self.0.truncate(index);
                true
            }
            None => false,
        }
    }
}

fn scan_for_close(
    first: &str,
    queue: &VecDeque<Token<'_>>,
    on_text: fn(&str) -> TextStep,
    on_tag: fn(&mut OpenedInside, &TokenKind<'_>) -> TagStep,
) -> Option<Scan> {
    let mut body = String::new();
    let mut opened = OpenedInside::default();
    match on_text(first) {
        TextStep::Close(at) => {
            body.push_str(&first[..at]);
            return Some(Scan {
                body,
                site: CloseSite::First(at),
            });
        }
        TextStep::Continue => body.push_str(first),
        TextStep::Abort => return None,
    }

    for (index, token) in queue.iter().enumerate() {
        match &token.kind {
            TokenKind::Text(text) => match on_text(text) {
                TextStep::Close(at) => {
                    body.push_str(&text[..at]);
                    return Some(Scan {
                        body,
                        site: CloseSite::Queued { index, at },
                    });
                }
                TextStep::Continue => body.push_str(text),
                TextStep::Abort => return None,
            },
            other => match on_tag(&mut opened, other) {
                TagStep::Join(sep) => body.push_str(sep),
                TagStep::Abort => return None,
            },
        }
    }

    None
}

/// Drops consumed tokens and requeues whatever follows the closing marker.
/// Returns true when non-empty text followed the marker.
fn resume_after_close<'a>(
    site: CloseSite,
    text: &Cow<'a, str>,
    first_start: usize,
    text_offset: usize,
    marker_len: usize,
    queue: &mut VecDeque<Token<'a>>,
) -> bool {
    let (rest, rest_offset) = match site {
        CloseSite::First(at) => {
            let from = first_start + at + marker_len;
            (slice_cow(text, from..text.len()), text_offset + from)
        }
        CloseSite::Queued { index, at } => {
            queue.drain(..index);
            let Some(Token {
                kind: TokenKind::Text(closing),
                offset,
            }) = queue.pop_front()
            else {
                return false;
            };
            let from = at + marker_len;
            (slice_cow(&closing, from..closing.len()), offset + from)
        }
    };

    if rest.is_empty() {
        return false;
    }
    queue.push_front(Token::text(rest, rest_offset));
    true
}

fn fence_text_step(text: &str) -> TextStep {
    match text.find(FENCE) {
        Some(at) => TextStep::Close(at),
        None => TextStep::Continue,
    }
}

fn fence_tag_step(opened: &mut OpenedInside, kind: &TokenKind<'_>) -> TagStep {
    match kind {
        TokenKind::StartTag(tag) => {
            opened.start(tag);
            TagStep::Join(if tag.name == "br" { "\n" } else { "" })
        }
        TokenKind::EndTag(name) if name == "p" => {
            opened.end(name);
            TagStep::Join("\n\n")
        }
        TokenKind::EndTag(name) if opened.end(name) => TagStep::Join(""),
        _ => TagStep::Abort,
    }
}

fn inline_text_step(text: &str) -> TextStep {
    match text.find(['`', '\n']) {
        Some(at) if text.as_bytes()[at] == b'`' && backtick_run_len(text, at) == 1 => {
            TextStep::Close(at)
        }
        Some(_) => TextStep::Abort,
        None => TextStep::Continue,
    }
}

fn inline_tag_step(opened: &mut OpenedInside, kind: &TokenKind<'_>) -> TagStep {
    match kind {
        TokenKind::StartTag(tag) if !is_line_break(&tag.name) => {
            opened.start(tag);
            TagStep::Join("")
        }
        TokenKind::EndTag(name) if !is_line_break(name) && opened.end(name) => TagStep::Join(""),
        _ => TagStep::Abort,
    }
}

/// Byte offset of the first backtick run of length exactly one.
fn find_inline_opener(text: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = text[from..].find('`') {
        let at = from + rel;
        let run = backtick_run_len(text, at);
        if run == 1 {
            return Some(at);
        }
        from = at + run;
    }
    None
}

fn backtick_run_len(text: &str, at: usize) -> usize {
    text.as_bytes()[at..].iter().take_while(|b| **b == b'`').count()
}

fn is_inline_body(body: &str) -> bool {
    body.chars().next().is_some_and(|c| !c.is_whitespace())
}

/// Splits what follows an opener into the language length and the length
/// of the whole info string. A word counts as the language only when the
/// text run ends after it or a newline follows; otherwise it is code.
fn fence_info_len(after: &str) -> (usize, usize) {
    let lang_len = after.bytes().take_while(|b| is_lang_byte(*b)).count();
    let rest = after[lang_len..].trim_start_matches([' ', '\t']);
    if rest.is_empty() || rest.starts_with('\n') {
        (lang_len, after.len() - rest.len())
    } else {
        (0, 0)
    }
}

fn is_lang_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'+' | b'#')
}

/// Strips the newline that follows the opener and every trailing newline.
fn trim_fence_body(mut body: String) -> String {
    if body.starts_with('\n') {
        body.remove(0);
    }
    let trimmed = body.trim_end_matches('\n').len();
    body.truncate(trimmed);
    body
}

fn is_verbatim(name: &str) -> bool {
    matches!(name, "pre" | "code")
}

fn track_verbatim(token: &Token<'_>, depth: &mut usize) {
    match &token.kind {
        TokenKind::StartTag(tag) if is_verbatim(&tag.name) && !tag.self_closing => *depth += 1,
        TokenKind::EndTag(name) if is_verbatim(name) => *depth = depth.saturating_sub(1),
        _ => {}
    }
}
