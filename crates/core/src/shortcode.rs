//! Custom emoji `:shortcode:` segmentation.

/// A piece of text split around known shortcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text, unchanged.
    Text(&'a str),
    /// A known shortcode, without the surrounding colons.
    Shortcode(&'a str),
}

/// Returns true for bytes allowed inside a shortcode name.
pub fn is_shortcode_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Splits `text` around every `:name:` token for which `is_known(name)` holds.
///
/// Unknown candidates stay in the surrounding text, colons included, and their
/// closing colon may still open the next candidate.
///
/// ```
/// use fedimark_core::shortcode::{Segment, split_shortcodes};
///
/// let segments = split_shortcodes("Daniel Roe :nuxt:", |name| name == "nuxt");
/// assert_eq!(
///     segments,
///     vec![Segment::Text("Daniel Roe "), Segment::Shortcode("nuxt")]
/// );
/// ```
pub fn split_shortcodes<'a>(text: &'a str, mut is_known: impl FnMut(&str) -> bool) -> Vec<Segment<'a>> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut emitted = 0;
    let mut i = 0;

    while let Some(rel) = text[i..].find(':') {
        let open = i + rel;
        let name_len = bytes[open + 1..]
            .iter()
            .take_while(|b| is_shortcode_byte(**b))
            .count();
        let close = open + 1 + name_len;

        if name_len > 0 && bytes.get(close) == Some(&b':') && is_known(&text[open + 1..close]) {
            if open > emitted {
                segments.push(Segment::Text(&text[emitted..open]));
            }
            segments.push(Segment::Shortcode(&text[open + 1..close]));
            emitted = close + 1;
            i = close + 1;
        } else {
            i = close;
        }
    }

    if emitted < text.len() {
        segments.push(Segment::Text(&text[emitted..]));
    }
    segments
}
