/// Inline markup tokenizer for identification descriptions
///
/// Descriptions use a tiny tag convention: `<b>`, `</b>`, `<i>`, `</i>`.
/// Anything else that looks like a tag is plain text.
use regex::Regex;
use std::sync::OnceLock;

/// Style toggles active for a run of text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    pub bold: bool,
    pub italic: bool,
}

/// A run of text with a single style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub style: Style,
}

fn tag_pattern() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"</?[bi]>").expect("tag pattern is valid"))
}

/// Split `input` into styled segments, preserving order
///
/// Unclosed tags stay in effect until the end of the input.
/// Opening an already-open tag changes nothing.
pub fn tokenize(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut style = Style::default();
    let mut cursor = 0;

    for tag in tag_pattern().find_iter(input) {
        push_text(&mut segments, &input[cursor..tag.start()], style);

        match tag.as_str() {
            "<b>" => style.bold = true,
            "</b>" => style.bold = false,
            "<i>" => style.italic = true,
            "</i>" => style.italic = false,
            _ => unreachable!("pattern only matches the four known tags"),
        }

        cursor = tag.end();
    }

    push_text(&mut segments, &input[cursor..], style);
    segments
}

/// The input with all recognised tags removed
pub fn plain_text(input: &str) -> String {
    tokenize(input).into_iter().map(|s| s.text).collect()
}

fn push_text(segments: &mut Vec<Segment>, text: &str, style: Style) {
    // Adjacent tags leave nothing to render
    if text.is_empty() {
        return;
    }
    segments.push(Segment {
        text: text.to_string(),
        style,
    });
}
