//! Pure string utilities shared across the pipeline.
//!
//! Everything in here operates on plain text with no DOM or filesystem
//! involvement: whitespace cleanup for labels and titles, YAML scalar
//! escaping for front matter, and the description summarizing rule.

/// Collapse runs of whitespace into single spaces and trim the ends.
///
/// Used for every piece of text lifted out of the export's HTML — link
/// labels, chapter titles, headings, paragraph text — which arrives with
/// the source's indentation and newlines baked in.
pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Characters that force a YAML scalar into double quotes.
const YAML_SPECIALS: &str = ":\"'{}[],&*#?<>@`!";

/// Escape a value for use as a YAML front-matter scalar.
///
/// The value is wrapped in double quotes (with embedded quotes escaped)
/// iff it contains a character YAML could misread as structure, or a
/// newline. Plain values pass through untouched:
///
/// - `PlainTitle` → `PlainTitle`
/// - `Hello, World` → `"Hello, World"`
pub fn yaml_escape(value: &str) -> String {
    let needs_quotes = value.chars().any(|c| c == '\n' || YAML_SPECIALS.contains(c));
    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Summarize a paragraph into a front-matter description.
///
/// Takes the first 240 characters. The result is kept verbatim when it
/// already ends with a sentence terminator or fits in 200 characters;
/// otherwise an ellipsis marks the truncation.
pub fn summarize(text: &str) -> String {
    let summary: String = text.chars().take(240).collect();
    let chars = summary.chars().count();
    if summary.ends_with('.') || chars <= 200 {
        summary
    } else {
        format!("{summary}…")
    }
}
