//! Markdown rendering for normalized content trees.
//!
//! The heavy conversion is delegated to `fast_html2md`; everything around
//! it exists to make the result safe for a JSX-aware Markdown processor,
//! which treats `<...>` as potential tags and `{...}` as expressions.
//!
//! ## Rewrite pipeline
//!
//! [`render`] applies a fixed sequence of text-level passes, each a small
//! independently-tested rule:
//!
//! 1. strip leftover `data-*` attributes from the serialized HTML;
//! 2. convert to Markdown (`html2md::rewrite_html`);
//! 3. restore blank lines between sibling blocks (the converter joins
//!    them with a single newline, which Markdown reads as one paragraph);
//! 4. force void elements in surviving raw-HTML fragments (complex tables
//!    mostly) to self-close — a strict-XML-like template layer rejects
//!    unclosed `<br>`/`<hr>`/`<col>`/`<img>`;
//! 5. entity-escape tokens a JSX parser would read as tag syntax: the bare
//!    diamond `<>`, the `<=`/`>=` operator spellings, `<ALL_CAPS>`
//!    placeholders, and `<Mixed case>` tokens that are not known HTML tags.
//!    The converter backslash-escapes `<`, `>`, and `_` in prose, so every
//!    pattern also accepts those spellings and consumes the backslash;
//! 6. backslash-escape curly braces outside fenced and inline code;
//! 7. tidy whitespace (NBSP, CRLF, trailing space, blank-line runs).
//!
//! Every pass is idempotent, so re-rendering identical input produces
//! byte-identical output.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::dom::{self, Handle};

/// Raw-HTML tag names exempt from placeholder escaping.
///
/// Heuristic allow-list: anything else that looks like `<Word>` or
/// `<Some words>` is treated as a placeholder token from the source docs
/// (`<String value>`, `<VALUE>`) rather than markup.
const HTML_TAGS: &[&str] = &[
    "table", "thead", "tbody", "tr", "td", "th", "div", "span", "p", "a", "img", "br", "hr",
    "col", "colgroup", "ol", "ul", "li", "pre", "code", "strong", "em", "b", "i", "u", "h1",
    "h2", "h3", "h4", "h5", "h6", "blockquote", "figure", "figcaption",
];

static DATA_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\sdata-[a-z-]+="[^"]*""#).expect("hardcoded regex is valid")
});

static VOID_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(col|br|hr)(\s[^>]*?)?\s*>").expect("hardcoded regex is valid")
});

static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<img(\s[^>]*)?>").expect("hardcoded regex is valid"));

/// `<ALL_CAPS>` placeholders; tolerates Markdown-escaped underscores and
/// backslash-escaped angle brackets.
static CAPS_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\?<([A-Z_][A-Z0-9_]*(?:\\?_[A-Z0-9_]*)*)\\?>")
        .expect("hardcoded regex is valid")
});

/// `<Mixed case>` tokens, filtered against [`HTML_TAGS`].
static WORD_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\?<([A-Za-z](?:\\_|[A-Za-z0-9_\s])*[A-Za-z0-9])\\?>")
        .expect("hardcoded regex is valid")
});

static DIAMOND_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\?<\\?>").expect("hardcoded regex is valid"));

static LE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\?<=").expect("hardcoded regex is valid"));

static GE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\?>=").expect("hardcoded regex is valid"));

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("hardcoded regex is valid"));

/// Render a normalized content subtree to JSX-safe Markdown.
pub fn render(root: &Handle) -> std::io::Result<String> {
    let html = strip_data_attributes(&dom::serialize_children(root)?);
    let markdown = html2md::rewrite_html(&html, false);
    let markdown = separate_blocks(&markdown);
    let markdown = close_void_elements(&markdown);
    let markdown = escape_jsx_tokens(&markdown);
    let markdown = escape_braces_outside_code(&markdown);
    Ok(tidy(&markdown))
}

/// Drop any custom `data-*` attribute that survived DOM normalization.
pub(crate) fn strip_data_attributes(html: &str) -> String {
    DATA_ATTR.replace_all(html, "").into_owned()
}

/// Force void elements in raw-HTML fragments to self-close.
///
/// Already self-closed occurrences are left untouched, which makes the
/// pass idempotent.
pub(crate) fn close_void_elements(markdown: &str) -> String {
    let closed = VOID_TAG.replace_all(markdown, |caps: &Captures| {
        let name = &caps[1];
        let attrs = caps.get(2).map_or("", |m| m.as_str());
        if attrs.trim_end().ends_with('/') {
            caps[0].to_string()
        } else {
            format!("<{name}{attrs} />")
        }
    });
    IMG_TAG
        .replace_all(&closed, |caps: &Captures| {
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            if attrs.trim_end().ends_with('/') {
                caps[0].to_string()
            } else {
                format!("<img{attrs} />")
            }
        })
        .into_owned()
}

/// Restore blank lines between sibling block-level outputs.
///
/// The generic converter joins adjacent blocks with a single newline, which
/// Markdown reads as one merged paragraph. A blank line is inserted between
/// two non-empty lines unless both belong to a construct whose lines form a
/// unit: list items, table rows, blockquotes, raw-HTML fragments. Fenced
/// block content is never touched.
pub(crate) fn separate_blocks(markdown: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;

    for line in markdown.lines() {
        if in_fence {
            if line.trim_start().starts_with("```") {
                in_fence = false;
            }
            out.push(line.to_string());
            continue;
        }

        let needs_blank = match out.last() {
            Some(prev) => {
                !prev.is_empty()
                    && !line.is_empty()
                    && !(block_continuation(prev) && block_continuation(line))
            }
            None => false,
        };
        if needs_blank {
            out.push(String::new());
        }

        if line.trim_start().starts_with("```") {
            in_fence = true;
        }
        out.push(line.to_string());
    }

    out.join("\n")
}

/// True for lines that continue the block started on the previous line.
fn block_continuation(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("- ")
        || t.starts_with("* ")
        || t.starts_with("+ ")
        || t.starts_with('>')
        || t.starts_with('|')
        || t.starts_with('<')
        || ordered_item(t)
}

fn ordered_item(t: &str) -> bool {
    let digits = t.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && (t[digits..].starts_with(". ") || t[digits..].starts_with(") "))
}

/// Entity-escape angle-bracket sequences a JSX parser would misread.
///
/// Applies only outside fenced blocks and inline code spans: code samples
/// legitimately contain `<=`, diamonds, and generic-looking tokens. The
/// patterns accept both bare tokens and the backslash-escaped spellings the
/// Markdown conversion emits (`\<HOST\_NAME\>`, `\<=`), consuming the
/// backslash so it cannot leak into the entity form.
pub(crate) fn escape_jsx_tokens(markdown: &str) -> String {
    rewrite_outside_code(markdown, &escape_tokens_segment)
}

fn escape_tokens_segment(segment: &str) -> String {
    let text = DIAMOND_TOKEN.replace_all(segment, "&lt;&gt;");
    let text = LE_TOKEN.replace_all(&text, "&lt;=");
    let text = GE_TOKEN.replace_all(&text, "&gt;=");
    let text = CAPS_PLACEHOLDER.replace_all(&text, "&lt;${1}&gt;");

    WORD_PLACEHOLDER
        .replace_all(&text, |caps: &Captures| {
            let inner = &caps[1];
            let tag = inner
                .split_whitespace()
                .next()
                .unwrap_or("")
                .to_lowercase();
            if HTML_TAGS.contains(&tag.as_str()) {
                caps[0].to_string()
            } else {
                format!("&lt;{inner}&gt;")
            }
        })
        .into_owned()
}

/// Backslash-escape `{`/`}` outside fenced blocks and inline code spans.
///
/// Braces that already carry a backslash are left alone, so the pass is
/// idempotent.
pub(crate) fn escape_braces_outside_code(markdown: &str) -> String {
    rewrite_outside_code(markdown, &escape_braces_segment)
}

fn escape_braces_segment(segment: &str) -> String {
    let mut result = String::with_capacity(segment.len() + 8);
    let mut prev = '\0';
    for ch in segment.chars() {
        if (ch == '{' || ch == '}') && prev != '\\' {
            result.push('\\');
        }
        result.push(ch);
        prev = ch;
    }
    result
}

/// Apply a rewrite rule to the parts of a document outside code.
///
/// Two-level state machine: fence state flips on lines whose trimmed
/// content starts with ```` ``` ````; within a non-fence line, unescaped
/// backticks toggle inline-code state. The rule sees only text where both
/// bits are off.
fn rewrite_outside_code(markdown: &str, rule: &dyn Fn(&str) -> String) -> String {
    let mut in_fence = false;
    let mut out: Vec<String> = Vec::new();

    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            out.push(line.to_string());
        } else if in_fence {
            out.push(line.to_string());
        } else {
            out.push(rewrite_outside_inline_code(line, rule));
        }
    }

    out.join("\n")
}

fn rewrite_outside_inline_code(line: &str, rule: &dyn Fn(&str) -> String) -> String {
    // Split on unescaped backticks: even segments are outside inline code.
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev = '\0';
    for ch in line.chars() {
        if ch == '`' && prev != '\\' {
            segments.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
        prev = ch;
    }
    segments.push(current);

    let mut result = String::with_capacity(line.len() + 8);
    for (idx, segment) in segments.iter().enumerate() {
        if idx > 0 {
            result.push('`');
        }
        if idx % 2 == 0 {
            result.push_str(&rule(segment));
        } else {
            result.push_str(segment);
        }
    }
    result
}

/// Whitespace cleanup: NBSP, CRLF, trailing space, blank-line runs.
pub(crate) fn tidy(markdown: &str) -> String {
    let text = markdown.replace('\u{a0}', " ").replace("\r\n", "\n");
    let joined = text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Void-element self-closing
    // =========================================================================

    #[test]
    fn void_elements_become_self_closing() {
        assert_eq!(close_void_elements("a<br>b"), "a<br />b");
        assert_eq!(close_void_elements("<hr>"), "<hr />");
        assert_eq!(close_void_elements("<col span=\"2\">"), "<col span=\"2\" />");
        assert_eq!(close_void_elements("<img src=\"x.png\">"), "<img src=\"x.png\" />");
    }

    #[test]
    fn void_rewrite_is_idempotent() {
        let input = "x<br>y<hr>z<col><img src=\"a.png\">";
        let once = close_void_elements(input);
        let twice = close_void_elements(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn closed_void_elements_untouched() {
        assert_eq!(close_void_elements("<br />"), "<br />");
        assert_eq!(close_void_elements("<hr/>"), "<hr/>");
    }

    // =========================================================================
    // JSX token escaping
    // =========================================================================

    #[test]
    fn diamond_operator_is_escaped() {
        assert_eq!(
            escape_jsx_tokens("new ArrayList<>()"),
            "new ArrayList&lt;&gt;()"
        );
    }

    #[test]
    fn comparison_operators_are_escaped() {
        assert_eq!(escape_jsx_tokens("a <= b and c >= d"), "a &lt;= b and c &gt;= d");
    }

    #[test]
    fn caps_placeholder_is_escaped() {
        assert_eq!(escape_jsx_tokens("set <VALUE> here"), "set &lt;VALUE&gt; here");
        assert_eq!(
            escape_jsx_tokens("use <VARIABLE_NAME>"),
            "use &lt;VARIABLE_NAME&gt;"
        );
    }

    #[test]
    fn escaped_underscore_placeholder_is_escaped() {
        assert_eq!(
            escape_jsx_tokens("use <VARIABLE\\_NAME>"),
            "use &lt;VARIABLE\\_NAME&gt;"
        );
    }

    #[test]
    fn mixed_case_placeholder_is_escaped() {
        assert_eq!(
            escape_jsx_tokens("pass a <String value>"),
            "pass a &lt;String value&gt;"
        );
    }

    #[test]
    fn known_html_tags_are_untouched() {
        assert_eq!(escape_jsx_tokens("<table>"), "<table>");
        assert_eq!(escape_jsx_tokens("<blockquote>"), "<blockquote>");
    }

    #[test]
    fn unknown_single_word_is_escaped() {
        assert_eq!(escape_jsx_tokens("<string>"), "&lt;string&gt;");
    }

    #[test]
    fn tokens_inside_inline_code_untouched() {
        assert_eq!(escape_jsx_tokens("`a <= b` but c <= d"), "`a <= b` but c &lt;= d");
        assert_eq!(escape_jsx_tokens("`List<>`"), "`List<>`");
    }

    #[test]
    fn tokens_inside_fenced_block_untouched() {
        let input = "```\nif (a <= b) use new HashMap<>();\n```\nx <= y";
        let expected = "```\nif (a <= b) use new HashMap<>();\n```\nx &lt;= y";
        assert_eq!(escape_jsx_tokens(input), expected);
    }

    #[test]
    fn converter_escaped_placeholders_are_recognized() {
        // The Markdown conversion backslash-escapes <, >, and _ in prose.
        assert_eq!(
            escape_jsx_tokens(r"Substitute \<HOST\_NAME\> before running"),
            r"Substitute &lt;HOST\_NAME&gt; before running"
        );
        assert_eq!(
            escape_jsx_tokens(r"pass a \<String value\>"),
            "pass a &lt;String value&gt;"
        );
    }

    #[test]
    fn converter_escaped_operators_are_recognized() {
        assert_eq!(escape_jsx_tokens(r"a \<= b"), "a &lt;= b");
        assert_eq!(escape_jsx_tokens(r"c \>= d"), "c &gt;= d");
        assert_eq!(
            escape_jsx_tokens(r"the \<\> shorthand"),
            "the &lt;&gt; shorthand"
        );
    }

    #[test]
    fn jsx_token_escaping_is_idempotent() {
        let input = "a <= b, <VALUE>, <String value>, <table>";
        let once = escape_jsx_tokens(input);
        assert_eq!(escape_jsx_tokens(&once), once);
    }

    #[test]
    fn escaped_form_escaping_is_idempotent() {
        let input = r"a \<= b, \<VALUE\>, \<String value\>";
        let once = escape_jsx_tokens(input);
        assert_eq!(escape_jsx_tokens(&once), once);
    }

    // =========================================================================
    // Block separation
    // =========================================================================

    #[test]
    fn adjacent_paragraphs_get_blank_line() {
        assert_eq!(separate_blocks("one.\ntwo."), "one.\n\ntwo.");
    }

    #[test]
    fn already_separated_blocks_untouched() {
        assert_eq!(separate_blocks("one.\n\ntwo."), "one.\n\ntwo.");
    }

    #[test]
    fn list_items_stay_adjacent() {
        assert_eq!(separate_blocks("- a\n- b"), "- a\n- b");
        assert_eq!(separate_blocks("1. a\n2. b"), "1. a\n2. b");
    }

    #[test]
    fn raw_html_lines_stay_adjacent() {
        let table = "<table>\n<tr><td>a</td></tr>\n</table>";
        assert_eq!(separate_blocks(table), table);
    }

    #[test]
    fn fenced_content_is_not_separated() {
        let input = "intro\n```\na();\nb();\n```\noutro";
        assert_eq!(
            separate_blocks(input),
            "intro\n\n```\na();\nb();\n```\n\noutro"
        );
    }

    #[test]
    fn block_separation_is_idempotent() {
        let once = separate_blocks("one.\ntwo.\n- a\n- b\n```\nc();\nd();\n```");
        assert_eq!(separate_blocks(&once), once);
    }

    // =========================================================================
    // Curly-brace escaping
    // =========================================================================

    #[test]
    fn braces_escaped_outside_code_only() {
        assert_eq!(
            escape_braces_outside_code("`{a}` and {b}"),
            "`{a}` and \\{b\\}"
        );
    }

    #[test]
    fn braces_inside_fenced_block_untouched() {
        let input = "before {x}\n```\nif (a) { b(); }\n```\nafter {y}";
        let expected = "before \\{x\\}\n```\nif (a) { b(); }\n```\nafter \\{y\\}";
        assert_eq!(escape_braces_outside_code(input), expected);
    }

    #[test]
    fn brace_escaping_is_idempotent() {
        let input = "`{a}` and {b}\n```\n{c}\n```";
        let once = escape_braces_outside_code(input);
        assert_eq!(escape_braces_outside_code(&once), once);
    }

    #[test]
    fn inline_code_parity_resets_per_line() {
        let input = "`code {a}\n{b}";
        // Unbalanced backtick only affects its own line.
        assert_eq!(escape_braces_outside_code(input), "`code {a}\n\\{b\\}");
    }

    // =========================================================================
    // Tidy
    // =========================================================================

    #[test]
    fn tidy_collapses_blank_runs_and_trims() {
        assert_eq!(tidy("a  \n\n\n\nb\u{a0}c\r\nd  \n"), "a\n\nb c\nd");
    }

    #[test]
    fn tidy_is_idempotent() {
        let once = tidy("x\n\n\n\ny ");
        assert_eq!(tidy(&once), once);
    }

    // =========================================================================
    // Data-attribute stripping
    // =========================================================================

    #[test]
    fn leftover_data_attributes_are_stripped() {
        assert_eq!(
            strip_data_attributes("<td data-codeformat=\"java\" data-list=\"x\">v</td>"),
            "<td>v</td>"
        );
    }

    // =========================================================================
    // Full render
    // =========================================================================

    #[test]
    fn render_produces_markdown_body() {
        let dom = dom::parse_html(
            "<html><body><h1>Title</h1><p>Hello world with {braces}.</p></body></html>",
        );
        let root = dom::content_root(&dom);
        dom::normalize(&root);
        let markdown = render(&root).unwrap();
        assert!(markdown.contains("Hello world"));
        assert!(markdown.contains("\\{braces\\}"));
        assert!(!markdown.contains("<h1>"));
        assert!(!markdown.contains("Title"));
    }
}
