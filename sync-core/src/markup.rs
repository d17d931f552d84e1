//! Markup encoder for outgoing messages.
//!
//! Converts the lightweight sigils users type into safe inline markup:
//!
//! | Typed       | Encoded                  |
//! |-------------|--------------------------|
//! | `**text**`  | `<strong>text</strong>`  |
//! | `__text__`  | `<u>text</u>`            |
//! | `*text*`    | `<em>text</em>`          |
//! | line break  | `<br>`                   |
//!
//! HTML-significant characters are escaped first, so typed text can never
//! inject markup. Rules run in the order above: strong is resolved before
//! single emphasis so `**x**` is never read as two `*` pairs. Spans never
//! cross a line break, and unbalanced sigils pass through literally.
//!
//! Underline and emphasis spans never contain `<` or `>`. After escaping,
//! those characters only appear in tags an earlier rule emitted, so a later
//! span can never straddle one and the output always nests properly.
//!
//! [`encode`] must run exactly once per outgoing message. It is not
//! idempotent: encoding already-encoded output escapes it a second time.

use regex::Regex;
use std::sync::OnceLock;

/// Line-break marker emitted for `\n` and `\r\n`.
pub const LINE_BREAK: &str = "<br>";

/// Encode typed text into display markup. Total; never fails.
pub fn encode(input: &str) -> String {
    let escaped = escape_html(input);
    let strong = strong_re().replace_all(&escaped, "<strong>$1</strong>");
    let underline = underline_re().replace_all(&strong, "<u>$1</u>");
    let emphasis = apply_emphasis(&underline);
    emphasis.replace("\r\n", LINE_BREAK).replace('\n', LINE_BREAK)
}

fn strong_re() -> &'static Regex {
    static STRONG_RE: OnceLock<Regex> = OnceLock::new();
    STRONG_RE.get_or_init(|| Regex::new(r"\*\*([^\n]+?)\*\*").expect("valid strong regex"))
}

fn underline_re() -> &'static Regex {
    static UNDERLINE_RE: OnceLock<Regex> = OnceLock::new();
    UNDERLINE_RE.get_or_init(|| Regex::new(r"__([^\n<>]+?)__").expect("valid underline regex"))
}

fn emphasis_re() -> &'static Regex {
    static EMPHASIS_RE: OnceLock<Regex> = OnceLock::new();
    EMPHASIS_RE.get_or_init(|| Regex::new(r"\*([^*\n<>]+)\*").expect("valid emphasis regex"))
}

/// Wrap `*text*` spans whose delimiters are not adjacent to another `*`.
///
/// The regex crate has no lookaround, so the neighbour check is done here and
/// a rejected candidate resumes the search one byte past its opening `*`.
fn apply_emphasis(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut search = 0;

    while let Some(caps) = emphasis_re().captures_at(text, search) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let (start, end) = (whole.start(), whole.end());
        let preceded = start > 0 && bytes[start - 1] == b'*';
        let followed = bytes.get(end) == Some(&b'*');
        if preceded || followed {
            search = start + 1;
            continue;
        }

        out.push_str(&text[copied..start]);
        out.push_str("<em>");
        out.push_str(inner.as_str());
        out.push_str("</em>");
        copied = end;
        search = end;
    }

    out.push_str(&text[copied..]);
    out
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_sigils_each_applied_once() {
        assert_eq!(
            encode("**a** and *b* and __c__"),
            "<strong>a</strong> and <em>b</em> and <u>c</u>"
        );
    }

    #[test]
    fn newline_becomes_break_marker() {
        assert_eq!(encode("a\nb"), "a<br>b");
        assert_eq!(encode("a\r\nb"), "a<br>b");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(encode("hello world"), "hello world");
        assert_eq!(encode(""), "");
    }

    #[test]
    fn strong_is_not_misread_as_emphasis() {
        let out = encode("**bold**");
        assert_eq!(out, "<strong>bold</strong>");
        assert!(!out.contains("<em>"));
    }

    #[test]
    fn emphasis_inside_strong_nests_cleanly() {
        assert_eq!(
            encode("**a *b* c**"),
            "<strong>a <em>b</em> c</strong>"
        );
    }

    #[test]
    fn overlapping_sigils_never_misnest() {
        assert_eq!(encode("***a***"), "<strong>*a</strong>*");
        assert_eq!(encode("**a *b**"), "<strong>a *b</strong>");
        assert_eq!(encode("__a **b__ c**"), "__a <strong>b__ c</strong>");
        assert_eq!(encode("*a **b* c**"), "*a <strong>b* c</strong>");
    }

    #[test]
    fn sigils_around_strong_stay_literal() {
        assert_eq!(encode("__**a**__"), "__<strong>a</strong>__");
        assert_eq!(encode("**__a__**"), "<strong><u>a</u></strong>");
    }

    #[test]
    fn unbalanced_sigils_stay_literal() {
        assert_eq!(encode("**open"), "**open");
        assert_eq!(encode("*open"), "*open");
        assert_eq!(encode("__open"), "__open");
        assert_eq!(encode("**a*"), "**a*");
        assert_eq!(encode("2 * 3 = 6"), "2 * 3 = 6");
    }

    #[test]
    fn empty_spans_stay_literal() {
        assert_eq!(encode("****"), "****");
        assert_eq!(encode("**"), "**");
        assert_eq!(encode("____"), "____");
    }

    #[test]
    fn spans_do_not_cross_lines() {
        assert_eq!(encode("*a\nb*"), "*a<br>b*");
        assert_eq!(encode("**a\nb**"), "**a<br>b**");
    }

    #[test]
    fn multiple_emphasis_spans() {
        assert_eq!(encode("*x* and *y*"), "<em>x</em> and <em>y</em>");
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(
            encode("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
        assert_eq!(encode("a & b"), "a &amp; b");
    }

    #[test]
    fn escaping_happens_before_markup() {
        assert_eq!(encode("**<b>**"), "<strong>&lt;b&gt;</strong>");
    }

    #[test]
    fn encoding_is_deterministic() {
        let input = "**hi** _there_ *you*\nbye";
        assert_eq!(encode(input), encode(input));
    }

    #[test]
    fn encoding_twice_double_escapes() {
        let once = encode("*a*");
        assert_ne!(encode(&once), once);
    }

    #[test]
    fn multibyte_text_is_preserved() {
        assert_eq!(encode("*héllo* 🌍"), "<em>héllo</em> 🌍");
    }
}
