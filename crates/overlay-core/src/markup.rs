//! Minimal text markup for text layers.
//!
//! Supports `**bold**`, `*italic*` and line breaks. Input is HTML-escaped
//! before any substitution, so layer text can never inject markup of its own.

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render layer text to the markup subset understood by overlays.
pub fn render_markup(input: &str) -> String {
    let escaped = escape_html(input);
    let normalized = escaped.replace("\r\n", "\n");
    let bold = wrap_delimited(&normalized, "**", "strong");
    let italic = wrap_delimited(&bold, "*", "em");
    italic.replace('\n', "<br>")
}

/// Replace every closed `delim ... delim` pair on a single line with
/// `<tag>...</tag>`. Unclosed delimiters are left as typed.
fn wrap_delimited(input: &str, delim: &str, tag: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find(delim) {
        let after_open = &rest[open + delim.len()..];
        let line_end = after_open.find('\n').unwrap_or(after_open.len());
        let Some(close) = after_open[..line_end].find(delim).filter(|close| *close > 0) else {
            out.push_str(&rest[..open + delim.len()]);
            rest = after_open;
            continue;
        };

        out.push_str(&rest[..open]);
        out.push('<');
        out.push_str(tag);
        out.push('>');
        out.push_str(&after_open[..close]);
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
        rest = &after_open[close + delim.len()..];
    }

    out.push_str(rest);
    out
}
