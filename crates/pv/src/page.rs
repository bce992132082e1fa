//! HTML page wrapper around the rendered procedure.

use pv_cache::TransformError;

/// Wrap `body` in a complete HTML page.
pub(crate) fn render_page(title: &str, body: &str) -> String {
    format!(
        "<HTML>\n<HEAD>\n<TITLE>{}</TITLE>\n</HEAD>\n<BODY>\n{body}\n</BODY>\n</HTML>\n",
        escape_html(title)
    )
}

/// Page body shown in place of the procedure when the transform fails.
pub(crate) fn error_body(err: &TransformError) -> String {
    format!(
        "<P><B>Oops!</B> {} (XSLT errno: {})</P>",
        escape_html(&err.message),
        err.code
    )
}

fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
