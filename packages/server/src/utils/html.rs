/// Escape text for use inside HTML element content or a quoted attribute.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape text for use inside a single-quoted JavaScript string literal that
/// itself sits in an inline `<script>` element.
pub fn escape_js_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            // Keeps `</script>` from closing the element early.
            '<' => out.push_str("\\x3C"),
            '>' => out.push_str("\\x3E"),
            '&' => out.push_str("\\x26"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Script fragment that hands `value` (an uploaded file's URL or an error
/// message) back to the CKEditor instance that opened the upload dialog.
pub fn callback_script(func_num: u32, value: &str) -> String {
    format!(
        "<script type='text/javascript'>\n    window.parent.CKEDITOR.tools.callFunction({func_num}, '{}');\n</script>",
        escape_js_string(value)
    )
}
