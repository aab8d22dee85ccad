//! HTML helper functions

/// Escape text for use in HTML content and attribute values
///
/// # Examples
/// ```ignore
/// escape_html(r#"<a href="x">"#) // -> "&lt;a href=&quot;x&quot;&gt;"
/// ```
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Truncate to `length` characters, appending `omission` when cut
pub fn truncate_chars(s: &str, length: usize, omission: &str) -> String {
    if s.chars().count() <= length {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(length).collect();
        format!("{}{}", truncated.trim_end(), omission)
    }
}
