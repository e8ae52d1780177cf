//! Message body shaping.

/// The platform has no titles: a non-empty title becomes the first line of the body.
pub fn fold_title(title: &str, body: &str) -> String {
    if title.trim().is_empty() {
        return body.to_string();
    }
    format!("{title}\r\n{body}")
}

/// Truncate to at most `max_chars` characters (not bytes).
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Zero-padded `NN/TT` marker for the `index`-th (0-based) of `total` messages.
pub fn page_label(index: usize, total: usize) -> String {
    format!("{:02}/{:02}", index + 1, total)
}

/// Text for the `index`-th of `total` messages: only the first carries the caller's
/// body, and only when that body is non-empty.
pub fn page_text(body: &str, index: usize, total: usize) -> String {
    if index > 0 || body.is_empty() {
        page_label(index, total)
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_folded() {
        assert_eq!(fold_title("Alert", "disk full"), "Alert\r\ndisk full");
        assert_eq!(fold_title("  ", "disk full"), "disk full");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 280), "hi");
    }

    #[test]
    fn pages() {
        assert_eq!(page_label(0, 3), "01/03");
        assert_eq!(page_text("hello", 0, 3), "hello");
        assert_eq!(page_text("hello", 1, 3), "02/03");
        assert_eq!(page_text("", 0, 12), "01/12");
    }
}
