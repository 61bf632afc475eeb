//! Text previews for log lines. All lengths are in characters, not bytes.

/// Characters kept from the start of a long response.
pub const PREVIEW_HEAD_CHARS: usize = 200;
/// Characters kept from the end of a long response.
pub const PREVIEW_TAIL_CHARS: usize = 200;

/// First `max_chars` characters, with `...` appended when truncated.
pub fn head_preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Last `max_chars` characters.
pub fn tail_preview(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    text.chars().skip(total.saturating_sub(max_chars)).collect()
}

/// Head and tail of `text` with the middle replaced by an omission marker.
pub fn head_tail_preview(text: &str, head_chars: usize, tail_chars: usize) -> String {
    let total = text.chars().count();
    if total <= head_chars + tail_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(head_chars).collect();
    let tail: String = text.chars().skip(total - tail_chars).collect();
    format!(
        "{}...[omitted {} characters]...{}",
        head,
        total - head_chars - tail_chars,
        tail
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_preview_short_text_untouched() {
        assert_eq!(head_preview("hello", 10), "hello");
        assert_eq!(head_preview("hello world", 5), "hello...");
    }

    #[test]
    fn test_tail_preview() {
        assert_eq!(tail_preview("abcdef", 3), "def");
        assert_eq!(tail_preview("ab", 3), "ab");
    }

    #[test]
    fn test_head_tail_preview_omits_middle() {
        let text = "a".repeat(5) + &"b".repeat(10) + &"c".repeat(5);
        let preview = head_tail_preview(&text, 5, 5);
        assert_eq!(preview, "aaaaa...[omitted 10 characters]...ccccc");
    }

    #[test]
    fn test_head_tail_preview_multibyte() {
        let text = "你好世界和平";
        assert_eq!(head_tail_preview(text, 1, 1), "你...[omitted 4 characters]...平");
        assert_eq!(head_tail_preview(text, 3, 3), text);
    }
}
