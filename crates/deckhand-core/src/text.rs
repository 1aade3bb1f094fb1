//! Text helpers for chat replies.

/// Maximum length of a single Telegram text message, in UTF-16 code units.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Length of `text` as Telegram counts it: UTF-16 code units.
pub fn telegram_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Cut `text` so it fits into one message of at most `limit` UTF-16 code
/// units.
///
/// Truncated text ends with a marker stating how many characters were
/// dropped. Cuts fall on char boundaries, so an emoji is never split into
/// half a surrogate pair.
pub fn truncate_for_chat(text: &str, limit: usize) -> String {
    if telegram_len(text) <= limit {
        return text.to_string();
    }

    // Size the marker for the largest count it could show
    let total_chars = text.chars().count();
    let marker_len = telegram_len(&truncation_marker(total_chars));
    let budget = limit.saturating_sub(marker_len);

    let mut used = 0;
    let mut out = String::new();
    let mut kept_chars = 0;
    for c in text.chars() {
        used += c.len_utf16();
        if used > budget {
            break;
        }
        out.push(c);
        kept_chars += 1;
    }

    out.push_str(&truncation_marker(total_chars - kept_chars));
    out
}

fn truncation_marker(dropped: usize) -> String {
    format!("\n… (truncated, {} more characters)", dropped)
}
