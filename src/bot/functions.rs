use teloxide::{
    payloads::SendMessageSetters as _,
    prelude::Requester as _,
    types::{ChatId, LinkPreviewOptions, MessageId, ReplyParameters},
};

use super::{BotType, TELEGRAM_ESCAPE_RE};

/// Replies above this size are split.
const MESSAGE_LIMIT: usize = 4000;
const CHUNK_SIZE: usize = 3900;

pub fn replace_all(s: &str) -> std::borrow::Cow<'_, str> {
    TELEGRAM_ESCAPE_RE.replace_all(s, "\\$1")
}

pub(super) fn link_preview_options(enable: bool) -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: !enable,
        prefer_large_media: false,
        prefer_small_media: false,
        url: None,
        show_above_text: false,
    }
}

/// Split on line boundaries, a single oversized line is cut by characters.
pub(super) fn split_message(text: &str) -> Vec<String> {
    if text.chars().count() <= MESSAGE_LIMIT {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for line in text.lines() {
        let line_len = line.chars().count();
        if current_len > 0 && current_len + 1 + line_len > CHUNK_SIZE {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > CHUNK_SIZE {
            let chars = line.chars().collect::<Vec<_>>();
            for piece in chars.chunks(CHUNK_SIZE) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        if current_len > 0 {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

pub(super) async fn send_long(
    bot: &BotType,
    chat: ChatId,
    reply_to: Option<MessageId>,
    text: &str,
) -> anyhow::Result<()> {
    for (index, chunk) in split_message(text).into_iter().enumerate() {
        let mut request = bot
            .send_message(chat, chunk)
            .link_preview_options(link_preview_options(false));
        if index == 0 {
            if let Some(id) = reply_to {
                request = request
                    .reply_parameters(ReplyParameters::new(id).allow_sending_without_reply());
            }
        }
        request.await?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(replace_all("+60 12-345 6789."), "\\+60 12\\-345 6789\\.");
        assert_eq!(replace_all("(a_b)"), "\\(a\\_b\\)");
    }

    #[test]
    fn test_short_message_untouched() {
        assert_eq!(split_message("hello\nworld"), vec!["hello\nworld"]);
    }

    #[test]
    fn test_split_on_lines() {
        let line = "x".repeat(99);
        let text = std::iter::repeat_n(line.as_str(), 60).collect::<Vec<_>>().join("\n");
        let chunks = split_message(&text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= CHUNK_SIZE));
        assert_eq!(chunks[0].lines().count(), 39);
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_split_long_line() {
        let text = "y".repeat(9000);
        let chunks = split_message(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 9000 - 2 * CHUNK_SIZE);
    }
}
