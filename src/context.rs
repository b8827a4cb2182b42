//! Context-window trimming.
//!
//! Pure functions over message slices: no shared state, no side effects,
//! safe to call from any number of concurrent callers. Token counts use a
//! cheap 4-characters-per-token heuristic rather than an exact tokenizer;
//! the budget exists to bound upstream payload size, not to bill by it.

use crate::types::Message;

/// Characters per estimated token.
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token footprint of `messages` plus an optional system
/// prompt: total character count divided by four.
pub fn estimate_tokens(messages: &[Message], system_prompt: Option<&str>) -> usize {
    let chars: usize = messages
        .iter()
        .map(|m| m.content.chars().count())
        .sum::<usize>()
        + system_prompt.map_or(0, |s| s.chars().count());
    chars / CHARS_PER_TOKEN
}

/// Trim a conversation to fit `max_messages` and `max_token_budget`.
///
/// First truncates to the most recent `max_messages` entries, then drops
/// the oldest remaining message until the estimate fits the budget or a
/// single message remains. The most recent message is never dropped, even
/// if it alone exceeds the budget: an oversized final message passes
/// through unmodified and the provider's own size error surfaces instead.
///
/// Idempotent: trimming an already-fitting list returns it unchanged.
pub fn trim_messages(
    messages: &[Message],
    system_prompt: Option<&str>,
    max_messages: usize,
    max_token_budget: usize,
) -> Vec<Message> {
    let start = messages.len().saturating_sub(max_messages.max(1));
    let mut kept = &messages[start..];

    while kept.len() > 1 && estimate_tokens(kept, system_prompt) > max_token_budget {
        kept = &kept[1..];
    }
    kept.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> Message {
        Message::user(content)
    }

    /// A message estimated at exactly `tokens` tokens.
    fn msg_of_tokens(tokens: usize) -> Message {
        msg(&"x".repeat(tokens * CHARS_PER_TOKEN))
    }

    #[test]
    fn estimate_counts_system_prompt() {
        let messages = vec![msg("abcd"), msg("efgh")];
        assert_eq!(estimate_tokens(&messages, None), 2);
        assert_eq!(estimate_tokens(&messages, Some("ijkl")), 3);
    }

    #[test]
    fn within_budget_is_untouched() {
        let messages = vec![msg("hi"), msg("there")];
        let trimmed = trim_messages(&messages, None, 10, 1000);
        assert_eq!(trimmed, messages);
    }

    #[test]
    fn trim_is_idempotent() {
        let messages: Vec<Message> = (0..8).map(|_| msg_of_tokens(10)).collect();
        let once = trim_messages(&messages, None, 5, 40);
        let twice = trim_messages(&once, None, 5, 40);
        assert_eq!(once, twice);
    }

    #[test]
    fn hard_cap_on_message_count() {
        let messages: Vec<Message> = (0..30).map(|i| msg(&format!("m{i}"))).collect();
        let trimmed = trim_messages(&messages, None, 10, 100_000);
        assert_eq!(trimmed.len(), 10);
        assert_eq!(trimmed.last(), messages.last());
    }

    #[test]
    fn drops_oldest_until_budget_fits() {
        // 20 messages, 30 tokens each: total 600 against a budget of 200,
        // i.e. 3x over. The largest fitting suffix is 6 messages.
        let messages: Vec<Message> = (0..20).map(|_| msg_of_tokens(30)).collect();
        let trimmed = trim_messages(&messages, None, 50, 200);
        assert_eq!(trimmed.len(), 6);
        assert!(estimate_tokens(&trimmed, None) <= 200);
        assert_eq!(trimmed.last(), messages.last());
    }

    #[test]
    fn system_prompt_consumes_budget() {
        let messages: Vec<Message> = (0..4).map(|_| msg_of_tokens(10)).collect();
        // Without the prompt all 4 fit; with a 20-token prompt only 2 do.
        assert_eq!(trim_messages(&messages, None, 10, 40).len(), 4);
        let prompt = "p".repeat(20 * CHARS_PER_TOKEN);
        assert_eq!(trim_messages(&messages, Some(&prompt), 10, 40).len(), 2);
    }

    #[test]
    fn never_drops_the_most_recent_message() {
        let messages = vec![msg_of_tokens(5), msg_of_tokens(500)];
        let trimmed = trim_messages(&messages, None, 10, 50);
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed[0], messages[1]);
        // Oversized single message passes through unmodified.
        assert!(estimate_tokens(&trimmed, None) > 50);
    }

    #[test]
    fn empty_conversation_stays_empty() {
        let trimmed = trim_messages(&[], None, 10, 100);
        assert!(trimmed.is_empty());
    }
}
