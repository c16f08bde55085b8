//! Token-budget context selection over a scope's history.

use crate::types::MemoryMessage;

/// A token-budget-bounded slice of history, in chronological order, handed to
/// the generation step.
#[derive(Debug, Clone, Default)]
pub struct ContextWindow {
    pub messages: Vec<MemoryMessage>,
    /// Sum of [`estimate_tokens`] over `messages`; never exceeds the budget
    /// the window was selected under.
    pub estimated_tokens: usize,
}

/// Estimates the token cost of `text` as `ceil(len / 4)`.
///
/// A coarse character heuristic, not a tokenizer. Prompt budgeting downstream
/// is tuned against this exact formula, so it must not change.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Greedy recency packing: walk the history newest-first, keep each message
/// only while the running total stays within `token_budget`, and stop at the
/// first message that would overflow; older messages are never considered
/// after a rejection. The accepted subset is returned in chronological order.
pub(crate) fn select_window(messages: &[MemoryMessage], token_budget: usize) -> ContextWindow {
    if token_budget == 0 {
        return ContextWindow::default();
    }

    // Stable sort: arrival order is preserved for equal timestamps.
    let mut ordered: Vec<&MemoryMessage> = messages.iter().collect();
    ordered.sort_by_key(|message| message.timestamp);

    let mut selected: Vec<MemoryMessage> = Vec::new();
    let mut estimated_tokens = 0usize;
    for message in ordered.into_iter().rev() {
        let cost = estimate_tokens(&message.content);
        if estimated_tokens + cost > token_budget {
            break;
        }
        estimated_tokens += cost;
        selected.push(message.clone());
    }
    selected.reverse();

    ContextWindow {
        messages: selected,
        estimated_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn message(id: &str, content: &str, timestamp: DateTime<Utc>) -> MemoryMessage {
        MemoryMessage {
            id: id.to_string(),
            channel_id: "c1".to_string(),
            guild_id: None,
            author: "alice".to_string(),
            author_id: "100".to_string(),
            content: content.to_string(),
            timestamp,
            is_bot: false,
        }
    }

    #[test]
    fn estimate_is_exactly_ceil_len_over_four() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(&"x".repeat(4000)), 1000);
    }

    #[test]
    fn empty_history_yields_empty_window() {
        let window = select_window(&[], 4000);
        assert!(window.messages.is_empty());
        assert_eq!(window.estimated_tokens, 0);
    }

    #[test]
    fn zero_budget_yields_empty_window() {
        let now = Utc::now();
        let window = select_window(&[message("1", "hi", now)], 0);
        assert!(window.messages.is_empty());
        assert_eq!(window.estimated_tokens, 0);
    }

    #[test]
    fn only_the_most_recent_fits_a_tight_budget() {
        // Three messages of 4000 chars (1000 tokens each), budget 1500:
        // exactly the newest one fits.
        let now = Utc::now();
        let long = "x".repeat(4000);
        let history = vec![
            message("1", &long, now - Duration::seconds(2)),
            message("2", &long, now - Duration::seconds(1)),
            message("3", &long, now),
        ];
        let window = select_window(&history, 1500);
        assert_eq!(window.messages.len(), 1);
        assert_eq!(window.messages[0].id, "3");
        assert_eq!(window.estimated_tokens, 1000);
    }

    #[test]
    fn walk_stops_at_first_overflow_without_skipping_gaps() {
        // Newest fits, the middle one would overflow, and the oldest (which
        // would fit on its own) must not be picked up past the rejection.
        let now = Utc::now();
        let history = vec![
            message("old", "tiny", now - Duration::seconds(2)),
            message("mid", &"x".repeat(8000), now - Duration::seconds(1)),
            message("new", "tiny", now),
        ];
        let window = select_window(&history, 100);
        assert_eq!(window.messages.len(), 1);
        assert_eq!(window.messages[0].id, "new");
    }

    #[test]
    fn oversized_single_message_is_excluded_entirely() {
        let window = select_window(&[message("1", &"x".repeat(8000), Utc::now())], 100);
        assert!(window.messages.is_empty());
        assert_eq!(window.estimated_tokens, 0);
    }

    #[test]
    fn selection_is_returned_in_chronological_order() {
        let now = Utc::now();
        // Arrival order deliberately differs from timestamp order.
        let history = vec![
            message("b", "second", now - Duration::seconds(1)),
            message("c", "third", now),
            message("a", "first", now - Duration::seconds(2)),
        ];
        let window = select_window(&history, 4000);
        let ids: Vec<&str> = window.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        let mut timestamps: Vec<_> = window.messages.iter().map(|m| m.timestamp).collect();
        let sorted = timestamps.clone();
        timestamps.sort();
        assert_eq!(timestamps, sorted);
    }

    #[test]
    fn budget_is_never_exceeded() {
        let now = Utc::now();
        let history: Vec<MemoryMessage> = (0..20)
            .map(|i| {
                message(
                    &i.to_string(),
                    &"y".repeat(37 * (i + 1)),
                    now + Duration::seconds(i as i64),
                )
            })
            .collect();
        for budget in [1, 10, 50, 100, 500] {
            let window = select_window(&history, budget);
            let total: usize = window
                .messages
                .iter()
                .map(|m| estimate_tokens(&m.content))
                .sum();
            assert_eq!(total, window.estimated_tokens);
            assert!(total <= budget, "budget {budget} exceeded: {total}");
        }
    }
}
