//! Token budget fitting
//!
//! Trims a message sequence down to its longest trailing window whose token
//! count is strictly below a ceiling, optionally keeping the most recent
//! system message at the cost of older ordinary messages.
//!
//! # Algorithm
//!
//! ```text
//! fit(M, C, keep_system):
//! 1. k ← largest k such that tokens(M[n-k..]) < C      (grown one message at a time)
//! 2. W ← M[n-k..]
//! 3. If keep_system and W has no system message:
//!      s ← last system message of M, cost ← tokens([s])
//!      If s exists and cost < C:
//!        W' ← fit(W, C - cost, false)
//!        If tokens([s] ++ W') < C: return [s] ++ W'
//! 4. Return W
//! ```
//!
//! Each candidate window is re-tokenized in full, so fitting is O(n²) in
//! message count. Debates carry tens of messages, not thousands.

use crate::context::counter::TokenCounter;
use crate::types::Message;

/// Fit `messages` under `max_tokens` (exclusive)
///
/// Returns an empty vector when even the most recent message alone does not
/// fit; callers treat that as "last message too large".
pub fn fit_messages(
    counter: &TokenCounter,
    messages: &[Message],
    max_tokens: usize,
    keep_system_message: bool,
) -> Vec<Message> {
    let window = fitting_tail(counter, messages, max_tokens);

    if keep_system_message && !window.iter().any(Message::is_system) {
        if let Some(system) = messages.iter().rev().find(|m| m.is_system()) {
            let system_tokens = counter.count_messages(std::slice::from_ref(system));

            if system_tokens < max_tokens {
                let reduced = fitting_tail(counter, window, max_tokens - system_tokens);

                let mut combined = Vec::with_capacity(reduced.len() + 1);
                combined.push(system.clone());
                combined.extend_from_slice(reduced);

                if counter.count_messages(&combined) < max_tokens {
                    return combined;
                }
            }
        }
    }

    window.to_vec()
}

/// Longest trailing slice of `messages` that stays strictly under `max_tokens`
fn fitting_tail<'a>(counter: &TokenCounter, messages: &'a [Message], max_tokens: usize) -> &'a [Message] {
    let len = messages.len();
    let mut kept = 0;

    while kept < len && counter.count_messages(&messages[len - kept - 1..]) < max_tokens {
        kept += 1;
    }

    &messages[len - kept..]
}
