//! Default moderator interjections
//!
//! Generic prompts the moderator picks from at random every few rounds.
//! The pool is plain data and can be replaced from configuration.

pub const DEFAULT_MODERATOR_COMMENTS: &[&str] = &[
    "Great point! How could that idea be put into practice in real situations?",
    "Interesting perspective! Can anyone offer a counter-argument or an alternative?",
    "Let's dig deeper. What consequences or benefits might follow from this approach?",
    "A thought-provoking claim. How might others see it? Let's hear more voices.",
    "Thank you for sharing. Does anyone have a personal experience that bears on this?",
    "Intriguing suggestion! Can anyone give an example of it in action, or a way to test it?",
    "I love the energy here. Let's keep going by exploring the long-term impact of this idea.",
    "An insightful comment. How might this idea adapt to other contexts or industries?",
    "Plenty of ideas on the table. Can anyone build on what was said or offer a new angle?",
    "Let's play devil's advocate for a moment. What drawbacks or obstacles should we consider?",
];

/// Owned copy of the default pool
pub fn default_comments() -> Vec<String> {
    DEFAULT_MODERATOR_COMMENTS.iter().map(|c| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool() {
        let comments = default_comments();
        assert_eq!(comments.len(), DEFAULT_MODERATOR_COMMENTS.len());
        assert!(comments.iter().all(|c| !c.is_empty()));
    }
}
