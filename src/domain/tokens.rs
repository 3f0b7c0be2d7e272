//! Cheap token estimation
//!
//! Character-based approximation of LLM token counts, good enough for
//! display. One token per four characters, rounded up.

use serde::Serialize;

const CHARS_PER_TOKEN: usize = 4;

/// Estimates below this are comfortably small
pub const GOOD_LIMIT: usize = 10_000;

/// Estimates below this (and at or above [`GOOD_LIMIT`]) deserve a warning
pub const WARNING_LIMIT: usize = 50_000;

/// Display bucket for a token estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenBucket {
    Good,
    Warning,
    Danger,
}

impl TokenBucket {
    pub fn for_count(count: usize) -> Self {
        if count < GOOD_LIMIT {
            TokenBucket::Good
        } else if count < WARNING_LIMIT {
            TokenBucket::Warning
        } else {
            TokenBucket::Danger
        }
    }
}

impl std::fmt::Display for TokenBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenBucket::Good => write!(f, "good"),
            TokenBucket::Warning => write!(f, "warning"),
            TokenBucket::Danger => write!(f, "danger"),
        }
    }
}

/// Estimates the token count of `text`
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn order_of_magnitude() {
        let text = "word ".repeat(1000);
        let tokens = estimate_tokens(&text);
        assert!(tokens > 500 && tokens < 5000, "got {}", tokens);
    }

    #[test]
    fn buckets() {
        assert_eq!(TokenBucket::for_count(0), TokenBucket::Good);
        assert_eq!(TokenBucket::for_count(GOOD_LIMIT), TokenBucket::Warning);
        assert_eq!(TokenBucket::for_count(WARNING_LIMIT), TokenBucket::Danger);
    }

    proptest! {
        #[test]
        fn monotone_in_length(base in ".{0,200}", extra in ".{0,200}") {
            let longer = format!("{}{}", base, extra);
            prop_assert!(estimate_tokens(&longer) >= estimate_tokens(&base));
        }
    }
}
