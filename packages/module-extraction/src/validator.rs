//! Content validator: raw text → quality tier.
//!
//! Scores text on absolute length, the share of navigation/boilerplate
//! tokens, challenge-page markers, garbling and repetition. The same
//! thresholds back the ladder's minimum-acceptability check, so a page the
//! ladder accepts is never one the validator would reject for being too
//! short or a challenge page.

use std::collections::HashSet;

use crate::text::words;
use crate::types::config::QualityThresholds;
use crate::types::module::QualityTier;

/// Phrases that identify bot-challenge and block pages.
const CHALLENGE_MARKERS: &[&str] = &[
    "just a moment",
    "checking your browser",
    "attention required",
    "cf-browser-verification",
    "enable javascript and cookies",
    "verify you are human",
    "verify you are a human",
    "are you a robot",
    "access denied",
    "request unsuccessful",
    "ddos protection by",
    "please complete the security check",
    "unusual traffic from your computer",
];

/// Tokens typical of navigation chrome, cookie banners and footers.
const BOILERPLATE_TOKENS: &[&str] = &[
    "home", "menu", "navigation", "nav", "skip", "toggle", "search", "login", "log", "signin",
    "sign", "signup", "register", "logout", "account", "cookie", "cookies", "accept", "consent",
    "privacy", "terms", "policy", "copyright", "rights", "reserved", "subscribe", "newsletter",
    "follow", "share", "facebook", "twitter", "linkedin", "instagram", "youtube", "footer",
    "header", "sitemap", "back", "top", "next", "previous", "loading",
];

/// Why text failed the minimum-acceptability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    TooShort,
    Challenge,
    Garbled,
    Repetitive,
    Boilerplate,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooShort => "too short",
            Self::Challenge => "challenge page",
            Self::Garbled => "garbled",
            Self::Repetitive => "repetitive",
            Self::Boilerplate => "mostly boilerplate",
        }
    }
}

/// Result of scoring one text.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityAssessment {
    pub tier: QualityTier,
    pub chars: usize,
    pub words: usize,
    pub boilerplate_ratio: f32,
    pub rejection: Option<Rejection>,
}

/// Maps raw text to a [`QualityTier`].
#[derive(Debug, Clone)]
pub struct ContentValidator {
    thresholds: QualityThresholds,
    boilerplate: HashSet<&'static str>,
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::new(QualityThresholds::default())
    }
}

impl ContentValidator {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self {
            thresholds,
            boilerplate: BOILERPLATE_TOKENS.iter().copied().collect(),
        }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// The ladder's stop condition: non-empty, long enough, and not a
    /// challenge page.
    pub fn check_acceptable(&self, text: &str) -> Result<(), Rejection> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Rejection::Empty);
        }
        let chars = trimmed.chars().count();
        if chars < self.thresholds.min_chars {
            return Err(Rejection::TooShort);
        }
        if self.is_challenge_page(trimmed, chars) {
            return Err(Rejection::Challenge);
        }
        Ok(())
    }

    /// Score text and assign a tier.
    pub fn assess(&self, text: &str) -> QualityAssessment {
        let trimmed = text.trim();
        let chars = trimmed.chars().count();
        let tokens: Vec<String> = words(trimmed).collect();
        let boilerplate_ratio = self.boilerplate_ratio(&tokens);

        let rejection = self
            .check_acceptable(trimmed)
            .err()
            .or_else(|| self.content_rejection(trimmed, &tokens, boilerplate_ratio));

        let tier = match rejection {
            Some(_) => QualityTier::Reject,
            None => self.tier_for(chars, boilerplate_ratio),
        };

        QualityAssessment {
            tier,
            chars,
            words: tokens.len(),
            boilerplate_ratio,
            rejection,
        }
    }

    /// Convenience for callers that only need the tier.
    pub fn tier(&self, text: &str) -> QualityTier {
        self.assess(text).tier
    }

    fn tier_for(&self, chars: usize, boilerplate_ratio: f32) -> QualityTier {
        let t = &self.thresholds;
        if chars >= t.high_chars && boilerplate_ratio <= t.high_max_boilerplate {
            QualityTier::High
        } else if chars >= t.medium_chars && boilerplate_ratio <= t.medium_max_boilerplate {
            QualityTier::Medium
        } else {
            QualityTier::Low
        }
    }

    fn content_rejection(&self, text: &str, tokens: &[String], boilerplate_ratio: f32) -> Option<Rejection> {
        let total = text.chars().count();
        let clean = text
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .count();
        if (clean as f32) / (total as f32) < self.thresholds.min_alnum_ratio {
            return Some(Rejection::Garbled);
        }

        if tokens.len() > 10 {
            let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
            if (unique.len() as f32) / (tokens.len() as f32) < self.thresholds.min_unique_ratio {
                return Some(Rejection::Repetitive);
            }
        }

        if boilerplate_ratio > self.thresholds.max_boilerplate_ratio {
            return Some(Rejection::Boilerplate);
        }

        None
    }

    fn is_challenge_page(&self, text: &str, chars: usize) -> bool {
        if chars >= self.thresholds.challenge_max_chars {
            return false;
        }
        let lower = text.to_lowercase();
        CHALLENGE_MARKERS.iter().any(|m| lower.contains(m))
    }

    fn boilerplate_ratio(&self, tokens: &[String]) -> f32 {
        if tokens.is_empty() {
            return 0.0;
        }
        let hits = tokens
            .iter()
            .filter(|t| self.boilerplate.contains(t.as_str()))
            .count();
        hits as f32 / tokens.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn prose(sentences: usize) -> String {
        (0..sentences)
            .map(|i| {
                format!("Topic{i} covers alpha{i} beta{i} gamma{i} delta{i} epsilon{i} with zeta{i} and eta{i}. ")
            })
            .collect()
    }

    #[test]
    fn test_empty_and_short_rejected() {
        let v = ContentValidator::default();
        assert_eq!(v.check_acceptable("   "), Err(Rejection::Empty));
        assert_eq!(v.check_acceptable("tiny page"), Err(Rejection::TooShort));
        assert_eq!(v.tier(""), QualityTier::Reject);
    }

    #[test]
    fn test_challenge_page_rejected() {
        let v = ContentValidator::default();
        let page = "Just a moment... Checking your browser before accessing docs.example.com. \
                    This process is automatic.";
        assert_eq!(v.check_acceptable(page), Err(Rejection::Challenge));
        assert_eq!(v.assess(page).rejection, Some(Rejection::Challenge));
    }

    #[test]
    fn test_challenge_marker_in_long_page_is_content() {
        let v = ContentValidator::default();
        let mut page = prose(40);
        page.push_str("Some forms show a captcha; if you see access denied, contact support.");
        assert!(v.check_acceptable(&page).is_ok());
        assert_ne!(v.tier(&page), QualityTier::Reject);
    }

    #[test]
    fn test_garbled_rejected() {
        let v = ContentValidator::default();
        let garbled = "{{}}[[]]<<>>##@@!!%%^^&&**(())--==++ {{}}[[]]<<>>##@@!!%%^^&&**(()) abc";
        assert_eq!(v.assess(garbled).rejection, Some(Rejection::Garbled));
    }

    #[test]
    fn test_repetitive_rejected() {
        let v = ContentValidator::default();
        let text = "spam ".repeat(40);
        assert_eq!(v.assess(&text).rejection, Some(Rejection::Repetitive));
    }

    #[test]
    fn test_boilerplate_rejected() {
        let v = ContentValidator::default();
        let text = "Home Menu Search Login Sign up Privacy Terms Cookies Accept Subscribe Newsletter \
                    Follow Share Footer Home Menu Copyright All rights reserved Back to top";
        assert_eq!(v.assess(text).rejection, Some(Rejection::Boilerplate));
    }

    #[test]
    fn test_tiers_by_length() {
        let v = ContentValidator::default();
        assert_eq!(v.tier(&prose(1)), QualityTier::Low);
        assert_eq!(v.tier(&prose(8)), QualityTier::Medium);
        assert_eq!(v.tier(&prose(30)), QualityTier::High);
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let v = ContentValidator::new(QualityThresholds {
            min_chars: 10,
            medium_chars: 20,
            high_chars: 25,
            ..QualityThresholds::default()
        });
        assert_eq!(v.tier("Welcome. See Install, Usage."), QualityTier::High);
    }

    proptest! {
        #[test]
        fn prop_tier_is_deterministic(text in "[a-zA-Z .,\n]{0,400}") {
            let v = ContentValidator::default();
            prop_assert_eq!(v.assess(&text), v.assess(&text));
        }

        #[test]
        fn prop_tier_monotonic_in_length(chars in 0usize..5_000, extra in 0usize..5_000, ratio in 0.0f32..1.0) {
            let v = ContentValidator::default();
            prop_assert!(v.tier_for(chars, ratio) <= v.tier_for(chars + extra, ratio));
        }

        #[test]
        fn prop_tier_monotonic_in_boilerplate(chars in 0usize..5_000, ratio in 0.0f32..0.5, more in 0.0f32..0.5) {
            let v = ContentValidator::default();
            prop_assert!(v.tier_for(chars, ratio + more) <= v.tier_for(chars, ratio));
        }
    }
}
