use serde::{Deserialize, Serialize};

use super::ChatMessage;
use crate::{Result, ScaleBurnError};

/// Concurrency levels tested when no profile is given.
pub const DEFAULT_PROFILE: &[u32] = &[1, 2, 4, 8, 12, 16, 24, 32, 48, 64];

/// One workload: the payload sent on every call plus the concurrency levels
/// to measure it at. Levels run in the given order and may repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub profile: Vec<u32>,
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    1.0
}

fn default_max_tokens() -> u32 {
    128
}

impl TestCase {
    pub fn new(messages: Vec<ChatMessage>, profile: Vec<u32>) -> Self {
        Self {
            profile,
            messages,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.profile.is_empty() {
            return Err(ScaleBurnError::InvalidWorkload(
                "concurrency profile is empty".to_string(),
            ));
        }
        if let Some(pos) = self.profile.iter().position(|&n| n == 0) {
            return Err(ScaleBurnError::InvalidWorkload(format!(
                "concurrency level at position {} must be at least 1",
                pos
            )));
        }
        if self.messages.is_empty() {
            return Err(ScaleBurnError::InvalidWorkload(
                "workload has no messages".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(ScaleBurnError::InvalidWorkload(
                "max_tokens must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(profile: Vec<u32>) -> TestCase {
        TestCase::new(vec![ChatMessage::user("?")], profile)
    }

    #[test]
    fn test_defaults() {
        let tc = case(vec![1]);
        assert_eq!(tc.temperature, 1.0);
        assert_eq!(tc.max_tokens, 128);
    }

    #[test]
    fn test_validate_accepts_unsorted_duplicates() {
        assert!(case(vec![4, 1, 4, 2]).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_profile() {
        let err = case(vec![]).validate().unwrap_err();
        assert!(matches!(err, ScaleBurnError::InvalidWorkload(_)));
    }

    #[test]
    fn test_validate_rejects_zero_level() {
        let err = case(vec![1, 0, 2]).validate().unwrap_err();
        assert!(err.to_string().contains("position 1"));
    }

    #[test]
    fn test_validate_rejects_zero_max_tokens() {
        assert!(case(vec![1]).with_max_tokens(0).validate().is_err());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let json = r#"{"profile":[1,2],"messages":[{"role":"user","content":"?"}]}"#;
        let tc: TestCase = serde_json::from_str(json).unwrap();
        assert_eq!(tc.profile, vec![1, 2]);
        assert_eq!(tc.max_tokens, 128);
        assert_eq!(tc.messages[0], ChatMessage::user("?"));
    }
}
