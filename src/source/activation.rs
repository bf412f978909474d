//! Automatic state selection from the focused window.

use super::state::StateVector;
use serde::{Deserialize, Serialize};

/// How a rule's window title is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchType {
    #[default]
    Equals,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoActivation {
    /// Empty matches any process
    #[serde(default)]
    pub process_name: String,
    /// Empty matches any title
    #[serde(default)]
    pub window_title: String,
    #[serde(default)]
    pub match_type: MatchType,
    pub state: StateVector,
}

impl AutoActivation {
    pub fn new(process_name: &str, window_title: &str, match_type: MatchType, state: StateVector) -> Self {
        Self {
            process_name: process_name.to_string(),
            window_title: window_title.to_string(),
            match_type,
            state,
        }
    }

    /// Inputs are expected lowercased
    pub fn is_match(&self, process_lower: &str, title_lower: &str) -> bool {
        let process = self.process_name.to_lowercase();
        if !process.is_empty() && process != process_lower {
            return false;
        }

        let title = self.window_title.to_lowercase();
        if title.is_empty() {
            return true;
        }
        match self.match_type {
            MatchType::Equals => title_lower == title,
            MatchType::StartsWith => title_lower.starts_with(&title),
            MatchType::EndsWith => title_lower.ends_with(&title),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoActivations {
    /// Restored when leaving an auto-activated window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_state: Option<StateVector>,
    #[serde(default)]
    pub rules: Vec<AutoActivation>,
}

impl AutoActivations {
    pub fn new(rules: Vec<AutoActivation>, default_state: Option<StateVector>) -> Self {
        Self {
            default_state,
            rules,
        }
    }

    /// State of the first matching rule
    pub fn get_activation(&self, process_lower: &str, title_lower: &str) -> Option<StateVector> {
        self.rules
            .iter()
            .find(|rule| rule.is_match(process_lower, title_lower))
            .map(|rule| rule.state)
    }
}
