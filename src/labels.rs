//! Target-action labelling: keyword substring match over `event_action`.
//!
//! The keyword list is fixed; changing it changes every label.

use crate::data::Hit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const TARGET_KEYWORDS: [&str; 22] = [
    "заявка",
    "звонок",
    "оформление",
    "callback",
    "покупка",
    "order",
    "submit",
    "contact",
    "call",
    "chat",
    "auth",
    "success",
    "request",
    "claim",
    "phone",
    "sms",
    "code",
    "confirm",
    "start_chat",
    "user_message",
    "proactive",
    "invitation",
];

/// Case-insensitive: true if any keyword occurs in the lowercased action.
pub fn is_target_action(action: &str) -> bool {
    let lower = action.to_lowercase();
    TARGET_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Distinct event actions that matched a keyword during training, most frequent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetActionSet(Vec<String>);

impl TargetActionSet {
    pub fn from_hits(hits: &[Hit]) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for a in hits.iter().filter_map(|h| h.event_action.as_deref()) {
            *counts.entry(a).or_insert(0) += 1;
        }
        let mut matched: Vec<(&str, usize)> = counts
            .into_iter()
            .filter(|(a, _)| is_target_action(a))
            .collect();
        matched.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        Self(matched.into_iter().map(|(a, _)| a.to_string()).collect())
    }

    pub fn actions(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, action: &str) -> bool {
        self.0.iter().any(|a| a == action)
    }
}
