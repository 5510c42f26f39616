//! Sender-level access control.

use crate::domain::AccessDecision;
use std::collections::HashSet;

/// Decides whether a sender may use the bot, keyed on the banned username
/// list loaded at startup.
///
/// Matching is exact and case-sensitive against the transport's canonical
/// username string. Senders with no username (anonymous or deleted accounts)
/// can never match the list and are always allowed: the policy fails open
/// on purpose, do not tighten it silently.
#[derive(Debug)]
pub struct AccessPolicy {
    banned: HashSet<String>,
}

impl AccessPolicy {
    pub fn new(banned_users: impl IntoIterator<Item = String>) -> Self {
        Self {
            banned: banned_users.into_iter().collect(),
        }
    }

    pub fn check(&self, username: Option<&str>) -> AccessDecision {
        match username {
            Some(name) if self.banned.contains(name) => AccessDecision::Deny {
                reason: format!("user '{name}' is banned"),
            },
            _ => AccessDecision::Allow,
        }
    }

    pub fn is_allowed(&self, username: Option<&str>) -> bool {
        self.check(username) == AccessDecision::Allow
    }
}
