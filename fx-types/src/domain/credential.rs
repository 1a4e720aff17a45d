//! Provider credentials and the priority ledger that orders them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::DomainError;

/// Unique identifier for a ProviderCredential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct CredentialId(Uuid);

impl CredentialId {
    /// Creates a new random CredentialId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a CredentialId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CredentialId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection details for one external rate provider.
///
/// `name` selects the adapter implementation; `priority` orders the failover
/// chain ascending (0 is tried first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredential {
    pub id: CredentialId,
    pub name: String,
    pub token: String,
    pub url: String,
    pub priority: i32,
    pub enabled: bool,
}

impl ProviderCredential {
    pub fn new(
        name: impl Into<String>,
        token: impl Into<String>,
        url: impl Into<String>,
        priority: i32,
        enabled: bool,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Provider name cannot be empty".into(),
            ));
        }
        if priority < 0 {
            return Err(DomainError::ValidationError(
                "Provider priority cannot be negative".into(),
            ));
        }
        Ok(Self {
            id: CredentialId::new(),
            name,
            token: token.into(),
            url: url.into(),
            priority,
            enabled,
        })
    }
}

/// The failover order of every credential, enabled or not.
///
/// Entries are kept sorted by ascending priority. Sorting is stable, so
/// credentials that share a priority keep the relative order they were
/// loaded in.
#[derive(Debug, Clone, Default)]
pub struct PriorityLedger {
    entries: Vec<ProviderCredential>,
}

impl PriorityLedger {
    pub fn new(mut credentials: Vec<ProviderCredential>) -> Self {
        credentials.sort_by_key(|c| c.priority);
        Self {
            entries: credentials,
        }
    }

    pub fn entries(&self) -> &[ProviderCredential] {
        &self.entries
    }

    /// Enabled credentials in the order they should be tried.
    pub fn enabled(&self) -> impl Iterator<Item = &ProviderCredential> {
        self.entries.iter().filter(|c| c.enabled)
    }

    /// Pushes `name` to the back of the chain and re-linearises everything
    /// else to `0..n-1`.
    ///
    /// Credentials that shared the demoted credential's old slot come first,
    /// the rest follow in their current order, and the demoted credential
    /// ends up at `n - 1`. Returns the new priority, or `None` if no
    /// credential has that name.
    pub fn demote(&mut self, name: &str) -> Option<i32> {
        let idx = self.entries.iter().position(|c| c.name == name)?;
        let mut failing = self.entries.remove(idx);
        let old_slot = failing.priority;

        let (same_slot, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|c| c.priority == old_slot);

        self.entries = same_slot.into_iter().chain(rest).collect();
        for (i, credential) in self.entries.iter_mut().enumerate() {
            credential.priority = i as i32;
        }

        failing.priority = self.entries.len() as i32;
        let new_priority = failing.priority;
        self.entries.push(failing);
        Some(new_priority)
    }

    /// `(id, priority)` pairs to persist after a demotion.
    pub fn assignments(&self) -> Vec<(CredentialId, i32)> {
        self.entries.iter().map(|c| (c.id, c.priority)).collect()
    }

    /// True if priorities are exactly `0, 1, .., n-1` in order.
    pub fn is_dense(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(i, c)| c.priority == i as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(name: &str, priority: i32) -> ProviderCredential {
        ProviderCredential::new(name, "token", "https://example.test", priority, true).unwrap()
    }

    fn order(ledger: &PriorityLedger) -> Vec<(&str, i32)> {
        ledger
            .entries()
            .iter()
            .map(|c| (c.name.as_str(), c.priority))
            .collect()
    }

    #[test]
    fn test_new_sorts_by_priority() {
        let ledger = PriorityLedger::new(vec![cred("b", 5), cred("a", 1), cred("c", 9)]);
        assert_eq!(order(&ledger), vec![("a", 1), ("b", 5), ("c", 9)]);
    }

    #[test]
    fn test_demote_moves_failing_to_back_and_compacts() {
        let mut ledger = PriorityLedger::new(vec![cred("beacon", 1), cred("mock", 2)]);

        let new_priority = ledger.demote("beacon").unwrap();

        assert_eq!(new_priority, 1);
        assert_eq!(order(&ledger), vec![("mock", 0), ("beacon", 1)]);
        assert!(ledger.is_dense());
    }

    #[test]
    fn test_demote_keeps_relative_order_of_others() {
        let mut ledger = PriorityLedger::new(vec![
            cred("a", 0),
            cred("b", 3),
            cred("c", 7),
            cred("d", 8),
        ]);

        ledger.demote("b").unwrap();

        assert_eq!(order(&ledger), vec![("a", 0), ("c", 1), ("d", 2), ("b", 3)]);
    }

    #[test]
    fn test_demote_pulls_slot_sharer_to_front() {
        let mut ledger = PriorityLedger::new(vec![
            cred("a", 0),
            cred("b", 1),
            cred("c", 1),
            cred("d", 2),
        ]);

        ledger.demote("b").unwrap();

        assert_eq!(order(&ledger), vec![("c", 0), ("a", 1), ("d", 2), ("b", 3)]);
    }

    #[test]
    fn test_repeated_demotions_stay_dense() {
        let mut ledger =
            PriorityLedger::new(vec![cred("a", 4), cred("b", 10), cred("c", 11)]);

        for name in ["a", "c", "a", "b", "b"] {
            let new_priority = ledger.demote(name).unwrap();
            assert!(ledger.is_dense());
            assert!(
                ledger
                    .entries()
                    .iter()
                    .filter(|c| c.name != name)
                    .all(|c| c.priority < new_priority)
            );
        }
    }

    #[test]
    fn test_demote_includes_disabled_credentials() {
        let mut disabled = cred("off", 0);
        disabled.enabled = false;
        let mut ledger = PriorityLedger::new(vec![disabled, cred("a", 1), cred("b", 2)]);

        ledger.demote("a").unwrap();

        assert_eq!(order(&ledger), vec![("off", 0), ("b", 1), ("a", 2)]);
        let enabled: Vec<_> = ledger.enabled().map(|c| c.name.as_str()).collect();
        assert_eq!(enabled, vec!["b", "a"]);
    }

    #[test]
    fn test_demote_unknown_name_is_noop() {
        let mut ledger = PriorityLedger::new(vec![cred("a", 0)]);
        assert_eq!(ledger.demote("missing"), None);
        assert_eq!(order(&ledger), vec![("a", 0)]);
    }

    #[test]
    fn test_negative_priority_rejected() {
        assert!(ProviderCredential::new("x", "t", "u", -1, true).is_err());
        assert!(ProviderCredential::new(" ", "t", "u", 0, true).is_err());
    }
}
