use std::collections::BTreeMap;

use crate::storage::{JIRA_USER_MAPPINGS_KEY, KeyValueStore, Persistence};

/// Remembers which team member a Jira account was imported as, so later
/// imports update the member instead of creating a duplicate.
pub struct UserMappings<S: KeyValueStore> {
    persistence: Persistence<S>,
    by_account: BTreeMap<String, String>,
}

impl<S: KeyValueStore> UserMappings<S> {
    pub fn load(persistence: Persistence<S>) -> Self {
        let by_account = persistence.get(JIRA_USER_MAPPINGS_KEY, BTreeMap::new());
        Self {
            persistence,
            by_account,
        }
    }

    pub fn member_for(&self, account_id: &str) -> Option<&str> {
        self.by_account.get(account_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_account.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_account.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_account.iter().map(|(a, m)| (a.as_str(), m.as_str()))
    }

    /// Returns false when the account already pointed at this member.
    pub fn link(&mut self, account_id: &str, member_id: &str) -> bool {
        if self.member_for(account_id) == Some(member_id) {
            return false;
        }
        self.by_account
            .insert(account_id.to_string(), member_id.to_string());
        self.persist();
        true
    }

    /// Forgets every account linked to `member_id`.
    pub fn unlink_member(&mut self, member_id: &str) -> usize {
        let before = self.by_account.len();
        self.by_account.retain(|_, m| m != member_id);
        let removed = before - self.by_account.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.by_account.clear();
        self.persistence.remove(JIRA_USER_MAPPINGS_KEY);
    }

    fn persist(&self) -> bool {
        self.persistence.set(JIRA_USER_MAPPINGS_KEY, &self.by_account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn links_survive_reload_and_unlink() {
        let persistence = Persistence::new(MemoryStore::new());
        let mut mappings = UserMappings::load(persistence.clone());
        assert!(mappings.link("acc-1", "m-1"));
        assert!(!mappings.link("acc-1", "m-1"));
        assert!(mappings.link("acc-2", "m-1"));

        let mut reloaded = UserMappings::load(persistence);
        assert_eq!(reloaded.member_for("acc-2"), Some("m-1"));
        assert_eq!(reloaded.unlink_member("m-1"), 2);
        assert!(reloaded.is_empty());
    }
}
