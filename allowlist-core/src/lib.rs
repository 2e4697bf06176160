use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub username: String,
    pub discord_id: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// Membership set of accepted players. Usernames match case-insensitively;
/// the case submitted at add time is what gets stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList {
    players: Vec<PlayerRecord>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(players: Vec<PlayerRecord>) -> Self {
        Self { players }
    }

    pub fn contains(&self, username: &str) -> bool {
        self.find(username).is_some()
    }

    /// Appends a record stamped with the current time unless a
    /// case-insensitive match already exists. A duplicate add leaves the
    /// existing record untouched, discord id included. Returns whether the
    /// list changed.
    pub fn add(&mut self, username: &str, discord_id: Option<String>) -> bool {
        if self.find(username).is_some() {
            return false;
        }
        self.players.push(PlayerRecord {
            username: username.to_owned(),
            discord_id,
            added_at: Utc::now(),
        });
        true
    }

    /// Deletes the matching record if present. Removing an absent player is
    /// a no-op, not an error. Returns whether the list changed.
    pub fn remove(&mut self, username: &str) -> bool {
        match self.find(username) {
            Some(index) => {
                self.players.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.players.clear();
    }

    pub fn players(&self) -> &[PlayerRecord] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    fn find(&self, username: &str) -> Option<usize> {
        let needle = username.to_lowercase();
        self.players
            .iter()
            .position(|p| p.username.to_lowercase() == needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_contains_any_case() {
        let mut list = AllowList::new();
        assert!(list.add("Alice", None));
        assert!(list.contains("Alice"));
        assert!(list.contains("ALICE"));
        assert!(list.contains("alice"));
        assert!(!list.contains("Bob"));
    }

    #[test]
    fn duplicate_add_keeps_first_record() {
        let mut list = AllowList::new();
        assert!(list.add("Alice", Some("111".to_owned())));
        assert!(!list.add("ALICE", Some("222".to_owned())));
        assert_eq!(list.len(), 1);
        assert_eq!(list.players()[0].username, "Alice");
        assert_eq!(list.players()[0].discord_id.as_deref(), Some("111"));
    }

    #[test]
    fn remove_is_case_insensitive() {
        let mut list = AllowList::new();
        list.add("Alice", None);
        list.add("Bob", None);
        assert!(list.remove("ALICE"));
        assert_eq!(list.len(), 1);
        assert!(!list.contains("alice"));
        assert!(list.contains("bob"));
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut list = AllowList::new();
        list.add("Alice", None);
        assert!(!list.remove("Bob"));
        assert_eq!(list.len(), 1);
        assert!(list.contains("alice"));
    }

    #[test]
    fn reset_empties_the_list() {
        let mut list = AllowList::new();
        list.add("Alice", None);
        list.add("Bob", Some("333".to_owned()));
        list.reset();
        assert!(list.is_empty());
        assert_eq!(list.players().len(), 0);
    }

    #[test]
    fn records_use_wire_field_names() {
        let mut list = AllowList::new();
        list.add("Alice", None);
        let value = serde_json::to_value(list.players()).unwrap();
        let record = &value[0];
        assert_eq!(record["username"], "Alice");
        assert!(record["discordId"].is_null());
        assert!(record["addedAt"].is_string());
    }

    #[test]
    fn round_trips_through_json() {
        let mut list = AllowList::new();
        list.add("Alice", Some("111".to_owned()));
        list.add("Bob", None);
        let json = serde_json::to_vec_pretty(list.players()).unwrap();
        let restored: Vec<PlayerRecord> = serde_json::from_slice(&json).unwrap();
        assert_eq!(restored, list.players());
    }
}
