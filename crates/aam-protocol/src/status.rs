//! Profile status reported by a worker node
//!
//! `apparmor_status --json` prints a document like:
//!
//! ```json
//! {"version": "1", "profiles": {"k8s-nginx": "enforce", "man": "complain"}, "processes": {}}
//! ```
//!
//! Only the `profiles` map is kept. Modes are stored verbatim so that modes
//! other than `enforce` and `complain` (e.g. `kill`, `unconfined`) survive.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ParseError;

/// Mode string reported for enforced profiles
pub const ENFORCE_MODE: &str = "enforce";

/// Observed profile modes on one node, keyed by profile name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStatus {
    #[serde(default, deserialize_with = "deserialize_null_as_empty_map")]
    profiles: BTreeMap<String, String>,
}

/// Deserialize null as an empty map
fn deserialize_null_as_empty_map<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<BTreeMap<String, String>>::deserialize(deserializer)
        .map(|opt| opt.unwrap_or_default())
}

impl ProfileStatus {
    /// Create an empty status snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the JSON payload printed by the status query command.
    ///
    /// The whole payload must decode; there is no partial result.
    pub fn parse(payload: &str) -> Result<Self, ParseError> {
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(ParseError::Empty);
        }

        Ok(serde_json::from_str(payload)?)
    }

    /// Encode back into the `{"profiles": {...}}` payload shape
    pub fn to_json(&self) -> Result<String, ParseError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Names of profiles in enforce mode, sorted ascending
    pub fn enforced_names(&self) -> Vec<String> {
        // BTreeMap iteration is already ordered by key
        self.profiles
            .iter()
            .filter(|(_, mode)| mode.as_str() == ENFORCE_MODE)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Observed mode of a profile, if the node reported it
    pub fn mode_of(&self, name: &str) -> Option<&str> {
        self.profiles.get(name).map(String::as_str)
    }

    /// Iterate over `(name, mode)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.profiles
            .iter()
            .map(|(name, mode)| (name.as_str(), mode.as_str()))
    }

    /// Number of profiles reported
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Check if the node reported no profiles
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ProfileStatus
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            profiles: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enforced_names_sorted() {
        let status: ProfileStatus = [("p3", "enforce"), ("p1", "complain"), ("p2", "enforce")]
            .into_iter()
            .collect();

        assert_eq!(status.enforced_names(), vec!["p2", "p3"]);
    }

    #[test]
    fn test_parse_apparmor_status_output() {
        let payload = r#"{"version": "1", "profiles": {"/usr/sbin/tcpdump": "enforce", "man_filter": "complain", "k8s-nginx": "kill"}, "processes": {"/usr/sbin/nginx": [{"profile": "k8s-nginx", "pid": "123", "status": "enforce"}]}}"#;
        let status = ProfileStatus::parse(payload).unwrap();

        assert_eq!(status.len(), 3);
        assert_eq!(status.mode_of("man_filter"), Some("complain"));
        assert_eq!(status.mode_of("k8s-nginx"), Some("kill"));
        assert_eq!(status.enforced_names(), vec!["/usr/sbin/tcpdump"]);
    }

    #[test]
    fn test_parse_missing_or_null_profiles() {
        assert!(ProfileStatus::parse(r#"{"version": "1"}"#).unwrap().is_empty());
        assert!(ProfileStatus::parse(r#"{"profiles": null}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed_payload() {
        assert!(matches!(
            ProfileStatus::parse("apparmor module is not loaded."),
            Err(ParseError::Malformed(_))
        ));
        assert!(matches!(
            ProfileStatus::parse(r#"{"profiles": {"p": 1}}"#),
            Err(ParseError::Malformed(_))
        ));
        assert!(matches!(ProfileStatus::parse("  \n"), Err(ParseError::Empty)));
    }

    #[test]
    fn test_json_roundtrip_preserves_entries() {
        let original = ProfileStatus::parse(r#"{"profiles": {"b": "complain", "a": "enforce"}}"#)
            .unwrap();
        let reparsed = ProfileStatus::parse(&original.to_json().unwrap()).unwrap();

        assert_eq!(original, reparsed);
    }
}
