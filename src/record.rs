use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type TeamId = String;
pub type AgentId = String;

/// Insertion-ordered `key -> value` list.
///
/// The order is significant: it fixes the column order of the CSV header, so
/// JSON objects are decoded member by member instead of through a sorted map.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyed<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for Keyed<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Keyed<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, or replace the value of an existing key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: T) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn key_list(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }
}

impl<K: Into<String>, T> FromIterator<(K, T)> for Keyed<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut keyed = Self::new();
        for (key, value) in iter {
            keyed.insert(key, value);
        }
        keyed
    }
}

/// Renders like a Python dict literal, e.g. `{'Blue': 1.0, 'Red': -2.0}`.
impl<T: fmt::Debug> fmt::Display for Keyed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, (key, value)) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{key}': {value:?}")?;
        }
        f.write_str("}")
    }
}

impl<T: Serialize> Serialize for Keyed<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct KeyedVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for KeyedVisitor<T> {
    type Value = Keyed<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object of keyed values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut keyed = Keyed::new();
        while let Some((key, value)) = access.next_entry::<String, T>()? {
            keyed.insert(key, value);
        }
        Ok(keyed)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Keyed<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(KeyedVisitor(PhantomData))
    }
}

/// Statistics of one episode as reported by a simulation driver.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRecord {
    pub win_lose: bool,
    pub finished_time: f64,
    pub num_steps: u64,
    pub calc_time: f64,
    pub scores: Keyed<f64>,
    pub total_rewards: Keyed<f64>,
    pub num_alives: Keyed<u32>,
    pub end_reason: String,
}

impl EpisodeRecord {
    /// Decode a single JSON object. Every key is required.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "winLose": true,
        "finishedTime": 1200.0,
        "numSteps": 240,
        "calcTime": 3.5,
        "scores": {"Red": 1.0, "Blue": -2.0},
        "totalRewards": {"Red1": 0.5, "Red2": 0.25},
        "numAlives": {"Red": 2, "Blue": 0},
        "endReason": "ELIMINATION"
    }"#;

    #[test]
    fn json_member_order_is_preserved() {
        let record = EpisodeRecord::from_json_str(SAMPLE).expect("valid record");
        assert_eq!(record.scores.key_list(), vec!["Red", "Blue"]);
        assert_eq!(record.num_alives.get("Red"), Some(&2));
        assert_eq!(record.end_reason, "ELIMINATION");
        assert_eq!(record.num_steps, 240);
    }

    #[test]
    fn missing_key_fails_to_decode() {
        let truncated = SAMPLE.replace(r#""endReason": "ELIMINATION""#, r#""unused": 0"#);
        assert!(EpisodeRecord::from_json_str(&truncated).is_err());
    }

    #[test]
    fn display_mimics_dict_literal() {
        let scores: Keyed<f64> = [("Blue", 1.0), ("Red", -2.5)].into_iter().collect();
        assert_eq!(scores.to_string(), "{'Blue': 1.0, 'Red': -2.5}");
        let alives = Keyed::new().with("Blue", 3u32);
        assert_eq!(alives.to_string(), "{'Blue': 3}");
    }

    #[test]
    fn insert_replaces_existing_key_in_place() {
        let mut keyed = Keyed::new().with("a", 1.0).with("b", 2.0);
        keyed.insert("a", 5.0);
        assert_eq!(keyed.key_list(), vec!["a", "b"]);
        assert_eq!(keyed.get("a"), Some(&5.0));
    }
}
