use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// A participant identified by diarization.
///
/// Identity is the provider-assigned `id` alone: two speakers with the same
/// id are interchangeable whatever their `label`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "SpeakerRecord")]
pub struct Speaker {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

impl Speaker {
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptySpeakerId);
        }
        Ok(Self { id, label: None })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Human label when one was assigned, the provider id otherwise.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// Wire form of [`Speaker`]; deserialization goes through [`Speaker::new`].
#[derive(Deserialize)]
struct SpeakerRecord {
    id: String,
    #[serde(default)]
    label: Option<String>,
}

impl TryFrom<SpeakerRecord> for Speaker {
    type Error = ValidationError;

    fn try_from(record: SpeakerRecord) -> Result<Self, Self::Error> {
        let speaker = Speaker::new(record.id)?;
        Ok(match record.label {
            Some(label) => speaker.with_label(label),
            None => speaker,
        })
    }
}

impl PartialEq for Speaker {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Speaker {}

impl Hash for Speaker {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Speaker {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Speaker {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;

    fn hash_of(speaker: &Speaker) -> u64 {
        let mut hasher = DefaultHasher::new();
        speaker.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equality_ignores_label() {
        let plain = Speaker::new("SPEAKER_00").unwrap();
        let labelled = Speaker::new("SPEAKER_00").unwrap().with_label("Agent");
        assert_eq!(plain, labelled);
        assert_eq!(hash_of(&plain), hash_of(&labelled));
    }

    #[test]
    fn test_different_ids_are_distinct() {
        let a = Speaker::new("SPEAKER_00").unwrap();
        let b = Speaker::new("SPEAKER_01").unwrap().with_label("SPEAKER_00");
        assert_ne!(a, b);
    }

    #[test]
    fn test_set_deduplicates_by_id() {
        let set: HashSet<Speaker> = [
            Speaker::new("SPEAKER_01").unwrap(),
            Speaker::new("SPEAKER_01").unwrap().with_label("Client"),
            Speaker::new("SPEAKER_00").unwrap(),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display_name_prefers_label() {
        let s = Speaker::new("SPEAKER_01").unwrap();
        assert_eq!(s.display_name(), "SPEAKER_01");
        assert_eq!(s.with_label("Client").display_name(), "Client");
    }

    #[test]
    fn test_empty_id_rejected() {
        assert_eq!(Speaker::new("  "), Err(ValidationError::EmptySpeakerId));
    }

    #[test]
    fn test_deserialize_keeps_label() {
        let speaker: Speaker =
            serde_json::from_str(r#"{"id":"SPEAKER_00","label":"Agent"}"#).unwrap();
        assert_eq!(speaker.id(), "SPEAKER_00");
        assert_eq!(speaker.label(), Some("Agent"));
    }

    #[test]
    fn test_deserialize_rejects_blank_id() {
        let err = serde_json::from_str::<Speaker>(r#"{"id":"  "}"#).unwrap_err();
        assert!(err.to_string().contains("speaker id must not be empty"));
    }

    #[test]
    fn test_orders_by_id() {
        let mut speakers = vec![
            Speaker::new("SPEAKER_02").unwrap(),
            Speaker::new("SPEAKER_00").unwrap().with_label("Zed"),
            Speaker::new("SPEAKER_01").unwrap(),
        ];
        speakers.sort();
        let ids: Vec<&str> = speakers.iter().map(Speaker::id).collect();
        assert_eq!(ids, ["SPEAKER_00", "SPEAKER_01", "SPEAKER_02"]);
    }
}
