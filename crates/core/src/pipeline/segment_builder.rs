use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::transcript::domain::error::{TranscriptionError, ValidationError};
use crate::transcript::domain::raw_segment::RawSegment;
use crate::transcript::domain::segment::Segment;
use crate::transcript::domain::speaker::Speaker;

/// Turns raw stage records into validated [`Segment`]s.
///
/// Every segment naming the same speaker id shares one `Arc<Speaker>`.
pub struct SegmentBuilder {
    speakers: HashMap<String, Arc<Speaker>>,
}

impl SegmentBuilder {
    pub fn new(speakers: &[Arc<Speaker>]) -> Self {
        Self {
            speakers: speakers
                .iter()
                .map(|s| (s.id().to_string(), Arc::clone(s)))
                .collect(),
        }
    }

    /// Missing timestamps become 0.0 and missing text becomes empty. A
    /// speaker id outside the known set yields no speaker.
    pub fn build(&self, raw: &[RawSegment]) -> Result<Vec<Segment>, TranscriptionError> {
        raw.iter()
            .enumerate()
            .map(|(index, record)| {
                self.build_one(record)
                    .map_err(|source| TranscriptionError::InvalidSegment { index, source })
            })
            .collect()
    }

    fn build_one(&self, record: &RawSegment) -> Result<Segment, ValidationError> {
        let mut segment = Segment::new(
            record.start_or_zero(),
            record.end_or_zero(),
            record.text.clone().unwrap_or_default(),
        )?;
        if let Some(confidence) = record.confidence {
            segment = segment.with_confidence(confidence)?;
        }
        if let Some(speaker) = record.speaker.as_deref().and_then(|id| self.speakers.get(id)) {
            segment = segment.with_speaker(Arc::clone(speaker));
        }
        Ok(segment)
    }
}

/// One shared [`Speaker`] per id, in id order. Blank ids are dropped.
pub fn speakers_from_ids(ids: BTreeSet<String>) -> Vec<Arc<Speaker>> {
    ids.into_iter()
        .filter_map(|id| Speaker::new(id).ok())
        .map(Arc::new)
        .collect()
}
