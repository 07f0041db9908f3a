use std::collections::BTreeSet;

use crate::transcript::domain::raw_segment::{RawSegment, SpeakerTurn};

/// Attributes each segment to the speaker with the most overlapping time.
///
/// Overlap is summed over all of a speaker's turns. Ties go to the speaker
/// whose overlapping turn starts earliest. A segment overlapping no turn (or
/// with zero duration) gets no speaker.
pub fn assign_speakers(segments: &[RawSegment], turns: &[SpeakerTurn]) -> Vec<RawSegment> {
    segments
        .iter()
        .map(|segment| RawSegment {
            speaker: best_speaker(segment.start_or_zero(), segment.end_or_zero(), turns),
            ..segment.clone()
        })
        .collect()
}

fn best_speaker(start: f64, end: f64, turns: &[SpeakerTurn]) -> Option<String> {
    // (speaker, summed overlap, earliest overlapping turn start)
    let mut totals: Vec<(&str, f64, f64)> = Vec::new();
    for turn in turns {
        let overlap = turn.overlap(start, end);
        if overlap <= 0.0 {
            continue;
        }
        match totals.iter_mut().find(|(id, _, _)| *id == turn.speaker) {
            Some((_, total, first)) => {
                *total += overlap;
                *first = first.min(turn.start);
            }
            None => totals.push((turn.speaker.as_str(), overlap, turn.start)),
        }
    }

    totals
        .into_iter()
        .reduce(|best, candidate| {
            let better = candidate.1 > best.1 || (candidate.1 == best.1 && candidate.2 < best.2);
            if better {
                candidate
            } else {
                best
            }
        })
        .map(|(id, _, _)| id.to_string())
}

/// Distinct speaker ids attached to `segments`, sorted.
pub fn observed_speakers(segments: &[RawSegment]) -> BTreeSet<String> {
    segments
        .iter()
        .filter_map(|s| s.speaker.clone())
        .collect()
}
