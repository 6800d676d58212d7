//! Positional comparison of two event logs.

use audit_kernel_core::{Event, EventType};

/// Outcome of comparing two logs position by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDiff {
    /// Same length, same id at every position.
    Identical,
    /// First position whose ids differ.
    Diverged {
        at: u64,
        left: EventType,
        right: EventType,
    },
    /// Ids agree over the shared prefix but the lengths differ.
    LengthMismatch { left: usize, right: usize },
}

impl LogDiff {
    pub fn identical(&self) -> bool {
        matches!(self, Self::Identical)
    }

    /// Sequence number of the first divergence, if any: the first position
    /// whose ids differ, or the shorter length when one log is a strict
    /// prefix of the other.
    pub fn diverge_at(&self) -> Option<u64> {
        match self {
            Self::Identical => None,
            Self::Diverged { at, .. } => Some(*at),
            Self::LengthMismatch { left, right } => Some((*left).min(*right) as u64),
        }
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        match self {
            Self::Identical => "logs identical".to_string(),
            Self::Diverged { at, left, right } => {
                format!("logs diverge at seq {at}: {left} vs {right}")
            }
            Self::LengthMismatch { left, right } => {
                format!("log lengths differ: {left} vs {right} events")
            }
        }
    }
}

/// Compare two logs by event id at each position.
///
/// Content addressing makes this precise: any difference in an event's
/// fields, or in anything it transitively causes from, shows up as an id
/// mismatch at the first affected position.
pub fn diff(left: &[Event], right: &[Event]) -> LogDiff {
    for (pos, (l, r)) in left.iter().zip(right.iter()).enumerate() {
        if l.id != r.id {
            return LogDiff::Diverged {
                at: pos as u64,
                left: l.event_type,
                right: r.event_type,
            };
        }
    }
    if left.len() != right.len() {
        return LogDiff::LengthMismatch {
            left: left.len(),
            right: right.len(),
        };
    }
    LogDiff::Identical
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_kernel_core::{DecisionMade, EventBuilder, EventPayload, RunId};

    fn decision(seq: u64, rationale: &str) -> Event {
        EventBuilder::new(RunId::new("run-diff"), seq)
            .timestamp(1000 + seq as i64)
            .build(&EventPayload::DecisionMade(DecisionMade {
                rationale: rationale.into(),
                plan: vec![],
            }))
            .unwrap()
    }

    #[test]
    fn test_identical() {
        let log = vec![decision(0, "a"), decision(1, "b")];
        assert_eq!(diff(&log, &log.clone()), LogDiff::Identical);
        assert!(diff(&log, &log).identical());
    }

    #[test]
    fn test_diverged_reports_first_position() {
        let left = vec![decision(0, "a"), decision(1, "b"), decision(2, "c")];
        let right = vec![decision(0, "a"), decision(1, "B"), decision(2, "C")];

        let result = diff(&left, &right);
        assert_eq!(result.diverge_at(), Some(1));
    }

    #[test]
    fn test_length_mismatch_after_common_prefix() {
        let left = vec![decision(0, "a")];
        let right = vec![decision(0, "a"), decision(1, "b")];

        let result = diff(&left, &right);
        assert_eq!(result, LogDiff::LengthMismatch { left: 1, right: 2 });
        // The prefix agrees, so the divergence point is the shorter length
        assert_eq!(result.diverge_at(), Some(1));
    }

    #[test]
    fn test_divergence_beats_length_mismatch() {
        // Prefix differs and lengths differ: report the divergence
        let left = vec![decision(0, "a")];
        let right = vec![decision(0, "x"), decision(1, "b")];

        assert_eq!(diff(&left, &right).diverge_at(), Some(0));
    }
}
