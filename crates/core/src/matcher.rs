//! Classifies learner alerts against a screen's segments.

use crate::model::{CorrectAlert, Segment};

/// Result of matching one viewing's alerts against the screen segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchOutcome {
    pub correct: Vec<CorrectAlert>,
    pub incorrect: Vec<f64>,
    pub unmarked: Vec<Segment>,
}

/// Match alerts to segments in the order the alerts were raised.
///
/// Each alert is tested against the first segment (in list order) containing it. The
/// first alert to land in a segment claims it; any later alert resolving to the same
/// segment is incorrect, as is an alert outside every segment. Unclaimed segments
/// come back in their original order.
#[must_use]
pub fn match_alerts(alerts: &[f64], segments: &[Segment]) -> MatchOutcome {
    let mut claimed = vec![false; segments.len()];
    let mut outcome = MatchOutcome::default();

    for &alert in alerts {
        match segments.iter().position(|segment| segment.contains(alert)) {
            Some(index) if !claimed[index] => {
                claimed[index] = true;
                outcome.correct.push(CorrectAlert {
                    time: alert,
                    title: segments[index].title().to_owned(),
                });
            }
            _ => outcome.incorrect.push(alert),
        }
    }

    outcome.unmarked = segments
        .iter()
        .zip(&claimed)
        .filter(|(_, claimed)| !**claimed)
        .map(|(segment, _)| segment.clone())
        .collect();
    outcome
}
