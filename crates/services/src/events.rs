//! Training events: what the learner did, ready for an outbound emitter.
//!
//! Wire encoding and delivery belong to the sink. The player only assembles the actor,
//! the verb, the object and the domain facts.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use player_core::Clock;
use player_core::model::Actor;
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Started,
    Viewed,
    Retried,
    Completed,
    Quitted,
}

impl Verb {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Started => "started",
            Verb::Viewed => "viewed",
            Verb::Retried => "retried",
            Verb::Completed => "completed",
            Verb::Quitted => "quitted",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activity {
    Course,
    Video,
}

impl Activity {
    fn slug(self) -> &'static str {
        match self {
            Activity::Course => "course",
            Activity::Video => "video",
        }
    }
}

/// One outbound record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor: Actor,
    pub verb: Verb,
    pub verb_id: String,
    pub object_id: String,
    pub object_name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Value>,
}

impl TrainingEvent {
    #[must_use]
    pub fn extension(&self, name: &str) -> Option<&Value> {
        self.extensions
            .iter()
            .find(|(key, _)| key.rsplit('/').next() == Some(name))
            .map(|(_, value)| value)
    }
}

/// Builds events with ids derived from a base IRI.
#[derive(Debug, Clone)]
pub struct EventFactory {
    base: String,
    course_title: String,
    clock: Clock,
}

impl EventFactory {
    #[must_use]
    pub fn new(base: impl Into<String>, course_title: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            course_title: course_title.into(),
            clock: Clock::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn started(&self, actor: &Actor) -> TrainingEvent {
        self.build(actor, Verb::Started, Activity::Course, &self.course_title, None)
    }

    #[must_use]
    pub fn viewed_video(&self, actor: &Actor, video_title: &str) -> TrainingEvent {
        self.build(actor, Verb::Viewed, Activity::Video, video_title, None)
    }

    #[must_use]
    pub fn viewed_segment(
        &self,
        actor: &Actor,
        video_title: &str,
        segment_title: &str,
    ) -> TrainingEvent {
        self.build(
            actor,
            Verb::Viewed,
            Activity::Video,
            video_title,
            Some(("segment", Value::from(segment_title))),
        )
    }

    #[must_use]
    pub fn retried(&self, actor: &Actor, video_title: &str) -> TrainingEvent {
        self.build(actor, Verb::Retried, Activity::Video, video_title, None)
    }

    #[must_use]
    pub fn completed(&self, actor: &Actor) -> TrainingEvent {
        self.build(actor, Verb::Completed, Activity::Course, &self.course_title, None)
    }

    #[must_use]
    pub fn quitted(&self, actor: &Actor, session_seconds: u64) -> TrainingEvent {
        self.build(
            actor,
            Verb::Quitted,
            Activity::Course,
            &self.course_title,
            Some(("session_time", Value::from(session_seconds))),
        )
    }

    fn build(
        &self,
        actor: &Actor,
        verb: Verb,
        activity: Activity,
        object_name: &str,
        extension: Option<(&str, Value)>,
    ) -> TrainingEvent {
        let extensions = extension
            .map(|(name, value)| (format!("{}/extension/{name}", self.base), value))
            .into_iter()
            .collect();
        TrainingEvent {
            id: Uuid::new_v4(),
            timestamp: self.clock.now(),
            actor: actor.clone(),
            verb,
            verb_id: format!("{}/verbs/{}", self.base, verb.as_str()),
            object_id: format!("{}/activities/{}", self.base, activity.slug()),
            object_name: object_name.to_owned(),
            extensions,
        }
    }
}

/// Outbound emitter. Fire and forget: no acknowledgement, no retry.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TrainingEvent);
}

/// Writes each event to the log as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: TrainingEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => info!(verb = %event.verb, event = %json, "training event"),
            Err(err) => info!(verb = %event.verb, "training event not encodable: {err}"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<TrainingEvent>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<TrainingEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn verbs(&self) -> Vec<Verb> {
        self.events().iter().map(|event| event.verb).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: TrainingEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use player_core::time::test_now;

    fn factory() -> EventFactory {
        EventFactory::new("https://xapi.example.com", "Safe Handling").with_clock(Clock::fixed(test_now()))
    }

    #[test]
    fn ids_are_built_from_the_base() {
        let actor = Actor::mailbox("Ana", "ana@example.com");
        let event = factory().viewed_video(&actor, "Loading dock");

        assert_eq!(event.verb_id, "https://xapi.example.com/verbs/viewed");
        assert_eq!(event.object_id, "https://xapi.example.com/activities/video");
        assert_eq!(event.object_name, "Loading dock");
        assert_eq!(event.timestamp, test_now());
        assert!(event.extensions.is_empty());
    }

    #[test]
    fn segment_and_quit_events_carry_extensions() {
        let actor = Actor::mailbox("Ana", "ana@example.com");
        let factory = factory();

        let segment = factory.viewed_segment(&actor, "Loading dock", "Helmet off");
        assert_eq!(
            segment.extensions.get("https://xapi.example.com/extension/segment"),
            Some(&Value::from("Helmet off"))
        );

        let quit = factory.quitted(&actor, 95);
        assert_eq!(quit.object_name, "Safe Handling");
        assert_eq!(quit.extension("session_time"), Some(&Value::from(95_u64)));
        assert_ne!(segment.id, quit.id);
    }

    #[test]
    fn recording_sink_keeps_order() {
        let actor = Actor::mailbox("Ana", "ana@example.com");
        let factory = factory();
        let sink = RecordingSink::new();
        sink.emit(factory.started(&actor));
        sink.emit(factory.completed(&actor));
        assert_eq!(sink.verbs(), vec![Verb::Started, Verb::Completed]);
    }
}
