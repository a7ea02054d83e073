use std::sync::Arc;
use std::time::Duration;

use player_core::match_alerts;
use player_core::model::{
    Course, CourseStatus, PracticeKind, ScreenDef, ScreenPosition, ScreenProgress, Segment,
    SuspendData,
};
use services::{
    Bootstrap, Player, PlayerConfig, RecordingSink, ReplayTarget, ScriptedPlayback,
    SessionBootstrap, Verb,
};
use storage::{CacheKey, CmiVocabulary, InMemoryCache, InMemoryScormApi, LocalCache, ScormSession};

const HOME: &str = "https://lms.example.com";

fn course(screens: usize) -> Course {
    let defs = (0..screens)
        .map(|i| ScreenDef {
            title: format!("Screen {}", i + 1),
            content: String::new(),
            video: format!("video-{i}.mp4"),
            kind: PracticeKind::Bad,
            segments: vec![Segment::new(0.0, 2.0, "Gloves").unwrap()],
        })
        .collect();
    Course::new("Warehouse safety", defs).unwrap()
}

fn screen(completed: bool) -> ScreenProgress {
    let segments = vec![Segment::new(0.0, 2.0, "Gloves").unwrap()];
    let alerts: &[f64] = if completed { &[1.0] } else { &[] };
    ScreenProgress::evaluated(match_alerts(alerts, &segments))
}

fn suspend_json(flags: &[bool]) -> String {
    let mut data = SuspendData::new();
    for (i, completed) in flags.iter().enumerate() {
        data.set_screen(i, screen(*completed));
    }
    data.to_json().unwrap()
}

async fn ready(bootstrap: &SessionBootstrap) -> services::ResumeState {
    match bootstrap.resolve().await.unwrap() {
        Bootstrap::Ready(resume) => resume,
        Bootstrap::NeedsLogin => panic!("expected a known learner"),
    }
}

fn build(
    bootstrap: &SessionBootstrap,
    resume: services::ResumeState,
    screens: usize,
    sink: &RecordingSink,
) -> Player {
    let mut player = Player::new(
        course(screens),
        &PlayerConfig::default(),
        bootstrap,
        resume,
        Arc::new(sink.clone()),
        Arc::new(ScriptedPlayback::new()),
    );
    player.start();
    player
}

fn store(api: &InMemoryScormApi, vocabulary: CmiVocabulary) -> Option<Arc<ScormSession>> {
    Some(Arc::new(ScormSession::new(Arc::new(api.clone()), vocabulary)))
}

async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn resume_position_is_deterministic() {
    let cases = [
        (Some(suspend_json(&[true, true, false])), ScreenPosition::Screen(2)),
        (Some(suspend_json(&[true, true, true])), ScreenPosition::Finish),
        (Some("{}".to_owned()), ScreenPosition::Welcome),
        (None, ScreenPosition::Welcome),
    ];
    for (raw, expected) in cases {
        let mut cache = InMemoryCache::new()
            .with_value(CacheKey::UserName, "Ana")
            .with_value(CacheKey::Email, "ana@example.com");
        if let Some(raw) = raw {
            cache = cache.with_value(CacheKey::SuspendData, raw);
        }
        let bootstrap = SessionBootstrap::new(Arc::new(cache), None, HOME);
        let resume = ready(&bootstrap).await;
        let player = build(&bootstrap, resume, 3, &RecordingSink::new());
        assert_eq!(player.position(), expected);
    }
}

#[tokio::test(start_paused = true)]
async fn completing_the_course_freezes_the_store_record() {
    let cache = InMemoryCache::new();
    let api = InMemoryScormApi::new()
        .with_value("cmi.core.student_name", "Doe, Jane")
        .with_value("cmi.core.student_id", "42");
    let bootstrap = SessionBootstrap::new(
        Arc::new(cache.clone()),
        store(&api, CmiVocabulary::SCORM_1_2),
        HOME,
    );
    let resume = ready(&bootstrap).await;
    let sink = RecordingSink::new();
    let mut player = build(&bootstrap, resume, 2, &sink);
    assert_eq!(player.first_name(), "Jane");
    assert_eq!(player.position(), ScreenPosition::Welcome);

    player.next().await.unwrap();
    player.record_alert_at(1.0).unwrap();
    assert!(player.video_ended().await.unwrap().is_completed());
    assert_eq!(api.value("cmi.core.score.raw").as_deref(), Some("50"));

    player.next().await.unwrap();
    player.record_alert_at(0.5).unwrap();
    player.video_ended().await.unwrap();
    advance(Duration::from_millis(3500)).await;

    assert_eq!(player.next().await.unwrap(), ScreenPosition::Finish);
    assert_eq!(player.status(), CourseStatus::Completed);
    assert_eq!(player.progress_percent(), 100.0);
    assert_eq!(api.value("cmi.core.score.raw").as_deref(), Some("100"));
    assert_eq!(api.value("cmi.core.lesson_status").as_deref(), Some("completed"));
    assert_eq!(api.value("cmi.core.session_time").as_deref(), Some("0000:00:03"));
    assert!(api.is_terminated());
    assert_eq!(cache.get(CacheKey::Status).unwrap().as_deref(), Some("completed"));

    let store_writes = api.set_calls("cmi.suspend_data");
    let cache_writes = cache.write_count(CacheKey::SuspendData);
    assert_eq!(player.previous(), ScreenPosition::Screen(1));
    player.record_alert_at(1.5).unwrap();
    player.video_ended().await.unwrap();
    assert_eq!(api.set_calls("cmi.suspend_data"), store_writes);
    assert_eq!(cache.write_count(CacheKey::SuspendData), cache_writes + 1);

    assert_eq!(player.next().await.unwrap(), ScreenPosition::Finish);
    assert_eq!(
        sink.verbs(),
        vec![Verb::Started, Verb::Viewed, Verb::Viewed, Verb::Completed, Verb::Viewed]
    );

    player.terminate().await;
    assert_eq!(api.set_calls("cmi.core.session_time"), 1);
    assert_eq!(sink.verbs().last(), Some(&Verb::Quitted));
}

#[tokio::test(start_paused = true)]
async fn replay_completes_a_screen_and_persists_it() {
    let cache = InMemoryCache::new();
    let bootstrap = SessionBootstrap::new(Arc::new(cache.clone()), None, HOME);
    let resume = bootstrap.login("Ana", "ana@example.com").unwrap();
    let sink = RecordingSink::new();
    let mut player = build(&bootstrap, resume, 2, &sink);

    player.next().await.unwrap();
    player.video_ended().await.unwrap();
    let segment = player.replay_segment(ReplayTarget::Unmarked(0)).unwrap();
    assert_eq!(segment.title(), "Gloves");

    let settled = player.settle_replay().await.unwrap();
    assert!(settled.newly_completed);
    assert_eq!(player.next().await.unwrap(), ScreenPosition::Screen(1));

    let saved = cache.get(CacheKey::SuspendData).unwrap().unwrap();
    let saved = SuspendData::parse(&saved).unwrap();
    assert!(saved.screen(0).unwrap().is_completed());

    let viewed_segment = sink
        .events()
        .into_iter()
        .find(|event| event.extension("segment").is_some())
        .unwrap();
    assert_eq!(viewed_segment.object_name, "Screen 1");
}

#[tokio::test(start_paused = true)]
async fn navigating_away_cancels_a_running_replay() {
    let cache = InMemoryCache::new();
    let bootstrap = SessionBootstrap::new(Arc::new(cache.clone()), None, HOME);
    let resume = bootstrap.login("Ana", "ana@example.com").unwrap();
    let mut player = build(&bootstrap, resume, 2, &RecordingSink::new());

    player.next().await.unwrap();
    player.video_ended().await.unwrap();
    player.replay_segment(ReplayTarget::Unmarked(0)).unwrap();
    let writes = cache.write_count(CacheKey::SuspendData);

    assert_eq!(player.previous(), ScreenPosition::Welcome);
    assert!(player.settle_replay().await.is_none());
    advance(Duration::from_secs(5)).await;

    assert_eq!(cache.write_count(CacheKey::SuspendData), writes);
    assert!(player.snapshot().screen(0).unwrap().viewed_segments().is_empty());
}

#[tokio::test(start_paused = true)]
async fn quitting_an_unfinished_course_flushes_session_time() {
    let api = InMemoryScormApi::new()
        .with_value("cmi.learner_name", "Doe, Jane")
        .with_value("cmi.learner_id", "42")
        .with_value("cmi.completion_status", "incomplete");
    let bootstrap = SessionBootstrap::new(
        Arc::new(InMemoryCache::new()),
        store(&api, CmiVocabulary::SCORM_2004),
        HOME,
    );
    let resume = ready(&bootstrap).await;
    let sink = RecordingSink::new();
    let mut player = build(&bootstrap, resume, 2, &sink);

    advance(Duration::from_millis(2500)).await;
    assert_eq!(player.terminate().await, 2);

    assert_eq!(api.value("cmi.session_time").as_deref(), Some("PT0000H00M02S"));
    assert!(api.is_terminated());
    let quit = sink.events().pop().unwrap();
    assert_eq!(quit.verb, Verb::Quitted);
    assert_eq!(quit.extension("session_time"), Some(&serde_json::Value::from(2_u64)));
}

#[tokio::test(start_paused = true)]
async fn quitting_persists_the_snapshot_to_both_backends() {
    let cache = InMemoryCache::new();
    let api = InMemoryScormApi::new()
        .with_value("cmi.core.student_name", "Doe, Jane")
        .with_value("cmi.core.student_id", "42")
        .with_value("cmi.core.lesson_status", "incomplete")
        .with_value("cmi.suspend_data", &suspend_json(&[true, false]));
    let bootstrap = SessionBootstrap::new(
        Arc::new(cache.clone()),
        store(&api, CmiVocabulary::SCORM_1_2),
        HOME,
    );
    let resume = ready(&bootstrap).await;
    let mut player = build(&bootstrap, resume, 2, &RecordingSink::new());
    assert_eq!(player.position(), ScreenPosition::Screen(1));

    let cache_writes = cache.write_count(CacheKey::SuspendData);
    let store_writes = api.set_calls("cmi.suspend_data");
    player.terminate().await;

    assert_eq!(cache.write_count(CacheKey::SuspendData), cache_writes + 1);
    assert_eq!(api.set_calls("cmi.suspend_data"), store_writes + 1);
    assert_eq!(cache.get(CacheKey::SuspendData).unwrap(), api.value("cmi.suspend_data"));
    assert!(api.is_terminated());
}
