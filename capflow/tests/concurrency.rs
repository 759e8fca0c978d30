//! Cancellation, supersession and run isolation.

use capflow::prelude::*;
use capflow::testing::{
    assert_completed, assert_gapless, assert_not_degraded, plain_english_request, ScriptedProvider,
    SlowProvider, TestFixture, GENERATED_TEXT,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn slow_orchestrator(fixture: &TestFixture, delay_ms: u64) -> Arc<Orchestrator> {
    fixture.registry.register(
        CapabilityId::Generate,
        Arc::new(SlowProvider::new(
            CapabilityId::Generate,
            Duration::from_millis(delay_ms),
            "slow answer",
        )),
    );
    Arc::new(fixture.orchestrator(PipelineConfig::default()).unwrap())
}

#[tokio::test]
async fn cancelling_a_run_yields_no_outcome() {
    let fixture = TestFixture::new();
    let orchestrator = slow_orchestrator(&fixture, 5_000);

    let handle = orchestrator.spawn(plain_english_request()).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.cancel("user navigated away");

    let started = Instant::now();
    let outcome = handle.outcome().await;

    assert_eq!(
        outcome,
        RunOutcome::Cancelled {
            reason: "user navigated away".to_string()
        }
    );
    assert!(started.elapsed() < Duration::from_secs(2));

    let events = fixture.observer.events();
    assert_gapless(&events);
    assert!(events
        .iter()
        .all(|e| e.transition != StageTransition::Succeeded));
}

#[tokio::test]
async fn external_token_cancels_inline_run() {
    let fixture = TestFixture::new();
    let orchestrator = slow_orchestrator(&fixture, 5_000);
    let token = Arc::new(CancellationToken::new());

    let canceller = Arc::clone(&token);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel("shutdown");
    });

    let outcome = orchestrator
        .run_with_cancel(plain_english_request(), token)
        .await
        .unwrap();
    assert!(outcome.is_cancelled());
}

#[tokio::test]
async fn newer_request_supersedes_older_in_same_session() {
    let fixture = TestFixture::new();
    let orchestrator = slow_orchestrator(&fixture, 200);

    let first = orchestrator
        .submit_in_session("chat-7", plain_english_request())
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = orchestrator
        .submit_in_session("chat-7", PipelineRequest::new("What about at night?", Language::English))
        .unwrap();

    assert!(first.is_cancelled());
    assert_eq!(
        first.outcome().await,
        RunOutcome::Cancelled {
            reason: "superseded".to_string()
        }
    );

    let latest = second.outcome().await;
    assert_not_degraded(assert_completed(&latest));
    assert_eq!(orchestrator.active_sessions(), 0);
}

#[tokio::test]
async fn sessions_do_not_supersede_each_other() {
    let fixture = TestFixture::new();
    let orchestrator = slow_orchestrator(&fixture, 50);

    let a = orchestrator
        .submit_in_session("alice", plain_english_request())
        .unwrap();
    let b = orchestrator
        .submit_in_session("bob", plain_english_request())
        .unwrap();

    assert!(!a.outcome().await.is_cancelled());
    assert!(!b.outcome().await.is_cancelled());
}

#[tokio::test]
async fn concurrent_runs_are_isolated() {
    let fixture = TestFixture::new();
    let orchestrator = Arc::new(fixture.orchestrator(PipelineConfig::default()).unwrap());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            orchestrator
                .spawn(PipelineRequest::new(format!("Question number {i}"), Language::English))
                .unwrap()
        })
        .collect();
    let run_ids: HashSet<_> = handles.iter().map(RunHandle::run_id).collect();
    assert_eq!(run_ids.len(), 16);

    for handle in handles {
        let outcome = handle.outcome().await;
        assert_eq!(assert_completed(&outcome).text(), GENERATED_TEXT);
    }

    let events = fixture.observer.events();
    for run_id in run_ids {
        let run_events: Vec<_> = events.iter().filter(|e| e.run_id == run_id).cloned().collect();
        assert_eq!(run_events.len(), 2);
        assert_gapless(&run_events);
    }
}

#[tokio::test]
async fn registry_change_mid_run_does_not_affect_snapshot() {
    let fixture = TestFixture::new();
    let orchestrator = slow_orchestrator(&fixture, 100);

    let handle = orchestrator
        .spawn(plain_english_request().enable(CapabilityId::Summarize))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    fixture.registry.deregister(CapabilityId::Summarize);
    let replacement = Arc::new(ScriptedProvider::text(CapabilityId::Generate, "replacement"));
    fixture
        .registry
        .register(CapabilityId::Generate, replacement.clone());

    let outcome = handle.outcome().await;
    let outcome = assert_completed(&outcome);

    assert_not_degraded(outcome);
    assert_eq!(outcome.text(), capflow::testing::SUMMARY_TEXT);
    assert_eq!(replacement.call_count(), 0);
    assert_eq!(fixture.summarizer.call_count(), 1);
}

#[tokio::test]
async fn observer_deregistration_applies_to_later_runs() {
    let fixture = TestFixture::new();
    let orchestrator = fixture.orchestrator(PipelineConfig::default()).unwrap();
    let extra = Arc::new(CollectingObserver::new());
    let id = orchestrator.observers().register(extra.clone());

    orchestrator.run(plain_english_request()).await.unwrap();
    assert_eq!(extra.len(), 2);

    assert!(orchestrator.observers().deregister(id));
    orchestrator.run(plain_english_request()).await.unwrap();
    assert_eq!(extra.len(), 2);
    assert_eq!(fixture.observer.len(), 4);
}

#[tokio::test]
async fn channel_observer_streams_progress() {
    let fixture = TestFixture::new();
    let orchestrator = fixture.orchestrator(PipelineConfig::default()).unwrap();
    let (observer, mut receiver) = ChannelObserver::channel();
    orchestrator.observers().register(Arc::new(observer));

    orchestrator.run(plain_english_request()).await.unwrap();

    let first = receiver.recv().await.unwrap();
    let second = receiver.recv().await.unwrap();
    assert_eq!(first.status_line(), "[1] generate started");
    assert_eq!(second.status_line(), "[2] generate succeeded");
}
