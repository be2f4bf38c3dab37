//! Pipeline behaviour against the stub service.

use std::time::Duration;

use notes_load_core::api::Credentials;
use notes_load_core::check::RecordedChecks;
use notes_load_core::workload::StepFlow;
use notes_load_core::{Check, CheckOutcome, FailReason, IterationOutcome, LoadConfig, Step};
use notes_stub_api::config::StubConfig;

use super::helpers::{start_stub, test_config, workload_for};

#[tokio::test]
async fn test_full_iteration_passes_every_check() {
    let stub = start_stub(StubConfig::default()).await;
    let workload = workload_for(&test_config(&stub.base_url));
    let recorded = RecordedChecks::new();

    let outcome = workload.run_iteration(7, &recorded).await;
    assert_eq!(outcome, IterationOutcome::Completed);

    let entries = recorded.entries();
    let checks: Vec<Check> = entries.iter().map(|(c, _)| *c).collect();
    assert_eq!(checks, Check::ALL.to_vec());
    for (check, outcome) in entries {
        assert_eq!(outcome, CheckOutcome::Pass, "check '{}' failed", check);
    }
}

#[tokio::test]
async fn test_concrete_scenario_step_by_step() {
    let stub = start_stub(StubConfig::default()).await;
    let workload = workload_for(&test_config(&stub.base_url));
    let recorded = RecordedChecks::new();

    let mut state = workload.start_iteration(7);
    assert_eq!(
        state.credentials,
        Credentials {
            email: "u7@t.io".to_string(),
            password: "Password1!".to_string(),
        }
    );

    assert_eq!(workload.register(&state, &recorded).await, StepFlow::Continue);
    assert_eq!(workload.login(&mut state, &recorded).await, StepFlow::Continue);
    assert!(state.token.as_deref().is_some_and(|t| !t.is_empty()));

    assert_eq!(
        workload.create_note(&mut state, &recorded).await,
        StepFlow::Continue
    );
    assert!(state.note_id.is_some());

    assert_eq!(
        workload.fetch_note(&mut state, &recorded).await,
        StepFlow::Continue
    );
    assert!(state.etag.as_deref().is_some_and(|e| e.starts_with("W/")));

    workload.fetch_note_conditional(&state, &recorded).await;
    assert_eq!(
        recorded.outcome_of(Check::NoteNotModified),
        Some(CheckOutcome::Pass)
    );
    assert_eq!(stub.store.user_count(), 1);
}

#[tokio::test]
async fn test_reregistration_is_accepted_as_conflict() {
    let stub = start_stub(StubConfig::default()).await;
    let workload = workload_for(&test_config(&stub.base_url));

    // Indices 3 and 1003 map onto the same account with the default modulus.
    let first = RecordedChecks::new();
    assert_eq!(
        workload.run_iteration(3, &first).await,
        IterationOutcome::Completed
    );
    let second = RecordedChecks::new();
    assert_eq!(
        workload.run_iteration(1003, &second).await,
        IterationOutcome::Completed
    );

    assert_eq!(second.outcome_of(Check::Register), Some(CheckOutcome::Pass));
    assert_eq!(second.outcome_of(Check::LoginToken), Some(CheckOutcome::Pass));
    assert_eq!(stub.store.user_count(), 1);
}

#[tokio::test]
async fn test_missing_note_id_degrades_without_crashing() {
    let stub = start_stub(StubConfig {
        omit_note_id: true,
        ..Default::default()
    })
    .await;
    let workload = workload_for(&test_config(&stub.base_url));
    let recorded = RecordedChecks::new();

    let outcome = workload.run_iteration(1, &recorded).await;
    assert_eq!(outcome, IterationOutcome::Completed);

    assert_eq!(recorded.outcome_of(Check::NoteCreate), Some(CheckOutcome::Pass));
    let missing = Some(CheckOutcome::Fail(FailReason::Missing("note id")));
    assert_eq!(recorded.outcome_of(Check::NoteId), missing);
    assert_eq!(recorded.outcome_of(Check::NoteGet), missing);
    assert_eq!(recorded.outcome_of(Check::NoteEtag), missing);
    assert_eq!(recorded.outcome_of(Check::NoteNotModified), missing);
}

#[tokio::test]
async fn test_missing_etag_skips_conditional_fetch() {
    let stub = start_stub(StubConfig {
        omit_etag: true,
        ..Default::default()
    })
    .await;
    let workload = workload_for(&test_config(&stub.base_url));
    let recorded = RecordedChecks::new();

    workload.run_iteration(1, &recorded).await;

    assert_eq!(recorded.outcome_of(Check::NoteGet), Some(CheckOutcome::Pass));
    assert_eq!(
        recorded.outcome_of(Check::NoteEtag),
        Some(CheckOutcome::Fail(FailReason::Missing("etag")))
    );
    assert_eq!(
        recorded.outcome_of(Check::NoteNotModified),
        Some(CheckOutcome::Fail(FailReason::Missing("etag")))
    );
}

#[tokio::test]
async fn test_failed_health_check_does_not_abort() {
    let stub = start_stub(StubConfig {
        health_status: 503,
        ..Default::default()
    })
    .await;
    let workload = workload_for(&test_config(&stub.base_url));
    let recorded = RecordedChecks::new();

    let outcome = workload.run_iteration(1, &recorded).await;
    assert_eq!(outcome, IterationOutcome::Completed);
    assert_eq!(
        recorded.outcome_of(Check::Health),
        Some(CheckOutcome::Fail(FailReason::UnexpectedStatus(503)))
    );
    assert_eq!(
        recorded.outcome_of(Check::NoteNotModified),
        Some(CheckOutcome::Pass)
    );
}

#[tokio::test]
async fn test_health_timeout_does_not_abort() {
    let stub = start_stub(StubConfig {
        health_delay_ms: 3_000,
        ..Default::default()
    })
    .await;
    let config = LoadConfig {
        request_timeout: Duration::from_millis(300),
        ..test_config(&stub.base_url)
    };
    let workload = workload_for(&config);
    let recorded = RecordedChecks::new();

    let outcome = workload.run_iteration(1, &recorded).await;
    assert_eq!(outcome, IterationOutcome::Completed);

    assert!(matches!(
        recorded.outcome_of(Check::Health),
        Some(CheckOutcome::Fail(FailReason::Transport(_)))
    ));
    for check in &Check::ALL[1..] {
        assert_eq!(
            recorded.outcome_of(*check),
            Some(CheckOutcome::Pass),
            "check '{}' failed",
            check
        );
    }
}

#[tokio::test]
async fn test_rejected_registration_returns_early() {
    let stub = start_stub(StubConfig::default()).await;
    let config = LoadConfig {
        password: "short".to_string(),
        ..test_config(&stub.base_url)
    };
    let workload = workload_for(&config);
    let recorded = RecordedChecks::new();

    let outcome = workload.run_iteration(1, &recorded).await;
    assert!(matches!(
        outcome,
        IterationOutcome::EarlyReturn {
            step: Step::Register,
            ..
        }
    ));
    assert_eq!(
        recorded.outcome_of(Check::Register),
        Some(CheckOutcome::Fail(FailReason::UnexpectedStatus(422)))
    );
    // Nothing after registration runs.
    assert!(recorded.outcome_of(Check::LoginStatus).is_none());
    assert_eq!(recorded.entries().len(), 2);
}

#[tokio::test]
async fn test_wrong_password_fails_login_and_dependents() {
    let stub = start_stub(StubConfig::default()).await;
    stub.store.register("u1@t.io", "Different1!").unwrap();

    let workload = workload_for(&test_config(&stub.base_url));
    let recorded = RecordedChecks::new();
    let outcome = workload.run_iteration(1, &recorded).await;
    assert_eq!(outcome, IterationOutcome::Completed);

    assert_eq!(recorded.outcome_of(Check::Register), Some(CheckOutcome::Pass));
    assert_eq!(
        recorded.outcome_of(Check::LoginStatus),
        Some(CheckOutcome::Fail(FailReason::UnexpectedStatus(401)))
    );
    let missing = Some(CheckOutcome::Fail(FailReason::Missing("token")));
    assert_eq!(recorded.outcome_of(Check::LoginToken), missing);
    assert_eq!(recorded.outcome_of(Check::NoteCreate), missing);
    assert_eq!(recorded.outcome_of(Check::NoteNotModified), missing);
}
