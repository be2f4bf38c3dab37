//! The per-iteration request pipeline.
//!
//! One iteration is the fixed sequence of [`Step`]s below. Steps share an
//! [`IterationState`]: each step reads the values it needs from it, records
//! its checks, and writes back what it extracted. A step whose inputs are
//! absent sends nothing and fails its checks with [`FailReason::Missing`].
//! A step whose request fails in transport fails its checks with
//! [`FailReason::Transport`]. Only registration can end an iteration early.

use std::time::Duration;

use crate::api::{parse_body, CreatedNote, Credentials, LoginResponse, NewNote, NoteId};
use crate::check::{Check, CheckOutcome, CheckSink, FailReason};
use crate::client::NotesClient;
use crate::config::LoadConfig;
use crate::error::LoadError;

/// Pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Health,
    Register,
    Login,
    CreateNote,
    FetchNote,
    FetchNoteConditional,
    Pace,
}

impl Step {
    pub const SEQUENCE: [Step; 7] = [
        Step::Health,
        Step::Register,
        Step::Login,
        Step::CreateNote,
        Step::FetchNote,
        Step::FetchNoteConditional,
        Step::Pace,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::Health => "health",
            Step::Register => "register",
            Step::Login => "login",
            Step::CreateNote => "create_note",
            Step::FetchNote => "fetch_note",
            Step::FetchNoteConditional => "fetch_note_conditional",
            Step::Pace => "pace",
        }
    }

    /// Checks a step emits, in order.
    pub fn checks(self) -> &'static [Check] {
        match self {
            Step::Health => &[Check::Health],
            Step::Register => &[Check::Register],
            Step::Login => &[Check::LoginStatus, Check::LoginToken],
            Step::CreateNote => &[Check::NoteCreate, Check::NoteId],
            Step::FetchNote => &[Check::NoteGet, Check::NoteEtag],
            Step::FetchNoteConditional => &[Check::NoteNotModified],
            Step::Pace => &[],
        }
    }
}

/// Values carried between the steps of one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationState {
    pub credentials: Credentials,
    pub token: Option<String>,
    pub note_id: Option<NoteId>,
    pub etag: Option<String>,
}

impl IterationState {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            token: None,
            note_id: None,
            etag: None,
        }
    }
}

/// Whether the pipeline proceeds after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFlow {
    Continue,
    Stop(String),
}

/// How an iteration ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Every request step ran (checks may still have failed)
    Completed,
    /// The pipeline returned early after `step`
    EarlyReturn { step: Step, reason: String },
}

/// The fixed auth + notes workload.
#[derive(Debug, Clone)]
pub struct Workload {
    client: NotesClient,
    password: String,
    note: NewNote,
    email_modulus: u64,
    pace: Duration,
}

impl Workload {
    pub fn new(client: NotesClient, config: &LoadConfig) -> Self {
        Self {
            client,
            password: config.password.clone(),
            note: NewNote {
                title: config.note_title.clone(),
                body: config.note_body.clone(),
            },
            email_modulus: config.email_modulus.max(1),
            pace: config.pace,
        }
    }

    pub fn client(&self) -> &NotesClient {
        &self.client
    }

    /// Interval the executor sleeps after each iteration.
    pub fn pace(&self) -> Duration {
        self.pace
    }

    /// Fresh state for the iteration with sequence number `index`.
    pub fn start_iteration(&self, index: u64) -> IterationState {
        IterationState::new(Credentials::for_index(
            index,
            self.email_modulus,
            &self.password,
        ))
    }

    /// Runs the request steps of one iteration. Pacing is left to the caller.
    pub async fn run_iteration<S: CheckSink + ?Sized>(
        &self,
        index: u64,
        sink: &S,
    ) -> IterationOutcome {
        let mut state = self.start_iteration(index);
        for step in Step::SEQUENCE {
            let flow = match step {
                Step::Health => self.health(sink).await,
                Step::Register => self.register(&state, sink).await,
                Step::Login => self.login(&mut state, sink).await,
                Step::CreateNote => self.create_note(&mut state, sink).await,
                Step::FetchNote => self.fetch_note(&mut state, sink).await,
                Step::FetchNoteConditional => self.fetch_note_conditional(&state, sink).await,
                Step::Pace => StepFlow::Continue,
            };
            if let StepFlow::Stop(reason) = flow {
                tracing::debug!(
                    iteration = index,
                    step = step.name(),
                    "iteration returned early: {}",
                    reason
                );
                return IterationOutcome::EarlyReturn { step, reason };
            }
        }
        IterationOutcome::Completed
    }

    /// `GET /healthz`, expecting 204. Never stops the pipeline.
    pub async fn health<S: CheckSink + ?Sized>(&self, sink: &S) -> StepFlow {
        match self.client.health().await {
            Ok(res) => {
                sink.record(Check::Health, &CheckOutcome::status(res.status, &[204]));
                StepFlow::Continue
            }
            Err(e) => transport_failure(Step::Health, e, sink),
        }
    }

    /// `POST /auth/register`, accepting 200 or 409. Anything else stops the iteration.
    pub async fn register<S: CheckSink + ?Sized>(
        &self,
        state: &IterationState,
        sink: &S,
    ) -> StepFlow {
        match self.client.register(&state.credentials).await {
            Ok(res) => {
                let outcome = CheckOutcome::status(res.status, &[200, 409]);
                let flow = match outcome {
                    CheckOutcome::Pass => StepFlow::Continue,
                    CheckOutcome::Fail(ref reason) => StepFlow::Stop(reason.to_string()),
                };
                sink.record(Check::Register, &outcome);
                flow
            }
            Err(e) => transport_failure(Step::Register, e, sink),
        }
    }

    /// `POST /auth/login`, expecting 200 and an `access` token.
    pub async fn login<S: CheckSink + ?Sized>(
        &self,
        state: &mut IterationState,
        sink: &S,
    ) -> StepFlow {
        match self.client.login(&state.credentials).await {
            Ok(res) => {
                sink.record(Check::LoginStatus, &CheckOutcome::status(res.status, &[200]));
                let login: LoginResponse = parse_body(&res.body);
                state.token = login.token().map(str::to_string);
                sink.record(
                    Check::LoginToken,
                    &CheckOutcome::present(state.token.as_ref(), "token"),
                );
                StepFlow::Continue
            }
            Err(e) => transport_failure(Step::Login, e, sink),
        }
    }

    /// `POST /notes` with the bearer token, expecting 200 and an `id`.
    pub async fn create_note<S: CheckSink + ?Sized>(
        &self,
        state: &mut IterationState,
        sink: &S,
    ) -> StepFlow {
        let Some(token) = state.token.as_deref() else {
            return skipped(Step::CreateNote, "token", sink);
        };
        match self.client.create_note(token, &self.note).await {
            Ok(res) => {
                sink.record(Check::NoteCreate, &CheckOutcome::status(res.status, &[200]));
                let created: CreatedNote = parse_body(&res.body);
                state.note_id = created.note_id().cloned();
                sink.record(
                    Check::NoteId,
                    &CheckOutcome::present(state.note_id.as_ref(), "note id"),
                );
                StepFlow::Continue
            }
            Err(e) => transport_failure(Step::CreateNote, e, sink),
        }
    }

    /// `GET /notes/{id}`, expecting 200 and an `ETag` header.
    pub async fn fetch_note<S: CheckSink + ?Sized>(
        &self,
        state: &mut IterationState,
        sink: &S,
    ) -> StepFlow {
        let (token, id) = match (state.token.as_deref(), state.note_id.as_ref()) {
            (None, _) => return skipped(Step::FetchNote, "token", sink),
            (_, None) => return skipped(Step::FetchNote, "note id", sink),
            (Some(token), Some(id)) => (token, id),
        };
        match self.client.get_note(token, id, None).await {
            Ok(res) => {
                sink.record(Check::NoteGet, &CheckOutcome::status(res.status, &[200]));
                state.etag = res.etag;
                sink.record(
                    Check::NoteEtag,
                    &CheckOutcome::present(state.etag.as_ref(), "etag"),
                );
                StepFlow::Continue
            }
            Err(e) => transport_failure(Step::FetchNote, e, sink),
        }
    }

    /// `GET /notes/{id}` with `If-None-Match`, expecting 304.
    pub async fn fetch_note_conditional<S: CheckSink + ?Sized>(
        &self,
        state: &IterationState,
        sink: &S,
    ) -> StepFlow {
        let (token, id, etag) = match (
            state.token.as_deref(),
            state.note_id.as_ref(),
            state.etag.as_deref(),
        ) {
            (None, _, _) => return skipped(Step::FetchNoteConditional, "token", sink),
            (_, None, _) => return skipped(Step::FetchNoteConditional, "note id", sink),
            (_, _, None) => return skipped(Step::FetchNoteConditional, "etag", sink),
            (Some(token), Some(id), Some(etag)) => (token, id, etag),
        };
        match self.client.get_note(token, id, Some(etag)).await {
            Ok(res) => {
                sink.record(
                    Check::NoteNotModified,
                    &CheckOutcome::status(res.status, &[304]),
                );
                StepFlow::Continue
            }
            Err(e) => transport_failure(Step::FetchNoteConditional, e, sink),
        }
    }
}

/// Fails every check of `step` because an input is absent. Nothing is sent.
fn skipped<S: CheckSink + ?Sized>(step: Step, missing: &'static str, sink: &S) -> StepFlow {
    let outcome = CheckOutcome::Fail(FailReason::Missing(missing));
    for &check in step.checks() {
        sink.record(check, &outcome);
    }
    StepFlow::Continue
}

/// Fails every check of `step` with the transport error. Only a failed
/// registration stops the iteration; later steps then skip on missing inputs.
fn transport_failure<S: CheckSink + ?Sized>(step: Step, err: LoadError, sink: &S) -> StepFlow {
    tracing::warn!(step = step.name(), "request failed: {}", err);
    let outcome = CheckOutcome::Fail(FailReason::Transport(err.to_string()));
    for &check in step.checks() {
        sink.record(check, &outcome);
    }
    match step {
        Step::Register => StepFlow::Stop(err.to_string()),
        _ => StepFlow::Continue,
    }
}
