//! Named pass/fail assertions and their aggregation.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

/// Every check the workload can emit, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Check {
    Health,
    Register,
    LoginStatus,
    LoginToken,
    NoteCreate,
    NoteId,
    NoteGet,
    NoteEtag,
    NoteNotModified,
}

impl Check {
    pub const ALL: [Check; 9] = [
        Check::Health,
        Check::Register,
        Check::LoginStatus,
        Check::LoginToken,
        Check::NoteCreate,
        Check::NoteId,
        Check::NoteGet,
        Check::NoteEtag,
        Check::NoteNotModified,
    ];

    /// Human-readable check name as shown in reports.
    pub fn name(self) -> &'static str {
        match self {
            Check::Health => "health 204",
            Check::Register => "register 200/409",
            Check::LoginStatus => "login 200",
            Check::LoginToken => "login token present",
            Check::NoteCreate => "note create 200",
            Check::NoteId => "note id present",
            Check::NoteGet => "note get 200",
            Check::NoteEtag => "note etag present",
            Check::NoteNotModified => "note 304",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    /// The response arrived with the wrong status
    UnexpectedStatus(u16),
    /// A value produced by an earlier step (or field/header) is absent
    Missing(&'static str),
    /// The request never produced a response
    Transport(String),
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::UnexpectedStatus(status) => write!(f, "unexpected status {}", status),
            FailReason::Missing(what) => write!(f, "missing {}", what),
            FailReason::Transport(msg) => write!(f, "transport: {}", msg),
        }
    }
}

/// Result of evaluating one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Pass,
    Fail(FailReason),
}

impl CheckOutcome {
    /// Pass when `got` equals one of `expected`.
    pub fn status(got: u16, expected: &[u16]) -> Self {
        if expected.contains(&got) {
            CheckOutcome::Pass
        } else {
            CheckOutcome::Fail(FailReason::UnexpectedStatus(got))
        }
    }

    /// Pass when the value is present.
    pub fn present<T>(value: Option<&T>, what: &'static str) -> Self
    where
        T: ?Sized,
    {
        match value {
            Some(_) => CheckOutcome::Pass,
            None => CheckOutcome::Fail(FailReason::Missing(what)),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, CheckOutcome::Pass)
    }
}

/// Destination of check results.
pub trait CheckSink: Send + Sync {
    fn record(&self, check: Check, outcome: &CheckOutcome);
}

#[derive(Debug, Default)]
struct CheckCounter {
    passes: AtomicU64,
    fails: AtomicU64,
}

/// Point-in-time counts for one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckCounts {
    pub check: Check,
    pub passes: u64,
    pub fails: u64,
    pub first_failure: Option<String>,
}

/// Lock-free pass/fail counters shared by all VUs.
///
/// Only the first failure reason of each check is kept, under a mutex that
/// is touched once per check per run.
#[derive(Debug, Default)]
pub struct CheckRegistry {
    counters: [CheckCounter; 9],
    first_failures: Mutex<HashMap<Check, String>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts for every check, in pipeline order.
    pub fn snapshot(&self) -> Vec<CheckCounts> {
        let first_failures = self.first_failures.lock();
        Check::ALL
            .iter()
            .map(|&check| {
                let counter = &self.counters[check.slot()];
                CheckCounts {
                    check,
                    passes: counter.passes.load(Ordering::Relaxed),
                    fails: counter.fails.load(Ordering::Relaxed),
                    first_failure: first_failures.get(&check).cloned(),
                }
            })
            .collect()
    }
}

impl CheckSink for CheckRegistry {
    fn record(&self, check: Check, outcome: &CheckOutcome) {
        let counter = &self.counters[check.slot()];
        match outcome {
            CheckOutcome::Pass => {
                counter.passes.fetch_add(1, Ordering::Relaxed);
            }
            CheckOutcome::Fail(reason) => {
                if counter.fails.fetch_add(1, Ordering::Relaxed) == 0 {
                    self.first_failures
                        .lock()
                        .entry(check)
                        .or_insert_with(|| reason.to_string());
                }
            }
        }
    }
}

/// Keeps every result in order. Used for single-iteration smoke runs.
#[derive(Debug, Default)]
pub struct RecordedChecks {
    entries: Mutex<Vec<(Check, CheckOutcome)>>,
}

impl RecordedChecks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Check, CheckOutcome)> {
        self.entries.lock().clone()
    }

    pub fn outcome_of(&self, check: Check) -> Option<CheckOutcome> {
        self.entries
            .lock()
            .iter()
            .find(|(c, _)| *c == check)
            .map(|(_, outcome)| outcome.clone())
    }
}

impl CheckSink for RecordedChecks {
    fn record(&self, check: Check, outcome: &CheckOutcome) {
        self.entries.lock().push((check, outcome.clone()));
    }
}
