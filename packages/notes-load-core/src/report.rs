//! Run summary, threshold evaluation and output.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::check::CheckCounts;
use crate::error::LoadError;

/// Aggregated result of one check over a run.
#[derive(Debug, Clone, Serialize)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_failure: Option<String>,
}

impl From<CheckCounts> for CheckSummary {
    fn from(counts: CheckCounts) -> Self {
        Self {
            name: counts.check.name().to_string(),
            passes: counts.passes,
            fails: counts.fails,
            first_failure: counts.first_failure,
        }
    }
}

/// Outcome of a whole load run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub base_url: String,
    pub vus: usize,
    /// Iterations started and finished (completed or returned early)
    pub iterations: u64,
    /// Iterations that stopped before the last request step
    pub early_returns: u64,
    pub elapsed_ms: u64,
    /// Whether the run was stopped by a shutdown signal
    pub interrupted: bool,
    pub checks: Vec<CheckSummary>,
}

impl RunSummary {
    pub fn new(
        base_url: String,
        vus: usize,
        iterations: u64,
        early_returns: u64,
        elapsed: Duration,
        interrupted: bool,
        counts: Vec<CheckCounts>,
    ) -> Self {
        Self {
            base_url,
            vus,
            iterations,
            early_returns,
            elapsed_ms: elapsed.as_millis() as u64,
            interrupted,
            checks: counts.into_iter().map(CheckSummary::from).collect(),
        }
    }

    pub fn total_passes(&self) -> u64 {
        self.checks.iter().map(|c| c.passes).sum()
    }

    pub fn total_fails(&self) -> u64 {
        self.checks.iter().map(|c| c.fails).sum()
    }

    /// Fraction of passing checks. A run with no checks has rate 0.
    pub fn pass_rate(&self) -> f64 {
        let total = self.total_passes() + self.total_fails();
        if total == 0 {
            0.0
        } else {
            self.total_passes() as f64 / total as f64
        }
    }

    /// True when no minimum is set, or the pass rate reaches it.
    pub fn meets_threshold(&self, min_check_rate: Option<f64>) -> bool {
        match min_check_rate {
            Some(min) => self.pass_rate() >= min,
            None => true,
        }
    }

    /// Text report, one line per check.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Target: {}\n", self.base_url));
        out.push_str(&format!(
            "VUs: {}, iterations: {}, early returns: {}, elapsed: {:.2}s{}\n",
            self.vus,
            self.iterations,
            self.early_returns,
            self.elapsed_ms as f64 / 1000.0,
            if self.interrupted { " (interrupted)" } else { "" }
        ));
        out.push_str(&format!("{}\n", "-".repeat(60)));

        for check in &self.checks {
            let total = check.passes + check.fails;
            if total == 0 {
                out.push_str(&format!("  -  {:<22} not evaluated\n", check.name));
                continue;
            }
            let mark = if check.fails == 0 { "✅" } else { "❌" };
            out.push_str(&format!(
                "  {} {:<22} {:>6.2}% ({} pass / {} fail)\n",
                mark,
                check.name,
                check.passes as f64 * 100.0 / total as f64,
                check.passes,
                check.fails
            ));
            if let Some(reason) = &check.first_failure {
                out.push_str(&format!("       first failure: {}\n", reason));
            }
        }

        out.push_str(&format!("{}\n", "-".repeat(60)));
        out.push_str(&format!(
            "Checks: {:.2}% ({} of {})\n",
            self.pass_rate() * 100.0,
            self.total_passes(),
            self.total_passes() + self.total_fails()
        ));
        out
    }

    /// Writes the summary as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), LoadError> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::Check;

    fn counts(check: Check, passes: u64, fails: u64) -> CheckCounts {
        CheckCounts {
            check,
            passes,
            fails,
            first_failure: (fails > 0).then(|| "unexpected status 500".to_string()),
        }
    }

    fn summary(checks: Vec<CheckCounts>) -> RunSummary {
        RunSummary::new(
            "http://localhost:8080".to_string(),
            2,
            10,
            1,
            Duration::from_millis(1500),
            false,
            checks,
        )
    }

    #[test]
    fn test_pass_rate_and_threshold() {
        let s = summary(vec![
            counts(Check::Health, 9, 1),
            counts(Check::Register, 10, 0),
        ]);
        assert_eq!(s.total_passes(), 19);
        assert_eq!(s.total_fails(), 1);
        assert!((s.pass_rate() - 0.95).abs() < 1e-9);
        assert!(s.meets_threshold(None));
        assert!(s.meets_threshold(Some(0.95)));
        assert!(!s.meets_threshold(Some(0.99)));
    }

    #[test]
    fn test_empty_run_fails_any_threshold() {
        let s = summary(vec![counts(Check::Health, 0, 0)]);
        assert_eq!(s.pass_rate(), 0.0);
        assert!(!s.meets_threshold(Some(0.0001)));
    }

    #[test]
    fn test_render_lists_every_check() {
        let s = summary(vec![
            counts(Check::Health, 3, 0),
            counts(Check::NoteNotModified, 1, 2),
            counts(Check::NoteEtag, 0, 0),
        ]);
        let text = s.render();
        assert!(text.contains("health 204"));
        assert!(text.contains("note 304"));
        assert!(text.contains("first failure: unexpected status 500"));
        assert!(text.contains("note etag present"));
        assert!(text.contains("not evaluated"));
        assert!(text.contains("early returns: 1"));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let s = summary(vec![counts(Check::Health, 2, 1)]);
        s.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["vus"], 2);
        assert_eq!(value["iterations"], 10);
        assert_eq!(value["elapsed_ms"], 1500);
        assert_eq!(value["checks"][0]["name"], "health 204");
        assert_eq!(value["checks"][0]["fails"], 1);
    }
}
