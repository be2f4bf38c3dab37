//! Run configuration.

use std::time::Duration;

use crate::error::LoadError;

/// Environment variable consulted for the target base URL.
pub const BASE_URL_ENV: &str = "BASE_URL";

/// Base URL used when neither a flag nor the environment provides one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Load run configuration. Resolved once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Target service root, without trailing slash
    pub base_url: String,
    /// Number of concurrent virtual users
    pub vus: usize,
    /// Stop starting new iterations after this long
    pub duration: Option<Duration>,
    /// Stop after this many iterations in total (shared across VUs)
    pub iterations: Option<u64>,
    /// Sleep between iterations of one VU
    pub pace: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Emails cycle through `u0@t.io .. u{modulus-1}@t.io`
    pub email_modulus: u64,
    /// Password used for every synthetic account
    pub password: String,
    /// Title of the note created each iteration
    pub note_title: String,
    /// Body of the note created each iteration
    pub note_body: String,
    /// Minimum overall check pass rate (0.0-1.0) for the run to succeed
    pub min_check_rate: Option<f64>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            vus: 5,
            duration: Some(Duration::from_secs(30)),
            iterations: None,
            pace: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
            email_modulus: 1000,
            password: "Password1!".to_string(),
            note_title: "t".to_string(),
            note_body: "b".to_string(),
            min_check_rate: None,
        }
    }
}

impl LoadConfig {
    /// Picks the base URL: explicit value, then `BASE_URL`, then the default.
    pub fn resolve_base_url(explicit: Option<&str>) -> Result<String, LoadError> {
        resolve_base_url_from(explicit, std::env::var(BASE_URL_ENV).ok())
    }

    /// Checks that the configuration can drive a run.
    pub fn validate(&self) -> Result<(), LoadError> {
        normalize_base_url(&self.base_url)?;
        if self.vus == 0 {
            return Err(LoadError::Config("vus must be greater than 0".to_string()));
        }
        if self.email_modulus == 0 {
            return Err(LoadError::Config(
                "email modulus must be greater than 0".to_string(),
            ));
        }
        if self.duration.is_none() && self.iterations.is_none() {
            return Err(LoadError::Config(
                "either a duration or an iteration count is required".to_string(),
            ));
        }
        if let Some(rate) = self.min_check_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(LoadError::Config(format!(
                    "min check rate must be between 0 and 1, got {}",
                    rate
                )));
            }
        }
        Ok(())
    }
}

fn resolve_base_url_from(
    explicit: Option<&str>,
    from_env: Option<String>,
) -> Result<String, LoadError> {
    let raw = match explicit {
        Some(url) => url.to_string(),
        None => from_env
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
    };
    normalize_base_url(&raw)
}

/// Trims whitespace and trailing slashes, and rejects non-HTTP schemes.
pub fn normalize_base_url(raw: &str) -> Result<String, LoadError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| {
            LoadError::Config(format!("base url must start with http:// or https://: '{}'", raw))
        })?;
    if rest.is_empty() {
        return Err(LoadError::Config(format!("base url has no host: '{}'", raw)));
    }
    Ok(trimmed.to_string())
}

/// Parses durations such as `500ms`, `30s`, `5m`, `1h`. A bare number is seconds.
pub fn parse_duration(s: &str) -> Result<Duration, LoadError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(LoadError::Config("duration cannot be empty".to_string()));
    }

    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (value, unit) = s.split_at(split);
    let value: u64 = value
        .parse()
        .map_err(|_| LoadError::Config(format!("invalid numeric value in duration: '{}'", s)))?;

    let secs_per_unit = match unit {
        "ms" => return Ok(Duration::from_millis(value)),
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(LoadError::Config(format!(
                "unknown duration unit '{}'; use ms, s, m or h",
                unit
            )))
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| LoadError::Config(format!("duration too large: '{}'", s)))
}
