//! Stub service configuration.

/// Stub service configuration.
#[derive(Debug, Clone)]
pub struct StubConfig {
    /// Request body read timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
    /// Longest accepted email address
    pub max_email_len: usize,
    /// Password length bounds (inclusive)
    pub min_password_len: usize,
    pub max_password_len: usize,
    /// Status returned by `/healthz`
    pub health_status: u16,
    /// Delay before `/healthz` answers, in milliseconds
    pub health_delay_ms: u64,
    /// Drop `id` from `POST /notes` responses
    pub omit_note_id: bool,
    /// Drop `ETag` headers from note responses
    pub omit_etag: bool,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5000,
            max_body_bytes: 1 << 20,
            max_email_len: 200,
            min_password_len: 8,
            max_password_len: 128,
            health_status: 204,
            health_delay_ms: 0,
            omit_note_id: false,
            omit_etag: false,
        }
    }
}
