//! "Scan for new U-turns": a side feature behind one trait so the page and the
//! listing code never care which variant is active.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::state::Config;

mod info;
mod live;
mod simulated;

pub use info::{InfoLink, InfoScan, DEFAULT_LINKS};
pub use live::{
    extract_json_object, interpret_response, truncate_excerpt, validate_credential, LiveScan,
    CREDENTIAL_PREFIX, EXCERPT_CHARS,
};
pub use simulated::{SimulatedScan, STAGES};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanKind {
    Disabled,
    Simulated,
    Live,
}

impl ScanKind {
    /// Unknown modes are treated as disabled.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" => ScanKind::Simulated,
            "live" => ScanKind::Live,
            _ => ScanKind::Disabled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanKind::Disabled => "disabled",
            ScanKind::Simulated => "simulated",
            ScanKind::Live => "live",
        }
    }

    /// `credential` is only read by the live variant; `last_updated` only by
    /// the disabled one.
    pub fn build(
        self,
        cfg: &Config,
        credential: Option<String>,
        last_updated: &str,
    ) -> Result<Box<dyn ScanProvider + Send + Sync>> {
        match self {
            ScanKind::Disabled => Ok(Box::new(InfoScan::new(last_updated))),
            ScanKind::Simulated => Ok(Box::new(SimulatedScan::new(Duration::from_millis(
                cfg.scan_stage_ms,
            )))),
            ScanKind::Live => Ok(Box::new(LiveScan::new(cfg, credential)?)),
        }
    }
}

/// Receives human-readable status lines while a scan runs.
pub trait ScanProgress {
    fn stage(&mut self, _msg: &str) {}
}

pub struct NullProgress;
impl ScanProgress for NullProgress {}

/// Collects stage messages; handy for tests and for rendering a transcript.
#[derive(Default)]
pub struct RecordedProgress {
    pub stages: Vec<String>,
}

impl ScanProgress for RecordedProgress {
    fn stage(&mut self, msg: &str) {
        self.stages.push(msg.to_string());
    }
}

#[async_trait]
pub trait ScanProvider {
    fn kind(&self) -> ScanKind;
    async fn scan(&self, progress: &mut (dyn ScanProgress + Send)) -> Result<ScanOutcome>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Candidate {
    pub title: String,
    pub original_policy: String,
    pub reversal: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    NoNewUturns,
    Found(Vec<Candidate>),
    /// The response had no usable JSON; a short excerpt of the raw text.
    Unparsed { excerpt: String },
    Info { last_updated: String, links: Vec<InfoLink> },
}

// =============================================================================
// Failures
// =============================================================================

/// Non-success HTTP answer from the messages endpoint.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: u16,
    pub body: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API returned {}: {}", self.status, truncate_excerpt(&self.body, 200))
    }
}

impl std::error::Error for ApiError {}

/// No stored credential, or one that does not look like an API key.
#[derive(Debug, Clone)]
pub struct CredentialError;

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing or malformed API key (expected a key starting with {})", CREDENTIAL_PREFIX)
    }
}

impl std::error::Error for CredentialError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Credential problem: offer to clear the stored key.
    Auth,
    Other,
}

pub fn classify_failure(err: &anyhow::Error) -> FailureKind {
    if err.downcast_ref::<CredentialError>().is_some() {
        return FailureKind::Auth;
    }
    match err.downcast_ref::<ApiError>() {
        Some(api) if matches!(api.status, 401 | 403) => FailureKind::Auth,
        _ => FailureKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn parse_modes() {
        assert_eq!(ScanKind::parse("LIVE"), ScanKind::Live);
        assert_eq!(ScanKind::parse("simulated"), ScanKind::Simulated);
        assert_eq!(ScanKind::parse("whatever"), ScanKind::Disabled);
    }

    #[test]
    fn classify_auth_statuses() {
        let err = anyhow::Error::new(ApiError { status: 401, body: "bad key".into() });
        assert_eq!(classify_failure(&err), FailureKind::Auth);
        let err = anyhow::Error::new(ApiError { status: 403, body: String::new() });
        assert_eq!(classify_failure(&err), FailureKind::Auth);
        let err = anyhow::Error::new(CredentialError);
        assert_eq!(classify_failure(&err), FailureKind::Auth);
    }

    #[test]
    fn classify_everything_else_as_other() {
        let err = anyhow::Error::new(ApiError { status: 529, body: "overloaded".into() });
        assert_eq!(classify_failure(&err), FailureKind::Other);
        assert_eq!(classify_failure(&anyhow!("connection reset")), FailureKind::Other);
    }

    #[test]
    fn classify_survives_context() {
        let err = anyhow::Error::new(ApiError { status: 401, body: String::new() })
            .context("scan failed");
        assert_eq!(classify_failure(&err), FailureKind::Auth);
    }
}
