use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    ApiError, Candidate, CredentialError, ScanKind, ScanOutcome, ScanProgress, ScanProvider,
};
use crate::logging::{log, log_scan_stage, obj, v_str, Domain, Level};
use crate::state::Config;

pub const CREDENTIAL_PREFIX: &str = "sk-ant-";
pub const EXCERPT_CHARS: usize = 300;
const API_VERSION: &str = "2023-06-01";

const PROMPT: &str = "Search for UK government policy U-turns or reversals from the last 24 hours. \
Look for news about the Labour government changing position, backing down, \
or reversing previously announced policies. \
Return JSON with any new U-turns found: {found: boolean, uturns: [{title, originalPolicy, reversal, date}]}";

pub fn validate_credential(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key.starts_with(CREDENTIAL_PREFIX)
}

/// One direct call to the messages endpoint with web search enabled. No retry.
pub struct LiveScan {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    credential: Option<String>,
}

#[derive(Deserialize, Debug)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize, Debug)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ScanReport {
    #[serde(default)]
    found: bool,
    #[serde(default)]
    uturns: Vec<Candidate>,
}

impl LiveScan {
    pub fn new(cfg: &Config, credential: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("uturn-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/v1/messages", cfg.anthropic_base.trim_end_matches('/')),
            model: cfg.scan_model.clone(),
            max_tokens: cfg.scan_max_tokens,
            credential,
        })
    }

    pub fn request_body(&self) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "tools": [{
                "type": "web_search_20250305",
                "name": "web_search"
            }],
            "messages": [{
                "role": "user",
                "content": PROMPT
            }]
        })
    }
}

#[async_trait]
impl ScanProvider for LiveScan {
    fn kind(&self) -> ScanKind {
        ScanKind::Live
    }

    async fn scan(&self, progress: &mut (dyn ScanProgress + Send)) -> Result<ScanOutcome> {
        let key = match self.credential.as_deref() {
            Some(k) if validate_credential(k) => k.trim(),
            _ => return Err(CredentialError.into()),
        };

        progress.stage("Searching the web for new U-turns...");
        log_scan_stage(self.kind().as_str(), "request", 1, 2);

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&self.request_body())
            .send()
            .await
            .context("request to messages endpoint failed")?;

        let status = resp.status();
        let body = resp.text().await.context("failed to read response body")?;
        if !status.is_success() {
            log(
                Level::Warn,
                Domain::Scan,
                "scan_http_error",
                obj(&[("status", v_str(status.as_str()))]),
            );
            return Err(ApiError { status: status.as_u16(), body }.into());
        }

        progress.stage("Reading results...");
        log_scan_stage(self.kind().as_str(), "interpret", 2, 2);
        Ok(interpret_response(&body))
    }
}

/// Turns a messages-endpoint body into an outcome. Never fails: anything that
/// does not parse becomes an excerpt.
pub fn interpret_response(body: &str) -> ScanOutcome {
    let text = match serde_json::from_str::<MessagesResponse>(body) {
        Ok(resp) => resp
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n"),
        Err(_) => body.to_string(),
    };

    let parsed = extract_json_object(&text)
        .and_then(|candidate| serde_json::from_str::<ScanReport>(candidate).ok());

    match parsed {
        Some(report) if report.found && !report.uturns.is_empty() => {
            ScanOutcome::Found(report.uturns)
        }
        Some(_) => ScanOutcome::NoNewUturns,
        None => ScanOutcome::Unparsed {
            excerpt: truncate_excerpt(&text, EXCERPT_CHARS),
        },
    }
}

/// First `{` through last `}`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

pub fn truncate_excerpt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
