use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_IDENTIFIER_ENDPOINT: &str = "https://www.uuidtools.com/api/generate/v4";
pub const DEFAULT_IDENTIFIER_TIMEOUT: Duration = Duration::from_secs(5);

/// A strategy for obtaining one correlation identifier.
pub trait IdentifierSource: Send + Sync {
    fn fetch(&self) -> anyhow::Result<String>;
}

/// Fetches an identifier from an HTTP service. The whole call is
/// bounded by the client timeout; any non-2xx status, transport
/// error or malformed body is an `Err`.
pub struct RemoteIdentifierSource {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl RemoteIdentifierSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("build identifier http client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl IdentifierSource for RemoteIdentifierSource {
    fn fetch(&self) -> anyhow::Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .context("identifier request failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("identifier service returned {status}");
        }
        let body = response.text().context("read identifier response body")?;
        let candidate =
            extract_identifier(&body).ok_or_else(|| anyhow!("malformed identifier response"))?;
        ensure_uuid_v4(&candidate)?;
        Ok(candidate)
    }
}

/// Generates an identifier in process.
#[derive(Debug, Default)]
pub struct LocalIdentifierSource;

impl IdentifierSource for LocalIdentifierSource {
    fn fetch(&self) -> anyhow::Result<String> {
        Ok(Uuid::new_v4().to_string())
    }
}

/// Resolves correlation identifiers: remote first when configured,
/// local generation on any remote failure. `get_id` never fails and
/// always returns a syntactically valid UUID v4.
pub struct IdentifierProvider {
    remote: Option<RemoteIdentifierSource>,
    local: LocalIdentifierSource,
}

impl IdentifierProvider {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_IDENTIFIER_ENDPOINT, DEFAULT_IDENTIFIER_TIMEOUT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let remote = match RemoteIdentifierSource::new(endpoint, timeout) {
            Ok(source) => Some(source),
            Err(err) => {
                debug!("identifier client unavailable, using local generation: {err:#}");
                None
            }
        };
        Self {
            remote,
            local: LocalIdentifierSource,
        }
    }

    /// No remote calls at all; every identifier is generated locally.
    pub fn local_only() -> Self {
        Self {
            remote: None,
            local: LocalIdentifierSource,
        }
    }

    pub fn get_id(&self) -> String {
        if let Some(remote) = &self.remote {
            match remote.fetch() {
                Ok(id) => return id,
                Err(err) => {
                    debug!("remote identifier fetch failed, falling back to local: {err:#}");
                }
            }
        }
        self.local
            .fetch()
            .unwrap_or_else(|_| Uuid::new_v4().to_string())
    }
}

impl Default for IdentifierProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_identifier(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => items
            .first()
            .and_then(Value::as_str)
            .map(ToString::to_string),
        Ok(Value::Object(map)) => map
            .get("uuid")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        Ok(Value::String(value)) => Some(value),
        Ok(_) => None,
        Err(_) => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
    }
}

fn ensure_uuid_v4(value: &str) -> anyhow::Result<()> {
    let parsed = Uuid::parse_str(value).with_context(|| format!("not a UUID: {value}"))?;
    if parsed.get_version_num() != 4 {
        bail!("expected UUID v4, got version {}", parsed.get_version_num());
    }
    Ok(())
}
