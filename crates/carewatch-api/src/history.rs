// Alert-history HTTP client
//
// Wraps `reqwest::Client` for the two endpoints the gateway exposes next
// to the event socket: `GET /alerts` and `POST /acknowledge`.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::HttpConfig;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

// ── Models ───────────────────────────────────────────────────────────

/// Alert identifier. The gateway emits numeric ids, but string ids are
/// accepted so a backend change does not break deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AlertId(String);

impl AlertId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AlertId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for AlertId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AlertId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Str(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => Self(n.to_string()),
            RawId::Str(s) => Self(s),
        })
    }
}

/// One entry of the alert history, as returned by `GET /alerts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: AlertId,
    /// Open label set: `PANICO`, `QUEDA`, `FUMACA`, `VAZAMENTO_GAS`, `WIFI`, `INFO`, ...
    pub alert_type: String,
    #[serde(default)]
    pub message: String,
    /// `YYYY-MM-DD HH:MM:SS`, gateway local time.
    pub timestamp: String,
    #[serde(default)]
    pub acknowledged_by: Option<String>,
    #[serde(default)]
    pub acknowledged_at: Option<String>,
}

impl AlertRecord {
    /// Whether someone has acknowledged this alert. An empty name counts as "no".
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_by
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }

    /// Parse [`timestamp`](Self::timestamp), accepting both space and `T` separators.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.timestamp)
    }
}

/// Parse a gateway timestamp (`YYYY-MM-DD HH:MM:SS` or ISO-8601 without offset).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Envelope returned by mutating endpoints: `{"status": "success"|"error", "message"?}`.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

// ── HistoryClient ────────────────────────────────────────────────────

/// HTTP client for the gateway's alert-history API.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HistoryClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HistoryClient {
    /// Create a client for the API rooted at `base_url` (e.g. `http://10.0.0.2:86`).
    pub fn new(base_url: Url, config: &HttpConfig) -> Result<Self, Error> {
        let http = config.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the full alert history, in server order.
    ///
    /// `GET {base}/alerts`
    pub async fn list_alerts(&self) -> Result<Vec<AlertRecord>, Error> {
        let url = self.endpoint("alerts")?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: preview(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }

    /// Acknowledge an alert on behalf of `user`.
    ///
    /// `POST {base}/acknowledge` with form body `id={id}&user={user}`
    pub async fn acknowledge(&self, id: &AlertId, user: &str) -> Result<(), Error> {
        let url = self.endpoint("acknowledge")?;
        debug!(id = %id, user, "POST {}", url);

        let resp = self
            .http
            .post(url)
            .form(&[("id", id.as_str()), ("user", user)])
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        match serde_json::from_str::<StatusResponse>(&body) {
            Ok(parsed) if parsed.status == "success" => Ok(()),
            Ok(parsed) => Err(Error::Rejected {
                message: parsed
                    .message
                    .unwrap_or_else(|| "acknowledge failed".into()),
            }),
            Err(_) if !status.is_success() => Err(Error::Api {
                status: status.as_u16(),
                message: preview(&body),
            }),
            Err(e) => Err(Error::Deserialization {
                message: e.to_string(),
                body,
            }),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}
