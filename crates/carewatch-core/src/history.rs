// ── Alert history service ──
//
// Domain wrapper around the history HTTP client: input validation,
// error translation and client-side filtering.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;
use url::Url;

use carewatch_api::{AlertId, AlertRecord, HistoryClient, HttpConfig};

use crate::error::CoreError;

// ── Filtering ────────────────────────────────────────────────────────

/// Acknowledgment status filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Acknowledged,
}

/// Client-side filter over alert records.
///
/// Records whose timestamp cannot be parsed are never excluded by the
/// date range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertFilter {
    pub status: StatusFilter,
    /// Case-insensitive match on `alert_type`.
    pub alert_type: Option<String>,
    /// Inclusive lower bound.
    pub since: Option<NaiveDateTime>,
    /// Inclusive upper bound.
    pub until: Option<NaiveDateTime>,
}

impl AlertFilter {
    pub fn matches(&self, record: &AlertRecord) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Pending => !record.is_acknowledged(),
            StatusFilter::Acknowledged => record.is_acknowledged(),
        };
        if !status_ok {
            return false;
        }

        if self
            .alert_type
            .as_deref()
            .is_some_and(|kind| !record.alert_type.eq_ignore_ascii_case(kind))
        {
            return false;
        }

        let Some(ts) = record.parsed_timestamp() else {
            return true;
        };
        self.since.is_none_or(|since| ts >= since) && self.until.is_none_or(|until| ts <= until)
    }
}

// ── AlertHistory ─────────────────────────────────────────────────────

/// Read and acknowledge the server-side alert log.
#[derive(Debug, Clone)]
pub struct AlertHistory {
    client: HistoryClient,
}

impl AlertHistory {
    pub fn new(base_url: Url, http: &HttpConfig) -> Result<Self, CoreError> {
        Ok(Self {
            client: HistoryClient::new(base_url, http)?,
        })
    }

    pub fn from_client(client: HistoryClient) -> Self {
        Self { client }
    }

    pub fn base_url(&self) -> &Url {
        self.client.base_url()
    }

    /// Fetch every record and keep those matching `filter`, in server order.
    pub async fn list(&self, filter: &AlertFilter) -> Result<Vec<AlertRecord>, CoreError> {
        let records = self.client.list_alerts().await?;
        let total = records.len();
        let kept: Vec<_> = records.into_iter().filter(|r| filter.matches(r)).collect();
        debug!(total, kept = kept.len(), "fetched alert history");
        Ok(kept)
    }

    /// Mark `id` as acknowledged by `user`.
    pub async fn acknowledge(&self, id: &AlertId, user: &str) -> Result<(), CoreError> {
        let user = user.trim();
        if user.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "acknowledging user name must not be empty".into(),
            });
        }
        if id.as_str().trim().is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "alert id must not be empty".into(),
            });
        }

        self.client.acknowledge(id, user).await.map_err(|e| {
            if e.is_not_found() {
                CoreError::AlertNotFound {
                    id: id.to_string(),
                }
            } else {
                CoreError::from(e)
            }
        })
    }
}
