//! One reconciliation pass over every stored record.
//!
//! A cycle loads a snapshot, walks each record's product URL, classifies the
//! landing and writes the flag back only when a definite verdict disagrees
//! with what is stored. Landing on a login page means every later result in
//! the cycle would be meaningless, so the cycle stops there and the operator
//! is told to refresh the credential.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::Serialize;

use crate::classifier::Classifier;
use crate::config::{WatchConfig, ENV_CREDENTIAL};
use crate::error::{Result, WatchError};
use crate::notifier::Notifier;
use crate::store::ItemStore;
use crate::types::{AbortReason, ClassificationResult, CycleOutcome, ItemRecord, Verdict};
use crate::walker::{session_headers, HttpTransport, RedirectWalker};

pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(100);

const MSG_CREDENTIAL_MISSING: &str =
    "⚠️ **skinwatch**: `BNET_COOKIE` is missing or unusable. Availability check skipped.";
const MSG_SESSION_INVALID: &str = "⛔ **skinwatch**: the Battle.net session cookie has expired or is invalid.\n\
     Update `BNET_COOKIE` and restart the checker.";
const MSG_STORE_UNAVAILABLE: &str =
    "⚠️ **skinwatch**: the item store could not be read. Availability check skipped.";

/// What happened to a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordAction {
    Updated,
    Unchanged,
    /// Classified `Unknown`; the stored flag is left alone.
    Skipped,
    /// The walk failed or the write did not land.
    Failed,
}

impl RecordAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordAction::Updated => "updated",
            RecordAction::Unchanged => "unchanged",
            RecordAction::Skipped => "skipped",
            RecordAction::Failed => "failed",
        }
    }
}

/// Result of probing a single code outside a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub code: String,
    pub url: String,
    #[serde(flatten)]
    pub classification: ClassificationResult,
    /// The stored record, when the code is known to the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored: Option<ItemRecord>,
    /// Set when the probe was asked to write a differing flag back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<RecordAction>,
}

// ---------------------------------------------------------------------------
// CycleRunner
// ---------------------------------------------------------------------------

pub struct CycleRunner<T, N> {
    store: Arc<dyn ItemStore>,
    walker: RedirectWalker<T>,
    classifier: Classifier,
    notifier: N,
    credential: Option<String>,
    base_url: String,
    request_delay: Duration,
}

impl<T: HttpTransport, N: Notifier> CycleRunner<T, N> {
    pub fn new(
        store: Arc<dyn ItemStore>,
        walker: RedirectWalker<T>,
        notifier: N,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            walker,
            classifier: Classifier::default(),
            notifier,
            credential: None,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_delay: DEFAULT_REQUEST_DELAY,
        }
    }

    /// Wire a runner from loaded configuration. Settings that would make
    /// every verdict meaningless are rejected here; a missing credential is
    /// not, since each cycle reports and notifies it.
    pub fn from_config(
        config: &WatchConfig,
        store: Arc<dyn ItemStore>,
        transport: T,
        notifier: N,
    ) -> Result<Self> {
        config.ensure_runnable()?;
        let walker = RedirectWalker::new(transport).with_max_redirects(config.max_redirects);
        Ok(Self::new(store, walker, notifier, &config.base_url)
            .with_credential(config.credential().map(str::to_owned))
            .with_request_delay(config.request_delay()))
    }

    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn product_url(&self, code: &str) -> String {
        format!("{}/{}", self.base_url, code)
    }

    /// Run one full cycle. Never fails: every problem ends up either in the
    /// outcome's counters or as its abort reason.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let mut outcome = CycleOutcome::begin();
        tracing::info!("availability cycle starting");

        let headers = match self.headers() {
            Ok(h) => h,
            Err(e) => {
                tracing::error!(error = %e, "cannot start cycle");
                self.notifier.notify(MSG_CREDENTIAL_MISSING).await;
                return self.finish(outcome.abort(AbortReason::ConfigurationMissing {
                    detail: e.to_string(),
                }));
            }
        };

        let records = match self.snapshot().await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "cannot load item snapshot");
                self.notifier.notify(MSG_STORE_UNAVAILABLE).await;
                return self.finish(outcome.abort(AbortReason::StoreUnavailable {
                    detail: e.to_string(),
                }));
            }
        };

        let total = records.len();
        outcome.total_records = total;
        tracing::info!(total, "checking item codes");

        for (idx, record) in records.iter().enumerate() {
            tokio::time::sleep(self.request_delay).await;

            let url = self.product_url(&record.code);
            let walk = match self.walker.walk_with_headers(&url, &headers).await {
                Ok(w) => w,
                Err(e) => {
                    tracing::warn!(code = %record.code, error = %e, "walk failed; record left unchanged");
                    outcome.failed_count += 1;
                    log_record(idx, total, record, None, RecordAction::Failed);
                    continue;
                }
            };

            let result = self.classifier.classify(&walk.final_url, walk.final_status);

            if result.verdict == Verdict::SessionInvalid {
                tracing::error!(
                    code = %record.code,
                    final_url = %result.final_url,
                    "landed on login page; session credential is no longer valid"
                );
                self.notifier.notify(MSG_SESSION_INVALID).await;
                return self.finish(outcome.abort(AbortReason::SessionInvalid {
                    code: record.code.clone(),
                    final_url: result.final_url,
                }));
            }

            let action = match result.verdict.as_flag() {
                None => {
                    tracing::info!(
                        code = %record.code,
                        final_url = %result.final_url,
                        final_status = result.final_status,
                        "unexpected landing"
                    );
                    outcome.unknown_count += 1;
                    RecordAction::Skipped
                }
                Some(flag) if flag == record.active => {
                    outcome.unchanged_count += 1;
                    RecordAction::Unchanged
                }
                Some(flag) => {
                    let action = self.apply(&record.code, flag).await;
                    match action {
                        RecordAction::Updated => outcome.updated_count += 1,
                        _ => outcome.failed_count += 1,
                    }
                    action
                }
            };

            log_record(idx, total, record, Some(result.verdict), action);
        }

        self.finish(outcome.finish())
    }

    /// Walk and classify a single code without touching the store, unless
    /// `apply` is set, in which case a differing definite verdict is written.
    pub async fn probe(&self, code: &str, apply: bool) -> Result<ProbeReport> {
        let headers = self.headers()?;
        let url = self.product_url(code);
        reqwest::Url::parse(&url).map_err(|e| WatchError::InvalidUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let walk = self.walker.walk_with_headers(&url, &headers).await?;
        let classification = self.classifier.classify(&walk.final_url, walk.final_status);
        let stored = self.snapshot().await?.into_iter().find(|r| r.code == code);

        let action = if apply {
            let record = stored
                .as_ref()
                .ok_or_else(|| WatchError::ItemNotFound(code.to_string()))?;
            Some(match classification.verdict.as_flag() {
                Some(flag) if flag != record.active => self.apply(code, flag).await,
                Some(_) => RecordAction::Unchanged,
                None => RecordAction::Skipped,
            })
        } else {
            None
        };

        Ok(ProbeReport {
            code: code.to_string(),
            url,
            classification,
            stored,
            action,
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let credential = self
            .credential
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                WatchError::ConfigurationMissing(format!("{ENV_CREDENTIAL} is not set"))
            })?;
        session_headers(credential)
    }

    async fn snapshot(&self) -> Result<Vec<ItemRecord>> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.list_all())
            .await
            .map_err(|e| WatchError::Store(format!("snapshot task failed: {e}")))?
    }

    /// Write `active` for `code`. Failures stay local to the record.
    async fn apply(&self, code: &str, active: bool) -> RecordAction {
        let store = Arc::clone(&self.store);
        let owned = code.to_string();
        let written = tokio::task::spawn_blocking(move || store.update_active_flag(&owned, active))
            .await
            .map_err(|e| WatchError::Store(format!("update task failed: {e}")))
            .and_then(|r| r);

        match written {
            Ok(true) => RecordAction::Updated,
            Ok(false) => {
                tracing::warn!(%code, "record disappeared before its flag could be written");
                RecordAction::Failed
            }
            Err(e) => {
                tracing::warn!(%code, error = %e, "flag update failed");
                RecordAction::Failed
            }
        }
    }

    fn finish(&self, outcome: CycleOutcome) -> CycleOutcome {
        if let Some(reason) = &outcome.abort_reason {
            tracing::error!(
                %reason,
                updated = outcome.updated_count,
                total = outcome.total_records,
                "availability cycle aborted"
            );
        } else {
            tracing::info!(
                total = outcome.total_records,
                updated = outcome.updated_count,
                unchanged = outcome.unchanged_count,
                unknown = outcome.unknown_count,
                failed = outcome.failed_count,
                "availability cycle finished"
            );
        }
        outcome
    }
}

fn log_record(
    idx: usize,
    total: usize,
    record: &ItemRecord,
    verdict: Option<Verdict>,
    action: RecordAction,
) {
    tracing::info!(
        "{}/{} | {} | {} ({}) | {} | {}",
        idx + 1,
        total,
        record.code,
        record.display_name,
        record.owner_group_name,
        verdict.map_or("error", Verdict::as_str),
        action.as_str()
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
