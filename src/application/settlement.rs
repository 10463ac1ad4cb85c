use crate::domain::cache::{CacheEntry, CacheKey};
use crate::domain::pledge::{PledgeIntent, PledgeState, PledgeStatus, PollSchedule};
use crate::domain::ports::{CacheStoreRef, NotifierRef, TransportRef};
use crate::domain::response::normalize_data;
use crate::error::{CacheError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How a watch over a pledge ended.
#[derive(Debug, PartialEq, Clone)]
pub enum PollOutcome {
    /// The pledge reached settled, expired or failed.
    Terminal(PledgeStatus),
    /// The schedule ran out; the last observed status stays in the cache.
    GaveUp(Option<PledgeStatus>),
    /// The owner stopped watching.
    Cancelled(Option<PledgeStatus>),
}

/// Submits pledges and observes their settlement.
#[derive(Clone)]
pub struct SettlementPoller {
    cache: CacheStoreRef,
    transport: TransportRef,
    notifier: NotifierRef,
    schedule: PollSchedule,
}

impl SettlementPoller {
    pub fn new(
        cache: CacheStoreRef,
        transport: TransportRef,
        notifier: NotifierRef,
        schedule: PollSchedule,
    ) -> Self {
        Self {
            cache,
            transport,
            notifier,
            schedule,
        }
    }

    pub fn schedule(&self) -> PollSchedule {
        self.schedule
    }

    /// Creates a pledge and seeds its status as pending.
    #[tracing::instrument(skip(self))]
    pub async fn submit_pledge(&self, amount_minor_units: u64) -> Result<PledgeIntent> {
        if amount_minor_units == 0 {
            return Err(CacheError::ValidationError(
                "Pledge amount must be positive".to_string(),
            ));
        }
        let raw = self
            .transport
            .post(
                "/pledges",
                json!({ "amountMinorUnits": amount_minor_units }),
            )
            .await?;
        let intent: PledgeIntent = parse_object(raw)?;

        self.cache
            .set(
                &CacheKey::PledgeStatus(intent.id.clone()),
                CacheEntry::PledgeStatus(PledgeStatus::pending()),
            )
            .await?;
        info!(pledge = %intent.id, invoice = %intent.invoice_ref, "pledge submitted");
        Ok(intent)
    }

    pub async fn fetch_status(&self, pledge_id: &str) -> Result<PledgeStatus> {
        let raw = self
            .transport
            .get(&format!("/pledges/{pledge_id}/status"))
            .await?;
        let status: PledgeStatus = parse_object(raw)?;
        status.validate()
    }

    /// Polls the pledge status until it is terminal, the schedule gives up,
    /// or `cancel` flips to `true` (or its sender is dropped).
    ///
    /// The first request goes out immediately. No request is issued once
    /// cancellation has been observed.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn watch(
        &self,
        pledge_id: &str,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<PollOutcome> {
        let key = CacheKey::PledgeStatus(pledge_id.to_string());
        let started = Instant::now();
        let mut last: Option<PledgeStatus> = None;

        loop {
            if is_cancelled(&cancel) {
                debug!("watch cancelled");
                return Ok(PollOutcome::Cancelled(last));
            }

            let fetched = self.fetch_status(pledge_id).await;
            if is_cancelled(&cancel) {
                debug!("watch cancelled during poll, result dropped");
                return Ok(PollOutcome::Cancelled(last));
            }
            match fetched {
                Ok(status) => {
                    self.cache
                        .set(&key, CacheEntry::PledgeStatus(status.clone()))
                        .await?;
                    last = Some(status);
                }
                Err(e) => warn!(error = %e, "pledge status poll failed"),
            }

            if let Some(status) = last.as_ref().filter(|s| s.is_terminal()) {
                self.announce(status);
                return Ok(PollOutcome::Terminal(status.clone()));
            }

            let state = last.as_ref().map_or(PledgeState::Pending, |s| s.state);
            let Some(delay) = self.schedule.next_delay(started.elapsed(), state) else {
                info!("pledge still pending, polling stopped");
                return Ok(PollOutcome::GaveUp(last));
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = cancel.changed() => {
                    if changed.is_err() {
                        debug!("watch owner dropped");
                        return Ok(PollOutcome::Cancelled(last));
                    }
                }
            }
        }
    }

    /// Runs [`watch`](Self::watch) as a background task.
    pub fn spawn(&self, pledge_id: impl Into<String>) -> PollHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let poller = self.clone();
        let pledge_id = pledge_id.into();
        let task = tokio::spawn(async move { poller.watch(&pledge_id, cancel_rx).await });
        PollHandle {
            cancel: cancel_tx,
            task,
        }
    }

    fn announce(&self, status: &PledgeStatus) {
        match status.state {
            PledgeState::Settled => self.notifier.success("Pledge settled"),
            PledgeState::Expired => self.notifier.error("Pledge expired before payment"),
            PledgeState::Failed => self.notifier.error("Pledge payment failed"),
            PledgeState::Pending => {}
        }
    }
}

/// Owner's handle on a spawned watch.
pub struct PollHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<Result<PollOutcome>>,
}

impl PollHandle {
    /// Stops polling; no request is scheduled after this returns.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub async fn join(self) -> Result<PollOutcome> {
        self.task.await?
    }
}

/// True once the owner asked to stop or went away.
fn is_cancelled(cancel: &watch::Receiver<bool>) -> bool {
    *cancel.borrow() || cancel.has_changed().is_err()
}

/// Decodes an object payload, enveloped or bare.
fn parse_object<T: DeserializeOwned>(raw: Value) -> Result<T> {
    if !raw.is_object() {
        return Err(CacheError::malformed("Invalid response format"));
    }
    serde_json::from_value(normalize_data(raw)?)
        .map_err(|e| CacheError::malformed(format!("Invalid response structure: {e}")))
}
