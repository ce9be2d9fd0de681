use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{EngineSettings, SchedulerError};
use crate::config::SchedulerSettings;
use crate::credentials::CredentialProvider;
use crate::executor::{ExecutorApi, RunningMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickKind {
    Fetch,
    Execute,
    CredentialRefresh,
}

impl TickKind {
    pub const ALL: [TickKind; 3] = [Self::Fetch, Self::Execute, Self::CredentialRefresh];

    /// Whether transient faults of this tick stay inside the tick.
    fn swallows_transient(self) -> bool {
        !matches!(self, Self::CredentialRefresh)
    }
}

impl fmt::Display for TickKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Execute => write!(f, "execute"),
            Self::CredentialRefresh => write!(f, "credential_refresh"),
        }
    }
}

/// Everything a tick invocation needs. Shared read-only by all ticks.
pub(super) struct TickContext {
    pub executor: Arc<dyn ExecutorApi>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub settings: SchedulerSettings,
    pub engine: EngineSettings,
}

impl TickContext {
    pub fn period(&self, kind: TickKind) -> Duration {
        match kind {
            TickKind::Fetch => self.settings.fetch_interval(),
            TickKind::Execute => self.settings.execute_interval(),
            TickKind::CredentialRefresh => self.settings.token_update_interval(),
        }
    }

    async fn invoke(self: Arc<Self>, kind: TickKind) -> Result<(), SchedulerError> {
        match kind {
            TickKind::Fetch => self.fetch().await,
            TickKind::Execute => self.execute().await,
            TickKind::CredentialRefresh => self.refresh_credentials().await,
        }
    }

    /// One `run(Fetch)` per source chain and worker, issued concurrently.
    /// Failed outcomes and transient faults are logged per chain; the first
    /// non-transient transport fault is returned once every call has settled.
    async fn fetch(&self) -> Result<(), SchedulerError> {
        let mut calls = JoinSet::new();
        for chain in &self.settings.source_chains {
            for worker in &self.settings.workers {
                let executor = self.executor.clone();
                let mode = RunningMode::Fetch(chain.clone(), worker.clone());
                let (chain, worker) = (chain.clone(), worker.clone());
                calls.spawn(async move { (chain, worker, executor.run(mode).await) });
            }
        }

        let mut fatal = None;
        while let Some(joined) = calls.join_next().await {
            let (chain, worker, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    fatal.get_or_insert(panicked(TickKind::Fetch, e));
                    continue;
                }
            };
            match result {
                Ok(Ok(output)) => {
                    info!(tick = %TickKind::Fetch, %chain, %worker, %output, "Fetched tasks");
                }
                Ok(Err(reason)) => {
                    warn!(tick = %TickKind::Fetch, %chain, %worker, %reason, "Fetch reported failure");
                }
                Err(e) if e.is_transient() => {
                    warn!(tick = %TickKind::Fetch, %chain, %worker, "Fetch failed: {}", e);
                }
                Err(e) => {
                    fatal.get_or_insert(SchedulerError::Executor(e));
                }
            }
        }

        fatal.map_or(Ok(()), Err)
    }

    async fn execute(&self) -> Result<(), SchedulerError> {
        match self.executor.run(RunningMode::Execute).await? {
            Ok(output) => info!(tick = %TickKind::Execute, %output, "Executed tasks"),
            Err(reason) => warn!(tick = %TickKind::Execute, %reason, "Execute reported failure"),
        }
        Ok(())
    }

    async fn refresh_credentials(&self) -> Result<(), SchedulerError> {
        let token = self.credentials.access_token().await?;
        self.executor
            .configure(
                &self.engine.storage_url,
                &token,
                &self.engine.keystore,
                false,
            )
            .await?;
        info!(tick = %TickKind::CredentialRefresh, "Storage access token refreshed");
        Ok(())
    }
}

fn panicked(tick: TickKind, err: JoinError) -> SchedulerError {
    let message = match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string()),
        Err(err) => err.to_string(),
    };
    SchedulerError::TickPanicked { tick, message }
}

/// Fire `kind` every period until `cancel` trips. The first firing is one
/// period after start. Each firing is its own task, so a slow invocation
/// never delays the next one; faults the tick does not absorb go to
/// `faults`. Dropping the loop aborts whatever is still in flight.
pub(super) async fn drive(
    ctx: Arc<TickContext>,
    kind: TickKind,
    faults: mpsc::UnboundedSender<SchedulerError>,
    cancel: CancellationToken,
) {
    let period = ctx.period(kind);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut inflight = JoinSet::new();

    debug!(tick = %kind, ?period, "Tick registered");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                debug!(tick = %kind, inflight = inflight.len(), "Tick fired");
                inflight.spawn(ctx.clone().invoke(kind));
            }
            Some(joined) = inflight.join_next() => {
                let outcome = match joined {
                    Ok(outcome) => outcome,
                    Err(e) if e.is_cancelled() => continue,
                    Err(e) => Err(panicked(kind, e)),
                };
                match outcome {
                    Ok(()) => {}
                    Err(e) if e.is_transient() && kind.swallows_transient() => {
                        warn!(tick = %kind, "Transient failure, waiting for next tick: {}", e);
                    }
                    Err(e) => {
                        // Receiver gone means the supervisor already moved on.
                        let _ = faults.send(e);
                    }
                }
            }
        }
    }

    debug!(tick = %kind, aborted = inflight.len(), "Tick stopped");
}
