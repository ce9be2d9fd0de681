//! Periodic driver of the remote executor.
//!
//! Three ticks run side by side: Fetch asks the executor to scan every
//! source chain for new tasks, Execute advances known tasks, and
//! CredentialRefresh hands the executor a fresh storage token. A supervisor
//! owns the ticks. Transient transport faults that reach it re-register the
//! ticks and keep going; anything else stops every tick and is returned to
//! the caller.

mod tick;

pub use tick::TickKind;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::SchedulerSettings;
use crate::credentials::{CredentialError, CredentialProvider};
use crate::executor::{ExecutorApi, ExecutorError};
use crate::transport::TransientKind;
use crate::types::ContractId;
use tick::TickContext;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("executor is not running; configure and resume it first")]
    ExecutorNotRunning,

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("credential refresh failed: {0}")]
    Credential(#[from] CredentialError),

    #[error("{tick} tick panicked: {message}")]
    TickPanicked { tick: TickKind, message: String },
}

impl SchedulerError {
    pub fn transient_kind(&self) -> Option<TransientKind> {
        match self {
            Self::Executor(e) => e.transient_kind(),
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.transient_kind().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Initializing,
    AwaitingExecutorReady,
    Running,
    Recovering,
    Terminated,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initializing => "initializing",
            Self::AwaitingExecutorReady => "awaiting_executor_ready",
            Self::Running => "running",
            Self::Recovering => "recovering",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Where the executor keeps its task state. Re-sent with every fresh token.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub storage_url: String,
    pub keystore: ContractId,
}

pub struct Scheduler {
    ctx: Arc<TickContext>,
    state: watch::Sender<SchedulerState>,
    recoveries: AtomicU32,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(
        executor: Arc<dyn ExecutorApi>,
        credentials: Arc<dyn CredentialProvider>,
        settings: SchedulerSettings,
        engine: EngineSettings,
        shutdown: CancellationToken,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Initializing);
        Self {
            ctx: Arc::new(TickContext {
                executor,
                credentials,
                settings,
                engine,
            }),
            state,
            recoveries: AtomicU32::new(0),
            shutdown,
        }
    }

    pub fn state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Number of times the ticks were re-registered after a transient fault.
    pub fn recoveries(&self) -> u32 {
        self.recoveries.load(Ordering::Relaxed)
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }

    /// Run until shutdown (`Ok`) or a non-transient fault (`Err`).
    pub async fn run(&self) -> Result<(), SchedulerError> {
        self.set_state(SchedulerState::AwaitingExecutorReady);
        match self.ctx.executor.is_running().await {
            Ok(true) => {}
            Ok(false) => {
                error!("Executor not running");
                self.set_state(SchedulerState::Terminated);
                return Err(SchedulerError::ExecutorNotRunning);
            }
            Err(e) => {
                error!("Failed to query executor status: {}", e);
                self.set_state(SchedulerState::Terminated);
                return Err(e.into());
            }
        }

        info!(
            sources = ?self.ctx.settings.source_chains,
            workers = self.ctx.settings.workers.len(),
            fetch = ?self.ctx.settings.fetch_interval(),
            execute = ?self.ctx.settings.execute_interval(),
            token_update = ?self.ctx.settings.token_update_interval(),
            "Starting scheduler"
        );

        loop {
            let (faults, mut fault_rx) = mpsc::unbounded_channel();
            let ticks = self.shutdown.child_token();
            let mut handles = Vec::with_capacity(TickKind::ALL.len());
            for kind in TickKind::ALL {
                handles.push(tokio::spawn(tick::drive(
                    self.ctx.clone(),
                    kind,
                    faults.clone(),
                    ticks.clone(),
                )));
            }
            drop(faults);
            self.set_state(SchedulerState::Running);

            let fault = tokio::select! {
                _ = self.shutdown.cancelled() => None,
                fault = fault_rx.recv() => fault,
            };

            ticks.cancel();
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!("Tick task ended abnormally: {}", e);
                }
            }

            match fault {
                None => {
                    info!("Shutdown requested; scheduler stopped");
                    self.set_state(SchedulerState::Terminated);
                    return Ok(());
                }
                Some(e) if e.is_transient() => {
                    let attempt = self.recoveries.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(attempt, kind = ?e.transient_kind(), "Transient fault, re-registering ticks: {}", e);
                    self.set_state(SchedulerState::Recovering);
                }
                Some(e) => {
                    error!("Scheduler terminated: {}", e);
                    self.set_state(SchedulerState::Terminated);
                    return Err(e);
                }
            }
        }
    }
}
