//! Session coordinator: the single task that owns the [`Session`].
//!
//! Connections talk to the coordinator through a cloneable
//! [`CoordinatorHandle`]. Commands and timer firings are drained from two
//! channels by one loop and each is handled to completion before the next
//! is taken, so no two handlers ever interleave.
//!
//! Round timers are spawned tasks that sleep and then post an
//! epoch-tagged [`TimerEvent`] back to the loop. They are aborted when
//! their round settles, and a firing that slips through anyway is rejected
//! by the epoch check in [`Session`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::session::{RoundSchedule, Session, SessionSnapshot};
use crate::domain::{Clock, ParticipantId, RoundEpoch};
use crate::error::AuctionError;

/// A client action the session understands.
///
/// Payloads are already structurally valid; value checks (non-negative
/// amounts, positive durations) happen inside the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionRequest {
    /// Join or rejoin the lobby.
    JoinLobby {
        /// Requested display name.
        display_name: Option<String>,
    },
    /// Leave the lobby (and release the administrator role if held).
    LeaveLobby,
    /// Claim the administrator role.
    ClaimAdmin,
    /// Change the default round length.
    SetDuration {
        /// Requested seconds.
        seconds: f64,
    },
    /// Open a round.
    CallItem {
        /// Item label.
        label: Option<String>,
        /// Round length for this call only.
        duration_override_seconds: Option<f64>,
    },
    /// Place or replace a sealed bid.
    SubmitBid {
        /// Offered amount.
        amount: f64,
    },
}

impl SessionRequest {
    /// Short name used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::JoinLobby { .. } => "join-lobby",
            Self::LeaveLobby => "leave-lobby",
            Self::ClaimAdmin => "claim-admin",
            Self::SetDuration { .. } => "set-duration",
            Self::CallItem { .. } => "call-item",
            Self::SubmitBid { .. } => "submit-bid",
        }
    }
}

/// Messages accepted by the coordinator loop.
#[derive(Debug)]
pub enum Command {
    /// A connection opened; send it the current state.
    Connected(ParticipantId),
    /// A connection sent a request.
    Request {
        /// Sender.
        from: ParticipantId,
        /// The request.
        request: SessionRequest,
    },
    /// A connection closed.
    Disconnected(ParticipantId),
    /// Read-only snapshot for the HTTP API.
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// Timer firings posted back to the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The round's deadline plus grace has elapsed.
    Settle(RoundEpoch),
    /// Periodic authoritative tick.
    Tick(RoundEpoch),
}

/// Cheap, cloneable sender side of the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Registers a newly opened connection.
    ///
    /// # Errors
    ///
    /// Returns [`AuctionError::CoordinatorUnavailable`] if the loop has
    /// stopped.
    pub async fn connect(&self, id: ParticipantId) -> Result<(), AuctionError> {
        self.send(Command::Connected(id)).await
    }

    /// Forwards a client request.
    ///
    /// # Errors
    ///
    /// Returns [`AuctionError::CoordinatorUnavailable`] if the loop has
    /// stopped.
    pub async fn dispatch(
        &self,
        from: ParticipantId,
        request: SessionRequest,
    ) -> Result<(), AuctionError> {
        self.send(Command::Request { from, request }).await
    }

    /// Reports a closed connection.
    ///
    /// # Errors
    ///
    /// Returns [`AuctionError::CoordinatorUnavailable`] if the loop has
    /// stopped.
    pub async fn disconnect(&self, id: ParticipantId) -> Result<(), AuctionError> {
        self.send(Command::Disconnected(id)).await
    }

    /// Fetches a read-only snapshot of the session.
    ///
    /// # Errors
    ///
    /// Returns [`AuctionError::CoordinatorUnavailable`] if the loop has
    /// stopped.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, AuctionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| AuctionError::CoordinatorUnavailable)
    }

    async fn send(&self, command: Command) -> Result<(), AuctionError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| AuctionError::CoordinatorUnavailable)
    }
}

/// Timers armed for the open round.
#[derive(Debug)]
struct RoundTimers {
    epoch: RoundEpoch,
    settle: JoinHandle<()>,
    tick: JoinHandle<()>,
}

impl Drop for RoundTimers {
    fn drop(&mut self) {
        self.settle.abort();
        self.tick.abort();
    }
}

/// The coordinator loop state.
#[derive(Debug)]
pub struct Coordinator {
    session: Session,
    clock: Arc<dyn Clock>,
    commands: mpsc::Receiver<Command>,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
    timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    timers: Option<RoundTimers>,
}

impl Coordinator {
    /// Creates a coordinator around `session` and returns it with its
    /// handle. Call [`Coordinator::run`] (usually via [`Coordinator::spawn`])
    /// to start processing.
    #[must_use]
    pub fn new(
        session: Session,
        clock: Arc<dyn Clock>,
        queue_capacity: usize,
    ) -> (Self, CoordinatorHandle) {
        let (tx, commands) = mpsc::channel(queue_capacity.max(1));
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            session,
            clock,
            commands,
            timer_tx,
            timer_rx,
            timers: None,
        };
        (coordinator, CoordinatorHandle { tx })
    }

    /// Builds a coordinator and runs it on a new tokio task.
    #[must_use]
    pub fn spawn(
        session: Session,
        clock: Arc<dyn Clock>,
        queue_capacity: usize,
    ) -> (CoordinatorHandle, JoinHandle<()>) {
        let (coordinator, handle) = Self::new(session, clock, queue_capacity);
        let task = tokio::spawn(coordinator.run());
        (handle, task)
    }

    /// Processes commands and timer firings until every handle is dropped.
    pub async fn run(mut self) {
        tracing::debug!("session coordinator started");
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    self.guarded("command", |this| this.handle_command(command));
                }
                Some(timer) = self.timer_rx.recv() => {
                    self.guarded("timer", |this| this.handle_timer(timer));
                }
            }
        }
        self.timers = None;
        tracing::debug!("session coordinator stopped");
    }

    /// Runs one handler, treating a panic inside it as a dropped message.
    fn guarded(&mut self, what: &'static str, handler: impl FnOnce(&mut Self)) {
        if catch_unwind(AssertUnwindSafe(|| handler(self))).is_err() {
            tracing::error!(handler = what, "handler panicked; message dropped");
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connected(id) => {
                tracing::debug!(participant = %id, "connection opened");
                self.session.connect(id, self.clock.now());
            }
            Command::Request { from, request } => {
                let kind = request.kind();
                if let Err(err) = self.apply(from, request) {
                    tracing::debug!(
                        participant = %from,
                        request = kind,
                        code = err.error_code(),
                        %err,
                        "request dropped"
                    );
                }
            }
            Command::Disconnected(id) => {
                tracing::debug!(participant = %id, "connection closed");
                self.session.leave(id);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.session.snapshot());
            }
        }
    }

    fn apply(&mut self, from: ParticipantId, request: SessionRequest) -> Result<(), AuctionError> {
        match request {
            SessionRequest::JoinLobby { display_name } => {
                self.session.join(from, display_name.as_deref())?;
            }
            SessionRequest::LeaveLobby => {
                self.session.leave(from);
            }
            SessionRequest::ClaimAdmin => self.session.claim_admin(from)?,
            SessionRequest::SetDuration { seconds } => {
                self.session.set_duration(from, seconds)?;
            }
            SessionRequest::CallItem {
                label,
                duration_override_seconds,
            } => {
                let schedule = self.session.call_item(
                    from,
                    label.as_deref(),
                    duration_override_seconds,
                    self.clock.now(),
                )?;
                self.arm_timers(schedule);
            }
            SessionRequest::SubmitBid { amount } => self.session.submit_bid(from, amount)?,
        }
        Ok(())
    }

    fn handle_timer(&mut self, timer: TimerEvent) {
        let outcome = match timer {
            TimerEvent::Tick(epoch) => self.session.tick(epoch, self.clock.now()),
            TimerEvent::Settle(epoch) => {
                let settled = self.session.settle(epoch).map(|_| ());
                if self.timers.as_ref().is_some_and(|t| t.epoch == epoch) {
                    self.timers = None;
                }
                settled
            }
        };
        if let Err(err) = outcome {
            tracing::debug!(?timer, %err, "timer ignored");
        }
    }

    fn arm_timers(&mut self, schedule: RoundSchedule) {
        let RoundSchedule {
            epoch,
            settle_in,
            tick_every,
        } = schedule;

        let settle_tx = self.timer_tx.clone();
        let settle = tokio::spawn(async move {
            tokio::time::sleep(settle_in).await;
            let _ = settle_tx.send(TimerEvent::Settle(epoch));
        });

        let tick_tx = self.timer_tx.clone();
        let period = tick_every.max(Duration::from_millis(10));
        let tick = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                if tick_tx.send(TimerEvent::Tick(epoch)).is_err() {
                    break;
                }
            }
        });

        // Replacing an old set aborts it through Drop.
        self.timers = Some(RoundTimers {
            epoch,
            settle,
            tick,
        });
    }
}
