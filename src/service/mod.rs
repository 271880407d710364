//! Service layer: the session state machine and the task that owns it.
//!
//! [`Session`] implements lobby, administrator and round transitions and
//! emits events through the [`super::domain::EventBus`]. [`Coordinator`]
//! serializes every command and timer firing onto that one `Session`.

pub mod coordinator;
pub mod session;

pub use coordinator::{Command, Coordinator, CoordinatorHandle, SessionRequest, TimerEvent};
pub use session::{RoundSchedule, RoundSummary, Session, SessionSettings, SessionSnapshot};
