//! Render-loop lifecycle.
//!
//! [`lifecycle::reduce`] decides when the loop should run; [`LifecycleGuard`]
//! executes those decisions against [`RunloopCallbacks`]; [`Ticker`] is the
//! per-frame driver; [`Session`] ties a guard to a quality controller.

pub mod guard;
pub mod lifecycle;
pub mod session;
pub mod ticker;

pub use guard::{GuardStatus, LifecycleGuard, ListenError, RunloopCallbacks, SignalChannel, SignalHost};
pub use lifecycle::{
    reduce, Effect, EnvironmentSnapshot, LifecycleConfig, LifecycleEvent, LifecycleState, Reason,
    TimerKind,
};
pub use session::{FrameOutcome, ProbeTicket, Session};
pub use ticker::{FrameTick, Ticker};
