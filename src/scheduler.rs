//! Event loop — the single consumer of compositor events and child-exit
//! notifications.
//!
//! Each tick prepares a read and flushes, blocks until the compositor
//! connection or the child notifier is readable, dispatches protocol events,
//! reaps the child, and (until the command runs) advances every pending
//! capture and evaluates the launch gate.

use crate::compositor::Compositor;
use crate::context::{Context, Gate};
use crate::supervisor::{ChildOutcome, Supervisor, SupervisorError};
use std::os::fd::BorrowedFd;

/// Which sources became readable during a wait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub compositor: bool,
    pub child: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("failed to flush compositor requests: {0}")]
    Flush(#[source] std::io::Error),

    #[error("failed to read compositor events: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to dispatch compositor events: {0}")]
    Dispatch(String),

    #[error("readiness wait failed: {0}")]
    Poll(#[source] std::io::Error),

    #[error(transparent)]
    Child(#[from] SupervisorError),
}

/// A connection the loop can wait on and dispatch from.
pub trait EventSource {
    type Compositor: Compositor;

    fn context(&mut self) -> &mut Context<Self::Compositor>;

    /// Announce the intent to read and flush outgoing requests.
    fn prepare(&mut self) -> Result<(), LoopError>;

    /// Block until the connection or `child` is readable.
    fn wait(&mut self, child: BorrowedFd<'_>) -> Result<Readiness, LoopError>;

    /// Read (if `readable`) or cancel the prepared read, then dispatch
    /// everything queued.
    fn dispatch(&mut self, readable: bool) -> Result<(), LoopError>;
}

/// How a freeze ended when no loop-owned system call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Child(ChildOutcome),
    CaptureFailed,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Child(outcome) => outcome.exit_code(),
            Self::CaptureFailed => 1,
        }
    }
}

/// Run until the launched command exits or a capture fails.
pub fn run<S: EventSource>(
    source: &mut S,
    supervisor: &mut Supervisor,
    command: &str,
) -> Result<Outcome, LoopError> {
    let mut launched = false;
    let mut draining = 0;

    loop {
        // Gate evaluation closes the previous tick; running it first also
        // issues the initial captures before anything blocks.
        if !launched {
            match source.context().advance() {
                Gate::Launch => {
                    supervisor.spawn(command)?;
                    launched = true;
                }
                Gate::Wait => {}
                Gate::Drain { in_flight } => {
                    if in_flight != draining {
                        log::warn!(
                            "[LOOP] Capture failed, waiting for {} in-flight capture(s) before exiting",
                            in_flight
                        );
                        draining = in_flight;
                    }
                }
                Gate::Abort => {
                    log::error!("[LOOP] Capture failed, not launching `{}`", command);
                    return Ok(Outcome::CaptureFailed);
                }
            }
        }

        source.prepare()?;
        let readiness = source.wait(supervisor.notifier())?;
        source.dispatch(readiness.compositor)?;

        if readiness.child {
            if let Some(outcome) = supervisor.reap()? {
                return Ok(Outcome::Child(outcome));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_failure_exits_with_generic_failure() {
        assert_eq!(Outcome::CaptureFailed.exit_code(), 1);
    }

    #[test]
    fn child_outcome_is_propagated() {
        assert_eq!(Outcome::Child(ChildOutcome::Exited(42)).exit_code(), 42);
        assert_eq!(Outcome::Child(ChildOutcome::Signaled(15)).exit_code(), 143);
    }
}
