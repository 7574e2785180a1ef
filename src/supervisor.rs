//! Process supervisor — launches the user command and reports how it ended.
//!
//! Child termination is observed through a descriptor: `signal-hook` writes
//! one byte into a socket pair on every SIGCHLD, and the event loop polls the
//! read end alongside the compositor connection. The handler itself touches
//! no other state, and reaping never blocks.

use signal_hook::consts::SIGCHLD;
use signal_hook::SigId;
use std::io::{self, Read};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::UnixStream;
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, ExitStatus};

const SHELL: &str = "/bin/sh";

/// How the launched command terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    Exited(i32),
    Signaled(i32),
}

impl ChildOutcome {
    fn from_status(status: ExitStatus) -> Option<Self> {
        if let Some(code) = status.code() {
            return Some(Self::Exited(code));
        }
        status.signal().map(Self::Signaled)
    }

    /// Normal exit propagates the code; death by signal maps to `128 + n`,
    /// which no successful run can produce.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Exited(code) => code,
            Self::Signaled(signal) => 128 + signal,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("failed to create child notification socket: {0}")]
    Notifier(#[source] io::Error),

    #[error("failed to register SIGCHLD handler: {0}")]
    Signal(#[source] io::Error),

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read child notification: {0}")]
    Notification(#[source] io::Error),

    #[error("failed to query child status: {0}")]
    Wait(#[source] io::Error),
}

pub struct Supervisor {
    notifier: UnixStream,
    sig_id: SigId,
    child: Option<Child>,
}

impl Supervisor {
    /// Install the SIGCHLD bridge. Must happen before any child is spawned.
    pub fn new() -> Result<Self, SupervisorError> {
        let (notifier, sender) = UnixStream::pair().map_err(SupervisorError::Notifier)?;
        notifier
            .set_nonblocking(true)
            .map_err(SupervisorError::Notifier)?;
        sender
            .set_nonblocking(true)
            .map_err(SupervisorError::Notifier)?;

        let sig_id =
            signal_hook::low_level::pipe::register(SIGCHLD, sender).map_err(SupervisorError::Signal)?;

        Ok(Self {
            notifier,
            sig_id,
            child: None,
        })
    }

    /// Readable whenever at least one SIGCHLD arrived since the last read.
    pub fn notifier(&self) -> BorrowedFd<'_> {
        self.notifier.as_fd()
    }

    pub fn has_child(&self) -> bool {
        self.child.is_some()
    }

    /// Run `command` through the shell with inherited stdio. Does not wait.
    pub fn spawn(&mut self, command: &str) -> Result<(), SupervisorError> {
        let child = Command::new(SHELL)
            .arg("-c")
            .arg(command)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                command: command.to_string(),
                source,
            })?;

        log::info!("[CHILD] Launched `{}` (pid {})", command, child.id());
        self.child = Some(child);
        Ok(())
    }

    /// Consume one notification and check whether the child has terminated.
    ///
    /// Returns `None` while the child is still alive (or was never spawned).
    pub fn reap(&mut self) -> Result<Option<ChildOutcome>, SupervisorError> {
        let mut byte = [0u8; 1];
        match self.notifier.read(&mut byte) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(SupervisorError::Notification(e)),
        }

        let Some(child) = self.child.as_mut() else {
            return Ok(None);
        };

        let Some(status) = child.try_wait().map_err(SupervisorError::Wait)? else {
            return Ok(None);
        };

        let outcome = ChildOutcome::from_status(status);
        match outcome {
            Some(ChildOutcome::Exited(code)) => {
                log::info!("[CHILD] Command exited with status {}", code);
            }
            Some(ChildOutcome::Signaled(signal)) => {
                log::error!(
                    "[CHILD] Command was terminated by signal {} ({})",
                    signal,
                    signal_hook::low_level::signal_name(signal).unwrap_or("unknown")
                );
            }
            None => log::debug!("[CHILD] Ignoring status change {:?}", status),
        }
        Ok(outcome)
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        signal_hook::low_level::unregister(self.sig_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_exit_keeps_the_code() {
        assert_eq!(ChildOutcome::Exited(0).exit_code(), 0);
        assert_eq!(ChildOutcome::Exited(42).exit_code(), 42);
    }

    #[test]
    fn signal_death_is_outside_the_exit_code_range() {
        let code = ChildOutcome::Signaled(9).exit_code();
        assert_eq!(code, 137);
        assert!(code > 128);
    }

    #[test]
    fn status_decoding() {
        assert_eq!(
            ChildOutcome::from_status(ExitStatus::from_raw(3 << 8)),
            Some(ChildOutcome::Exited(3))
        );
        assert_eq!(
            ChildOutcome::from_status(ExitStatus::from_raw(15)),
            Some(ChildOutcome::Signaled(15))
        );
    }

    #[test]
    fn spawned_command_is_reaped_once_it_exits() {
        let mut supervisor = Supervisor::new().unwrap();
        supervisor.spawn("exit 5").unwrap();
        assert!(supervisor.has_child());

        let outcome = loop {
            let notifier = supervisor.notifier();
            let mut fds = [rustix::event::PollFd::new(&notifier, rustix::event::PollFlags::IN)];
            let _ = rustix::event::poll(&mut fds, 1000);
            if let Some(outcome) = supervisor.reap().unwrap() {
                break outcome;
            }
        };
        assert_eq!(outcome, ChildOutcome::Exited(5));
    }

    #[test]
    fn reap_without_child_reports_nothing() {
        let mut supervisor = Supervisor::new().unwrap();
        assert!(!supervisor.has_child());
        assert_eq!(supervisor.reap().unwrap(), None);
    }
}
