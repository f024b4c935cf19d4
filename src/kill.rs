//! Process termination through external commands.
//!
//! A `KillCommand` is run by a ladder of strategies, least privileged first.
//! The pid is always passed as its own argument, never through a shell.

use std::fmt;
use std::process::{Command, ExitStatus};
use tracing::{info, warn};

/// Program used to end a process.
pub const KILL_PROGRAM: &str = "kill";

/// Program used to retry with elevated privileges.
pub const SUDO_PROGRAM: &str = "sudo";

/// Makes sudo fail instead of prompting for a password.
pub const SUDO_NON_INTERACTIVE: &str = "-n";

/// "terminate process <pid>" as program plus argv.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillCommand {
    program: String,
    pid: i32,
}

impl KillCommand {
    pub fn new(pid: i32) -> Self {
        Self::with_program(KILL_PROGRAM, pid)
    }

    pub fn with_program(program: impl Into<String>, pid: i32) -> Self {
        Self {
            program: program.into(),
            pid,
        }
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> Vec<String> {
        vec![self.pid.to_string()]
    }
}

impl fmt::Display for KillCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program, self.pid)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TerminateError {
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}")]
    Rejected { command: String, status: ExitStatus },
}

/// One way of running a `KillCommand`.
pub trait Escalation {
    fn name(&self) -> &'static str;
    fn run(&self, cmd: &KillCommand) -> Result<(), TerminateError>;
}

fn run_command(mut command: Command, label: String) -> Result<(), TerminateError> {
    let status = command.status().map_err(|source| TerminateError::Spawn {
        command: label.clone(),
        source,
    })?;

    if status.success() {
        Ok(())
    } else {
        Err(TerminateError::Rejected {
            command: label,
            status,
        })
    }
}

/// Runs the command as the current user.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unprivileged;

impl Escalation for Unprivileged {
    fn name(&self) -> &'static str {
        "unprivileged"
    }

    fn run(&self, cmd: &KillCommand) -> Result<(), TerminateError> {
        let mut command = Command::new(cmd.program());
        command.args(cmd.args());
        run_command(command, cmd.to_string())
    }
}

/// Runs the command through non-interactive sudo.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sudo;

impl Sudo {
    fn command(cmd: &KillCommand) -> Command {
        let mut command = Command::new(SUDO_PROGRAM);
        command
            .arg(SUDO_NON_INTERACTIVE)
            .arg(cmd.program())
            .args(cmd.args());
        command
    }
}

impl Escalation for Sudo {
    fn name(&self) -> &'static str {
        "sudo"
    }

    fn run(&self, cmd: &KillCommand) -> Result<(), TerminateError> {
        run_command(
            Self::command(cmd),
            format!("{} {} {}", SUDO_PROGRAM, SUDO_NON_INTERACTIVE, cmd),
        )
    }
}

/// Unprivileged first, then sudo when `sudo_fallback` is set.
pub fn default_ladder(sudo_fallback: bool) -> Vec<Box<dyn Escalation>> {
    let mut ladder: Vec<Box<dyn Escalation>> = vec![Box::new(Unprivileged)];
    if sudo_fallback {
        ladder.push(Box::new(Sudo));
    }
    ladder
}

/// Tries each strategy in order until one succeeds.
pub fn terminate(cmd: &KillCommand, ladder: &[Box<dyn Escalation>]) -> bool {
    for strategy in ladder {
        info!("Try exec \"{}\" ({})", cmd, strategy.name());
        match strategy.run(cmd) {
            Ok(()) => return true,
            Err(e) => warn!("Termination via {} failed: {}", strategy.name(), e),
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::os::unix::process::ExitStatusExt;
    use std::rc::Rc;

    struct Fake {
        name: &'static str,
        succeed: bool,
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl Escalation for Fake {
        fn name(&self) -> &'static str {
            self.name
        }

        fn run(&self, cmd: &KillCommand) -> Result<(), TerminateError> {
            self.calls
                .borrow_mut()
                .push(format!("{}: {}", self.name, cmd));
            if self.succeed {
                Ok(())
            } else {
                Err(TerminateError::Rejected {
                    command: cmd.to_string(),
                    status: ExitStatus::from_raw(1 << 8),
                })
            }
        }
    }

    fn ladder(results: &[(&'static str, bool)]) -> (Vec<Box<dyn Escalation>>, Rc<RefCell<Vec<String>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let ladder = results
            .iter()
            .map(|&(name, succeed)| {
                Box::new(Fake {
                    name,
                    succeed,
                    calls: calls.clone(),
                }) as Box<dyn Escalation>
            })
            .collect();
        (ladder, calls)
    }

    #[test]
    fn test_kill_command_argv() {
        let cmd = KillCommand::new(4242);
        assert_eq!(cmd.program(), "kill");
        assert_eq!(cmd.args(), vec!["4242".to_string()]);
        assert_eq!(cmd.to_string(), "kill 4242");
    }

    #[test]
    fn test_terminate_first_strategy_succeeds() {
        let (ladder, calls) = ladder(&[("plain", true), ("elevated", true)]);
        assert!(terminate(&KillCommand::new(10), &ladder));
        assert_eq!(*calls.borrow(), vec!["plain: kill 10".to_string()]);
    }

    #[test]
    fn test_terminate_falls_back_to_elevated() {
        let (ladder, calls) = ladder(&[("plain", false), ("elevated", true)]);
        assert!(terminate(&KillCommand::new(10), &ladder));
        assert_eq!(
            *calls.borrow(),
            vec!["plain: kill 10".to_string(), "elevated: kill 10".to_string()]
        );
    }

    #[test]
    fn test_terminate_all_strategies_fail() {
        let (ladder, calls) = ladder(&[("plain", false), ("elevated", false)]);
        assert!(!terminate(&KillCommand::new(10), &ladder));
        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn test_terminate_empty_ladder() {
        assert!(!terminate(&KillCommand::new(10), &[]));
    }

    #[test]
    fn test_unprivileged_missing_program_is_spawn_error() {
        let cmd = KillCommand::with_program("herakles-no-such-kill-binary", 1);
        match Unprivileged.run(&cmd) {
            Err(TerminateError::Spawn { command, .. }) => {
                assert_eq!(command, "herakles-no-such-kill-binary 1");
            }
            other => panic!("expected spawn error, got {:?}", other),
        }
    }

    #[test]
    fn test_sudo_never_prompts() {
        let command = Sudo::command(&KillCommand::new(4242));
        assert_eq!(command.get_program(), "sudo");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, vec!["-n", "kill", "4242"]);
    }

    #[test]
    fn test_default_ladder() {
        let names: Vec<_> = default_ladder(true).iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["unprivileged", "sudo"]);
        assert_eq!(default_ladder(false).len(), 1);
    }
}
