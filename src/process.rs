//! Subprocess runner used to invoke the external ticket-granting command.

// std
use std::{ffi::OsString, process::Command};
// self
use crate::_prelude::*;

/// Captured result of a finished subprocess.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
	/// Standard output, decoded lossily as UTF-8.
	pub stdout: String,
	/// Standard error, decoded lossily as UTF-8.
	pub stderr: String,
	/// Exit code; `None` when the process was terminated by a signal.
	pub exit_code: Option<i32>,
}
impl CommandOutput {
	/// True when the process exited with status zero.
	pub fn success(&self) -> bool {
		self.exit_code == Some(0)
	}

	/// Returns `self` when the process succeeded, otherwise a [`CommandError`] carrying the exit
	/// code and error output.
	pub fn into_checked(self, program: impl Into<PathBuf>) -> Result<Self, CommandError> {
		if self.success() {
			Ok(self)
		} else {
			Err(CommandError {
				program: program.into(),
				exit_code: self.exit_code,
				stderr: self.stderr,
			})
		}
	}
}

/// Non-zero exit reported by [`CommandOutput::into_checked`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Command `{}` exited with {exit_code:?}; error output was `{stderr}`.", .program.display())]
pub struct CommandError {
	/// Program that was run.
	pub program: PathBuf,
	/// Exit code, if any.
	pub exit_code: Option<i32>,
	/// Error output.
	pub stderr: String,
}

/// Runs external programs to completion and captures their output.
pub trait CommandRunner
where
	Self: Send + Sync,
{
	/// Runs `program` with `args`, returning its output whatever the exit status.
	fn run(&self, program: &Path, args: &[OsString]) -> std::io::Result<CommandOutput>;
}

/// [`CommandRunner`] backed by [`std::process::Command`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemCommandRunner;
impl CommandRunner for SystemCommandRunner {
	fn run(&self, program: &Path, args: &[OsString]) -> std::io::Result<CommandOutput> {
		let output = Command::new(program).args(args).output()?;

		Ok(CommandOutput {
			stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
			stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
			exit_code: output.status.code(),
		})
	}
}
