use std::fmt::Display;

use crate::{CheckResult, ServiceState};

/// Runs a check and turns any error into an UNKNOWN status line, so the monitoring system always
/// receives parseable output.
pub struct Runner {
    name: String,
}

impl Runner {
    /// `name` prefixes the status line when the check fails.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
        }
    }

    pub fn safe_run<E: Display>(self, f: impl FnOnce() -> Result<CheckResult, E>) -> RunnerResult<E> {
        match f() {
            Ok(result) => RunnerResult::Ok(result),
            Err(err) => {
                log::debug!("check failed: {err}");
                RunnerResult::Err(self.name, ServiceState::Unknown, err)
            }
        }
    }
}

pub enum RunnerResult<E> {
    Ok(CheckResult),
    Err(String, ServiceState, E),
}

impl<E: Display> RunnerResult<E> {
    pub fn to_nagios_string(&self) -> String {
        match self {
            RunnerResult::Ok(result) => result.to_nagios_string(),
            RunnerResult::Err(name, state, err) => format!("{} {}: {}", name, state, err),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            RunnerResult::Ok(result) => result.exit_code(),
            RunnerResult::Err(_, state, _) => state.exit_code(),
        }
    }

    pub fn print_and_exit(self) -> ! {
        println!("{}", self.to_nagios_string());
        std::process::exit(self.exit_code());
    }
}
