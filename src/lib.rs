//! The check_influxdb crate implements a nagios/icinga check which runs a Flux query against
//! InfluxDB 2 and compares the returned values against warning and critical thresholds.
//!
//! The check runs in four steps:
//!
//! 1. [query::QuerySpec::build] assembles the Flux query,
//! 2. a [executor::QueryExecutor] sends it to the InfluxDB query API,
//! 3. [table::interpret] turns the CSV answer into [table::ValuePoint]s,
//! 4. [threshold::Thresholds::evaluate] maps them onto a [ServiceState].
//!
//! [check::run] ties these together and produces a [CheckResult].
//!
//! ```rust
//! # use check_influxdb::{CheckResult, ServiceState};
//! let result = CheckResult::new("CPU_USAGE_USER", ServiceState::Warning)
//!     .with_description("usage_user=85.2");
//! assert_eq!(&result.to_nagios_string(), "CPU_USAGE_USER WARNING: usage_user=85.2");
//! assert_eq!(result.exit_code(), 1);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::process;

pub mod check;
pub mod config;
pub mod config_generator;
pub mod error;
pub mod executor;
pub mod query;
pub mod report;
mod runner;
pub mod table;
pub mod threshold;

pub use crate::error::{CheckError, ConfigError};
pub use crate::runner::{Runner, RunnerResult};

/// The outcome of a check run: what gets printed and which exit code is used.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckResult {
    name: String,
    state: ServiceState,
    description: Option<String>,
    perf_data: Vec<PerfDatum>,
}

impl CheckResult {
    pub fn new(name: &str, state: ServiceState) -> Self {
        CheckResult {
            name: name.to_owned(),
            state,
            description: None,
            perf_data: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }

    /// Adds performance data. The output line gets a `|` section as soon as there is at least one
    /// datum.
    pub fn with_perf_data(mut self, datum: PerfDatum) -> Self {
        self.perf_data.push(datum);
        self
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns a string which nagios understands to determine the service state.
    pub fn to_nagios_string(&self) -> String {
        let mut s = format!("{} {}", self.name, self.state);

        if let Some(ref description) = self.description {
            s.push_str(&format!(": {}", description));
        }

        if !self.perf_data.is_empty() {
            s.push_str(" |");

            for datum in self.perf_data.iter() {
                s.push_str(&format!(" {}", datum));
            }
        }

        s
    }

    pub fn exit_code(&self) -> i32 {
        self.state.exit_code()
    }

    /// Will print Self::to_nagios_string and exit with the exit code from Self::exit_code
    pub fn print_and_exit(&self) -> ! {
        println!("{}", self.to_nagios_string());
        process::exit(self.exit_code());
    }
}

/// Represents a service state from nagios.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceState {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl ServiceState {
    /// Returns the corresponding nagios exit code to signal the service state of self.
    pub fn exit_code(&self) -> i32 {
        match self {
            ServiceState::Ok => 0,
            ServiceState::Warning => 1,
            ServiceState::Critical => 2,
            ServiceState::Unknown => 3,
        }
    }

    // Unknown ranks below Ok so it never wins a comparison against a real evaluation.
    fn rank(&self) -> u8 {
        match self {
            ServiceState::Unknown => 0,
            ServiceState::Ok => 1,
            ServiceState::Warning => 2,
            ServiceState::Critical => 3,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::Ok => "OK",
            ServiceState::Warning => "WARNING",
            ServiceState::Critical => "CRITICAL",
            ServiceState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

impl PartialOrd for ServiceState {
    fn partial_cmp(&self, other: &ServiceState) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServiceState {
    fn cmp(&self, other: &ServiceState) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Unit {
    None,
    Bytes,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::None => Ok(()),
            Unit::Bytes => f.write_str("B"),
        }
    }
}

/// A single performance data entry, rendered as `label=value[unit];warning;critical`.
#[derive(Clone, Debug, PartialEq)]
pub struct PerfDatum {
    pub label: String,
    pub value: f64,
    pub unit: Unit,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
}

impl fmt::Display for PerfDatum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // replace `=`
        let label = self.label.replace('=', "_");

        // quote `'`
        let label = label.replace('\'', "''");

        // quote if contains spaces
        let label = if label.contains(' ') {
            format!("'{}'", label)
        } else {
            label
        };

        let threshold = |t: Option<f64>| t.map(|t| t.to_string()).unwrap_or_default();

        let s = format!(
            "{}={}{};{};{}",
            label,
            self.value,
            self.unit,
            threshold(self.warning),
            threshold(self.critical)
        );
        f.write_str(s.trim_end_matches(';'))
    }
}
