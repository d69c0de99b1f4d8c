//! Command line interface and its validation into a [Config].

use std::collections::BTreeMap;
use std::time::Duration;

use clap::{value_parser, ArgAction, Parser};

use crate::error::ConfigError;
use crate::executor::Endpoint;
use crate::query::QuerySpec;
use crate::report;
use crate::threshold::{ThresholdMode, Thresholds};

pub const DEFAULT_URL: &str = "http://127.0.0.1:8086";

const ABOUT_TEXT: &str = r#"
check_influxdb - Checks values stored in InfluxDB 2 against thresholds.

The check builds a Flux query from the given bucket, measurement, fields, tags
and host, aggregates the last PERIOD with the AGGREGATE function and compares
the result against the warning and critical thresholds. A value triggers a
threshold only when it is strictly greater (compared with two decimals).

MULTIPLE VALUES

Several --field options (joined with --fieldcon, e.g. "or") or tags that match
several series may return more than one value. By default every value is
checked on its own and the worst state wins. With --thresfun sum the values
are summed up and the sum is checked instead.

Set GENERATE_ICINGA_COMMAND to print an Icinga2 CheckCommand definition."#;

#[derive(Debug, Parser)]
#[command(
    name = "check_influxdb",
    author,
    version,
    long_about = None,
    about = ABOUT_TEXT,
    disable_help_flag = true
)]
pub struct Cli {
    /// Host whose series are checked, matched against the `host` tag
    #[arg(short = 'H', long)]
    pub host: String,

    /// Base URL of the InfluxDB server
    #[arg(short = 'U', long, default_value = DEFAULT_URL)]
    pub url: String,

    /// Bucket to query
    #[arg(short, long, visible_alias = "database")]
    pub bucket: String,

    /// Organization owning the bucket
    #[arg(short, long)]
    pub org: String,

    /// Measurement to query
    #[arg(short, long)]
    pub measurement: String,

    /// Field to query, may be given several times
    #[arg(short, long = "field", required = true)]
    pub fields: Vec<String>,

    /// Operator joining several fields in the filter, e.g. "or"
    #[arg(long)]
    pub fieldcon: Option<String>,

    /// Additional tag filter, may be given several times
    #[arg(short, long = "tag", value_name = "KEY=VALUE")]
    pub tags: Vec<String>,

    /// Time range to look at and aggregation window, e.g. 5m
    #[arg(short, long)]
    pub period: String,

    /// Flux function used to aggregate the window, e.g. mean, max or last
    #[arg(short, long)]
    pub aggregate: String,

    /// Combine several values before checking them, "sum" is supported
    #[arg(long)]
    pub thresfun: Option<String>,

    /// Check the difference between consecutive values
    #[arg(long)]
    pub diff: bool,

    /// API token used for authentication
    #[arg(long, env = "INFLUX_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Print values as human readable byte sizes
    #[arg(long)]
    pub bytes: bool,

    /// Print the query and the raw answer to stderr
    #[arg(short, long)]
    pub debug: bool,

    /// Do not replace missing values with 0
    #[arg(long)]
    pub nofill: bool,

    /// Report OK instead of UNKNOWN when the query does not match any data
    #[arg(long)]
    pub no_unknown_when_empty: bool,

    /// Warning threshold
    #[arg(short, long, allow_negative_numbers = true)]
    pub warning: f64,

    /// Critical threshold
    #[arg(short, long, allow_negative_numbers = true)]
    pub critical: f64,

    /// Timeout of the query request in seconds
    #[arg(long, value_name = "SECONDS", value_parser = value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Append performance data to the output
    #[arg(long)]
    pub perfdata: bool,

    /// Enable verbose output. Use multiple times to increase verbosity (e.g. -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Print help
    #[arg(short, long, visible_alias = "usage", action = ArgAction::Help)]
    pub help: Option<bool>,
}

/// Validated settings for one check run.
#[derive(Clone, Debug)]
pub struct Config {
    pub query: QuerySpec,
    pub endpoint: Endpoint,
    pub thresholds: Thresholds,
    pub bytes: bool,
    pub perfdata: bool,
    pub debug: bool,
    pub unknown_when_empty: bool,
}

impl Config {
    /// Label printed in front of the state, see [report::identifier].
    pub fn identifier(&self) -> String {
        report::identifier(&self.query.measurement, &self.query.fields, &self.query.tags)
    }
}

impl TryFrom<Cli> for Config {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let field_combinator = cli.fieldcon.unwrap_or_default();
        if cli.fields.len() > 1 && field_combinator.trim().is_empty() {
            return Err(ConfigError::MissingFieldCombinator);
        }

        let tags = parse_tags(&cli.tags)?;

        if !is_duration_literal(&cli.period) {
            return Err(ConfigError::InvalidPeriod(cli.period));
        }
        if !is_identifier(&cli.aggregate) {
            return Err(ConfigError::InvalidAggregate(cli.aggregate));
        }

        for (name, value) in [("warning", cli.warning), ("critical", cli.critical)] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        if cli.warning > cli.critical {
            log::warn!(
                "warning threshold {} is above critical threshold {}",
                cli.warning,
                cli.critical
            );
        }

        let mode = cli
            .thresfun
            .as_deref()
            .map(|f| f.parse::<ThresholdMode>().unwrap_or_default())
            .unwrap_or_default();

        Ok(Config {
            query: QuerySpec {
                bucket: cli.bucket,
                measurement: cli.measurement,
                fields: cli.fields,
                field_combinator,
                tags,
                host: cli.host,
                period: cli.period,
                aggregate: cli.aggregate,
                fill_nulls: !cli.nofill,
                difference: cli.diff,
            },
            endpoint: Endpoint {
                url: cli.url,
                org: cli.org,
                token: cli.token,
                timeout: cli.timeout.map(Duration::from_secs),
            },
            thresholds: Thresholds {
                warning: cli.warning,
                critical: cli.critical,
                mode,
            },
            bytes: cli.bytes,
            perfdata: cli.perfdata,
            debug: cli.debug,
            unknown_when_empty: !cli.no_unknown_when_empty,
        })
    }
}

fn parse_tags(raw: &[String]) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut tags = BTreeMap::new();

    for tag in raw {
        let (key, value) = tag
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| ConfigError::InvalidTag(tag.clone()))?;

        if tags.insert(key.to_owned(), value.to_owned()).is_some() {
            return Err(ConfigError::DuplicateTag(key.to_owned()));
        }
    }

    Ok(tags)
}

/// Accepts Flux duration literals such as `30s`, `5m` or `1h30m`.
fn is_duration_literal(s: &str) -> bool {
    const UNITS: [&str; 11] = ["ns", "us", "µs", "ms", "mo", "s", "m", "h", "d", "w", "y"];

    let mut rest = s;
    if rest.is_empty() {
        return false;
    }

    while !rest.is_empty() {
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return false;
        }
        rest = &rest[digits..];

        match UNITS.iter().find(|unit| rest.starts_with(*unit)) {
            Some(unit) => rest = &rest[unit.len()..],
            None => return false,
        }
    }

    true
}

/// Accepts a plain Flux identifier, optionally qualified with a package (`experimental.count`).
fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
