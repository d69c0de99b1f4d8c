//! One complete check run: query, interpretation, evaluation.

use crate::config::Config;
use crate::error::{CheckError, Result, EMPTY_ANSWER};
use crate::executor::QueryExecutor;
use crate::report;
use crate::table::{interpret, Interpretation};
use crate::{CheckResult, ServiceState};

/// Runs the configured query through `executor` and evaluates the answer.
///
/// Every failure is returned as a [CheckError]; the caller reports it as UNKNOWN.
pub fn run<X>(config: &Config, executor: &X) -> Result<CheckResult>
where
    X: QueryExecutor + ?Sized,
{
    let query = config.query.build();
    if config.debug {
        eprintln!("Query:\n{query}");
    }
    log::info!("querying bucket {} for {}", config.query.bucket, config.identifier());

    let response = executor.execute(&query);
    if config.debug {
        eprintln!("Response:\n{}", response.body);
    }

    let points = match interpret(&response, &config.query.field_label())? {
        Interpretation::Points(points) => points,
        Interpretation::Empty if config.unknown_when_empty => {
            return Err(CheckError::EmptyResponse);
        }
        Interpretation::Empty => {
            return Ok(
                CheckResult::new(&config.identifier(), ServiceState::Ok)
                    .with_description(EMPTY_ANSWER),
            );
        }
    };
    log::debug!("extracted values: {:?}", points);

    let state = config.thresholds.evaluate(&points);
    let mut result = CheckResult::new(&config.identifier(), state)
        .with_description(&report::describe(&points, config.bytes));

    if config.perfdata {
        for datum in report::perf_data(&points, &config.thresholds, config.bytes) {
            result = result.with_perf_data(datum);
        }
    }

    Ok(result)
}
