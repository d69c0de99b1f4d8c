//! Warning/critical evaluation of extracted values.

use std::str::FromStr;

use crate::table::ValuePoint;
use crate::ServiceState;

/// How several values are combined before comparing them to the thresholds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ThresholdMode {
    /// Every value is checked on its own, the worst state wins.
    #[default]
    Each,
    /// The values are summed up and the sum is checked.
    Sum,
}

impl FromStr for ThresholdMode {
    type Err = std::convert::Infallible;

    /// `sum` selects [ThresholdMode::Sum], anything else falls back to [ThresholdMode::Each].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(ThresholdMode::Sum),
            _ => Ok(ThresholdMode::Each),
        }
    }
}

/// Upper bounds that trigger WARNING and CRITICAL when exceeded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
    pub mode: ThresholdMode,
}

impl Thresholds {
    /// State of a single value. Both sides are rounded to two decimals and only values strictly
    /// above a threshold trigger it.
    pub fn state_of(&self, value: f64) -> ServiceState {
        let value = round2(value);

        if value > round2(self.critical) {
            ServiceState::Critical
        } else if value > round2(self.warning) {
            ServiceState::Warning
        } else {
            ServiceState::Ok
        }
    }

    /// Overall state of all extracted values. Never returns [ServiceState::Unknown].
    pub fn evaluate(&self, points: &[ValuePoint]) -> ServiceState {
        match (points, self.mode) {
            ([point], _) => self.state_of(point.value),
            (_, ThresholdMode::Sum) => self.state_of(points.iter().map(|p| p.value).sum()),
            (_, ThresholdMode::Each) => points
                .iter()
                .map(|p| self.state_of(p.value))
                .max()
                .unwrap_or(ServiceState::Ok),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds(warning: f64, critical: f64, mode: ThresholdMode) -> Thresholds {
        Thresholds {
            warning,
            critical,
            mode,
        }
    }

    fn points(values: &[f64]) -> Vec<ValuePoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| ValuePoint::new(format!("f{i}"), *v))
            .collect()
    }

    #[test]
    fn test_state_of() {
        let t = thresholds(15.0, 30.0, ThresholdMode::Each);

        assert_eq!(t.state_of(12.0), ServiceState::Ok);
        assert_eq!(t.state_of(15.0), ServiceState::Ok);
        assert_eq!(t.state_of(15.01), ServiceState::Warning);
        assert_eq!(t.state_of(30.0), ServiceState::Warning);
        assert_eq!(t.state_of(30.5), ServiceState::Critical);
        assert_eq!(t.state_of(-4.0), ServiceState::Ok);
    }

    #[test]
    fn test_boundary_is_rounded() {
        let t = thresholds(20.0, 25.0, ThresholdMode::Each);

        assert_eq!(t.state_of(25.004), ServiceState::Warning);
        assert_eq!(t.state_of(25.006), ServiceState::Critical);
        assert_eq!(t.state_of(20.001), ServiceState::Ok);

        let t = thresholds(30.0, 25.0, ThresholdMode::Each);
        assert_eq!(t.state_of(25.0), ServiceState::Ok);
    }

    #[test]
    fn test_evaluate_each() {
        let t = thresholds(20.0, 25.0, ThresholdMode::Each);

        assert_eq!(t.evaluate(&points(&[10.0, 30.0])), ServiceState::Critical);
        assert_eq!(t.evaluate(&points(&[21.0, 10.0])), ServiceState::Warning);
        assert_eq!(t.evaluate(&points(&[1.0, 2.0, 3.0])), ServiceState::Ok);
    }

    #[test]
    fn test_evaluate_sum() {
        let t = thresholds(15.0, 25.0, ThresholdMode::Sum);

        assert_eq!(t.evaluate(&points(&[10.0, 10.0])), ServiceState::Warning);
        assert_eq!(t.evaluate(&points(&[10.0, 10.0, 10.0])), ServiceState::Critical);
        assert_eq!(t.evaluate(&points(&[10.0])), ServiceState::Ok);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("sum".parse(), Ok(ThresholdMode::Sum));
        assert_eq!("avg".parse(), Ok(ThresholdMode::Each));
        assert_eq!("".parse(), Ok(ThresholdMode::Each));
    }
}
