//! Per-episode schedules for the exploration rate

use serde::{Deserialize, Serialize};

/// Value of a hyperparameter as a function of the episode index
pub trait Schedule: Send + Sync {
    /// Value at episode `t`
    fn value(&self, t: usize) -> f64;
}

/// Linear interpolation from `start` to `end` over `steps` episodes
#[derive(Debug, Clone)]
pub struct LinearSchedule {
    /// Value at episode 0
    pub start: f64,
    /// Value from episode `steps` on
    pub end: f64,
    /// Length of the ramp
    pub steps: usize,
}

impl LinearSchedule {
    /// Create a new linear schedule
    pub fn new(start: f64, end: f64, steps: usize) -> Self {
        Self { start, end, steps }
    }
}

impl Schedule for LinearSchedule {
    #[allow(clippy::cast_precision_loss)]
    fn value(&self, t: usize) -> f64 {
        if t >= self.steps {
            self.end
        } else {
            let progress = t as f64 / self.steps as f64;
            self.start + (self.end - self.start) * progress
        }
    }
}

/// Geometric decay `start * decay^t`, floored at `min`
#[derive(Debug, Clone)]
pub struct ExponentialSchedule {
    /// Value at episode 0
    pub start: f64,
    /// Floor
    pub min: f64,
    /// Per-episode factor
    pub decay: f64,
}

impl ExponentialSchedule {
    /// Create a new exponential schedule
    pub fn new(start: f64, min: f64, decay: f64) -> Self {
        Self { start, min, decay }
    }
}

impl Schedule for ExponentialSchedule {
    fn value(&self, t: usize) -> f64 {
        let exp = i32::try_from(t).unwrap_or(i32::MAX);
        (self.start * self.decay.powi(exp)).max(self.min)
    }
}

/// Fixed value
#[derive(Debug, Clone)]
pub struct ConstantSchedule {
    /// The value
    pub value: f64,
}

impl Schedule for ConstantSchedule {
    fn value(&self, _t: usize) -> f64 {
        self.value
    }
}

/// Serializable choice of schedule
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleConfig {
    /// Keep the configured epsilon
    #[default]
    Constant,
    /// See [`LinearSchedule`]
    Linear {
        /// Value at episode 0
        start: f64,
        /// Final value
        end: f64,
        /// Length of the ramp
        steps: usize,
    },
    /// See [`ExponentialSchedule`]
    Exponential {
        /// Value at episode 0
        start: f64,
        /// Floor
        min: f64,
        /// Per-episode factor
        decay: f64,
    },
}

impl ScheduleConfig {
    /// Build the schedule; `Constant` holds `base`
    pub fn build(&self, base: f64) -> Box<dyn Schedule> {
        match *self {
            Self::Constant => Box::new(ConstantSchedule { value: base }),
            Self::Linear { start, end, steps } => Box::new(LinearSchedule::new(start, end, steps)),
            Self::Exponential { start, min, decay } => {
                Box::new(ExponentialSchedule::new(start, min, decay))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_schedule() {
        let schedule = LinearSchedule::new(1.0, 0.0, 10);
        assert_relative_eq!(schedule.value(0), 1.0);
        assert_relative_eq!(schedule.value(5), 0.5);
        assert_relative_eq!(schedule.value(10), 0.0);
        assert_relative_eq!(schedule.value(20), 0.0);
    }

    #[test]
    fn test_exponential_schedule() {
        let schedule = ExponentialSchedule::new(1.0, 0.1, 0.5);
        assert_relative_eq!(schedule.value(0), 1.0);
        assert_relative_eq!(schedule.value(1), 0.5);
        assert_relative_eq!(schedule.value(2), 0.25);
        assert_relative_eq!(schedule.value(10), 0.1);
    }

    #[test]
    fn test_schedule_config_from_json() {
        let cfg: ScheduleConfig =
            serde_json::from_str(r#"{"kind":"linear","start":0.5,"end":0.05,"steps":100}"#).unwrap();
        assert_relative_eq!(cfg.build(0.2).value(100), 0.05);
        assert_relative_eq!(ScheduleConfig::Constant.build(0.2).value(7), 0.2);
    }
}
