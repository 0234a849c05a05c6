use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const STEP_BUILD_MASKS: &str = "build_masks";
pub const STEP_DILATE_MASKS: &str = "dilate_masks";
pub const STEP_ESTIMATE_CHROMA: &str = "estimate_chroma";
pub const STEP_RECONSTRUCT: &str = "reconstruct";

#[derive(Debug, Clone)]
pub struct PassTiming {
    pub name: String,
    pub duration: Duration,
}

#[derive(Debug, Default)]
pub struct PassTimings {
    steps: Vec<PassTiming>,
    step_map: HashMap<String, Duration>,
}

impl PassTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, name: impl Into<String>, duration: Duration) {
        let name = name.into();
        self.steps.push(PassTiming {
            name: name.clone(),
            duration,
        });
        *self.step_map.entry(name).or_insert(Duration::ZERO) += duration;
    }

    /// Runs `f` and records its wall time under `name`.
    pub fn measure<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        let timer = Timer::start(name);
        let value = f();
        let (name, duration) = timer.stop();
        self.add_step(name, duration);
        value
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    pub fn get_step(&self, name: &str) -> Option<Duration> {
        self.step_map.get(name).copied()
    }

    pub fn ran(&self, name: &str) -> bool {
        self.step_map.contains_key(name)
    }

    pub fn steps(&self) -> &[PassTiming] {
        &self.steps
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    pub fn stop(self) -> (String, Duration) {
        (self.name, self.start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_records_named_steps() {
        let mut timings = PassTimings::new();
        let value = timings.measure(STEP_BUILD_MASKS, || 7);
        timings.add_step(STEP_RECONSTRUCT, Duration::from_millis(3));
        timings.add_step(STEP_RECONSTRUCT, Duration::from_millis(2));

        assert_eq!(value, 7);
        assert!(timings.ran(STEP_BUILD_MASKS));
        assert!(!timings.ran(STEP_DILATE_MASKS));
        assert_eq!(timings.get_step(STEP_RECONSTRUCT), Some(Duration::from_millis(5)));
        assert_eq!(timings.steps().len(), 3);
        assert!(timings.total_duration() >= Duration::from_millis(5));
    }
}
