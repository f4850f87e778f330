use std::collections::VecDeque;

use crate::config::{ConfidenceConfig, SmoothingStrategy};
use crate::pipeline::traits::ConfidenceSmoother;

/// Maps any raw input into `[0, 1]`; non-finite values become `default`.
pub fn sanitize_confidence(raw: f32, default: f32) -> f32 {
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        default.clamp(0.0, 1.0)
    }
}

/// Running mean over the last `window` admitted values.
#[derive(Debug, Clone)]
pub struct MovingAverageSmoother {
    history: VecDeque<f32>,
    window: usize,
    default: f32,
}

impl MovingAverageSmoother {
    pub fn new(window: usize, default: f32) -> Self {
        let window = window.max(1);
        Self {
            history: VecDeque::with_capacity(window),
            window,
            default,
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl ConfidenceSmoother for MovingAverageSmoother {
    fn smooth(&mut self, raw: f32) -> f32 {
        self.history.push_back(sanitize_confidence(raw, self.default));
        while self.history.len() > self.window {
            self.history.pop_front();
        }
        let mean = self.history.iter().sum::<f32>() / self.history.len() as f32;
        mean.clamp(0.0, 1.0)
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}

/// Scalar Kalman filter with constant process and measurement noise.
/// The first admitted value seeds the estimate.
#[derive(Debug, Clone)]
pub struct KalmanSmoother {
    process_noise: f32,
    measurement_noise: f32,
    default: f32,
    estimate: Option<f32>,
    uncertainty: f32,
}

impl KalmanSmoother {
    const INITIAL_UNCERTAINTY: f32 = 1.0;

    pub fn new(process_noise: f32, measurement_noise: f32, default: f32) -> Self {
        Self {
            process_noise,
            measurement_noise,
            default,
            estimate: None,
            uncertainty: Self::INITIAL_UNCERTAINTY,
        }
    }

    /// Batch prediction over `observations`; `default` when empty.
    pub fn predict(&self, observations: &[f32]) -> f32 {
        let mut filter = Self::new(self.process_noise, self.measurement_noise, self.default);
        let mut estimate = sanitize_confidence(self.default, self.default);
        for &observation in observations {
            estimate = filter.smooth(observation);
        }
        estimate
    }
}

impl ConfidenceSmoother for KalmanSmoother {
    fn smooth(&mut self, raw: f32) -> f32 {
        let observation = sanitize_confidence(raw, self.default);
        let prior = *self.estimate.get_or_insert(observation);

        self.uncertainty += self.process_noise;
        let gain = self.uncertainty / (self.uncertainty + self.measurement_noise);
        let estimate = (prior + gain * (observation - prior)).clamp(0.0, 1.0);
        self.uncertainty *= 1.0 - gain;
        self.estimate = Some(estimate);
        estimate
    }

    fn reset(&mut self) {
        self.estimate = None;
        self.uncertainty = Self::INITIAL_UNCERTAINTY;
    }
}

pub fn smoother_from_config(config: &ConfidenceConfig) -> Box<dyn ConfidenceSmoother> {
    match config.strategy {
        SmoothingStrategy::MovingAverage { window } => Box::new(MovingAverageSmoother::new(
            window,
            config.default_confidence,
        )),
        SmoothingStrategy::Kalman {
            process_noise,
            measurement_noise,
        } => Box::new(KalmanSmoother::new(
            process_noise,
            measurement_noise,
            config.default_confidence,
        )),
    }
}
