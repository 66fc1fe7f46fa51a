//! Test data builders for creating test objects

use pidvis_rs::TelemetrySample;

/// The telemetry vector pinned by the wire-format tests
pub const REFERENCE_SAMPLE: TelemetrySample = TelemetrySample {
    input: 1.0,
    setpoint: 2.0,
    error: 1.0,
    gain: 0.5,
    p_term: 0.5,
    i_term: 0.1,
    d_term: 0.05,
};

/// Builder for creating test samples
pub struct SampleBuilder {
    sample: TelemetrySample,
}

impl SampleBuilder {
    pub fn new() -> Self {
        Self {
            sample: TelemetrySample::default(),
        }
    }

    pub fn input(mut self, input: f32) -> Self {
        self.sample.input = input;
        self
    }

    pub fn setpoint(mut self, setpoint: f32) -> Self {
        self.sample.setpoint = setpoint;
        self
    }

    /// Fill error and PID terms from input, setpoint and the given gains
    pub fn pid(mut self, kp: f32, ki_term: f32, d_term: f32) -> Self {
        let error = self.sample.setpoint - self.sample.input;
        self.sample.error = error;
        self.sample.gain = kp;
        self.sample.p_term = kp * error;
        self.sample.i_term = ki_term;
        self.sample.d_term = d_term;
        self
    }

    pub fn build(self) -> TelemetrySample {
        self.sample
    }
}

impl Default for SampleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_builder() {
        let sample = SampleBuilder::new()
            .input(1.0)
            .setpoint(2.0)
            .pid(0.5, 0.1, 0.05)
            .build();

        assert_eq!(sample, REFERENCE_SAMPLE);
    }
}
