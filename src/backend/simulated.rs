//! Simulated transport for testing without hardware
//!
//! Emits encoded telemetry frames from a small closed-loop PID model, paced by
//! wall-clock time. Faults can be injected: periodic frame corruption and
//! refusing to open. A transport can also be built from a fixed byte script,
//! which is served once and then the link goes quiet.

use super::transport::{DetectedPort, PortKind, Transport, TransportStats};
use crate::error::{PidVisError, Result};
use crate::protocol::encode_sample;
use crate::types::TelemetrySample;
use std::collections::VecDeque;
use std::time::Instant;

/// Port name that selects the simulated transport
pub const SIMULATED_PORT: &str = "sim://pid";

/// Check whether a port name refers to the simulator
pub fn is_simulated_port(port: &str) -> bool {
    port.starts_with("sim://")
}

/// Port listing entry for the simulator
pub fn simulated_port() -> DetectedPort {
    DetectedPort {
        name: SIMULATED_PORT.to_string(),
        kind: PortKind::Simulated,
    }
}

/// Configuration for the simulated link
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Frames emitted per second
    pub sample_rate_hz: f64,
    /// Corrupt every Nth frame (`None` = never)
    pub corrupt_every: Option<u32>,
    /// Make `open` fail with a connection error
    pub fail_open: bool,
    /// Setpoint square-wave half period in seconds
    pub step_period_secs: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 200.0,
            corrupt_every: None,
            fail_open: false,
            step_period_secs: 2.0,
        }
    }
}

/// First-order plant driven by a PID controller
#[derive(Debug, Clone)]
struct PidModel {
    kp: f32,
    ki: f32,
    kd: f32,
    /// Plant time constant in seconds
    tau: f32,
    input: f32,
    integral: f32,
    prev_error: f32,
}

impl Default for PidModel {
    fn default() -> Self {
        Self {
            kp: 1.2,
            ki: 0.8,
            kd: 0.05,
            tau: 0.4,
            input: 0.0,
            integral: 0.0,
            prev_error: 0.0,
        }
    }
}

impl PidModel {
    fn step(&mut self, setpoint: f32, dt: f32) -> TelemetrySample {
        let error = setpoint - self.input;
        self.integral += error * dt;

        let p_term = self.kp * error;
        let i_term = self.ki * self.integral;
        let d_term = if dt > 0.0 {
            self.kd * (error - self.prev_error) / dt
        } else {
            0.0
        };
        self.prev_error = error;

        let output = p_term + i_term + d_term;
        self.input += (output - self.input) * (dt / self.tau).min(1.0);

        TelemetrySample {
            input: self.input,
            setpoint,
            error,
            gain: self.kp,
            p_term,
            i_term,
            d_term,
        }
    }
}

/// In-process link emitting encoded PID telemetry
pub struct SimulatedTransport {
    config: SimulationConfig,
    model: PidModel,
    /// Encoded bytes not yet handed out
    pending: VecDeque<u8>,
    /// Serve only `pending`, never synthesize
    scripted: bool,
    open: bool,
    opened_at: Option<Instant>,
    frames_generated: u64,
    stats: TransportStats,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl SimulatedTransport {
    /// Create a simulator with the given configuration
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            model: PidModel::default(),
            pending: VecDeque::new(),
            scripted: false,
            open: false,
            opened_at: None,
            frames_generated: 0,
            stats: TransportStats::default(),
        }
    }

    /// Create a link that serves exactly `bytes`, then nothing
    pub fn scripted(bytes: impl Into<Vec<u8>>) -> Self {
        let mut transport = Self::new(SimulationConfig::default());
        transport.pending = bytes.into().into();
        transport.scripted = true;
        transport
    }

    /// Number of frames synthesized so far
    pub fn frames_generated(&self) -> u64 {
        self.frames_generated
    }

    fn setpoint_at(&self, t: f64) -> f32 {
        let half = self.config.step_period_secs.max(f64::EPSILON);
        if (t / half).floor() as u64 % 2 == 0 {
            1.0
        } else {
            0.0
        }
    }

    /// Queue every frame due by now
    fn generate_due_frames(&mut self) {
        let Some(opened_at) = self.opened_at else {
            return;
        };
        let rate = self.config.sample_rate_hz;
        if rate <= 0.0 {
            return;
        }

        let due = (opened_at.elapsed().as_secs_f64() * rate) as u64;
        let dt = (1.0 / rate) as f32;
        while self.frames_generated < due {
            let t = self.frames_generated as f64 / rate;
            let setpoint = self.setpoint_at(t);
            let sample = self.model.step(setpoint, dt);
            self.frames_generated += 1;

            let mut frame = encode_sample(&sample);
            if let Some(n) = self.config.corrupt_every {
                if n > 0 && self.frames_generated % n as u64 == 0 {
                    corrupt(&mut frame);
                }
            }
            self.pending.extend(frame);
        }
    }
}

/// Alter one stuffed byte in the middle of the frame without creating a zero
fn corrupt(frame: &mut [u8]) {
    let index = frame.len() / 2;
    frame[index] = frame[index].wrapping_add(1).max(1);
}

impl Transport for SimulatedTransport {
    fn open(&mut self, port: &str, _baud_rate: u32) -> Result<()> {
        if self.config.fail_open {
            return Err(PidVisError::connection(port, "simulated open failure"));
        }
        self.open = true;
        self.opened_at = Some(Instant::now());
        self.stats = TransportStats::default();
        if !self.scripted {
            self.model = PidModel::default();
            self.pending.clear();
            self.frames_generated = 0;
        }
        tracing::info!("Opened simulated link {}", port);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.open {
            self.stats.record_failure();
            return Err(PidVisError::connection(SIMULATED_PORT, "port is not open"));
        }
        if !self.scripted {
            self.generate_due_frames();
        }

        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        self.stats.record_read(n);
        Ok(n)
    }

    fn close(&mut self) {
        if self.open {
            tracing::info!("Closed simulated link");
        }
        self.open = false;
        self.opened_at = None;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FrameDecoder;
    use std::time::Duration;

    fn read_all(transport: &mut SimulatedTransport) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 64];
        loop {
            let n = transport.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    #[test]
    fn test_is_simulated_port() {
        assert!(is_simulated_port(SIMULATED_PORT));
        assert!(!is_simulated_port("/dev/ttyUSB0"));
        assert!(simulated_port().is_simulated());
    }

    #[test]
    fn test_read_requires_open() {
        let mut transport = SimulatedTransport::default();
        let mut buf = [0u8; 8];
        assert!(transport.read(&mut buf).unwrap_err().is_connection());
    }

    #[test]
    fn test_fail_open() {
        let mut transport = SimulatedTransport::new(SimulationConfig {
            fail_open: true,
            ..Default::default()
        });
        assert!(transport.open(SIMULATED_PORT, 115_200).unwrap_err().is_connection());
        assert!(!transport.is_open());
    }

    #[test]
    fn test_scripted_bytes_served_once() {
        let mut transport = SimulatedTransport::scripted(vec![1, 2, 3, 0]);
        transport.open(SIMULATED_PORT, 115_200).unwrap();

        let mut buf = [0u8; 3];
        assert_eq!(transport.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(transport.read(&mut buf).unwrap(), 1);
        assert_eq!(transport.read(&mut buf).unwrap(), 0);
        let stats = transport.stats();
        assert_eq!((stats.bytes_read, stats.reads, stats.empty_reads), (4, 2, 1));

        transport.close();
        transport.open(SIMULATED_PORT, 115_200).unwrap();
        assert_eq!(transport.stats(), TransportStats::default());
    }

    #[test]
    fn test_generated_frames_decode() {
        let mut transport = SimulatedTransport::new(SimulationConfig {
            sample_rate_hz: 1000.0,
            ..Default::default()
        });
        transport.open(SIMULATED_PORT, 115_200).unwrap();
        std::thread::sleep(Duration::from_millis(30));

        let bytes = read_all(&mut transport);
        let mut decoder = FrameDecoder::new();
        let samples = decoder.feed_slice(&bytes);

        assert!(!samples.is_empty());
        assert_eq!(samples.len() as u64, transport.frames_generated());
        assert_eq!(decoder.stats().total_errors(), 0);
        assert!(samples.iter().all(|s| s.gain == 1.2_f32));
        assert_eq!(samples[0].setpoint, 1.0);
    }

    #[test]
    fn test_corruption_is_detected() {
        let mut transport = SimulatedTransport::new(SimulationConfig {
            sample_rate_hz: 1000.0,
            corrupt_every: Some(2),
            ..Default::default()
        });
        transport.open(SIMULATED_PORT, 115_200).unwrap();
        std::thread::sleep(Duration::from_millis(30));

        let bytes = read_all(&mut transport);
        let mut decoder = FrameDecoder::new();
        let samples = decoder.feed_slice(&bytes);

        assert!(!samples.is_empty());
        assert!(decoder.stats().total_errors() > 0);
        assert!((samples.len() as u64) < transport.frames_generated());
    }

    #[test]
    fn test_model_tracks_setpoint() {
        let mut model = PidModel::default();
        let mut last = TelemetrySample::default();
        for _ in 0..4000 {
            last = model.step(1.0, 0.005);
        }
        assert!((last.input - 1.0).abs() < 0.05);
        assert!(last.error.abs() < 0.05);
    }
}
