//! Capture session driver.
//!
//! Two cadences share one [`SharedBuffer`]: frames (or pre-reduced samples)
//! arrive at the sampling rate, and [`Session::tick`] runs the processing
//! chain every `processing_interval_ms` once enough samples are buffered.
//! Reaching the recording window stops the session and flushes a final
//! estimate, degraded if the buffer never filled.
//!
//! Callers with their own camera callback push frames and call `tick`
//! themselves; [`Session::drive`] runs both cadences from a pull source.

use chrono::Utc;
use std::time::Duration;

use crate::config::PpgConfig;
use crate::error::Result;
use crate::estimator::EstimatorState;
use crate::history::MeasurementSink;
use crate::pipeline::VitalsPipeline;
use crate::reference::ReferenceDataset;
use crate::sampler::{FrameSampler, Illumination, Sample, SharedBuffer};
use crate::vitals::{CalibrationOffset, Demographics, VitalsEstimate};

/// What a tick produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickEvent {
    /// Nothing due yet
    Pending,
    /// Periodic real-time estimate
    Estimate(VitalsEstimate),
    /// Recording window elapsed; session has stopped
    Finished(Option<VitalsEstimate>),
}

pub struct Session {
    config: PpgConfig,
    pipeline: VitalsPipeline,
    sampler: FrameSampler,
    buffer: SharedBuffer,
    torch: Box<dyn Illumination>,
    sink: Option<Box<dyn MeasurementSink>>,
    demographics: Option<Demographics>,
    calibration: Option<CalibrationOffset>,
    state: EstimatorState,
    elapsed: Duration,
    since_processing: Duration,
    latest: Option<VitalsEstimate>,
}

impl Session {
    pub fn new(config: PpgConfig, dataset: ReferenceDataset, torch: Box<dyn Illumination>) -> Self {
        let pipeline = VitalsPipeline::with_config(&config, dataset);
        let sampler = FrameSampler::new(config.sampler.clone());
        let buffer = SharedBuffer::new(config.buffer_capacity());
        Self {
            config,
            pipeline,
            sampler,
            buffer,
            torch,
            sink: None,
            demographics: None,
            calibration: None,
            state: EstimatorState::Idle,
            elapsed: Duration::ZERO,
            since_processing: Duration::ZERO,
            latest: None,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn MeasurementSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn set_demographics(&mut self, demographics: Option<Demographics>) {
        self.demographics = demographics;
    }

    pub fn set_calibration(&mut self, calibration: Option<CalibrationOffset>) {
        self.calibration = calibration;
    }

    pub fn state(&self) -> EstimatorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state != EstimatorState::Idle
    }

    pub fn is_illuminated(&self) -> bool {
        self.sampler.is_illuminated()
    }

    /// Handle for a sampler running on another thread.
    pub fn buffer(&self) -> SharedBuffer {
        self.buffer.clone()
    }

    /// Period of the sampling cadence.
    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.config.session.sampling_interval_ms.max(1))
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn latest(&self) -> Option<&VitalsEstimate> {
        self.latest.as_ref()
    }

    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        if self.config.session.use_illumination {
            self.sampler.start(self.torch.as_mut());
        }
        self.buffer.clear();
        self.elapsed = Duration::ZERO;
        self.since_processing = Duration::ZERO;
        self.latest = None;
        self.transition(EstimatorState::Accumulating);
        log::info!(
            "session started (window {:.0} s, torch {})",
            self.config.session.recording_window_secs,
            if self.sampler.is_illuminated() { "on" } else { "off" }
        );
    }

    /// Reduce one RGBA frame and buffer it. Ignored while idle.
    pub fn submit_frame(&mut self, data: &[u8], width: u32, height: u32) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        let sample = self.sampler.process_raw(data, width, height)?;
        self.submit_sample(sample);
        Ok(())
    }

    pub fn submit_sample(&mut self, sample: Sample) {
        if !self.is_running() {
            return;
        }
        self.buffer.push(sample);
        self.refresh_state();
    }

    /// Advance the session clock by `dt`.
    pub fn tick(&mut self, dt: Duration) -> TickEvent {
        if !self.is_running() {
            return TickEvent::Pending;
        }
        self.elapsed += dt;
        self.since_processing += dt;
        self.refresh_state();

        let window = Duration::from_secs_f64(self.config.session.recording_window_secs);
        if self.elapsed >= window {
            log::info!("recording window reached after {:?}", self.elapsed);
            return TickEvent::Finished(self.stop());
        }

        let interval = Duration::from_millis(self.config.session.processing_interval_ms);
        if self.since_processing < interval {
            return TickEvent::Pending;
        }
        self.since_processing = Duration::ZERO;
        if !self.state.can_estimate() {
            return TickEvent::Pending;
        }

        self.transition(EstimatorState::Estimating);
        let estimate = self.run_pipeline();
        self.transition(EstimatorState::Emitted);
        TickEvent::Estimate(estimate)
    }

    /// Run the session from `source`, taking one sample per sampling
    /// interval and processing as it falls due. Starts the session if idle.
    /// Ends when the recording window elapses or the source runs dry, and
    /// returns the final estimate. Periodic estimates go to `on_estimate`.
    pub fn drive<S, E>(&mut self, mut source: S, mut on_estimate: E) -> Option<VitalsEstimate>
    where
        S: FnMut() -> Option<Sample>,
        E: FnMut(&VitalsEstimate),
    {
        self.start();
        let dt = self.sampling_interval();
        loop {
            match source() {
                Some(sample) => self.submit_sample(sample),
                None => {
                    log::info!("sample source ended after {:?}", self.elapsed);
                    return self.stop();
                }
            }
            match self.tick(dt) {
                TickEvent::Pending => {}
                TickEvent::Estimate(estimate) => on_estimate(&estimate),
                TickEvent::Finished(estimate) => return estimate,
            }
        }
    }

    /// Stop both cadences, flush the final estimate (if enabled) and
    /// release the buffer. Returns `None` when already stopped.
    pub fn stop(&mut self) -> Option<VitalsEstimate> {
        if !self.is_running() {
            return None;
        }
        self.sampler.stop(self.torch.as_mut());

        let result = if self.config.session.flush_final {
            let estimate = self.run_pipeline();
            if estimate.is_degraded() {
                log::warn!(
                    "final estimate degraded: {} of {} samples",
                    self.buffer.len(),
                    self.pipeline.min_samples()
                );
            } else {
                log::info!(
                    "final estimate: hr={:.0} spo2={:.0} bp={} conf={:.0}%",
                    estimate.heart_rate,
                    estimate.spo2,
                    estimate.blood_pressure(),
                    estimate.confidence
                );
            }
            Some(estimate)
        } else {
            None
        };

        self.buffer.clear();
        self.transition(EstimatorState::Idle);
        log::info!("session stopped after {:?}", self.elapsed);
        result
    }

    fn run_pipeline(&mut self) -> VitalsEstimate {
        let snapshot = self.buffer.snapshot();
        let estimate = self.pipeline.analyze(
            &snapshot,
            self.demographics.as_ref(),
            self.calibration.as_ref(),
        );
        if let Some(sink) = self.sink.as_mut() {
            sink.record(&estimate, Utc::now());
        }
        self.latest = Some(estimate);
        estimate
    }

    fn refresh_state(&mut self) {
        let next = self.state.on_sample(self.buffer.len(), self.pipeline.min_samples());
        self.transition(next);
    }

    fn transition(&mut self, next: EstimatorState) {
        if next != self.state {
            log::debug!("estimator {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.sampler.is_illuminated() {
            self.sampler.stop(self.torch.as_mut());
        }
    }
}
