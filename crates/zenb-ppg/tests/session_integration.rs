mod common;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{solid_frame, Synth};
use zenb_ppg::{
    EstimateStatus, EstimatorState, Illumination, MeasurementSink, PpgConfig, PpgError,
    ReferenceDataset, Session, TickEvent, VitalsEstimate,
};

/// Torch that records every switch.
#[derive(Clone, Default)]
struct FakeTorch {
    log: Arc<Mutex<Vec<bool>>>,
}

impl Illumination for FakeTorch {
    fn supports_illumination(&self) -> bool {
        true
    }

    fn set_illumination(&mut self, on: bool) -> zenb_ppg::Result<()> {
        self.log.lock().push(on);
        Ok(())
    }
}

/// Torch present but always failing.
struct BrokenTorch;

impl Illumination for BrokenTorch {
    fn supports_illumination(&self) -> bool {
        true
    }

    fn set_illumination(&mut self, _on: bool) -> zenb_ppg::Result<()> {
        Err(PpgError::HardwareUnavailable("permission denied".into()))
    }
}

#[derive(Clone, Default)]
struct CollectingSink {
    records: Arc<Mutex<Vec<(VitalsEstimate, DateTime<Utc>)>>>,
}

impl MeasurementSink for CollectingSink {
    fn record(&mut self, estimate: &VitalsEstimate, at: DateTime<Utc>) {
        self.records.lock().push((*estimate, at));
    }
}

fn new_session(torch: Box<dyn Illumination>) -> Session {
    Session::new(PpgConfig::default(), ReferenceDataset::builtin(), torch)
}

#[test]
fn full_recording_window() {
    let torch = FakeTorch::default();
    let sink = CollectingSink::default();
    let mut session = new_session(Box::new(torch.clone())).with_sink(Box::new(sink.clone()));
    session.start();
    assert!(session.is_illuminated());

    let samples = Synth { seconds: 20.0, ..Synth::default() }.samples();
    let tick = Duration::from_millis(33);
    let mut periodic = Vec::new();
    let mut last = None;
    for sample in samples {
        session.submit_sample(sample);
        match session.tick(tick) {
            TickEvent::Pending => {}
            TickEvent::Estimate(est) => periodic.push(est),
            TickEvent::Finished(est) => {
                last = est;
                break;
            }
        }
    }

    assert!(periodic.len() >= 5, "only {} periodic estimates", periodic.len());
    let last = last.expect("final estimate");
    assert_eq!(last.status, EstimateStatus::Valid);
    assert!((last.heart_rate - 72.0).abs() <= 3.0);

    assert_eq!(session.state(), EstimatorState::Idle);
    assert_eq!(session.buffer().len(), 0);
    assert_eq!(*torch.log.lock(), vec![true, false]);
    assert_eq!(sink.records.lock().len(), periodic.len() + 1);
}

#[test]
fn stop_before_minimum_is_degraded() {
    let mut session = new_session(Box::new(FakeTorch::default()));
    session.start();
    for sample in (Synth { seconds: 1.0, ..Synth::default() }).samples() {
        session.submit_sample(sample);
    }
    let est = session.stop().expect("flushed estimate");
    assert_eq!(est.status, EstimateStatus::InsufficientSamples);
    assert_eq!(est.confidence, 0.0);
    assert!(session.stop().is_none());
}

#[test]
fn broken_torch_is_not_fatal() {
    let mut session = new_session(Box::new(BrokenTorch));
    session.start();
    assert!(session.is_running());
    assert!(!session.is_illuminated());
    for sample in (Synth { seconds: 5.0, ..Synth::default() }).samples() {
        session.submit_sample(sample);
    }
    assert!(matches!(session.tick(Duration::from_secs(2)), TickEvent::Estimate(_)));
}

#[test]
fn sampler_thread_feeds_shared_buffer() {
    let mut session = new_session(Box::new(FakeTorch::default()));
    session.start();
    let buffer = session.buffer();
    let samples = Synth { seconds: 6.0, ..Synth::default() }.samples();

    let writer = thread::spawn(move || {
        for sample in samples {
            buffer.push(sample);
        }
    });
    writer.join().unwrap();

    match session.tick(Duration::from_millis(2_000)) {
        TickEvent::Estimate(est) => assert!((est.heart_rate - 72.0).abs() <= 3.0),
        other => panic!("expected an estimate, got {:?}", other),
    }
    assert_eq!(session.state(), EstimatorState::Emitted);
}

#[test]
fn frames_are_reduced_to_samples() {
    let mut session = new_session(Box::new(FakeTorch::default()));
    session.start();
    for i in 0..10u8 {
        let frame = solid_frame(16, 12, 150 + i);
        session.submit_frame(&frame, 16, 12).unwrap();
    }
    assert_eq!(session.buffer().len(), 10);
    let bad = session.submit_frame(&[0u8; 8], 16, 12);
    assert!(matches!(bad, Err(PpgError::InvalidFrame(_))));
    assert_eq!(session.buffer().len(), 10);
}

#[test]
fn drive_paces_samples_at_the_sampling_interval() {
    let torch = FakeTorch::default();
    let mut session = new_session(Box::new(torch.clone()));
    assert_eq!(session.sampling_interval(), Duration::from_millis(33));

    let mut samples = Synth { seconds: 20.0, ..Synth::default() }.samples().into_iter();
    let mut pulled = 0usize;
    let mut periodic = 0usize;
    let last = session
        .drive(
            || {
                pulled += 1;
                samples.next()
            },
            |_| periodic += 1,
        )
        .expect("final estimate");

    // 15 s window at 33 ms per sample
    assert_eq!(pulled, 455);
    assert!(periodic >= 5, "only {} periodic estimates", periodic);
    assert_eq!(last.status, EstimateStatus::Valid);
    assert!((last.heart_rate - 72.0).abs() <= 3.0);
    assert!(!session.is_running());
    assert_eq!(*torch.log.lock(), vec![true, false]);
}

#[test]
fn drive_stops_when_source_runs_dry() {
    let mut session = new_session(Box::new(FakeTorch::default()));
    let mut samples = Synth { seconds: 5.0, ..Synth::default() }.samples().into_iter();
    let last = session.drive(|| samples.next(), |_| {}).expect("final estimate");
    assert!(!last.is_degraded());
    assert!(session.elapsed() < Duration::from_secs(6));
    assert_eq!(session.state(), EstimatorState::Idle);
}
