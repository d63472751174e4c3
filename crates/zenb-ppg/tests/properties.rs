mod common;

use proptest::prelude::*;

use common::{noise_samples, Synth};
use zenb_ppg::numeric::{spectral, CubicSpline};
use zenb_ppg::{CalibrationOffset, PpgConfig, VitalsEstimate, VitalsPipeline};

fn assert_in_ranges(est: &VitalsEstimate) -> Result<(), TestCaseError> {
    let config = PpgConfig::default();
    let r = &config.estimator.ranges;
    prop_assert!(r.heart_rate.contains(est.heart_rate), "hr {}", est.heart_rate);
    prop_assert!(r.spo2.contains(est.spo2), "spo2 {}", est.spo2);
    prop_assert!(r.systolic.contains(est.systolic), "sys {}", est.systolic);
    prop_assert!(r.diastolic.contains(est.diastolic), "dia {}", est.diastolic);
    prop_assert!(est.systolic - est.diastolic >= config.estimator.min_bp_gap - 1e-9);
    prop_assert!(r.glucose.contains(est.glucose), "glucose {}", est.glucose);
    prop_assert!(r.viscosity.contains(est.viscosity), "viscosity {}", est.viscosity);
    prop_assert!((0.0..=100.0).contains(&est.confidence));
    prop_assert!((0.0..=100.0).contains(&est.accuracy));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn estimates_stay_in_physiological_ranges(
        bpm in 40.0f64..200.0,
        amplitude in 0.05f64..40.0,
        offset in 20.0f64..250.0,
        noise in 0.0f64..5.0,
        seconds in 2.0f64..15.0,
        seed in any::<u64>(),
    ) {
        let samples = Synth { bpm, amplitude, offset, noise, seconds, seed, ..Synth::default() }
            .samples();
        let est = VitalsPipeline::new().analyze(&samples, None, None);
        assert_in_ranges(&est)?;
    }

    #[test]
    fn calibration_cannot_escape_ranges(
        glucose in -500.0f64..2000.0,
        viscosity in -10.0f64..50.0,
        sys in 0.0f64..400.0,
        dia in 0.0f64..400.0,
        seed in any::<u64>(),
    ) {
        let cal = CalibrationOffset {
            glucose: Some(glucose),
            viscosity: Some(viscosity),
            blood_pressure: Some((sys, dia)),
        };
        let samples = noise_samples(120, seed);
        let est = VitalsPipeline::new().analyze(&samples, None, Some(&cal));
        assert_in_ranges(&est)?;
    }

    #[test]
    fn noise_window_falls_back_or_stays_unconfident(seed in any::<u64>(), len in 90usize..300) {
        let report = VitalsPipeline::new()
            .analyze_detailed(&noise_samples(len, seed), None, None)
            .unwrap();
        prop_assert!(
            report.heart_rate.fallback || report.estimate.confidence < 40.0,
            "hr={:.1} conf={:.0} periodicity={:.2}",
            report.estimate.heart_rate,
            report.estimate.confidence,
            report.heart_rate.periodicity
        );
    }

    #[test]
    fn analysis_is_deterministic(seed in any::<u64>(), bpm in 50.0f64..150.0) {
        let pipeline = VitalsPipeline::new();
        let samples = Synth { bpm, noise: 1.5, seed, ..Synth::default() }.samples();
        prop_assert_eq!(
            pipeline.analyze(&samples, None, None),
            pipeline.analyze(&samples, None, None)
        );
    }

    #[test]
    fn spline_hits_every_knot(ys in prop::collection::vec(-100.0f64..100.0, 3..40)) {
        let xs: Vec<f64> = (0..ys.len()).map(|i| i as f64 * 0.5).collect();
        let spline = CubicSpline::new(&xs, &ys);
        for (x, y) in xs.iter().zip(&ys) {
            prop_assert!((spline.evaluate(*x) - y).abs() < 1e-6);
        }
    }

    #[test]
    fn fft_roundtrip_restores_signal(signal in prop::collection::vec(-10.0f64..10.0, 1..300)) {
        let restored = spectral::ifft(&spectral::fft(&signal));
        prop_assert_eq!(restored.len(), spectral::next_power_of_two(signal.len()));
        for (a, b) in signal.iter().zip(&restored) {
            prop_assert!((a - b).abs() < 1e-9);
        }
        for tail in &restored[signal.len()..] {
            prop_assert!(tail.abs() < 1e-9);
        }
    }
}
