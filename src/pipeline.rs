//! Tubería completa de análisis de temblor.
//!
//! Flujo lineal y sin estado entre llamadas: orientación → compensación de
//! gravedad → pasa banda → métricas por ventana → promedio. Cualquier etapa
//! sin datos suficientes corta el análisis de esa prueba con un resultado
//! vacío explícito; las pruebas hermanas (Reposo/Postural/Acción) se analizan
//! de forma independiente y pueden correr en hilos separados sin bloqueos.
//!
//! El resultado depende solo de las muestras y la configuración: sin
//! aleatoriedad ni reloj, totalmente reproducible.

use crate::config::{AnalysisConfig, ConfigError};
use crate::filter;
use crate::gravity;
use crate::orientation::{self, MahonyConfig};
use crate::types::{InsufficientReason, SensorSample, TremorAnalysis, TremorOutcome};
use crate::windows::{self, WindowAnalyzer};

/// Analiza una grabación de una prueba y devuelve las métricas por ventana y
/// el promedio, o la razón de insuficiencia.
///
/// Solo la configuración inválida es un error; la falta de datos es un estado
/// terminal normal del análisis.
pub fn analyze_tremor(
    samples: &[SensorSample],
    config: &AnalysisConfig,
) -> Result<TremorOutcome, ConfigError> {
    config.validate()?;

    let estimate = match orientation::estimate_orientations(
        samples,
        config.sample_rate_hz,
        &MahonyConfig::default(),
    ) {
        Some(estimate) => estimate,
        None => {
            return Ok(TremorOutcome::Insufficient(
                InsufficientReason::TooFewSamples { got: samples.len() },
            ));
        }
    };

    let motion = gravity::linear_motion_magnitudes(samples, &estimate.quaternions);

    let filtered = match filter::bandpass_zero_phase(
        &motion,
        config.sample_rate_hz,
        config.band_low_hz,
        config.band_high_hz,
        config.filter_order,
    ) {
        Some(filtered) => filtered,
        None => {
            return Ok(TremorOutcome::Insufficient(
                InsufficientReason::SignalTooShort {
                    got: motion.len(),
                    min: filter::min_signal_len(config.filter_order),
                },
            ));
        }
    };

    let window_metrics = WindowAnalyzer::new().analyze(&filtered, config);

    match windows::aggregate(&window_metrics) {
        Some(aggregate) => Ok(TremorOutcome::Metrics(TremorAnalysis {
            windows: window_metrics,
            aggregate,
            degenerate_samples: estimate.degenerate_samples,
        })),
        None => Ok(TremorOutcome::Insufficient(
            InsufficientReason::NoCompleteWindows {
                samples: filtered.len(),
                window_samples: config.window_samples(),
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const FS: f64 = 100.0;
    const G: f64 = 9.81;

    /// Gravedad estática en x más un seno de movimiento lineal en el mismo
    /// eje, giroscopio en silencio.
    fn recording_with_sine(freq: f64, amplitude: f64, seconds: f64) -> Vec<SensorSample> {
        let n = (seconds * FS) as usize;
        (0..n)
            .map(|i| {
                let t = i as f64 / FS;
                let s = amplitude * (2.0 * PI * freq * t).sin();
                SensorSample::new([G + s, 0.0, 0.0], [0.0, 0.0, 0.0])
            })
            .collect()
    }

    #[test]
    fn fewer_than_two_samples_is_insufficient() {
        let config = AnalysisConfig::default();

        let outcome = analyze_tremor(&[], &config).unwrap();
        assert_eq!(
            outcome,
            TremorOutcome::Insufficient(InsufficientReason::TooFewSamples { got: 0 })
        );

        let one = [SensorSample::new([0.0, 0.0, G], [0.0; 3])];
        let outcome = analyze_tremor(&one, &config).unwrap();
        assert_eq!(
            outcome,
            TremorOutcome::Insufficient(InsufficientReason::TooFewSamples { got: 1 })
        );
    }

    #[test]
    fn short_signal_fails_at_the_filter() {
        let config = AnalysisConfig::default();
        let samples = recording_with_sine(5.0, 0.5, 0.2); // 20 muestras

        let outcome = analyze_tremor(&samples, &config).unwrap();
        assert!(matches!(
            outcome,
            TremorOutcome::Insufficient(InsufficientReason::SignalTooShort { got: 20, .. })
        ));
    }

    #[test]
    fn one_second_recording_has_no_complete_window() {
        let config = AnalysisConfig::default();
        let samples = recording_with_sine(5.0, 0.5, 1.0); // 100 muestras, ventana de 200

        let outcome = analyze_tremor(&samples, &config).unwrap();
        assert_eq!(
            outcome,
            TremorOutcome::Insufficient(InsufficientReason::NoCompleteWindows {
                samples: 100,
                window_samples: 200,
            })
        );
    }

    #[test]
    fn invalid_config_is_rejected_before_processing() {
        let config = AnalysisConfig {
            band_high_hz: 80.0,
            ..AnalysisConfig::default()
        };
        let samples = recording_with_sine(5.0, 0.5, 4.0);
        assert!(analyze_tremor(&samples, &config).is_err());
    }

    #[test]
    fn all_zero_recording_yields_one_silent_window() {
        // Escenario: 2 s de grabación completamente nula a 100 Hz
        let config = AnalysisConfig::default();
        let samples = vec![SensorSample::new([0.0; 3], [0.0; 3]); 200];

        let outcome = analyze_tremor(&samples, &config).unwrap();
        let analysis = outcome.metrics().expect("debe producir métricas");

        assert_eq!(analysis.windows.len(), 1);
        assert_eq!(analysis.windows[0].dominant_frequency_hz, 0.0);
        assert!(analysis.windows[0].rms_accel < 1e-6);
        assert_eq!(analysis.windows[0].amplitude_cm, 0.0);
        assert!(analysis.aggregate.rms_accel < 1e-6);
        assert_eq!(analysis.degenerate_samples, 200);
    }

    #[test]
    fn five_hertz_tremor_is_recovered_in_both_windows() {
        // Escenario: 4 s con un seno limpio de 5 Hz y 0.05 g sobre gravedad
        // estática en un eje
        let config = AnalysisConfig::default();
        let samples = recording_with_sine(5.0, 0.05 * G, 4.0);

        let outcome = analyze_tremor(&samples, &config).unwrap();
        let analysis = outcome.metrics().expect("debe producir métricas");

        assert_eq!(analysis.windows.len(), 2);
        for w in &analysis.windows {
            assert!(
                (w.dominant_frequency_hz - 5.0).abs() <= 0.5,
                "dominante = {}",
                w.dominant_frequency_hz
            );
            assert!(w.amplitude_cm > 0.0);
        }
        assert!((analysis.aggregate.dominant_frequency_hz - 5.0).abs() <= 0.5);
        assert!(analysis.aggregate.rms_accel > 0.1);
    }

    #[test]
    fn dominant_frequency_tracks_input_across_the_band() {
        let config = AnalysisConfig::default();
        let resolution = 1.0 / config.window_seconds;

        for f0 in [2.0, 4.0, 8.0, 12.0] {
            let samples = recording_with_sine(f0, 0.05 * G, 4.0);
            let outcome = analyze_tremor(&samples, &config).unwrap();
            let analysis = outcome.metrics().expect("debe producir métricas");

            for w in &analysis.windows {
                assert!(
                    (w.dominant_frequency_hz - f0).abs() <= resolution,
                    "f0 = {}, dominante = {}",
                    f0,
                    w.dominant_frequency_hz
                );
            }
        }
    }

    #[test]
    fn amplitude_scales_with_input_amplitude() {
        let config = AnalysisConfig::default();

        let small = analyze_tremor(&recording_with_sine(5.0, 0.2, 4.0), &config).unwrap();
        let large = analyze_tremor(&recording_with_sine(5.0, 0.6, 4.0), &config).unwrap();

        let small = small.metrics().unwrap();
        let large = large.metrics().unwrap();

        let ratio = large.aggregate.amplitude_cm / small.aggregate.amplitude_cm;
        assert!((ratio - 3.0).abs() < 0.05, "razón = {}", ratio);
    }

    #[test]
    fn degenerate_sample_mid_recording_does_not_abort() {
        let config = AnalysisConfig::default();
        let mut samples = recording_with_sine(5.0, 0.5, 4.0);
        samples[150] = SensorSample::new([f64::NAN, f64::NAN, f64::NAN], [0.0; 3]);

        let outcome = analyze_tremor(&samples, &config).unwrap();
        let analysis = outcome.metrics().expect("debe producir métricas");
        assert_eq!(analysis.degenerate_samples, 1);
        assert!(analysis
            .windows
            .iter()
            .all(|w| w.dominant_frequency_hz.is_finite() && w.rms_accel.is_finite()));
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let config = AnalysisConfig::default();
        let samples = recording_with_sine(7.0, 0.3, 6.0);

        let first = analyze_tremor(&samples, &config).unwrap();
        let second = analyze_tremor(&samples, &config).unwrap();
        assert_eq!(first, second);
    }
}
