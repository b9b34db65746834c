//! Análisis espectral por ventanas de la señal filtrada.
//!
//! La señal se parte en bloques contiguos sin solapamiento de exactamente
//! `window_samples` muestras; un bloque final incompleto se descarta, nunca
//! se rellena con ceros. Por bloque: se quita la media, se estima la densidad
//! espectral de potencia (periodograma con ventana de Hann, apto para
//! segmentos cortos casi estacionarios), y de ahí salen la frecuencia
//! dominante, el RMS y la amplitud de desplazamiento.

use rustfft::{num_complex::Complex, FftPlanner};

use crate::config::AnalysisConfig;
use crate::types::{AggregateMetrics, WindowMetrics};

/// Piso de frecuencia para estimar amplitud de desplazamiento (Hz). Cerca del
/// borde inferior del filtro el denominador de la doble integración se
/// dispara, así que por debajo la amplitud se reporta como 0.
const AMPLITUDE_FREQ_FLOOR_HZ: f64 = 1.5;

/// Analizador de ventanas. Mantiene el planificador FFT para reutilizar los
/// planes entre ventanas del mismo tamaño.
pub struct WindowAnalyzer {
    planner: FftPlanner<f64>,
}

impl WindowAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Parte la señal filtrada en ventanas completas y calcula las métricas
    /// de cada una. Con menos de una ventana completa devuelve un vector
    /// vacío.
    pub fn analyze(&mut self, filtered: &[f64], config: &AnalysisConfig) -> Vec<WindowMetrics> {
        let window_samples = config.window_samples();
        if window_samples == 0 {
            return Vec::new();
        }

        filtered
            .chunks_exact(window_samples)
            .enumerate()
            .map(|(index, block)| self.window_metrics(index, block, config.sample_rate_hz))
            .collect()
    }

    fn window_metrics(&mut self, index: usize, block: &[f64], fs: f64) -> WindowMetrics {
        // Quitar la media del bloque antes de estimar el espectro
        let mean = block.iter().sum::<f64>() / block.len() as f64;
        let detrended: Vec<f64> = block.iter().map(|x| x - mean).collect();

        let (freqs, psd) = self.periodogram(&detrended, fs);

        // Bin de máxima potencia; los empates resuelven al primero, así un
        // espectro nulo reporta 0 Hz
        let mut peak_idx = 0;
        let mut peak_power = 0.0;
        for (i, &p) in psd.iter().enumerate() {
            if p > peak_power {
                peak_power = p;
                peak_idx = i;
            }
        }
        let dominant_frequency_hz = if psd.is_empty() { 0.0 } else { freqs[peak_idx] };

        let rms_accel =
            (detrended.iter().map(|x| x * x).sum::<f64>() / detrended.len() as f64).sqrt();

        let max = detrended.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let min = detrended.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let amplitude_accel = (max - min) / 2.0;

        // Relación de movimiento armónico simple: x = a / (2πf)², en cm y
        // con el factor 2 del modelo de referencia
        let amplitude_cm = if dominant_frequency_hz > AMPLITUDE_FREQ_FLOOR_HZ {
            let omega = 2.0 * std::f64::consts::PI * dominant_frequency_hz;
            amplitude_accel * 100.0 / (omega * omega) * 2.0
        } else {
            0.0
        };

        WindowMetrics {
            index,
            dominant_frequency_hz,
            rms_accel,
            amplitude_accel,
            amplitude_cm,
        }
    }

    /// Densidad espectral de potencia unilateral del bloque (ventana de Hann,
    /// escala de densidad 1/(fs·Σw²)). Devuelve (frecuencias, PSD).
    fn periodogram(&mut self, block: &[f64], fs: f64) -> (Vec<f64>, Vec<f64>) {
        let n = block.len();
        if n == 0 {
            return (Vec::new(), Vec::new());
        }

        let window: Vec<f64> = (0..n)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / n as f64).cos())
            .collect();
        let win_sumsq: f64 = window.iter().map(|w| w * w).sum();

        let half = n / 2;
        let freqs: Vec<f64> = (0..=half).map(|k| k as f64 * fs / n as f64).collect();

        if win_sumsq == 0.0 {
            // Bloque de una sola muestra: la ventana anula todo
            return (freqs, vec![0.0; half + 1]);
        }

        let mut buffer: Vec<Complex<f64>> = block
            .iter()
            .zip(&window)
            .map(|(&x, &w)| Complex::new(x * w, 0.0))
            .collect();

        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut buffer);

        let scale = 1.0 / (fs * win_sumsq);
        let psd: Vec<f64> = (0..=half)
            .map(|k| {
                let mut p = buffer[k].norm_sqr() * scale;
                // Espectro unilateral: duplicar los bins interiores (ni el
                // DC ni el de Nyquist cuando n es par)
                let is_nyquist = n % 2 == 0 && k == half;
                if k > 0 && !is_nyquist {
                    p *= 2.0;
                }
                p
            })
            .collect();

        (freqs, psd)
    }
}

impl Default for WindowAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduce las métricas por ventana a un promedio por prueba. `None` si no hay
/// ventanas.
pub fn aggregate(windows: &[WindowMetrics]) -> Option<AggregateMetrics> {
    if windows.is_empty() {
        return None;
    }

    let n = windows.len() as f64;
    Some(AggregateMetrics {
        dominant_frequency_hz: windows.iter().map(|w| w.dominant_frequency_hz).sum::<f64>() / n,
        rms_accel: windows.iter().map(|w| w.rms_accel).sum::<f64>() / n,
        amplitude_cm: windows.iter().map(|w| w.amplitude_cm).sum::<f64>() / n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const FS: f64 = 100.0;

    fn config() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    fn sine(freq: f64, n: usize, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / FS).sin())
            .collect()
    }

    #[test]
    fn partial_trailing_block_is_discarded() {
        let mut analyzer = WindowAnalyzer::new();
        // 3 ventanas completas + 150 muestras sobrantes
        let signal = sine(5.0, 3 * 200 + 150, 1.0);
        let windows = analyzer.analyze(&signal, &config());
        assert_eq!(windows.len(), 3);
        assert_eq!(
            windows.iter().map(|w| w.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn fewer_samples_than_a_window_yields_nothing() {
        let mut analyzer = WindowAnalyzer::new();
        let signal = sine(5.0, 199, 1.0);
        assert!(analyzer.analyze(&signal, &config()).is_empty());
        assert!(analyzer.analyze(&[], &config()).is_empty());
    }

    #[test]
    fn dominant_frequency_matches_sine_within_resolution() {
        let mut analyzer = WindowAnalyzer::new();
        let resolution = 1.0 / config().window_seconds;

        for f0 in [2.0, 5.0, 5.25, 8.0, 12.0] {
            let signal = sine(f0, 400, 1.0);
            let windows = analyzer.analyze(&signal, &config());
            assert_eq!(windows.len(), 2);
            for w in &windows {
                assert!(
                    (w.dominant_frequency_hz - f0).abs() <= resolution + 1e-9,
                    "f0 = {}, dominante = {}",
                    f0,
                    w.dominant_frequency_hz
                );
            }
        }
    }

    #[test]
    fn rms_of_unit_sine_is_inverse_sqrt_two() {
        let mut analyzer = WindowAnalyzer::new();
        let windows = analyzer.analyze(&sine(5.0, 200, 1.0), &config());
        assert!((windows[0].rms_accel - 1.0 / 2f64.sqrt()).abs() < 0.01);
    }

    #[test]
    fn amplitude_follows_harmonic_relation() {
        let mut analyzer = WindowAnalyzer::new();
        let windows = analyzer.analyze(&sine(5.0, 200, 1.0), &config());

        let omega = 2.0 * PI * 5.0;
        let expected = 1.0 * 100.0 / (omega * omega) * 2.0;
        assert!(
            (windows[0].amplitude_cm - expected).abs() < expected * 0.05,
            "amplitud = {}",
            windows[0].amplitude_cm
        );
    }

    #[test]
    fn amplitude_scales_linearly_with_input() {
        let mut analyzer = WindowAnalyzer::new();
        let small = analyzer.analyze(&sine(5.0, 400, 0.3), &config());
        let large = analyzer.analyze(&sine(5.0, 400, 0.9), &config());

        for (s, l) in small.iter().zip(&large) {
            assert_eq!(s.dominant_frequency_hz, l.dominant_frequency_hz);
            assert!((l.amplitude_cm / s.amplitude_cm - 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn amplitude_is_zero_at_or_below_frequency_floor() {
        let mut analyzer = WindowAnalyzer::new();

        for f0 in [1.0, 1.5] {
            let windows = analyzer.analyze(&sine(f0, 200, 2.0), &config());
            assert_eq!(windows[0].dominant_frequency_hz, f0);
            assert_eq!(windows[0].amplitude_cm, 0.0);
            assert!(windows[0].amplitude_accel > 1.0);
        }
    }

    #[test]
    fn all_zero_window_reports_zeros() {
        let mut analyzer = WindowAnalyzer::new();
        let windows = analyzer.analyze(&vec![0.0; 200], &config());

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].dominant_frequency_hz, 0.0);
        assert_eq!(windows[0].rms_accel, 0.0);
        assert_eq!(windows[0].amplitude_cm, 0.0);
    }

    #[test]
    fn aggregate_means_window_fields() {
        let windows = vec![
            WindowMetrics {
                index: 0,
                dominant_frequency_hz: 4.0,
                rms_accel: 0.2,
                amplitude_accel: 0.5,
                amplitude_cm: 0.1,
            },
            WindowMetrics {
                index: 1,
                dominant_frequency_hz: 6.0,
                rms_accel: 0.4,
                amplitude_accel: 0.7,
                amplitude_cm: 0.3,
            },
        ];

        let agg = aggregate(&windows).unwrap();
        assert!((agg.dominant_frequency_hz - 5.0).abs() < 1e-12);
        assert!((agg.rms_accel - 0.3).abs() < 1e-12);
        assert!((agg.amplitude_cm - 0.2).abs() < 1e-12);
    }

    #[test]
    fn aggregate_of_nothing_is_none() {
        assert!(aggregate(&[]).is_none());
    }
}
