//! Filtro pasa banda de temblor, fase cero.
//!
//! Butterworth de orden par realizado como cascada de secciones de segundo
//! orden (pasa altas en el borde inferior, pasa bajas en el superior) vía
//! transformada bilineal. La señal se procesa hacia adelante y hacia atrás
//! (estilo `filtfilt`), de modo que la respuesta resultante no introduce
//! desfase: las ventanas posteriores conservan su posición temporal real.
//!
//! Cada sección arranca en el estado estacionario de su primera muestra, así
//! una entrada constante produce salida constante (cero para las secciones
//! pasa altas) sin transitorio de arranque.

use std::f64::consts::PI;

/// Coeficientes de una sección bicuadrática normalizada (a0 = 1).
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    fn lowpass(fs: f64, fc: f64, q: f64) -> Self {
        let wc = (PI * fc / fs).tan();
        let wc2 = wc * wc;
        let k = 1.0 + wc / q + wc2;

        Self {
            b0: wc2 / k,
            b1: 2.0 * wc2 / k,
            b2: wc2 / k,
            a1: 2.0 * (wc2 - 1.0) / k,
            a2: (1.0 - wc / q + wc2) / k,
        }
    }

    fn highpass(fs: f64, fc: f64, q: f64) -> Self {
        let wc = (PI * fc / fs).tan();
        let wc2 = wc * wc;
        let k = 1.0 + wc / q + wc2;

        Self {
            b0: 1.0 / k,
            b1: -2.0 / k,
            b2: 1.0 / k,
            a1: 2.0 * (wc2 - 1.0) / k,
            a2: (1.0 - wc / q + wc2) / k,
        }
    }

    /// Ganancia en continua: H(z=1).
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }
}

/// Factores Q de los pares de polos Butterworth de un filtro de orden par.
fn butterworth_qs(order: usize) -> Vec<f64> {
    (0..order / 2)
        .map(|k| {
            let theta = PI * (2 * k + 1) as f64 / (2.0 * order as f64);
            1.0 / (2.0 * theta.cos())
        })
        .collect()
}

/// Aplica una sección en forma directa I, con el estado inicial fijado al
/// estacionario de la primera muestra (una constante pasa sin transitorio).
fn apply_biquad(signal: &[f64], c: &Biquad) -> Vec<f64> {
    let x0 = signal[0];
    let y0 = x0 * c.dc_gain();

    let (mut x1, mut x2) = (x0, x0);
    let (mut y1, mut y2) = (y0, y0);

    let mut out = Vec::with_capacity(signal.len());
    for &x in signal {
        let y = c.b0 * x + c.b1 * x1 + c.b2 * x2 - c.a1 * y1 - c.a2 * y2;
        out.push(y);
        x2 = x1;
        x1 = x;
        y2 = y1;
        y1 = y;
    }
    out
}

fn apply_cascade(signal: &[f64], sections: &[Biquad]) -> Vec<f64> {
    let mut out = signal.to_vec();
    for section in sections {
        out = apply_biquad(&out, section);
    }
    out
}

/// Mínimo de muestras para que el pase adelante-atrás sea estable, análogo al
/// requisito de relleno de `filtfilt`.
pub fn min_signal_len(order: usize) -> usize {
    3 * (2 * order + 1)
}

/// Pasa banda Butterworth [low_hz, high_hz] de fase cero sobre la señal de
/// movimiento lineal.
///
/// `order` debe ser par (validado por la configuración). Devuelve `None` si
/// la señal no supera `min_signal_len(order)`: una señal corta produciría un
/// transitorio inestable, nunca salida basura.
pub fn bandpass_zero_phase(
    signal: &[f64],
    fs: f64,
    low_hz: f64,
    high_hz: f64,
    order: usize,
) -> Option<Vec<f64>> {
    if signal.len() <= min_signal_len(order) {
        return None;
    }

    let mut sections = Vec::with_capacity(order);
    for q in butterworth_qs(order) {
        sections.push(Biquad::highpass(fs, low_hz, q));
    }
    for q in butterworth_qs(order) {
        sections.push(Biquad::lowpass(fs, high_hz, q));
    }

    // Pase hacia adelante, inversión, segundo pase y reinversión: la fase de
    // ida se cancela con la de vuelta.
    let forward = apply_cascade(signal, &sections);
    let mut reversed: Vec<f64> = forward.into_iter().rev().collect();
    reversed = apply_cascade(&reversed, &sections);
    reversed.reverse();

    Some(reversed)
}
