//! Estimación de orientación por fusión giroscopio + acelerómetro.
//!
//! Filtro complementario tipo Mahony: la velocidad angular propaga el
//! cuaternión y el acelerómetro actúa como referencia ruidosa de la dirección
//! de la gravedad para corregir la deriva. La corrección es proporcional
//! (kP) más un término integral (kI) que absorbe el sesgo del giroscopio.
//!
//! La actualización por muestra es un pliegue explícito
//! `(orientación previa, muestra) → orientación siguiente`; no hay estado
//! global del filtro fuera de la estructura.

use crate::types::SensorSample;

/// Cuaternión unitario (w, x, y, z) con w como parte escalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Cuaternión identidad (sin rotación).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalized(self) -> Self {
        let norm = self.norm().max(1e-9);
        Self {
            w: self.w / norm,
            x: self.x / norm,
            y: self.y / norm,
            z: self.z / norm,
        }
    }

    /// Producto de Hamilton: `self * rhs`.
    pub fn mul(self, rhs: Self) -> Self {
        Self {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }

    /// Actitud inicial a partir de una lectura de gravedad: roll y pitch
    /// desde el acelerómetro, yaw indeterminado (0).
    pub fn from_accel(accel: [f64; 3]) -> Self {
        let [ax, ay, az] = accel;
        let roll = ay.atan2(az);
        let pitch = (-ax).atan2((ay * ay + az * az).sqrt());

        let (sx, cx) = (roll / 2.0).sin_cos();
        let (sy, cy) = (pitch / 2.0).sin_cos();

        Self::new(cy * cx, cy * sx, sy * cx, -sy * sx).normalized()
    }

    /// Dirección esperada de la gravedad en el marco del sensor según esta
    /// orientación (tercera fila de la matriz de rotación transpuesta).
    pub fn gravity_direction(&self) -> [f64; 3] {
        let Self { w, x, y, z } = *self;
        [
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        ]
    }
}

/// Ganancias del filtro de fusión.
#[derive(Debug, Clone)]
pub struct MahonyConfig {
    /// Ganancia proporcional de la corrección por gravedad.
    pub kp: f64,
    /// Ganancia integral para el sesgo del giroscopio.
    pub ki: f64,
}

impl Default for MahonyConfig {
    fn default() -> Self {
        Self { kp: 1.0, ki: 0.3 }
    }
}

/// Estado del filtro: orientación actual y sesgo integral del giroscopio.
#[derive(Debug, Clone)]
pub struct MahonyFilter {
    quaternion: Quaternion,
    bias: [f64; 3],
    dt: f64,
    config: MahonyConfig,
}

impl MahonyFilter {
    pub fn new(config: MahonyConfig, sample_rate_hz: f64) -> Self {
        Self {
            quaternion: Quaternion::identity(),
            bias: [0.0; 3],
            dt: 1.0 / sample_rate_hz,
            config,
        }
    }

    /// Fija la actitud inicial desde la primera lectura del acelerómetro.
    /// Una lectura degenerada (norma nula o NaN) deja la identidad.
    pub fn align_to_gravity(&mut self, accel: [f64; 3]) {
        let norm = (accel[0] * accel[0] + accel[1] * accel[1] + accel[2] * accel[2]).sqrt();
        if norm.is_finite() && norm > 0.0 {
            self.quaternion = Quaternion::from_accel(accel);
        }
    }

    pub fn quaternion(&self) -> Quaternion {
        self.quaternion
    }

    /// Un paso del pliegue: incorpora una muestra y devuelve la nueva
    /// orientación.
    ///
    /// Una muestra degenerada nunca interrumpe el procesamiento: giroscopio
    /// nulo o NaN conserva la última orientación válida; acelerómetro nulo o
    /// NaN omite la corrección y deja solo la integración del giroscopio.
    pub fn update(&mut self, sample: &SensorSample) -> Quaternion {
        let gyro_norm = sample.gyro_norm();
        if !gyro_norm.is_finite() || gyro_norm == 0.0 {
            return self.quaternion;
        }

        let mut omega = sample.gyro;

        let accel_norm = sample.accel_norm();
        if accel_norm.is_finite() && accel_norm > 0.0 {
            let a = [
                sample.accel[0] / accel_norm,
                sample.accel[1] / accel_norm,
                sample.accel[2] / accel_norm,
            ];
            let v = self.quaternion.gravity_direction();

            // Error de alineación: â × v̂
            let error = [
                a[1] * v[2] - a[2] * v[1],
                a[2] * v[0] - a[0] * v[2],
                a[0] * v[1] - a[1] * v[0],
            ];

            for i in 0..3 {
                self.bias[i] += self.config.ki * error[i] * self.dt;
                omega[i] += self.config.kp * error[i] + self.bias[i];
            }
        }

        // q̇ = ½ q ⊗ (0, ω); integración de Euler y renormalización
        let p = Quaternion::new(0.0, omega[0], omega[1], omega[2]);
        let q_dot = self.quaternion.mul(p);
        let q = self.quaternion;
        self.quaternion = Quaternion::new(
            q.w + 0.5 * q_dot.w * self.dt,
            q.x + 0.5 * q_dot.x * self.dt,
            q.y + 0.5 * q_dot.y * self.dt,
            q.z + 0.5 * q_dot.z * self.dt,
        )
        .normalized();

        self.quaternion
    }
}

/// Serie de orientaciones de una grabación completa.
#[derive(Debug, Clone)]
pub struct OrientationEstimate {
    /// Un cuaternión por muestra, en orden temporal.
    pub quaternions: Vec<Quaternion>,
    /// Muestras degeneradas (NaN o aceleración nula) recuperadas sin abortar.
    pub degenerate_samples: usize,
}

fn is_degenerate(sample: &SensorSample) -> bool {
    !sample.is_finite() || sample.accel_norm() == 0.0
}

/// Estima la orientación de cada muestra de la grabación.
///
/// Devuelve `None` con menos de 2 muestras: un resultado vacío explícito,
/// nunca una orientación fabricada.
pub fn estimate_orientations(
    samples: &[SensorSample],
    sample_rate_hz: f64,
    config: &MahonyConfig,
) -> Option<OrientationEstimate> {
    if samples.len() < 2 {
        return None;
    }

    let mut degenerate_samples = 0;
    let mut quaternions = Vec::with_capacity(samples.len());

    let first = &samples[0];
    if is_degenerate(first) {
        degenerate_samples += 1;
    }

    let mut filter = MahonyFilter::new(config.clone(), sample_rate_hz);
    filter.align_to_gravity(first.accel);
    quaternions.push(filter.quaternion());

    for sample in &samples[1..] {
        if is_degenerate(sample) {
            degenerate_samples += 1;
        }
        quaternions.push(filter.update(sample));
    }

    Some(OrientationEstimate {
        quaternions,
        degenerate_samples,
    })
}
