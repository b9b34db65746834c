//! Compensación de gravedad.
//!
//! Por cada muestra se rota el vector de gravedad de referencia al marco del
//! sensor con la matriz de rotación del cuaternión estimado, se resta de la
//! aceleración cruda y se toma la norma euclidiana. El resultado es una
//! magnitud de movimiento lineal por muestra, independiente de la orientación
//! de la muñeca. Función pura, sin efectos secundarios.

use crate::orientation::Quaternion;
use crate::types::SensorSample;

/// Magnitud de la gravedad terrestre de referencia (m/s²).
pub const GRAVITY_MPS2: f64 = 9.81;

/// Gravedad de referencia expresada en el marco del sensor: tercera columna
/// de la matriz de rotación del cuaternión, escalada a 9.81 m/s².
pub fn gravity_in_sensor_frame(q: &Quaternion) -> [f64; 3] {
    let Quaternion { w, x, y, z } = *q;
    [
        GRAVITY_MPS2 * 2.0 * (x * z + y * w),
        GRAVITY_MPS2 * 2.0 * (y * z - x * w),
        GRAVITY_MPS2 * (1.0 - 2.0 * (x * x + y * y)),
    ]
}

/// Magnitud del movimiento lineal de cada muestra tras quitar la gravedad.
///
/// `samples` y `orientations` deben tener la misma longitud; el resultado
/// tiene una entrada no negativa por muestra. Una aceleración no finita
/// repite la última magnitud válida en lugar de envenenar el filtro
/// recursivo que viene después.
pub fn linear_motion_magnitudes(
    samples: &[SensorSample],
    orientations: &[Quaternion],
) -> Vec<f64> {
    let mut last_valid = 0.0;
    samples
        .iter()
        .zip(orientations)
        .map(|(sample, q)| {
            if !sample.accel.iter().all(|v| v.is_finite()) {
                return last_valid;
            }
            let g = gravity_in_sensor_frame(q);
            let lx = sample.accel[0] - g[0];
            let ly = sample.accel[1] - g[1];
            let lz = sample.accel[2] - g[2];
            last_valid = (lx * lx + ly * ly + lz * lz).sqrt();
            last_valid
        })
        .collect()
}
