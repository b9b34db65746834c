//! Diagnóstico por reglas sobre las métricas agregadas.
//!
//! Umbrales fijos de amplitud y frecuencia por prueba, pensados como apoyo a
//! la decisión clínica, no como diagnóstico definitivo.

use std::fmt;

use crate::types::{AggregateMetrics, TestKind};

/// Amplitud mínima (cm) para considerar el temblor clínicamente relevante.
const AMPLITUDE_THRESHOLD_CM: f64 = 0.3;
/// Banda de frecuencia típica del temblor de reposo parkinsoniano (Hz).
const PARKINSON_FREQ_HZ: (f64, f64) = (3.0, 6.5);
/// Banda de frecuencia típica del temblor esencial postural/de acción (Hz).
const ESSENTIAL_FREQ_HZ: (f64, f64) = (7.5, 12.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnosis {
    ProbableParkinson,
    ProbableTemblorEsencial,
    DentroDeParametros,
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Diagnosis::ProbableParkinson => "Probable Parkinson",
            Diagnosis::ProbableTemblorEsencial => "Probable Temblor Esencial",
            Diagnosis::DentroDeParametros => "Temblor dentro de parámetros normales",
        };
        f.write_str(text)
    }
}

/// Aplica las reglas de diagnóstico a los promedios por prueba. Una prueba
/// ausente cuenta como amplitud y frecuencia 0.
pub fn rule_based_diagnosis(results: &[(TestKind, AggregateMetrics)]) -> Diagnosis {
    let amplitude = |test: TestKind| {
        results
            .iter()
            .find(|(kind, _)| *kind == test)
            .map(|(_, m)| m.amplitude_cm)
            .unwrap_or(0.0)
    };
    let frequency = |test: TestKind| {
        results
            .iter()
            .find(|(kind, _)| *kind == test)
            .map(|(_, m)| m.dominant_frequency_hz)
            .unwrap_or(0.0)
    };

    let in_band = |freq: f64, band: (f64, f64)| freq >= band.0 && freq <= band.1;

    if amplitude(TestKind::Reposo) > AMPLITUDE_THRESHOLD_CM
        && in_band(frequency(TestKind::Reposo), PARKINSON_FREQ_HZ)
    {
        Diagnosis::ProbableParkinson
    } else if (amplitude(TestKind::Postural) > AMPLITUDE_THRESHOLD_CM
        || amplitude(TestKind::Accion) > AMPLITUDE_THRESHOLD_CM)
        && (in_band(frequency(TestKind::Postural), ESSENTIAL_FREQ_HZ)
            || in_band(frequency(TestKind::Accion), ESSENTIAL_FREQ_HZ))
    {
        Diagnosis::ProbableTemblorEsencial
    } else {
        Diagnosis::DentroDeParametros
    }
}
