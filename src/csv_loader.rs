use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use csv::{ReaderBuilder, StringRecord};

use crate::types::SensorSample;

/// Columnas de sensor esperadas en los CSV de medición, en este orden.
pub const SENSOR_COLS: [&str; 6] = ["Acel_X", "Acel_Y", "Acel_Z", "GiroX", "GiroY", "GiroZ"];

/// Datos personales del paciente incluidos en la primera fila del CSV.
/// Todos opcionales; se buscan por nombre de columna sin distinguir
/// mayúsculas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientData {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub sexo: Option<String>,
    pub edad: Option<u32>,
    pub mano_medida: Option<String>,
    pub dedo_medido: Option<String>,
    pub diagnostico: Option<String>,
    pub medicacion: Option<String>,
}

/// Una grabación cargada: muestras del sensor más metadatos del paciente.
#[derive(Debug, Clone)]
pub struct Recording {
    pub samples: Vec<SensorSample>,
    pub patient: PatientData,
}

/// Interpreta un número aceptando coma decimal (locale español).
fn parse_decimal(field: &str) -> Option<f64> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Carga una grabación desde un CSV con encabezados.
///
/// Las seis columnas de sensor son obligatorias (aceleración en m/s²,
/// giroscopio en grados/s que aquí se convierten a rad/s). Las filas con
/// valores de sensor ausentes o no numéricos se descartan completas; los
/// metadatos del paciente se leen de la primera fila de datos.
pub fn load_recording_from_csv(path: impl AsRef<Path>) -> Result<Recording> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("No se pudo abrir el CSV {:?}", path))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Encabezados ilegibles en {:?}", path))?
        .clone();

    // Mapeo normalizado: columna en minúsculas → índice
    let col_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().to_lowercase(), idx))
        .collect();

    let mut sensor_idx = [0usize; 6];
    for (slot, name) in SENSOR_COLS.iter().enumerate() {
        sensor_idx[slot] = *col_map
            .get(&name.to_lowercase())
            .ok_or_else(|| anyhow!("Falta la columna {} en {:?}", name, path))?;
    }

    let mut samples = Vec::new();
    let mut patient = PatientData::default();
    let mut first_row = true;

    for (row_idx, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("Fila {} inválida en {:?}", row_idx + 1, path))?;

        if first_row {
            patient = extract_patient_data(&record, &col_map);
            first_row = false;
        }

        let mut values = [0.0f64; 6];
        let mut complete = true;
        for (slot, &idx) in sensor_idx.iter().enumerate() {
            match record.get(idx).and_then(parse_decimal) {
                Some(v) => values[slot] = v,
                None => {
                    complete = false;
                    break;
                }
            }
        }
        // Fila incompleta: se descarta entera, igual que un dropna
        if !complete {
            continue;
        }

        samples.push(SensorSample::new(
            [values[0], values[1], values[2]],
            [
                values[3].to_radians(),
                values[4].to_radians(),
                values[5].to_radians(),
            ],
        ));
    }

    if samples.is_empty() {
        bail!("El CSV {:?} no contiene filas de sensor válidas", path);
    }

    Ok(Recording { samples, patient })
}

fn extract_patient_data(record: &StringRecord, col_map: &HashMap<String, usize>) -> PatientData {
    let text = |key: &str| {
        col_map
            .get(key)
            .and_then(|&idx| record.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let edad = col_map
        .get("edad")
        .and_then(|&idx| record.get(idx))
        .and_then(parse_decimal)
        .map(|v| v as u32);

    PatientData {
        nombre: text("nombre"),
        apellido: text("apellido"),
        sexo: text("sexo"),
        edad,
        mano_medida: text("mano"),
        dedo_medido: text("dedo"),
        diagnostico: text("diagnostico"),
        medicacion: text("medicacion"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write_temp_csv(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("tremoroscopio_{}_{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_samples_and_converts_gyro_to_radians() {
        let path = write_temp_csv(
            "basico.csv",
            "Acel_X,Acel_Y,Acel_Z,GiroX,GiroY,GiroZ\n\
             0.1,0.2,9.81,90,0,0\n\
             0.0,0.0,9.81,0,0,180\n",
        );

        let recording = load_recording_from_csv(&path).unwrap();
        assert_eq!(recording.samples.len(), 2);
        assert!((recording.samples[0].gyro[0] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((recording.samples[1].gyro[2] - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(recording.patient, PatientData::default());

        fs::remove_file(path).ok();
    }

    #[test]
    fn headers_match_case_insensitively_and_rows_with_gaps_drop() {
        let path = write_temp_csv(
            "huecos.csv",
            "acel_x,ACEL_Y,Acel_Z,girox,GiroY,giroz\n\
             0.1,0.2,9.81,0,0,0\n\
             ,0.2,9.81,0,0,0\n\
             0.1,no,9.81,0,0,0\n\
             0.3,0.4,9.81,0,0,0\n",
        );

        let recording = load_recording_from_csv(&path).unwrap();
        assert_eq!(recording.samples.len(), 2);
        assert!((recording.samples[1].accel[0] - 0.3).abs() < 1e-12);

        fs::remove_file(path).ok();
    }

    #[test]
    fn reads_patient_metadata_from_first_row() {
        let path = write_temp_csv(
            "paciente.csv",
            "Nombre,Sexo,Edad,Mano,Dedo,Acel_X,Acel_Y,Acel_Z,GiroX,GiroY,GiroZ\n\
             Ana,Femenino,\"67,0\",Derecha,Indice,0.1,0.2,9.81,0,0,0\n\
             ,,,,,0.1,0.2,9.81,0,0,0\n",
        );

        let recording = load_recording_from_csv(&path).unwrap();
        let patient = &recording.patient;
        assert_eq!(patient.nombre.as_deref(), Some("Ana"));
        assert_eq!(patient.sexo.as_deref(), Some("Femenino"));
        assert_eq!(patient.edad, Some(67));
        assert_eq!(patient.mano_medida.as_deref(), Some("Derecha"));
        assert_eq!(patient.dedo_medido.as_deref(), Some("Indice"));

        fs::remove_file(path).ok();
    }

    #[test]
    fn missing_sensor_column_is_an_error() {
        let path = write_temp_csv(
            "incompleto.csv",
            "Acel_X,Acel_Y,Acel_Z,GiroX,GiroY\n0.1,0.2,9.81,0,0\n",
        );
        assert!(load_recording_from_csv(&path).is_err());
        fs::remove_file(path).ok();
    }

    #[test]
    fn empty_csv_is_an_error() {
        let path = write_temp_csv(
            "vacio.csv",
            "Acel_X,Acel_Y,Acel_Z,GiroX,GiroY,GiroZ\n",
        );
        assert!(load_recording_from_csv(&path).is_err());
        fs::remove_file(path).ok();
    }
}
