//! Clasificador estadístico pre-entrenado (solo inferencia).
//!
//! Carga un modelo ONNX que consume el vector de características de orden
//! fijo: edad, las 9 métricas de temblor (frecuencia, RMS y amplitud por
//! prueba) y los tres campos demográficos categóricos codificados según el
//! JSON de metadatos que acompaña al modelo. El entrenamiento y la
//! validación quedan fuera de este sistema.

use std::collections::HashMap;
use std::fs;

use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::ValueType;
use serde::Deserialize;
use thiserror::Error;

use crate::csv_loader::PatientData;
use crate::types::{AggregateMetrics, TestKind};

/// Cantidad de características que espera el modelo.
pub const MODEL_FEATURES: usize = 13;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("ONNX Runtime error: {0}")]
    OnnxError(#[from] ort::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid feature size: expected {expected}, got {actual}")]
    InvalidFeatureSize { expected: usize, actual: usize },

    #[error("El modelo no devolvió probabilidades")]
    EmptyOutput,

    #[error("Missing ONNX {kind}")]
    MissingIo { kind: &'static str },
}

/// Codificación numérica de los campos demográficos categóricos, en
/// minúsculas. Un valor fuera del mapa (o ausente) se codifica como NaN.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryEncodings {
    #[serde(default)]
    pub sexo: HashMap<String, f32>,
    #[serde(default)]
    pub mano: HashMap<String, f32>,
    #[serde(default)]
    pub dedo: HashMap<String, f32>,
}

impl CategoryEncodings {
    fn encode(map: &HashMap<String, f32>, value: Option<&str>) -> f32 {
        value
            .map(|v| v.trim().to_lowercase())
            .and_then(|v| map.get(&v).copied())
            .unwrap_or(f32::NAN)
    }
}

#[derive(Debug, Deserialize)]
struct ModelMetaJson {
    index_to_class: HashMap<String, String>,
    #[serde(default)]
    categorias: CategoryEncodings,
}

/// Construye el vector de características en el orden fijo del modelo:
/// `[edad, Frec_Reposo, RMS_Reposo, Amp_Reposo, Frec_Postural, RMS_Postural,
/// Amp_Postural, Frec_Accion, RMS_Accion, Amp_Accion, sexo, mano, dedo]`.
///
/// Una prueba ausente aporta NaN en sus tres métricas.
pub fn feature_vector(
    patient: &PatientData,
    results: &[(TestKind, AggregateMetrics)],
    encodings: &CategoryEncodings,
) -> Vec<f32> {
    let metrics_for = |test: TestKind| {
        results
            .iter()
            .find(|(kind, _)| *kind == test)
            .map(|(_, m)| *m)
    };

    let mut features = Vec::with_capacity(MODEL_FEATURES);
    features.push(patient.edad.map(|e| e as f32).unwrap_or(f32::NAN));

    for test in TestKind::ALL {
        match metrics_for(test) {
            Some(m) => {
                features.push(m.dominant_frequency_hz as f32);
                features.push(m.rms_accel as f32);
                features.push(m.amplitude_cm as f32);
            }
            None => features.extend([f32::NAN; 3]),
        }
    }

    features.push(CategoryEncodings::encode(
        &encodings.sexo,
        patient.sexo.as_deref(),
    ));
    features.push(CategoryEncodings::encode(
        &encodings.mano,
        patient.mano_medida.as_deref(),
    ));
    features.push(CategoryEncodings::encode(
        &encodings.dedo,
        patient.dedo_medido.as_deref(),
    ));

    features
}

pub struct TremorClassifier {
    session: Session,
    labels: Vec<String>,
    encodings: CategoryEncodings,
    input_name: String,
    prob_output_name: String,
}

impl TremorClassifier {
    /// Carga el modelo ONNX y su JSON de metadatos (clases + codificaciones).
    pub fn new(model_path: &str, meta_path: &str) -> Result<Self, ClassifierError> {
        let (labels, encodings) = Self::load_meta(meta_path)?;

        let session = Session::builder()?.commit_from_file(model_path)?;

        let input_name = session
            .inputs
            .get(0)
            .map(|input| input.name.clone())
            .ok_or(ClassifierError::MissingIo { kind: "input" })?;

        let prob_output_name = session
            .outputs
            .iter()
            .find(|output| {
                matches!(
                    output.output_type,
                    ValueType::Tensor {
                        ty: TensorElementType::Float32,
                        ..
                    }
                )
            })
            .or_else(|| session.outputs.get(0))
            .map(|output| output.name.clone())
            .ok_or(ClassifierError::MissingIo { kind: "output" })?;

        println!("[ONNX] Modelo cargado: {}", model_path);
        println!("[ONNX] Clases: {:?}", labels);
        println!("[ONNX] Input: {}", input_name);
        println!("[ONNX] Output: {}", prob_output_name);

        Ok(Self {
            session,
            labels,
            encodings,
            input_name,
            prob_output_name,
        })
    }

    fn load_meta(path: &str) -> Result<(Vec<String>, CategoryEncodings), ClassifierError> {
        let content = fs::read_to_string(path)?;
        let meta: ModelMetaJson = serde_json::from_str(&content)?;

        // Convertir el mapa índice→clase en un Vec ordenado por índice
        let mut pairs: Vec<(usize, String)> = meta
            .index_to_class
            .into_iter()
            .filter_map(|(k, v)| k.parse::<usize>().ok().map(|idx| (idx, v)))
            .collect();
        pairs.sort_by_key(|(idx, _)| *idx);

        Ok((
            pairs.into_iter().map(|(_, name)| name).collect(),
            meta.categorias,
        ))
    }

    /// Predice la clase de temblor más probable para un paciente.
    pub fn predict(
        &mut self,
        patient: &PatientData,
        results: &[(TestKind, AggregateMetrics)],
    ) -> Result<(String, f32), ClassifierError> {
        let scores = self.predict_scores(patient, results)?;

        let (label, &score) = scores
            .iter()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .ok_or(ClassifierError::EmptyOutput)?;

        Ok((label.clone(), score))
    }

    /// Predice probabilidades para todas las clases.
    pub fn predict_scores(
        &mut self,
        patient: &PatientData,
        results: &[(TestKind, AggregateMetrics)],
    ) -> Result<HashMap<String, f32>, ClassifierError> {
        let features = feature_vector(patient, results, &self.encodings);

        if features.len() != MODEL_FEATURES {
            return Err(ClassifierError::InvalidFeatureSize {
                expected: MODEL_FEATURES,
                actual: features.len(),
            });
        }

        // Tensor de entrada [1, 13] como (shape, datos)
        let shape_vec = vec![1_usize, MODEL_FEATURES];
        let input_value = ort::value::Value::from_array((shape_vec, features))?;

        let outputs = self.session.run(ort::inputs![
            self.input_name.as_str() => &input_value,
        ])?;

        let (prob_shape, prob_data) =
            outputs[self.prob_output_name.as_str()].try_extract_tensor::<f32>()?;

        let num_classes = if prob_shape.len() >= 2 {
            prob_shape[1] as usize
        } else {
            prob_shape[0] as usize
        };

        let mut scores = HashMap::new();
        for (i, label) in self.labels.iter().enumerate().take(num_classes) {
            scores.insert(label.clone(), prob_data[i]);
        }

        Ok(scores)
    }

    pub fn get_labels(&self) -> &[String] {
        &self.labels
    }
}
