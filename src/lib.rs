//! Análisis cuantitativo de temblor de muñeca a partir de un IMU de 6 ejes.
//!
//! El núcleo es una tubería de señal que:
//! 1. Fusiona giroscopio + acelerómetro en una orientación por muestra (Mahony)
//! 2. Resta la gravedad según la orientación y toma la magnitud del movimiento
//! 3. Aísla la banda de temblor (1-15 Hz) con un pasa banda de fase cero
//! 4. Calcula métricas espectrales por ventana (frecuencia dominante, RMS,
//!    amplitud de desplazamiento)
//! 5. Promedia las ventanas en un registro por prueba (Reposo/Postural/Acción)
//!
//! Alrededor del núcleo viven los colaboradores: carga de CSV, diagnóstico por
//! reglas y el clasificador ONNX pre-entrenado (solo inferencia).

pub mod classifier;
pub mod config;
pub mod csv_loader;
pub mod diagnosis;
pub mod filter;
pub mod gravity;
pub mod orientation;
pub mod pipeline;
pub mod types;
pub mod windows;
