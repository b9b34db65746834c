/*
Análisis de Temblor - Rust + ONNX

Sistema de apoyo al diagnóstico diferencial de temblor que:
1. Carga mediciones CSV de las tres pruebas clínicas (Reposo, Postural, Acción)
2. Fusiona acelerómetro y giroscopio, quita la gravedad, aísla la banda de
   temblor y calcula métricas por ventana (frecuencia dominante, RMS, amplitud)
3. Aplica el diagnóstico por reglas y, opcionalmente, el modelo ONNX
   pre-entrenado

Uso:
    tremoroscopio analizar [--reposo r.csv] [--postural p.csv] [--accion a.csv]
    tremoroscopio comparar <r1> <p1> <a1> <r2> <p2> <a2>
    tremoroscopio predecir <modelo.onnx> <meta.json> <reposo> <postural> <accion>
*/

use std::env;

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::unbounded;

use tremoroscopio::classifier::TremorClassifier;
use tremoroscopio::config::AnalysisConfig;
use tremoroscopio::csv_loader::{load_recording_from_csv, PatientData};
use tremoroscopio::diagnosis::rule_based_diagnosis;
use tremoroscopio::pipeline::analyze_tremor;
use tremoroscopio::types::{AggregateMetrics, TestKind, TremorOutcome};

/// Umbral de confianza mínima para aceptar la predicción del modelo.
const CONFIDENCE_THRESHOLD: f32 = 0.70;

fn main() -> Result<()> {
    println!("🧠 Análisis de Temblor - Rust + ONNX\n");

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("analizar") => cmd_analizar(&args[1..]),
        Some("comparar") => cmd_comparar(&args[1..]),
        Some("predecir") => cmd_predecir(&args[1..]),
        Some(otro) => {
            print_usage();
            bail!("Modo desconocido: {}", otro);
        }
        None => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("Uso:");
    println!("  tremoroscopio analizar [--reposo r.csv] [--postural p.csv] [--accion a.csv]");
    println!("  tremoroscopio comparar <r1> <p1> <a1> <r2> <p2> <a2>");
    println!("  tremoroscopio predecir <modelo.onnx> <meta.json> <reposo> <postural> <accion>");
}

/// Asocia cada bandera de prueba con su archivo CSV.
fn parse_test_files(args: &[String]) -> Result<Vec<(TestKind, String)>> {
    let mut files = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let kind = match arg.as_str() {
            "--reposo" => TestKind::Reposo,
            "--postural" => TestKind::Postural,
            "--accion" => TestKind::Accion,
            _ => bail!("Argumento desconocido: {}", arg),
        };
        let path = iter
            .next()
            .ok_or_else(|| anyhow!("Falta la ruta del CSV después de {}", arg))?;
        files.push((kind, path.clone()));
    }

    Ok(files)
}

/// Carga y analiza una medición completa. Las pruebas son independientes
/// entre sí, así que cada una corre en su propio hilo.
fn analyze_measurement(
    files: &[(TestKind, String)],
    config: &AnalysisConfig,
) -> Result<(PatientData, Vec<(TestKind, TremorOutcome)>)> {
    let mut recordings = Vec::new();
    for (kind, path) in files {
        let recording = load_recording_from_csv(path)
            .with_context(|| format!("No se pudo cargar la prueba {}", kind))?;
        recordings.push((*kind, recording));
    }

    let patient = recordings[0].1.patient.clone();

    let (tx, rx) = unbounded();
    let mut handles = Vec::new();
    for (kind, recording) in recordings {
        let tx = tx.clone();
        let config = config.clone();
        handles.push(std::thread::spawn(move || {
            let outcome = analyze_tremor(&recording.samples, &config);
            let _ = tx.send((kind, outcome));
        }));
    }
    drop(tx);

    let mut outcomes = Vec::new();
    while let Ok((kind, outcome)) = rx.recv() {
        outcomes.push((kind, outcome?));
    }
    for handle in handles {
        let _ = handle.join();
    }

    // Orden estable Reposo → Postural → Acción para el reporte
    outcomes.sort_by_key(|(kind, _)| TestKind::ALL.iter().position(|k| k == kind));

    Ok((patient, outcomes))
}

fn print_patient(patient: &PatientData) {
    let mut parts = Vec::new();
    match (&patient.nombre, &patient.apellido) {
        (Some(nombre), Some(apellido)) => parts.push(format!("{} {}", nombre, apellido)),
        (Some(nombre), None) => parts.push(nombre.clone()),
        _ => {}
    }
    if let Some(sexo) = &patient.sexo {
        parts.push(sexo.clone());
    }
    if let Some(edad) = patient.edad {
        parts.push(format!("{} años", edad));
    }
    if let Some(mano) = &patient.mano_medida {
        parts.push(format!("mano {}", mano));
    }
    if let Some(dedo) = &patient.dedo_medido {
        parts.push(format!("dedo {}", dedo));
    }

    if !parts.is_empty() {
        println!("👤 Paciente: {}\n", parts.join(" | "));
    }
}

fn print_outcome(kind: TestKind, outcome: &TremorOutcome, config: &AnalysisConfig) {
    println!("📊 Prueba {}", kind);
    match outcome {
        TremorOutcome::Metrics(analysis) => {
            if analysis.degenerate_samples > 0 {
                println!(
                    "⚠️  {} muestras degeneradas recuperadas",
                    analysis.degenerate_samples
                );
            }

            println!(
                "   {:>7} {:>10} {:>16} {:>12} {:>14}",
                "Ventana", "Tiempo (s)", "Frecuencia (Hz)", "RMS (m/s2)", "Amplitud (cm)"
            );
            for w in &analysis.windows {
                // Eje temporal para graficar, con el solapamiento configurado
                let tiempo =
                    w.index as f64 * config.window_seconds * (1.0 - config.window_overlap);
                println!(
                    "   {:>7} {:>10.1} {:>16.2} {:>12.4} {:>14.2}",
                    w.index, tiempo, w.dominant_frequency_hz, w.rms_accel, w.amplitude_cm
                );
            }

            let agg = &analysis.aggregate;
            println!(
                "   Promedio: {:.2} Hz | RMS {:.4} m/s² | amplitud {:.2} cm\n",
                agg.dominant_frequency_hz, agg.rms_accel, agg.amplitude_cm
            );
        }
        TremorOutcome::Insufficient(reason) => {
            println!("⚠️  Sin métricas: {}\n", reason);
        }
    }
}

fn collect_aggregates(outcomes: &[(TestKind, TremorOutcome)]) -> Vec<(TestKind, AggregateMetrics)> {
    outcomes
        .iter()
        .filter_map(|(kind, outcome)| outcome.metrics().map(|a| (*kind, a.aggregate)))
        .collect()
}

fn cmd_analizar(args: &[String]) -> Result<()> {
    let files = parse_test_files(args)?;
    if files.is_empty() {
        bail!("Debes indicar al menos una prueba (--reposo, --postural o --accion)");
    }

    println!("🔧 Modo: Análisis de una medición\n");
    let config = AnalysisConfig::default();
    let (patient, outcomes) = analyze_measurement(&files, &config)?;

    print_patient(&patient);
    for (kind, outcome) in &outcomes {
        print_outcome(*kind, outcome, &config);
    }

    let aggregates = collect_aggregates(&outcomes);
    if aggregates.is_empty() {
        println!("⚠️  Ninguna prueba produjo métricas; no hay diagnóstico");
    } else {
        println!("🩺 Diagnóstico automático: {}", rule_based_diagnosis(&aggregates));
    }

    Ok(())
}

fn cmd_comparar(args: &[String]) -> Result<()> {
    if args.len() != 6 {
        bail!("Uso: tremoroscopio comparar <r1> <p1> <a1> <r2> <p2> <a2>");
    }

    println!("🔧 Modo: Comparación de dos mediciones\n");
    let config = AnalysisConfig::default();

    let files1: Vec<(TestKind, String)> = TestKind::ALL
        .iter()
        .zip(&args[0..3])
        .map(|(kind, path)| (*kind, path.clone()))
        .collect();
    let files2: Vec<(TestKind, String)> = TestKind::ALL
        .iter()
        .zip(&args[3..6])
        .map(|(kind, path)| (*kind, path.clone()))
        .collect();

    let (patient, outcomes1) = analyze_measurement(&files1, &config)?;
    let (_, outcomes2) = analyze_measurement(&files2, &config)?;

    print_patient(&patient);
    println!("═══ Medición 1 ═══\n");
    for (kind, outcome) in &outcomes1 {
        print_outcome(*kind, outcome, &config);
    }
    println!("═══ Medición 2 ═══\n");
    for (kind, outcome) in &outcomes2 {
        print_outcome(*kind, outcome, &config);
    }

    let agg1 = collect_aggregates(&outcomes1);
    let agg2 = collect_aggregates(&outcomes2);
    if agg1.is_empty() || agg2.is_empty() {
        println!("⚠️  Faltan métricas en alguna medición; no hay comparación");
        return Ok(());
    }

    let mean_amplitude = |aggs: &[(TestKind, AggregateMetrics)]| {
        aggs.iter().map(|(_, m)| m.amplitude_cm).sum::<f64>() / aggs.len() as f64
    };
    let amp1 = mean_amplitude(&agg1);
    let amp2 = mean_amplitude(&agg2);

    if amp1 < amp2 {
        println!(
            "📉 La Medición 1 muestra una amplitud de temblor promedio ({:.2} cm) más baja \
             que la Medición 2 ({:.2} cm), lo que sugiere una mayor reducción del temblor.",
            amp1, amp2
        );
    } else if amp2 < amp1 {
        println!(
            "📉 La Medición 2 muestra una amplitud de temblor promedio ({:.2} cm) más baja \
             que la Medición 1 ({:.2} cm), lo que sugiere una mayor reducción del temblor.",
            amp2, amp1
        );
    } else {
        println!(
            "📊 Ambas mediciones muestran la misma amplitud de temblor promedio ({:.2} cm).",
            amp1
        );
    }

    Ok(())
}

fn cmd_predecir(args: &[String]) -> Result<()> {
    if args.len() != 5 {
        bail!("Uso: tremoroscopio predecir <modelo.onnx> <meta.json> <reposo> <postural> <accion>");
    }

    println!("🔧 Modo: Predicción con modelo pre-entrenado\n");
    let config = AnalysisConfig::default();

    let files: Vec<(TestKind, String)> = TestKind::ALL
        .iter()
        .zip(&args[2..5])
        .map(|(kind, path)| (*kind, path.clone()))
        .collect();

    let (patient, outcomes) = analyze_measurement(&files, &config)?;
    print_patient(&patient);
    for (kind, outcome) in &outcomes {
        print_outcome(*kind, outcome, &config);
    }

    let aggregates = collect_aggregates(&outcomes);
    if aggregates.len() < TestKind::ALL.len() {
        println!("⚠️  El modelo espera las tres pruebas; las ausentes entran como NaN");
    }

    println!("🔧 Inicializando clasificador ONNX...");
    let mut classifier = TremorClassifier::new(&args[0], &args[1])?;
    println!("✅ Clasificador cargado\n");

    let mut scores: Vec<(String, f32)> = classifier
        .predict_scores(&patient, &aggregates)?
        .into_iter()
        .collect();
    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    let (best_label, best_conf) = scores
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("El modelo no devolvió probabilidades"))?;

    println!("🎯 Predicción: {} ({:.1}%)", best_label, best_conf * 100.0);
    if best_conf < CONFIDENCE_THRESHOLD {
        println!("⚠️  Confianza baja; interpretar con cautela");
    }

    println!("\nProbabilidades:");
    for (idx, (label, score)) in scores.iter().enumerate() {
        println!("  {:>2}. {:<35} {:>6.2}%", idx + 1, label, score * 100.0);
    }

    Ok(())
}
