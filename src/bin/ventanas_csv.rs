use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use tremoroscopio::config::AnalysisConfig;
use tremoroscopio::csv_loader::load_recording_from_csv;
use tremoroscopio::filter::bandpass_zero_phase;
use tremoroscopio::gravity::linear_motion_magnitudes;
use tremoroscopio::orientation::{estimate_orientations, MahonyConfig};
use tremoroscopio::pipeline::analyze_tremor;
use tremoroscopio::types::TremorOutcome;

struct ReplayOptions {
    dump_movimiento: bool,
    dump_filtrada: bool,
}

fn parse_args() -> Result<(PathBuf, ReplayOptions)> {
    let mut dump_movimiento = false;
    let mut dump_filtrada = false;
    let mut csv_path: Option<PathBuf> = None;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--dump-movimiento" => dump_movimiento = true,
            "--dump-filtrada" => dump_filtrada = true,
            _ => {
                if csv_path.is_some() {
                    bail!("Uso: ventanas_csv [--dump-movimiento] [--dump-filtrada] <archivo.csv>");
                }
                csv_path = Some(PathBuf::from(arg));
            }
        }
    }

    let csv_path = csv_path.ok_or_else(|| anyhow!("Debes especificar un archivo CSV"))?;
    Ok((
        csv_path,
        ReplayOptions {
            dump_movimiento,
            dump_filtrada,
        },
    ))
}

fn main() -> Result<()> {
    let (csv_path, opts) = parse_args()?;
    println!("🎞️  Reproduciendo medición desde {:?}", csv_path);

    let config = AnalysisConfig::default();
    let recording = load_recording_from_csv(&csv_path)?;
    println!("📈 {} muestras a {} Hz", recording.samples.len(), config.sample_rate_hz);

    match analyze_tremor(&recording.samples, &config)? {
        TremorOutcome::Metrics(analysis) => {
            if analysis.degenerate_samples > 0 {
                println!(
                    "⚠️  {} muestras degeneradas recuperadas",
                    analysis.degenerate_samples
                );
            }

            println!("\nVentanas ({}):", analysis.windows.len());
            for w in &analysis.windows {
                println!(
                    "  {:>3}: {:>5.2} Hz | RMS {:>8.4} m/s² | amp {:>7.4} m/s² | {:>6.3} cm",
                    w.index, w.dominant_frequency_hz, w.rms_accel, w.amplitude_accel, w.amplitude_cm
                );
            }

            let agg = &analysis.aggregate;
            println!(
                "\n🥇 Promedio: {:.2} Hz | RMS {:.4} m/s² | amplitud {:.2} cm",
                agg.dominant_frequency_hz, agg.rms_accel, agg.amplitude_cm
            );
        }
        TremorOutcome::Insufficient(reason) => {
            println!("⚠️  Sin métricas: {}", reason);
        }
    }

    if opts.dump_movimiento || opts.dump_filtrada {
        let estimate = estimate_orientations(
            &recording.samples,
            config.sample_rate_hz,
            &MahonyConfig::default(),
        )
        .ok_or_else(|| anyhow!("Muy pocas muestras para estimar orientación"))?;
        let motion = linear_motion_magnitudes(&recording.samples, &estimate.quaternions);

        if opts.dump_movimiento {
            println!("\n📊 Señal de movimiento lineal ({} valores):", motion.len());
            for (idx, value) in motion.iter().enumerate() {
                println!("  {:05}: {:>12.6}", idx, value);
            }
        }

        if opts.dump_filtrada {
            let filtered = bandpass_zero_phase(
                &motion,
                config.sample_rate_hz,
                config.band_low_hz,
                config.band_high_hz,
                config.filter_order,
            )
            .ok_or_else(|| anyhow!("Señal demasiado corta para el filtro"))?;

            println!("\n🧱 Señal filtrada ({} valores):", filtered.len());
            for (idx, value) in filtered.iter().enumerate() {
                println!("  {:05}: {:>12.6}", idx, value);
            }
        }
    }

    Ok(())
}
