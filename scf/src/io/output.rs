//! Output formatting and logging utilities

use color_eyre::eyre::Result;
use scf::{ScfOutcome, SpectralPoint};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::time::SystemTime as StdSystemTime;
use tracing::info;
use tracing_subscriber::{
    filter::LevelFilter, fmt::format::Writer, fmt::layer, fmt::time::FormatTime,
    layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry,
};

/// Custom time formatter that shows only seconds
struct SecondPrecisionTimer;

impl FormatTime for SecondPrecisionTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let total_seconds = StdSystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        write!(
            w,
            "{:02}:{:02}:{:02}",
            (total_seconds / 3600) % 24,
            (total_seconds / 60) % 60,
            total_seconds % 60
        )
    }
}

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Setup output logging to file or stdout
pub fn setup_output(output_path: Option<&String>, verbosity: u8) {
    let level = level_for(verbosity);
    match output_path {
        Some(path) => match File::create(path) {
            Ok(log) => {
                let file_layer = layer()
                    .with_writer(log)
                    .with_timer(SecondPrecisionTimer)
                    .with_ansi(false)
                    .with_filter(level);
                Registry::default().with(file_layer).init();
                info!("Output will be written to: {}", path);
            }
            Err(err) => eprintln!("Could not create output file {}: {}", path, err),
        },
        None => {
            let stdout_layer = layer()
                .with_writer(std::io::stdout)
                .with_timer(SecondPrecisionTimer)
                .with_ansi(true)
                .with_filter(level);
            Registry::default().with(stdout_layer).init();
            info!("Output will be printed to stdout");
        }
    }
}

/// Plain-text record of a finished run
pub fn write_summary<W: Write>(
    writer: &mut W,
    outcome: &ScfOutcome,
    spectra: &[(String, Vec<SpectralPoint>)],
    contact_names: &[&str],
) -> Result<()> {
    writeln!(writer, "SCF status: {:?}", outcome.status)?;
    writeln!(writer, "Iterations: {}", outcome.iterations)?;
    writeln!(writer, "Residual: {:.6e}", outcome.residual)?;
    writeln!(writer, "Energy components (au):")?;
    writeln!(writer, "{}", outcome.energy)?;

    if let Some(orbitals) = &outcome.orbitals {
        for (channel, set) in orbitals.iter().enumerate() {
            writeln!(writer, "Orbital energies, channel {}:", channel)?;
            for (k, (energy, occ)) in set.energies.iter().zip(set.occupations.iter()).enumerate() {
                writeln!(writer, "  {:>4} {:>16.8} {:>6.3}", k + 1, energy, occ)?;
            }
        }
    }

    for (label, points) in spectra {
        writeln!(writer, "Spectrum ({}):", label)?;
        write!(writer, "  {:>12} {:>14}", "E", "DOS")?;
        for name in contact_names {
            write!(writer, " {:>14}", format!("tr Gamma_{}", name))?;
        }
        writeln!(writer)?;
        for point in points {
            write!(
                writer,
                "  {:>12.6} {:>14.8}",
                point.energy, point.density_of_states
            )?;
            for gamma in &point.broadening {
                write!(writer, " {:>14.8}", gamma)?;
            }
            writeln!(writer)?;
        }
    }
    Ok(())
}
