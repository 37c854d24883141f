use scf::{ScfOutcome, ScfStatus, SpectralPoint};
use tracing::{info, warn};

pub fn report_summary(outcome: &ScfOutcome) {
    match outcome.status {
        ScfStatus::Converged => info!("\nSCF calculation finished."),
        ScfStatus::NotConverged | ScfStatus::TimeBudgetExceeded => warn!(
            "\nSCF stopped without convergence ({:?}); results are from the last iteration",
            outcome.status
        ),
    }

    if let Some(orbitals) = &outcome.orbitals {
        info!("\nFinal Energy Levels:");
        let labels: &[&str] = if orbitals.len() == 2 {
            &["Alpha", "Beta"]
        } else {
            &["Restricted"]
        };
        for (label, set) in labels.iter().zip(orbitals) {
            info!("  {} orbitals:", label);
            for (i, energy) in set.energies.iter().enumerate() {
                info!("    Level {}: {:.8} au (occ {:.3})", i + 1, energy, set.occupations[i]);
            }
            if let (Some(homo), Some(lumo)) = (set.homo(), set.lumo()) {
                info!("    HOMO-LUMO gap: {:.8} au", lumo - homo);
            }
        }
    }

    info!("\nEnergy components:\n{}", outcome.energy);
    info!("\nTotal energy: {:.10} au", outcome.energy.total());
}

pub fn report_spectrum(label: &str, points: &[SpectralPoint], contact_names: &[&str]) {
    info!("\nSpectrum of the {} operator:", label);
    info!("  {:>12} {:>14}  tr Gamma ({})", "E", "DOS", contact_names.join(", "));
    for point in points {
        let gammas: Vec<String> = point.broadening.iter().map(|g| format!("{:.6}", g)).collect();
        info!(
            "  {:>12.6} {:>14.8}  {}",
            point.energy,
            point.density_of_states,
            gammas.join(" ")
        );
    }
}
