use color_eyre::eyre::{Result, WrapErr};
use scf::config::TransportConfig;
use scf::{spectral_scan, ModelSystem, OperatorAssembly, ScfOutcome, Session, SpectralPoint};
use tracing::info;

/// Energy scan of every spin channel's converged operator.
pub fn run_transport(
    outcome: &ScfOutcome,
    model: &ModelSystem,
    transport: &TransportConfig,
    session: &mut Session,
) -> Result<Vec<(String, Vec<SpectralPoint>)>> {
    let contacts = transport.contacts().wrap_err("Invalid contact description")?;
    let energies = transport.energies().wrap_err("Invalid energy grid")?;
    let params = transport.sancho_params();
    if session.first_time("transport") {
        info!(
            "\nAttaching {} contacts: {}",
            contacts.len(),
            transport.contact_names().join(", ")
        );
    }

    let labels: &[&str] = if outcome.operators.len() == 2 {
        &["alpha", "beta"]
    } else {
        &["restricted"]
    };

    labels
        .iter()
        .zip(&outcome.operators)
        .map(|(label, operator)| {
            let points = spectral_scan(
                operator,
                model.overlap(),
                &contacts,
                &energies,
                transport.eta(),
                &params,
            )
            .wrap_err_with(|| format!("Energy scan of the {} operator failed", label))?;
            Ok((label.to_string(), points))
        })
        .collect()
}
