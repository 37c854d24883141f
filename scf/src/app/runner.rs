use color_eyre::eyre::{Result, WrapErr};
use scf::config::{Args, Config};
use scf::{ModelSystem, ScfDriver, ScfOutcome, ScfSettings, Session};
use tracing::{debug, info};

/// Driver settings from the configuration, with command-line overrides.
pub fn resolve_settings(args: &Args, config: &Config) -> Result<ScfSettings> {
    let mut config = config.clone();
    if let Some(multiplicity) = args.multiplicity {
        info!("Overriding multiplicity with: {}", multiplicity);
        config.system.multiplicity = Some(multiplicity);
    }
    if args.spin_polarized {
        config.scf_params.spin_polarized = Some(true);
    }
    let mut settings = config
        .scf_settings()
        .wrap_err("Invalid SCF parameters")?;

    if let Some(max_cycle) = args.max_cycle {
        info!("Overriding max_cycle with: {}", max_cycle);
        settings.max_cycle = max_cycle;
    }
    if let Some(threshold) = args.convergence_threshold {
        info!("Overriding convergence_threshold with: {:.3e}", threshold);
        settings.convergence_threshold = threshold;
    }
    if let Some(size) = args.diis_subspace_size {
        info!("Overriding diis_subspace_size with: {}", size);
        settings.diis_subspace_size = size;
    }
    if let Some(damping) = args.damping {
        info!("Overriding damping with: {}", damping);
        settings.damping = damping;
    }

    if settings.diis_subspace_size > 0 {
        info!(
            "Enabling DIIS acceleration with subspace size {}",
            settings.diis_subspace_size
        );
    } else {
        info!("DIIS acceleration disabled");
    }
    Ok(settings)
}

pub fn run_scf(
    model: &ModelSystem,
    settings: ScfSettings,
    session: &mut Session,
) -> Result<ScfOutcome> {
    let run = session.record_run();
    info!(
        "\nStarting SCF run {} ({:?}, {} electrons)",
        run,
        settings.spin,
        settings.occupation.electron_count()
    );

    let driver = ScfDriver::new(model, settings).wrap_err("SCF setup failed")?;
    let outcome = driver
        .run_with_reporter(&mut |iteration, residual, energy| {
            debug!(iteration, residual, energy, "SCF progress");
        })
        .wrap_err("SCF iteration failed")?;
    Ok(outcome)
}
