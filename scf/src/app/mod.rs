mod report;
mod runner;
mod transport;

use self::report::{report_spectrum, report_summary};
use self::runner::{resolve_settings, run_scf};
use self::transport::run_transport;
use crate::io::{setup_output, write_summary};
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use scf::config::{Args, Config};
use scf::Session;
use std::fs::{self, File};
use tracing::info;

pub struct ScfApplication {
    args: Args,
    config: Config,
    session: Session,
}

impl ScfApplication {
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        let config = load_config(&args)?;
        Ok(Self {
            args,
            config,
            session: Session::new(),
        })
    }

    pub fn run(mut self) -> Result<()> {
        setup_output(self.args.output.as_ref(), self.args.verbose);
        if self.session.first_time("configuration") {
            info!("Configuration loaded from {}", self.args.config_file);
        }

        let model = self
            .config
            .to_model()
            .wrap_err("Invalid system description")?;
        let settings = resolve_settings(&self.args, &self.config)?;
        let outcome = run_scf(&model, settings, &mut self.session)?;
        report_summary(&outcome);

        let mut spectra = Vec::new();
        let mut contact_names = Vec::new();
        match &self.config.transport {
            Some(transport) if !self.args.no_transport => {
                contact_names = transport.contact_names();
                spectra = run_transport(&outcome, &model, transport, &mut self.session)?;
                for (label, points) in &spectra {
                    report_spectrum(label, points, &contact_names);
                }
            }
            Some(_) => info!("Energy scan skipped on request"),
            None => {}
        }

        if let Some(path) = &self.args.summary {
            let mut file = File::create(path)
                .wrap_err_with(|| format!("Unable to create summary file: {}", path))?;
            write_summary(&mut file, &outcome, &spectra, &contact_names)?;
            info!("Summary written to {}", path);
        }

        Ok(())
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let config_content = fs::read_to_string(&args.config_file)
        .wrap_err_with(|| format!("Unable to read configuration file: {}", args.config_file))?;

    let config = serde_yml::from_str::<Config>(&config_content)
        .wrap_err("Failed to parse configuration file")?
        .with_defaults();

    Ok(config)
}
