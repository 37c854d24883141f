//! SCF Calculation Command-Line Interface
//!
//! Runs a self-consistent field calculation on the model system described in
//! a YAML configuration, then optionally scans its spectrum between leads.

use color_eyre::eyre::Result;

mod app;
mod io;

use app::ScfApplication;

fn main() -> Result<()> {
    color_eyre::install()?;
    ScfApplication::from_cli()?.run()
}
