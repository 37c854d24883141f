//! Command-line argument parsing for SCF runs

use clap::Parser;

/// SCF and surface Green's function calculations from a YAML configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config_file: String,

    /// Override output file: (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Write a plain-text summary of the results to this file
    #[arg(long)]
    pub summary: Option<String>,

    /// Override maximum SCF cycles
    #[arg(long)]
    pub max_cycle: Option<usize>,

    /// Override convergence threshold
    #[arg(long)]
    pub convergence_threshold: Option<f64>,

    /// Override DIIS subspace size (0 disables extrapolation)
    #[arg(long)]
    pub diis_subspace_size: Option<usize>,

    /// Override damping weight of the previous operator
    #[arg(long)]
    pub damping: Option<f64>,

    /// Spin multiplicity (2S+1, default: 1 for singlet)
    #[arg(long)]
    pub multiplicity: Option<usize>,

    /// Use spin-polarized SCF (UHF) instead of restricted SCF
    #[arg(long)]
    pub spin_polarized: bool,

    /// Skip the energy scan even if the configuration has a transport section
    #[arg(long)]
    pub no_transport: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
