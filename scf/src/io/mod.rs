//! Input/Output operations for SCF runs
//!
//! This module handles logging setup and the plain-text result summary.

mod output;

pub use output::{setup_output, write_summary};
