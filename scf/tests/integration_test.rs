//! End-to-end runs of the example YAML configurations
//!
//! Each test parses a file from `example/`, runs the SCF driver on the model
//! it describes and, where configured, scans the spectrum between leads.

use nalgebra::DMatrix;
use scf::config::Config;
use scf::{spectral_scan, OperatorAssembly, ScfDriver, ScfStatus, SpinPolarization};
use std::fs;
use std::path::PathBuf;

/// Helper function to get the path to example files
fn example_path(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("example")
        .join(filename)
}

fn load(filename: &str) -> Config {
    let content = fs::read_to_string(example_path(filename)).unwrap();
    serde_yml::from_str::<Config>(&content)
        .unwrap()
        .with_defaults()
}

#[test]
fn test_single_function_example() {
    let config = load("hydrogen_like.yaml");
    let model = config.to_model().unwrap();
    let settings = config.scf_settings().unwrap();
    assert_eq!(settings.spin, SpinPolarization::Unrestricted);

    let outcome = ScfDriver::new(&model, settings).unwrap().run().unwrap();
    assert_eq!(outcome.status, ScfStatus::Converged);
    assert_eq!(outcome.iterations, 1);
    assert!((outcome.energy.total() + 1.0).abs() < 1e-12);
    assert!((outcome.densities[0][(0, 0)] - 1.0).abs() < 1e-12);
    assert!(outcome.densities[1][(0, 0)].abs() < 1e-12);
}

#[test]
fn test_hubbard_chain_scf() {
    let config = load("hubbard_chain.yaml");
    let model = config.to_model().unwrap();
    let outcome = ScfDriver::new(&model, config.scf_settings().unwrap())
        .unwrap()
        .run()
        .unwrap();

    // half filling on a bipartite chain puts one electron on every site
    assert!(outcome.converged());
    let density = &outcome.densities[0];
    for i in 0..4 {
        assert!((density[(i, i)] - 1.0).abs() < 1e-10);
    }
    assert!((outcome.energy.total() + 3.4721359550).abs() < 1e-8);

    let orbitals = outcome.orbitals.as_ref().unwrap();
    let gap = orbitals[0].lumo().unwrap() - orbitals[0].homo().unwrap();
    assert!((gap - 2.0 * 0.6180339887).abs() < 1e-8);
}

#[test]
fn test_hubbard_chain_spectrum() {
    let config = load("hubbard_chain.yaml");
    let model = config.to_model().unwrap();
    let outcome = ScfDriver::new(&model, config.scf_settings().unwrap())
        .unwrap()
        .run()
        .unwrap();

    let transport = config.transport.as_ref().unwrap();
    let contacts = transport.contacts().unwrap();
    let energies = transport.energies().unwrap();
    let points = spectral_scan(
        &outcome.operators[0],
        model.overlap(),
        &contacts,
        &energies,
        transport.eta(),
        &transport.sancho_params(),
    )
    .unwrap();

    assert_eq!(points.len(), 7);
    for point in &points {
        assert!(point.density_of_states > 0.0);
        assert_eq!(point.broadening.len(), 2);
        let band = (4.0 - point.energy * point.energy).sqrt();
        for &gamma in &point.broadening {
            assert!((gamma - band).abs() < 1e-3);
        }
    }
}

#[test]
fn test_ppp_radical_keeps_electron_count() {
    let config = load("ppp_allyl.yaml");
    let model = config.to_model().unwrap();
    let settings = config.scf_settings().unwrap();
    assert_eq!(settings.spin, SpinPolarization::Unrestricted);
    assert_eq!(settings.damping, 0.3);

    let outcome = ScfDriver::new(&model, settings).unwrap().run().unwrap();
    assert_eq!(outcome.densities.len(), 2);
    assert!((outcome.densities[0].trace() - 2.0).abs() < 1e-10);
    assert!((outcome.densities[1].trace() - 1.0).abs() < 1e-10);
    for density in &outcome.densities {
        assert!((density - density.transpose()).amax() < 1e-12);
    }
    assert!(outcome.energy.total().is_finite());
}

#[test]
fn test_mismatched_contact_is_rejected() {
    let mut config = load("hubbard_chain.yaml");
    config.system.core_hamiltonian = vec![vec![0.0, -1.0], vec![-1.0, 0.0]];
    config.system.electrons = 2;
    let model = config.to_model().unwrap();
    let outcome = ScfDriver::new(&model, config.scf_settings().unwrap())
        .unwrap()
        .run()
        .unwrap();

    let transport = config.transport.as_ref().unwrap();
    let result = spectral_scan(
        &outcome.operators[0],
        &DMatrix::identity(2, 2),
        &transport.contacts().unwrap(),
        &transport.energies().unwrap(),
        transport.eta(),
        &transport.sancho_params(),
    );
    assert!(matches!(result, Err(scf::ScfError::DimensionMismatch { .. })));
}
