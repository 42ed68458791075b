//! Conformance tests that run YAML fixtures against objmap
//!
//! Run with: cargo test -p objmap-test --test conformance --features objmap-test/fixtures
//!
//! Note: This test file requires the `fixtures` feature to be enabled.

#![cfg(feature = "fixtures")]

use objmap_test::fixture::Fixture;
use std::fs;
use std::path::{Path, PathBuf};

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Load and run one fixture file
fn run_fixture_file(name: &str) {
    let path = fixtures_dir().join(name);
    let yaml = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));

    // Parse potentially multiple fixtures (separated by ---)
    let fixtures = Fixture::from_yaml_multi(&yaml)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()));
    assert!(!fixtures.is_empty(), "{} has no fixtures", path.display());

    let registry = objmap_test::registry();
    for fixture in fixtures {
        println!("  Running: {}", fixture.name);
        fixture.run_and_assert(&registry);
    }
}

#[test]
fn test_implicit_mapping() {
    run_fixture_file("01_implicit.yaml");
}

#[test]
fn test_rules() {
    run_fixture_file("02_rules.yaml");
}

#[test]
fn test_nested() {
    run_fixture_file("03_nested.yaml");
}

#[test]
fn test_errors() {
    run_fixture_file("04_errors.yaml");
}

#[test]
fn every_fixture_file_is_covered() {
    let mut files: Vec<_> = fs::read_dir(fixtures_dir())
        .expect("read fixtures dir")
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|e| e == "yaml"))
        .filter_map(|path| path.file_name()?.to_str().map(str::to_owned))
        .collect();
    files.sort();
    assert_eq!(
        files,
        [
            "01_implicit.yaml",
            "02_rules.yaml",
            "03_nested.yaml",
            "04_errors.yaml"
        ]
    );
}

#[test]
fn failing_case_is_reported() {
    let yaml = r"
name: wrong_expectation
type_url: objmap.test.v1.Person
cases:
  - name: mismatch
    source: { name: A }
    expect: { name: B }
";
    let fixture = Fixture::from_yaml(yaml).unwrap();
    let results = fixture.run(&objmap_test::registry());
    assert_eq!(results.len(), 1);
    assert!(!results[0].passed);
    assert_eq!(results[0].actual, r#"{"name":"A"}"#);
}
