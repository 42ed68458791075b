//! Conformance test fixture runner
//!
//! Loads YAML fixtures and runs them against the objmap engine.
//!
//! ```yaml
//! name: nested_train_info
//! description: trainInfo is built through the type's own nested rule
//! type_url: objmap.test.v1.TravelInfo
//! cases:
//!   - name: object payload
//!     source: { trainInfo: { name: ICE, maxSpeed: 300 } }
//!     expect: { trainInfo: { name: ICE, maxSpeed: 300 } }
//! ```
//!
//! With `config` present, its rules replace the type's own configuration for
//! the top-level build. A case either expects a snapshot (`expect`) or an error
//! whose message contains `expect_error`.

use objmap::prelude::*;
use objmap::MappingConfig;
use serde::Deserialize;
use serde_json::Value;

/// A complete test fixture
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub type_url: String,
    #[serde(default)]
    pub config: Option<MappingConfig>,
    pub cases: Vec<TestCase>,
}

/// Test case
#[derive(Debug, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub source: Value,
    #[serde(default)]
    pub expect: Option<Value>,
    #[serde(default)]
    pub expect_error: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Runner
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of running a single test case
#[derive(Debug)]
pub struct CaseResult {
    pub case_name: String,
    pub passed: bool,
    pub expected: String,
    pub actual: String,
}

impl TestCase {
    fn expected(&self) -> String {
        match (&self.expect, &self.expect_error) {
            (_, Some(error)) => format!("error containing {error:?}"),
            (Some(snapshot), None) => snapshot.to_string(),
            (None, None) => "{}".to_owned(),
        }
    }

    fn check(&self, outcome: &Result<Value, String>) -> bool {
        match (outcome, &self.expect_error) {
            (Err(actual), Some(expected)) => actual.contains(expected.as_str()),
            (Ok(snapshot), None) => {
                let empty = Value::Object(serde_json::Map::new());
                snapshot == self.expect.as_ref().unwrap_or(&empty)
            }
            _ => false,
        }
    }
}

impl Fixture {
    /// Parse a fixture from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse multiple fixtures from a YAML file with `---` separators
    pub fn from_yaml_multi(yaml: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        let mut fixtures = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            fixtures.push(Self::deserialize(doc)?);
        }
        Ok(fixtures)
    }

    /// Run all test cases against a registry and return results
    pub fn run(&self, registry: &TypeRegistry) -> Vec<CaseResult> {
        let configuration = self
            .config
            .clone()
            .map(|config| registry.load_configuration(config))
            .transpose()
            .map_err(|e| e.to_string());
        let mapper = Mapper::new(registry);

        self.cases
            .iter()
            .map(|case| {
                let outcome = configuration.clone().and_then(|configuration| {
                    let source = case
                        .source
                        .as_object()
                        .ok_or_else(|| "source is not an object".to_owned())?;
                    mapper
                        .build_type(&self.type_url, source, configuration.as_ref())
                        .map(|built| built.snapshot())
                        .map_err(|e| e.to_string())
                });
                CaseResult {
                    case_name: case.name.clone(),
                    passed: case.check(&outcome),
                    expected: case.expected(),
                    actual: match outcome {
                        Ok(snapshot) => snapshot.to_string(),
                        Err(error) => format!("error {error:?}"),
                    },
                }
            })
            .collect()
    }

    /// Run all test cases and panic on first failure
    pub fn run_and_assert(&self, registry: &TypeRegistry) {
        for result in self.run(registry) {
            assert!(
                result.passed,
                "Fixture '{}' case '{}' failed: expected {}, got {}",
                self.name, result.case_name, result.expected, result.actual
            );
        }
    }
}
