//! objmap CLI — driving adapter for the objmap mapping engine.
//!
//! Subcommands:
//! - `map <type_url> <payload> [--config <file>] [--trace]` — build objects from a payload
//! - `check <config>` — validate a mapping config loads without errors
//! - `info` — print registered models and transforms
//!
//! Logging goes to stderr, filtered by `OBJMAP_LOG` (default `warn`).

use std::process;

use objmap::{
    MappingConfig, MappingConfiguration, Mapper, TypeIntrospection, TypeRegistry,
    TypeRegistryBuilder,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

fn main() {
    init_logging();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "map" => cmd_map(&args[2..]),
        "check" => cmd_check(&args[2..]),
        "info" => cmd_info(),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("error: unknown command \"{other}\"");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("OBJMAP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_map(args: &[String]) -> Result<(), String> {
    let args = MapArgs::parse(args)?;
    let registry = build_registry();

    let configuration = match &args.config {
        Some(path) => Some(
            registry
                .load_configuration(load_document::<MappingConfig>(path)?)
                .map_err(|e| format!("config invalid: {e}"))?,
        ),
        None => None,
    };
    let payload: Value = load_document(&args.payload)?;

    let output = map_payload(&registry, &args, &payload, configuration.as_ref())?;
    let rendered = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
    println!("{rendered}");
    Ok(())
}

fn cmd_check(args: &[String]) -> Result<(), String> {
    if args.is_empty() {
        return Err("check requires a config file path".into());
    }

    let config: MappingConfig = load_document(&args[0])?;
    let registry = build_registry();

    let configuration = registry
        .load_configuration(config)
        .map_err(|e| format!("config invalid: {e}"))?;

    println!("Config valid ({} rules)", configuration.len());
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Uniform return type for all commands
fn cmd_info() -> Result<(), String> {
    let registry = build_registry();

    println!("Registered models:");
    for url in registry.type_urls() {
        println!("  {url}");
        for property in registry.properties_of(url).unwrap_or_default() {
            println!("    {}: {}", property.key, property.ty);
        }
    }

    println!("\nRegistered transforms:");
    for url in registry.transform_type_urls() {
        println!("  {url}");
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry assembly (composition root)
// ═══════════════════════════════════════════════════════════════════════════════

fn build_registry() -> TypeRegistry {
    objmap_test::register(TypeRegistryBuilder::new()).build()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Mapping
// ═══════════════════════════════════════════════════════════════════════════════

/// Map an object payload to one snapshot, or an array payload to a list.
fn map_payload(
    registry: &TypeRegistry,
    args: &MapArgs,
    payload: &Value,
    configuration: Option<&MappingConfiguration>,
) -> Result<Value, String> {
    match payload {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                map_one(registry, args, item, configuration).map_err(|e| format!("element {i}: {e}"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => map_one(registry, args, other, configuration),
    }
}

fn map_one(
    registry: &TypeRegistry,
    args: &MapArgs,
    source: &Value,
    configuration: Option<&MappingConfiguration>,
) -> Result<Value, String> {
    let source = source
        .as_object()
        .ok_or("payload must be an object or an array of objects")?;
    let mapper = Mapper::new(registry);

    if !args.trace {
        return mapper
            .build_type(&args.type_url, source, configuration)
            .map(|built| built.snapshot())
            .map_err(|e| e.to_string());
    }

    let own;
    let configuration = match configuration {
        Some(c) => c,
        None => {
            own = registry
                .mapping_configuration_of(&args.type_url)
                .unwrap_or_default();
            &own
        }
    };
    let mut instance = objmap::InstanceFactory::create(registry, &args.type_url, None)
        .map_err(|e| e.to_string())?;
    let trace = mapper
        .populate_with_trace(&mut *instance, source, configuration)
        .map_err(|e| e.to_string())?;
    for step in &trace.steps {
        eprintln!(
            "{:<24} {:<9} {:<22} {:?}",
            step.key_path,
            step.rule.to_string(),
            step.property.as_deref().unwrap_or("-"),
            step.outcome
        );
    }
    Ok(instance.snapshot())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Document loading
// ═══════════════════════════════════════════════════════════════════════════════

/// Load a JSON or YAML file, chosen by extension.
fn load_document<T: DeserializeOwned>(path: &str) -> Result<T, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("failed to read \"{path}\": {e}"))?;

    let is_json = std::path::Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).map_err(|e| format!("JSON parse error: {e}"))
    } else {
        // Default to YAML (handles .yaml and .yml)
        serde_yaml::from_str(&content).map_err(|e| format!("YAML parse error: {e}"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Argument parsing
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, PartialEq)]
struct MapArgs {
    type_url: String,
    payload: String,
    config: Option<String>,
    trace: bool,
}

impl MapArgs {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut positional = Vec::new();
        let mut config = None;
        let mut trace = false;
        let mut i = 0;

        while i < args.len() {
            match args[i].as_str() {
                "--config" => {
                    i += 1;
                    let path = args.get(i).ok_or("--config requires a file path")?;
                    config = Some(path.clone());
                }
                "--trace" => trace = true,
                flag if flag.starts_with("--") => {
                    return Err(format!("unexpected argument \"{flag}\""));
                }
                value => positional.push(value.to_owned()),
            }
            i += 1;
        }

        let [type_url, payload]: [String; 2] = positional
            .try_into()
            .map_err(|_| "map requires <type_url> <payload>".to_owned())?;
        Ok(Self {
            type_url,
            payload,
            config,
            trace,
        })
    }
}

fn print_usage() {
    eprintln!(
        "Usage: objmap <command> [options]

Commands:
  map <type_url> <payload> [--config <file>] [--trace]   Build objects from a JSON/YAML payload
  check <config>                                        Validate a mapping config
  info                                                  Print registered models and transforms
  help                                                  Show this help

Environment:
  OBJMAP_LOG   log filter (e.g. debug, objmap=trace); default warn"
    );
}
