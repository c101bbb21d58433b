// src/state.rs

//! Process-wide configuration state.
//!
//! The first completed `Config::init` wins: later calls return the already
//! initialized instance and their arguments are ignored. This mirrors how
//! the configuration is consumed in practice, where the entry point builds
//! it once and every component reads from the same table afterwards.

use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use anyhow::Context;
use colored::Colorize;

use crate::core::arg_parser::{CliParser, ParseOutcome};
use crate::core::{aggregator, conf_file, resolver, validator};
use crate::models::{AggregatedParam, ComponentDef, ParamValue, ResolvedValues};

static CONFIG: OnceLock<Config> = OnceLock::new();

/// The aggregated, parsed, and validated configuration for this process.
#[derive(Debug)]
pub struct Config {
    schema: Vec<AggregatedParam>,
    values: Mutex<ResolvedValues>,
}

/// Expands the seed components, aggregates their parameters into a fresh
/// CLI parser, parses `argv`, and validates the result. Kept free of the
/// singleton so tests can drive it with explicit argument vectors.
fn build<I, T>(
    seed: &[&'static ComponentDef],
    description: &str,
    argv: I,
) -> anyhow::Result<(Vec<AggregatedParam>, ParseOutcome)>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let components = resolver::expand(seed);

    let mut parser = CliParser::new(description);
    let schema = aggregator::aggregate(&components, &mut parser).with_context(|| {
        format!(
            "Failed to aggregate parameters for components seeded from '{}'.",
            seed.first().map_or("<empty>", |c| c.name).cyan()
        )
    })?;

    let outcome = parser.parse_from(argv)?;
    if let ParseOutcome::Resolved(values) = &outcome {
        validator::run(&components, values)?;
    }
    Ok((schema, outcome))
}

/// Serializes the effective configuration to the requested target (or
/// standard output) in the config-file format.
fn write_out(
    schema: &[AggregatedParam],
    values: &ResolvedValues,
    target: Option<&Path>,
) -> anyhow::Result<()> {
    match target {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create '{}'.", path.display()))?;
            conf_file::write(&mut file, schema, values)?;
            log::info!("Wrote configuration to '{}'.", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            conf_file::write(&mut stdout.lock(), schema, values)?;
        }
    }
    Ok(())
}

impl Config {
    /// Initializes the process configuration from the command line.
    ///
    /// If the `-w` write-out flag was given, the effective configuration is
    /// serialized and the process exits instead of returning.
    pub fn init(
        seed: &[&'static ComponentDef],
        description: &str,
    ) -> anyhow::Result<&'static Config> {
        Self::init_from(seed, description, std::env::args_os())
    }

    /// Like `init`, but parses an explicit argument vector. Returns the
    /// existing instance untouched when one has already been initialized.
    pub fn init_from<I, T>(
        seed: &[&'static ComponentDef],
        description: &str,
        argv: I,
    ) -> anyhow::Result<&'static Config>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        if let Some(existing) = CONFIG.get() {
            log::debug!("Configuration already initialized, ignoring new arguments.");
            return Ok(existing);
        }

        let (schema, outcome) = build(seed, description, argv)?;
        let values = match outcome {
            ParseOutcome::Resolved(values) => values,
            ParseOutcome::WriteRequested { target, values } => {
                write_out(&schema, &values, target.as_deref())?;
                std::process::exit(0);
            }
        };

        // A racing initializer may have won; either way the stored
        // instance is the one every caller sees from here on.
        let _ = CONFIG.set(Config {
            schema,
            values: Mutex::new(values),
        });
        Ok(CONFIG.get().expect("configuration was just initialized"))
    }

    /// Returns the initialized configuration, if any.
    pub fn get() -> Option<&'static Config> {
        CONFIG.get()
    }

    pub fn value(&self, name: &str) -> Option<ParamValue> {
        self.values.lock().expect("config lock poisoned").get(name).cloned()
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.lock().expect("config lock poisoned").get_bool(name)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.values.lock().expect("config lock poisoned").get_int(name)
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.values.lock().expect("config lock poisoned").get_float(name)
    }

    pub fn get_str(&self, name: &str) -> Option<String> {
        self.values
            .lock()
            .expect("config lock poisoned")
            .get_str(name)
            .map(str::to_string)
    }

    /// Overwrites (or introduces) a value after parsing. Later dumps and
    /// reads observe the change.
    pub fn set(&self, name: impl Into<String>, value: ParamValue) {
        self.values.lock().expect("config lock poisoned").set(name, value);
    }

    /// A point-in-time copy of the resolved values.
    pub fn snapshot(&self) -> ResolvedValues {
        self.values.lock().expect("config lock poisoned").clone()
    }

    /// Serializes the current values in the config-file format.
    pub fn dump(&self, out: &mut dyn Write) -> anyhow::Result<()> {
        let values = self.snapshot();
        conf_file::write(out, &self.schema, &values)?;
        Ok(())
    }

    pub fn schema(&self) -> &[AggregatedParam] {
        &self.schema
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values = self.snapshot();
        writeln!(f, "Config:")?;
        for (name, value) in values.iter() {
            writeln!(f, "\t{name} = {value}")?;
        }
        Ok(())
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Param, ParamTable, ParamType, ParamValue};

    fn station_params() -> ParamTable {
        ParamTable::new().with(
            Param::new("channel")
                .kind(ParamType::Int)
                .default_value(ParamValue::Int(4)),
        )
    }

    static STATION: ComponentDef = ComponentDef::new("station").with_params(station_params);

    // The singleton admits exactly one initialization per process, so this
    // is the only test that touches it; everything else exercises `build`.
    #[test]
    fn test_first_initialization_wins() {
        let first =
            Config::init_from(&[&STATION], "station", ["prog", "--channel", "9"]).unwrap();
        assert_eq!(first.get_int("channel"), Some(9));

        // A second init returns the same instance and ignores its argv.
        let second =
            Config::init_from(&[&STATION], "station", ["prog", "--channel", "1"]).unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(second.get_int("channel"), Some(9));

        first.set("channel", ParamValue::Int(12));
        assert_eq!(second.get_int("channel"), Some(12));

        let mut dumped = Vec::new();
        first.dump(&mut dumped).unwrap();
        let text = String::from_utf8(dumped).unwrap();
        assert!(text.contains("# station"));
        assert!(text.contains("channel = 12"));
    }

    #[test]
    fn test_dump_reproduces_parsed_defaults() {
        let (schema, outcome) = build(&[&STATION], "station", ["prog"]).unwrap();
        let ParseOutcome::Resolved(values) = outcome else {
            panic!("expected resolved values");
        };

        let mut dumped = Vec::new();
        conf_file::write(&mut dumped, &schema, &values).unwrap();
        assert_eq!(
            String::from_utf8(dumped).unwrap(),
            "# station\nchannel = 4\n"
        );
    }

    #[test]
    fn test_build_resolves_without_touching_the_singleton() {
        let (schema, outcome) = build(&[&STATION], "station", ["prog"]).unwrap();
        assert_eq!(schema.len(), 1);
        let ParseOutcome::Resolved(values) = outcome else {
            panic!("expected resolved values");
        };
        assert_eq!(values.get_int("channel"), Some(4));
    }
}
