// src/core/conf_file.rs

use crate::models::{AggregatedParam, ParamValue, ResolvedValues};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfFileError {
    #[error("Could not read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Error parsing TOML in '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to write config: {0}")]
    Write(#[from] std::io::Error),
    #[error("Failed to serialize config value: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Reads a config file into a flat TOML table. Parse and I/O failures
/// propagate; interpretation of the values is left to the caller.
pub fn read(path: &Path) -> Result<toml::Table, ConfFileError> {
    let content = fs::read_to_string(path).map_err(|source| ConfFileError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfFileError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Writes the current resolved values in the persisted-config format:
/// flat `name = value` lines, grouped under a `# component` comment per
/// owning component in schema order. Values set after parsing that belong
/// to no registered parameter are appended at the end.
pub fn write(
    out: &mut dyn Write,
    schema: &[AggregatedParam],
    values: &ResolvedValues,
) -> Result<(), ConfFileError> {
    let mut current_component: Option<&str> = None;
    let mut written: HashSet<&str> = HashSet::new();

    for entry in schema {
        let Some(value) = values.get(&entry.param.name) else {
            continue;
        };
        if current_component != Some(entry.component) {
            if current_component.is_some() {
                writeln!(out)?;
            }
            writeln!(out, "# {}", entry.component)?;
            current_component = Some(entry.component);
        }
        out.write_all(render_line(&entry.param.name, value)?.as_bytes())?;
        written.insert(entry.param.name.as_str());
    }

    let extras: Vec<_> = values
        .iter()
        .filter(|(name, _)| !written.contains(name))
        .collect();
    if !extras.is_empty() {
        if current_component.is_some() {
            writeln!(out)?;
        }
        for (name, value) in extras {
            out.write_all(render_line(name, value)?.as_bytes())?;
        }
    }

    Ok(())
}

/// Renders one `name = value` line by serializing a single-entry table.
fn render_line(name: &str, value: &ParamValue) -> Result<String, ConfFileError> {
    let mut table = toml::Table::new();
    table.insert(name.to_string(), to_toml(value));
    Ok(toml::to_string(&table)?)
}

fn to_toml(value: &ParamValue) -> toml::Value {
    match value {
        ParamValue::Bool(b) => toml::Value::Boolean(*b),
        ParamValue::Int(i) => toml::Value::Integer(*i),
        ParamValue::Float(x) => toml::Value::Float(*x),
        ParamValue::Str(s) => toml::Value::String(s.clone()),
        ParamValue::List(items) => toml::Value::Array(
            items
                .iter()
                .map(|item| toml::Value::String(item.clone()))
                .collect(),
        ),
    }
}

// MARK: --- UNIT TESTS ---
