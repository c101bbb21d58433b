// src/instance.rs

//! Per-instance configuration for a component.
//!
//! When a component is constructed it merges three layers into a private
//! table: constructor overrides win, then values from the global resolved
//! configuration, then the component's own declared defaults (hidden
//! parameters included). The instance keeps its own copy, so later changes
//! to the global configuration do not leak into it.

use std::collections::HashMap;

use log::LevelFilter;

use crate::constants::VERBOSE_KEY;
use crate::models::{ComponentDef, ParamValue, ResolvedValues};

/// Maps the conventional `verbose` count to a log filter: 0 keeps errors
/// only, 1 adds informational output, 2 and above enables debug.
pub fn verbosity_filter(verbose: i64) -> LevelFilter {
    match verbose {
        ..=0 => LevelFilter::Error,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Installs the global logger at the level implied by `verbose`. Safe to
/// call more than once; only the first call takes effect. `RUST_LOG`
/// still overrides the computed level.
pub fn init_logging(verbose: i64) {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(verbosity_filter(verbose))
        .try_init();
}

/// The merged configuration view a single component instance works from.
#[derive(Debug, Clone, Default)]
pub struct InstanceConfig {
    values: HashMap<String, ParamValue>,
}

impl InstanceConfig {
    /// Merges `overrides` on top of `config` entries, then fills anything
    /// still missing from the defaults `def` itself declares.
    pub fn new<'a, C, O>(def: &ComponentDef, config: C, overrides: O) -> Self
    where
        C: IntoIterator<Item = (&'a str, &'a ParamValue)>,
        O: IntoIterator<Item = (String, ParamValue)>,
    {
        let mut values: HashMap<String, ParamValue> = config
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        for (name, value) in overrides {
            values.insert(name, value);
        }
        if let Some(table) = def.param_table() {
            for param in table.iter() {
                if values.contains_key(&param.name) {
                    continue;
                }
                if let Some(default) = &param.default {
                    values.insert(param.name.clone(), default.clone());
                }
            }
        }
        Self { values }
    }

    /// Builds the instance view from the globally resolved values.
    pub fn from_resolved(
        def: &ComponentDef,
        resolved: &ResolvedValues,
        overrides: impl IntoIterator<Item = (String, ParamValue)>,
    ) -> Self {
        Self::new(def, resolved.iter(), overrides)
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name)? {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name)? {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.values.get(name)? {
            ParamValue::Float(f) => Some(*f),
            ParamValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    /// The effective `verbose` count; absent counts as silent.
    pub fn verbosity(&self) -> i64 {
        self.get_int(VERBOSE_KEY).unwrap_or(0)
    }

    /// Installs logging at this instance's verbosity.
    pub fn setup_logging(&self) {
        init_logging(self.verbosity());
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Param, ParamTable, ParamType};

    fn probe_params() -> ParamTable {
        ParamTable::new()
            .with(
                Param::new("gain")
                    .kind(ParamType::Float)
                    .default_value(ParamValue::Float(1.5)),
            )
            .with(
                Param::new("verbose")
                    .kind(ParamType::Int)
                    .default_value(ParamValue::Int(0)),
            )
            .with(
                Param::new("scratch-dir")
                    .default_value(ParamValue::Str("/tmp/probe".into()))
                    .hidden(),
            )
    }

    static PROBE: ComponentDef = ComponentDef::new("probe").with_params(probe_params);

    #[test]
    fn test_overrides_beat_config_beat_defaults() {
        let mut resolved = ResolvedValues::new();
        resolved.set("gain", ParamValue::Float(2.0));
        resolved.set("verbose", ParamValue::Int(1));

        let instance = InstanceConfig::from_resolved(
            &PROBE,
            &resolved,
            [("gain".to_string(), ParamValue::Float(9.0))],
        );
        assert_eq!(instance.get_float("gain"), Some(9.0));
        assert_eq!(instance.get_int("verbose"), Some(1));
        // Hidden parameters never reach the resolved table, so their
        // defaults come from the component itself.
        assert_eq!(instance.get_str("scratch-dir"), Some("/tmp/probe"));
    }

    #[test]
    fn test_instance_is_independent_of_the_resolved_table() {
        let mut resolved = ResolvedValues::new();
        resolved.set("gain", ParamValue::Float(2.0));
        let instance = InstanceConfig::from_resolved(&PROBE, &resolved, []);

        resolved.set("gain", ParamValue::Float(3.0));
        assert_eq!(instance.get_float("gain"), Some(2.0));
    }

    #[test]
    fn test_verbosity_filter_mapping() {
        assert_eq!(verbosity_filter(-1), LevelFilter::Error);
        assert_eq!(verbosity_filter(0), LevelFilter::Error);
        assert_eq!(verbosity_filter(1), LevelFilter::Info);
        assert_eq!(verbosity_filter(2), LevelFilter::Debug);
        assert_eq!(verbosity_filter(5), LevelFilter::Debug);
    }

    #[test]
    fn test_verbosity_defaults_to_silent() {
        let instance = InstanceConfig::default();
        assert_eq!(instance.verbosity(), 0);
    }
}
