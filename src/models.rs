// src/models.rs

use crate::constants::TRUE_STRINGS;
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use thiserror::Error;

// --- VALUE MODELS ---

/// A resolved configuration value, tagged with the type the owning
/// parameter declared.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<String>),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Str(s) => write!(f, "{}", s),
            Self::List(items) => write!(f, "{}", items.join(" ")),
        }
    }
}

/// Converts a string to a boolean value.
///
/// Returns `true` if the string, lowercased, is one of the recognized
/// truthy spellings (`true`, `t`, `yes`, `y`, `1`) and `false` otherwise.
pub fn str_to_bool(v: &str) -> bool {
    TRUE_STRINGS.contains(&v.to_lowercase().as_str())
}

#[derive(Error, Debug)]
#[error("Value '{value}' is not a valid {expected} for parameter '{name}'.")]
pub struct CoercionError {
    pub name: String,
    pub value: String,
    pub expected: &'static str,
}

/// The declared type of a parameter. Drives how raw command-line and
/// config-file input is coerced into a [`ParamValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamType {
    Bool,
    Int,
    Float,
    #[default]
    Str,
}

impl ParamType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::Float => "float",
            Self::Str => "string",
        }
    }

    /// Coerces a raw command-line string per the declared type.
    /// Boolean coercion never fails: any unrecognized spelling is `false`.
    pub fn coerce_str(self, name: &str, raw: &str) -> Result<ParamValue, CoercionError> {
        match self {
            Self::Bool => Ok(ParamValue::Bool(str_to_bool(raw))),
            Self::Int => raw
                .trim()
                .parse::<i64>()
                .map(ParamValue::Int)
                .map_err(|_| self.error(name, raw)),
            Self::Float => raw
                .trim()
                .parse::<f64>()
                .map(ParamValue::Float)
                .map_err(|_| self.error(name, raw)),
            Self::Str => Ok(ParamValue::Str(raw.to_string())),
        }
    }

    /// Coerces a TOML value per the declared type.
    ///
    /// Native TOML scalars of the matching type pass through; a string is
    /// re-coerced as command-line input would be; an integer is accepted
    /// for a float parameter; an array always becomes a [`ParamValue::List`].
    pub fn coerce_toml(self, name: &str, value: &toml::Value) -> Result<ParamValue, CoercionError> {
        match (self, value) {
            (_, toml::Value::Array(items)) => Ok(ParamValue::List(
                items.iter().map(toml_scalar_to_string).collect(),
            )),
            (Self::Bool, toml::Value::Boolean(b)) => Ok(ParamValue::Bool(*b)),
            (Self::Int, toml::Value::Integer(i)) => Ok(ParamValue::Int(*i)),
            (Self::Float, toml::Value::Float(x)) => Ok(ParamValue::Float(*x)),
            (Self::Float, toml::Value::Integer(i)) => Ok(ParamValue::Float(*i as f64)),
            (Self::Str, toml::Value::String(s)) => Ok(ParamValue::Str(s.clone())),
            (_, toml::Value::String(s)) => self.coerce_str(name, s),
            (_, other) => Err(self.error(name, &toml_scalar_to_string(other))),
        }
    }

    fn error(self, name: &str, raw: &str) -> CoercionError {
        CoercionError {
            name: name.to_string(),
            value: raw.to_string(),
            expected: self.label(),
        }
    }
}

fn toml_scalar_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// --- PARAMETER MODELS ---

/// How a parameter consumes the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamAction {
    /// Takes a value (`--name VALUE`).
    #[default]
    Store,
    /// Presence flag; resolves to `Bool(true)` when given.
    StoreTrue,
    /// Counting flag; resolves to `Int(n)` for n occurrences.
    Count,
}

/// Arity of a multi-valued parameter. Multi-valued parameters resolve to
/// [`ParamValue::List`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nargs {
    Exact(usize),
    ZeroOrMore,
    OneOrMore,
}

/// An immutable-after-construction description of one configuration option.
///
/// The `name` is the parameter's identity within a resolved configuration;
/// every other field is presentation or coercion metadata forwarded to the
/// argument-registration contract.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<ParamValue>,
    pub help: Option<String>,
    pub kind: ParamType,
    pub action: ParamAction,
    pub metavar: Option<String>,
    pub nargs: Option<Nargs>,
    pub choices: Vec<String>,
    pub hidden: bool,
    pub alias: Option<char>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            help: None,
            kind: ParamType::default(),
            action: ParamAction::default(),
            metavar: None,
            nargs: None,
            choices: Vec::new(),
            hidden: false,
            alias: None,
        }
    }

    pub fn default_value(mut self, value: ParamValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }

    pub fn kind(mut self, kind: ParamType) -> Self {
        self.kind = kind;
        self
    }

    pub fn action(mut self, action: ParamAction) -> Self {
        self.action = action;
        self
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    pub fn nargs(mut self, nargs: Nargs) -> Self {
        self.nargs = Some(nargs);
        self
    }

    pub fn choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn alias(mut self, alias: char) -> Self {
        self.alias = Some(alias);
        self
    }
}

/// An ordered, name-keyed collection of [`Param`]s declared by one
/// component.
///
/// Iteration order is most-recently-declared first, and every name in the
/// order vector has a matching entry in the map. Re-declaring a name
/// replaces the parameter without moving it.
#[derive(Debug, Clone, Default)]
pub struct ParamTable {
    names: Vec<String>,
    params: HashMap<String, Param>,
}

impl ParamTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a parameter. New names go to the front of the iteration
    /// order.
    pub fn add(&mut self, param: Param) {
        if !self.params.contains_key(&param.name) {
            self.names.insert(0, param.name.clone());
        }
        self.params.insert(param.name.clone(), param);
    }

    /// Builder-style [`Self::add`], for table construction in one expression.
    pub fn with(mut self, param: Param) -> Self {
        self.add(param);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.params.get(name)
    }

    /// Iterates parameters most-recently-declared first.
    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.names.iter().filter_map(|name| self.params.get(name))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// --- COMPONENT MODELS ---

/// A component's validation hook, invoked with the fully resolved value
/// mapping after parsing.
pub type ValidateFn = fn(&ResolvedValues) -> anyhow::Result<()>;

/// The static declaration of a configurable component: its parameter
/// table, the components it depends on, and an optional validation hook.
///
/// Definitions are const-constructible so they can live in `static`s and
/// reference each other directly:
///
/// ```
/// use conflux::models::{ComponentDef, Param, ParamTable};
///
/// fn camera_params() -> ParamTable {
///     ParamTable::new().with(Param::new("exposure"))
/// }
///
/// static CAMERA: ComponentDef = ComponentDef::new("camera").with_params(camera_params);
/// static SURVEY: ComponentDef = ComponentDef::new("survey").depends_on(&[&CAMERA]);
/// ```
#[derive(Debug)]
pub struct ComponentDef {
    pub name: &'static str,
    pub params: Option<fn() -> ParamTable>,
    pub dependencies: &'static [&'static ComponentDef],
    pub validate: Option<ValidateFn>,
}

impl ComponentDef {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            params: None,
            dependencies: &[],
            validate: None,
        }
    }

    pub const fn with_params(mut self, params: fn() -> ParamTable) -> Self {
        self.params = Some(params);
        self
    }

    pub const fn depends_on(mut self, dependencies: &'static [&'static Self]) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub const fn with_validator(mut self, validate: ValidateFn) -> Self {
        self.validate = Some(validate);
        self
    }

    /// Builds the component's parameter table, if it declares one.
    pub fn param_table(&self) -> Option<ParamTable> {
        self.params.map(|build| build())
    }
}

/// One surviving entry of an aggregation pass: the parameter together with
/// the component that claimed its name.
#[derive(Debug, Clone)]
pub struct AggregatedParam {
    pub component: &'static str,
    pub param: Param,
}

// --- RESOLVED VALUE MODELS ---

/// The resolved name-to-value mapping produced by a parse, preserving
/// first-insertion order so serialization is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedValues {
    order: Vec<String>,
    values: HashMap<String, ParamValue>,
}

impl ResolvedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a value. Mutation performs no re-validation.
    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        if !self.values.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            ParamValue::Float(x) => Some(*x),
            ParamValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            ParamValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_list(&self, name: &str) -> Option<&[String]> {
        match self.get(name)? {
            ParamValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Iterates entries in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.order
            .iter()
            .filter_map(|name| self.values.get(name).map(|v| (name.as_str(), v)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Index<&str> for ResolvedValues {
    type Output = ParamValue;

    /// Dictionary-style access. Panics if the key is absent; use
    /// [`Self::get`] for fallible lookup.
    fn index(&self, name: &str) -> &Self::Output {
        self.get(name)
            .unwrap_or_else(|| panic!("no configuration value named '{}'", name))
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_to_bool_truthy_spellings() {
        for raw in ["true", "T", "yes", "Y", "1", "TRUE"] {
            assert!(str_to_bool(raw), "expected '{}' to be truthy", raw);
        }
        for raw in ["false", "0", "no", "on", ""] {
            assert!(!str_to_bool(raw), "expected '{}' to be falsy", raw);
        }
    }

    #[test]
    fn test_coerce_str_by_declared_type() {
        assert_eq!(
            ParamType::Int.coerce_str("n", "42").unwrap(),
            ParamValue::Int(42)
        );
        assert_eq!(
            ParamType::Float.coerce_str("x", "2.5").unwrap(),
            ParamValue::Float(2.5)
        );
        assert_eq!(
            ParamType::Bool.coerce_str("flag", "yes").unwrap(),
            ParamValue::Bool(true)
        );
        assert_eq!(
            ParamType::Str.coerce_str("s", "hello").unwrap(),
            ParamValue::Str("hello".to_string())
        );
        assert!(ParamType::Int.coerce_str("n", "forty-two").is_err());
    }

    #[test]
    fn test_coerce_toml_scalars_and_strings() {
        assert_eq!(
            ParamType::Int
                .coerce_toml("n", &toml::Value::Integer(7))
                .unwrap(),
            ParamValue::Int(7)
        );
        // An integer is acceptable input for a float parameter.
        assert_eq!(
            ParamType::Float
                .coerce_toml("x", &toml::Value::Integer(3))
                .unwrap(),
            ParamValue::Float(3.0)
        );
        // Strings are re-coerced the way command-line input is.
        assert_eq!(
            ParamType::Bool
                .coerce_toml("flag", &toml::Value::String("y".to_string()))
                .unwrap(),
            ParamValue::Bool(true)
        );
        assert!(
            ParamType::Int
                .coerce_toml("n", &toml::Value::Boolean(true))
                .is_err()
        );
    }

    #[test]
    fn test_param_table_orders_most_recent_first() {
        let table = ParamTable::new()
            .with(Param::new("first"))
            .with(Param::new("second"))
            .with(Param::new("third"));

        let names: Vec<_> = table.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["third", "second", "first"]);
    }

    #[test]
    fn test_param_table_redeclare_replaces_in_place() {
        let table = ParamTable::new()
            .with(Param::new("rate").default_value(ParamValue::Int(1)))
            .with(Param::new("depth"))
            .with(Param::new("rate").default_value(ParamValue::Int(2)));

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get("rate").unwrap().default,
            Some(ParamValue::Int(2))
        );
        let names: Vec<_> = table.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["depth", "rate"]);
    }

    #[test]
    fn test_resolved_values_typed_access_and_order() {
        let mut values = ResolvedValues::new();
        values.set("rate", ParamValue::Int(3));
        values.set("name", ParamValue::Str("survey".to_string()));
        values.set("rate", ParamValue::Int(5));

        assert_eq!(values.get_int("rate"), Some(5));
        assert_eq!(values.get_str("name"), Some("survey"));
        assert_eq!(values.get_float("rate"), Some(5.0));
        assert_eq!(values["name"], ParamValue::Str("survey".to_string()));

        let keys: Vec<_> = values.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["rate", "name"]);
    }
}
