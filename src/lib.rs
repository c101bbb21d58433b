// src/lib.rs

//! Declarative configuration aggregation for component-based programs.
//!
//! Components declare their parameters, dependencies, and validation hooks
//! as static [`ComponentDef`]s. From a seed set, the library expands the
//! dependency graph, merges every component's parameters into one table
//! (first declaration of a name wins), exposes them as command-line flags
//! and config-file keys, and hands each component a merged view of the
//! result.

pub mod constants;
pub mod core;
pub mod instance;
pub mod models;
pub mod state;

pub use crate::instance::{init_logging, verbosity_filter, InstanceConfig};
pub use crate::models::{
    ComponentDef, Nargs, Param, ParamAction, ParamTable, ParamType, ParamValue, ResolvedValues,
};
pub use crate::state::Config;
