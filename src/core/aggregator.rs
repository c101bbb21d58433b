// src/core/aggregator.rs

use crate::models::{AggregatedParam, ComponentDef, Param};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error(
        "Parameter name '{name}' cannot be registered as a flag (expected lowercase letters, digits, '-' or '_', starting with a letter)."
    )]
    InvalidName { name: String },
    #[error("Flag '{flag}' is declared by more than one registered parameter.")]
    DuplicateFlag { flag: String },
}

/// The argument-registration contract: the narrow surface the aggregator
/// drives on the external parser.
///
/// `open_group` starts a visual group named after the owning component;
/// every following `register` call belongs to that group until the next
/// `open_group`. A registry rejects malformed descriptors (bad flag name,
/// colliding flag or alias) and the failure propagates unmodified.
pub trait ParamRegistry {
    fn open_group(&mut self, component: &'static str);
    fn register(&mut self, param: &Param) -> Result<(), RegistrationError>;
}

/// Walks components in resolver order and merges their parameter tables
/// into one ordered schema, forwarding each surviving parameter to the
/// registry.
///
/// Merge policy:
/// - a name already claimed by an earlier-visited component is silently
///   dropped, so a depending component's parameters shadow those of its
///   dependencies;
/// - hidden parameters are skipped without claiming their name, leaving
///   it free for a later visible declaration;
/// - components without a parameter table are skipped.
pub fn aggregate(
    components: &[&'static ComponentDef],
    registry: &mut dyn ParamRegistry,
) -> Result<Vec<AggregatedParam>, RegistrationError> {
    let mut claimed: HashSet<String> = HashSet::new();
    let mut schema = Vec::new();

    for component in components {
        let Some(table) = component.param_table() else {
            continue;
        };

        registry.open_group(component.name);

        for param in table.iter() {
            if claimed.contains(&param.name) {
                log::debug!(
                    "Parameter '{}' of component '{}' is shadowed by an earlier declaration.",
                    param.name,
                    component.name
                );
                continue;
            }
            if param.hidden {
                continue;
            }

            claimed.insert(param.name.clone());
            registry.register(param)?;
            schema.push(AggregatedParam {
                component: component.name,
                param: param.clone(),
            });
        }
    }

    Ok(schema)
}

// MARK: --- UNIT TESTS ---
