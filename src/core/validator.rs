// src/core/validator.rs

use crate::models::{ComponentDef, ResolvedValues};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Configuration validation failed for component '{component}': {source}")]
pub struct ValidationError {
    pub component: &'static str,
    #[source]
    pub source: anyhow::Error,
}

/// Invokes each component's validation hook with the resolved values, in
/// resolver order. Components without a hook are skipped. The first
/// failure aborts the remaining dispatch and propagates, wrapped with the
/// owning component's name.
pub fn run(
    components: &[&'static ComponentDef],
    values: &ResolvedValues,
) -> Result<(), ValidationError> {
    for component in components {
        let Some(hook) = component.validate else {
            continue;
        };
        log::debug!("Validating configuration for '{}'.", component.name);
        hook(values).map_err(|source| ValidationError {
            component: component.name,
            source,
        })?;
    }
    Ok(())
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParamValue;
    use anyhow::ensure;
    use std::sync::Mutex;

    // Validation hooks are plain fn pointers, so call order is recorded
    // through statics. Each test gets its own recorder to stay independent
    // under the parallel test runner.
    static FAIL_FAST_CALLS: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());
    static HAPPY_CALLS: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    fn check_rate(values: &ResolvedValues) -> anyhow::Result<()> {
        FAIL_FAST_CALLS.lock().unwrap().push("gate");
        ensure!(
            values.get_int("rate").is_some_and(|rate| rate > 0),
            "rate must be positive"
        );
        Ok(())
    }

    fn check_unreached(_values: &ResolvedValues) -> anyhow::Result<()> {
        FAIL_FAST_CALLS.lock().unwrap().push("after-gate");
        Ok(())
    }

    fn note_first(_values: &ResolvedValues) -> anyhow::Result<()> {
        HAPPY_CALLS.lock().unwrap().push("first");
        Ok(())
    }

    fn note_second(_values: &ResolvedValues) -> anyhow::Result<()> {
        HAPPY_CALLS.lock().unwrap().push("second");
        Ok(())
    }

    static GATE: ComponentDef = ComponentDef::new("gate").with_validator(check_rate);
    static AFTER_GATE: ComponentDef =
        ComponentDef::new("after-gate").with_validator(check_unreached);
    static FIRST: ComponentDef = ComponentDef::new("first").with_validator(note_first);
    static SECOND: ComponentDef = ComponentDef::new("second").with_validator(note_second);
    static SILENT: ComponentDef = ComponentDef::new("silent");

    #[test]
    fn test_validation_dispatch_is_fail_fast() {
        let mut values = ResolvedValues::new();
        values.set("rate", ParamValue::Int(-1));

        let err = run(&[&SILENT, &GATE, &AFTER_GATE], &values).unwrap_err();
        assert_eq!(err.component, "gate");
        assert!(err.source.to_string().contains("rate must be positive"));
        // The failure in `gate` must prevent the later hook from running.
        assert_eq!(*FAIL_FAST_CALLS.lock().unwrap(), vec!["gate"]);
    }

    #[test]
    fn test_validation_passes_through_all_hooks() {
        let mut values = ResolvedValues::new();
        values.set("rate", ParamValue::Int(5));

        run(&[&FIRST, &SECOND, &SILENT], &values).unwrap();
        assert_eq!(*HAPPY_CALLS.lock().unwrap(), vec!["first", "second"]);
    }
}
