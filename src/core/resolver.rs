// src/core/resolver.rs

use crate::models::ComponentDef;
use std::collections::HashSet;

/// Expands a seed list of components into the full, deduplicated
/// traversal order by walking each component's declared dependency list.
///
/// The seed order is preserved and each component's dependencies are
/// appended to the end of the worklist breadth-first, so a depending
/// component is always visited before the components it depends on.
/// A component is marked visited before its dependency list is expanded,
/// which both deduplicates the result (first appearance wins, keyed by
/// component name) and guarantees termination on cyclic or
/// self-referential dependency declarations.
pub fn expand(seed: &[&'static ComponentDef]) -> Vec<&'static ComponentDef> {
    let mut worklist: Vec<&'static ComponentDef> = seed.to_vec();
    let mut visited: HashSet<&'static str> = HashSet::new();
    let mut resolved = Vec::new();

    let mut i = 0;
    while i < worklist.len() {
        let component = worklist[i];
        i += 1;

        // Already visited: do not re-expand, or a cycle would never terminate.
        if !visited.insert(component.name) {
            continue;
        }
        log::debug!("Resolved component '{}'.", component.name);
        resolved.push(component);

        for dep in component.dependencies {
            worklist.push(dep);
        }
    }

    resolved
}

// MARK: --- UNIT TESTS ---
