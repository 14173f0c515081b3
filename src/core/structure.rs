//! Construction-time structural checks
//!
//! Pipelines are checked once, before anything runs. The walk is depth-first
//! and left to right, and stops at the first offending element.

use crate::core::{
    error::{ConstructionError, IndexPath},
    pipeline::Node,
};
use serde_json::{Map, Value};

/// Keys a declarative stage may carry
pub const STAGE_KEYS: [&str; 3] = ["validate", "fetch", "transform"];

/// Common misnamings mapped straight to the key they stand for
const KNOWN_ALIASES: &[(&str, &str)] = &[
    ("io", "fetch"),
    ("load", "fetch"),
    ("map", "transform"),
    ("shape", "transform"),
    ("validation", "validate"),
    ("schema", "validate"),
    ("spec", "validate"),
];

/// Check typed pipeline elements: at least one element, no empty group at
/// any depth.
pub fn check_nodes(nodes: &[Node]) -> Result<(), ConstructionError> {
    if nodes.is_empty() {
        return Err(ConstructionError::Empty);
    }
    check_node_list(nodes, &IndexPath::root())
}

fn check_node_list(nodes: &[Node], parent: &IndexPath) -> Result<(), ConstructionError> {
    for (index, node) in nodes.iter().enumerate() {
        let path = parent.child(index);
        if let Node::Group(members) = node {
            if members.is_empty() {
                return Err(ConstructionError::NotAStage { path });
            }
            check_node_list(members, &path)?;
        }
    }
    Ok(())
}

/// Check a declarative pipeline tree.
///
/// Every element must be a mapping of recognized stage keys to handler names,
/// or a non-empty sequence of such elements.
pub fn check_definition(elements: &[Value]) -> Result<(), ConstructionError> {
    if elements.is_empty() {
        return Err(ConstructionError::Empty);
    }
    check_value_list(elements, &IndexPath::root())
}

fn check_value_list(elements: &[Value], parent: &IndexPath) -> Result<(), ConstructionError> {
    for (index, element) in elements.iter().enumerate() {
        let path = parent.child(index);
        match element {
            Value::Object(stage) => check_stage_keys(stage, &path)?,
            Value::Array(members) if !members.is_empty() => check_value_list(members, &path)?,
            _ => return Err(ConstructionError::NotAStage { path }),
        }
    }
    Ok(())
}

fn check_stage_keys(stage: &Map<String, Value>, path: &IndexPath) -> Result<(), ConstructionError> {
    let keys: Vec<&str> = stage.keys().map(String::as_str).collect();
    if let Some((key, suggestion)) = suggest_keys(&keys).into_iter().next() {
        return Err(ConstructionError::UnknownKey {
            path: path.clone(),
            key,
            suggestion,
        });
    }

    // Handlers are referenced by name
    if stage.values().any(|handler| !handler.is_string()) {
        return Err(ConstructionError::NotAStage { path: path.clone() });
    }
    Ok(())
}

/// For every unrecognized key, pair it with the recognized key it most likely
/// meant.
pub fn suggest_keys(keys: &[&str]) -> Vec<(String, String)> {
    keys.iter()
        .filter(|key| !STAGE_KEYS.contains(*key))
        .map(|key| (key.to_string(), nearest_key(key).to_string()))
        .collect()
}

/// Closest recognized stage key for `key`
pub fn nearest_key(key: &str) -> &'static str {
    let lowered = key.to_lowercase();
    if let Some((_, target)) = KNOWN_ALIASES.iter().find(|(alias, _)| *alias == lowered) {
        return *target;
    }

    STAGE_KEYS
        .iter()
        .copied()
        .min_by_key(|candidate| edit_distance(&lowered, candidate))
        .unwrap_or(STAGE_KEYS[0])
}

/// Levenshtein distance over chars
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut current = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        previous = current;
    }

    previous[b.len()]
}
