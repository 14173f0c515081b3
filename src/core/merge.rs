//! Right-biased shallow merge of data mappings

use serde_json::{Map, Value};

/// Accumulated pipeline output: string keys to arbitrary JSON values
pub type Data = Map<String, Value>;

/// Merge two mappings, keeping every key of `base` and letting `overlay` win
/// on conflicts.
///
/// Only the top level is merged. A nested object in `overlay` replaces the
/// one in `base` wholesale.
pub fn merge(base: &Data, overlay: &Data) -> Data {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Fold an ordered sequence of mappings onto `base`, left to right
pub fn merge_all<'a, I>(base: &Data, overlays: I) -> Data
where
    I: IntoIterator<Item = &'a Data>,
{
    overlays
        .into_iter()
        .fold(base.clone(), |acc, overlay| merge(&acc, overlay))
}

/// Convert a JSON value into a data mapping.
///
/// Objects are taken as-is, `null` becomes an empty mapping and anything else
/// is rejected.
pub fn into_data(value: Value) -> anyhow::Result<Data> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Data::new()),
        other => anyhow::bail!("Expected a JSON object for pipeline data, got: {}", other),
    }
}
