use super::PageFragment;
use crate::{ExtractError, Result};
use serde_json::{Map, Value};

/// Folds fragments left to right in the order given.
///
/// Callers pass fragments in ascending page order. Arrays present on both
/// sides are concatenated; any other collision takes the later value.
pub fn merge(fragments: &[PageFragment]) -> Result<Map<String, Value>> {
    let Some((first, rest)) = fragments.split_first() else {
        return Err(ExtractError::NoDataExtracted { pages: 0 });
    };

    let mut merged = first.data.clone();
    for fragment in rest {
        merge_into(&mut merged, &fragment.data);
    }
    Ok(merged)
}

/// Shallow merge of `incoming` into `acc`.
pub fn merge_into(acc: &mut Map<String, Value>, incoming: &Map<String, Value>) {
    for (key, value) in incoming {
        match (acc.get_mut(key), value) {
            (Some(Value::Array(existing)), Value::Array(more)) => {
                existing.extend(more.iter().cloned());
            }
            _ => {
                acc.insert(key.clone(), value.clone());
            }
        }
    }
}
