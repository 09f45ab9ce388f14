//! Canonical merge functions, grounded on the original's `inserters.go`. Each is a
//! pure function of `(old_value) -> new_value`, passed to [`crate::trie::Tree::insert_func`].

use crate::error::{Error, Result};
use crate::value::Value;

/// A merge function: given the record currently stored at the insertion site (or
/// `None` if there was none), returns the record that should replace it, or `None` to
/// remove it entirely.
pub type MergeFn<'a> = Box<dyn FnMut(Option<Value>) -> Result<Option<Value>> + 'a>;

/// Always removes the existing record.
pub fn remove() -> MergeFn<'static> {
    Box::new(|_old| Ok(None))
}

/// Replaces the existing record with `value`, discarding whatever was there.
pub fn replace_with(value: Value) -> MergeFn<'static> {
    Box::new(move |_old| Ok(Some(value.clone())))
}

/// Updates an existing `Map` by adding `value`'s top-level keys, replacing any keys
/// already present. Both the new and existing value must be a `Map`; `None` for the
/// existing value is treated as an empty map.
pub fn top_level_merge_with(value: Value) -> MergeFn<'static> {
    Box::new(move |old| {
        let Value::Map(new_map) = &value else {
            return Err(Error::Merge(
                "the new value is not a Map; TopLevelMergeWith only works if both values are Map values"
                    .into(),
            ));
        };

        let mut result = match old {
            None => Default::default(),
            Some(Value::Map(m)) => m,
            Some(_) => {
                return Err(Error::Merge(
                    "the existing value is not a Map; TopLevelMergeWith only works if both \
                     values are Map values"
                        .into(),
                ))
            }
        };

        for (k, v) in new_map {
            result.insert(k.clone(), v.clone());
        }
        Ok(Some(Value::Map(result)))
    })
}

/// Recursively merges `Map` with `Map` (key-wise) and `Slice` with `Slice`
/// (index-wise, with the result length equal to the longer side). Any other pair of
/// types takes the new value.
pub fn deep_merge_with(value: Value) -> MergeFn<'static> {
    Box::new(move |old| Ok(Some(deep_merge(old, Some(value.clone())))))
}

fn deep_merge(old: Option<Value>, new: Option<Value>) -> Value {
    match (old, new) {
        (None, Some(new)) => new,
        (Some(old), None) => old,
        (Some(Value::Map(old_map)), Some(Value::Map(new_map))) => {
            let mut merged = old_map;
            for (k, v) in new_map {
                let existing = merged.remove(&k);
                merged.insert(k, deep_merge(existing, Some(v)));
            }
            Value::Map(merged)
        }
        (Some(Value::Slice(old_items)), Some(Value::Slice(new_items))) => {
            let len = old_items.len().max(new_items.len());
            let mut old_iter = old_items.into_iter();
            let mut new_iter = new_items.into_iter();
            let mut merged = Vec::with_capacity(len);
            for _ in 0..len {
                merged.push(deep_merge(old_iter.next(), new_iter.next()));
            }
            Value::Slice(merged)
        }
        (Some(_), Some(new)) => new,
        (None, None) => unreachable!("deep_merge called with no values on either side"),
    }
}
