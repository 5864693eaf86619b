//! Reference-identity reuse across reparses.
//!
//! Every keystroke in a hosting editor produces a brand-new parse. Consumers
//! that detect change by pointer (`Arc::ptr_eq`) would then redraw
//! everything. Splicing structurally equal values from the previous snapshot
//! back in lets them see only what actually changed.

use indexmap::IndexMap;
use std::hash::Hash;
use std::sync::Arc;

/// For every key present in both maps whose values compare equal, replace
/// the value in `mine` with the `Arc` from `theirs`. Returns how many values
/// were spliced.
pub fn splice_by_equality<K, V>(mine: &mut IndexMap<K, Arc<V>>, theirs: &IndexMap<K, Arc<V>>) -> usize
where
    K: Hash + Eq,
    V: PartialEq,
{
    let mut spliced = 0;
    for (key, value) in mine.iter_mut() {
        if let Some(old) = theirs.get(key)
            && !Arc::ptr_eq(value, old)
            && **value == **old
        {
            *value = Arc::clone(old);
            spliced += 1;
        }
    }
    spliced
}
