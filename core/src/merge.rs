//! Shallow, left-to-right merging of key-value mappings.

use crate::http::Fields;

/// Copy every entry of each source into `target`, left to right.
///
/// Later values win. A key already present in `target` keeps its position.
pub fn assign<'a>(target: &mut Fields, sources: impl IntoIterator<Item = &'a Fields>) {
    for source in sources {
        for (key, value) in source.iter() {
            target.insert(key, value.clone());
        }
    }
}

/// Merge `sources` into a fresh mapping.
pub fn merged<'a>(sources: impl IntoIterator<Item = &'a Fields>) -> Fields {
    let mut target = Fields::new();
    assign(&mut target, sources);
    target
}
