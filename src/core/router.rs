//! Attribute routing
//!
//! For one input record, every key that is neither a classification
//! key nor a direct column gets routed by the family's template:
//! template-listed names become attribute rows, everything else goes
//! to the overflow map. Without a template no attribute rows are ever
//! produced - ad-hoc families must not put ungoverned names into the
//! attribute table.

use std::collections::BTreeMap;

use super::classid::{ID_KEY, SEGMENT_KEYS, SEQ_KEY};
use crate::entities::part::DirectField;

/// Routing result for the non-direct attributes of one record.
///
/// Upserts and deletes are disjoint; a name appears in at most one
/// list. Ordering follows the input's sorted key order, so the result
/// is deterministic for a given input map.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoutedAttributes {
    /// Attribute rows to write (update existing row or append new)
    pub row_upserts: Vec<(String, String)>,
    /// Attribute rows to remove (template names that arrived empty)
    pub row_deletes: Vec<String>,
    /// Overflow keys to set
    pub overflow_set: BTreeMap<String, String>,
    /// Overflow keys to prune (non-template names that arrived empty)
    pub overflow_unset: Vec<String>,
}

impl RoutedAttributes {
    pub fn is_empty(&self) -> bool {
        self.row_upserts.is_empty()
            && self.row_deletes.is_empty()
            && self.overflow_set.is_empty()
            && self.overflow_unset.is_empty()
    }
}

/// Keys that identify the part rather than describe it; never routed
pub fn is_reserved_key(key: &str) -> bool {
    key == ID_KEY || key == SEQ_KEY || SEGMENT_KEYS.contains(&key)
}

/// Split one record's attributes by the family template (or its
/// absence). Direct-column keys are excluded here; the assembler
/// applies them to the record fields itself.
pub fn route(template: Option<&[String]>, input: &BTreeMap<String, String>) -> RoutedAttributes {
    let mut routed = RoutedAttributes::default();

    for (key, raw) in input {
        if is_reserved_key(key) || DirectField::from_key(key).is_some() {
            continue;
        }

        let value = raw.trim();
        let in_template = template.is_some_and(|names| names.iter().any(|n| n == key));

        if in_template {
            if value.is_empty() {
                routed.row_deletes.push(key.clone());
            } else {
                routed.row_upserts.push((key.clone(), value.to_string()));
            }
        } else if value.is_empty() {
            routed.overflow_unset.push(key.clone());
        } else {
            routed.overflow_set.insert(key.clone(), value.to_string());
        }
    }

    routed
}
