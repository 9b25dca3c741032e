//! Record assembly
//!
//! Turns one flat input record (CSV row or CLI payload) into a
//! persisted part. Each row moves through parsing, identifier
//! resolution, duplicate checking, and building; rejections are
//! per-row values and never abort sibling rows, while store errors
//! propagate and abort the batch. The assembler stages work inside the
//! caller's transaction and never commits itself.

use std::collections::BTreeMap;

use chrono::Utc;
use thiserror::Error;

use super::classid::{ClassCode, ClassSegments, SegmentError, ID_KEY, SEGMENT_KEYS};
use super::router::{self, RoutedAttributes};
use super::sequence::{SequenceAllocator, SequenceError};
use super::store::{PartStore, StoreError};
use crate::entities::part::{DirectField, DirectFieldError, PartRecord};
use crate::schema::SchemaCatalog;

/// One flat string-keyed input record
pub type RecordInput = BTreeMap<String, String>;

/// Why one row was rejected. Collected per row, never thrown past the
/// row boundary.
#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Segment(#[from] SegmentError),

    #[error("unrecognized domain code '{code}'")]
    UnknownDomain { code: String },

    #[error("duplicate identifier {id} (re-run with replace to overwrite)")]
    Duplicate { id: String },

    #[error(transparent)]
    Sequence(SequenceError),

    #[error(transparent)]
    Field(#[from] DirectFieldError),

    #[error("no part with identifier {id}")]
    NotFound { id: String },
}

/// What happened to one row
#[derive(Debug)]
pub enum RowOutcome {
    Created(String),
    Replaced(String),
    Updated(String),
    Rejected(RowError),
}

impl RowOutcome {
    /// Identifier for rows that made it to persistence
    pub fn id(&self) -> Option<&str> {
        match self {
            RowOutcome::Created(id) | RowOutcome::Replaced(id) | RowOutcome::Updated(id) => {
                Some(id)
            }
            RowOutcome::Rejected(_) => None,
        }
    }
}

/// Builds parts from input records within one batch.
///
/// Holds the batch's sequence allocator, so one assembler instance maps
/// to exactly one logical batch.
pub struct RecordAssembler<'a> {
    catalog: &'a SchemaCatalog,
    prefix: &'a str,
    allocator: SequenceAllocator,
    replace: bool,
}

impl<'a> RecordAssembler<'a> {
    pub fn new(catalog: &'a SchemaCatalog, prefix: &'a str, replace: bool) -> Self {
        Self {
            catalog,
            prefix,
            allocator: SequenceAllocator::new(),
            replace,
        }
    }

    /// Run one input record through the pipeline. `Ok(Rejected)` is a
    /// per-row failure; `Err` is a store failure that aborts the batch.
    pub fn assemble(
        &mut self,
        store: &PartStore,
        input: &RecordInput,
    ) -> Result<RowOutcome, StoreError> {
        // Parsing: a decodable identifier is authoritative; otherwise
        // the four raw segments must validate and the domain must be
        // known to the catalog.
        let code = match self.parse_identifier(input) {
            Some(code) => code,
            None => {
                let segments = match self.parse_segments(input) {
                    Ok(segments) => segments,
                    Err(reason) => return Ok(RowOutcome::Rejected(reason)),
                };

                // Resolving-Identifier: synthesize via the allocator
                match self.allocator.next(store, &segments) {
                    Ok(sequence) => ClassCode::new(segments, sequence),
                    Err(SequenceError::Exhausted { group }) => {
                        return Ok(RowOutcome::Rejected(RowError::Sequence(
                            SequenceError::Exhausted { group },
                        )))
                    }
                    Err(SequenceError::Store(e)) => return Err(e),
                }
            }
        };
        let id = code.encode(self.prefix);

        // Checking-Duplicate
        let mut replaced = false;
        if store.part_exists(&id)? {
            if !self.replace {
                return Ok(RowOutcome::Rejected(RowError::Duplicate { id }));
            }
            store.delete_part(&id)?;
            replaced = true;
        }

        // Building
        let mut record = PartRecord::new(id.clone(), &code, Utc::now());
        if let Err(e) = apply_direct_fields(&mut record, input, false) {
            return Ok(RowOutcome::Rejected(e));
        }

        let template = self.catalog.template_for_segments(&code.segments);
        let routed = router::route(template, input);

        // On create the blob is whatever this record supplies
        record.overflow = routed.overflow_set.clone();

        store.insert_part(&record)?;
        stage_rows(store, &id, &routed)?;

        // Persisted: committed (or rolled back) by the batch owner
        Ok(if replaced {
            RowOutcome::Replaced(id)
        } else {
            RowOutcome::Created(id)
        })
    }

    /// An identifier value that decodes wins; an absent or undecodable
    /// one falls back to raw-segment synthesis
    fn parse_identifier(&self, input: &RecordInput) -> Option<ClassCode> {
        let raw = input.get(ID_KEY).map(|s| s.trim()).unwrap_or("");
        ClassCode::decode(self.prefix, raw)
    }

    fn parse_segments(&self, input: &RecordInput) -> Result<ClassSegments, RowError> {
        let get = |key: &str| input.get(key).map(String::as_str).unwrap_or("");
        let segments = ClassSegments::parse(
            get(SEGMENT_KEYS[0]),
            get(SEGMENT_KEYS[1]),
            get(SEGMENT_KEYS[2]),
            get(SEGMENT_KEYS[3]),
        )?;

        let domain = segments.domain_code();
        if !self.catalog.is_known_domain(&domain) {
            return Err(RowError::UnknownDomain { code: domain });
        }
        Ok(segments)
    }
}

/// Merge-style update of an existing part: only keys present in the
/// payload are touched. Applying the same payload twice leaves the
/// same attribute-row and overflow state as applying it once.
pub fn update_record(
    store: &PartStore,
    catalog: &SchemaCatalog,
    id: &str,
    input: &RecordInput,
) -> Result<RowOutcome, StoreError> {
    let mut record = match store.get_part(id)? {
        Some(record) => record,
        None => {
            return Ok(RowOutcome::Rejected(RowError::NotFound {
                id: id.to_string(),
            }))
        }
    };

    if let Err(e) = apply_direct_fields(&mut record, input, true) {
        return Ok(RowOutcome::Rejected(e));
    }

    let template = catalog.template_for(&record.family_key());
    let routed = router::route(template, input);

    // Blob merges on update: keys not named in the payload survive
    for (key, value) in &routed.overflow_set {
        record.overflow.insert(key.clone(), value.clone());
    }
    for key in &routed.overflow_unset {
        record.overflow.remove(key);
    }

    record.updated = Utc::now();
    store.update_part(&record)?;
    stage_rows(store, id, &routed)?;

    Ok(RowOutcome::Updated(id.to_string()))
}

/// Apply direct-column values. On create, empty values are ignored
/// (fields already default to empty); on update, an explicitly-present
/// empty value clears the field.
fn apply_direct_fields(
    record: &mut PartRecord,
    input: &RecordInput,
    clear_on_empty: bool,
) -> Result<(), RowError> {
    for field in DirectField::all() {
        let Some(raw) = input.get(field.key()) else {
            continue;
        };
        let value = raw.trim();
        if value.is_empty() {
            if clear_on_empty {
                clear_field(record, *field);
            }
            continue;
        }
        field.apply(record, value).map_err(RowError::Field)?;
    }
    Ok(())
}

fn clear_field(record: &mut PartRecord, field: DirectField) {
    match field {
        DirectField::Quantity => record.quantity = 0,
        // every other direct field is a string; write the default
        _ => {
            let _ = field.apply(record, "");
        }
    }
}

fn stage_rows(store: &PartStore, id: &str, routed: &RoutedAttributes) -> Result<(), StoreError> {
    for (name, value) in &routed.row_upserts {
        store.upsert_attribute(id, name, value)?;
    }
    for name in &routed.row_deletes {
        store.delete_attribute(id, name)?;
    }
    Ok(())
}

/// Result of one batch import
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Per-row outcomes, in input order
    pub outcomes: Vec<RowOutcome>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn created(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RowOutcome::Created(_)))
            .count()
    }

    pub fn replaced(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RowOutcome::Replaced(_)))
            .count()
    }

    /// Rejected rows as (position, reason) pairs
    pub fn rejections(&self) -> impl Iterator<Item = (usize, &RowError)> {
        self.outcomes.iter().enumerate().filter_map(|(i, o)| match o {
            RowOutcome::Rejected(reason) => Some((i, reason)),
            _ => None,
        })
    }
}

/// Process rows strictly sequentially as one batch: one allocator, one
/// transaction. Row rejections are collected; a store error rolls the
/// whole batch back and surfaces as the single batch-level failure.
/// With `dry_run` the transaction is always rolled back, so outcomes
/// can be previewed without persisting anything.
pub fn import_batch(
    store: &PartStore,
    catalog: &SchemaCatalog,
    prefix: &str,
    rows: &[RecordInput],
    replace: bool,
    dry_run: bool,
) -> Result<BatchReport, StoreError> {
    let mut assembler = RecordAssembler::new(catalog, prefix, replace);
    let mut report = BatchReport::default();

    store.begin()?;
    for input in rows {
        match assembler.assemble(store, input) {
            Ok(outcome) => report.outcomes.push(outcome),
            Err(e) => {
                let _ = store.rollback();
                return Err(e);
            }
        }
    }

    if dry_run {
        store.rollback()?;
    } else {
        store.commit()?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaCatalog;

    const SCHEMA: &str = r#"
domains:
  - code: "01"
    name: "Passives"
    families:
      - code: "01"
        name: "Resistors"
      - code: "02"
        name: "Capacitors"
      - code: "03"
        name: "Inductors"
"#;

    const TEMPLATES: &str = r#"
"0102":
  - Resistance
  - Tolerance
"#;

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::load(SCHEMA, TEMPLATES).unwrap().0
    }

    fn record(pairs: &[(&str, &str)]) -> RecordInput {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn fresh_row() -> RecordInput {
        record(&[
            ("MPN", "R001"),
            ("TT", "01"),
            ("FF", "02"),
            ("CC", "00"),
            ("SS", "00"),
            ("Resistance", "10K"),
        ])
    }

    #[test]
    fn test_fresh_import_synthesizes_identifier() {
        let store = PartStore::open_in_memory().unwrap();
        let cat = catalog();

        let report =
            import_batch(&store, &cat, "DMT", &[fresh_row()], false, false).unwrap();
        assert_eq!(report.created(), 1);
        assert_eq!(report.outcomes[0].id(), Some("DMT-01020000001"));

        let part = store.get_part("DMT-01020000001").unwrap().unwrap();
        assert_eq!(part.mpn, "R001");
        let attrs = store.attributes_for(&part.id).unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!((attrs[0].name.as_str(), attrs[0].value.as_str()), ("Resistance", "10K"));
    }

    #[test]
    fn test_duplicate_without_replace_rejects_second() {
        let store = PartStore::open_in_memory().unwrap();
        let cat = catalog();
        let row = record(&[
            ("DMTUID", "DMT-01020000001"),
            ("MPN", "R001"),
            ("Resistance", "10K"),
        ]);

        let report = import_batch(
            &store,
            &cat,
            "DMT",
            &[row.clone(), row],
            false,
            false,
        )
        .unwrap();

        assert_eq!(report.created(), 1);
        let rejections: Vec<_> = report.rejections().collect();
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].0, 1);
        assert!(rejections[0].1.to_string().contains("DMT-01020000001"));
        assert_eq!(store.count_parts().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_with_replace_overwrites() {
        let store = PartStore::open_in_memory().unwrap();
        let cat = catalog();

        let first = record(&[
            ("DMTUID", "DMT-01020000001"),
            ("MPN", "C-OLD"),
            ("Resistance", "10K"),
            ("Tolerance", "5%"),
        ]);
        import_batch(&store, &cat, "DMT", &[first], false, false).unwrap();

        let second = record(&[
            ("DMTUID", "DMT-01020000001"),
            ("MPN", "C-NEW"),
            ("Resistance", "22K"),
        ]);
        let report = import_batch(&store, &cat, "DMT", &[second], true, false).unwrap();
        assert_eq!(report.replaced(), 1);

        let part = store.get_part("DMT-01020000001").unwrap().unwrap();
        assert_eq!(part.mpn, "C-NEW");
        // old rows are gone with the old record; only the new values remain
        let attrs = store.attributes_for(&part.id).unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].value, "22K");
        assert_eq!(store.count_parts().unwrap(), 1);
    }

    #[test]
    fn test_malformed_segment_rejects_row() {
        let store = PartStore::open_in_memory().unwrap();
        let cat = catalog();
        let row = record(&[
            ("MPN", "X1"),
            ("TT", "01"),
            ("FF", "abc"),
            ("CC", "00"),
            ("SS", "00"),
        ]);

        let report = import_batch(&store, &cat, "DMT", &[row], false, false).unwrap();
        let rejections: Vec<_> = report.rejections().collect();
        assert_eq!(rejections.len(), 1);
        let reason = rejections[0].1.to_string();
        assert!(reason.contains("FF"));
        assert!(reason.contains("non-numeric"));
        assert_eq!(store.count_parts().unwrap(), 0);
    }

    #[test]
    fn test_unknown_domain_rejects_row() {
        let store = PartStore::open_in_memory().unwrap();
        let cat = catalog();
        let row = record(&[("TT", "77"), ("FF", "01"), ("CC", "00"), ("SS", "00")]);

        let report = import_batch(&store, &cat, "DMT", &[row], false, false).unwrap();
        let rejections: Vec<_> = report.rejections().collect();
        assert_eq!(rejections.len(), 1);
        assert!(rejections[0].1.to_string().contains("77"));
    }

    #[test]
    fn test_rejection_does_not_abort_siblings() {
        let store = PartStore::open_in_memory().unwrap();
        let cat = catalog();
        let bad = record(&[("TT", "01"), ("FF", "xx"), ("CC", "00"), ("SS", "00")]);

        let report = import_batch(
            &store,
            &cat,
            "DMT",
            &[fresh_row(), bad, fresh_row()],
            false,
            false,
        )
        .unwrap();

        assert_eq!(report.total(), 3);
        assert_eq!(report.created(), 2);
        assert_eq!(report.rejections().count(), 1);
        // same group, same batch: sequences stay monotonic via the cache
        assert!(store.part_exists("DMT-01020000001").unwrap());
        assert!(store.part_exists("DMT-01020000002").unwrap());
    }

    #[test]
    fn test_no_template_family_uses_overflow_only() {
        let store = PartStore::open_in_memory().unwrap();
        let cat = catalog();
        let row = record(&[
            ("TT", "01"),
            ("FF", "03"),
            ("CC", "00"),
            ("SS", "00"),
            ("Inductance", "10uH"),
            ("Reel", "R-17"),
        ]);

        let report = import_batch(&store, &cat, "DMT", &[row], false, false).unwrap();
        let id = report.outcomes[0].id().unwrap();
        assert!(store.attributes_for(id).unwrap().is_empty());

        let part = store.get_part(id).unwrap().unwrap();
        assert_eq!(part.overflow.len(), 2);
        assert_eq!(part.overflow.get("Inductance").map(String::as_str), Some("10uH"));
    }

    #[test]
    fn test_bad_quantity_rejects_row() {
        let store = PartStore::open_in_memory().unwrap();
        let cat = catalog();
        let mut row = fresh_row();
        row.insert("Quantity".to_string(), "lots".to_string());

        let report = import_batch(&store, &cat, "DMT", &[row], false, false).unwrap();
        assert_eq!(report.rejections().count(), 1);
        assert_eq!(store.count_parts().unwrap(), 0);
    }

    #[test]
    fn test_dry_run_persists_nothing() {
        let store = PartStore::open_in_memory().unwrap();
        let cat = catalog();

        let report =
            import_batch(&store, &cat, "DMT", &[fresh_row()], false, true).unwrap();
        assert_eq!(report.created(), 1);
        assert_eq!(store.count_parts().unwrap(), 0);
    }

    #[test]
    fn test_update_touches_only_named_keys() {
        let store = PartStore::open_in_memory().unwrap();
        let cat = catalog();
        let row = record(&[
            ("DMTUID", "DMT-01020000001"),
            ("MPN", "C-1"),
            ("Resistance", "10K"),
            ("Tolerance", "5%"),
            ("Reel", "R-17"),
        ]);
        import_batch(&store, &cat, "DMT", &[row], false, false).unwrap();

        let payload = record(&[("Tolerance", "1%"), ("Shelf", "B3")]);
        let outcome = update_record(&store, &cat, "DMT-01020000001", &payload).unwrap();
        assert!(matches!(outcome, RowOutcome::Updated(_)));

        let part = store.get_part("DMT-01020000001").unwrap().unwrap();
        assert_eq!(part.mpn, "C-1"); // untouched
        assert_eq!(part.overflow.get("Reel").map(String::as_str), Some("R-17")); // merged, not replaced
        assert_eq!(part.overflow.get("Shelf").map(String::as_str), Some("B3"));

        let attrs = store.attributes_for(&part.id).unwrap();
        let tolerance = attrs.iter().find(|a| a.name == "Tolerance").unwrap();
        assert_eq!(tolerance.value, "1%");
        assert!(attrs.iter().any(|a| a.name == "Resistance")); // untouched
    }

    #[test]
    fn test_update_is_idempotent() {
        let store = PartStore::open_in_memory().unwrap();
        let cat = catalog();
        let row = record(&[
            ("DMTUID", "DMT-01020000001"),
            ("Resistance", "10K"),
            ("Reel", "R-17"),
        ]);
        import_batch(&store, &cat, "DMT", &[row], false, false).unwrap();

        let payload = record(&[
            ("Resistance", ""),
            ("Tolerance", "1%"),
            ("Reel", ""),
            ("Shelf", "B3"),
        ]);
        update_record(&store, &cat, "DMT-01020000001", &payload).unwrap();
        let once_attrs = store.attributes_for("DMT-01020000001").unwrap();
        let once_part = store.get_part("DMT-01020000001").unwrap().unwrap();

        update_record(&store, &cat, "DMT-01020000001", &payload).unwrap();
        let twice_attrs = store.attributes_for("DMT-01020000001").unwrap();
        let twice_part = store.get_part("DMT-01020000001").unwrap().unwrap();

        assert_eq!(once_attrs, twice_attrs);
        assert_eq!(once_part.overflow, twice_part.overflow);
        // empty values deleted the row and pruned the blob key
        assert!(!twice_attrs.iter().any(|a| a.name == "Resistance"));
        assert!(!twice_part.overflow.contains_key("Reel"));
    }

    #[test]
    fn test_update_missing_part_is_rejected() {
        let store = PartStore::open_in_memory().unwrap();
        let cat = catalog();
        let outcome =
            update_record(&store, &cat, "DMT-01020000009", &record(&[("MPN", "X")])).unwrap();
        assert!(matches!(
            outcome,
            RowOutcome::Rejected(RowError::NotFound { .. })
        ));
    }

    #[test]
    fn test_explicit_identifier_skips_domain_check() {
        // Decoded identifiers are authoritative even for domains the
        // catalog does not know; name lookups degrade to "Unknown".
        let store = PartStore::open_in_memory().unwrap();
        let cat = catalog();
        let row = record(&[("DMTUID", "DMT-77010000001"), ("MPN", "M1")]);

        let report = import_batch(&store, &cat, "DMT", &[row], false, false).unwrap();
        assert_eq!(report.created(), 1);
        assert!(store.part_exists("DMT-77010000001").unwrap());
    }
}
