//! Part entity - the cataloged component record
//!
//! A part's primary key is its full DMTUID string; the decomposed
//! classification segments sit alongside it as indexed columns. Fixed
//! ("direct") attributes are always present and default to empty;
//! template-governed attributes live in owned `AttributeRow`s and
//! everything else goes into the overflow map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::core::classid::{ClassCode, ClassSegments};

/// The fixed columns of a part and their case-sensitive input keys.
///
/// This set is known at compile time; values for these keys always map
/// straight to `PartRecord` fields, never to attribute rows or the
/// overflow map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectField {
    Mpn,
    Manufacturer,
    Value,
    Description,
    Quantity,
    Location,
    Datasheet,
    Distributor,
    DistributorPn,
    Symbol,
    Footprint,
    Model,
    Notes,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectFieldError {
    #[error("field Quantity is non-numeric: '{value}'")]
    BadQuantity { value: String },
}

impl DirectField {
    /// The input key for this field, as bulk input and the CLI spell it
    pub fn key(&self) -> &'static str {
        match self {
            DirectField::Mpn => "MPN",
            DirectField::Manufacturer => "Manufacturer",
            DirectField::Value => "Value",
            DirectField::Description => "Description",
            DirectField::Quantity => "Quantity",
            DirectField::Location => "Location",
            DirectField::Datasheet => "Datasheet",
            DirectField::Distributor => "Distributor",
            DirectField::DistributorPn => "DistributorPN",
            DirectField::Symbol => "Symbol",
            DirectField::Footprint => "Footprint",
            DirectField::Model => "Model",
            DirectField::Notes => "Notes",
        }
    }

    /// All direct fields, in display/export column order
    pub fn all() -> &'static [DirectField] {
        &[
            DirectField::Mpn,
            DirectField::Manufacturer,
            DirectField::Value,
            DirectField::Description,
            DirectField::Quantity,
            DirectField::Location,
            DirectField::Datasheet,
            DirectField::Distributor,
            DirectField::DistributorPn,
            DirectField::Symbol,
            DirectField::Footprint,
            DirectField::Model,
            DirectField::Notes,
        ]
    }

    /// Match an input key (case-sensitive) against the direct set
    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|f| f.key() == key)
    }

    /// Write a raw input value into the corresponding record field
    pub fn apply(&self, record: &mut PartRecord, value: &str) -> Result<(), DirectFieldError> {
        let value = value.trim();
        match self {
            DirectField::Mpn => record.mpn = value.to_string(),
            DirectField::Manufacturer => record.manufacturer = value.to_string(),
            DirectField::Value => record.value = value.to_string(),
            DirectField::Description => record.description = value.to_string(),
            DirectField::Quantity => {
                record.quantity = value.parse().map_err(|_| DirectFieldError::BadQuantity {
                    value: value.to_string(),
                })?;
            }
            DirectField::Location => record.location = value.to_string(),
            DirectField::Datasheet => record.datasheet = value.to_string(),
            DirectField::Distributor => record.distributor = value.to_string(),
            DirectField::DistributorPn => record.distributor_pn = value.to_string(),
            DirectField::Symbol => record.symbol = value.to_string(),
            DirectField::Footprint => record.footprint = value.to_string(),
            DirectField::Model => record.model = value.to_string(),
            DirectField::Notes => record.notes = value.to_string(),
        }
        Ok(())
    }

    /// Read the field back out of a record, rendered as a string
    pub fn get(&self, record: &PartRecord) -> String {
        match self {
            DirectField::Mpn => record.mpn.clone(),
            DirectField::Manufacturer => record.manufacturer.clone(),
            DirectField::Value => record.value.clone(),
            DirectField::Description => record.description.clone(),
            DirectField::Quantity => record.quantity.to_string(),
            DirectField::Location => record.location.clone(),
            DirectField::Datasheet => record.datasheet.clone(),
            DirectField::Distributor => record.distributor.clone(),
            DirectField::DistributorPn => record.distributor_pn.clone(),
            DirectField::Symbol => record.symbol.clone(),
            DirectField::Footprint => record.footprint.clone(),
            DirectField::Model => record.model.clone(),
            DirectField::Notes => record.notes.clone(),
        }
    }
}

/// A cataloged part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartRecord {
    /// Full DMTUID identifier string (primary key)
    pub id: String,

    /// Two-digit domain code
    pub domain: String,
    /// Two-digit family code
    pub family: String,
    /// Two-digit class code
    pub class: String,
    /// Two-digit style code
    pub style: String,
    /// Per-group sequence number (1-999)
    pub sequence: u16,

    /// Manufacturer part number
    #[serde(default)]
    pub mpn: String,
    #[serde(default)]
    pub manufacturer: String,
    /// Primary electrical value (e.g. "10K", "100nF")
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub description: String,
    /// Stock on hand
    #[serde(default)]
    pub quantity: i64,
    /// Storage location (bin, drawer, shelf)
    #[serde(default)]
    pub location: String,
    /// Datasheet reference (path or URL)
    #[serde(default)]
    pub datasheet: String,
    #[serde(default)]
    pub distributor: String,
    /// Distributor's order number
    #[serde(default)]
    pub distributor_pn: String,
    /// KiCad symbol reference (LIB:Name)
    #[serde(default)]
    pub symbol: String,
    /// KiCad footprint reference (LIB:Name)
    #[serde(default)]
    pub footprint: String,
    /// 3D model path
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub notes: String,

    /// Attributes with no template slot, serialized as one JSON object
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overflow: BTreeMap<String, String>,

    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl PartRecord {
    /// Fresh record for a resolved identifier; every direct field
    /// starts empty
    pub fn new(id: String, code: &ClassCode, now: DateTime<Utc>) -> Self {
        Self {
            id,
            domain: code.segments.domain_code(),
            family: code.segments.family_code(),
            class: code.segments.class_code(),
            style: code.segments.style_code(),
            sequence: code.sequence,
            mpn: String::new(),
            manufacturer: String::new(),
            value: String::new(),
            description: String::new(),
            quantity: 0,
            location: String::new(),
            datasheet: String::new(),
            distributor: String::new(),
            distributor_pn: String::new(),
            symbol: String::new(),
            footprint: String::new(),
            model: String::new(),
            notes: String::new(),
            overflow: BTreeMap::new(),
            created: now,
            updated: now,
        }
    }

    /// The classification segments this part is filed under
    pub fn segments(&self) -> ClassSegments {
        // Stored codes are always two zero-padded digits
        ClassSegments {
            domain: self.domain.parse().unwrap_or(0),
            family: self.family.parse().unwrap_or(0),
            class: self.class.parse().unwrap_or(0),
            style: self.style.parse().unwrap_or(0),
        }
    }

    pub fn family_key(&self) -> String {
        format!("{}{}", self.domain, self.family)
    }

    pub fn group_key(&self) -> String {
        format!("{}{}{}{}", self.domain, self.family, self.class, self.style)
    }
}

/// One template-governed attribute of a part. Owned exclusively by its
/// parent record and cascade-deleted with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRow {
    pub part_id: String,
    pub name: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classid::ClassCode;

    fn sample_code() -> ClassCode {
        ClassCode::decode("DMT", "DMT-01020304005").unwrap()
    }

    #[test]
    fn test_new_record_defaults_empty() {
        let code = sample_code();
        let part = PartRecord::new(code.encode("DMT"), &code, Utc::now());
        assert_eq!(part.id, "DMT-01020304005");
        assert_eq!(part.domain, "01");
        assert_eq!(part.family, "02");
        assert_eq!(part.class, "03");
        assert_eq!(part.style, "04");
        assert_eq!(part.sequence, 5);
        assert!(part.mpn.is_empty());
        assert_eq!(part.quantity, 0);
        assert!(part.overflow.is_empty());
        assert_eq!(part.family_key(), "0102");
        assert_eq!(part.group_key(), "01020304");
    }

    #[test]
    fn test_direct_field_keys_round_trip() {
        for field in DirectField::all() {
            assert_eq!(DirectField::from_key(field.key()), Some(*field));
        }
        // keys are case-sensitive
        assert_eq!(DirectField::from_key("mpn"), None);
        assert_eq!(DirectField::from_key("Resistance"), None);
    }

    #[test]
    fn test_apply_and_get() {
        let code = sample_code();
        let mut part = PartRecord::new(code.encode("DMT"), &code, Utc::now());

        DirectField::Mpn.apply(&mut part, " R-0805-10K ").unwrap();
        assert_eq!(part.mpn, "R-0805-10K");

        DirectField::Quantity.apply(&mut part, "250").unwrap();
        assert_eq!(part.quantity, 250);
        assert_eq!(DirectField::Quantity.get(&part), "250");
    }

    #[test]
    fn test_bad_quantity_is_an_error() {
        let code = sample_code();
        let mut part = PartRecord::new(code.encode("DMT"), &code, Utc::now());
        let err = DirectField::Quantity.apply(&mut part, "lots").unwrap_err();
        assert!(err.to_string().contains("Quantity"));
    }
}
