//! Part and attribute queries

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{PartStore, StoreError};
use crate::core::classid::ClassSegments;
use crate::entities::part::{AttributeRow, PartRecord};

/// Filters for `list_parts`; all optional and combined with AND
#[derive(Debug, Default, Clone)]
pub struct PartFilter {
    pub domain: Option<String>,
    pub family: Option<String>,
    pub location: Option<String>,
    pub manufacturer: Option<String>,
    pub limit: Option<usize>,
}

const PART_COLUMNS: &str = "id, domain, family, class, style, sequence, \
     mpn, manufacturer, value, description, quantity, location, datasheet, \
     distributor, distributor_pn, symbol, footprint, model, notes, overflow, \
     created, updated";

impl PartStore {
    pub fn insert_part(&self, part: &PartRecord) -> Result<(), StoreError> {
        let overflow = serde_json::to_string(&part.overflow).map_err(|source| StoreError::Blob {
            id: part.id.clone(),
            source,
        })?;

        self.conn().execute(
            "INSERT INTO parts (id, domain, family, class, style, sequence, \
             mpn, manufacturer, value, description, quantity, location, datasheet, \
             distributor, distributor_pn, symbol, footprint, model, notes, overflow, \
             created, updated) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, \
             ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
            params![
                part.id,
                part.domain,
                part.family,
                part.class,
                part.style,
                part.sequence,
                part.mpn,
                part.manufacturer,
                part.value,
                part.description,
                part.quantity,
                part.location,
                part.datasheet,
                part.distributor,
                part.distributor_pn,
                part.symbol,
                part.footprint,
                part.model,
                part.notes,
                overflow,
                part.created.to_rfc3339(),
                part.updated.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Rewrite every mutable column of an existing part. Identifier and
    /// classification columns are immutable once persisted and are not
    /// part of the update.
    pub fn update_part(&self, part: &PartRecord) -> Result<(), StoreError> {
        let overflow = serde_json::to_string(&part.overflow).map_err(|source| StoreError::Blob {
            id: part.id.clone(),
            source,
        })?;

        self.conn().execute(
            "UPDATE parts SET mpn = ?2, manufacturer = ?3, value = ?4, description = ?5, \
             quantity = ?6, location = ?7, datasheet = ?8, distributor = ?9, \
             distributor_pn = ?10, symbol = ?11, footprint = ?12, model = ?13, \
             notes = ?14, overflow = ?15, updated = ?16 \
             WHERE id = ?1",
            params![
                part.id,
                part.mpn,
                part.manufacturer,
                part.value,
                part.description,
                part.quantity,
                part.location,
                part.datasheet,
                part.distributor,
                part.distributor_pn,
                part.symbol,
                part.footprint,
                part.model,
                part.notes,
                overflow,
                part.updated.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_part(&self, id: &str) -> Result<Option<PartRecord>, StoreError> {
        let part = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM parts WHERE id = ?1", PART_COLUMNS),
                params![id],
                row_to_part,
            )
            .optional()?;
        Ok(part)
    }

    pub fn part_exists(&self, id: &str) -> Result<bool, StoreError> {
        let found: Option<i64> = self
            .conn()
            .query_row("SELECT 1 FROM parts WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    /// Delete a part; attribute rows cascade. Returns whether a row
    /// existed. The identifier is never reissued.
    pub fn delete_part(&self, id: &str) -> Result<bool, StoreError> {
        let affected = self
            .conn()
            .execute("DELETE FROM parts WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// Highest committed sequence in a classification group, zero when
    /// the group is empty
    pub fn max_sequence(&self, segments: &ClassSegments) -> Result<u16, StoreError> {
        let max: Option<u16> = self.conn().query_row(
            "SELECT MAX(sequence) FROM parts \
             WHERE domain = ?1 AND family = ?2 AND class = ?3 AND style = ?4",
            params![
                segments.domain_code(),
                segments.family_code(),
                segments.class_code(),
                segments.style_code()
            ],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0))
    }

    pub fn upsert_attribute(&self, part_id: &str, name: &str, value: &str) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT INTO part_attributes (part_id, name, value) VALUES (?1, ?2, ?3) \
             ON CONFLICT(part_id, name) DO UPDATE SET value = excluded.value",
            params![part_id, name, value],
        )?;
        Ok(())
    }

    pub fn delete_attribute(&self, part_id: &str, name: &str) -> Result<(), StoreError> {
        self.conn().execute(
            "DELETE FROM part_attributes WHERE part_id = ?1 AND name = ?2",
            params![part_id, name],
        )?;
        Ok(())
    }

    pub fn attributes_for(&self, part_id: &str) -> Result<Vec<AttributeRow>, StoreError> {
        let mut stmt = self.conn().prepare(
            "SELECT part_id, name, value FROM part_attributes WHERE part_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![part_id], |row| {
            Ok(AttributeRow {
                part_id: row.get(0)?,
                name: row.get(1)?,
                value: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn list_parts(&self, filter: &PartFilter) -> Result<Vec<PartRecord>, StoreError> {
        let mut sql = format!("SELECT {} FROM parts", PART_COLUMNS);
        let mut conditions = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(domain) = &filter.domain {
            args.push(domain.clone());
            conditions.push(format!("domain = ?{}", args.len()));
        }
        if let Some(family) = &filter.family {
            args.push(family.clone());
            conditions.push(format!("family = ?{}", args.len()));
        }
        if let Some(location) = &filter.location {
            args.push(location.clone());
            conditions.push(format!("location = ?{}", args.len()));
        }
        if let Some(manufacturer) = &filter.manufacturer {
            args.push(manufacturer.clone());
            conditions.push(format!("manufacturer = ?{}", args.len()));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY id");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), row_to_part)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Substring search across identifier, MPN, manufacturer, value,
    /// description, and notes
    pub fn search_parts(&self, query: &str, limit: usize) -> Result<Vec<PartRecord>, StoreError> {
        let pattern = format!("%{}%", query);
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {} FROM parts \
             WHERE id LIKE ?1 OR mpn LIKE ?1 OR manufacturer LIKE ?1 \
                OR value LIKE ?1 OR description LIKE ?1 OR notes LIKE ?1 \
             ORDER BY id LIMIT ?2",
            PART_COLUMNS
        ))?;
        let rows = stmt.query_map(params![pattern, limit as i64], row_to_part)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count_parts(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM parts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Part counts grouped by domain code
    pub fn count_by_domain(&self) -> Result<Vec<(String, usize)>, StoreError> {
        let mut stmt = self
            .conn()
            .prepare("SELECT domain, COUNT(*) FROM parts GROUP BY domain ORDER BY domain")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn row_to_part(row: &Row<'_>) -> rusqlite::Result<PartRecord> {
    let overflow_text: String = row.get(19)?;
    let overflow: BTreeMap<String, String> =
        serde_json::from_str(&overflow_text).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                19,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;

    Ok(PartRecord {
        id: row.get(0)?,
        domain: row.get(1)?,
        family: row.get(2)?,
        class: row.get(3)?,
        style: row.get(4)?,
        sequence: row.get(5)?,
        mpn: row.get(6)?,
        manufacturer: row.get(7)?,
        value: row.get(8)?,
        description: row.get(9)?,
        quantity: row.get(10)?,
        location: row.get(11)?,
        datasheet: row.get(12)?,
        distributor: row.get(13)?,
        distributor_pn: row.get(14)?,
        symbol: row.get(15)?,
        footprint: row.get(16)?,
        model: row.get(17)?,
        notes: row.get(18)?,
        overflow,
        created: parse_datetime(row.get::<_, String>(20)?),
        updated: parse_datetime(row.get::<_, String>(21)?),
    })
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classid::ClassCode;

    fn part(id_body: &str) -> PartRecord {
        let id = format!("DMT-{}", id_body);
        let code = ClassCode::decode("DMT", &id).unwrap();
        PartRecord::new(id, &code, Utc::now())
    }

    #[test]
    fn test_insert_get_roundtrip() {
        let store = PartStore::open_in_memory().unwrap();
        let mut p = part("01010100001");
        p.mpn = "R001".to_string();
        p.quantity = 42;
        p.overflow.insert("Shelf".to_string(), "B3".to_string());
        store.insert_part(&p).unwrap();

        let loaded = store.get_part(&p.id).unwrap().unwrap();
        assert_eq!(loaded.mpn, "R001");
        assert_eq!(loaded.quantity, 42);
        assert_eq!(loaded.overflow.get("Shelf").map(String::as_str), Some("B3"));
        assert!(store.get_part("DMT-99999999999").unwrap().is_none());
    }

    #[test]
    fn test_max_sequence_empty_group_is_zero() {
        let store = PartStore::open_in_memory().unwrap();
        let segments = ClassSegments::parse("01", "01", "01", "00").unwrap();
        assert_eq!(store.max_sequence(&segments).unwrap(), 0);

        store.insert_part(&part("01010100003")).unwrap();
        store.insert_part(&part("01010100001")).unwrap();
        assert_eq!(store.max_sequence(&segments).unwrap(), 3);

        // other groups are unaffected
        let other = ClassSegments::parse("01", "02", "01", "00").unwrap();
        assert_eq!(store.max_sequence(&other).unwrap(), 0);
    }

    #[test]
    fn test_attribute_upsert_and_cascade_delete() {
        let store = PartStore::open_in_memory().unwrap();
        let p = part("01010100001");
        store.insert_part(&p).unwrap();

        store.upsert_attribute(&p.id, "Resistance", "10K").unwrap();
        store.upsert_attribute(&p.id, "Resistance", "22K").unwrap();
        store.upsert_attribute(&p.id, "Power", "0.25W").unwrap();

        let attrs = store.attributes_for(&p.id).unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[1].name, "Resistance");
        assert_eq!(attrs[1].value, "22K");

        assert!(store.delete_part(&p.id).unwrap());
        assert!(store.attributes_for(&p.id).unwrap().is_empty());
        assert!(!store.delete_part(&p.id).unwrap());
    }

    #[test]
    fn test_list_filters_and_search() {
        let store = PartStore::open_in_memory().unwrap();
        let mut a = part("01010100001");
        a.manufacturer = "Yageo".to_string();
        a.location = "BIN-07".to_string();
        let mut b = part("01020100001");
        b.description = "ceramic capacitor".to_string();
        store.insert_part(&a).unwrap();
        store.insert_part(&b).unwrap();

        let filter = PartFilter {
            family: Some("01".to_string()),
            ..Default::default()
        };
        let listed = store.list_parts(&filter).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, a.id);

        let found = store.search_parts("ceramic", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, b.id);

        assert_eq!(store.count_parts().unwrap(), 2);
        assert_eq!(
            store.count_by_domain().unwrap(),
            vec![("01".to_string(), 2)]
        );
    }

    #[test]
    fn test_version_mismatch_refuses_to_open() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("parts.db");
        {
            let store = PartStore::open(&path).unwrap();
            store
                .conn()
                .execute("UPDATE schema_version SET version = 99", [])
                .unwrap();
        }
        let err = PartStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Version { found: 99, .. }));
    }

    #[test]
    fn test_transaction_rollback_discards_rows() {
        let store = PartStore::open_in_memory().unwrap();
        store.begin().unwrap();
        store.insert_part(&part("01010100001")).unwrap();
        store.rollback().unwrap();
        assert_eq!(store.count_parts().unwrap(), 0);
    }
}
