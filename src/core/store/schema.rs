//! Database schema initialization

use rusqlite::params;

use super::{PartStore, StoreError, SCHEMA_VERSION};

impl PartStore {
    /// Create all tables in a fresh database and record the schema
    /// version
    pub(super) fn init_schema(&self) -> Result<(), StoreError> {
        self.conn().execute_batch(
            r#"
            CREATE TABLE schema_version (
                version INTEGER PRIMARY KEY
            );

            -- One row per cataloged part. The full identifier string is
            -- the primary key; segments are duplicated as columns so
            -- group and family queries stay indexed.
            CREATE TABLE parts (
                id TEXT PRIMARY KEY,
                domain TEXT NOT NULL,
                family TEXT NOT NULL,
                class TEXT NOT NULL,
                style TEXT NOT NULL,
                sequence INTEGER NOT NULL,
                mpn TEXT NOT NULL DEFAULT '',
                manufacturer TEXT NOT NULL DEFAULT '',
                value TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                quantity INTEGER NOT NULL DEFAULT 0,
                location TEXT NOT NULL DEFAULT '',
                datasheet TEXT NOT NULL DEFAULT '',
                distributor TEXT NOT NULL DEFAULT '',
                distributor_pn TEXT NOT NULL DEFAULT '',
                symbol TEXT NOT NULL DEFAULT '',
                footprint TEXT NOT NULL DEFAULT '',
                model TEXT NOT NULL DEFAULT '',
                notes TEXT NOT NULL DEFAULT '',
                overflow TEXT NOT NULL DEFAULT '{}',
                created TEXT NOT NULL,
                updated TEXT NOT NULL
            );
            CREATE INDEX idx_parts_group ON parts(domain, family, class, style);
            CREATE INDEX idx_parts_family ON parts(domain, family);
            CREATE INDEX idx_parts_mpn ON parts(mpn);
            CREATE INDEX idx_parts_manufacturer ON parts(manufacturer);
            CREATE INDEX idx_parts_location ON parts(location);

            -- Template-governed attributes, one row per (part, name).
            -- Cascade keeps ownership exclusive to the parent part.
            CREATE TABLE part_attributes (
                part_id TEXT NOT NULL,
                name TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (part_id, name),
                FOREIGN KEY (part_id) REFERENCES parts(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_part_attributes_name ON part_attributes(name);
            "#,
        )?;

        self.conn().execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }
}
