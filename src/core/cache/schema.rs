//! Database schema initialization

use miette::{IntoDiagnostic, Result};
use rusqlite::params;

use super::{ResultCache, SCHEMA_VERSION};
use crate::lca::Module;

impl ResultCache {
    /// Initialize database schema
    pub(super) fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Life cycle modules and phases in reporting order
            CREATE TABLE IF NOT EXISTS life_cycles (
                ident TEXT PRIMARY KEY,
                phase TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('module', 'phase')),
                p_order INTEGER NOT NULL
            );

            -- Indicator catalog of the workspace
            CREATE TABLE IF NOT EXISTS indicators (
                ident TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                unit TEXT NOT NULL,
                p_order INTEGER NOT NULL
            );

            -- Usage flags used when deriving totals
            CREATE TABLE IF NOT EXISTS project_life_cycle_usages (
                project_id TEXT NOT NULL,
                life_cycle_ident TEXT NOT NULL,
                use_in_construction INTEGER NOT NULL,
                use_in_maintenance INTEGER NOT NULL,
                use_in_energy_demand INTEGER NOT NULL,
                PRIMARY KEY (project_id, life_cycle_ident)
            );

            -- Result tree
            CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER REFERENCES items(id) ON DELETE CASCADE,
                project_id TEXT NOT NULL,
                type TEXT NOT NULL,
                is_outdated INTEGER NOT NULL DEFAULT 1,
                is_virtual INTEGER NOT NULL DEFAULT 0,
                created TEXT NOT NULL,
                modified TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_items_parent ON items(parent_id);
            CREATE INDEX IF NOT EXISTS idx_items_project ON items(project_id, is_outdated);

            CREATE TABLE IF NOT EXISTS project_variants (
                item_id INTEGER PRIMARY KEY REFERENCES items(id) ON DELETE CASCADE,
                project_variant_id TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS element_types (
                item_id INTEGER PRIMARY KEY REFERENCES items(id) ON DELETE CASCADE,
                project_variant_id TEXT NOT NULL,
                element_type_node TEXT NOT NULL,
                mass REAL,
                UNIQUE (project_variant_id, element_type_node)
            );

            CREATE TABLE IF NOT EXISTS elements (
                item_id INTEGER PRIMARY KEY REFERENCES items(id) ON DELETE CASCADE,
                project_variant_id TEXT NOT NULL,
                element_id TEXT NOT NULL,
                composite_item_id INTEGER REFERENCES items(id) ON DELETE SET NULL,
                mass REAL,
                quantity REAL,
                ref_unit TEXT,
                UNIQUE (project_variant_id, element_id)
            );
            CREATE INDEX IF NOT EXISTS idx_elements_composite ON elements(composite_item_id);

            CREATE TABLE IF NOT EXISTS element_components (
                item_id INTEGER PRIMARY KEY REFERENCES items(id) ON DELETE CASCADE,
                project_variant_id TEXT NOT NULL,
                element_component_id TEXT NOT NULL,
                mass REAL,
                quantity REAL,
                ref_unit TEXT,
                num_replacements INTEGER NOT NULL DEFAULT 0,
                UNIQUE (project_variant_id, element_component_id)
            );

            CREATE TABLE IF NOT EXISTS final_energy_demands (
                item_id INTEGER PRIMARY KEY REFERENCES items(id) ON DELETE CASCADE,
                project_variant_id TEXT NOT NULL,
                demand_id TEXT NOT NULL,
                quantity REAL,
                ref_unit TEXT,
                UNIQUE (project_variant_id, demand_id)
            );

            CREATE TABLE IF NOT EXISTS final_energy_supplies (
                item_id INTEGER PRIMARY KEY REFERENCES items(id) ON DELETE CASCADE,
                project_variant_id TEXT NOT NULL,
                supply_id TEXT NOT NULL,
                quantity REAL,
                ref_unit TEXT,
                UNIQUE (project_variant_id, supply_id)
            );

            CREATE TABLE IF NOT EXISTS final_energy_ref_models (
                item_id INTEGER PRIMARY KEY REFERENCES items(id) ON DELETE CASCADE,
                project_variant_id TEXT NOT NULL,
                ref_model_id TEXT NOT NULL,
                quantity REAL,
                ref_unit TEXT,
                UNIQUE (project_variant_id, ref_model_id)
            );

            CREATE TABLE IF NOT EXISTS transport_means (
                item_id INTEGER PRIMARY KEY REFERENCES items(id) ON DELETE CASCADE,
                project_variant_id TEXT NOT NULL,
                transport_mean_id TEXT NOT NULL,
                quantity REAL,
                ref_unit TEXT,
                UNIQUE (project_variant_id, transport_mean_id)
            );

            -- Raw results per item, module, indicator and process
            CREATE TABLE IF NOT EXISTS indicator_values (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
                life_cycle_ident TEXT NOT NULL,
                indicator_ident TEXT NOT NULL,
                process_id TEXT,
                value REAL,
                ratio REAL NOT NULL DEFAULT 1,
                is_partial INTEGER NOT NULL DEFAULT 0
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_indicator_values_key
                ON indicator_values(item_id, life_cycle_ident, indicator_ident, IFNULL(process_id, ''));

            -- Derived aggregates per item
            CREATE TABLE IF NOT EXISTS item_totals (
                item_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
                life_cycle_ident TEXT NOT NULL,
                indicator_ident TEXT NOT NULL,
                value REAL NOT NULL,
                PRIMARY KEY (item_id, life_cycle_ident, indicator_ident)
            );

            -- Model state each variant was computed from
            CREATE TABLE IF NOT EXISTS variant_sources (
                project_variant_id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                source_hash TEXT NOT NULL,
                computed_at TEXT NOT NULL
            );
            "#,
            )
            .into_diagnostic()?;

        self.conn
            .execute("DELETE FROM schema_version", [])
            .into_diagnostic()?;
        self.conn
            .execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .into_diagnostic()?;

        self.seed_life_cycles()
    }

    fn seed_life_cycles(&self) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare(
                "INSERT OR REPLACE INTO life_cycles (ident, phase, kind, p_order)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .into_diagnostic()?;

        for (order, module) in Module::ALL.iter().enumerate() {
            let kind = if module.is_legacy() { "phase" } else { "module" };
            stmt.execute(params![module.as_str(), module.stage().as_str(), kind, order as i64])
                .into_diagnostic()?;
        }

        Ok(())
    }

    /// Drop all tables and reinitialize the schema
    pub(super) fn reinitialize_schema(&self) -> Result<()> {
        // Children before parents; foreign keys stay enforced
        self.conn
            .execute_batch(
                r#"
                DROP TABLE IF EXISTS item_totals;
                DROP TABLE IF EXISTS indicator_values;
                DROP TABLE IF EXISTS transport_means;
                DROP TABLE IF EXISTS final_energy_ref_models;
                DROP TABLE IF EXISTS final_energy_supplies;
                DROP TABLE IF EXISTS final_energy_demands;
                DROP TABLE IF EXISTS element_components;
                DROP TABLE IF EXISTS elements;
                DROP TABLE IF EXISTS element_types;
                DROP TABLE IF EXISTS project_variants;
                DROP TABLE IF EXISTS items;
                DROP TABLE IF EXISTS variant_sources;
                DROP TABLE IF EXISTS project_life_cycle_usages;
                DROP TABLE IF EXISTS indicators;
                DROP TABLE IF EXISTS life_cycles;
                DROP TABLE IF EXISTS schema_version;
                "#,
            )
            .into_diagnostic()?;

        self.init_schema()
    }
}
