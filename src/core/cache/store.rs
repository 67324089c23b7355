//! Writing results into the item tree
//!
//! Every write leaves the touched item (or the parent that lost a child)
//! outdated. Nothing here recomputes totals; see `aggregate`.

use miette::{IntoDiagnostic, Result};
use rusqlite::{params, OptionalExtension};

use super::{now, CacheScope, ItemType, ResultCache};
use crate::lca::{Indicator, IndicatorResults, LifeCycleUsage, LifeCycleUsages, Module, Quantity};
use crate::model::{Element, ElementTypeCode};

impl ResultCache {
    fn insert_item(
        &self,
        project_id: &str,
        parent_id: Option<i64>,
        item_type: ItemType,
        is_virtual: bool,
    ) -> Result<i64> {
        let ts = now();
        self.conn
            .execute(
                "INSERT INTO items (parent_id, project_id, type, is_outdated, is_virtual, created, modified)
                 VALUES (?1, ?2, ?3, 1, ?4, ?5, ?5)",
                params![parent_id, project_id, item_type.as_str(), is_virtual, ts],
            )
            .into_diagnostic()?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Delete an item and its subtree; its parent becomes outdated
    fn delete_item(&self, item_id: i64) -> Result<()> {
        let parent: Option<i64> = self
            .conn
            .query_row("SELECT parent_id FROM items WHERE id = ?1", [item_id], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .optional()
            .into_diagnostic()?
            .flatten();

        self.conn
            .execute("DELETE FROM items WHERE id = ?1", [item_id])
            .into_diagnostic()?;

        if let Some(parent) = parent {
            self.mark_outdated(parent)?;
        }
        Ok(())
    }

    /// Root item of a variant, if cached
    pub fn variant_item(&self, variant_id: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT item_id FROM project_variants WHERE project_variant_id = ?1",
                [variant_id],
                |row| row.get(0),
            )
            .optional()
            .into_diagnostic()
    }

    /// Root item of the scope's variant, created on demand
    ///
    /// A variant that moved to another project is dropped and recreated.
    pub fn ensure_variant_item(&self, scope: &CacheScope) -> Result<i64> {
        let existing: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT i.id, i.project_id FROM project_variants v
                 JOIN items i ON i.id = v.item_id
                 WHERE v.project_variant_id = ?1",
                [&scope.variant_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .into_diagnostic()?;

        match existing {
            Some((item_id, project_id)) if project_id == scope.project_id => return Ok(item_id),
            Some((item_id, project_id)) => {
                tracing::info!(
                    variant = %scope.variant_id,
                    from = %project_id,
                    to = %scope.project_id,
                    "variant changed project; dropping cached results"
                );
                self.delete_item(item_id)?;
            }
            None => {}
        }

        let item_id = self.insert_item(&scope.project_id, None, ItemType::ProjectVariant, false)?;
        self.conn
            .execute(
                "INSERT INTO project_variants (item_id, project_variant_id) VALUES (?1, ?2)",
                params![item_id, scope.variant_id],
            )
            .into_diagnostic()?;
        Ok(item_id)
    }

    /// Element type item of a DIN 276 code, created with its ancestors
    pub fn ensure_element_type_item(&self, scope: &CacheScope, code: &ElementTypeCode) -> Result<i64> {
        if let Some(item_id) = self.element_type_item(&scope.variant_id, code.as_str())? {
            return Ok(item_id);
        }

        let parent_id = match code.parent() {
            Some(parent) => self.ensure_element_type_item(scope, &parent)?,
            None => self.ensure_variant_item(scope)?,
        };

        let item_id = self.insert_item(&scope.project_id, Some(parent_id), ItemType::ElementType, false)?;
        self.conn
            .execute(
                "INSERT INTO element_types (item_id, project_variant_id, element_type_node, mass)
                 VALUES (?1, ?2, ?3, 0)",
                params![item_id, scope.variant_id, code.as_str()],
            )
            .into_diagnostic()?;
        Ok(item_id)
    }

    pub fn element_type_item(&self, variant_id: &str, code: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT item_id FROM element_types
                 WHERE project_variant_id = ?1 AND element_type_node = ?2",
                params![variant_id, code],
                |row| row.get(0),
            )
            .optional()
            .into_diagnostic()
    }

    pub fn element_item(&self, variant_id: &str, element_id: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT item_id FROM elements WHERE project_variant_id = ?1 AND element_id = ?2",
                params![variant_id, element_id],
                |row| row.get(0),
            )
            .optional()
            .into_diagnostic()
    }

    /// Store an element below its element type
    ///
    /// Composite elements and elements on a composite element type level are
    /// virtual. `composite_item_id` links a sub-element to its composite.
    pub fn store_element(
        &self,
        scope: &CacheScope,
        element: &Element,
        composite_item_id: Option<i64>,
    ) -> Result<i64> {
        self.atomically("store_element", |cache| {
            let type_item = cache.ensure_element_type_item(scope, &element.element_type)?;
            let is_virtual = element.is_composite() || element.element_type.is_composite_level();

            let existing: Option<(i64, Option<i64>, Option<i64>)> = cache
                .conn
                .query_row(
                    "SELECT e.item_id, i.parent_id, e.composite_item_id FROM elements e
                     JOIN items i ON i.id = e.item_id
                     WHERE e.project_variant_id = ?1 AND e.element_id = ?2",
                    params![scope.variant_id, element.id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
                .into_diagnostic()?;

            let Some((item_id, old_parent, old_composite)) = existing else {
                let item_id =
                    cache.insert_item(&scope.project_id, Some(type_item), ItemType::Element, is_virtual)?;
                cache
                    .conn
                    .execute(
                        "INSERT INTO elements
                         (item_id, project_variant_id, element_id, composite_item_id, mass, quantity, ref_unit)
                         VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)",
                        params![
                            item_id,
                            scope.variant_id,
                            element.id,
                            composite_item_id,
                            element.quantity,
                            element.ref_unit.as_str()
                        ],
                    )
                    .into_diagnostic()?;
                return Ok(item_id);
            };

            // The old parent or composite loses this element
            if let Some(old_parent) = old_parent.filter(|p| *p != type_item) {
                cache.mark_outdated(old_parent)?;
            }
            if let Some(old_composite) = old_composite.filter(|c| Some(*c) != composite_item_id) {
                cache.mark_outdated(old_composite)?;
            }

            cache
                .conn
                .execute(
                    "UPDATE items SET parent_id = ?2, is_virtual = ?3, is_outdated = 1, modified = ?4
                     WHERE id = ?1",
                    params![item_id, type_item, is_virtual, now()],
                )
                .into_diagnostic()?;
            cache
                .conn
                .execute(
                    "UPDATE elements SET composite_item_id = ?2, quantity = ?3, ref_unit = ?4
                     WHERE item_id = ?1",
                    params![item_id, composite_item_id, element.quantity, element.ref_unit.as_str()],
                )
                .into_diagnostic()?;

            Ok(item_id)
        })
    }

    /// Drop a cached element with its components; returns whether it existed
    pub fn remove_element(&self, scope: &CacheScope, element_id: &str) -> Result<bool> {
        let Some(item_id) = self.element_item(&scope.variant_id, element_id)? else {
            return Ok(false);
        };

        self.atomically("remove_element", |cache| {
            let composite: Option<i64> = cache
                .conn
                .query_row(
                    "SELECT composite_item_id FROM elements WHERE item_id = ?1",
                    [item_id],
                    |row| row.get(0),
                )
                .into_diagnostic()?;
            if let Some(composite) = composite {
                cache.mark_outdated(composite)?;
            }

            cache.delete_item(item_id)?;
            Ok(true)
        })
    }

    /// Drop every cached element of the variant not listed in `keep`
    ///
    /// Returns the element type codes whose items lost elements.
    pub fn remove_elements_except(&self, scope: &CacheScope, keep: &[&str]) -> Result<Vec<String>> {
        let cached: Vec<(String, String)> = {
            let mut stmt = self
                .conn
                .prepare(
                    "SELECT e.element_id, t.element_type_node FROM elements e
                     JOIN items i ON i.id = e.item_id
                     JOIN element_types t ON t.item_id = i.parent_id
                     WHERE e.project_variant_id = ?1",
                )
                .into_diagnostic()?;
            let rows = stmt
                .query_map([&scope.variant_id], |row| Ok((row.get(0)?, row.get(1)?)))
                .into_diagnostic()?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .into_diagnostic()?
        };

        let mut touched = Vec::new();
        for (element_id, code) in cached {
            if keep.contains(&element_id.as_str()) {
                continue;
            }
            tracing::debug!(element = %element_id, "removing element no longer in model");
            self.remove_element(scope, &element_id)?;
            if !touched.contains(&code) {
                touched.push(code);
            }
        }

        Ok(touched)
    }

    /// Store a component below its element, replacing an earlier one
    pub fn store_element_component(
        &self,
        scope: &CacheScope,
        element_item_id: i64,
        component_id: &str,
        quantity: &Quantity,
        mass: f64,
        num_replacements: u32,
    ) -> Result<i64> {
        self.atomically("store_component", |cache| {
            cache.remove_element_component(scope, component_id)?;

            let item_id = cache.insert_item(
                &scope.project_id,
                Some(element_item_id),
                ItemType::ElementComponent,
                false,
            )?;
            cache
                .conn
                .execute(
                    "INSERT INTO element_components
                     (item_id, project_variant_id, element_component_id, mass, quantity, ref_unit, num_replacements)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        item_id,
                        scope.variant_id,
                        component_id,
                        mass,
                        quantity.value(),
                        quantity.unit().as_str(),
                        num_replacements
                    ],
                )
                .into_diagnostic()?;
            cache.mark_outdated(element_item_id)?;

            tracing::debug!(component = component_id, item_id, mass, num_replacements, "stored component");
            Ok(item_id)
        })
    }

    /// Drop a cached component; its element becomes outdated
    pub fn remove_element_component(&self, scope: &CacheScope, component_id: &str) -> Result<bool> {
        let item_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT item_id FROM element_components
                 WHERE project_variant_id = ?1 AND element_component_id = ?2",
                params![scope.variant_id, component_id],
                |row| row.get(0),
            )
            .optional()
            .into_diagnostic()?;

        match item_id {
            Some(item_id) => {
                self.delete_item(item_id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop components of an element that are not listed in `keep`
    pub fn remove_element_components_except(&self, element_item_id: i64, keep: &[&str]) -> Result<usize> {
        let cached: Vec<(i64, String)> = {
            let mut stmt = self
                .conn
                .prepare(
                    "SELECT c.item_id, c.element_component_id FROM element_components c
                     JOIN items i ON i.id = c.item_id
                     WHERE i.parent_id = ?1",
                )
                .into_diagnostic()?;
            let rows = stmt
                .query_map([element_item_id], |row| Ok((row.get(0)?, row.get(1)?)))
                .into_diagnostic()?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .into_diagnostic()?
        };

        let mut removed = 0;
        for (item_id, component_id) in cached {
            if !keep.contains(&component_id.as_str()) {
                self.delete_item(item_id)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Insert a quantity-bearing leaf item directly below the variant
    fn store_variant_leaf(
        &self,
        scope: &CacheScope,
        item_type: ItemType,
        leaf_id: &str,
        quantity: &Quantity,
        is_virtual: bool,
    ) -> Result<i64> {
        let Some((table, id_column)) = item_type.leaf_table() else {
            return Err(miette::miette!("{} is not a variant leaf", item_type));
        };

        self.atomically("store_leaf", |cache| {
            let root = cache.ensure_variant_item(scope)?;

            let existing: Option<i64> = cache
                .conn
                .query_row(
                    &format!(
                        "SELECT item_id FROM {} WHERE project_variant_id = ?1 AND {} = ?2",
                        table, id_column
                    ),
                    params![scope.variant_id, leaf_id],
                    |row| row.get(0),
                )
                .optional()
                .into_diagnostic()?;
            if let Some(item_id) = existing {
                cache.delete_item(item_id)?;
            }

            let item_id = cache.insert_item(&scope.project_id, Some(root), item_type, is_virtual)?;
            cache
                .conn
                .execute(
                    &format!(
                        "INSERT INTO {} (item_id, project_variant_id, {}, quantity, ref_unit)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        table, id_column
                    ),
                    params![
                        item_id,
                        scope.variant_id,
                        leaf_id,
                        quantity.value(),
                        quantity.unit().as_str()
                    ],
                )
                .into_diagnostic()?;
            cache.mark_outdated(root)?;
            Ok(item_id)
        })
    }

    /// Drop all leaf items of one type from a variant
    fn remove_variant_leaves(&self, variant_id: &str, item_type: ItemType) -> Result<usize> {
        let Some((table, _)) = item_type.leaf_table() else {
            return Ok(0);
        };

        self.atomically("remove_leaves", |cache| {
            let removed = cache
                .conn
                .execute(
                    &format!(
                        "DELETE FROM items WHERE id IN
                         (SELECT item_id FROM {} WHERE project_variant_id = ?1)",
                        table
                    ),
                    [variant_id],
                )
                .into_diagnostic()?;
            if removed > 0 {
                cache.mark_variant_outdated(variant_id)?;
            }
            Ok(removed)
        })
    }

    /// Store a final energy demand; `quantity` holds qE per m2 and year
    pub fn store_final_energy_demand(&self, scope: &CacheScope, demand_id: &str, quantity: &Quantity) -> Result<i64> {
        self.store_variant_leaf(scope, ItemType::FinalEnergyDemand, demand_id, quantity, false)
    }

    pub fn remove_final_energy_demands(&self, variant_id: &str) -> Result<usize> {
        self.remove_variant_leaves(variant_id, ItemType::FinalEnergyDemand)
    }

    pub fn store_final_energy_supply(&self, scope: &CacheScope, supply_id: &str, quantity: &Quantity) -> Result<i64> {
        self.store_variant_leaf(scope, ItemType::FinalEnergySupply, supply_id, quantity, false)
    }

    pub fn remove_final_energy_supplies(&self, variant_id: &str) -> Result<usize> {
        self.remove_variant_leaves(variant_id, ItemType::FinalEnergySupply)
    }

    /// Reference model demands are kept for comparison only, never summed
    pub fn store_final_energy_ref_model(
        &self,
        scope: &CacheScope,
        ref_model_id: &str,
        quantity: &Quantity,
    ) -> Result<i64> {
        self.store_variant_leaf(scope, ItemType::FinalEnergyRefModel, ref_model_id, quantity, true)
    }

    pub fn remove_final_energy_ref_models(&self, variant_id: &str) -> Result<usize> {
        self.remove_variant_leaves(variant_id, ItemType::FinalEnergyRefModel)
    }

    /// Transports excluded from the LCA are stored as virtual items
    pub fn store_transport_mean(
        &self,
        scope: &CacheScope,
        mean_id: &str,
        quantity: &Quantity,
        include_in_lca: bool,
    ) -> Result<i64> {
        self.store_variant_leaf(scope, ItemType::TransportMean, mean_id, quantity, !include_in_lca)
    }

    pub fn remove_transport_means(&self, variant_id: &str) -> Result<usize> {
        self.remove_variant_leaves(variant_id, ItemType::TransportMean)
    }

    /// Store one result set on a leaf item
    ///
    /// Rows are keyed by module, indicator and process. `zero_values` stores
    /// 0 in place of every value; `is_partial` keeps the rows out of phase
    /// and total sums.
    pub fn store_indicators(
        &self,
        item_id: i64,
        results: &IndicatorResults,
        zero_values: bool,
        is_partial: bool,
    ) -> Result<()> {
        self.atomically("store_indicators", |cache| {
            let module = results.module().as_str();
            let process_id = results.process_id();
            let ratio = results.module_ratio();

            let mut update = cache
                .conn
                .prepare_cached(
                    "UPDATE indicator_values SET value = ?5, ratio = ?6, is_partial = ?7
                     WHERE item_id = ?1 AND life_cycle_ident = ?2 AND indicator_ident = ?3
                       AND process_id IS ?4",
                )
                .into_diagnostic()?;
            let mut insert = cache
                .conn
                .prepare_cached(
                    "INSERT INTO indicator_values
                     (item_id, life_cycle_ident, indicator_ident, process_id, value, ratio, is_partial)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .into_diagnostic()?;

            for result in results {
                let value = if zero_values { Some(0.0) } else { result.value() };
                let args = params![
                    item_id,
                    module,
                    result.indicator(),
                    process_id,
                    value,
                    ratio,
                    is_partial
                ];
                if update.execute(args).into_diagnostic()? == 0 {
                    insert.execute(args).into_diagnostic()?;
                }
            }

            cache.mark_outdated(item_id)
        })
    }

    /// Usage flags of a project as stored, if any
    pub fn load_usages(&self, project_id: &str) -> Result<Option<LifeCycleUsages>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT life_cycle_ident, use_in_construction, use_in_maintenance, use_in_energy_demand
                 FROM project_life_cycle_usages WHERE project_id = ?1",
            )
            .into_diagnostic()?;
        let rows = stmt
            .query_map([project_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, bool>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            })
            .into_diagnostic()?;

        let mut usages = Vec::new();
        for row in rows {
            let (ident, construction, maintenance, energy_demand) = row.into_diagnostic()?;
            match ident.parse::<Module>() {
                Ok(module) => usages.push(LifeCycleUsage::new(module, construction, maintenance, energy_demand)),
                Err(e) => tracing::warn!(project = project_id, "skipping stored usage: {}", e),
            }
        }

        Ok(if usages.is_empty() {
            None
        } else {
            Some(LifeCycleUsages::new(usages))
        })
    }

    /// Store the usage flags of a project
    ///
    /// Totals depend on these flags, so a change outdates every item of the
    /// project.
    pub fn store_project_settings(&self, project_id: &str, usages: &LifeCycleUsages) -> Result<()> {
        if self.load_usages(project_id)?.as_ref() == Some(usages) {
            return Ok(());
        }

        self.atomically("store_project_settings", |cache| {
            cache
                .conn
                .execute(
                    "DELETE FROM project_life_cycle_usages WHERE project_id = ?1",
                    [project_id],
                )
                .into_diagnostic()?;

            for usage in usages.iter() {
                cache
                    .conn
                    .execute(
                        "INSERT INTO project_life_cycle_usages
                         (project_id, life_cycle_ident, use_in_construction, use_in_maintenance, use_in_energy_demand)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            project_id,
                            usage.module().as_str(),
                            usage.construction,
                            usage.maintenance,
                            usage.energy_demand
                        ],
                    )
                    .into_diagnostic()?;
            }

            let outdated = cache
                .conn
                .execute(
                    "UPDATE items SET is_outdated = 1, modified = ?2 WHERE project_id = ?1",
                    params![project_id, now()],
                )
                .into_diagnostic()?;
            tracing::debug!(project = project_id, outdated, "stored life cycle usages");
            Ok(())
        })
    }

    /// Replace the cached indicator catalog
    pub fn store_indicator_catalog(&self, indicators: &[Indicator]) -> Result<()> {
        self.atomically("store_indicator_catalog", |cache| {
            cache
                .conn
                .execute("DELETE FROM indicators", [])
                .into_diagnostic()?;
            for (order, indicator) in indicators.iter().enumerate() {
                cache
                    .conn
                    .execute(
                        "INSERT INTO indicators (ident, name, unit, p_order) VALUES (?1, ?2, ?3, ?4)",
                        params![indicator.ident, indicator.name, indicator.unit, order as i64],
                    )
                    .into_diagnostic()?;
            }
            Ok(())
        })
    }

    /// Remember which model state a variant was computed from
    pub fn record_variant_source(&self, scope: &CacheScope, source_hash: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO variant_sources (project_variant_id, project_id, source_hash, computed_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![scope.variant_id, scope.project_id, source_hash, now()],
            )
            .into_diagnostic()?;
        Ok(())
    }

    /// Mark the root item of a variant outdated; false if not cached
    pub fn mark_variant_outdated(&self, variant_id: &str) -> Result<bool> {
        match self.variant_item(variant_id)? {
            Some(item_id) => {
                self.mark_outdated(item_id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop all cached results of a variant
    pub fn remove_variant(&self, variant_id: &str) -> Result<bool> {
        self.atomically("remove_variant", |cache| {
            cache
                .conn
                .execute(
                    "DELETE FROM variant_sources WHERE project_variant_id = ?1",
                    [variant_id],
                )
                .into_diagnostic()?;
            match cache.variant_item(variant_id)? {
                Some(item_id) => {
                    cache.delete_item(item_id)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }
}
