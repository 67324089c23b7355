//! Read queries over cached results

use miette::{IntoDiagnostic, Result};
use rusqlite::{params, OptionalExtension};

use super::{
    CachedComponent, CachedIndicator, CheckIssue, ElementEffects, ElementRanking, ElementTypeEffect,
    IndicatorTotal, ItemType, LeafEffect, LifeCycleEffect, ResultCache, VariantStatus,
};
use crate::lca::Stage;
use crate::model::ElementTypeCode;

impl ResultCache {
    /// Root item of a variant, or an error telling how to create it
    fn require_variant(&self, variant_id: &str) -> Result<i64> {
        self.variant_item(variant_id)?.ok_or_else(|| {
            miette::miette!(
                help = "run 'elca compute' first",
                "variant '{}' has no cached results",
                variant_id
            )
        })
    }

    /// Indicator catalog in reporting order
    pub fn indicators(&self) -> Result<Vec<CachedIndicator>> {
        let mut stmt = self
            .conn
            .prepare("SELECT ident, name, unit FROM indicators ORDER BY p_order")
            .into_diagnostic()?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CachedIndicator {
                    ident: row.get(0)?,
                    name: row.get(1)?,
                    unit: row.get(2)?,
                })
            })
            .into_diagnostic()?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()
    }

    /// `total` of every indicator for a variant
    pub fn total_effects(&self, variant_id: &str) -> Result<Vec<IndicatorTotal>> {
        let root = self.require_variant(variant_id)?;

        let mut stmt = self
            .conn
            .prepare(
                "SELECT i.ident, i.name, i.unit, COALESCE(t.value, 0) FROM indicators i
                 LEFT JOIN item_totals t
                   ON t.indicator_ident = i.ident AND t.item_id = ?1 AND t.life_cycle_ident = ?2
                 ORDER BY i.p_order",
            )
            .into_diagnostic()?;
        let rows = stmt
            .query_map(params![root, Stage::Total.as_str()], |row| {
                Ok(IndicatorTotal {
                    indicator: row.get(0)?,
                    name: row.get(1)?,
                    unit: row.get(2)?,
                    value: row.get(3)?,
                })
            })
            .into_diagnostic()?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()
    }

    /// Totals of one item per life cycle module and phase
    fn item_effects(&self, item_id: i64) -> Result<Vec<LifeCycleEffect>> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT t.life_cycle_ident, COALESCE(l.kind, 'phase'), t.indicator_ident, t.value
                 FROM item_totals t
                 LEFT JOIN life_cycles l ON l.ident = t.life_cycle_ident
                 LEFT JOIN indicators i ON i.ident = t.indicator_ident
                 WHERE t.item_id = ?1
                 ORDER BY COALESCE(l.p_order, 1000), COALESCE(i.p_order, 1000), t.indicator_ident",
            )
            .into_diagnostic()?;
        let rows = stmt
            .query_map([item_id], |row| {
                Ok(LifeCycleEffect {
                    life_cycle: row.get(0)?,
                    kind: row.get(1)?,
                    indicator: row.get(2)?,
                    value: row.get(3)?,
                })
            })
            .into_diagnostic()?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()
    }

    /// Variant totals per life cycle module and phase
    pub fn effects_per_life_cycle(&self, variant_id: &str) -> Result<Vec<LifeCycleEffect>> {
        let root = self.require_variant(variant_id)?;
        self.item_effects(root)
    }

    /// `total` of element type nodes up to `max_level`
    pub fn effects_per_element_type(
        &self,
        variant_id: &str,
        max_level: u8,
        indicator: &str,
    ) -> Result<Vec<ElementTypeEffect>> {
        self.require_variant(variant_id)?;

        let mut stmt = self
            .conn
            .prepare(
                "SELECT t.element_type_node, COALESCE(t.mass, 0), COALESCE(v.value, 0)
                 FROM element_types t
                 LEFT JOIN item_totals v
                   ON v.item_id = t.item_id AND v.life_cycle_ident = ?2 AND v.indicator_ident = ?3
                 WHERE t.project_variant_id = ?1
                 ORDER BY t.element_type_node",
            )
            .into_diagnostic()?;
        let rows = stmt
            .query_map(params![variant_id, Stage::Total.as_str(), indicator], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            })
            .into_diagnostic()?;

        let mut effects = Vec::new();
        for row in rows {
            let (code, mass, value) = row.into_diagnostic()?;
            let level = code.parse::<ElementTypeCode>().map(|c| c.level()).unwrap_or(0);
            if level == 0 || level > max_level {
                continue;
            }
            effects.push(ElementTypeEffect {
                code,
                level,
                mass,
                indicator: indicator.to_string(),
                value,
            });
        }
        Ok(effects)
    }

    /// Everything cached for one element
    pub fn element_effects(&self, variant_id: &str, element_id: &str) -> Result<ElementEffects> {
        self.require_variant(variant_id)?;

        let row = self
            .conn
            .query_row(
                "SELECT e.item_id, t.element_type_node, i.is_virtual, i.is_outdated,
                        c.element_id, COALESCE(e.quantity, 0), COALESCE(e.ref_unit, ''),
                        COALESCE(e.mass, 0)
                 FROM elements e
                 JOIN items i ON i.id = e.item_id
                 JOIN element_types t ON t.item_id = i.parent_id
                 LEFT JOIN elements c ON c.item_id = e.composite_item_id
                 WHERE e.project_variant_id = ?1 AND e.element_id = ?2",
                params![variant_id, element_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, bool>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, f64>(7)?,
                    ))
                },
            )
            .optional()
            .into_diagnostic()?;

        let Some((item_id, element_type, is_virtual, is_outdated, composite, quantity, ref_unit, mass)) = row
        else {
            return Err(miette::miette!(
                "element '{}' is not cached for variant '{}'",
                element_id,
                variant_id
            ));
        };

        let mut stmt = self
            .conn
            .prepare(
                "SELECT c.element_component_id, COALESCE(c.quantity, 0), COALESCE(c.ref_unit, ''),
                        COALESCE(c.mass, 0), c.num_replacements, i.is_outdated
                 FROM element_components c
                 JOIN items i ON i.id = c.item_id
                 WHERE i.parent_id = ?1
                 ORDER BY c.element_component_id",
            )
            .into_diagnostic()?;
        let components = stmt
            .query_map([item_id], |row| {
                Ok(CachedComponent {
                    component_id: row.get(0)?,
                    quantity: row.get(1)?,
                    ref_unit: row.get(2)?,
                    mass: row.get(3)?,
                    num_replacements: row.get(4)?,
                    is_outdated: row.get(5)?,
                })
            })
            .into_diagnostic()?
            .collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()?;

        Ok(ElementEffects {
            element_id: element_id.to_string(),
            item_id,
            element_type,
            is_virtual,
            is_outdated,
            composite,
            quantity,
            ref_unit,
            mass,
            effects: self.item_effects(item_id)?,
            components,
        })
    }

    /// Raw non-partial results of leaf items of one type below the variant
    fn leaf_effects(&self, variant_id: &str, item_type: ItemType) -> Result<Vec<LeafEffect>> {
        self.require_variant(variant_id)?;
        let Some((table, id_column)) = item_type.leaf_table() else {
            return Ok(Vec::new());
        };

        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT f.{id}, COALESCE(f.quantity, 0), COALESCE(f.ref_unit, ''), i.is_virtual,
                        v.life_cycle_ident, v.indicator_ident, SUM(v.value)
                 FROM {table} f
                 JOIN items i ON i.id = f.item_id
                 JOIN indicator_values v ON v.item_id = f.item_id
                 LEFT JOIN life_cycles l ON l.ident = v.life_cycle_ident
                 LEFT JOIN indicators n ON n.ident = v.indicator_ident
                 WHERE f.project_variant_id = ?1 AND v.is_partial = 0 AND v.value IS NOT NULL
                 GROUP BY f.{id}, v.life_cycle_ident, v.indicator_ident
                 ORDER BY f.{id}, MIN(COALESCE(l.p_order, 1000)), MIN(COALESCE(n.p_order, 1000))",
                id = id_column,
                table = table
            ))
            .into_diagnostic()?;
        let rows = stmt
            .query_map([variant_id], |row| {
                Ok(LeafEffect {
                    item_type,
                    id: row.get(0)?,
                    quantity: row.get(1)?,
                    ref_unit: row.get(2)?,
                    is_virtual: row.get(3)?,
                    life_cycle: row.get(4)?,
                    indicator: row.get(5)?,
                    value: row.get(6)?,
                })
            })
            .into_diagnostic()?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()
    }

    /// Results of final energy demands, supplies and reference models
    pub fn final_energy_effects(&self, variant_id: &str) -> Result<Vec<LeafEffect>> {
        let mut effects = self.leaf_effects(variant_id, ItemType::FinalEnergyDemand)?;
        effects.extend(self.leaf_effects(variant_id, ItemType::FinalEnergySupply)?);
        effects.extend(self.leaf_effects(variant_id, ItemType::FinalEnergyRefModel)?);
        Ok(effects)
    }

    pub fn transport_effects(&self, variant_id: &str) -> Result<Vec<LeafEffect>> {
        self.leaf_effects(variant_id, ItemType::TransportMean)
    }

    /// Non-virtual elements with the highest `total` of one indicator
    pub fn top_elements(&self, variant_id: &str, indicator: &str, limit: usize) -> Result<Vec<ElementRanking>> {
        self.require_variant(variant_id)?;

        let mut stmt = self
            .conn
            .prepare(
                "SELECT e.element_id, t.element_type_node, COALESCE(e.mass, 0), v.value
                 FROM elements e
                 JOIN items i ON i.id = e.item_id
                 JOIN element_types t ON t.item_id = i.parent_id
                 JOIN item_totals v
                   ON v.item_id = e.item_id AND v.life_cycle_ident = ?2 AND v.indicator_ident = ?3
                 WHERE e.project_variant_id = ?1 AND i.is_virtual = 0
                 ORDER BY v.value DESC, e.element_id
                 LIMIT ?4",
            )
            .into_diagnostic()?;
        let rows = stmt
            .query_map(
                params![variant_id, Stage::Total.as_str(), indicator, limit as i64],
                |row| {
                    Ok(ElementRanking {
                        element_id: row.get(0)?,
                        element_type: row.get(1)?,
                        mass: row.get(2)?,
                        value: row.get(3)?,
                    })
                },
            )
            .into_diagnostic()?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()
    }

    /// Cache state of every cached variant
    pub fn variant_statuses(&self) -> Result<Vec<VariantStatus>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT v.project_variant_id, i.project_id, s.source_hash, s.computed_at
                 FROM project_variants v
                 JOIN items i ON i.id = v.item_id
                 LEFT JOIN variant_sources s ON s.project_variant_id = v.project_variant_id
                 ORDER BY v.project_variant_id",
            )
            .into_diagnostic()?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .into_diagnostic()?
            .collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()?;

        let mut statuses = Vec::with_capacity(rows.len());
        for (variant_id, project_id, source_hash, computed_at) in rows {
            let (items, outdated_items) = self.variant_item_counts(&variant_id)?;
            statuses.push(VariantStatus {
                variant_id,
                project_id,
                items,
                outdated_items,
                source_hash,
                computed_at,
            });
        }
        Ok(statuses)
    }

    /// Status of one variant, `None` when not cached
    pub fn variant_status(&self, variant_id: &str) -> Result<Option<VariantStatus>> {
        Ok(self
            .variant_statuses()?
            .into_iter()
            .find(|s| s.variant_id == variant_id))
    }

    /// Items and outdated items in the subtree of a variant
    fn variant_item_counts(&self, variant_id: &str) -> Result<(usize, usize)> {
        self.conn
            .query_row(
                "WITH RECURSIVE subtree(id) AS (
                     SELECT item_id FROM project_variants WHERE project_variant_id = ?1
                     UNION ALL
                     SELECT i.id FROM items i JOIN subtree s ON i.parent_id = s.id
                 )
                 SELECT COUNT(*), COALESCE(SUM(i.is_outdated), 0)
                 FROM subtree s JOIN items i ON i.id = s.id",
                [variant_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .into_diagnostic()
    }

    /// Source hash a variant was last computed from
    pub fn variant_source(&self, variant_id: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT source_hash FROM variant_sources WHERE project_variant_id = ?1",
                [variant_id],
                |row| row.get(0),
            )
            .optional()
            .into_diagnostic()
    }

    /// Variant ids with cached results
    pub fn cached_variants(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT project_variant_id FROM project_variants ORDER BY project_variant_id")
            .into_diagnostic()?;
        let rows = stmt.query_map([], |row| row.get(0)).into_diagnostic()?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()
    }

    /// Sanity checks over the whole cache
    pub fn check(&self) -> Result<Vec<CheckIssue>> {
        let checks = [
            (
                "non-partial A1/A2/A3 values next to A1-3 (double counted)",
                "SELECT DISTINCT v.item_id, i.type FROM indicator_values v
                 JOIN items i ON i.id = v.item_id
                 WHERE v.is_partial = 0 AND v.life_cycle_ident IN ('A1', 'A2', 'A3')
                   AND EXISTS (SELECT 1 FROM indicator_values w
                               WHERE w.item_id = v.item_id AND w.life_cycle_ident = 'A1-3')",
            ),
            (
                "up to date but without totals",
                "SELECT i.id, i.type FROM items i
                 WHERE i.is_outdated = 0
                   AND EXISTS (SELECT 1 FROM indicator_values v
                               WHERE v.item_id = i.id AND v.value IS NOT NULL)
                   AND NOT EXISTS (SELECT 1 FROM item_totals t WHERE t.item_id = i.id)",
            ),
            (
                "item without parent",
                "SELECT i.id, i.type FROM items i
                 WHERE i.parent_id IS NULL AND i.type <> 'project_variant'",
            ),
            (
                "raw indicator values on an aggregating item",
                "SELECT DISTINCT i.id, i.type FROM items i
                 JOIN indicator_values v ON v.item_id = i.id
                 WHERE i.type IN ('project_variant', 'element_type', 'element')",
            ),
        ];

        let mut issues = Vec::new();
        for (message, sql) in checks {
            let mut stmt = self.conn.prepare(sql).into_diagnostic()?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CheckIssue {
                        item_id: row.get(0)?,
                        item_type: row.get(1)?,
                        message: message.to_string(),
                    })
                })
                .into_diagnostic()?;
            for row in rows {
                issues.push(row.into_diagnostic()?);
            }
        }
        Ok(issues)
    }
}
