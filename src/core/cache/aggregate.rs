//! Recomputing outdated items
//!
//! An update run works on one project inside an immediate transaction:
//!
//! 1. Every ancestor of an outdated item is outdated too. Ancestors are the
//!    tree parent and, for sub-elements, the composite element.
//! 2. Outdated items are recomputed children first. Leaves derive totals
//!    from their raw indicator values; all other items sum the totals of
//!    their non-virtual children, composites those of their sub-elements.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::time::Instant;

use miette::{IntoDiagnostic, Result};
use rusqlite::params;

use super::{now, ItemType, RawIndicatorValue, ResultCache, Totals, UpdateStats};
use crate::lca::{LifeCycleUsages, Module, Stage};

/// Node of the item tree as needed for scheduling
#[derive(Debug, Clone)]
struct Node {
    parent_id: Option<i64>,
    item_type: ItemType,
    is_outdated: bool,
    composite_item_id: Option<i64>,
}

impl Node {
    /// Items whose totals include this one
    fn consumers(&self) -> impl Iterator<Item = i64> {
        self.parent_id.into_iter().chain(self.composite_item_id)
    }
}

/// Totals of a leaf item
///
/// Every value counts towards its module. Non-partial values also count
/// towards their phase, and towards `total` when the module is applied in
/// totals. Legacy modules are phases already and are counted once.
pub fn derive_leaf_totals(rows: &[RawIndicatorValue], usages: &LifeCycleUsages) -> Totals {
    let mut totals = Totals::new();

    for row in rows {
        let Some(value) = row.value else {
            continue;
        };
        let module = match row.life_cycle_ident.parse::<Module>() {
            Ok(module) => module,
            Err(e) => {
                tracing::warn!("skipping indicator value: {}", e);
                continue;
            }
        };

        let mut add = |ident: &str| {
            *totals
                .entry((ident.to_string(), row.indicator_ident.clone()))
                .or_insert(0.0) += value;
        };

        add(module.as_str());

        if row.is_partial {
            continue;
        }

        if !module.is_legacy() {
            add(module.stage().as_str());
        }
        if module.stage() != Stage::Total && usages.module_is_applied_in_totals(module) {
            add(Stage::Total.as_str());
        }
    }

    totals
}

impl ResultCache {
    /// Recompute every outdated item of a project
    pub fn update(&self, project_id: &str) -> Result<UpdateStats> {
        let started = Instant::now();

        let items_updated = self.atomically("update", |cache| {
            let usages = cache.load_usages(project_id)?.unwrap_or_default();
            let nodes = cache.load_nodes(project_id)?;
            let order = schedule(&nodes)?;

            for item_id in &order {
                let Some(node) = nodes.get(item_id) else {
                    continue;
                };
                cache.recompute(*item_id, node, &usages)?;
            }

            Ok(order.len())
        })?;

        let stats = UpdateStats {
            items_updated,
            duration: started.elapsed(),
        };
        tracing::info!(
            project = project_id,
            items = stats.items_updated,
            ms = stats.duration.as_millis() as u64,
            "cache updated"
        );
        Ok(stats)
    }

    /// Update only when the project has outdated items
    pub fn ensure_current(&self, project_id: &str) -> Result<Option<UpdateStats>> {
        if self.count_outdated(project_id)? == 0 {
            return Ok(None);
        }
        self.update(project_id).map(Some)
    }

    pub fn count_outdated(&self, project_id: &str) -> Result<usize> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM items WHERE project_id = ?1 AND is_outdated = 1",
                [project_id],
                |row| row.get(0),
            )
            .into_diagnostic()
    }

    /// Project ids with cached items
    pub fn cached_projects(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT project_id FROM items ORDER BY project_id")
            .into_diagnostic()?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .into_diagnostic()?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()
    }

    /// Re-aggregate one element type node and everything above it
    ///
    /// No-op when the node is not cached.
    pub fn update_element_type_tree(&self, variant_id: &str, code: &str) -> Result<Option<UpdateStats>> {
        let Some(item_id) = self.element_type_item(variant_id, code)? else {
            return Ok(None);
        };
        self.mark_outdated(item_id)?;
        let project_id = self.project_of_item(item_id)?;
        self.update(&project_id).map(Some)
    }

    /// Re-aggregate the root of a variant
    pub fn update_project_variant(&self, variant_id: &str) -> Result<Option<UpdateStats>> {
        let Some(item_id) = self.variant_item(variant_id)? else {
            return Ok(None);
        };
        self.mark_outdated(item_id)?;
        let project_id = self.project_of_item(item_id)?;
        self.update(&project_id).map(Some)
    }

    fn project_of_item(&self, item_id: i64) -> Result<String> {
        self.conn
            .query_row("SELECT project_id FROM items WHERE id = ?1", [item_id], |row| {
                row.get(0)
            })
            .into_diagnostic()
    }

    fn load_nodes(&self, project_id: &str) -> Result<HashMap<i64, Node>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT i.id, i.parent_id, i.type, i.is_outdated, e.composite_item_id
                 FROM items i LEFT JOIN elements e ON e.item_id = i.id
                 WHERE i.project_id = ?1",
            )
            .into_diagnostic()?;

        let rows = stmt
            .query_map([project_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                ))
            })
            .into_diagnostic()?;

        let mut nodes = HashMap::new();
        for row in rows {
            let (id, parent_id, item_type, is_outdated, composite_item_id) = row.into_diagnostic()?;
            let item_type = item_type.parse::<ItemType>().map_err(|e| miette::miette!(e))?;
            nodes.insert(
                id,
                Node {
                    parent_id,
                    item_type,
                    is_outdated,
                    composite_item_id,
                },
            );
        }
        Ok(nodes)
    }

    fn recompute(&self, item_id: i64, node: &Node, usages: &LifeCycleUsages) -> Result<()> {
        let totals = if node.item_type.is_leaf() {
            derive_leaf_totals(&self.raw_values(item_id)?, usages)
        } else {
            self.child_totals(item_id)?
        };

        self.conn
            .execute("DELETE FROM item_totals WHERE item_id = ?1", [item_id])
            .into_diagnostic()?;
        {
            let mut insert = self
                .conn
                .prepare_cached(
                    "INSERT INTO item_totals (item_id, life_cycle_ident, indicator_ident, value)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .into_diagnostic()?;
            for ((life_cycle, indicator), value) in &totals {
                insert
                    .execute(params![item_id, life_cycle, indicator, value])
                    .into_diagnostic()?;
            }
        }

        match node.item_type {
            ItemType::Element => {
                self.conn
                    .execute(
                        "UPDATE elements SET mass =
                           (SELECT COALESCE(SUM(c.mass), 0) FROM element_components c
                              JOIN items i ON i.id = c.item_id WHERE i.parent_id = ?1)
                         + (SELECT COALESCE(SUM(s.mass), 0) FROM elements s WHERE s.composite_item_id = ?1)
                         WHERE item_id = ?1",
                        [item_id],
                    )
                    .into_diagnostic()?;
            }
            ItemType::ElementType => {
                self.conn
                    .execute(
                        "UPDATE element_types SET mass =
                           (SELECT COALESCE(SUM(e.mass), 0) FROM elements e
                              JOIN items i ON i.id = e.item_id WHERE i.parent_id = ?1 AND i.is_virtual = 0)
                         + (SELECT COALESCE(SUM(t.mass), 0) FROM element_types t
                              JOIN items i ON i.id = t.item_id WHERE i.parent_id = ?1 AND i.is_virtual = 0)
                         WHERE item_id = ?1",
                        [item_id],
                    )
                    .into_diagnostic()?;
            }
            _ => {}
        }

        self.conn
            .execute(
                "UPDATE items SET is_outdated = 0, modified = ?2 WHERE id = ?1",
                params![item_id, now()],
            )
            .into_diagnostic()?;
        Ok(())
    }

    fn raw_values(&self, item_id: i64) -> Result<Vec<RawIndicatorValue>> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT life_cycle_ident, indicator_ident, value, is_partial
                 FROM indicator_values WHERE item_id = ?1",
            )
            .into_diagnostic()?;
        let rows = stmt
            .query_map([item_id], |row| {
                Ok(RawIndicatorValue {
                    life_cycle_ident: row.get(0)?,
                    indicator_ident: row.get(1)?,
                    value: row.get(2)?,
                    is_partial: row.get(3)?,
                })
            })
            .into_diagnostic()?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .into_diagnostic()
    }

    /// Sum of non-virtual children plus sub-elements of a composite
    fn child_totals(&self, item_id: i64) -> Result<Totals> {
        let mut totals = Totals::new();

        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT t.life_cycle_ident, t.indicator_ident, SUM(t.value) FROM item_totals t
                 JOIN items c ON c.id = t.item_id
                 WHERE c.parent_id = ?1 AND c.is_virtual = 0
                 GROUP BY t.life_cycle_ident, t.indicator_ident
                 UNION ALL
                 SELECT t.life_cycle_ident, t.indicator_ident, SUM(t.value) FROM item_totals t
                 JOIN elements e ON e.item_id = t.item_id
                 WHERE e.composite_item_id = ?1
                 GROUP BY t.life_cycle_ident, t.indicator_ident",
            )
            .into_diagnostic()?;
        let rows = stmt
            .query_map([item_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            })
            .into_diagnostic()?;

        for row in rows {
            let (life_cycle, indicator, value) = row.into_diagnostic()?;
            *totals.entry((life_cycle, indicator)).or_insert(0.0) += value;
        }
        Ok(totals)
    }
}

/// Order outdated items (and their ancestors) children first
fn schedule(nodes: &HashMap<i64, Node>) -> Result<Vec<i64>> {
    // Upward dirty propagation
    let mut dirty: HashSet<i64> = HashSet::new();
    let mut queue: VecDeque<i64> = nodes
        .iter()
        .filter(|(_, n)| n.is_outdated)
        .map(|(id, _)| *id)
        .collect();

    while let Some(id) = queue.pop_front() {
        if !dirty.insert(id) {
            continue;
        }
        if let Some(node) = nodes.get(&id) {
            queue.extend(node.consumers().filter(|c| nodes.contains_key(c)));
        }
    }

    // Kahn's algorithm over dirty items; inputs are dirty children
    let mut pending: BTreeMap<i64, usize> = dirty.iter().map(|id| (*id, 0)).collect();
    for id in &dirty {
        if let Some(node) = nodes.get(id) {
            for consumer in node.consumers() {
                if let Some(count) = pending.get_mut(&consumer) {
                    *count += 1;
                }
            }
        }
    }

    let mut ready: VecDeque<i64> = pending
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(dirty.len());

    while let Some(id) = ready.pop_front() {
        order.push(id);
        if let Some(node) = nodes.get(&id) {
            for consumer in node.consumers() {
                if let Some(count) = pending.get_mut(&consumer) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(consumer);
                    }
                }
            }
        }
    }

    if order.len() != dirty.len() {
        return Err(miette::miette!(
            "cache item tree contains a cycle ({} of {} outdated items ordered)",
            order.len(),
            dirty.len()
        ));
    }

    Ok(order)
}
