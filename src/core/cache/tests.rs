use super::*;
use crate::lca::{IndicatorResult, IndicatorResults, LifeCycleUsage, LifeCycleUsages, Module, Quantity, Unit};
use crate::model::Element;

fn scope() -> CacheScope {
    CacheScope::new("office", "v1")
}

fn element(id: &str, code: &str, sub_elements: &[&str]) -> Element {
    Element {
        id: id.to_string(),
        name: String::new(),
        element_type: code.parse().unwrap(),
        quantity: 10.0,
        ref_unit: Unit::new("m2"),
        elements: sub_elements.iter().map(|s| s.to_string()).collect(),
        components: vec![],
    }
}

fn gwp(module: Module, process: Option<&str>, value: f64) -> IndicatorResults {
    IndicatorResults::new(
        module,
        vec![IndicatorResult::new("gwp", Some(value))],
        process.map(String::from),
        1.0,
    )
}

fn total(cache: &ResultCache, item_id: i64, life_cycle: &str) -> Option<f64> {
    cache
        .conn
        .query_row(
            "SELECT value FROM item_totals WHERE item_id = ?1 AND life_cycle_ident = ?2 AND indicator_ident = 'gwp'",
            rusqlite::params![item_id, life_cycle],
            |row| row.get(0),
        )
        .ok()
}

fn component(cache: &ResultCache, element_item: i64, id: &str, mass: f64, a13: f64) -> i64 {
    let item = cache
        .store_element_component(&scope(), element_item, id, &Quantity::new(1.0, Unit::m3()), mass, 0)
        .unwrap();
    cache
        .store_indicators(item, &gwp(Module::A13, Some(id), a13), false, false)
        .unwrap();
    item
}

#[test]
fn test_new_cache_has_schema() {
    let cache = ResultCache::open_in_memory().unwrap();
    let stats = cache.statistics().unwrap();
    assert_eq!(stats.total_items, 0);
    assert_eq!(stats.db_size_bytes, 0);

    let life_cycles = cache.query_raw("SELECT COUNT(*) FROM life_cycles").unwrap();
    assert_eq!(life_cycles[0][0], Module::ALL.len().to_string());
}

#[test]
fn test_schema_rebuilt_on_version_mismatch() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cache.db");

    {
        let cache = ResultCache::open_path(&path, Duration::from_millis(100)).unwrap();
        cache.ensure_variant_item(&scope()).unwrap();
        cache
            .conn
            .execute("UPDATE schema_version SET version = 0", [])
            .unwrap();
    }

    let cache = ResultCache::open_path(&path, Duration::from_millis(100)).unwrap();
    assert_eq!(cache.statistics().unwrap().total_items, 0);
    assert!(cache.statistics().unwrap().db_size_bytes > 0);
}

#[test]
fn test_element_type_items_form_a_chain() {
    let cache = ResultCache::open_in_memory().unwrap();
    let item = cache
        .ensure_element_type_item(&scope(), &"331".parse().unwrap())
        .unwrap();

    let t330 = cache.element_type_item("v1", "330").unwrap().unwrap();
    let t300 = cache.element_type_item("v1", "300").unwrap().unwrap();
    let root = cache.variant_item("v1").unwrap().unwrap();

    let parent = |id: i64| -> Option<i64> {
        cache
            .conn
            .query_row("SELECT parent_id FROM items WHERE id = ?1", [id], |row| row.get(0))
            .unwrap()
    };
    assert_eq!(parent(item), Some(t330));
    assert_eq!(parent(t330), Some(t300));
    assert_eq!(parent(t300), Some(root));
    assert_eq!(parent(root), None);

    // Idempotent
    assert_eq!(
        cache.ensure_element_type_item(&scope(), &"331".parse().unwrap()).unwrap(),
        item
    );
}

#[test]
fn test_update_rolls_totals_up_the_tree() {
    let cache = ResultCache::open_in_memory().unwrap();
    let wall = cache.store_element(&scope(), &element("wall", "331", &[]), None).unwrap();

    let c1 = component(&cache, wall, "concrete", 10.0, 100.0);
    cache
        .store_indicators(c1, &gwp(Module::C3, Some("concrete-c3"), 5.0), false, false)
        .unwrap();
    component(&cache, wall, "insulation", 5.0, 20.0);

    let stats = cache.update("office").unwrap();
    assert_eq!(stats.items_updated, 7);
    assert_eq!(cache.count_outdated("office").unwrap(), 0);

    assert_eq!(total(&cache, c1, "A1-3"), Some(100.0));
    assert_eq!(total(&cache, c1, "prod"), Some(100.0));
    assert_eq!(total(&cache, c1, "total"), Some(105.0));
    assert_eq!(total(&cache, wall, "total"), Some(125.0));
    assert_eq!(total(&cache, wall, "eol"), Some(5.0));

    let root = cache.variant_item("v1").unwrap().unwrap();
    assert_eq!(total(&cache, root, "total"), Some(125.0));
    assert_eq!(total(&cache, root, "prod"), Some(120.0));

    let effects = cache.element_effects("v1", "wall").unwrap();
    assert_eq!(effects.mass, 15.0);
    assert_eq!(effects.components.len(), 2);
    assert_eq!(effects.element_type, "331");

    let types = cache.effects_per_element_type("v1", 1, "gwp").unwrap();
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].code, "300");
    assert_eq!(types[0].mass, 15.0);
    assert_eq!(types[0].value, 125.0);
}

#[test]
fn test_composite_elements_are_not_double_counted() {
    let cache = ResultCache::open_in_memory().unwrap();
    let facade = cache
        .store_element(&scope(), &element("facade", "330", &["wall"]), None)
        .unwrap();
    let wall = cache
        .store_element(&scope(), &element("wall", "331", &[]), Some(facade))
        .unwrap();
    component(&cache, wall, "concrete", 10.0, 100.0);

    cache.update("office").unwrap();

    let root = cache.variant_item("v1").unwrap().unwrap();
    let t330 = cache.element_type_item("v1", "330").unwrap().unwrap();
    assert_eq!(total(&cache, facade, "total"), Some(100.0));
    assert_eq!(total(&cache, t330, "total"), Some(100.0));
    assert_eq!(total(&cache, root, "total"), Some(100.0));

    let facade_effects = cache.element_effects("v1", "facade").unwrap();
    assert!(facade_effects.is_virtual);
    assert_eq!(facade_effects.mass, 10.0);
    assert_eq!(
        cache.element_effects("v1", "wall").unwrap().composite.as_deref(),
        Some("facade")
    );

    // Virtual composites never rank
    let top = cache.top_elements("v1", "gwp", 10).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].element_id, "wall");
}

#[test]
fn test_ensure_current_and_variant_reaggregation() {
    let cache = ResultCache::open_in_memory().unwrap();
    let wall = cache.store_element(&scope(), &element("wall", "331", &[]), None).unwrap();
    let c1 = component(&cache, wall, "concrete", 10.0, 100.0);
    let roof = cache.store_element(&scope(), &element("roof", "361", &[]), None).unwrap();
    component(&cache, roof, "tiles", 1.0, 50.0);
    cache.update("office").unwrap();

    cache
        .store_indicators(c1, &gwp(Module::A13, Some("concrete"), 200.0), false, false)
        .unwrap();
    assert!(cache.ensure_current("office").unwrap().is_some());

    let stats = cache.update_project_variant("v1").unwrap().unwrap();
    assert_eq!(stats.items_updated, 1);

    let root = cache.variant_item("v1").unwrap().unwrap();
    assert_eq!(total(&cache, root, "total"), Some(250.0));
    assert!(cache.ensure_current("office").unwrap().is_none());
}

#[test]
fn test_dirty_branch_item_count() {
    let cache = ResultCache::open_in_memory().unwrap();
    let wall = cache.store_element(&scope(), &element("wall", "331", &[]), None).unwrap();
    let c1 = component(&cache, wall, "concrete", 10.0, 100.0);
    let roof = cache.store_element(&scope(), &element("roof", "361", &[]), None).unwrap();
    component(&cache, roof, "tiles", 1.0, 50.0);
    cache.update("office").unwrap();

    cache
        .store_indicators(c1, &gwp(Module::A13, Some("concrete"), 200.0), false, false)
        .unwrap();
    let stats = cache.update("office").unwrap();
    assert_eq!(stats.items_updated, 6);
}

#[test]
fn test_removing_a_component_outdates_its_element() {
    let cache = ResultCache::open_in_memory().unwrap();
    let wall = cache.store_element(&scope(), &element("wall", "331", &[]), None).unwrap();
    component(&cache, wall, "concrete", 10.0, 100.0);
    component(&cache, wall, "insulation", 5.0, 20.0);
    cache.update("office").unwrap();

    assert!(cache.remove_element_component(&scope(), "insulation").unwrap());
    assert!(!cache.remove_element_component(&scope(), "insulation").unwrap());
    assert_eq!(cache.count_outdated("office").unwrap(), 1);

    cache.update("office").unwrap();
    assert_eq!(total(&cache, wall, "total"), Some(100.0));
    assert_eq!(cache.element_effects("v1", "wall").unwrap().mass, 10.0);
}

#[test]
fn test_removed_elements_leave_their_type() {
    let cache = ResultCache::open_in_memory().unwrap();
    let wall = cache.store_element(&scope(), &element("wall", "331", &[]), None).unwrap();
    component(&cache, wall, "concrete", 10.0, 100.0);
    let roof = cache.store_element(&scope(), &element("roof", "361", &[]), None).unwrap();
    component(&cache, roof, "tiles", 1.0, 50.0);
    cache.update("office").unwrap();

    let touched = cache.remove_elements_except(&scope(), &["wall"]).unwrap();
    assert_eq!(touched, vec!["361".to_string()]);
    assert!(cache.element_item("v1", "roof").unwrap().is_none());

    cache.update("office").unwrap();
    let root = cache.variant_item("v1").unwrap().unwrap();
    assert_eq!(total(&cache, root, "total"), Some(100.0));
}

#[test]
fn test_virtual_leaves_are_excluded_from_the_variant() {
    let cache = ResultCache::open_in_memory().unwrap();
    let kwh = Quantity::new(100.0, Unit::kwh());

    let demand = cache.store_final_energy_demand(&scope(), "heat", &kwh).unwrap();
    cache
        .store_indicators(demand, &gwp(Module::B6, Some("gas"), 40.0), false, false)
        .unwrap();
    let reference = cache.store_final_energy_ref_model(&scope(), "ref-heat", &kwh).unwrap();
    cache
        .store_indicators(reference, &gwp(Module::B6, Some("gas"), 30.0), false, false)
        .unwrap();
    let excluded = cache
        .store_transport_mean(&scope(), "truck", &Quantity::new(10.0, Unit::tkm()), false)
        .unwrap();
    cache
        .store_indicators(excluded, &gwp(Module::A4, Some("truck"), 5.0), false, false)
        .unwrap();

    cache.update("office").unwrap();
    let root = cache.variant_item("v1").unwrap().unwrap();
    assert_eq!(total(&cache, root, "total"), Some(40.0));
    assert_eq!(total(&cache, root, "B6"), Some(40.0));
    assert_eq!(total(&cache, reference, "B6"), Some(30.0));

    let energy = cache.final_energy_effects("v1").unwrap();
    assert_eq!(energy.len(), 2);
    assert!(energy.iter().any(|e| e.id == "ref-heat" && e.is_virtual));

    assert_eq!(cache.remove_final_energy_ref_models("v1").unwrap(), 1);
    assert_eq!(cache.final_energy_effects("v1").unwrap().len(), 1);
    assert_eq!(cache.remove_transport_means("v1").unwrap(), 1);
    assert!(cache.transport_effects("v1").unwrap().is_empty());
}

#[test]
fn test_zero_values_and_partial_rows() {
    let cache = ResultCache::open_in_memory().unwrap();
    let wall = cache.store_element(&scope(), &element("wall", "331", &[]), None).unwrap();
    let item = cache
        .store_element_component(&scope(), wall, "old-brick", &Quantity::new(1.0, Unit::m3()), 1.0, 0)
        .unwrap();

    cache
        .store_indicators(item, &gwp(Module::A13, None, 90.0), true, false)
        .unwrap();
    cache
        .store_indicators(item, &gwp(Module::A1, Some("brick-a1"), 90.0), true, true)
        .unwrap();
    cache
        .store_indicators(item, &gwp(Module::C4, Some("brick-c4"), 3.0), false, false)
        .unwrap();
    // Upsert keeps one row per key
    cache
        .store_indicators(item, &gwp(Module::C4, Some("brick-c4"), 4.0), false, false)
        .unwrap();

    cache.update("office").unwrap();
    assert_eq!(total(&cache, item, "A1-3"), Some(0.0));
    assert_eq!(total(&cache, item, "total"), Some(4.0));
    assert!(cache.check().unwrap().is_empty());
}

#[test]
fn test_check_finds_double_counted_a13() {
    let cache = ResultCache::open_in_memory().unwrap();
    let wall = cache.store_element(&scope(), &element("wall", "331", &[]), None).unwrap();
    let item = component(&cache, wall, "concrete", 1.0, 10.0);
    cache
        .store_indicators(item, &gwp(Module::A1, Some("concrete-a1"), 4.0), false, false)
        .unwrap();
    cache.update("office").unwrap();

    let issues = cache.check().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].item_id, item);
    assert!(issues[0].message.contains("double counted"));
}

#[test]
fn test_nested_atomic_failure_rolls_back_only_inner_work() {
    let cache = ResultCache::open_in_memory().unwrap();

    cache
        .atomically("outer", |c| {
            c.ensure_variant_item(&scope())?;
            let inner: Result<()> = c.atomically("inner", |c| {
                c.ensure_element_type_item(&scope(), &"331".parse().unwrap())?;
                Err(miette::miette!("boom"))
            });
            assert!(inner.is_err());
            Ok(())
        })
        .unwrap();

    assert!(cache.variant_item("v1").unwrap().is_some());
    assert!(cache.element_type_item("v1", "300").unwrap().is_none());
    assert_eq!(cache.statistics().unwrap().total_items, 1);
}

#[test]
fn test_changed_usages_outdate_the_project() {
    let cache = ResultCache::open_in_memory().unwrap();
    let usages = LifeCycleUsages::default();
    cache.store_project_settings("office", &usages).unwrap();

    let demand = cache
        .store_final_energy_demand(&scope(), "heat", &Quantity::new(1.0, Unit::kwh()))
        .unwrap();
    cache
        .store_indicators(demand, &gwp(Module::D, Some("gas-d"), -2.0), false, false)
        .unwrap();
    cache.update("office").unwrap();
    let root = cache.variant_item("v1").unwrap().unwrap();
    assert_eq!(total(&cache, root, "total"), None);

    cache.store_project_settings("office", &usages).unwrap();
    assert_eq!(cache.count_outdated("office").unwrap(), 0);

    let with_d = usages.with_overrides([LifeCycleUsage::new(Module::D, true, false, false)]);
    cache.store_project_settings("office", &with_d).unwrap();
    assert_eq!(cache.load_usages("office").unwrap(), Some(with_d));
    assert_eq!(cache.count_outdated("office").unwrap(), 2);

    cache.update("office").unwrap();
    assert_eq!(total(&cache, root, "total"), Some(-2.0));
}

#[test]
fn test_variant_moving_project_is_rebuilt() {
    let cache = ResultCache::open_in_memory().unwrap();
    let first = cache.ensure_variant_item(&scope()).unwrap();
    cache
        .ensure_element_type_item(&scope(), &"331".parse().unwrap())
        .unwrap();

    let moved = CacheScope::new("school", "v1");
    let second = cache.ensure_variant_item(&moved).unwrap();
    assert_ne!(first, second);
    assert_eq!(cache.statistics().unwrap().total_items, 1);
    assert_eq!(cache.cached_projects().unwrap(), vec!["school".to_string()]);
}

#[test]
fn test_variant_status_and_removal() {
    let cache = ResultCache::open_in_memory().unwrap();
    let wall = cache.store_element(&scope(), &element("wall", "331", &[]), None).unwrap();
    component(&cache, wall, "concrete", 1.0, 10.0);
    cache.record_variant_source(&scope(), "abc").unwrap();

    let status = cache.variant_status("v1").unwrap().unwrap();
    assert_eq!(status.items, 6);
    assert_eq!(status.outdated_items, 6);
    assert_eq!(status.source_hash.as_deref(), Some("abc"));

    cache.update("office").unwrap();
    assert_eq!(cache.variant_status("v1").unwrap().unwrap().outdated_items, 0);
    assert_eq!(cache.variant_source("v1").unwrap().as_deref(), Some("abc"));

    assert!(cache.remove_variant("v1").unwrap());
    assert!(cache.variant_status("v1").unwrap().is_none());
    assert_eq!(cache.statistics().unwrap().total_items, 0);
    assert!(cache.total_effects("v1").is_err());
}

#[test]
fn test_query_raw_is_read_only() {
    let cache = ResultCache::open_in_memory().unwrap();
    assert!(cache.query_raw("DELETE FROM items").is_err());
    let columns = cache.query_columns("SELECT ident, phase FROM life_cycles").unwrap();
    assert_eq!(columns, vec!["ident", "phase"]);
}

#[test]
fn test_clear_keeps_life_cycles() {
    let cache = ResultCache::open_in_memory().unwrap();
    let wall = cache.store_element(&scope(), &element("wall", "331", &[]), None).unwrap();
    component(&cache, wall, "concrete", 1.0, 10.0);

    cache.clear().unwrap();
    assert_eq!(cache.statistics().unwrap().total_items, 0);
    assert_eq!(cache.statistics().unwrap().indicator_values, 0);
    assert!(!cache.query_raw("SELECT * FROM life_cycles").unwrap().is_empty());
}
