//! Aggregation over the repeated sub-structures of a design document.
//!
//! Walks the `arrays` sequence (module groups, microinverters, DC optimizers,
//! shading) and the `bill_of_materials` sequence, producing running totals,
//! first-encountered primary selections, and shading averages. A malformed
//! group or line is logged and skipped; it never aborts the rest of the walk.

use crate::coerce::{attr, coerce_numeric, coerce_text, round2};
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

const NAME_MAX: usize = 255;

/// First-encountered module group (first-group-wins, tie-break by encounter
/// order).
#[derive(Clone, Debug, PartialEq)]
pub struct PrimaryModule {
    pub name: String,
    pub id: String,
    pub rating_stc: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrimaryMicroinverter {
    pub id: String,
    pub name: String,
    pub rated_power: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrimaryOptimizer {
    pub id: String,
    pub name: String,
}

/// Aggregates derived from the `arrays` sequence.
#[derive(Debug, Default)]
pub struct ArrayRollup {
    pub total_modules: f64,
    pub portrait_modules: f64,
    pub landscape_modules: f64,
    pub primary_module: Option<PrimaryModule>,
    pub microinverter_total: f64,
    pub primary_microinverter: Option<PrimaryMicroinverter>,
    pub optimizer_total: f64,
    pub primary_optimizer: Option<PrimaryOptimizer>,
    /// Mean annual solar access over the groups that supplied shading data,
    /// rounded to two decimals. None when no group carried shading.
    pub avg_solar_access: Option<f64>,
    pub avg_tsrf: Option<f64>,
}

enum Orientation {
    Portrait,
    Landscape,
}

pub fn aggregate_arrays(arrays: &[Value]) -> ArrayRollup {
    let mut rollup = ArrayRollup::default();
    let mut solar_access_sum = 0.0;
    let mut tsrf_sum = 0.0;
    let mut shading_groups = 0u32;

    for (index, group) in arrays.iter().enumerate() {
        let Some(group) = group.as_object() else {
            tracing::warn!(index, "array group is not an object, skipping");
            continue;
        };

        if let Some(module) = sub_group(group, "module") {
            let count = coerce_numeric(attr(module, "count"), 0.0);
            rollup.total_modules += count;

            match classify_orientation(module, index) {
                Orientation::Landscape => rollup.landscape_modules += count,
                Orientation::Portrait => rollup.portrait_modules += count,
            }

            if rollup.primary_module.is_none() {
                rollup.primary_module = Some(PrimaryModule {
                    name: coerce_text(attr(module, "name"), "N/A", NAME_MAX),
                    id: coerce_text(attr(module, "id"), "N/A", NAME_MAX),
                    rating_stc: coerce_numeric(attr(module, "rating_stc"), 0.0),
                });
            }
        }

        if let Some(micro) = sub_group(group, "microinverter") {
            rollup.microinverter_total += coerce_numeric(attr(micro, "count"), 0.0);
            if rollup.primary_microinverter.is_none() {
                rollup.primary_microinverter = Some(PrimaryMicroinverter {
                    id: coerce_text(attr(micro, "id"), "N/A", NAME_MAX),
                    name: coerce_text(attr(micro, "name"), "N/A", NAME_MAX),
                    rated_power: coerce_numeric(attr(micro, "rated_power"), 0.0),
                });
            }
        }

        if let Some(optimizer) = sub_group(group, "dc_optimizer") {
            rollup.optimizer_total += coerce_numeric(attr(optimizer, "count"), 0.0);
            if rollup.primary_optimizer.is_none() {
                rollup.primary_optimizer = Some(PrimaryOptimizer {
                    id: coerce_text(attr(optimizer, "id"), "N/A", NAME_MAX),
                    name: coerce_text(attr(optimizer, "name"), "N/A", NAME_MAX),
                });
            }
        }

        if let Some(shading) = sub_group(group, "shading") {
            solar_access_sum += annual_ratio(shading, "solar_access");
            tsrf_sum += annual_ratio(shading, "total_solar_resource_fraction");
            shading_groups += 1;
        }
    }

    if shading_groups > 0 {
        // means over the groups that supplied shading data, not all groups
        let n = f64::from(shading_groups);
        rollup.avg_solar_access = Some(round2(solar_access_sum / n));
        rollup.avg_tsrf = Some(round2(tsrf_sum / n));
    }

    let bucketed = rollup.portrait_modules + rollup.landscape_modules;
    if (bucketed - rollup.total_modules).abs() > f64::EPSILON {
        tracing::warn!(
            total = rollup.total_modules,
            portrait = rollup.portrait_modules,
            landscape = rollup.landscape_modules,
            "orientation buckets do not sum to module total"
        );
    }

    rollup
}

/// Non-empty object sub-group, or None. Empty objects are treated as absent,
/// matching how the design service elides unused equipment groups.
fn sub_group<'a>(
    group: &'a serde_json::Map<String, Value>,
    key: &str,
) -> Option<&'a serde_json::Map<String, Value>> {
    group.get(key).and_then(Value::as_object).filter(|m| !m.is_empty())
}

/// Orientation lives on the module sub-group, not the array group itself.
/// Classification is a case-insensitive substring match; anything
/// unrecognized counts as portrait.
fn classify_orientation(module: &serde_json::Map<String, Value>, index: usize) -> Orientation {
    let orientation = coerce_text(attr(module, "orientation"), "", NAME_MAX).to_lowercase();
    if orientation.contains("landscape") {
        Orientation::Landscape
    } else if orientation.contains("portrait") {
        Orientation::Portrait
    } else {
        tracing::warn!(
            index,
            orientation = %orientation,
            "unrecognized module orientation, counting as portrait"
        );
        Orientation::Portrait
    }
}

fn annual_ratio(shading: &serde_json::Map<String, Value>, key: &str) -> f64 {
    let annual = shading
        .get(key)
        .and_then(Value::as_object)
        .map(|metric| attr(metric, "annual"))
        .unwrap_or(&Value::Null);
    coerce_numeric(annual, 0.0)
}

/// Known bill-of-materials categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BomCategory {
    Modules,
    Inverters,
    Microinverters,
    DcOptimizers,
    Batteries,
    CombinerBoxes,
    Disconnects,
    Racking,
}

impl BomCategory {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "modules" => Some(BomCategory::Modules),
            "inverters" => Some(BomCategory::Inverters),
            "microinverters" => Some(BomCategory::Microinverters),
            "dc_optimizers" => Some(BomCategory::DcOptimizers),
            "batteries" => Some(BomCategory::Batteries),
            "combiner_boxes" => Some(BomCategory::CombinerBoxes),
            "disconnects" => Some(BomCategory::Disconnects),
            // the design service renamed this category at some point; accept both
            "racking_components" | "racking" => Some(BomCategory::Racking),
            _ => None,
        }
    }
}

/// Rolled-up line for one category: quantities accumulate across lines,
/// SKU and manufacturer are the first line's (first-wins).
#[derive(Debug, Default, PartialEq)]
pub struct BomLine {
    pub sku: String,
    pub manufacturer: String,
    pub quantity: f64,
}

/// Aggregates derived from the `bill_of_materials` sequence.
#[derive(Debug, Default)]
pub struct BomRollup {
    /// Total number of lines, including unmapped categories.
    pub line_count: usize,
    lines: BTreeMap<BomCategory, BomLine>,
}

impl BomRollup {
    pub fn line(&self, category: BomCategory) -> Option<&BomLine> {
        self.lines.get(&category)
    }
}

pub fn aggregate_bom(items: &[Value]) -> BomRollup {
    let mut rollup = BomRollup {
        line_count: items.len(),
        ..Default::default()
    };

    for (index, item) in items.iter().enumerate() {
        let Some(item) = item.as_object() else {
            tracing::warn!(index, "BOM line is not an object, skipping");
            continue;
        };

        let raw_type = coerce_text(attr(item, "component_type"), "", NAME_MAX);
        let Some(category) = BomCategory::parse(&raw_type) else {
            // still counted in line_count and carried in the raw BOM snapshot
            tracing::debug!(index, component_type = %raw_type, "unmapped BOM category");
            continue;
        };

        let quantity = coerce_numeric(attr(item, "quantity"), 0.0);
        match rollup.lines.entry(category) {
            Entry::Vacant(slot) => {
                slot.insert(BomLine {
                    sku: coerce_text(attr(item, "sku"), "N/A", NAME_MAX),
                    manufacturer: coerce_text(attr(item, "manufacturer_name"), "N/A", NAME_MAX),
                    quantity,
                });
            }
            Entry::Occupied(mut line) => {
                line.get_mut().quantity += quantity;
            }
        }
    }

    rollup
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn module_array(count: impl Into<Value>, orientation: &str, id: &str) -> Value {
        json!({
            "module": {
                "count": count.into(),
                "orientation": orientation,
                "id": id,
                "name": format!("Module {id}"),
                "rating_stc": 400,
            }
        })
    }

    #[test]
    fn module_counts_accumulate() {
        let arrays = vec![
            module_array(10, "portrait", "A"),
            module_array(14, "landscape", "B"),
        ];
        let rollup = aggregate_arrays(&arrays);
        assert_eq!(rollup.total_modules, 24.0);
        assert_eq!(rollup.portrait_modules, 10.0);
        assert_eq!(rollup.landscape_modules, 14.0);
    }

    #[test]
    fn orientation_is_case_insensitive_substring() {
        let arrays = vec![
            module_array(3, "Landscape", "A"),
            module_array(4, "LANDSCAPE-mixed", "B"),
            module_array(5, "Portrait", "C"),
        ];
        let rollup = aggregate_arrays(&arrays);
        assert_eq!(rollup.landscape_modules, 7.0);
        assert_eq!(rollup.portrait_modules, 5.0);
    }

    #[test]
    fn unrecognized_orientation_defaults_to_portrait() {
        let arrays = vec![module_array(6, "sideways", "A"), json!({"module": {"count": 2}})];
        let rollup = aggregate_arrays(&arrays);
        assert_eq!(rollup.portrait_modules, 8.0);
        assert_eq!(rollup.landscape_modules, 0.0);
        // the invariant still holds for the default bucket
        assert_eq!(
            rollup.portrait_modules + rollup.landscape_modules,
            rollup.total_modules
        );
    }

    #[test]
    fn primary_module_is_first_encountered() {
        let arrays = vec![
            module_array(10, "portrait", "A"),
            module_array(14, "portrait", "B"),
        ];
        let rollup = aggregate_arrays(&arrays);
        assert_eq!(rollup.primary_module.unwrap().id, "A");
    }

    #[test]
    fn malformed_group_does_not_abort_the_walk() {
        let arrays = vec![
            json!({"module": {"count": "not-a-number", "orientation": "portrait"}}),
            json!("bogus"),
            module_array(5, "portrait", "B"),
        ];
        let rollup = aggregate_arrays(&arrays);
        // the bad count coerces to 0, the non-object group is skipped
        assert_eq!(rollup.total_modules, 5.0);
        assert_eq!(rollup.primary_module.unwrap().id, "N/A");
    }

    #[test]
    fn microinverter_and_optimizer_totals_accumulate() {
        let arrays = vec![
            json!({
                "microinverter": {"id": "m1", "name": "Micro One", "count": 10, "rated_power": 290},
                "dc_optimizer": {"id": "o1", "name": "Opt One", "count": 8},
            }),
            json!({
                "microinverter": {"id": "m2", "name": "Micro Two", "count": 4, "rated_power": 300},
                "dc_optimizer": {"id": "o2", "name": "Opt Two", "count": 2},
            }),
        ];
        let rollup = aggregate_arrays(&arrays);
        assert_eq!(rollup.microinverter_total, 14.0);
        assert_eq!(rollup.optimizer_total, 10.0);
        assert_eq!(rollup.primary_microinverter.unwrap().id, "m1");
        assert_eq!(rollup.primary_optimizer.unwrap().id, "o1");
    }

    #[test]
    fn shading_averages_only_contributing_groups() {
        let arrays = vec![
            json!({
                "shading": {
                    "solar_access": {"annual": 90.0},
                    "total_solar_resource_fraction": {"annual": 85.5},
                }
            }),
            json!({
                "shading": {
                    "solar_access": {"annual": 80.0},
                    "total_solar_resource_fraction": {"annual": 70.0},
                }
            }),
            // no shading data; must not dilute the mean
            json!({"module": {"count": 1, "orientation": "portrait"}}),
        ];
        let rollup = aggregate_arrays(&arrays);
        assert_eq!(rollup.avg_solar_access, Some(85.0));
        assert_eq!(rollup.avg_tsrf, Some(77.75));
    }

    #[test]
    fn no_shading_yields_none() {
        let arrays = vec![module_array(1, "portrait", "A")];
        let rollup = aggregate_arrays(&arrays);
        assert_eq!(rollup.avg_solar_access, None);
        assert_eq!(rollup.avg_tsrf, None);
    }

    #[test]
    fn racking_quantity_accumulates_with_first_sku() {
        let items = vec![
            json!({"component_type": "racking_components", "sku": "RAIL-1", "manufacturer_name": "RackCo", "quantity": 4}),
            json!({"component_type": "racking", "sku": "RAIL-2", "manufacturer_name": "RackCo", "quantity": 6}),
        ];
        let rollup = aggregate_bom(&items);
        let racking = rollup.line(BomCategory::Racking).unwrap();
        assert_eq!(racking.quantity, 10.0);
        assert_eq!(racking.sku, "RAIL-1");
    }

    #[test]
    fn categories_match_case_insensitively() {
        let items = vec![
            json!({"component_type": "Modules", "sku": "MOD-1", "manufacturer_name": "SunCo", "quantity": 24}),
        ];
        let rollup = aggregate_bom(&items);
        assert_eq!(rollup.line(BomCategory::Modules).unwrap().sku, "MOD-1");
    }

    #[test]
    fn unknown_categories_count_toward_line_count() {
        let items = vec![
            json!({"component_type": "wiring", "sku": "W-1", "quantity": 100}),
            json!({"component_type": "modules", "sku": "MOD-1", "quantity": 24}),
            json!(null),
        ];
        let rollup = aggregate_bom(&items);
        assert_eq!(rollup.line_count, 3);
        assert!(rollup.line(BomCategory::Modules).is_some());
    }
}
