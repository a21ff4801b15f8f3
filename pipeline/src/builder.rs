//! Record builder: assembles aggregator outputs and top-level scalars into
//! one flat record draft.
//!
//! Assembly order: core identifiers, unit-converted system sizes, status
//! fields, customer display name, energy production, array aggregates,
//! first string inverter, bill-of-materials fields, raw JSON snapshots,
//! derived MLPE type. Values set here are never overwritten by the
//! defaulting pass.

use crate::aggregate::{self, ArrayRollup, BomCategory, BomRollup};
use crate::coerce::{attr, coerce_numeric, coerce_text, round2, truncate_chars};
use crate::errors::TransformError;
use crate::record::RecordDraft;
use crate::registry::FieldId;
use serde::Serialize;
use serde_json::Value;

const SHORT_TEXT_MAX: usize = 255;

type JsonObject = serde_json::Map<String, Value>;

/// Build a record draft from a design summary envelope and an optional
/// project document. Fails only on whole-record problems; callers fall back
/// to [`fallback_record`].
pub fn build_record(
    envelope: &Value,
    project: Option<&Value>,
) -> Result<RecordDraft, TransformError> {
    let design = envelope
        .get("design")
        .and_then(Value::as_object)
        .ok_or(TransformError::MissingDesign)?;

    let mut draft = RecordDraft::new();

    draft.set_text(
        FieldId::DesignId,
        coerce_text(attr(design, "design_id"), "N/A", SHORT_TEXT_MAX),
    );
    draft.set_text(
        FieldId::ProjectId,
        coerce_text(attr(design, "project_id"), "N/A", SHORT_TEXT_MAX),
    );

    // system sizes arrive in watts
    draft.set_number(
        FieldId::SystemSizeDcKw,
        round2(coerce_numeric(attr(design, "system_size_stc"), 0.0) / 1000.0),
    );
    draft.set_number(
        FieldId::SystemSizeAcKw,
        round2(coerce_numeric(attr(design, "system_size_ac"), 0.0) / 1000.0),
    );

    draft.set_text(FieldId::DesignStatus, "Installed");
    draft.set_text(FieldId::InstallStatus, "Installed");

    if let Some(name) = customer_display_name(project) {
        draft.set_text(FieldId::CustomerName, name);
    }

    if let Some(energy) = object_field(design, "energy_production") {
        apply_energy(&mut draft, energy)?;
    }

    let mut array_rollup = None;
    if let Some(arrays) = array_field(design, "arrays") {
        array_rollup = Some(apply_arrays(&mut draft, arrays)?);
    }

    if let Some(inverters) = array_field(design, "string_inverters") {
        apply_string_inverters(&mut draft, inverters);
    }

    let mut bom_rollup = None;
    if let Some(items) = array_field(design, "bill_of_materials") {
        bom_rollup = Some(apply_bom(&mut draft, items)?);
    }

    draft.set_text(
        FieldId::RawDesign,
        capped_json(envelope, FieldId::RawDesign)?,
    );

    if let Some(mlpe) = mlpe_type(array_rollup.as_ref(), bom_rollup.as_ref()) {
        draft.set_text(FieldId::MlpeType, mlpe);
    }

    Ok(draft)
}

/// Minimal two-field record emitted when the builder fails outright, so the
/// event still leaves a trace in the target table.
pub fn fallback_record(envelope: &Value, err: &TransformError) -> RecordDraft {
    let design_id = envelope
        .get("design")
        .and_then(|design| design.get("design_id"))
        .or_else(|| envelope.get("design_id"))
        .map(|id| coerce_text(id, "N/A", SHORT_TEXT_MAX))
        .unwrap_or_else(|| "N/A".to_string());

    let mut draft = RecordDraft::new();
    draft.set_text(FieldId::DesignId, design_id);
    draft.set_text(
        FieldId::SyncError,
        truncate_chars(&err.to_string(), SHORT_TEXT_MAX).to_string(),
    );
    draft
}

fn apply_energy(draft: &mut RecordDraft, energy: &JsonObject) -> Result<(), TransformError> {
    draft.set_number(
        FieldId::AnnualProduction,
        coerce_numeric(attr(energy, "annual"), 0.0),
    );
    draft.set_text(FieldId::AnnualOffset, offset_text(attr(energy, "annual_offset")));
    draft.set_bool(
        FieldId::ProductionUpToDate,
        attr(energy, "up_to_date").as_bool().unwrap_or(false),
    );

    if let Some(monthly) = energy.get("monthly").filter(|m| !m.is_null()) {
        draft.set_text(
            FieldId::MonthlyProduction,
            capped_json(monthly, FieldId::MonthlyProduction)?,
        );
    }
    Ok(())
}

fn apply_arrays(
    draft: &mut RecordDraft,
    arrays: &[Value],
) -> Result<ArrayRollup, TransformError> {
    draft.set_number(FieldId::ArrayCount, arrays.len() as f64);

    let rollup = aggregate::aggregate_arrays(arrays);

    draft.set_number(FieldId::TotalModules, rollup.total_modules);
    draft.set_number(FieldId::ModuleQty, rollup.total_modules);
    draft.set_number(FieldId::PortraitModules, rollup.portrait_modules);
    draft.set_number(FieldId::LandscapeModules, rollup.landscape_modules);

    if let Some(module) = &rollup.primary_module {
        draft.set_text(FieldId::ModuleName, module.name.clone());
        draft.set_text(FieldId::ModuleId, module.id.clone());
        draft.set_number(FieldId::ModuleRating, module.rating_stc);
        draft.set_number(FieldId::ModuleRatingStc, module.rating_stc);
    }

    if let Some(micro) = &rollup.primary_microinverter {
        draft.set_text(FieldId::MicroinverterId, micro.id.clone());
        draft.set_text(FieldId::MicroinverterName, micro.name.clone());
        draft.set_number(FieldId::MicroinverterRatedPower, micro.rated_power);
        draft.set_number(FieldId::MicroinverterCount, rollup.microinverter_total);
    }

    if let Some(optimizer) = &rollup.primary_optimizer {
        draft.set_text(FieldId::OptimizerId, optimizer.id.clone());
        draft.set_text(FieldId::OptimizerName, optimizer.name.clone());
        draft.set_number(FieldId::OptimizerCount, rollup.optimizer_total);
    }

    if let Some(solar_access) = rollup.avg_solar_access {
        draft.set_number(FieldId::AvgSolarAccess, solar_access);
    }
    if let Some(tsrf) = rollup.avg_tsrf {
        draft.set_number(FieldId::AvgTsrf, tsrf);
    }

    draft.set_text(FieldId::RawArrays, capped_json(&arrays, FieldId::RawArrays)?);

    Ok(rollup)
}

fn apply_string_inverters(draft: &mut RecordDraft, inverters: &[Value]) {
    draft.set_number(FieldId::StringInverterCount, inverters.len() as f64);

    if let Some(first) = inverters.first().and_then(Value::as_object) {
        draft.set_text(
            FieldId::InverterName,
            coerce_text(attr(first, "name"), "N/A", SHORT_TEXT_MAX),
        );
        draft.set_text(
            FieldId::InverterId,
            coerce_text(attr(first, "id"), "N/A", SHORT_TEXT_MAX),
        );
        draft.set_number(
            FieldId::InverterRatedPower,
            coerce_numeric(attr(first, "rated_power"), 0.0),
        );
    }
}

fn apply_bom(draft: &mut RecordDraft, items: &[Value]) -> Result<BomRollup, TransformError> {
    let rollup = aggregate::aggregate_bom(items);
    draft.set_number(FieldId::BomLineCount, rollup.line_count as f64);

    // per-category scalar fields; qty columns exist only where the table has them
    let mapping: &[(BomCategory, FieldId, Option<FieldId>, Option<FieldId>)] = &[
        (
            BomCategory::Modules,
            FieldId::ModuleSku,
            Some(FieldId::ModuleManufacturer),
            None,
        ),
        (
            BomCategory::Inverters,
            FieldId::InverterSku,
            Some(FieldId::InverterManufacturer),
            None,
        ),
        (
            BomCategory::Microinverters,
            FieldId::MicroinverterSku,
            Some(FieldId::MicroinverterManufacturer),
            Some(FieldId::MicroinverterQty),
        ),
        (
            BomCategory::DcOptimizers,
            FieldId::OptimizerSku,
            Some(FieldId::OptimizerManufacturer),
            Some(FieldId::OptimizerQty),
        ),
        (BomCategory::Batteries, FieldId::BatterySku, None, None),
        (
            BomCategory::CombinerBoxes,
            FieldId::CombinerSku,
            None,
            Some(FieldId::CombinerQty),
        ),
        (
            BomCategory::Disconnects,
            FieldId::DisconnectSku,
            None,
            Some(FieldId::DisconnectQty),
        ),
        (
            BomCategory::Racking,
            FieldId::RackingSku,
            None,
            Some(FieldId::RackingQty),
        ),
    ];

    for (category, sku_field, mfr_field, qty_field) in mapping {
        let Some(line) = rollup.line(*category) else {
            continue;
        };
        draft.set_text(*sku_field, line.sku.clone());
        if let Some(mfr_field) = mfr_field {
            draft.set_text(*mfr_field, line.manufacturer.clone());
        }
        if let Some(qty_field) = qty_field {
            draft.set_number(*qty_field, line.quantity);
        }
    }

    draft.set_text(FieldId::RawBom, capped_json(&items, FieldId::RawBom)?);

    Ok(rollup)
}

/// DC optimizer takes precedence over microinverter; this tie-break is part
/// of the field contract.
fn mlpe_type(arrays: Option<&ArrayRollup>, bom: Option<&BomRollup>) -> Option<&'static str> {
    let bom_qty = |category: BomCategory| {
        bom.and_then(|rollup| rollup.line(category))
            .map_or(0.0, |line| line.quantity)
    };

    let optimizer_total =
        arrays.map_or(0.0, |r| r.optimizer_total) + bom_qty(BomCategory::DcOptimizers);
    let microinverter_total =
        arrays.map_or(0.0, |r| r.microinverter_total) + bom_qty(BomCategory::Microinverters);

    if optimizer_total > 0.0 {
        Some("DC Optimizer")
    } else if microinverter_total > 0.0 {
        Some("Microinverter")
    } else {
        None
    }
}

fn customer_display_name(project: Option<&Value>) -> Option<String> {
    let project = project?.as_object()?;

    if let Some(customer) = project.get("customer").and_then(Value::as_object) {
        let first = coerce_text(attr(customer, "first_name"), "", SHORT_TEXT_MAX);
        let last = coerce_text(attr(customer, "last_name"), "", SHORT_TEXT_MAX);
        let full = format!("{first} {last}").trim().to_string();
        if !full.is_empty() {
            return Some(full);
        }

        let name = coerce_text(attr(customer, "name"), "", SHORT_TEXT_MAX);
        if !name.trim().is_empty() {
            return Some(name.trim().to_string());
        }
    }

    let name = coerce_text(attr(project, "name"), "", SHORT_TEXT_MAX);
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Offset may arrive as `95`, `"95"`, or `"95%"`.
fn offset_text(value: &Value) -> String {
    coerce_text(value, "0", SHORT_TEXT_MAX)
        .replace('%', "")
        .trim()
        .to_string()
}

/// Serialize a sub-document and prefix-truncate it to the field's declared
/// cap. Truncation is by character, not by re-serialization; downstream
/// parse failures on capped snapshots are tolerated by the table contract.
fn capped_json<T: Serialize>(value: &T, field: FieldId) -> Result<String, TransformError> {
    let serialized = serde_json::to_string(value)?;
    let cap = field.spec().max_chars.unwrap_or(usize::MAX);
    Ok(truncate_chars(&serialized, cap).to_string())
}

fn object_field<'a>(design: &'a JsonObject, key: &str) -> Option<&'a JsonObject> {
    design.get(key).and_then(Value::as_object).filter(|o| !o.is_empty())
}

fn array_field<'a>(design: &'a JsonObject, key: &str) -> Option<&'a Vec<Value>> {
    design.get(key).and_then(Value::as_array).filter(|a| !a.is_empty())
}
