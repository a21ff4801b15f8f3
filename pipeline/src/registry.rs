//! The field registry: the fixed contract between the pipeline and the
//! target table.
//!
//! Every field the upsert payload may carry is declared here, with its
//! Quickbase field id, type class, default value, and (for size-limited
//! fields) its character cap. The registry is the single source of truth for
//! the defaulting pass and the record validator; it must be kept in lockstep
//! with the target table's actual column set. An identifier the table does
//! not know is silently dropped on the remote side, so drift here means
//! silent data loss.

use crate::record::FieldValue;

/// Target field identifiers, one variant per table column.
///
/// Discriminants are the wire-format field ids. Keeping these as an enum
/// (rather than bare integers) makes an unknown or mistyped id a compile
/// error instead of a silently dropped column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum FieldId {
    DesignId = 6,
    ProjectId = 7,
    CustomerName = 8,
    RawDesign = 10,
    DesignStatus = 16,
    InstallStatus = 18,
    ArrayCount = 19,
    TotalModules = 20,
    SystemSizeDcKw = 21,
    SystemSizeAcKw = 22,
    PortraitModules = 23,
    LandscapeModules = 24,
    StringInverterCount = 25,
    OptimizerQty = 26,
    MicroinverterQty = 27,
    RawArrays = 29,
    ModuleQty = 30,
    RackingQty = 32,
    CombinerQty = 36,
    DisconnectQty = 37,
    BomLineCount = 44,
    ProductionUpToDate = 45,
    ModuleName = 46,
    ModuleRatingStc = 47,
    InverterName = 48,
    AnnualProduction = 51,
    AnnualOffset = 52,
    MonthlyProduction = 53,
    InverterId = 54,
    InverterRatedPower = 56,
    MicroinverterId = 57,
    MicroinverterName = 58,
    MicroinverterCount = 59,
    MicroinverterRatedPower = 60,
    ModuleId = 61,
    ModuleRating = 62,
    OptimizerId = 63,
    OptimizerName = 64,
    AvgSolarAccess = 65,
    AvgTsrf = 67,
    ModuleManufacturer = 68,
    InverterManufacturer = 69,
    OptimizerManufacturer = 70,
    OptimizerCount = 71,
    MicroinverterManufacturer = 72,
    RawBom = 73,
    ModuleSku = 80,
    InverterSku = 81,
    OptimizerSku = 82,
    MicroinverterSku = 83,
    RackingSku = 84,
    BatterySku = 85,
    CombinerSku = 86,
    DisconnectSku = 87,
    MlpeType = 88,
    SyncError = 90,
}

/// Type class of a target field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldClass {
    Numeric,
    Text,
    Boolean,
    /// A JSON document serialized into a size-limited text column.
    Json,
}

/// Declared shape of a single registry field.
#[derive(Debug)]
pub struct FieldSpec {
    pub id: FieldId,
    pub class: FieldClass,
    /// Default for text and json fields; numeric defaults to 0 and boolean
    /// to false regardless of this value.
    pub text_default: &'static str,
    /// Character cap for size-limited text columns.
    pub max_chars: Option<usize>,
}

impl FieldSpec {
    /// The value the defaulting pass inserts when the builder left this
    /// field unset.
    pub fn default_value(&self) -> FieldValue {
        match self.class {
            FieldClass::Numeric => FieldValue::Number(0.0),
            FieldClass::Boolean => FieldValue::Bool(false),
            FieldClass::Text | FieldClass::Json => FieldValue::Text(self.text_default.to_string()),
        }
    }
}

const fn numeric(id: FieldId) -> FieldSpec {
    FieldSpec {
        id,
        class: FieldClass::Numeric,
        text_default: "",
        max_chars: None,
    }
}

const fn text(id: FieldId, default: &'static str) -> FieldSpec {
    FieldSpec {
        id,
        class: FieldClass::Text,
        text_default: default,
        max_chars: None,
    }
}

const fn json(id: FieldId, default: &'static str, max_chars: usize) -> FieldSpec {
    FieldSpec {
        id,
        class: FieldClass::Json,
        text_default: default,
        max_chars: Some(max_chars),
    }
}

/// The canonical registry, ordered by field id.
pub const REGISTRY: &[FieldSpec] = &[
    text(FieldId::DesignId, "N/A"),
    text(FieldId::ProjectId, "N/A"),
    text(FieldId::CustomerName, "N/A"),
    json(FieldId::RawDesign, "{}", 10_000),
    text(FieldId::DesignStatus, "Installed"),
    text(FieldId::InstallStatus, "Installed"),
    numeric(FieldId::ArrayCount),
    numeric(FieldId::TotalModules),
    numeric(FieldId::SystemSizeDcKw),
    numeric(FieldId::SystemSizeAcKw),
    numeric(FieldId::PortraitModules),
    numeric(FieldId::LandscapeModules),
    numeric(FieldId::StringInverterCount),
    numeric(FieldId::OptimizerQty),
    numeric(FieldId::MicroinverterQty),
    json(FieldId::RawArrays, "[]", 1_000),
    numeric(FieldId::ModuleQty),
    numeric(FieldId::RackingQty),
    numeric(FieldId::CombinerQty),
    numeric(FieldId::DisconnectQty),
    numeric(FieldId::BomLineCount),
    FieldSpec {
        id: FieldId::ProductionUpToDate,
        class: FieldClass::Boolean,
        text_default: "",
        max_chars: None,
    },
    text(FieldId::ModuleName, "N/A"),
    numeric(FieldId::ModuleRatingStc),
    text(FieldId::InverterName, "N/A"),
    numeric(FieldId::AnnualProduction),
    text(FieldId::AnnualOffset, "0"),
    json(FieldId::MonthlyProduction, "[]", 5_000),
    text(FieldId::InverterId, "N/A"),
    numeric(FieldId::InverterRatedPower),
    text(FieldId::MicroinverterId, "N/A"),
    text(FieldId::MicroinverterName, "N/A"),
    numeric(FieldId::MicroinverterCount),
    numeric(FieldId::MicroinverterRatedPower),
    text(FieldId::ModuleId, "N/A"),
    numeric(FieldId::ModuleRating),
    text(FieldId::OptimizerId, "N/A"),
    text(FieldId::OptimizerName, "N/A"),
    numeric(FieldId::AvgSolarAccess),
    numeric(FieldId::AvgTsrf),
    text(FieldId::ModuleManufacturer, "N/A"),
    text(FieldId::InverterManufacturer, "N/A"),
    text(FieldId::OptimizerManufacturer, "N/A"),
    numeric(FieldId::OptimizerCount),
    text(FieldId::MicroinverterManufacturer, "N/A"),
    json(FieldId::RawBom, "[]", 10_000),
    text(FieldId::ModuleSku, "N/A"),
    text(FieldId::InverterSku, "N/A"),
    text(FieldId::OptimizerSku, "N/A"),
    text(FieldId::MicroinverterSku, "N/A"),
    text(FieldId::RackingSku, "N/A"),
    text(FieldId::BatterySku, "N/A"),
    text(FieldId::CombinerSku, "N/A"),
    text(FieldId::DisconnectSku, "N/A"),
    text(FieldId::MlpeType, "N/A"),
    text(FieldId::SyncError, "N/A"),
];

impl FieldId {
    /// Wire-format field id.
    pub fn raw(self) -> u16 {
        self as u16
    }

    /// Resolve a wire-format id back to a registry field.
    pub fn from_raw(raw: u16) -> Option<FieldId> {
        REGISTRY
            .iter()
            .map(|spec| spec.id)
            .find(|id| *id as u16 == raw)
    }

    /// Declared shape of this field.
    pub fn spec(self) -> &'static FieldSpec {
        // REGISTRY covers every variant; see tests.
        REGISTRY
            .iter()
            .find(|spec| spec.id == self)
            .expect("field missing from registry")
    }
}
