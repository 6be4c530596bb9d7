// ==========================================
// CRM ETL - domain type definitions
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Entity kind
// ==========================================
// The four fact tables, in referential load order. Dimensions are not
// entities: they are created on demand, entities never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Company,
    Contact,
    Opportunity,
    Activity,
}

impl EntityKind {
    /// All entity kinds in referential load order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Company,
        EntityKind::Contact,
        EntityKind::Opportunity,
        EntityKind::Activity,
    ];

    /// Target table name in the store.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Company => "companies",
            EntityKind::Contact => "contacts",
            EntityKind::Opportunity => "opportunities",
            EntityKind::Activity => "activities",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

// ==========================================
// Dimension kind
// ==========================================
// Lookup tables with surrogate integer keys, upserted on first sight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    Industry,
    Product,
    Stage,
    ContactStatus,
    ForecastCategory,
}

impl DimensionKind {
    pub const ALL: [DimensionKind; 5] = [
        DimensionKind::Industry,
        DimensionKind::Product,
        DimensionKind::Stage,
        DimensionKind::ContactStatus,
        DimensionKind::ForecastCategory,
    ];

    /// Target table name in the store.
    pub fn table(&self) -> &'static str {
        match self {
            DimensionKind::Industry => "industries",
            DimensionKind::Product => "products",
            DimensionKind::Stage => "stages",
            DimensionKind::ContactStatus => "contact_statuses",
            DimensionKind::ForecastCategory => "forecast_categories",
        }
    }
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

// ==========================================
// Text casing policy
// ==========================================
// Field validators are generic over casing; each entity transformer binds
// the policy per column (names UPPER, person names Title, subjects lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCase {
    Upper,
    Title,
    Lower,
    Preserve,
}

impl TextCase {
    /// Apply the casing policy to an already-stripped value.
    pub fn apply(&self, value: &str) -> String {
        match self {
            TextCase::Upper => value.to_uppercase(),
            TextCase::Lower => value.to_lowercase(),
            TextCase::Preserve => value.to_string(),
            TextCase::Title => value
                .split_whitespace()
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => {
                            first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                        }
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}
