use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::AppError;

/// Greenhouse-gas accounting scope of an emission factor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "emission_scope", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum EmissionScope {
    Scope1,
    Scope2,
    Scope3,
}

impl EmissionScope {
    /// The fixed category set for this scope. A material's category must be
    /// one of these.
    pub fn categories(self) -> &'static [&'static str] {
        match self {
            EmissionScope::Scope1 => &[
                "stationary-combustion",
                "mobile-combustion",
                "fugitive-emissions",
                "process-emissions",
            ],
            EmissionScope::Scope2 => &["purchased-electricity", "purchased-heat", "purchased-steam"],
            EmissionScope::Scope3 => &[
                "purchased-goods",
                "capital-goods",
                "fuel-energy-related",
                "upstream-transport",
                "waste-generated",
                "business-travel",
                "employee-commuting",
                "downstream-transport",
                "use-of-sold-products",
                "end-of-life",
            ],
        }
    }

    pub fn is_valid_category(self, category: &str) -> bool {
        self.categories().contains(&category)
    }
}

/// Emission factor record in the organization's material library.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Material {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub category: String,
    pub scope: EmissionScope,
    /// Unit the factor is expressed per (kg, kWh, km, ...).
    pub unit: String,
    /// tCO2e per unit. Never negative.
    pub emission_factor: Decimal,
    pub source: Option<String>,
    pub material_code: Option<String>,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validate the scope/category pairing and factor sign before persisting.
pub fn validate_material(
    scope: EmissionScope,
    category: &str,
    emission_factor: Decimal,
) -> Result<(), AppError> {
    if emission_factor < Decimal::ZERO {
        return Err(AppError::InvalidInput(
            "Emission factor must not be negative".to_string(),
        ));
    }
    if !scope.is_valid_category(category) {
        return Err(AppError::InvalidInput(format!(
            "Category '{}' is not valid for {:?}",
            category, scope
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_must_match_scope() {
        assert!(EmissionScope::Scope1.is_valid_category("mobile-combustion"));
        assert!(!EmissionScope::Scope1.is_valid_category("business-travel"));
        assert!(EmissionScope::Scope3.is_valid_category("business-travel"));
    }

    #[test]
    fn test_validate_material_rejects_negative_factor() {
        let err = validate_material(
            EmissionScope::Scope2,
            "purchased-electricity",
            Decimal::NEGATIVE_ONE,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_validate_material_accepts_zero_factor() {
        assert!(validate_material(
            EmissionScope::Scope2,
            "purchased-electricity",
            Decimal::ZERO
        )
        .is_ok());
    }

    #[test]
    fn test_validate_material_rejects_cross_scope_category() {
        let err =
            validate_material(EmissionScope::Scope1, "purchased-electricity", Decimal::ONE)
                .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
