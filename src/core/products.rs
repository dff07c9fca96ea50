use std::collections::HashSet;

use super::error::LoanError;
use super::types::{LoanProduct, LoanType, MAX_TERM_MONTHS, ProductConstraints, RiskBands};

/// Immutable set of loan products, built once at startup.
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    products: Vec<LoanProduct>,
}

impl ProductCatalog {
    pub fn new(products: Vec<LoanProduct>) -> Result<Self, LoanError> {
        let mut seen = HashSet::with_capacity(products.len());
        for product in &products {
            validate_product(product)?;
            if !seen.insert(product.id) {
                return Err(LoanError::InvalidProduct {
                    id: product.id,
                    reason: "duplicate product id".to_string(),
                });
            }
        }
        Ok(Self { products })
    }

    /// Home, vehicle and personal loan defaults.
    pub fn seeded() -> Self {
        Self {
            products: default_products(),
        }
    }

    pub fn get(&self, id: u32) -> Result<&LoanProduct, LoanError> {
        self.products
            .iter()
            .find(|product| product.id == id)
            .ok_or(LoanError::ProductNotFound(id))
    }

    pub fn active(&self) -> impl Iterator<Item = &LoanProduct> {
        self.products.iter().filter(|product| product.is_active)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

pub fn default_products() -> Vec<LoanProduct> {
    vec![
        LoanProduct {
            id: 1,
            name: "Home Loan Standard".to_string(),
            loan_type: LoanType::Home,
            constraints: ProductConstraints {
                min_amount: 50_000.0,
                max_amount: 1_000_000.0,
                min_term_months: 60,
                max_term_months: 360,
                base_rate: 4.5,
                max_ltv: Some(80.0),
                max_dti: 36.0,
                origination_fee_percent: 0.5,
            },
            risk_bands: RiskBands {
                excellent: -0.5,
                good: 0.0,
                fair: 1.0,
                poor: 2.5,
            },
            is_active: true,
        },
        LoanProduct {
            id: 2,
            name: "Auto Loan Standard".to_string(),
            loan_type: LoanType::Vehicle,
            constraints: ProductConstraints {
                min_amount: 5_000.0,
                max_amount: 100_000.0,
                min_term_months: 12,
                max_term_months: 84,
                base_rate: 3.9,
                max_ltv: Some(90.0),
                max_dti: 40.0,
                origination_fee_percent: 1.0,
            },
            risk_bands: RiskBands {
                excellent: -0.4,
                good: 0.0,
                fair: 1.5,
                poor: 3.0,
            },
            is_active: true,
        },
        LoanProduct {
            id: 3,
            name: "Personal Loan Standard".to_string(),
            loan_type: LoanType::Personal,
            constraints: ProductConstraints {
                min_amount: 1_000.0,
                max_amount: 50_000.0,
                min_term_months: 12,
                max_term_months: 60,
                base_rate: 6.9,
                max_ltv: None,
                max_dti: 43.0,
                origination_fee_percent: 2.0,
            },
            risk_bands: RiskBands {
                excellent: -1.0,
                good: 0.0,
                fair: 2.0,
                poor: 5.0,
            },
            is_active: true,
        },
    ]
}

fn validate_product(product: &LoanProduct) -> Result<(), LoanError> {
    let invalid = |reason: &str| LoanError::InvalidProduct {
        id: product.id,
        reason: reason.to_string(),
    };
    let c = &product.constraints;

    if !(c.min_amount.is_finite() && c.max_amount.is_finite()) || c.min_amount <= 0.0 {
        return Err(invalid("min_amount must be a positive finite amount"));
    }
    if c.max_amount < c.min_amount {
        return Err(invalid("max_amount must be >= min_amount"));
    }
    if c.min_term_months == 0 {
        return Err(invalid("min_term_months must be >= 1"));
    }
    if c.max_term_months < c.min_term_months {
        return Err(invalid("max_term_months must be >= min_term_months"));
    }
    if c.max_term_months > MAX_TERM_MONTHS {
        return Err(invalid("max_term_months exceeds the longest supported term"));
    }
    if !c.base_rate.is_finite() || c.base_rate < 0.0 {
        return Err(invalid("base_rate must be a non-negative percentage"));
    }
    if c.max_ltv.is_some_and(|ltv| !ltv.is_finite() || ltv <= 0.0) {
        return Err(invalid("max_ltv must be positive when set"));
    }
    if !c.max_dti.is_finite() || c.max_dti <= 0.0 {
        return Err(invalid("max_dti must be positive"));
    }
    if !c.origination_fee_percent.is_finite() || c.origination_fee_percent < 0.0 {
        return Err(invalid("origination_fee_percent must be non-negative"));
    }

    let bands = &product.risk_bands;
    for adjustment in [bands.excellent, bands.good, bands.fair, bands.poor] {
        if !adjustment.is_finite() || c.base_rate + adjustment < 0.0 {
            return Err(invalid("risk band adjustments must keep the rate non-negative"));
        }
    }
    Ok(())
}
