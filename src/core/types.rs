use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::LoanError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanType {
    Home,
    Vehicle,
    Personal,
}

impl fmt::Display for LoanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoanType::Home => "home",
            LoanType::Vehicle => "vehicle",
            LoanType::Personal => "personal",
        };
        f.write_str(name)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// Rate adjustments in percentage points, added to a product's base rate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskBands {
    pub excellent: f64,
    pub good: f64,
    pub fair: f64,
    pub poor: f64,
}

impl RiskBands {
    pub fn adjustment(&self, band: RiskBand) -> f64 {
        match band {
            RiskBand::Excellent => self.excellent,
            RiskBand::Good => self.good,
            RiskBand::Fair => self.fair,
            RiskBand::Poor => self.poor,
        }
    }
}

/// Longest term accepted anywhere; bounds the schedule length.
pub const MAX_TERM_MONTHS: u32 = 1200;

/// Validated loan terms. Construction fails instead of letting NaN or
/// infinity leak out of the payment formulas.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LoanTerms {
    pub principal: f64,
    pub annual_rate_percent: f64,
    pub term_months: u32,
}

impl LoanTerms {
    pub fn new(principal: f64, annual_rate_percent: f64, term_months: u32) -> Result<Self, LoanError> {
        if !principal.is_finite() || principal <= 0.0 {
            return Err(LoanError::invalid("principal", "must be a positive finite amount"));
        }
        if !annual_rate_percent.is_finite() || annual_rate_percent < 0.0 {
            return Err(LoanError::invalid(
                "annual_rate_percent",
                "must be a non-negative finite percentage",
            ));
        }
        if term_months == 0 {
            return Err(LoanError::invalid("term_months", "must be >= 1"));
        }
        if term_months > MAX_TERM_MONTHS {
            return Err(LoanError::invalid(
                "term_months",
                format!("must be <= {MAX_TERM_MONTHS}"),
            ));
        }
        Ok(Self {
            principal,
            annual_rate_percent,
            term_months,
        })
    }

    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate_percent / 12.0 / 100.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationRow {
    pub month: u32,
    pub payment: f64,
    pub principal: f64,
    pub interest: f64,
    pub balance: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct ProductConstraints {
    pub min_amount: f64,
    pub max_amount: f64,
    pub min_term_months: u32,
    pub max_term_months: u32,
    pub base_rate: f64,
    #[serde(default)]
    pub max_ltv: Option<f64>,
    pub max_dti: f64,
    pub origination_fee_percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct LoanProduct {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub loan_type: LoanType,
    #[serde(flatten)]
    pub constraints: ProductConstraints,
    #[serde(default)]
    pub risk_bands: RiskBands,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl LoanProduct {
    /// Base rate shifted by the band's adjustment, or the base rate itself.
    pub fn rate_for(&self, band: Option<RiskBand>) -> f64 {
        let base = self.constraints.base_rate;
        match band {
            Some(band) => base + self.risk_bands.adjustment(band),
            None => base,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EligibilityInputs {
    pub loan_amount: f64,
    pub term_months: u32,
    pub property_value: Option<f64>,
    pub annual_income: f64,
    pub constraints: ProductConstraints,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RiskAssessment {
    pub monthly_payment: f64,
    pub ltv_ratio: Option<f64>,
    pub dti_ratio: f64,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimulationRequest {
    pub product_id: u32,
    pub loan_type: Option<LoanType>,
    pub loan_amount: f64,
    pub term_months: u32,
    pub annual_income: f64,
    pub property_value: Option<f64>,
    pub risk_band: Option<RiskBand>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub product_id: u32,
    pub loan_type: LoanType,
    pub loan_amount: f64,
    pub term_months: u32,
    pub interest_rate: f64,
    pub monthly_payment: f64,
    pub total_payment: f64,
    pub total_interest: f64,
    pub origination_fee: f64,
    pub apr: f64,
    pub apr_converged: bool,
    pub ltv_ratio: Option<f64>,
    pub dti_ratio: f64,
    pub amortization: Vec<AmortizationRow>,
}
