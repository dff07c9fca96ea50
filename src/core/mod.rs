mod engine;
mod error;
mod products;
mod solver;
mod types;

pub use engine::{
    calculate_amortization_schedule, calculate_monthly_payment, check_eligibility, dti_ratio,
    ltv_ratio, origination_fee, simulate, total_interest, total_payment,
};
pub use error::LoanError;
pub use products::{ProductCatalog, default_products};
pub use solver::{AprEstimate, calculate_apr, solve_apr};
pub use types::{
    AmortizationRow, EligibilityInputs, LoanProduct, LoanTerms, LoanType, MAX_TERM_MONTHS,
    ProductConstraints, RiskAssessment, RiskBand, RiskBands, SimulationRequest, SimulationResult,
};
