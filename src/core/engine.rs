use super::error::LoanError;
use super::solver::solve_apr;
use super::types::{
    AmortizationRow, EligibilityInputs, LoanProduct, LoanTerms, RiskAssessment,
    SimulationRequest, SimulationResult,
};

pub fn calculate_monthly_payment(
    principal: f64,
    annual_rate_percent: f64,
    term_months: u32,
) -> Result<f64, LoanError> {
    let terms = LoanTerms::new(principal, annual_rate_percent, term_months)?;
    level_payment(&terms)
}

/// Month-by-month breakdown of a fixed-payment loan.
///
/// The running balance is carried at full precision; only the emitted fields
/// are rounded to cents. The schedule always has exactly `term_months` rows.
pub fn calculate_amortization_schedule(
    loan_amount: f64,
    annual_rate_percent: f64,
    term_months: u32,
) -> Result<Vec<AmortizationRow>, LoanError> {
    let terms = LoanTerms::new(loan_amount, annual_rate_percent, term_months)?;
    let monthly_rate = terms.monthly_rate();
    let payment = level_payment(&terms)?;

    let mut rows = Vec::with_capacity(term_months as usize);
    let mut balance = terms.principal;
    for month in 1..=terms.term_months {
        let interest = balance * monthly_rate;
        let principal = payment - interest;
        balance -= principal;
        rows.push(AmortizationRow {
            month,
            payment: round_cents(payment),
            principal: round_cents(principal),
            interest: round_cents(interest),
            balance: clamp_non_negative(round_cents(balance)),
        });
    }
    Ok(rows)
}

/// Loan-to-value in percent; only defined for a positive collateral value.
pub fn ltv_ratio(loan_amount: f64, property_value: Option<f64>) -> Option<f64> {
    property_value
        .filter(|value| *value > 0.0)
        .map(|value| loan_amount / value * 100.0)
}

pub fn dti_ratio(monthly_payment: f64, annual_income: f64) -> Result<f64, LoanError> {
    if !annual_income.is_finite() || annual_income <= 0.0 {
        return Err(LoanError::invalid("annual_income", "must be a positive finite amount"));
    }
    Ok(monthly_payment / (annual_income / 12.0) * 100.0)
}

pub fn origination_fee(loan_amount: f64, origination_fee_percent: f64) -> f64 {
    loan_amount * (origination_fee_percent / 100.0)
}

pub fn total_payment(monthly_payment: f64, term_months: u32) -> f64 {
    monthly_payment * f64::from(term_months)
}

pub fn total_interest(total_payment: f64, loan_amount: f64) -> f64 {
    total_payment - loan_amount
}

/// Range, LTV and DTI checks in that order. Limits are inclusive: a ratio
/// equal to the product maximum is accepted.
pub fn check_eligibility(
    inputs: &EligibilityInputs,
    annual_rate_percent: f64,
) -> Result<RiskAssessment, LoanError> {
    let limits = &inputs.constraints;
    if inputs.loan_amount < limits.min_amount
        || inputs.loan_amount > limits.max_amount
        || inputs.term_months < limits.min_term_months
        || inputs.term_months > limits.max_term_months
    {
        return Err(LoanError::OutOfRange);
    }

    let ltv = ltv_ratio(inputs.loan_amount, inputs.property_value);
    if let (Some(ltv), Some(max)) = (ltv, limits.max_ltv) {
        if ltv > max {
            return Err(LoanError::LtvExceeded { ltv, max });
        }
    }

    let monthly_payment =
        calculate_monthly_payment(inputs.loan_amount, annual_rate_percent, inputs.term_months)?;
    let dti = dti_ratio(monthly_payment, inputs.annual_income)?;
    if dti > limits.max_dti {
        return Err(LoanError::DtiExceeded {
            dti,
            max: limits.max_dti,
        });
    }

    Ok(RiskAssessment {
        monthly_payment,
        ltv_ratio: ltv,
        dti_ratio: dti,
    })
}

/// Runs the eligibility checks for `product` and assembles the full result.
///
/// A request that names a `loan_type` different from the product's is
/// refused with `LoanTypeMismatch`; earlier versions of the service accepted
/// such requests and ignored the field.
pub fn simulate(
    product: &LoanProduct,
    request: &SimulationRequest,
) -> Result<SimulationResult, LoanError> {
    if let Some(requested) = request.loan_type {
        if requested != product.loan_type {
            return Err(LoanError::LoanTypeMismatch {
                expected: product.loan_type,
                requested,
            });
        }
    }

    let interest_rate = product.rate_for(request.risk_band);
    let inputs = EligibilityInputs {
        loan_amount: request.loan_amount,
        term_months: request.term_months,
        property_value: request.property_value,
        annual_income: request.annual_income,
        constraints: product.constraints,
    };
    let assessment = check_eligibility(&inputs, interest_rate)?;

    let fee = origination_fee(
        request.loan_amount,
        product.constraints.origination_fee_percent,
    );
    let total = total_payment(assessment.monthly_payment, request.term_months);
    let apr = solve_apr(
        request.loan_amount,
        request.term_months,
        assessment.monthly_payment,
        fee,
    )?;
    let amortization =
        calculate_amortization_schedule(request.loan_amount, interest_rate, request.term_months)?;

    Ok(SimulationResult {
        product_id: product.id,
        loan_type: product.loan_type,
        loan_amount: request.loan_amount,
        term_months: request.term_months,
        interest_rate,
        monthly_payment: assessment.monthly_payment,
        total_payment: total,
        total_interest: total_interest(total, request.loan_amount),
        origination_fee: fee,
        apr: apr.apr_percent,
        apr_converged: apr.converged,
        ltv_ratio: assessment.ltv_ratio,
        dti_ratio: assessment.dti_ratio,
        amortization,
    })
}

fn level_payment(terms: &LoanTerms) -> Result<f64, LoanError> {
    let r = terms.monthly_rate();
    let n = f64::from(terms.term_months);
    if r == 0.0 {
        return Ok(terms.principal / n);
    }
    let growth = (1.0 + r).powf(n);
    if !growth.is_finite() {
        return Err(LoanError::invalid(
            "annual_rate_percent",
            "compounds beyond the representable range over this term",
        ));
    }
    // A positive rate below f64 resolution leaves 1 + r == 1.
    if growth - 1.0 <= 0.0 {
        return Err(LoanError::invalid(
            "annual_rate_percent",
            "is too small to resolve; use 0 for an interest-free loan",
        ));
    }
    let payment = terms.principal * r * growth / (growth - 1.0);
    if !payment.is_finite() {
        return Err(LoanError::invalid("principal", "payment is not representable"));
    }
    Ok(payment)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// Also folds -0.0 into 0.0 so a fully repaid balance never serializes as "-0.0".
fn clamp_non_negative(value: f64) -> f64 {
    if value > 0.0 { value } else { 0.0 }
}
