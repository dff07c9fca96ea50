use super::error::LoanError;

const INITIAL_MONTHLY_GUESS: f64 = 0.01;
const TOLERANCE: f64 = 1e-7;
const MAX_ITERATIONS: u32 = 100;

/// Result of the APR solver. `apr_percent` is a best-effort estimate: when
/// `converged` is false it holds the last iterate rather than a solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AprEstimate {
    pub apr_percent: f64,
    pub iterations: u32,
    pub converged: bool,
}

pub fn calculate_apr(
    loan_amount: f64,
    term_months: u32,
    monthly_payment: f64,
    fees: f64,
) -> Result<f64, LoanError> {
    solve_apr(loan_amount, term_months, monthly_payment, fees).map(|est| est.apr_percent)
}

/// Newton-Raphson on the monthly rate that makes the level payment on
/// `loan_amount + fees` equal to `monthly_payment`.
pub fn solve_apr(
    loan_amount: f64,
    term_months: u32,
    monthly_payment: f64,
    fees: f64,
) -> Result<AprEstimate, LoanError> {
    validate_inputs(loan_amount, term_months, monthly_payment, fees)?;
    let periods = i32::try_from(term_months)
        .map_err(|_| LoanError::invalid("term_months", "is too large"))?;
    Ok(newton_apr(
        loan_amount + fees,
        periods,
        monthly_payment,
        MAX_ITERATIONS,
    ))
}

fn newton_apr(financed: f64, periods: i32, target_payment: f64, max_iterations: u32) -> AprEstimate {
    let mut guess = INITIAL_MONTHLY_GUESS;
    let mut it = 0;
    while it < max_iterations {
        it += 1;
        let implied = implied_payment(financed, guess, periods);
        let slope = payment_rate_derivative(financed, guess, periods);
        let next = guess - (implied - target_payment) / slope;

        // A zero slope or an overflowed power leaves nothing better than the
        // current iterate.
        if !next.is_finite() {
            return estimate(guess, it, false);
        }
        if (next - guess).abs() < TOLERANCE {
            return estimate(next, it, true);
        }
        guess = next;
    }
    estimate(guess, it, false)
}

fn implied_payment(financed: f64, rate: f64, periods: i32) -> f64 {
    let growth = (1.0 + rate).powi(periods);
    financed * rate * growth / (growth - 1.0)
}

// d/di [F i g / (g - 1)] with g = (1 + i)^n
//   = F (g (g - 1) - i n (1 + i)^(n - 1)) / (g - 1)^2
fn payment_rate_derivative(financed: f64, rate: f64, periods: i32) -> f64 {
    let growth = (1.0 + rate).powi(periods);
    let growth_slope = f64::from(periods) * (1.0 + rate).powi(periods - 1);
    let denom = growth - 1.0;
    financed * (growth * denom - rate * growth_slope) / (denom * denom)
}

fn estimate(monthly_rate: f64, iterations: u32, converged: bool) -> AprEstimate {
    AprEstimate {
        apr_percent: monthly_rate * 12.0 * 100.0,
        iterations,
        converged,
    }
}

fn validate_inputs(
    loan_amount: f64,
    term_months: u32,
    monthly_payment: f64,
    fees: f64,
) -> Result<(), LoanError> {
    if !loan_amount.is_finite() || loan_amount <= 0.0 {
        return Err(LoanError::invalid("loan_amount", "must be a positive finite amount"));
    }
    if term_months == 0 {
        return Err(LoanError::invalid("term_months", "must be >= 1"));
    }
    if !monthly_payment.is_finite() || monthly_payment <= 0.0 {
        return Err(LoanError::invalid(
            "monthly_payment",
            "must be a positive finite amount",
        ));
    }
    if !fees.is_finite() || fees < 0.0 {
        return Err(LoanError::invalid("fees", "must be a non-negative finite amount"));
    }
    Ok(())
}
