use loanrisk_core::{LoanError, LoanResult};
use loanrisk_data::{Column, Table};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const RISKY_NAICS: [f64; 3] = [722110.0, 722211.0, 811111.0];
const OTHER_NAICS: [f64; 8] = [
    111110.0, 236115.0, 423430.0, 445110.0, 541511.0, 621111.0, 448140.0, 531120.0,
];
const RISKY_STATES: [&str; 24] = [
    "FL", "GA", "NV", "AZ", "MI", "CA", "DC", "IL", "NJ", "TN", "SC", "CO", "UT", "NC", "NY",
    "VA", "TX", "AL", "IN", "MD", "LA", "KY", "OR", "OH",
];
const OTHER_STATES: [&str; 15] = [
    "WY", "MT", "ND", "SD", "VT", "NH", "ME", "ID", "WI", "MN", "IA", "NE", "KS", "WA", "AK",
];
const SBA_SHARES: [f64; 4] = [0.5, 0.75, 0.85, 0.9];

/// Standard normal draw (Box-Muller).
fn normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-10);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn pick<T: Copy>(rng: &mut StdRng, items: &[T]) -> T {
    items[rng.gen_range(0..items.len())]
}

/// Generate a synthetic SBA-style loan table.
///
/// Exactly `round(n · positive_rate)` rows have `is_default = 1`. Defaulted
/// loans are more often in the restaurant/auto-repair NAICS codes and the
/// high-default states, run shorter terms, and carry smaller amounts, so the
/// pipeline's engineered indicators and scaled features carry real signal.
/// The same seed always yields the same table.
pub fn make_loans(n: usize, positive_rate: f64, seed: u64) -> LoanResult<Table> {
    if n == 0 {
        return Err(LoanError::invalid_input("cannot generate an empty dataset"));
    }
    if !(0.0..=1.0).contains(&positive_rate) {
        return Err(LoanError::invalid_input(format!(
            "positive rate must be in [0, 1], got {}",
            positive_rate
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let positives = (n as f64 * positive_rate).round() as usize;
    let mut is_default = vec![0.0; n];
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut rng);
    for &i in &order[..positives] {
        is_default[i] = 1.0;
    }

    let mut naics = Vec::with_capacity(n);
    let mut state = Vec::with_capacity(n);
    let mut term = Vec::with_capacity(n);
    let mut emp_num = Vec::with_capacity(n);
    let mut jobs_created = Vec::with_capacity(n);
    let mut jobs_retained = Vec::with_capacity(n);
    let mut jobs_count = Vec::with_capacity(n);
    let mut appv_loan_amount = Vec::with_capacity(n);
    let mut sba_appv_amount = Vec::with_capacity(n);
    let mut is_new = Vec::with_capacity(n);
    let mut sba_percent = Vec::with_capacity(n);
    let mut monthly_debt = Vec::with_capacity(n);

    for &defaulted in &is_default {
        let bad = defaulted == 1.0;

        let risky_naics = rng.gen_bool(if bad { 0.45 } else { 0.15 });
        naics.push(if risky_naics { pick(&mut rng, &RISKY_NAICS) } else { pick(&mut rng, &OTHER_NAICS) });
        let risky_state = rng.gen_bool(if bad { 0.8 } else { 0.5 });
        state.push(
            if risky_state { pick(&mut rng, &RISKY_STATES) } else { pick(&mut rng, &OTHER_STATES) }
                .to_string(),
        );

        let (term_mean, term_sd) = if bad { (60.0, 30.0) } else { (120.0, 60.0) };
        let months = (term_mean + term_sd * normal(&mut rng)).round().clamp(6.0, 300.0);
        term.push(months);

        let employees = (1.8 + normal(&mut rng)).exp().round();
        let created = (rng.gen::<f64>() * employees / 2.0).round();
        let retained = (employees * rng.gen_range(0.5..=1.0)).round();
        emp_num.push(employees);
        jobs_created.push(created);
        jobs_retained.push(retained);
        jobs_count.push(created + retained);

        let log_mean = if bad { 11.0 } else { 11.6 };
        let amount = ((log_mean + normal(&mut rng)).exp() / 100.0).round().max(10.0) * 100.0;
        let share = pick(&mut rng, &SBA_SHARES);
        appv_loan_amount.push(amount);
        sba_appv_amount.push(amount * share);
        sba_percent.push(share);
        monthly_debt.push((amount / months * 100.0).round() / 100.0);

        is_new.push(if rng.gen_bool(if bad { 0.4 } else { 0.25 }) { 1.0 } else { 0.0 });
    }

    Table::from_columns(vec![
        ("naics".into(), Column::Numeric(naics)),
        ("state".into(), Column::Text(state)),
        ("term".into(), Column::Numeric(term)),
        ("emp_num".into(), Column::Numeric(emp_num)),
        ("jobs_created".into(), Column::Numeric(jobs_created)),
        ("jobs_retained".into(), Column::Numeric(jobs_retained)),
        ("appv_loan_amount".into(), Column::Numeric(appv_loan_amount)),
        ("sba_appv_amount".into(), Column::Numeric(sba_appv_amount)),
        ("is_new".into(), Column::Numeric(is_new)),
        ("sba_percent".into(), Column::Numeric(sba_percent)),
        ("monthly_debt".into(), Column::Numeric(monthly_debt)),
        ("jobs_count".into(), Column::Numeric(jobs_count)),
        ("is_default".into(), Column::Numeric(is_default)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_loans_shape() {
        let t = make_loans(1000, 0.1, 123).unwrap();
        assert_eq!(t.nrows(), 1000);
        assert_eq!(t.ncols(), 13);
        let y = t.column("is_default").unwrap().as_numeric().unwrap();
        assert_eq!(y.iter().filter(|&&v| v == 1.0).count(), 100);
        for name in t.names() {
            assert_eq!(t.column(name).unwrap().missing_count(), 0, "{}", name);
        }
    }

    #[test]
    fn test_make_loans_reproducible() {
        assert_eq!(make_loans(50, 0.2, 7).unwrap(), make_loans(50, 0.2, 7).unwrap());
        assert_ne!(make_loans(50, 0.2, 7).unwrap(), make_loans(50, 0.2, 8).unwrap());
    }

    #[test]
    fn test_jobs_count_is_sum() {
        let t = make_loans(30, 0.5, 1).unwrap();
        let created = t.column("jobs_created").unwrap().as_numeric().unwrap();
        let retained = t.column("jobs_retained").unwrap().as_numeric().unwrap();
        let count = t.column("jobs_count").unwrap().as_numeric().unwrap();
        for i in 0..30 {
            assert_eq!(count[i], created[i] + retained[i]);
        }
    }

    #[test]
    fn test_bad_arguments() {
        assert!(make_loans(0, 0.1, 1).is_err());
        assert!(make_loans(10, 1.5, 1).is_err());
    }
}
