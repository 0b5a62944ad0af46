use std::collections::BTreeMap;

use loanrisk_core::{Float, LoanError, LoanResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Number of held-out rows for `ratio` of `n`, rounded up.
fn held_out_size(n: usize, ratio: f64) -> usize {
    // Guard against 0.2 * 1000 landing a hair above 200.
    let exact = ratio * n as f64;
    (exact - exact * 1e-12).ceil() as usize
}

/// Stratified shuffle split of row positions.
///
/// Holds out `ceil(test_ratio * n)` rows, distributing them over the classes
/// of `labels` in proportion to class size: each class first gets the floor
/// of its exact share, and leftover slots go to the classes with the largest
/// fractional remainders (lower label first on ties). Rows within a class are
/// shuffled before the held-out rows are taken, and both outputs are shuffled
/// again so neither is ordered by class.
///
/// Returns `(kept, held_out)` as positions into `labels`.
pub fn stratified_split<T: Float>(
    labels: &[T],
    test_ratio: f64,
    seed: u64,
) -> LoanResult<(Vec<usize>, Vec<usize>)> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(LoanError::invalid_input(format!(
            "test ratio must be in (0, 1), got {}",
            test_ratio
        )));
    }
    if let Some(pos) = labels.iter().position(|v| !v.is_finite()) {
        return Err(LoanError::invalid_input(format!(
            "label at row {} is missing",
            pos
        )));
    }

    let n = labels.len();
    let mut classes: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, v) in labels.iter().enumerate() {
        classes.entry(v.to_label()).or_default().push(i);
    }

    if let Some((label, rows)) = classes.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(LoanError::invalid_input(format!(
            "class {} has only {} member(s); at least 2 are needed to stratify",
            label,
            rows.len()
        )));
    }

    let n_test = held_out_size(n, test_ratio);
    let n_train = n.saturating_sub(n_test);
    if n_test < classes.len() || n_train < classes.len() {
        return Err(LoanError::invalid_input(format!(
            "cannot stratify {} rows of {} classes into {} kept and {} held out",
            n,
            classes.len(),
            n_train,
            n_test
        )));
    }

    // Proportional allocation of held-out slots
    let mut alloc: Vec<(usize, usize, f64)> = classes
        .iter()
        .map(|(&label, rows)| {
            let exact = n_test as f64 * rows.len() as f64 / n as f64;
            (label, exact.floor() as usize, exact - exact.floor())
        })
        .collect();
    let assigned: usize = alloc.iter().map(|a| a.1).sum();
    let mut by_remainder: Vec<usize> = (0..alloc.len()).collect();
    by_remainder.sort_by(|&a, &b| alloc[b].2.total_cmp(&alloc[a].2).then(alloc[a].0.cmp(&alloc[b].0)));
    for &k in by_remainder.iter().take(n_test - assigned) {
        alloc[k].1 += 1;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut kept = Vec::with_capacity(n_train);
    let mut held_out = Vec::with_capacity(n_test);
    for ((_, rows), &(_, take, _)) in classes.iter_mut().zip(alloc.iter()) {
        rows.shuffle(&mut rng);
        let take = take.min(rows.len());
        held_out.extend_from_slice(&rows[..take]);
        kept.extend_from_slice(&rows[take..]);
    }
    kept.shuffle(&mut rng);
    held_out.shuffle(&mut rng);

    Ok((kept, held_out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize, positives: usize) -> Vec<f64> {
        (0..n).map(|i| if i % (n / positives) == 0 { 1.0 } else { 0.0 }).collect()
    }

    fn positives(y: &[f64], rows: &[usize]) -> usize {
        rows.iter().filter(|&&i| y[i] == 1.0).count()
    }

    #[test]
    fn test_sizes_and_strata() {
        let y = labels(1000, 100);
        let (kept, held) = stratified_split(&y, 0.2, 123).unwrap();
        assert_eq!(kept.len(), 800);
        assert_eq!(held.len(), 200);
        assert_eq!(positives(&y, &held), 20);
        assert_eq!(positives(&y, &kept), 80);
    }

    #[test]
    fn test_disjoint_and_exhaustive() {
        let y = labels(97, 13);
        let (kept, held) = stratified_split(&y, 0.3, 7).unwrap();
        let mut all: Vec<usize> = kept.iter().chain(held.iter()).copied().collect();
        all.sort();
        assert_eq!(all, (0..97).collect::<Vec<_>>());
    }

    #[test]
    fn test_reproducible() {
        let y = labels(200, 20);
        assert_eq!(
            stratified_split(&y, 0.2, 123).unwrap(),
            stratified_split(&y, 0.2, 123).unwrap()
        );
        assert_ne!(
            stratified_split(&y, 0.2, 123).unwrap(),
            stratified_split(&y, 0.2, 124).unwrap()
        );
    }

    #[test]
    fn test_rounds_held_out_up() {
        let y = labels(10, 5);
        let (kept, held) = stratified_split(&y, 0.25, 1).unwrap();
        assert_eq!(held.len(), 3);
        assert_eq!(kept.len(), 7);
    }

    #[test]
    fn test_rejects_bad_input() {
        let y = labels(10, 5);
        assert!(stratified_split(&y, 0.0, 1).is_err());
        assert!(stratified_split(&y, 1.0, 1).is_err());
        assert!(stratified_split(&[0.0, f64::NAN, 1.0], 0.5, 1).is_err());
        // One positive cannot land on both sides.
        assert!(stratified_split(&[0.0, 0.0, 0.0, 1.0], 0.5, 1).is_err());
    }
}
