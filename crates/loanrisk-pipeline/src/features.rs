use loanrisk_core::{LoanError, LoanResult, Tensor};
use loanrisk_data::{Column, FeatureMatrix, Table, TargetVector};
use loanrisk_preprocessing::{IndicatorEncoder, Membership};

use crate::config::{PipelineConfig, NAICS_COLUMN, NAICS_INDICATOR, STATE_COLUMN, STATE_INDICATOR};
use crate::split::Subset;

fn encoders(config: &PipelineConfig) -> [IndicatorEncoder; 2] {
    [
        IndicatorEncoder::new(
            NAICS_COLUMN,
            NAICS_INDICATOR,
            Membership::codes(&config.naics_defaulters),
        ),
        IndicatorEncoder::new(
            STATE_COLUMN,
            STATE_INDICATOR,
            Membership::Labels(config.state_defaulters.iter().cloned().collect()),
        ),
    ]
}

/// Add the NAICS and state defaulter indicators to one subset.
///
/// Row count and existing columns are untouched; re-running replaces the
/// indicators in place.
pub fn engineer_features(table: &mut Table, subset: Subset, config: &PipelineConfig) -> LoanResult<()> {
    for encoder in encoders(config) {
        encoder.apply(table, subset.as_str())?;
    }
    Ok(())
}

/// Split a subset into its feature matrix and target vector.
///
/// Features follow `config.feature_columns()` order. Every modeling column
/// must be present, numeric and free of missing cells.
pub fn project(
    table: &Table,
    subset: Subset,
    config: &PipelineConfig,
) -> LoanResult<(FeatureMatrix, TargetVector)> {
    let mut numeric = Vec::with_capacity(config.modeling_columns.len());
    for name in &config.modeling_columns {
        let values = match table.require(name, subset.as_str())? {
            Column::Numeric(v) => v,
            Column::Text(_) => {
                return Err(LoanError::invalid_input(format!(
                    "{} column '{}' is textual",
                    subset, name
                )))
            }
        };
        if let Some(pos) = values.iter().position(|v| v.is_nan()) {
            return Err(LoanError::invalid_input(format!(
                "{} column '{}' is missing a value at row {}",
                subset,
                name,
                table.index()[pos]
            )));
        }
        numeric.push((name, values));
    }

    let features = config.feature_columns();
    let n = table.nrows();
    let mut data = vec![0.0; n * features.len()];
    let mut target = Vec::new();
    let mut j = 0;
    for (name, values) in numeric {
        if *name == config.target {
            target = values.clone();
            continue;
        }
        for (i, &v) in values.iter().enumerate() {
            data[i * features.len() + j] = v;
        }
        j += 1;
    }

    let index = table.index().to_vec();
    let x = FeatureMatrix::new(features, index.clone(), Tensor::new(data, vec![n, j])?)?;
    let y = TargetVector::new(config.target.clone(), index, target)?;
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use loanrisk_datasets::make_loans;

    fn sample() -> Table {
        Table::from_columns(vec![
            ("naics".into(), Column::Numeric(vec![722110.0, 111110.0, 811111.0, f64::NAN])),
            (
                "state".into(),
                Column::Text(vec!["FL".into(), "WY".into(), " NV ".into(), "".into()]),
            ),
        ])
        .unwrap()
    }

    fn numeric(t: &Table, name: &str) -> Vec<f64> {
        t.column(name).unwrap().as_numeric().unwrap().to_vec()
    }

    #[test]
    fn test_indicators() {
        let mut t = sample();
        engineer_features(&mut t, Subset::Train, &PipelineConfig::default()).unwrap();
        assert_eq!(t.nrows(), 4);
        assert_eq!(numeric(&t, NAICS_INDICATOR), vec![1.0, 0.0, 1.0, 0.0]);
        assert_eq!(numeric(&t, STATE_INDICATOR), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_indicators_need_exact_members() {
        let mut t = Table::from_columns(vec![
            ("naics".into(), Column::Numeric(vec![722110.4, 811110.6, 722211.0])),
            ("state".into(), Column::Text(vec![" NV ".into(), "CA ".into(), "NV".into()])),
        ])
        .unwrap();
        engineer_features(&mut t, Subset::Train, &PipelineConfig::default()).unwrap();
        assert_eq!(numeric(&t, NAICS_INDICATOR), vec![0.0, 0.0, 1.0]);
        assert_eq!(numeric(&t, STATE_INDICATOR), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_reapplying_replaces() {
        let mut t = sample();
        let config = PipelineConfig::default();
        engineer_features(&mut t, Subset::Test, &config).unwrap();
        let once = t.clone();
        engineer_features(&mut t, Subset::Test, &config).unwrap();
        assert_eq!(t.names(), once.names());
        assert_eq!(t.column(NAICS_INDICATOR), once.column(NAICS_INDICATOR));
        assert_eq!(t.column(STATE_INDICATOR), once.column(STATE_INDICATOR));
        assert_eq!(t.ncols(), 4);
    }

    #[test]
    fn test_missing_source_column() {
        let mut t = Table::from_columns(vec![("naics".into(), Column::Numeric(vec![722110.0]))]).unwrap();
        let err = engineer_features(&mut t, Subset::Validate, &PipelineConfig::default()).unwrap_err();
        match err {
            LoanError::MissingColumn { column, subset } => {
                assert_eq!(column, "state");
                assert_eq!(subset, "validate");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_project_shapes_and_order() {
        let config = PipelineConfig::default();
        let mut t = make_loans(40, 0.25, 3).unwrap();
        engineer_features(&mut t, Subset::Train, &config).unwrap();
        let (x, y) = project(&t, Subset::Train, &config).unwrap();
        assert_eq!(x.values().shape_vec(), vec![40, 12]);
        assert_eq!(x.columns(), config.feature_columns().as_slice());
        assert_eq!(y.len(), 40);
        assert!(y.check_aligned(&x).is_ok());

        let term = numeric(&t, "term");
        let last = numeric(&t, STATE_INDICATOR);
        for i in 0..40 {
            assert_eq!(x.values().get(&[i, 0]).unwrap(), term[i]);
            assert_eq!(x.values().get(&[i, 11]).unwrap(), last[i]);
        }
        assert_eq!(y.values().data(), numeric(&t, "is_default").as_slice());
    }

    #[test]
    fn test_project_requires_engineered_columns() {
        let t = make_loans(20, 0.25, 3).unwrap();
        assert!(matches!(
            project(&t, Subset::Train, &PipelineConfig::default()),
            Err(LoanError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_project_rejects_missing_values() {
        let config = PipelineConfig::default();
        let mut t = make_loans(20, 0.25, 3).unwrap();
        engineer_features(&mut t, Subset::Train, &config).unwrap();
        let mut term = numeric(&t, "term");
        term[5] = f64::NAN;
        t.insert_column("term", Column::Numeric(term)).unwrap();
        assert!(matches!(project(&t, Subset::Train, &config), Err(LoanError::InvalidInput(_))));
    }
}
