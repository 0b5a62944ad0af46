use std::fs;
use std::path::Path;

use loanrisk_core::{LoanError, LoanResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Write any serializable value (reports, pipeline outcomes) as pretty JSON.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> LoanResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| LoanError::Io(e.to_string()))?;
    fs::write(path.as_ref(), json)?;
    Ok(())
}

/// Read a JSON document, e.g. a pipeline configuration.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> LoanResult<T> {
    let json = fs::read_to_string(path.as_ref())?;
    serde_json::from_str(&json).map_err(|e| LoanError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Selection {
        method: String,
        features: Vec<String>,
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selection.json");
        let s = Selection {
            method: "rfe".into(),
            features: vec!["term".into(), "is_new".into(), "sba_percent".into()],
        };
        write_json(&s, &path).unwrap();
        let back: Selection = read_json(&path).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_json::<Selection>(&path), Err(LoanError::Io(_))));
    }
}
