use std::io::Write;
use std::path::Path;

use super::ExportError;
use crate::status::TrainingStatus;

/// Export any serializable value as pretty-printed JSON
pub fn export_json<T, P>(data: &T, output_path: P) -> Result<(), ExportError>
where
    T: serde::Serialize,
    P: AsRef<Path>,
{
    let path = output_path.as_ref();
    let json_data = serde_json::to_string_pretty(data)?;

    let mut file = std::fs::File::create(path).map_err(|e| ExportError::WriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    file.write_all(json_data.as_bytes())?;
    file.write_all(b"\n")?;

    Ok(())
}

/// Write `training_status.json`
pub fn export_status<P: AsRef<Path>>(status: &TrainingStatus, output_path: P) -> Result<(), ExportError> {
    export_json(status, &output_path)?;
    tracing::info!(
        path = %output_path.as_ref().display(),
        status = %status.status,
        predicted = %status.predicted_time,
        "Wrote training status"
    );
    Ok(())
}

pub fn load_status<P: AsRef<Path>>(path: P) -> Result<TrainingStatus, ExportError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlanConfig;
    use crate::efficiency::EfficiencyAnalyzer;
    use crate::prediction::Predictor;
    use crate::status::{build_status, RaceStatus};
    use chrono::NaiveDate;
    use tempfile::NamedTempFile;

    #[test]
    fn test_status_file_is_pretty_json() {
        let config = PlanConfig::default();
        let analysis = EfficiencyAnalyzer::new(&config).analyze(&[]);
        let prediction = Predictor::new(&config).predict(&analysis);
        let status = build_status(
            &config,
            &prediction,
            &analysis,
            &[],
            NaiveDate::from_ymd_opt(2026, 1, 8).unwrap(),
        );

        let file = NamedTempFile::new().unwrap();
        export_status(&status, file.path()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("\n  \"label\": \"ON TRACK FOR 2:32:12\""));
        assert!(content.contains("\"hr_buffer\": null"));

        let loaded = load_status(file.path()).unwrap();
        assert_eq!(loaded.status, RaceStatus::OnTrack);
        assert_eq!(loaded, status);
    }
}
