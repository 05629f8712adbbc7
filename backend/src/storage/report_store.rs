use shared::{Report, ReportRecord};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{StorageError, is_report_name};

/// Prediction reports, one `<report_id>.json` file each.
#[derive(Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, report_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", report_id))
    }

    /// Persists `report` under a fresh identifier. The file is written beside
    /// its final name and renamed into place, so readers never see a partial
    /// report.
    pub async fn save(&self, report: Report) -> Result<ReportRecord, StorageError> {
        let report_id = Uuid::new_v4().to_string();
        let json = serde_json::to_vec(&report)?;

        let final_path = self.path_for(&report_id);
        let tmp_path = self.dir.join(format!(".{}.json.tmp", report_id));
        tokio::fs::write(&tmp_path, &json).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        Ok(ReportRecord { report_id, report })
    }

    pub async fn get(&self, report_id: &str) -> Result<ReportRecord, StorageError> {
        if !is_report_name(report_id) {
            return Err(StorageError::report_not_found(report_id));
        }

        let contents = match tokio::fs::read(self.path_for(report_id)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::report_not_found(report_id));
            }
            Err(e) => return Err(e.into()),
        };

        parse_record(report_id, &contents)
    }

    /// All readable reports, newest first. Files that cannot be read or parsed
    /// are logged and left out.
    pub async fn list(&self) -> Result<Vec<ReportRecord>, StorageError> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("Error reading report directory entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            let Some(report_id) = report_id_of(&path) else {
                continue;
            };
            match entry.file_type().await {
                Ok(file_type) if file_type.is_file() => {}
                _ => continue,
            }

            let record = match tokio::fs::read(&path).await {
                Ok(contents) => parse_record(&report_id, &contents),
                Err(e) => Err(e.into()),
            };
            match record {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Error reading report {}: {}", path.display(), e),
            }
        }

        records.sort_by(|a, b| b.report.timestamp.cmp(&a.report.timestamp));
        Ok(records)
    }
}

fn report_id_of(path: &Path) -> Option<String> {
    if path.extension()? != "json" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if !is_report_name(stem) {
        log::warn!("Skipping report file with unusable name: {}", path.display());
        return None;
    }
    Some(stem.to_string())
}

fn parse_record(report_id: &str, contents: &[u8]) -> Result<ReportRecord, StorageError> {
    let report: Report =
        serde_json::from_slice(contents).map_err(|source| StorageError::Corrupt {
            id: report_id.to_string(),
            source,
        })?;
    Ok(ReportRecord {
        report_id: report_id.to_string(),
        report,
    })
}
