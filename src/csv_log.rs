//! Append-only CSV files on local disk.
//!
//! Each [`CsvLog`] owns one file. Appends are serialized through a mutex
//! so concurrent requests never interleave partial lines, and the header is
//! written when the file is created or still empty.

use serde::{de::DeserializeOwned, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

use crate::error::{ApiError, ApiResult};

#[derive(Debug)]
pub struct CsvLog {
    path: PathBuf,
    columns: &'static [&'static str],
    lock: Arc<Mutex<()>>,
}

impl CsvLog {
    pub fn new(path: impl Into<PathBuf>, columns: &'static [&'static str]) -> Self {
        Self {
            path: path.into(),
            columns,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append records as rows, in the order given. Returns how many were written.
    pub async fn append<R>(&self, records: Vec<R>) -> ApiResult<usize>
    where
        R: Serialize + Send + 'static,
    {
        let path = self.path.clone();
        let columns = self.columns;
        let lock = Arc::clone(&self.lock);

        tokio::task::spawn_blocking(move || {
            let _guard = lock
                .lock()
                .map_err(|_| ApiError::Internal("CSV lock poisoned".to_string()))?;
            append_records(&path, columns, &records)
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
    }

    /// Read every row back. A file that does not exist yet reads as empty.
    pub async fn read<R>(&self) -> ApiResult<Vec<R>>
    where
        R: DeserializeOwned + Send + 'static,
    {
        let path = self.path.clone();
        let lock = Arc::clone(&self.lock);

        tokio::task::spawn_blocking(move || {
            let _guard = lock
                .lock()
                .map_err(|_| ApiError::Internal("CSV lock poisoned".to_string()))?;
            read_records(&path)
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
    }

    /// Raw file contents, `None` when the file does not exist yet.
    pub async fn read_raw(&self) -> ApiResult<Option<Vec<u8>>> {
        let path = self.path.clone();
        let lock = Arc::clone(&self.lock);

        tokio::task::spawn_blocking(move || {
            let _guard = lock
                .lock()
                .map_err(|_| ApiError::Internal("CSV lock poisoned".to_string()))?;
            match std::fs::read(&path) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
    }
}

fn append_records<R: Serialize>(
    path: &Path,
    columns: &[&str],
    records: &[R],
) -> ApiResult<usize> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let needs_header = file.metadata()?.len() == 0;

    // Rows are buffered and written with a single call
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    if needs_header {
        trace!("Writing header to new CSV file {}", path.display());
        writer.write_record(columns)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    let buffer = writer
        .into_inner()
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    file.write_all(&buffer)?;
    file.flush()?;

    debug!("Appended {} rows to {}", records.len(), path.display());
    Ok(records.len())
}

fn read_records<R: DeserializeOwned>(path: &Path) -> ApiResult<Vec<R>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(file);
    let records = reader.deserialize::<R>().collect::<Result<Vec<R>, _>>()?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CropReading, WeatherReading, CROP_COLUMNS, WEATHER_COLUMNS};
    use tempfile::tempdir;

    fn reading(date: &str) -> CropReading {
        CropReading {
            date: date.to_string(),
            temperatura: "28.5".to_string(),
            radiacion_solar: "640".to_string(),
            humedad_suelo: "41".to_string(),
            humedad: "63".to_string(),
            precipitacion: "0".to_string(),
            tomate: "Si".to_string(),
            banana: "No".to_string(),
            cacao: "Si".to_string(),
            arroz: "No".to_string(),
            maiz: "Si".to_string(),
        }
    }

    #[tokio::test]
    async fn append_then_read_back() {
        let dir = tempdir().unwrap();
        let log = CsvLog::new(dir.path().join("crops.csv"), &CROP_COLUMNS);

        assert_eq!(log.append(vec![reading("2025-11-20")]).await.unwrap(), 1);

        let rows: Vec<CropReading> = log.read().await.unwrap();
        assert_eq!(rows, vec![reading("2025-11-20")]);

        let text = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], CROP_COLUMNS.join(","));
        assert_eq!(
            lines[1],
            "2025-11-20,28.5,640,41,63,0,Si,No,Si,No,Si"
        );
        assert_eq!(lines[1].split(',').count(), 11);
    }

    #[tokio::test]
    async fn header_is_written_once() {
        let dir = tempdir().unwrap();
        let log = CsvLog::new(dir.path().join("crops.csv"), &CROP_COLUMNS);

        log.append(vec![reading("a")]).await.unwrap();
        log.append(vec![reading("b"), reading("c")]).await.unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert_eq!(text.matches("radiacion_solar").count(), 1);
    }

    #[tokio::test]
    async fn existing_file_gets_no_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        std::fs::write(&path, "2024-01-01,1,2,3,4,5,No,No,No,No,No\n").unwrap();

        let log = CsvLog::new(&path, &CROP_COLUMNS);
        log.append(vec![reading("2025-01-01")]).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("2024-01-01"));
        assert_eq!(text.lines().count(), 2);
    }

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let log = CsvLog::new(dir.path().join("clima.csv"), &WEATHER_COLUMNS);

        let rows: Vec<WeatherReading> = log.read().await.unwrap();
        assert!(rows.is_empty());
        assert!(log.read_raw().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn values_with_commas_are_quoted() {
        let dir = tempdir().unwrap();
        let log = CsvLog::new(dir.path().join("crops.csv"), &CROP_COLUMNS);
        let mut row = reading("2025-11-20");
        row.temperatura = "28,5".to_string();

        log.append(vec![row.clone()]).await.unwrap();

        let rows: Vec<CropReading> = log.read().await.unwrap();
        assert_eq!(rows, vec![row]);
    }

    #[tokio::test]
    async fn raw_reads_never_see_partial_appends() {
        let dir = tempdir().unwrap();
        let log = Arc::new(CsvLog::new(dir.path().join("crops.csv"), &CROP_COLUMNS));
        log.append(vec![reading("day-0")]).await.unwrap();

        let writer = {
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                for i in 1..=16 {
                    log.append(vec![reading(&format!("day-{}", i))]).await.unwrap();
                }
            })
        };
        for _ in 0..16 {
            let bytes = log.read_raw().await.unwrap().unwrap();
            assert!(bytes.ends_with(b"\n"));
            let text = String::from_utf8(bytes).unwrap();
            assert!(text.lines().skip(1).all(|line| line.split(',').count() == 11));
        }
        writer.await.unwrap();

        let text = String::from_utf8(log.read_raw().await.unwrap().unwrap()).unwrap();
        assert_eq!(text.lines().count(), 18);
    }

    #[tokio::test]
    async fn concurrent_appends_keep_whole_lines() {
        let dir = tempdir().unwrap();
        let log = Arc::new(CsvLog::new(dir.path().join("crops.csv"), &CROP_COLUMNS));

        let mut handles = Vec::new();
        for i in 0..32 {
            let log = Arc::clone(&log);
            handles.push(tokio::spawn(async move {
                log.append(vec![reading(&format!("day-{}", i))]).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let rows: Vec<CropReading> = log.read().await.unwrap();
        assert_eq!(rows.len(), 32);
        assert!(rows.iter().all(|r| r.maiz == "Si"));
    }
}
