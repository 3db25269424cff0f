use async_trait::async_trait;
use std::path::PathBuf;

use crate::common::{
    clean_model, parse_count, parse_watts, required_columns, slurp, DataSource, Manufacturer,
    RowError, SourceError,
};
use crate::schemas::processor::{Extraction, Processor};

const SOURCE_URL: &str = "https://www.amd.com/en/products/specifications/processors.html";

const NAME: &str = "Name";
const TDP: &str = "Default TDP";
const CORES: &str = "# of CPU Cores";
const THREADS: &str = "# of Threads";

/// The all-processors export from AMD's specification site. One processor
/// per row; the power cell may carry a configurable-TDP range.
pub struct AmdSpecSource {
    path: PathBuf,
}

impl AmdSpecSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for AmdSpecSource {
    async fn produce(&self) -> Result<Extraction, SourceError> {
        let text = slurp(&self.path).await?;
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let headers = reader
            .headers()
            .map_err(|source| SourceError::Malformed {
                path: self.path.clone(),
                source,
            })?
            .clone();
        let columns = required_columns(&self.path, &headers, &[NAME, TDP, CORES, THREADS])?;

        let mut extraction = Extraction::default();
        for row in reader.records() {
            let row = match row {
                Ok(row) => row,
                Err(error) => {
                    extraction.skip(RowError::Unreadable {
                        line: error.position().map(|p| p.line()).unwrap_or_default(),
                        message: error.to_string(),
                    });
                    continue;
                }
            };
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            let cell = |i: usize| row.get(columns[i]).unwrap_or("").trim();

            let model = clean_model(cell(0));
            let (tdp_cell, cores_cell, threads_cell) = (cell(1), cell(2), cell(3));
            /* AMD leaves the spec cells blank on some embedded parts */
            if tdp_cell.is_empty() || cores_cell.is_empty() || threads_cell.is_empty() {
                continue;
            }

            let tdp = match parse_watts(tdp_cell) {
                Some(tdp) => tdp,
                None => {
                    extraction.skip(RowError::BadValue {
                        line,
                        field: TDP,
                        value: tdp_cell.to_string(),
                    });
                    continue;
                }
            };
            let n_cores = match parse_count(cores_cell) {
                Some(n) => n,
                None => {
                    extraction.skip(RowError::BadValue {
                        line,
                        field: CORES,
                        value: cores_cell.to_string(),
                    });
                    continue;
                }
            };
            let n_threads = match parse_count(threads_cell) {
                Some(n) => n,
                None => {
                    extraction.skip(RowError::BadValue {
                        line,
                        field: THREADS,
                        value: threads_cell.to_string(),
                    });
                    continue;
                }
            };

            extraction.push(Processor::new(
                model,
                Manufacturer::Amd,
                tdp,
                n_cores,
                n_threads,
                SOURCE_URL,
            ));
        }

        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::AmdSpecSource;
    use crate::common::{DataSource, RowError, SourceError};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn spec_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_rows_normalize() {
        /* the real export opens with a BOM */
        let file = spec_file(
            "\u{feff}Name,Family,Default TDP,# of CPU Cores,# of Threads\n\
             AMD Ryzen™ 5 3600,Ryzen,65W,6,12\n\
             AMD Ryzen™ 9 7950X,Ryzen,35-54W,16,32\n\
             AMD Instinct™ MI100,Instinct,,,\n",
        );

        let extraction = AmdSpecSource::new(file.path()).produce().await.unwrap();
        assert_eq!(extraction.records.len(), 2);
        assert!(extraction.skipped.is_empty());

        let ryzen = &extraction.records[0];
        assert_eq!(ryzen.model, "Ryzen 5 3600");
        assert_eq!(ryzen.tdp, 65.0);
        assert_eq!(ryzen.n_cores, 6);
        assert_eq!(ryzen.n_threads, 12);
        assert!((ryzen.tdp_per_core - 65.0 / 6.0).abs() < 1e-9);
        assert!((ryzen.tdp_per_thread - 65.0 / 12.0).abs() < 1e-9);

        /* a configurable-TDP range averages out */
        assert_eq!(extraction.records[1].tdp, 44.5);
    }

    #[tokio::test]
    async fn test_malformed_row_is_counted_not_fatal() {
        let file = spec_file(
            "Name,Default TDP,# of CPU Cores,# of Threads\n\
             AMD Ryzen 5 3600,65W,6,12\n\
             AMD Athlon 3000G,35W,six,4\n",
        );

        let extraction = AmdSpecSource::new(file.path()).produce().await.unwrap();
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.skipped.len(), 1);
        match &extraction.skipped[0] {
            RowError::BadValue { field, value, .. } => {
                assert_eq!(*field, "# of CPU Cores");
                assert_eq!(value, "six");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_header_aborts_the_file() {
        let file = spec_file("Name,TDP,Cores\nAMD Ryzen 5 3600,65W,6\n");

        let error = AmdSpecSource::new(file.path()).produce().await.unwrap_err();
        match error {
            SourceError::MissingColumn { column, .. } => assert_eq!(column, "Default TDP"),
            other => panic!("unexpected error: {}", other),
        }
    }
}
