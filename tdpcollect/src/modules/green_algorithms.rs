//! The GreenAlgorithms public dataset and its normalizer. The published
//! file carries no manufacturer and no thread counts, so a `normalize` run
//! rewrites it with both before the merger will touch it.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use crate::common::{
    clean_model, parse_count, parse_watts, required_columns, slurp, DataSource, Manufacturer,
    RowError, SourceError,
};
use crate::report::NormalizeReport;
use crate::schemas::processor::{Extraction, Processor};

const MODEL: &str = "model";
const TDP: &str = "TDP";
const CORES: &str = "n_cores";
const TDP_PER_CORE: &str = "TDP_per_core";
const SOURCE: &str = "source";
const MANUFACTURER: &str = "manufacturer";
const THREADS: &str = "threads";

/* the dataset closes with a catch-all average row */
const SENTINEL_MODEL: &str = "Any";

/// A model → thread-count table, shipped as a versioned csv
/// (`model,threads`) so the data can move without a code change.
pub struct ThreadTable(HashMap<String, u32>);

impl ThreadTable {
    pub async fn load<P: Into<PathBuf>>(path: P) -> Result<Self, SourceError> {
        let path = path.into();
        let text = slurp(&path).await?;
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let headers = reader
            .headers()
            .map_err(|source| SourceError::Malformed {
                path: path.clone(),
                source,
            })?
            .clone();
        let columns = required_columns(&path, &headers, &[MODEL, THREADS])?;

        let mut table = HashMap::new();
        for row in reader.records() {
            let row = row.map_err(|source| SourceError::Malformed {
                path: path.clone(),
                source,
            })?;
            let cell = |i: usize| row.get(columns[i]).unwrap_or("").trim();
            /* a gap in the table itself is a data bug, not a skippable row */
            let threads = parse_count(cell(1)).ok_or_else(|| SourceError::Invalid {
                path: path.clone(),
                message: format!("thread count {:?} for {:?} did not parse", cell(1), cell(0)),
            })?;
            table.insert(cell(0).to_string(), threads);
        }
        Ok(Self(table))
    }

    pub fn get(&self, model: &str) -> Option<u32> {
        self.0.get(model).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Rewrites the raw dataset into the shape the merger consumes: the
/// placeholder row dropped, the manufacturer inferred from the model name,
/// thread counts joined in from the per-vendor tables.
///
/// The tables must cover the dataset's model list; coverage is checked
/// before anything is written, and every gap is reported at once.
pub struct Normalizer {
    input: PathBuf,
    output: PathBuf,
    amd_threads: PathBuf,
    intel_threads: PathBuf,
}

impl Normalizer {
    pub fn new<P: Into<PathBuf>>(input: P, output: P, amd_threads: P, intel_threads: P) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            amd_threads: amd_threads.into(),
            intel_threads: intel_threads.into(),
        }
    }

    pub async fn run(&self) -> Result<NormalizeReport, SourceError> {
        let amd = ThreadTable::load(&self.amd_threads).await?;
        let intel = ThreadTable::load(&self.intel_threads).await?;

        let text = slurp(&self.input).await?;
        /* the published file opens with a units banner, not the header */
        let body = match text.split_once('\n') {
            Some((_banner, body)) => body,
            None => {
                return Err(SourceError::Invalid {
                    path: self.input.clone(),
                    message: "no header row under the banner".to_string(),
                })
            }
        };

        let mut reader = csv::Reader::from_reader(body.as_bytes());
        let headers = reader
            .headers()
            .map_err(|source| SourceError::Malformed {
                path: self.input.clone(),
                source,
            })?
            .clone();
        let columns =
            required_columns(&self.input, &headers, &[MODEL, TDP, CORES, TDP_PER_CORE, SOURCE])?;
        let model_column = columns[0];

        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut missing: BTreeSet<String> = BTreeSet::new();
        let mut dropped = 0usize;
        for row in reader.records() {
            let row = row.map_err(|source| SourceError::Malformed {
                path: self.input.clone(),
                source,
            })?;
            let raw_model = row.get(model_column).unwrap_or("").trim();
            if raw_model == SENTINEL_MODEL {
                dropped += 1;
                continue;
            }

            let manufacturer = Manufacturer::infer(raw_model);
            let model = clean_model(raw_model);
            let table = match manufacturer {
                Manufacturer::Intel => &intel,
                _ => &amd,
            };
            let threads = match table.get(&model) {
                Some(threads) => threads,
                None => {
                    missing.insert(model);
                    continue;
                }
            };

            let mut cells: Vec<String> = row.iter().map(str::to_string).collect();
            if let Some(cell) = cells.get_mut(model_column) {
                *cell = model;
            }
            cells.push(manufacturer.to_string());
            cells.push(threads.to_string());
            rows.push(cells);
        }

        if !missing.is_empty() {
            return Err(SourceError::Invalid {
                path: self.input.clone(),
                message: format!(
                    "no thread count on file for: {}",
                    missing.into_iter().collect::<Vec<_>>().join(", ")
                ),
            });
        }

        let write_error = |source| SourceError::Malformed {
            path: self.output.clone(),
            source,
        };
        let mut writer = csv::Writer::from_writer(Vec::new());
        let header_row: Vec<&str> = headers
            .iter()
            .chain(vec![MANUFACTURER, THREADS])
            .collect();
        writer.write_record(&header_row).map_err(write_error)?;
        for row in &rows {
            writer.write_record(row).map_err(write_error)?;
        }
        let bytes = writer.into_inner().map_err(|error| SourceError::Invalid {
            path: self.output.clone(),
            message: error.to_string(),
        })?;
        tokio::fs::write(&self.output, bytes)
            .await
            .map_err(|source| SourceError::Read {
                path: self.output.clone(),
                source,
            })?;

        Ok(NormalizeReport {
            rows: rows.len(),
            dropped,
        })
    }
}

/// The normalized dataset, as a merge source. Manufacturer and provenance
/// come from the file rather than from this module.
pub struct GreenAlgorithmsSource {
    path: PathBuf,
}

impl GreenAlgorithmsSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for GreenAlgorithmsSource {
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
        let columns = required_columns(
            &self.path,
            &headers,
            &[MODEL, TDP, CORES, TDP_PER_CORE, SOURCE, MANUFACTURER, THREADS],
        )?;

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

            let bad = |field: &'static str, value: &str| RowError::BadValue {
                line,
                field,
                value: value.to_string(),
            };
            let manufacturer = match cell(5).parse::<Manufacturer>() {
                Ok(manufacturer) => manufacturer,
                Err(_) => {
                    extraction.skip(bad(MANUFACTURER, cell(5)));
                    continue;
                }
            };
            let tdp = match parse_watts(cell(1)) {
                Some(tdp) => tdp,
                None => {
                    extraction.skip(bad(TDP, cell(1)));
                    continue;
                }
            };
            /* core counts in the dataset render as floats */
            let n_cores = match parse_count(cell(2)) {
                Some(n) => n,
                None => {
                    extraction.skip(bad(CORES, cell(2)));
                    continue;
                }
            };
            let n_threads = match parse_count(cell(6)) {
                Some(n) => n,
                None => {
                    extraction.skip(bad(THREADS, cell(6)));
                    continue;
                }
            };

            extraction.push(Processor::new(
                cell(0).to_string(),
                manufacturer,
                tdp,
                n_cores,
                n_threads,
                cell(4).to_string(),
            ));
        }

        Ok(extraction)
    }
}
