//! The two Ampere product-brief exports. Neither reports threads; Ampere
//! cores are single-threaded, so the thread count mirrors the core count.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::common::{
    clean_model, parse_count, parse_watts, required_columns, slurp, DataSource, Manufacturer,
    RowError, SourceError,
};
use crate::schemas::processor::{Extraction, Processor};

const ALTRA_SOURCE_URL: &str = "https://amperecomputing.com/briefs/ampere-altra-family-product-brief";
const ONE_SOURCE_URL: &str = "https://amperecomputing.com/briefs/ampereone-family-product-brief";

const ALTRA_NAME: &str = "PRODUCT NAME";
const ALTRA_CORES: &str = "CORES";
const ALTRA_POWER: &str = "USAGE POWER (W)";

const ONE_NAME: &str = "Processor Model";
const ONE_CORES: &str = "Core Count";
const ONE_POWER: &str = "Usage Power*";

/// The Ampere Altra family brief. Product names are bare SKUs ("Q80-30"),
/// so the family name is prefixed to keep the merged keys unambiguous.
pub struct AmpereAltraSource {
    path: PathBuf,
}

impl AmpereAltraSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for AmpereAltraSource {
    async fn produce(&self) -> Result<Extraction, SourceError> {
        read_brief(
            &self.path,
            &[ALTRA_NAME, ALTRA_CORES, ALTRA_POWER],
            |name| format!("AmpereAltra {}", name.trim()),
            ALTRA_SOURCE_URL,
        )
        .await
    }
}

/// The AmpereOne family brief. Model cells already carry the family name
/// plus a registered-trademark glyph.
pub struct AmpereOneSource {
    path: PathBuf,
}

impl AmpereOneSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for AmpereOneSource {
    async fn produce(&self) -> Result<Extraction, SourceError> {
        read_brief(
            &self.path,
            &[ONE_NAME, ONE_CORES, ONE_POWER],
            |name| clean_model(name),
            ONE_SOURCE_URL,
        )
        .await
    }
}

/// Both briefs share a shape: name, core count, usage power, one row per
/// SKU. Only the headers and the model cleanup differ.
async fn read_brief<F>(
    path: &std::path::Path,
    columns: &[&'static str; 3],
    model: F,
    source_url: &'static str,
) -> Result<Extraction, SourceError>
where
    F: Fn(&str) -> String,
{
    let text = slurp(path).await?;
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|source| SourceError::Malformed {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let indices = required_columns(path, &headers, columns)?;

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
        let cell = |i: usize| row.get(indices[i]).unwrap_or("").trim();

        let tdp = match parse_watts(cell(2)) {
            Some(tdp) => tdp,
            None => {
                extraction.skip(RowError::BadValue {
                    line,
                    field: columns[2],
                    value: cell(2).to_string(),
                });
                continue;
            }
        };
        /* core counts render as floats in the Altra brief */
        let n_cores = match parse_count(cell(1)) {
            Some(n) => n,
            None => {
                extraction.skip(RowError::BadValue {
                    line,
                    field: columns[1],
                    value: cell(1).to_string(),
                });
                continue;
            }
        };

        extraction.push(Processor::new(
            model(cell(0)),
            Manufacturer::Ampere,
            tdp,
            n_cores,
            n_cores,
            source_url,
        ));
    }

    Ok(extraction)
}
