use async_trait::async_trait;
use csv::ReaderBuilder;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::common::{
    clean_model, parse_count, parse_watts, slurp, DataSource, Manufacturer, RowError, SourceError,
};
use crate::schemas::processor::{Extraction, Processor};

const SOURCE_URL: &str =
    "https://www.intel.com/content/www/us/en/products/details/processors.html";

const FAMILY: &str = "Product Collection";
const CORES: &str = "Total Cores";
const THREADS: &str = "Total Threads";
const TDP: &str = "TDP";
const BASE_POWER: &str = "Processor Base Power";

/* two banner rows before the processor-name row */
const PREAMBLE_ROWS: usize = 2;

/// A directory of ark.intel.com comparison exports, one file per product
/// family. The tables are transposed: processors are columns, and the specs
/// sit in labeled attribute rows underneath a fixed preamble. Newer exports
/// call the power figure "Processor Base Power" instead of "TDP".
pub struct IntelArkSource {
    dir: PathBuf,
}

impl IntelArkSource {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl DataSource for IntelArkSource {
    async fn produce(&self) -> Result<Extraction, SourceError> {
        let read_error = |source| SourceError::Read {
            path: self.dir.clone(),
            source,
        };

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(read_error)?;
        while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut extraction = Extraction::default();
        for path in &files {
            /* a bad family export doesn't sink the other families */
            match family_export(path).await {
                Ok(mut family) => {
                    extraction.records.append(&mut family.records);
                    extraction.skipped.append(&mut family.skipped);
                }
                Err(error) => tracing::error!("{}", error),
            }
        }
        Ok(extraction)
    }
}

/// Pivot one family export into per-processor records.
async fn family_export(path: &Path) -> Result<Extraction, SourceError> {
    let text = slurp(path).await?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut names: Vec<String> = Vec::new();
    let mut attributes: Vec<HashMap<&'static str, String>> = Vec::new();
    let mut labels_seen: HashSet<&'static str> = HashSet::new();

    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|source| SourceError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        if index < PREAMBLE_ROWS {
            continue;
        }
        if index == PREAMBLE_ROWS {
            names = row.iter().skip(1).map(str::to_string).collect();
            attributes = vec![HashMap::new(); names.len()];
            continue;
        }

        let label = match [FAMILY, CORES, THREADS, TDP, BASE_POWER]
            .iter()
            .find(|&&label| row.get(0) == Some(label))
        {
            Some(&label) => label,
            None => continue,
        };
        labels_seen.insert(label);
        for (column, value) in row.iter().skip(1).enumerate() {
            if let Some(slot) = attributes.get_mut(column) {
                slot.insert(label, value.to_string());
            }
        }
    }

    if names.is_empty() {
        return Err(SourceError::Empty {
            path: path.to_path_buf(),
        });
    }
    for label in &[CORES, THREADS] {
        if !labels_seen.contains(label) {
            return Err(SourceError::MissingColumn {
                path: path.to_path_buf(),
                column: label,
            });
        }
    }
    if !labels_seen.contains(TDP) && !labels_seen.contains(BASE_POWER) {
        return Err(SourceError::MissingColumn {
            path: path.to_path_buf(),
            column: TDP,
        });
    }

    let mut extraction = Extraction::default();
    for (name, attrs) in names.iter().zip(attributes) {
        /* prefer the classic TDP row, fall back to the newer label */
        let power = match attrs.get(TDP).or_else(|| attrs.get(BASE_POWER)) {
            Some(power) => power.trim(),
            None => continue,
        };
        if power.is_empty() {
            /* ark leaves the power cell blank on some upcoming parts */
            tracing::debug!(
                "{}: no power figure for {} ({})",
                path.display(),
                name,
                attrs.get(FAMILY).map(String::as_str).unwrap_or("unknown family"),
            );
            continue;
        }

        let tdp = match parse_watts(power) {
            Some(tdp) => tdp,
            None => {
                extraction.skip(RowError::BadCell {
                    processor: name.clone(),
                    field: TDP,
                    value: power.to_string(),
                });
                continue;
            }
        };
        let count = |field: &'static str| -> Result<u32, RowError> {
            let value = attrs.get(field).ok_or(RowError::MissingCell {
                processor: name.clone(),
                field,
            })?;
            parse_count(value).ok_or_else(|| RowError::BadCell {
                processor: name.clone(),
                field,
                value: value.clone(),
            })
        };
        let n_cores = match count(CORES) {
            Ok(n) => n,
            Err(error) => {
                extraction.skip(error);
                continue;
            }
        };
        let n_threads = match count(THREADS) {
            Ok(n) => n,
            Err(error) => {
                extraction.skip(error);
                continue;
            }
        };

        extraction.push(Processor::new(
            clean_model(name),
            Manufacturer::Intel,
            tdp,
            n_cores,
            n_threads,
            SOURCE_URL,
        ));
    }

    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::IntelArkSource;
    use crate::common::{DataSource, RowError};
    use tempfile::TempDir;

    const COMET_LAKE: &str = "\
Intel ARK comparison export,,\n\
Generated for offline use,,\n\
,Intel® Core™ i7-10700K Processor,Intel® Core™ i9-10900K Processor\n\
Product Collection,10th Generation Intel® Core™ i7 Processors,10th Generation Intel® Core™ i9 Processors\n\
Lithography,14 nm,14 nm\n\
Total Cores,8,10\n\
Total Threads,16,20\n\
TDP,95W,125W\n";

    const SAPPHIRE_RAPIDS: &str = "\
Intel ARK comparison export,,\n\
Generated for offline use,,\n\
,Intel® Xeon® Platinum 8480+ Processor,Intel® Xeon® Gold 6430 Processor\n\
Product Collection,4th Gen Intel® Xeon® Scalable Processors,4th Gen Intel® Xeon® Scalable Processors\n\
Total Cores,56,32\n\
Total Threads,112,64\n\
Processor Base Power,350W,270W\n";

    fn export_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_pivots_processor_columns() {
        let dir = export_dir(&[("comet-lake.csv", COMET_LAKE)]);

        let extraction = IntelArkSource::new(dir.path()).produce().await.unwrap();
        assert_eq!(extraction.records.len(), 2);

        let i7 = extraction
            .records
            .iter()
            .find(|p| p.model == "Core i7-10700K Processor")
            .unwrap();
        assert_eq!(i7.tdp, 95.0);
        assert_eq!(i7.n_cores, 8);
        assert_eq!(i7.n_threads, 16);
        assert_eq!(i7.tdp_per_core, 11.875);
    }

    #[tokio::test]
    async fn test_base_power_fallback() {
        let dir = export_dir(&[("sapphire-rapids.csv", SAPPHIRE_RAPIDS)]);

        let extraction = IntelArkSource::new(dir.path()).produce().await.unwrap();
        let platinum = extraction
            .records
            .iter()
            .find(|p| p.model == "Xeon Platinum 8480+ Processor")
            .unwrap();
        assert_eq!(platinum.tdp, 350.0);
        assert_eq!(platinum.n_threads, 112);
    }

    #[tokio::test]
    async fn test_bad_family_file_spares_the_rest() {
        let dir = export_dir(&[
            ("a-broken.csv", "just,one,row\n"),
            ("comet-lake.csv", COMET_LAKE),
        ]);

        let extraction = IntelArkSource::new(dir.path()).produce().await.unwrap();
        assert_eq!(extraction.records.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_power_cell_skips_silently_bad_cores_do_not() {
        let export = "\
x,,\n\
y,,\n\
,Intel® Core™ i5-14600K Processor,Intel® Core™ i3-14100 Processor\n\
Total Cores,14,four\n\
Total Threads,20,8\n\
TDP,,60W\n";
        let dir = export_dir(&[("raptor-lake.csv", export)]);

        let extraction = IntelArkSource::new(dir.path()).produce().await.unwrap();
        /* the i5 has no power figure; the i3 has an unparseable core count */
        assert!(extraction.records.is_empty());
        assert_eq!(extraction.skipped.len(), 1);
        match &extraction.skipped[0] {
            RowError::BadCell { processor, field, .. } => {
                assert!(processor.contains("i3-14100"));
                assert_eq!(*field, "Total Cores");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
