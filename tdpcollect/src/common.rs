use anyhow::bail;
use async_trait::async_trait;
use lazy_static::lazy_static;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::{
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;

use crate::schemas::processor::Extraction;

/// A CPU vendor.
#[derive(SerializeDisplay, DeserializeFromStr, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Manufacturer {
    Amd,
    Intel,
    Ampere,
}

impl Manufacturer {
    /// Guess the vendor from a bare model name.
    /// The GreenAlgorithms dataset only carries Intel and AMD parts, so
    /// anything that isn't recognizably a Xeon or a Core is taken as AMD.
    pub fn infer<S: AsRef<str>>(model: S) -> Self {
        let model = model.as_ref();
        if model.contains("Xeon") || model.contains("Core") {
            Self::Intel
        } else {
            Self::Amd
        }
    }
}

impl FromStr for Manufacturer {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "amd" => Ok(Self::Amd),
            "intel" => Ok(Self::Intel),
            "ampere" => Ok(Self::Ampere),
            _ => bail!("no such manufacturer: {}", s),
        }
    }
}

impl Display for Manufacturer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Amd => "AMD",
                Self::Intel => "Intel",
                Self::Ampere => "Ampere",
            }
        )
    }
}

/// Convert a vendor power cell to watts.
///
/// ## Example
/// ```txt
/// "65W"    -> 65.0
/// "105W+"  -> 105.0
/// "35-54W" -> 44.5 (configurable-TDP parts ship a range; take the midpoint)
/// "12.5"   -> 12.5
/// ```
pub fn parse_watts<T: AsRef<str>>(s: T) -> Option<f64> {
    let cleaned = s.as_ref().replace('W', "").replace('+', "");
    let cleaned = cleaned.trim();
    if let Some((low, high)) = cleaned.split_once('-') {
        Some((low.trim().parse::<f64>().ok()? + high.trim().parse::<f64>().ok()?) / 2.0)
    } else {
        cleaned.parse().ok()
    }
}

/// Parse a count cell, tolerating the float rendering some exports use.
/// "12" and "12.0" both come back as 12.
pub fn parse_count<T: AsRef<str>>(s: T) -> Option<u32> {
    let cleaned = s.as_ref().trim().replace(',', "");
    if let Ok(n) = cleaned.parse::<u32>() {
        return Some(n);
    }
    cleaned.parse::<f64>().ok().map(|f| f as u32)
}

/// Strip vendor decorations from a model cell.
///
/// ## Example
/// ```txt
/// "AMD Ryzen™ 5 3600"     -> "Ryzen 5 3600"
/// "Intel® Xeon® Gold 6148" -> "Xeon Gold 6148"
/// ```
pub fn clean_model<S: AsRef<str>>(s: S) -> String {
    lazy_static! {
        static ref RE_DECORATION: regex::Regex = regex::Regex::new(r"AMD|Intel|®|™").unwrap();
        static ref RE_SPACE: regex::Regex = regex::Regex::new(r"\s+").unwrap();
    };

    let stripped = RE_DECORATION.replace_all(s.as_ref(), "");
    RE_SPACE.replace_all(stripped.trim(), " ").into_owned()
}

/// A failure that takes down an entire source file.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("could not read {}: {}", path.display(), source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: missing required column {:?}", path.display(), column)]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("{}: {}", path.display(), source)]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{}: no processor columns found", path.display())]
    Empty { path: PathBuf },
    #[error("{}: {}", path.display(), message)]
    Invalid { path: PathBuf, message: String },
}

/// A failure confined to a single row of a source file. The row is skipped,
/// its siblings still go through.
#[derive(Error, Debug)]
pub enum RowError {
    #[error("line {line}: unreadable row: {message}")]
    Unreadable { line: u64, message: String },
    #[error("line {line}: {field} {value:?} did not parse")]
    BadValue {
        line: u64,
        field: &'static str,
        value: String,
    },
    #[error("{processor}: {field} {value:?} did not parse")]
    BadCell {
        processor: String,
        field: &'static str,
        value: String,
    },
    #[error("{processor}: no {field} cell")]
    MissingCell {
        processor: String,
        field: &'static str,
    },
}

/// One vendor export. A source produces the records that normalized cleanly
/// together with the typed reasons for every row it skipped.
#[async_trait]
pub trait DataSource {
    async fn produce(&self) -> Result<Extraction, SourceError>;
}

/// Read a source file fully into memory, shedding the byte-order mark the
/// AMD export leads with.
pub(crate) async fn slurp(path: &Path) -> Result<String, SourceError> {
    let mut text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    if text.starts_with('\u{feff}') {
        text.drain(..'\u{feff}'.len_utf8());
    }
    Ok(text)
}

/// Resolve the indices of the columns a parser needs, failing on the first
/// one the export doesn't carry.
pub(crate) fn required_columns(
    path: &Path,
    headers: &csv::StringRecord,
    wanted: &[&'static str],
) -> Result<Vec<usize>, SourceError> {
    wanted
        .iter()
        .map(|&column| {
            headers
                .iter()
                .position(|header| header.trim() == column)
                .ok_or_else(|| SourceError::MissingColumn {
                    path: path.to_path_buf(),
                    column,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{clean_model, parse_count, parse_watts, Manufacturer};
    use std::str::FromStr;

    #[test]
    fn test_parse_watts() {
        assert_eq!(parse_watts("65W").unwrap(), 65.0);
        assert_eq!(parse_watts("65").unwrap(), 65.0);
        assert_eq!(parse_watts("105W+").unwrap(), 105.0);
        assert_eq!(parse_watts(" 12.5 ").unwrap(), 12.5);
        assert_eq!(parse_watts("35-54W").unwrap(), 44.5);
        assert_eq!(parse_watts("35 - 54"), Some(44.5));
        assert_eq!(parse_watts(""), None);
        assert_eq!(parse_watts("TBD"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("12").unwrap(), 12);
        assert_eq!(parse_count("12.0").unwrap(), 12);
        assert_eq!(parse_count(" 128 ").unwrap(), 128);
        assert_eq!(parse_count("eight"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn test_clean_model() {
        assert_eq!(clean_model("AMD Ryzen™ 5 3600"), "Ryzen 5 3600");
        assert_eq!(clean_model("Intel® Xeon® Gold 6148 Processor"), "Xeon Gold 6148 Processor");
        assert_eq!(clean_model("Intel® Core™ i7-10700K"), "Core i7-10700K");
        assert_eq!(clean_model("AmpereOne® A192-32X"), "AmpereOne A192-32X");
        /* nothing to strip */
        assert_eq!(clean_model("FX-8350"), "FX-8350");
    }

    #[test]
    fn test_manufacturer_inference() {
        assert_eq!(Manufacturer::infer("Xeon E5-2690 v2"), Manufacturer::Intel);
        assert_eq!(Manufacturer::infer("Core 2 Quad Q6600"), Manufacturer::Intel);
        assert_eq!(Manufacturer::infer("AMD Ryzen 5 3600"), Manufacturer::Amd);
        assert_eq!(Manufacturer::infer("FX-8350"), Manufacturer::Amd);
    }

    #[test]
    fn test_manufacturer_round_trip() {
        for name in &["AMD", "Intel", "Ampere"] {
            assert_eq!(
                Manufacturer::from_str(name).unwrap().to_string().as_str(),
                *name
            );
        }
        assert!(Manufacturer::from_str("Motorola").is_err());
    }
}
