use serde::{Deserialize, Serialize};

use crate::common::{Manufacturer, RowError};

/// A normalized processor spec, one per vendor model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Processor {
    pub model: String,
    pub manufacturer: Manufacturer,
    pub tdp: f64,
    pub n_cores: u32,
    pub n_threads: u32,
    pub tdp_per_core: f64,
    pub tdp_per_thread: f64,
    pub source: String,
}

impl Processor {
    /// Build a record, deriving the per-core and per-thread figures.
    /// A part with no reported cores gets 0 rather than a division error.
    pub fn new<S: Into<String>>(
        model: String,
        manufacturer: Manufacturer,
        tdp: f64,
        n_cores: u32,
        n_threads: u32,
        source: S,
    ) -> Self {
        let per = |denominator: u32| {
            if denominator > 0 {
                tdp / denominator as f64
            } else {
                0.0
            }
        };

        Self {
            model,
            manufacturer,
            tdp,
            n_cores,
            n_threads,
            tdp_per_core: per(n_cores),
            tdp_per_thread: per(n_threads),
            source: source.into(),
        }
    }
}

/// What a [`crate::common::DataSource`] pulled out of one export.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<Processor>,
    pub skipped: Vec<RowError>,
}

impl Extraction {
    pub fn push(&mut self, record: Processor) {
        self.records.push(record);
    }

    /// Drop a row, keeping the reason.
    pub fn skip(&mut self, error: RowError) {
        tracing::warn!("skipping row: {}", error);
        self.skipped.push(error);
    }
}

#[cfg(test)]
mod tests {
    use super::Processor;
    use crate::common::Manufacturer;

    #[test]
    fn test_derived_figures() {
        let p = Processor::new(
            "Ryzen 5 3600".to_string(),
            Manufacturer::Amd,
            65.0,
            6,
            12,
            "https://example.invalid/amd",
        );
        assert_eq!(p.tdp_per_core, 65.0 / 6.0);
        assert_eq!(p.tdp_per_thread, 65.0 / 12.0);
    }

    #[test]
    fn test_zero_cores_divides_to_zero() {
        let p = Processor::new(
            "Mystery".to_string(),
            Manufacturer::Intel,
            95.0,
            0,
            0,
            "https://example.invalid/intel",
        );
        assert_eq!(p.tdp_per_core, 0.0);
        assert_eq!(p.tdp_per_thread, 0.0);
    }
}
