use std::collections::BTreeMap;
use std::io::Write;

use crate::schemas::processor::{Extraction, Processor};

/// The merged model → spec mapping. Keys are cleaned model names; a later
/// insert for the same model replaces the earlier record wholesale.
#[derive(Debug, Default)]
pub struct ProcessorTable(BTreeMap<String, Processor>);

impl ProcessorTable {
    pub fn insert(&mut self, record: Processor) -> Option<Processor> {
        self.0.insert(record.model.clone(), record)
    }

    /// Fold one source's records in. Returns how many records came over.
    pub fn absorb(&mut self, extraction: Extraction) -> usize {
        let collected = extraction.records.len();
        for record in extraction.records {
            self.insert(record);
        }
        collected
    }

    pub fn get(&self, model: &str) -> Option<&Processor> {
        self.0.get(model)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Processor> {
        self.0.values()
    }

    /// Serialize in the layout the footprint plugin consumes: a two-line
    /// preamble, then bare comma-joined rows. Thread figures and the
    /// manufacturer are computed upstream but are not part of this format.
    pub fn write_reference<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "index,in Watt,,,")?;
        write!(out, "model,TDP,n_cores,TDP_per_core,source")?;
        for record in self.0.values() {
            write!(
                out,
                "\n{},{},{},{},{}",
                record.model, record.tdp, record.n_cores, record.tdp_per_core, record.source
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ProcessorTable;
    use crate::common::Manufacturer;
    use crate::schemas::processor::Processor;

    fn record(model: &str, tdp: f64, source: &str) -> Processor {
        Processor::new(
            model.to_string(),
            Manufacturer::Amd,
            tdp,
            8,
            16,
            source,
        )
    }

    #[test]
    fn test_last_writer_wins() {
        let mut table = ProcessorTable::default();
        table.insert(record("Ryzen 7 3700X", 65.0, "first"));
        table.insert(record("Ryzen 7 3700X", 105.0, "second"));

        assert_eq!(table.len(), 1);
        let kept = table.get("Ryzen 7 3700X").unwrap();
        /* the whole record is replaced, not merged field by field */
        assert_eq!(kept.tdp, 105.0);
        assert_eq!(kept.source, "second");
    }

    #[test]
    fn test_reference_layout() {
        let mut table = ProcessorTable::default();
        table.insert(record("EPYC 7551", 180.0, "https://example.invalid/amd"));

        let mut out = Vec::new();
        table.write_reference(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("index,in Watt,,,"));
        assert_eq!(lines.next(), Some("model,TDP,n_cores,TDP_per_core,source"));
        assert_eq!(
            lines.next(),
            Some("EPYC 7551,180,8,22.5,https://example.invalid/amd")
        );
        assert_eq!(lines.next(), None);
    }
}
