pub mod amd;
pub mod ampere;
pub mod green_algorithms;
pub mod intel;

use std::path::Path;

use crate::common::DataSource;
use crate::report::{MergeReport, SourceSummary};
use crate::schemas::table::ProcessorTable;

/// The vendor exports a merge run reads. They are applied in the order the
/// fields are declared; later sources win model-name collisions.
pub struct MergeInputs<'a> {
    pub amd: &'a Path,
    pub ampere_altra: &'a Path,
    pub ampere_one: &'a Path,
    pub intel_dir: &'a Path,
    pub green_algorithms: &'a Path,
}

/// Run every source against one fresh table. A source that fails wholesale
/// contributes nothing and the rest still go through; the report says what
/// each one did.
pub async fn merge(inputs: MergeInputs<'_>) -> (ProcessorTable, MergeReport) {
    let sources: Vec<(&'static str, Box<dyn DataSource + Send>)> = vec![
        ("amd", Box::new(amd::AmdSpecSource::new(inputs.amd))),
        (
            "ampere-altra",
            Box::new(ampere::AmpereAltraSource::new(inputs.ampere_altra)),
        ),
        (
            "ampere-one",
            Box::new(ampere::AmpereOneSource::new(inputs.ampere_one)),
        ),
        ("intel", Box::new(intel::IntelArkSource::new(inputs.intel_dir))),
        (
            "green-algorithms",
            Box::new(green_algorithms::GreenAlgorithmsSource::new(
                inputs.green_algorithms,
            )),
        ),
    ];

    let mut table = ProcessorTable::default();
    let mut report = MergeReport::default();
    for (name, source) in sources {
        let summary = match source.produce().await {
            Ok(extraction) => {
                let skipped = extraction.skipped.iter().map(ToString::to_string).collect();
                let collected = table.absorb(extraction);
                tracing::info!("{}: collected {} processors", name, collected);
                SourceSummary {
                    source: name,
                    collected,
                    skipped,
                    error: None,
                }
            }
            Err(error) => {
                tracing::error!("{}: {}", name, error);
                SourceSummary {
                    source: name,
                    collected: 0,
                    skipped: Vec::new(),
                    error: Some(error.to_string()),
                }
            }
        };
        report.sources.push(summary);
    }
    report.total = table.len();

    (table, report)
}
