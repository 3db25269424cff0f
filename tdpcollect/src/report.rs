use serde::Serialize;

/// Per-source outcome of a merge run. `skipped` carries the rendered
/// per-row failures so a regeneration log shows exactly what fell out.
#[derive(Serialize, Debug)]
pub struct SourceSummary {
    pub source: &'static str,
    pub collected: usize,
    pub skipped: Vec<String>,
    pub error: Option<String>,
}

/// What a merge run did, serialized for whoever regenerated the table.
#[derive(Serialize, Debug, Default)]
pub struct MergeReport {
    pub sources: Vec<SourceSummary>,
    pub total: usize,
}

/// What a normalize run did.
#[derive(Serialize, Debug)]
pub struct NormalizeReport {
    /// Rows written to the updated dataset.
    pub rows: usize,
    /// Placeholder rows dropped on the way.
    pub dropped: usize,
}
