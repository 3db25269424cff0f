use async_trait::async_trait;
use std::path::Path;
use structopt::StructOpt;

use tdpcollect::modules::green_algorithms::Normalizer;
use tdpcollect::modules::{merge, MergeInputs};

use crate::common::Run;

/* Everything is addressed relative to the vendor-resources directory the
 * reference table lives in; there is nothing to configure. */
const AMD_SPECS: &str = "AMD/amd-all-specification.csv";
const AMPERE_ALTRA_SPECS: &str = "AMPERE/ampere-altra-specification.csv";
const AMPERE_ONE_SPECS: &str = "AMPERE/ampere-one-specification.csv";
const INTEL_SPEC_DIR: &str = "Intel";
const GREEN_ALGORITHMS_RAW: &str = "GreenAlgorithms/TDP_cpu.v2.2.csv";
const GREEN_ALGORITHMS_UPDATED: &str = "GreenAlgorithms/TDP_cpu.v2.2.updated.csv";
const AMD_THREAD_TABLE: &str = "GreenAlgorithms/amd-threads.csv";
const INTEL_THREAD_TABLE: &str = "GreenAlgorithms/intel-threads.csv";
const MERGED_OUTPUT: &str = "../TDP_cpu.v2.2.csv";

#[derive(StructOpt)]
#[structopt(name = "tdpcollect-cli")]
pub enum Command {
    /// Rewrite the raw GreenAlgorithms dataset with manufacturer and
    /// thread-count columns
    Normalize,
    /// Merge every vendor export into the reference table
    Merge,
}

#[async_trait]
impl Run for Command {
    async fn run(&self, serializer: &mut (dyn erased_serde::Serializer + Send)) -> anyhow::Result<()> {
        match self {
            Self::Normalize => {
                let report = Normalizer::new(
                    GREEN_ALGORITHMS_RAW,
                    GREEN_ALGORITHMS_UPDATED,
                    AMD_THREAD_TABLE,
                    INTEL_THREAD_TABLE,
                )
                .run()
                .await?;
                erased_serde::serialize(&report, serializer)?;
            }
            Self::Merge => {
                let (table, report) = merge(MergeInputs {
                    amd: Path::new(AMD_SPECS),
                    ampere_altra: Path::new(AMPERE_ALTRA_SPECS),
                    ampere_one: Path::new(AMPERE_ONE_SPECS),
                    intel_dir: Path::new(INTEL_SPEC_DIR),
                    green_algorithms: Path::new(GREEN_ALGORITHMS_UPDATED),
                })
                .await;

                let mut out = Vec::new();
                table.write_reference(&mut out)?;
                tokio::fs::write(MERGED_OUTPUT, out).await?;
                erased_serde::serialize(&report, serializer)?;
            }
        }

        Ok(())
    }
}
