use async_trait::async_trait;
use erased_serde::Serializer;

/// A subcommand that does its work and serializes a run report.
#[async_trait]
pub trait Run {
    async fn run(&self, serializer: &mut (dyn Serializer + Send)) -> anyhow::Result<()>;
}
