// Report export: a read-only projection of a session and its answers,
// handed to a pluggable renderer.

pub mod document;
pub mod handlers;
pub mod markdown;

use async_trait::async_trait;

pub use document::{build_report, ReportDocument};

/// A rendered report, ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub content_type: &'static str,
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Turns a fully materialised report into document bytes.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn render(&self, report: &ReportDocument) -> anyhow::Result<RenderedReport>;
}
