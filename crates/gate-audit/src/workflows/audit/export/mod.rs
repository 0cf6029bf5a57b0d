mod document;
mod tabular;

pub use document::{
    audit_detail_file_name, site_summary_file_name, AuditDetailDocument, Document,
    DocumentFormatter, DocumentTable, PlainTextFormatter, SiteSummaryDocument,
};
pub use tabular::{csv_export_file_name, export_csv, export_json, json_export_file_name};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("json export failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("export buffer could not be finalized: {0}")]
    Buffer(String),
}
