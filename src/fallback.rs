//! Fallback Data
//!
//! Fixed placeholder records served when the backend is confirmed offline,
//! so document and statistics views stay navigable. The snapshot is
//! versioned and never randomized.

use std::collections::HashMap;

use crate::models::{Document, DocumentList, DocumentStats, SystemInfo, SystemStats};
use crate::types::Operation;

/// Bump when the snapshot contents change.
pub const SNAPSHOT_VERSION: &str = "1";

/// Status reported by the mock `system` section.
pub const OFFLINE_STATUS: &str = "offline";

/// The placeholder document list.
pub fn documents() -> DocumentList {
    let documents = vec![
        Document {
            id: "sample-1".to_string(),
            filename: "quarterly_report.pdf".to_string(),
            processed: true,
            chunks_count: 24,
            file_size: Some(2_457_600),
            uploaded_date: Some("2024-01-15T10:30:00".to_string()),
        },
        Document {
            id: "sample-2".to_string(),
            filename: "research_notes.docx".to_string(),
            processed: true,
            chunks_count: 12,
            file_size: Some(1_048_576),
            uploaded_date: Some("2024-01-14T15:45:00".to_string()),
        },
        Document {
            id: "sample-3".to_string(),
            filename: "data_dictionary.txt".to_string(),
            processed: false,
            chunks_count: 0,
            file_size: Some(524_288),
            uploaded_date: Some("2024-01-13T09:00:00".to_string()),
        },
    ];

    DocumentList {
        total: documents.len(),
        documents,
        has_more: false,
    }
}

/// The placeholder statistics, derived from [`documents`] so the two agree.
pub fn system_stats() -> SystemStats {
    let list = documents();
    let total_documents = list.documents.len() as u64;
    let processed_documents = list.documents.iter().filter(|d| d.processed).count() as u64;
    let total_chunks: u64 = list.documents.iter().map(|d| d.chunks_count).sum();
    let total_size_bytes: u64 = list.documents.iter().filter_map(|d| d.file_size).sum();

    let mut file_types: HashMap<String, u64> = HashMap::new();
    for doc in &list.documents {
        if let Some(ext) = doc.filename.rsplit_once('.').map(|(_, ext)| ext) {
            *file_types.entry(format!(".{}", ext.to_lowercase())).or_insert(0) += 1;
        }
    }

    SystemStats {
        documents: DocumentStats {
            total_documents,
            processed_documents,
            unprocessed_documents: total_documents - processed_documents,
            total_chunks,
            total_size_bytes,
            total_size_mb: round_to(total_size_bytes as f64 / (1024.0 * 1024.0), 2),
            file_types,
            avg_chunks_per_doc: round_to(total_chunks as f64 / processed_documents.max(1) as f64, 1),
        },
        system: SystemInfo {
            status: OFFLINE_STATUS.to_string(),
            version: format!("mock-{}", SNAPSHOT_VERSION),
        },
    }
}

/// JSON fallback for a gateway operation, if it has one.
///
/// Health checks never get a fallback: masking them would hide real
/// connectivity loss.
pub fn for_operation(operation: Operation) -> Option<serde_json::Value> {
    match operation {
        Operation::Stats => serde_json::to_value(system_stats()).ok(),
        Operation::Documents => serde_json::to_value(documents()).ok(),
        Operation::HealthCheck
        | Operation::Ask
        | Operation::Upload
        | Operation::DeleteDocument
        | Operation::ExportPdf => None,
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
