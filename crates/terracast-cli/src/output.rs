//! Report rendering.

use serde_json::json;

use terracast_ingest::IngestReport;

use crate::cli::OutputFormat;

/// Prints one ingestion report in the chosen format.
pub fn print_report(scope: &str, report: &IngestReport, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            println!("{scope}");
            println!("  phase:         {}", report.phase);
            if let Some(id) = &report.snapshot_id {
                println!("  snapshot:      {id}");
            }
            println!("  content hash:  {}", report.content_hash);
            println!("  rates:         {}", report.rate_count);
            if report.skipped_entries > 0 {
                println!("  skipped:       {}", report.skipped_entries);
            }
            println!("  backup:        {}", report.backup_path.display());
            if report.reused_existing {
                println!("  note:          identical active snapshot reused");
            }
        }
        OutputFormat::Json => {
            let value = json!({
                "scope": scope,
                "phase": report.phase,
                "snapshot_id": report.snapshot_id,
                "content_hash": report.content_hash,
                "rate_count": report.rate_count,
                "skipped_entries": report.skipped_entries,
                "backup_path": report.backup_path.display().to_string(),
                "reused_existing": report.reused_existing,
            });
            println!("{}", serde_json::to_string_pretty(&value).expect("report serializes"));
        }
    }
}
