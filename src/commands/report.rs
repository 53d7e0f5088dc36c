//! Report command - print a stored report

use std::path::Path;

use code_audit::ledger::JsonLedgerStore;
use code_audit::output::OutputMode;
use code_audit::report::{ReportLookupError, read_report};

use super::load_settings;

/// Print the report of target `id`
pub fn report(project: Option<&Path>, id: u64, index: Option<usize>, mode: OutputMode) -> anyhow::Result<()> {
    let settings = load_settings(project)?;
    let store = JsonLedgerStore::new(&settings.ledger_path);

    match read_report(&store, id, index) {
        Ok(content) => {
            if mode == OutputMode::Json {
                println!(
                    "{}",
                    serde_json::json!({
                        "found": true,
                        "id": id,
                        "index": index.unwrap_or(0),
                        "content": content,
                    })
                );
            } else {
                print!("{content}");
            }
            Ok(())
        },
        Err(ReportLookupError::Store(e)) => Err(e),
        Err(e) => {
            if mode == OutputMode::Json {
                println!(
                    "{}",
                    serde_json::json!({
                        "found": false,
                        "id": id,
                        "reason": reason(&e),
                        "message": e.to_string(),
                    })
                );
            } else {
                eprintln!("{e}");
            }
            std::process::exit(1);
        },
    }
}

const fn reason(err: &ReportLookupError) -> &'static str {
    match err {
        ReportLookupError::UnknownTarget(_) => "unknown_target",
        ReportLookupError::NeverGenerated(_) => "never_generated",
        ReportLookupError::MissingOnDisk(_) => "missing_on_disk",
        ReportLookupError::IndexOutOfRange { .. } => "index_out_of_range",
        ReportLookupError::Unreadable { .. } => "unreadable",
        ReportLookupError::Store(_) => "store",
    }
}
