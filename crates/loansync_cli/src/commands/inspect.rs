//! Inspect command implementation.

use super::Replica;
use loansync_storage::ObjectStore;
use serde::Serialize;

/// Replica inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Data directory path.
    pub path: String,
    /// Number of stored loans.
    pub loan_count: usize,
    /// Whether a bulk import has completed.
    pub synced: bool,
}

/// Collects the inspection result.
pub fn collect(replica: &Replica) -> Result<InspectResult, Box<dyn std::error::Error>> {
    Ok(InspectResult {
        path: replica.dir.path().display().to_string(),
        loan_count: replica.loans.count()?,
        synced: replica.status.read()?.unwrap_or_default().synced,
    })
}

/// Runs the inspect command.
pub fn run(replica: &Replica, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = collect(replica)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("loansync Replica Inspection");
    println!("===========================");
    println!();
    println!("Path:   {}", result.path);
    println!("Loans:  {}", result.loan_count);
    println!(
        "Status: {}",
        if result.synced {
            "synced"
        } else {
            "not synced (next start imports)"
        }
    );
}
