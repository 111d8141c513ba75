//! Reset-status command implementation.

use super::Replica;

/// Runs the reset-status command.
pub fn run(replica: &Replica) -> Result<(), Box<dyn std::error::Error>> {
    replica.status.delete()?;
    println!("Sync status cleared; the next start runs a bulk import");
    Ok(())
}
