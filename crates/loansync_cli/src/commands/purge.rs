//! Purge command implementation.
//!
//! Removes one loan from the replica. If the loan still exists remotely it
//! comes back on the next event that refetches it, or on a forced import.

use super::Replica;
use loansync_storage::ObjectStore;
use tracing::info;

/// Deletes `id`; returns whether it was present.
pub fn purge(replica: &Replica, id: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let existed = replica.loans.read(id)?.is_some();
    replica.loans.delete(id)?;
    if existed {
        info!(object_id = id, "Purged loan");
    }
    Ok(existed)
}

/// Runs the purge command.
pub fn run(replica: &Replica, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    if purge(replica, id)? {
        println!("Purged {id}");
    } else {
        println!("No loan with id {id:?}; nothing to purge");
    }
    Ok(())
}
