//! Apply-batch command implementation.
//!
//! Replays a saved webhook body against the local replica. No remote is
//! reachable offline, so any event that needs a refetch fails; the other
//! events of the batch still apply.

use super::{OfflineRemote, Replica};
use loansync_engine::{BatchSummary, EventDispatcher, Reconciler, SyncConfig};
use loansync_protocol::SubscriptionEventsBatch;
use std::fs;
use std::path::Path;

/// Decodes `file` and dispatches it.
pub fn apply(
    replica: &Replica,
    config: &SyncConfig,
    file: &Path,
) -> Result<BatchSummary, Box<dyn std::error::Error>> {
    let body = fs::read(file)?;
    let batch = SubscriptionEventsBatch::from_slice(&body)?;

    let reconciler = Reconciler::new(replica.loans.clone(), OfflineRemote);
    let dispatcher = EventDispatcher::new(reconciler, config.object_type.clone());
    Ok(dispatcher.dispatch(&batch)?)
}

/// Runs the apply-batch command.
pub fn run(
    replica: &Replica,
    config: &SyncConfig,
    file: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let summary = apply(replica, config, file)?;

    println!("Events:     {}", summary.events);
    println!("Reconciled: {}", summary.reconciled);
    println!("Written:    {}", summary.written);
    println!("Pings:      {}", summary.pings);
    println!("Filtered:   {}", summary.filtered);
    println!("Malformed:  {}", summary.malformed);
    Ok(())
}
