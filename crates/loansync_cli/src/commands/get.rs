//! Get command implementation.

use super::Replica;
use loansync_storage::ObjectStore;

/// Runs the get command.
pub fn run(replica: &Replica, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    match replica.loans.read(id)? {
        Some(loan) => {
            println!("{}", serde_json::to_string_pretty(&loan)?);
            Ok(())
        }
        None => Err(format!("No loan with id {id:?}").into()),
    }
}
