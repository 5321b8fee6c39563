//! Position maintenance for the waiting set
//!
//! Waiting positions must always read exactly 1..K. Every removal from the
//! waiting set is followed by `renumber` inside the same transaction, and
//! `verify_dense` re-reads the set before commit.

use crate::error::{CourtQueueError, Result};
use crate::store::StoreTx;
use tracing::{debug, error};

/// Reassign waiting positions to 1..K keeping their relative order
///
/// Returns the number of entries still waiting.
pub async fn renumber(tx: &mut dyn StoreTx) -> Result<usize> {
    let waiting = tx.waiting_entries().await?;
    let mut moved = 0;

    for (index, entry) in waiting.iter().enumerate() {
        let target = index as u32 + 1;
        if entry.position != target {
            let mut updated = entry.clone();
            updated.position = target;
            tx.update_entry(&updated).await?;
            moved += 1;
        }
    }

    debug!(
        "Renumbered waiting set - waiting: {}, moved: {}",
        waiting.len(),
        moved
    );
    verify_dense(tx).await
}

/// Fail with `IntegrityViolation` unless waiting positions are exactly 1..K
pub async fn verify_dense(tx: &mut dyn StoreTx) -> Result<usize> {
    let waiting = tx.waiting_entries().await?;

    for (index, entry) in waiting.iter().enumerate() {
        let expected = index as u32 + 1;
        if entry.position != expected {
            error!(
                "Waiting positions are not dense - entry: {}, participant: {}, position: {}, expected: {}",
                entry.id, entry.participant_id, entry.position, expected
            );
            return Err(CourtQueueError::integrity(format!(
                "waiting position {} found where {} was expected",
                entry.position, expected
            )));
        }
    }

    Ok(waiting.len())
}
