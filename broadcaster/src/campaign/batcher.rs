//! Batch planning: contiguous slices of the recipient set.

use std::collections::HashSet;

use crate::campaign::RecipientId;

/// Contiguous slice of the recipient set, pre-filtered against the blocked set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position of this batch in the campaign (0-based)
    pub index: usize,
    /// Recipients to dispatch to, in input order
    pub targets: Vec<RecipientId>,
    /// Recipients filtered out because they are blocked
    pub blocked: Vec<RecipientId>,
}

impl Batch {
    /// A batch with nothing to send performs no dispatch and no pause.
    pub fn is_idle(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len() + self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split `recipients` into batches of `batch_size`, preserving input order.
///
/// A `batch_size` of 0 is treated as 1.
pub fn plan_batches(
    recipients: &[RecipientId],
    blocked: &HashSet<RecipientId>,
    batch_size: usize,
) -> Vec<Batch> {
    recipients
        .chunks(batch_size.max(1))
        .enumerate()
        .map(|(index, chunk)| {
            let (blocked_ids, targets): (Vec<_>, Vec<_>) =
                chunk.iter().copied().partition(|id| blocked.contains(id));
            Batch {
                index,
                targets,
                blocked: blocked_ids,
            }
        })
        .collect()
}
