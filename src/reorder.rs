//! Reorder controller: turns a drag between two thumbnail positions into a registry move

use tracing::debug;

use crate::error::{Error, Result};
use crate::registry::PageRegistry;

/// A finished drag gesture, in display positions (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDrag {
    pub from: usize,
    pub to: usize,
}

impl PageDrag {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }
}

/// Apply a drag to the registry.
///
/// The dragged page ends up at `to`; the pages in between shift one slot
/// toward the vacated position. Returns the identity of the moved page, or
/// `None` when the drag did not move anything. Invalid positions leave the
/// registry untouched.
pub fn apply_drag(registry: &mut PageRegistry, drag: PageDrag) -> Result<Option<usize>> {
    let len = registry.len();
    let entry_id = registry
        .entry_at(drag.from)
        .map(|entry| entry.original_index)
        .ok_or(Error::OutOfRange { position: drag.from, len })?;
    if drag.to >= len {
        return Err(Error::OutOfRange { position: drag.to, len });
    }
    if drag.from == drag.to {
        return Ok(None);
    }

    registry.move_to(entry_id, drag.to)?;
    debug!(page = entry_id, from = drag.from, to = drag.to, "page moved");
    Ok(Some(entry_id))
}
