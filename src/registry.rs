//! Page registry: stable page identities and their display positions
//!
//! Every page of the working document gets an identity (`original_index`)
//! when its document is merged in. Identity `k` always refers to page `k` of
//! the working document. Reordering only changes positions.

use crate::error::{Error, Result};

/// One page of the working document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEntry {
    /// Stable identity, assigned at merge time
    pub original_index: usize,
    /// Where the page is currently displayed
    pub current_position: usize,
}

/// Ordered page state for the working document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentState {
    /// Number of pages in the working document
    pub total_pages: usize,
    /// Entries ordered by `current_position`
    pub pages: Vec<PageEntry>,
}

/// Maintains the identity → position mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRegistry {
    state: DocumentState,
}

impl PageRegistry {
    /// Create a registry for a freshly loaded document
    pub fn initialize(page_count: usize) -> Result<Self> {
        if page_count == 0 {
            return Err(Error::InvalidDocument("document has no pages".to_string()));
        }
        let mut registry = Self::default();
        registry.push_entries(page_count, 0);
        Ok(registry)
    }

    /// Append the pages of another document after the current ones.
    ///
    /// Existing entries keep both their identity and their position.
    pub fn append(&mut self, page_count: usize) -> Result<()> {
        if page_count == 0 {
            return Err(Error::InvalidDocument("document has no pages".to_string()));
        }
        let next_id = self
            .state
            .pages
            .iter()
            .map(|entry| entry.original_index + 1)
            .max()
            .unwrap_or(0);
        self.push_entries(page_count, next_id);
        Ok(())
    }

    fn push_entries(&mut self, page_count: usize, first_id: usize) {
        let start = self.state.pages.len();
        self.state.pages.extend((0..page_count).map(|i| PageEntry {
            original_index: first_id + i,
            current_position: start + i,
        }));
        self.state.total_pages = self.state.pages.len();
    }

    /// Move one entry to `new_position`, shifting the entries in between by one slot
    pub fn move_to(&mut self, entry_id: usize, new_position: usize) -> Result<()> {
        let len = self.len();
        if new_position >= len {
            return Err(Error::OutOfRange { position: new_position, len });
        }
        let old_position = self
            .position_of(entry_id)
            .ok_or(Error::OutOfRange { position: entry_id, len })?;
        if old_position == new_position {
            return Ok(());
        }

        let entry = self.state.pages.remove(old_position);
        self.state.pages.insert(new_position, entry);

        let (low, high) = if old_position < new_position {
            (old_position, new_position)
        } else {
            (new_position, old_position)
        };
        for (position, entry) in self.state.pages.iter_mut().enumerate().take(high + 1).skip(low) {
            entry.current_position = position;
        }
        Ok(())
    }

    /// Page identities in display order
    pub fn current_order(&self) -> Vec<usize> {
        self.state.pages.iter().map(|entry| entry.original_index).collect()
    }

    /// Display position of the entry with the given identity
    pub fn position_of(&self, entry_id: usize) -> Option<usize> {
        self.state
            .pages
            .iter()
            .find(|entry| entry.original_index == entry_id)
            .map(|entry| entry.current_position)
    }

    /// Entry displayed at `position`
    pub fn entry_at(&self, position: usize) -> Option<&PageEntry> {
        self.state.pages.get(position)
    }

    pub fn entries(&self) -> &[PageEntry] {
        &self.state.pages
    }

    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.state.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.pages.is_empty()
    }

    /// Registry for the document composed from `saved_order`.
    ///
    /// Page `j` of the composed document is old page `saved_order[j]`, so each
    /// identity is mapped to its index in `saved_order` while the current
    /// display order is kept. Reorders made while the save was running
    /// survive the swap.
    pub fn rebased(&self, saved_order: &[usize]) -> Result<Self> {
        let len = self.len();
        if saved_order.len() != len {
            return Err(Error::OutOfRange { position: saved_order.len(), len });
        }
        let mut new_index = vec![None; len];
        for (j, &old) in saved_order.iter().enumerate() {
            match new_index.get_mut(old) {
                Some(slot) if slot.is_none() => *slot = Some(j),
                _ => return Err(Error::OutOfRange { position: old, len }),
            }
        }

        let mut pages = Vec::with_capacity(len);
        for (position, entry) in self.state.pages.iter().enumerate() {
            let original_index = new_index
                .get(entry.original_index)
                .copied()
                .flatten()
                .ok_or(Error::OutOfRange { position: entry.original_index, len })?;
            pages.push(PageEntry { original_index, current_position: position });
        }

        Ok(Self {
            state: DocumentState { total_pages: len, pages },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_positions_consistent(registry: &PageRegistry) {
        for (position, entry) in registry.entries().iter().enumerate() {
            assert_eq!(entry.current_position, position);
        }
        assert_eq!(registry.state().total_pages, registry.len());
    }

    #[test]
    fn test_initialize_identity_order() {
        let registry = PageRegistry::initialize(3).unwrap();
        assert_eq!(registry.current_order(), vec![0, 1, 2]);
        assert_positions_consistent(&registry);
    }

    #[test]
    fn test_initialize_rejects_empty_document() {
        let result = PageRegistry::initialize(0);
        assert!(matches!(result, Err(Error::InvalidDocument(_))));
    }

    #[test]
    fn test_append_keeps_existing_entries() {
        let mut registry = PageRegistry::initialize(3).unwrap();
        registry.move_to(2, 0).unwrap();
        let before = registry.entries().to_vec();

        registry.append(2).unwrap();

        assert_eq!(&registry.entries()[..3], before.as_slice());
        assert_eq!(registry.current_order(), vec![2, 0, 1, 3, 4]);
        assert_positions_consistent(&registry);
    }

    #[test]
    fn test_append_sequence_ids_unique_and_increasing() {
        let mut registry = PageRegistry::initialize(1).unwrap();
        let counts = [4, 2, 7, 1];
        for count in counts {
            registry.append(count).unwrap();
        }
        let order = registry.current_order();
        assert_eq!(order.len(), 1 + counts.iter().sum::<usize>());
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_append_rejects_zero_pages() {
        let mut registry = PageRegistry::initialize(2).unwrap();
        assert!(matches!(registry.append(0), Err(Error::InvalidDocument(_))));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_move_forward_shifts_left() {
        let mut registry = PageRegistry::initialize(5).unwrap();
        registry.move_to(1, 3).unwrap();
        assert_eq!(registry.current_order(), vec![0, 2, 3, 1, 4]);
        assert_positions_consistent(&registry);
    }

    #[test]
    fn test_move_backward_shifts_right() {
        let mut registry = PageRegistry::initialize(5).unwrap();
        registry.move_to(4, 1).unwrap();
        assert_eq!(registry.current_order(), vec![0, 4, 1, 2, 3]);
        assert_positions_consistent(&registry);
    }

    #[test]
    fn test_move_and_back_restores_order() {
        let mut registry = PageRegistry::initialize(6).unwrap();
        registry.move_to(3, 5).unwrap();
        registry.move_to(0, 2).unwrap();
        let original = registry.current_order();

        for (entry, target) in [(1, 0), (4, 2), (5, 5), (2, 4)] {
            let start = registry.position_of(entry).unwrap();
            registry.move_to(entry, target).unwrap();
            registry.move_to(entry, start).unwrap();
            assert_eq!(registry.current_order(), original);
        }
    }

    #[test]
    fn test_move_out_of_range_is_noop() {
        let mut registry = PageRegistry::initialize(3).unwrap();
        let result = registry.move_to(0, 3);
        assert!(matches!(result, Err(Error::OutOfRange { position: 3, len: 3 })));
        assert!(registry.move_to(9, 0).is_err());
        assert_eq!(registry.current_order(), vec![0, 1, 2]);
    }

    #[test]
    fn test_rebased_identity_after_plain_save() {
        let mut registry = PageRegistry::initialize(5).unwrap();
        registry.move_to(4, 0).unwrap();
        let saved = registry.current_order();

        let rebased = registry.rebased(&saved).unwrap();
        assert_eq!(rebased.current_order(), vec![0, 1, 2, 3, 4]);
        assert_positions_consistent(&rebased);
    }

    #[test]
    fn test_rebased_keeps_reorders_made_during_save() {
        let mut registry = PageRegistry::initialize(4).unwrap();
        registry.move_to(3, 0).unwrap();
        let saved = registry.current_order(); // [3, 0, 1, 2]

        // Swap the first two pages while the save runs
        registry.move_to(0, 0).unwrap();
        assert_eq!(registry.current_order(), vec![0, 3, 1, 2]);

        let rebased = registry.rebased(&saved).unwrap();
        // Old page 0 is new page 1, old page 3 is new page 0
        assert_eq!(rebased.current_order(), vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_rebased_rejects_non_permutation() {
        let registry = PageRegistry::initialize(3).unwrap();
        assert!(registry.rebased(&[0, 0, 1]).is_err());
        assert!(registry.rebased(&[0, 1]).is_err());
        assert!(registry.rebased(&[0, 1, 5]).is_err());
    }
}
