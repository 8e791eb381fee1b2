//! Single-page preview navigation

/// Tracks which page the preview shows (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreviewCursor {
    current: usize,
    total: usize,
}

impl PreviewCursor {
    /// Cursor on the first page of a `total` page document
    pub fn new(total: usize) -> Self {
        Self {
            current: if total == 0 { 0 } else { 1 },
            total,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Move by `delta` pages. Moves that would leave `1..=total` are ignored.
    pub fn navigate(&mut self, delta: isize) -> bool {
        let Some(target) = self.current.checked_add_signed(delta) else {
            return false;
        };
        if target == 0 || target > self.total {
            return false;
        }
        self.current = target;
        true
    }

    pub fn can_go_back(&self) -> bool {
        self.current > 1
    }

    pub fn can_go_forward(&self) -> bool {
        self.current < self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_on_first_page() {
        let cursor = PreviewCursor::new(5);
        assert_eq!(cursor.current(), 1);
        assert!(!cursor.can_go_back());
        assert!(cursor.can_go_forward());
    }

    #[test]
    fn test_navigation_stays_in_bounds() {
        let mut cursor = PreviewCursor::new(3);
        assert!(!cursor.navigate(-1));
        assert!(cursor.navigate(1));
        assert!(cursor.navigate(1));
        assert_eq!(cursor.current(), 3);
        assert!(!cursor.can_go_forward());
        assert!(!cursor.navigate(1));
        assert!(!cursor.navigate(isize::MIN));
        assert_eq!(cursor.current(), 3);
        assert!(cursor.navigate(-2));
        assert_eq!(cursor.current(), 1);
    }

    #[test]
    fn test_empty_document() {
        let mut cursor = PreviewCursor::default();
        assert_eq!(cursor.current(), 0);
        assert!(!cursor.navigate(1));
        assert!(!cursor.can_go_back());
        assert!(!cursor.can_go_forward());
    }
}
