//! Bounded collection of export rows
//!
//! Browser exports stop after a configured number of rows and tell the
//! user once that the list was cut short.

/// Text of the single warning attached to a truncated export
pub fn truncation_warning(limit: usize) -> String {
    format!(
        "Warning: Only the first {} lines are displayed. To see the whole list, \
         run `lcx-export list` from the command line.",
        limit
    )
}

/// Collects items until `limit` counted items were taken
///
/// Uncounted items are kept without touching the limit. Once an attempt
/// is made to go past the limit, the collector is marked truncated.
#[derive(Debug, Clone)]
pub struct TakeWithWarning<T> {
    items: Vec<T>,
    limit: Option<usize>,
    counted: usize,
    truncated: bool,
}

impl<T> TakeWithWarning<T> {
    /// `None` collects without limit
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            items: Vec::new(),
            limit,
            counted: 0,
            truncated: false,
        }
    }

    /// No further counted item fits
    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.counted >= limit)
    }

    /// Add a counted item; returns `false` and marks truncation when full
    pub fn push(&mut self, item: T) -> bool {
        if self.is_full() {
            self.truncated = true;
            return false;
        }
        self.counted += 1;
        self.items.push(item);
        true
    }

    pub fn push_uncounted(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn mark_truncated(&mut self) {
        self.truncated = true;
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn items_mut(&mut self) -> &mut [T] {
        &mut self.items
    }

    /// Collected items and whether the limit cut the input short
    pub fn into_inner(self) -> (Vec<T>, bool) {
        (self.items, self.truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited() {
        let mut take = TakeWithWarning::new(None);
        for i in 0..1000 {
            assert!(take.push(i));
        }
        assert!(!take.is_full());

        let (items, truncated) = take.into_inner();
        assert_eq!(items.len(), 1000);
        assert!(!truncated);
    }

    #[test]
    fn test_limit_reached_exactly_is_not_truncated() {
        let mut take = TakeWithWarning::new(Some(2));
        assert!(take.push("a"));
        assert!(take.push("b"));
        assert!(take.is_full());

        let (items, truncated) = take.into_inner();
        assert_eq!(items, vec!["a", "b"]);
        assert!(!truncated);
    }

    #[test]
    fn test_push_past_limit() {
        let mut take = TakeWithWarning::new(Some(1));
        assert!(take.push("a"));
        assert!(!take.push("b"));
        assert!(!take.push("c"));

        let (items, truncated) = take.into_inner();
        assert_eq!(items, vec!["a"]);
        assert!(truncated);
    }

    #[test]
    fn test_uncounted_items_bypass_limit() {
        let mut take = TakeWithWarning::new(Some(1));
        take.push_uncounted("dir");
        assert!(take.push("a"));
        take.push_uncounted("other dir");

        let (items, truncated) = take.into_inner();
        assert_eq!(items, vec!["dir", "a", "other dir"]);
        assert!(!truncated);
    }

    #[test]
    fn test_zero_limit() {
        let mut take = TakeWithWarning::new(Some(0));
        assert!(take.is_full());
        assert!(!take.push(1));
        assert!(take.truncated());
    }

    #[test]
    fn test_warning_mentions_limit() {
        assert!(truncation_warning(250).contains("first 250 lines"));
    }
}
