//! Page's cache implementation.
//!
//! This module keeps a handful of materialised pages around so that moving
//! back and forth between neighbouring pages doesn't hit the data source again.

use crate::db::QuerySet;
use std::sync::Arc;
use tracing::debug;

/// # Distance-Based Page Cache
///
/// Holds at most `max_size` pages of a single page size.
///
/// ## Structure
///
/// Pages live in a small **buffer** of [`Frame`]s kept in insertion order.
/// With the default limit of five pages a linear scan beats any page table.
///
/// Example of the cache with `max_size = 5` after loading pages `[0, 1, 2, 3, 4]`:
///
/// ```text
///  BUFFER
/// +--------+--------+--------+--------+--------+
/// | PAGE 0 | PAGE 1 | PAGE 2 | PAGE 3 | PAGE 4 |
/// +--------+--------+--------+--------+--------+
/// ```
///
/// ## Eviction Policy
///
/// When the buffer is full, the page **furthest** from the page being inserted
/// (by absolute page number difference) is evicted. Ties go to the page that
/// was inserted first.
///
/// Example: After loading page 5, page 0 is evicted:
///
/// ```text
///  BUFFER
/// +--------+--------+--------+--------+--------+
/// | PAGE 1 | PAGE 2 | PAGE 3 | PAGE 4 | PAGE 5 |
/// +--------+--------+--------+--------+--------+
/// ```
///
/// ## Page Size
///
/// Page `n` of size 10 and page `n` of size 50 are different rows. The cache
/// remembers the size its pages were built with and drops everything when a
/// page of another size comes in.
#[derive(Debug)]
pub(crate) struct PageCache {
    /// The maximum number of pages that this cache can handle.
    max_size: usize,
    /// Size of every cached page, [`None`] while empty.
    page_size: Option<usize>,
    buffer: Vec<Frame>,
}

#[derive(Debug)]
struct Frame {
    page_number: usize,
    data: Arc<QuerySet>,
}

const DEFAULT_MIN: usize = 1;

impl PageCache {
    pub fn with_max_size(max_size: usize) -> Self {
        assert!(
            max_size >= DEFAULT_MIN,
            "Page cache must hold at least {DEFAULT_MIN} page"
        );

        Self {
            max_size,
            page_size: None,
            buffer: Vec::with_capacity(max_size),
        }
    }

    /// Returns the cached page, if it was built with the same `page_size`.
    pub fn get(&self, page_number: usize, page_size: usize) -> Option<Arc<QuerySet>> {
        if self.page_size != Some(page_size) {
            return None;
        }

        self.buffer
            .iter()
            .find(|frame| frame.page_number == page_number)
            .map(|frame| Arc::clone(&frame.data))
    }

    /// Caches a page, evicting the furthest one if the buffer is full.
    ///
    /// Returns the evicted page number, if any.
    pub fn insert(
        &mut self,
        page_number: usize,
        page_size: usize,
        data: Arc<QuerySet>,
    ) -> Option<usize> {
        if self.page_size != Some(page_size) {
            if !self.buffer.is_empty() {
                debug!(
                    previous = ?self.page_size,
                    page_size,
                    "page size changed, dropping cached pages"
                );
            }

            self.buffer.clear();
            self.page_size = Some(page_size);
        }

        // best case: the page is already cached
        if let Some(frame) = self
            .buffer
            .iter_mut()
            .find(|frame| frame.page_number == page_number)
        {
            frame.data = data;
            return None;
        }

        let evicted = (self.buffer.len() >= self.max_size)
            .then(|| self.furthest_from(page_number))
            .flatten()
            .map(|idx| self.buffer.remove(idx).page_number);

        self.buffer.push(Frame { page_number, data });

        evicted
    }

    /// Index of the frame whose page is the furthest from `page_number`.
    /// The earliest inserted frame wins ties.
    fn furthest_from(&self, page_number: usize) -> Option<usize> {
        let mut furthest: Option<(usize, usize)> = None;

        for (idx, frame) in self.buffer.iter().enumerate() {
            let distance = frame.page_number.abs_diff(page_number);
            if furthest.is_none_or(|(_, max)| distance > max) {
                furthest = Some((idx, distance));
            }
        }

        furthest.map(|(idx, _)| idx)
    }

    #[cfg(test)]
    pub fn contains(&self, page_number: usize) -> bool {
        self.buffer.iter().any(|frame| frame.page_number == page_number)
    }

    /// Cached page numbers, oldest first.
    pub fn pages(&self) -> Vec<usize> {
        self.buffer.iter().map(|frame| frame.page_number).collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.page_size = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Value;

    fn page(marker: i64) -> Arc<QuerySet> {
        Arc::new(QuerySet::new(
            vec!["marker".into()],
            vec![vec![Value::Integer(marker)]],
        ))
    }

    impl PageCache {
        fn with_pages(pages: &[usize], max_size: usize) -> Self {
            let mut cache = Self::with_max_size(max_size);
            pages.iter().for_each(|number| {
                cache.insert(*number, 10, page(*number as i64));
            });

            cache
        }
    }

    #[test]
    fn test_sequential_eviction() {
        let mut cache = PageCache::with_pages(&[0, 1, 2, 3, 4], 5);

        assert_eq!(cache.insert(5, 10, page(5)), Some(0));
        assert_eq!(cache.pages(), vec![1, 2, 3, 4, 5]);
        assert!(!cache.contains(0));
    }

    #[test]
    fn test_backward_eviction() {
        let mut cache = PageCache::with_pages(&[5, 6, 7, 8, 9], 5);

        assert_eq!(cache.insert(4, 10, page(4)), Some(9));
        assert_eq!(cache.pages(), vec![5, 6, 7, 8, 4]);
    }

    #[test]
    fn test_jump_keeps_neighbours() {
        // an LRU would drop page 10 here, distance keeps it
        let mut cache = PageCache::with_pages(&[10, 0, 1, 2, 3], 5);

        assert_eq!(cache.insert(11, 10, page(11)), Some(0));
        assert!(cache.contains(10));
    }

    #[test]
    fn test_ties_evict_oldest() {
        let mut cache = PageCache::with_pages(&[4, 0], 2);

        assert_eq!(cache.insert(2, 10, page(2)), Some(4));
        assert_eq!(cache.pages(), vec![0, 2]);
    }

    #[test]
    fn test_get_returns_same_data() {
        let cache = PageCache::with_pages(&[0, 1], 5);

        let first = cache.get(1, 10).unwrap();
        let second = cache.get(1, 10).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.tuples, vec![vec![Value::Integer(1)]]);
        assert!(cache.get(7, 10).is_none());
    }

    #[test]
    fn test_page_size_change_drops_pages() {
        let mut cache = PageCache::with_pages(&[0, 1, 2], 5);

        assert!(cache.get(0, 20).is_none());

        cache.insert(0, 20, page(100));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(0, 20).unwrap().tuples[0][0], Value::Integer(100));
        assert!(cache.get(1, 10).is_none());
    }

    #[test]
    fn test_reinsert_does_not_evict() {
        let mut cache = PageCache::with_pages(&[0, 1, 2, 3, 4], 5);

        assert_eq!(cache.insert(2, 10, page(42)), None);
        assert_eq!(cache.len(), 5);
        assert_eq!(cache.get(2, 10).unwrap().tuples[0][0], Value::Integer(42));
    }

    #[test]
    fn test_clear() {
        let mut cache = PageCache::with_pages(&[0, 1, 2], 5);
        cache.clear();

        assert_eq!(cache.len(), 0);
        assert!(cache.get(0, 10).is_none());
    }
}
