use super::page::report;
use super::{DataChunk, Paginator, ProgressFn};
use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Iterator over every page of a [`Paginator`], see
/// [`Paginator::get_page_iterator`].
///
/// Chunks are requested strictly in ascending order. Nothing is fetched until
/// [`Iterator::next`] is called, so a consumer cancels by simply dropping the
/// iterator, or from another thread through [`Self::cancel_on`].
/// The first failed page is yielded as an error and ends the sequence.
pub struct Chunks<'p, P> {
    paginator: &'p mut P,
    page_size: usize,
    total_chunks: usize,
    next_chunk: usize,
    progress: Option<ProgressFn<'p>>,
    /// Rows loaded since the last progress report.
    unreported_rows: usize,
    cancel: Option<Arc<AtomicBool>>,
    done: bool,
}

impl<'p, P: Paginator> Chunks<'p, P> {
    pub(crate) fn new(
        paginator: &'p mut P,
        page_size: usize,
        progress: Option<ProgressFn<'p>>,
    ) -> Self {
        let total_chunks = match page_size {
            0 => 0,
            size => paginator.get_total_rows().div_ceil(size),
        };

        Self {
            paginator,
            page_size,
            total_chunks,
            next_chunk: 0,
            progress,
            unreported_rows: 0,
            cancel: None,
            done: false,
        }
    }

    /// Stops the iteration before the next fetch once `flag` is set.
    pub fn cancel_on(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Reports on the first chunk and then every `progress_update_interval` rows.
    fn report_progress(&mut self, chunk_number: usize) {
        let interval = self.paginator.config().progress_update_interval;
        if chunk_number > 0 && self.unreported_rows < interval {
            return;
        }

        self.unreported_rows = 0;
        let percent = (chunk_number * 100 / self.total_chunks) as u8;
        report(
            &mut self.progress,
            &format!("Loading chunk {} of {}", chunk_number + 1, self.total_chunks),
            percent,
        );
    }
}

impl<P: Paginator> Iterator for Chunks<'_, P> {
    type Item = Result<DataChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next_chunk >= self.total_chunks || self.cancelled() {
            return None;
        }

        let chunk_number = self.next_chunk;
        self.next_chunk += 1;
        self.report_progress(chunk_number);

        let started = Instant::now();
        let (data, info) = match self.paginator.get_page(chunk_number, self.page_size, None) {
            Ok(page) => page,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };

        self.unreported_rows += data.len();

        Some(Ok(DataChunk {
            data,
            chunk_number,
            total_chunks: self.total_chunks,
            start_row: info.start_row,
            end_row: info.end_row,
            memory_usage_mb: info.memory_usage_mb,
            load_time: started.elapsed(),
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }

        let remaining = self.total_chunks - self.next_chunk.min(self.total_chunks);
        (0, Some(remaining))
    }
}
