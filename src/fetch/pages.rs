use std::collections::VecDeque;

use tracing::trace;

use crate::error::Result;
use crate::service::{Cursor, Page};

/// Flattens a cursor-paged call into a stream of items.
///
/// The first call is made without a cursor, every following call with the
/// cursor of the previous page. The stream ends after a page without one,
/// and after the first error.
pub struct Pages<T, F> {
    fetch: F,
    buffer: VecDeque<T>,
    cursor: Option<Cursor>,
    pages: usize,
    done: bool,
}

impl<T, F> Pages<T, F>
where
    F: FnMut(Option<&str>) -> Result<Page<T>>,
{
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            buffer: VecDeque::new(),
            cursor: None,
            pages: 0,
            done: false,
        }
    }

    /// Number of pages fetched so far.
    pub fn pages(&self) -> usize {
        self.pages
    }
}

impl<T, F> Iterator for Pages<T, F>
where
    F: FnMut(Option<&str>) -> Result<Page<T>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }

            match (self.fetch)(self.cursor.as_deref()) {
                Ok(page) => {
                    self.pages += 1;
                    let next = page.next.filter(|cursor| !cursor.is_empty());
                    trace!(page = self.pages, items = page.items.len(), more = next.is_some());
                    self.buffer.extend(page.items);
                    self.done = next.is_none();
                    self.cursor = next;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
