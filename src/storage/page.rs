// Page-based storage
// Databases don't store individual rows - they store "pages" (fixed-size blocks)
// Each page holds a fixed number of row slots; a deleted row leaves an empty
// slot behind so that row IDs stay stable for indexes and the undo journal

use super::Row;
use serde::{Deserialize, Serialize};

/// A page is a fixed-size block of row slots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// The page ID (unique identifier)
    pub id: usize,
    /// The row slots in this page; None marks a deleted row
    pub slots: Vec<Option<Row>>,
    /// Maximum number of slots per page
    pub max_rows: usize,
}

impl Page {
    /// Create a new page with a given ID
    pub fn new(id: usize, max_rows: usize) -> Self {
        Self {
            id,
            slots: Vec::new(),
            max_rows,
        }
    }

    /// Append a row into the next free slot
    /// Returns the slot index, or None if the page is full
    pub fn insert(&mut self, row: Row) -> Option<usize> {
        if self.is_full() {
            return None;
        }

        self.slots.push(Some(row));
        Some(self.slots.len() - 1)
    }

    /// Check if every slot of the page has been handed out
    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.max_rows
    }

    /// Get a live row by slot index
    pub fn get(&self, index: usize) -> Option<&Row> {
        self.slots.get(index)?.as_ref()
    }

    /// Get a mutable reference to a live row (used for UPDATE operations)
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Row> {
        self.slots.get_mut(index)?.as_mut()
    }

    /// Delete a row by slot index, leaving the slot empty
    /// Returns the deleted row if the slot was live
    pub fn delete(&mut self, index: usize) -> Option<Row> {
        self.slots.get_mut(index)?.take()
    }

    /// Put a row back into a previously handed-out slot
    pub fn restore(&mut self, index: usize, row: Row) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = Some(row);
                true
            }
            None => false,
        }
    }

    /// Get the number of live rows in this page
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Check if the page holds no live rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Page Manager - handles multiple pages
/// Row ID format: page_id * max_rows_per_page + slot_index
#[derive(Debug, Clone)]
pub struct PageManager {
    pages: Vec<Page>,
    max_rows_per_page: usize,
}

impl PageManager {
    /// Create a new page manager
    pub fn new(max_rows_per_page: usize) -> Self {
        Self {
            pages: Vec::new(),
            max_rows_per_page,
        }
    }

    /// Insert a row, creating a new page when the last one is full
    /// Returns the global row ID
    pub fn insert(&mut self, row: Row) -> usize {
        if let Some(page) = self.pages.last_mut().filter(|page| !page.is_full()) {
            let page_id = page.id;
            let slot = page.slots.len();
            page.slots.push(Some(row));
            return page_id * self.max_rows_per_page + slot;
        }

        let page_id = self.pages.len();
        let mut new_page = Page::new(page_id, self.max_rows_per_page);
        new_page.insert(row);
        self.pages.push(new_page);

        page_id * self.max_rows_per_page
    }

    fn locate(&self, row_id: usize) -> (usize, usize) {
        (
            row_id / self.max_rows_per_page,
            row_id % self.max_rows_per_page,
        )
    }

    /// Get a row by global row ID
    pub fn get(&self, row_id: usize) -> Option<&Row> {
        let (page_id, slot) = self.locate(row_id);
        self.pages.get(page_id)?.get(slot)
    }

    /// Get a mutable reference to a row
    pub fn get_mut(&mut self, row_id: usize) -> Option<&mut Row> {
        let (page_id, slot) = self.locate(row_id);
        self.pages.get_mut(page_id)?.get_mut(slot)
    }

    /// Delete a row by global row ID
    pub fn delete(&mut self, row_id: usize) -> Option<Row> {
        let (page_id, slot) = self.locate(row_id);
        self.pages.get_mut(page_id)?.delete(slot)
    }

    /// Put a deleted row back under its original row ID
    pub fn restore(&mut self, row_id: usize, row: Row) -> bool {
        let (page_id, slot) = self.locate(row_id);
        match self.pages.get_mut(page_id) {
            Some(page) => page.restore(slot, row),
            None => false,
        }
    }

    /// Get all live rows (for table scans) with their row IDs
    pub fn scan(&self) -> Vec<(usize, &Row)> {
        let mut results = Vec::new();

        for page in &self.pages {
            for (slot, row) in page.slots.iter().enumerate() {
                if let Some(row) = row {
                    results.push((page.id * self.max_rows_per_page + slot, row));
                }
            }
        }

        results
    }

    /// Get the total number of live rows across all pages
    pub fn total_rows(&self) -> usize {
        self.pages.iter().map(|p| p.len()).sum()
    }
}
