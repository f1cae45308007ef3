use crate::models::Entry;

/// One rendered line of the entry table. Never carries the real password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub index: usize,
    pub title: String,
    pub username: String,
    pub masked_password: String,
}

pub fn rebuild_rows(entries: &[Entry], mask_len: usize) -> Vec<TableRow> {
    let mask = "*".repeat(mask_len);
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| TableRow {
            index,
            title: entry.title().to_string(),
            username: entry.username().to_string(),
            masked_password: mask.clone(),
        })
        .collect()
}

/// Selected row in the table, clamped to the row count.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    index: usize,
}

impl Selection {
    /// `None` when the table is empty.
    pub fn current(&self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.index.min(len - 1))
        }
    }

    pub fn next(&mut self, len: usize) {
        self.index = (self.index + 1).min(len.saturating_sub(1));
    }

    pub fn previous(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }
}
