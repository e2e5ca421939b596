// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ids::RowId;
use crate::model::{Row, RowField, SortState};

/// Ordered, in-memory sequence of rows.
///
/// The store is the only owner of the rows. Every mutation is keyed by
/// [`RowId`] so a re-sort between reading a row and editing it cannot land
/// the edit on the wrong record. Operations on ids the store does not hold
/// are silent no-ops that report `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowStore {
    rows: Vec<Row>,
    next_id: u64,
    sort: SortState,
}

impl RowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blank_rows(count: usize) -> Self {
        let mut store = Self::new();
        for _ in 0..count {
            store.add_row();
        }
        store
    }

    pub fn add_row(&mut self) -> RowId {
        self.next_id += 1;
        let id = RowId::new(self.next_id);
        self.rows.push(Row::empty(id));
        id
    }

    pub fn update_field(&mut self, id: RowId, field: RowField, value: impl Into<String>) -> bool {
        let Some(row) = self.rows.iter_mut().find(|row| row.id == id) else {
            return false;
        };
        *row.field_mut(field) = value.into();
        true
    }

    pub fn delete_row(&mut self, id: RowId) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.id != id);
        self.rows.len() != before
    }

    pub fn sort_by(&mut self, field: RowField) -> &[Row] {
        self.sort = self.sort.next(field);
        match self.sort {
            SortState::Descending(_) => self
                .rows
                .sort_by(|left, right| right.field(field).cmp(left.field(field))),
            _ => self
                .rows
                .sort_by(|left, right| left.field(field).cmp(right.field(field))),
        }
        &self.rows
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn snapshot(&self) -> Vec<Row> {
        self.rows.clone()
    }

    pub fn get(&self, id: RowId) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn position(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Next row after `after` (wrapping) with any field containing `query`,
    /// compared case-insensitively.
    pub fn find(&self, query: &str, after: Option<RowId>) -> Option<RowId> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() || self.rows.is_empty() {
            return None;
        }

        let start = after
            .and_then(|id| self.position(id))
            .map_or(0, |index| index + 1);
        let len = self.rows.len();
        (0..len)
            .map(|offset| &self.rows[(start + offset) % len])
            .find(|row| {
                RowField::ALL
                    .iter()
                    .any(|field| row.field(*field).to_lowercase().contains(&needle))
            })
            .map(|row| row.id)
    }
}
