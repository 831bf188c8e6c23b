use log::{debug, info};

use crate::error::{Result, SieveError};

/// A zero initialised grid of `i32` cells, one row per worker.
///
/// Zero marks an unused slot, valid because every stored value is a prime
/// `>= 3`. Rows are handed out as disjoint `RowWriter`s, so workers never
/// share a cell and no locking is needed. The allocation is released when
/// the buffer is dropped, on every exit path.
#[derive(Debug)]
pub struct SharedBuffer {
    name: String,
    rows: usize,
    row_capacity: usize,
    cells: Box<[i32]>,
    sealed: Box<[bool]>,
}

impl SharedBuffer {
    /// Allocates a new zeroed buffer.
    ///
    /// # Arguments
    /// * `name` - Identifies the buffer in logs.
    /// * `rows` - One row per worker.
    /// * `row_capacity` - Slots per row.
    ///
    /// # Errors
    /// `EmptyBuffer` if either dimension is zero or the size overflows.
    pub fn new(name: impl Into<String>, rows: usize, row_capacity: usize) -> Result<Self> {
        let len = rows
            .checked_mul(row_capacity)
            .filter(|&len| len > 0)
            .ok_or(SieveError::EmptyBuffer { rows, row_capacity })?;

        let name = name.into();
        info!(
            name = name.as_str(),
            rows = rows,
            row_capacity = row_capacity,
            bytes = len * size_of::<i32>();
            "allocated shared buffer"
        );

        Ok(Self {
            name,
            rows,
            row_capacity,
            cells: vec![0; len].into_boxed_slice(),
            sealed: vec![false; rows].into_boxed_slice(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn row_capacity(&self) -> usize {
        self.row_capacity
    }

    /// Hands out one exclusive writer per row, in row order.
    ///
    /// The buffer is zeroed and every row unsealed first, so each writer
    /// starts at slot 0.
    pub fn writers(&mut self) -> impl Iterator<Item = RowWriter<'_>> {
        self.cells.fill(0);
        self.sealed.fill(false);

        self.cells
            .chunks_mut(self.row_capacity)
            .zip(self.sealed.iter_mut())
            .enumerate()
            .map(|(index, (cells, sealed))| RowWriter {
                index,
                cells,
                len: 0,
                sealed,
            })
    }

    /// The live prefix of a row, up to the first zero sentinel.
    pub fn row(&self, index: usize) -> Option<&[i32]> {
        if index >= self.rows {
            return None;
        }

        let start = index * self.row_capacity;
        let cells = &self.cells[start..start + self.row_capacity];
        let len = cells.iter().position(|&v| v == 0).unwrap_or(cells.len());
        Some(&cells[..len])
    }

    /// Iterates the live prefix of every row, in row order.
    pub fn live_rows(&self) -> impl Iterator<Item = &[i32]> {
        (0..self.rows).filter_map(move |i| self.row(i))
    }

    pub fn is_sealed(&self, index: usize) -> bool {
        self.sealed.get(index).copied().unwrap_or(false)
    }

    /// Indices of the rows whose worker never completed.
    pub fn unsealed(&self) -> impl Iterator<Item = usize> + '_ {
        self.sealed
            .iter()
            .enumerate()
            .filter_map(|(i, &sealed)| (!sealed).then_some(i))
    }
}

impl Drop for SharedBuffer {
    fn drop(&mut self) {
        debug!(name = self.name.as_str(); "released shared buffer");
    }
}

/// Exclusive write access to one row of a `SharedBuffer`.
#[derive(Debug)]
pub struct RowWriter<'a> {
    index: usize,
    cells: &'a mut [i32],
    len: usize,
    sealed: &'a mut bool,
}

impl RowWriter<'_> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Appends a value to the next free slot.
    ///
    /// # Errors
    /// `RowOverflow` when the row is full, the neighbour rows are never touched.
    /// `ValueOutOfRange` when `value` is zero or doesn't fit an `i32`.
    pub fn push(&mut self, value: u64) -> Result<()> {
        if self.len == self.capacity() {
            return Err(SieveError::RowOverflow {
                row: self.index,
                capacity: self.capacity(),
            });
        }

        let cell = i32::try_from(value)
            .ok()
            .filter(|&v| v > 0)
            .ok_or(SieveError::ValueOutOfRange {
                row: self.index,
                value,
            })?;

        self.cells[self.len] = cell;
        self.len += 1;
        Ok(())
    }

    /// Marks the row as fully written by its worker.
    pub fn seal(self) {
        *self.sealed = true;
    }
}
