//! Partition planning for fork-join phases.
//!
//! Splits `N` work units into `K` contiguous ranges whose sizes differ by at
//! most one, and splits an owning buffer into one exclusive sub-slice per range.

use std::num::NonZeroUsize;
use std::ops;

use serde::Serialize;

use crate::error::{EngineError, Result};

/// Half-open interval `[start, end)` of work units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub const fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    /// Iterate over the unit indices of this range.
    pub fn indices(&self) -> ops::Range<usize> {
        self.start..self.end
    }
}

/// Ordered, disjoint, contiguous ranges covering `[0, units)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    units: usize,
    ranges: Vec<Range>,
}

impl Partition {
    /// Plan `units` work units over `workers` ranges.
    ///
    /// The first `units % workers` ranges get one extra unit. When there are
    /// more workers than units the trailing ranges are empty; zero units give
    /// an empty partition.
    ///
    /// # Example
    /// ```
    /// # use std::num::NonZeroUsize;
    /// # use forkjoin::parallel::{Partition, Range};
    /// let p = Partition::plan(7, NonZeroUsize::new(3).unwrap());
    /// assert_eq!(p.ranges(), &[Range::new(0, 3), Range::new(3, 5), Range::new(5, 7)]);
    /// ```
    pub fn plan(units: usize, workers: NonZeroUsize) -> Self {
        if units == 0 {
            return Self {
                units,
                ranges: Vec::new(),
            };
        }
        let workers = workers.get();
        let base = units / workers;
        let remainder = units % workers;
        let mut ranges = Vec::with_capacity(workers);
        let mut start = 0;
        for i in 0..workers {
            let size = base + usize::from(i < remainder);
            let end = start + size;
            ranges.push(Range::new(start, end));
            start = end;
        }
        Self { units, ranges }
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Number of ranges, empty ones included.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Ranges that carry at least one unit.
    pub fn active(&self) -> usize {
        self.ranges.iter().filter(|r| !r.is_empty()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = Range> + '_ {
        self.ranges.iter().copied()
    }

    /// Split `buffer` into one exclusive sub-slice per range, each holding
    /// `range.len() * width` items.
    ///
    /// The buffer must hold exactly `units * width` items.
    pub fn split_mut<'a, T>(&self, buffer: &'a mut [T], width: usize) -> Result<Vec<&'a mut [T]>> {
        let expected = self.units.checked_mul(width);
        if expected != Some(buffer.len()) {
            return Err(EngineError::BufferMismatch {
                len: buffer.len(),
                units: self.units,
                width,
            });
        }
        let mut rest = buffer;
        let mut views = Vec::with_capacity(self.ranges.len());
        for range in &self.ranges {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len() * width);
            views.push(head);
            rest = tail;
        }
        Ok(views)
    }
}
