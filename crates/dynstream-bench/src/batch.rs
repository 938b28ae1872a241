use anyhow::Result;
use dynstream_engine::coords::Vec3;

/// Half-open index interval `[start, end)` into the point set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BatchRange {
    pub start: usize,
    pub end: usize,
}

impl BatchRange {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.end <= self.start
    }

    /// Byte offset of the first point in the range within a packed `Vec3` buffer.
    #[inline]
    pub const fn byte_offset(self) -> u64 {
        (self.start * Vec3::SIZE) as u64
    }

    /// Number of bytes covered by the range.
    #[inline]
    pub const fn byte_len(self) -> u64 {
        (self.len() * Vec3::SIZE) as u64
    }

    /// Byte offset one past the last point in the range.
    #[inline]
    pub const fn byte_end(self) -> u64 {
        (self.end * Vec3::SIZE) as u64
    }

    /// Bytes of `positions[start..end]`.
    pub fn bytes<'a>(self, positions: &'a [Vec3]) -> &'a [u8] {
        bytemuck::cast_slice(&positions[self.start..self.end])
    }

    /// Panics unless `start < end <= len`.
    ///
    /// Strategies call this on entry; a malformed range is a caller bug.
    #[track_caller]
    pub fn assert_within(self, len: usize) {
        assert!(
            self.start < self.end && self.end <= len,
            "malformed batch range [{}, {}) for {} points",
            self.start,
            self.end,
            len
        );
    }

    /// Returns the union of two ranges that touch or overlap.
    pub fn merge(self, other: BatchRange) -> Option<BatchRange> {
        if other.start > self.end || self.start > other.end {
            return None;
        }
        Some(BatchRange::new(self.start.min(other.start), self.end.max(other.end)))
    }
}

/// Partition of `[0, len)` into consecutive batches of `batch_size` points.
///
/// The last batch holds the `len % batch_size` remainder when it is non-zero.
/// An empty batch is never produced.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    len: usize,
    batch_size: usize,
}

impl BatchPlan {
    pub fn new(len: usize, batch_size: usize) -> Result<Self> {
        anyhow::ensure!(len > 0, "point count must be positive");
        anyhow::ensure!(batch_size > 0, "update batch size must be positive");
        Ok(Self { len, batch_size })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches per frame: `ceil(len / batch_size)`.
    pub fn batch_count(&self) -> usize {
        self.len.div_ceil(self.batch_size)
    }

    /// Batches in increasing index order.
    pub fn iter(&self) -> Batches {
        Batches {
            next_start: 0,
            len: self.len,
            batch_size: self.batch_size,
        }
    }
}

impl IntoIterator for &BatchPlan {
    type Item = BatchRange;
    type IntoIter = Batches;

    fn into_iter(self) -> Batches {
        self.iter()
    }
}

/// Iterator produced by [`BatchPlan::iter`].
#[derive(Debug, Clone)]
pub struct Batches {
    next_start: usize,
    len: usize,
    batch_size: usize,
}

impl Iterator for Batches {
    type Item = BatchRange;

    fn next(&mut self) -> Option<BatchRange> {
        if self.next_start >= self.len {
            return None;
        }
        let start = self.next_start;
        let end = start.saturating_add(self.batch_size).min(self.len);
        self.next_start = end;
        Some(BatchRange::new(start, end))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.len - self.next_start.min(self.len)).div_ceil(self.batch_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Batches {}
