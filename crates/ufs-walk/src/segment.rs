use bytes::Bytes;

/// One block's contribution to a file.
///
/// Segments of the same file have contiguous offsets starting at zero and
/// exactly one of them is final. Empty segments are real: a zero-byte file
/// produces a single empty final segment, and interior blocks of a chunked
/// file produce empty non-final ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSegment {
    data: Bytes,
    offset: u64,
    is_final: bool,
}

impl FileSegment {
    pub(crate) fn new(data: Bytes, offset: u64, is_final: bool) -> Self {
        Self {
            data,
            offset,
            is_final,
        }
    }

    /// Absolute offset of the first byte within the file.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Offset one past the last byte.
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `true` for the last segment of the file.
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}
