//! Guest Memory View
//!
//! Byte-level accessors over the guest's linear memory. The host never keeps
//! its own copy of guest data: every accessor borrows the shared buffer for
//! the duration of a single binding call.
//!
//! Guest addresses are offsets into the buffer. Ranges that fall outside the
//! buffer are reported as [`MemoryError::OutOfBounds`] instead of being
//! dereferenced.

/// Error type for guest memory access
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("guest address range {ptr:#x}+{len} is outside linear memory ({size} bytes)")]
    OutOfBounds { ptr: u32, len: usize, size: usize },

    #[error("unterminated string at {ptr:#x}")]
    Unterminated { ptr: u32 },

    #[error("buffer too small: {needed} bytes needed, capacity is {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },
}

/// Result type for guest memory access
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Borrow `len` bytes starting at `ptr`
pub fn slice(memory: &[u8], ptr: u32, len: usize) -> MemoryResult<&[u8]> {
    let start = ptr as usize;
    start
        .checked_add(len)
        .and_then(|end| memory.get(start..end))
        .ok_or(MemoryError::OutOfBounds {
            ptr,
            len,
            size: memory.len(),
        })
}

/// Mutably borrow `len` bytes starting at `ptr`
pub fn slice_mut(memory: &mut [u8], ptr: u32, len: usize) -> MemoryResult<&mut [u8]> {
    let size = memory.len();
    let start = ptr as usize;
    start
        .checked_add(len)
        .and_then(|end| memory.get_mut(start..end))
        .ok_or(MemoryError::OutOfBounds { ptr, len, size })
}

/// Read a NUL-terminated string starting at `ptr`.
///
/// Invalid UTF-8 is replaced with U+FFFD rather than rejected.
pub fn read_c_string(memory: &[u8], ptr: u32) -> MemoryResult<String> {
    let tail = memory.get(ptr as usize..).ok_or(MemoryError::OutOfBounds {
        ptr,
        len: 0,
        size: memory.len(),
    })?;
    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(MemoryError::Unterminated { ptr })?;
    Ok(String::from_utf8_lossy(&tail[..end]).into_owned())
}

/// Write `value` plus a NUL terminator into the `capacity` bytes at `ptr`.
///
/// The capacity check happens before anything is written, so a buffer that
/// is too small is left untouched.
pub fn write_bounded_string(
    memory: &mut [u8],
    ptr: u32,
    capacity: usize,
    value: &str,
) -> MemoryResult<()> {
    let needed = value.len() + 1;
    if needed > capacity {
        return Err(MemoryError::BufferTooSmall { needed, capacity });
    }

    let dst = slice_mut(memory, ptr, needed)?;
    dst[..value.len()].copy_from_slice(value.as_bytes());
    dst[value.len()] = 0;
    Ok(())
}

/// Copy `min(dst.len(), src.len())` bytes, returning the number copied
pub fn copy_bytes(dst: &mut [u8], src: &[u8]) -> usize {
    let count = dst.len().min(src.len());
    dst[..count].copy_from_slice(&src[..count]);
    count
}
