//! Error handling for the coffer library
//!
//! Every failure in this crate is a local, synchronous contract violation
//! surfaced at the offending call site. Nothing is retried internally and
//! nothing is swallowed.

use thiserror::Error;

/// Main error type for the coffer library
#[derive(Error, Debug)]
pub enum CofferError {
    /// Positional argument outside the valid bounds for the operation
    #[error("index out of bounds: index {index}, size {size}")]
    OutOfBounds {
        /// The invalid index
        index: usize,
        /// The valid size/length
        size: usize,
    },

    /// Head/tail/extremum requested on a container with no elements
    #[error("empty container: {operation}")]
    Empty {
        /// The operation that required a non-empty container
        operation: &'static str,
    },

    /// A mutation requested on a handle that does not support it
    #[error("unsupported mutation: {operation}")]
    Unsupported {
        /// The unsupported operation
        operation: &'static str,
    },

    /// Malformed construction parameter or range
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the argument
        message: String,
    },

    /// Memory allocation failure
    #[error("memory allocation failed: requested {size} bytes")]
    OutOfMemory {
        /// Number of bytes requested
        size: usize,
    },

    /// Fail-fast cursor detection: the container changed structurally
    /// underneath a live cursor.
    ///
    /// This is a best-effort bug detector, not a correctness mechanism.
    /// Its absence does not prove absence of a logic error.
    #[error("concurrent structural change: cursor revision {expected}, container revision {actual}")]
    ConcurrentModification {
        /// Revision the cursor captured
        expected: u64,
        /// Live revision of the container
        actual: u64,
    },

    /// Malformed persisted byte layout
    #[error("invalid data: {message}")]
    InvalidData {
        /// Error message describing the issue
        message: String,
    },

    /// I/O related errors from reader/writer-backed streams
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CofferError {
    /// Create an out of bounds error
    pub fn out_of_bounds(index: usize, size: usize) -> Self {
        Self::OutOfBounds { index, size }
    }

    /// Create an empty-container error
    pub fn empty(operation: &'static str) -> Self {
        Self::Empty { operation }
    }

    /// Create an unsupported-mutation error
    pub fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    /// Create an out of memory error
    pub fn out_of_memory(size: usize) -> Self {
        Self::OutOfMemory { size }
    }

    /// Create a concurrent modification error
    pub fn concurrent_modification(expected: u64, actual: u64) -> Self {
        Self::ConcurrentModification { expected, actual }
    }

    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData { message: message.into() }
    }

    /// Create an I/O error from a message
    pub fn io_error<S: Into<String>>(message: S) -> Self {
        Self::Io(std::io::Error::new(std::io::ErrorKind::Other, message.into()))
    }

    /// Get the error category for logging/metrics
    pub fn category(&self) -> &'static str {
        match self {
            Self::OutOfBounds { .. } => "bounds",
            Self::Empty { .. } => "empty",
            Self::Unsupported { .. } => "unsupported",
            Self::InvalidArgument { .. } => "argument",
            Self::OutOfMemory { .. } => "memory",
            Self::ConcurrentModification { .. } => "concurrent",
            Self::InvalidData { .. } => "data",
            Self::Io(_) => "io",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CofferError>;

/// Assert that an index is within bounds for a read/remove (exclusive upper bound)
#[inline]
pub fn check_bounds(index: usize, size: usize) -> Result<()> {
    if index >= size {
        Err(CofferError::out_of_bounds(index, size))
    } else {
        Ok(())
    }
}

/// Assert that an index is within bounds for an insert (inclusive upper bound)
#[inline]
pub fn check_insert_bounds(index: usize, size: usize) -> Result<()> {
    if index > size {
        Err(CofferError::out_of_bounds(index, size))
    } else {
        Ok(())
    }
}

/// Assert that `[start, end)` is a valid range over `size` elements
#[inline]
pub fn check_range(start: usize, end: usize, size: usize) -> Result<()> {
    if start > end {
        return Err(CofferError::invalid_argument(format!(
            "invalid range: start {} > end {}",
            start, end
        )));
    }
    if end > size {
        return Err(CofferError::out_of_bounds(end, size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CofferError::out_of_bounds(10, 5);
        assert_eq!(err.category(), "bounds");
        let display = format!("{}", err);
        assert!(display.contains("10"));
        assert!(display.contains("5"));
    }

    #[test]
    fn test_bounds_checking() {
        assert!(check_bounds(5, 10).is_ok());
        assert!(check_bounds(10, 10).is_err());
        assert!(check_bounds(0, 0).is_err());

        assert!(check_insert_bounds(10, 10).is_ok());
        assert!(check_insert_bounds(11, 10).is_err());
    }

    #[test]
    fn test_range_checking() {
        assert!(check_range(2, 8, 10).is_ok());
        assert!(check_range(5, 5, 5).is_ok());
        assert!(check_range(8, 2, 10).is_err()); // start > end
        assert!(check_range(2, 15, 10).is_err()); // end > size

        // start > end is an argument error, not a bounds error
        match check_range(8, 2, 10).unwrap_err() {
            CofferError::InvalidArgument { .. } => {}
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(CofferError::empty("pop_front").category(), "empty");
        assert_eq!(CofferError::unsupported("insert").category(), "unsupported");
        assert_eq!(CofferError::invalid_argument("x").category(), "argument");
        assert_eq!(CofferError::out_of_memory(1024).category(), "memory");
        assert_eq!(CofferError::concurrent_modification(1, 2).category(), "concurrent");
        assert_eq!(CofferError::invalid_data("x").category(), "data");
        assert_eq!(CofferError::io_error("x").category(), "io");
    }

    #[test]
    fn test_out_of_memory_display() {
        let err = CofferError::out_of_memory(1 << 20);
        assert!(format!("{}", err).contains("1048576"));
    }

    #[test]
    fn test_concurrent_modification_display() {
        let err = CofferError::concurrent_modification(3, 4);
        let display = format!("{}", err);
        assert!(display.contains("revision 3"));
        assert!(display.contains("revision 4"));
    }

    #[test]
    fn test_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: CofferError = io_error.into();
        assert_eq!(err.category(), "io");
    }
}
