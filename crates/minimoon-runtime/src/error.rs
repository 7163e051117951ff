//! Error types for runtime primitives

use derive_more::{Display, Error};

use crate::handle::{Handle, HandleFault};

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Display, Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[display("Out of memory: cannot allocate {requested} elements")]
    OutOfMemory { requested: usize },

    #[display("Index out of range: index {index} but length is {length}")]
    IndexOutOfRange { index: i32, length: i32 },

    #[display("Invalid handle {handle}: {reason}")]
    InvalidHandle { handle: Handle, reason: HandleFault },

    #[display("Invalid length: {length}")]
    InvalidLength { length: i32 },

    #[display("Null pointer passed as {argument}")]
    NullPointer { argument: &'static str },
}

impl RuntimeError {
    pub(crate) fn out_of_memory(requested: usize) -> Self {
        RuntimeError::OutOfMemory { requested }
    }

    pub(crate) fn index_out_of_range(index: i32, length: i32) -> Self {
        RuntimeError::IndexOutOfRange { index, length }
    }

    pub(crate) fn invalid_handle(handle: Handle, reason: HandleFault) -> Self {
        RuntimeError::InvalidHandle { handle, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ElementKind;
    use crate::handle::ObjectKind;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            RuntimeError::index_out_of_range(7, 3).to_string(),
            "Index out of range: index 7 but length is 3"
        );
        assert_eq!(
            RuntimeError::InvalidLength { length: -1 }.to_string(),
            "Invalid length: -1"
        );

        let mismatch = RuntimeError::invalid_handle(
            Handle::from_raw(9),
            HandleFault::KindMismatch {
                expected: ObjectKind::Buffer(ElementKind::Double),
                found: ObjectKind::String,
            },
        );
        assert_eq!(
            mismatch.to_string(),
            "Invalid handle #9: expected double array, found string"
        );
    }
}
