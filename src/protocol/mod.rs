//! Wire format shared by sender and receiver

pub mod error;
pub mod frame;

pub use error::{FrameError, Result as FrameResult};
pub use frame::{Frame, HEADER_SIZE, MAX_ALLOC};
