//! Filter chain: a reversible byte transform stacked on a raw endpoint

pub mod chain;
pub mod codec;
pub mod error;
pub mod io;

pub use chain::{Encoding, Endpoint, FilterChain, StreamFilter};
pub use codec::{Base64Decoder, Base64Encoder};
pub use error::{FilterError, Result as FilterResult};

#[cfg(test)]
pub use chain::{MockStreamFilter, SharedBuffer};
