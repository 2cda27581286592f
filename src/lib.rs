//! Pipestamp - one-way latency probe for byte-stream channels
//!
//! A sender writes fixed-size frames carrying a captured timestamp (plus
//! padding) into a byte stream such as a pipe or a remote shell session; a
//! receiver reads them back out, samples its own clock right after each read
//! unblocks, and logs the difference. An optional base64 layer lets frames
//! travel over channels that are not 8-bit clean.

pub mod clock;
pub mod filter;
pub mod probe;
pub mod protocol;
