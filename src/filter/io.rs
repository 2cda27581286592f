//! Byte-exact transfer primitives.
//!
//! Both loops retry interrupted calls and stop early on end-of-stream (read)
//! or a zero-length write, returning the number of bytes actually moved. Any
//! other error is returned as-is.

use std::io::{self, ErrorKind, Read, Write};
use tracing::trace;

/// Reads until `buf` is full or the stream ends.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                trace!(filled = filled, wanted = buf.len(), "End of stream");
                break;
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Reads whatever is available in one call, retrying interruptions.
pub fn read_some<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Writes all of `buf` unless the sink stops accepting bytes.
pub fn write_full<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> io::Result<usize> {
    let mut written = 0;
    while written < buf.len() {
        match writer.write(&buf[written..]) {
            Ok(0) => {
                trace!(written = written, wanted = buf.len(), "Sink accepted no bytes");
                break;
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(written)
}
