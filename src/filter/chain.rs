use crate::filter::codec::{Base64Decoder, Base64Encoder};
use crate::filter::error::{FilterError, Result};
use crate::filter::io::{read_full, read_some, write_full};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, trace, warn};

/// Raw read-ahead size used when decoding
const RAW_CHUNK_SIZE: usize = 4096;

/// Byte transform applied by a [`FilterChain`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Frames travel as raw bytes
    Raw,
    /// Frames travel as padded base64 text
    #[default]
    Base64,
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "base64" => Ok(Self::Base64),
            other => Err(format!("unknown encoding '{}' (expected raw or base64)", other)),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
            Self::Base64 => f.write_str("base64"),
        }
    }
}

/// The raw end of a chain.
///
/// `Stdin` and `Stdout` alias the process streams and are never closed by
/// dropping the endpoint; every other variant owns its handle and closes it
/// on drop.
pub enum Endpoint {
    Stdin(io::Stdin),
    Stdout(io::Stdout),
    File(File),
    Reader(Box<dyn Read + Send>),
    Writer(Box<dyn Write + Send>),
}

impl Endpoint {
    pub fn stdin() -> Self {
        Self::Stdin(io::stdin())
    }

    pub fn stdout() -> Self {
        Self::Stdout(io::stdout())
    }

    /// Opens `path` for reading; the endpoint owns the file.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        File::open(path).map(Self::File)
    }

    /// Opens `path` for appending, creating it if needed; the endpoint owns
    /// the file.
    pub fn append(path: impl AsRef<Path>) -> io::Result<Self> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map(Self::File)
    }

    pub fn reader(reader: impl Read + Send + 'static) -> Self {
        Self::Reader(Box::new(reader))
    }

    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        Self::Writer(Box::new(writer))
    }

    /// Whether dropping this endpoint closes the underlying handle
    pub fn is_owned(&self) -> bool {
        !matches!(self, Self::Stdin(_) | Self::Stdout(_))
    }

    fn as_read(&mut self) -> Option<&mut dyn Read> {
        match self {
            Self::Stdin(stdin) => Some(stdin),
            Self::File(file) => Some(file),
            Self::Reader(reader) => Some(reader.as_mut()),
            Self::Stdout(_) | Self::Writer(_) => None,
        }
    }

    fn as_write(&mut self) -> Option<&mut dyn Write> {
        match self {
            Self::Stdout(stdout) => Some(stdout),
            Self::File(file) => Some(file),
            Self::Writer(writer) => Some(writer.as_mut()),
            Self::Stdin(_) | Self::Reader(_) => None,
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stdin(_) => "Stdin",
            Self::Stdout(_) => "Stdout",
            Self::File(_) => "File",
            Self::Reader(_) => "Reader",
            Self::Writer(_) => "Writer",
        };
        f.debug_tuple("Endpoint").field(&name).finish()
    }
}

/// Uniform read/write over a transform layered on a raw endpoint.
///
/// `read` and `write` try to move the whole buffer. A count smaller than the
/// buffer length is a short transfer (end of stream, or a sink that stopped
/// accepting bytes); `Err` is a hard failure. Callers treat both as "this
/// frame did not complete".
pub trait StreamFilter {
    /// Attaches the raw endpoint. Fails if one is already attached.
    fn push(&mut self, endpoint: Endpoint) -> Result<()>;

    /// Detaches and returns the raw endpoint, resetting transform state.
    fn pop(&mut self) -> Option<Endpoint>;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Pushes any buffered encoded output through to the endpoint.
    fn flush(&mut self) -> Result<()>;
}

/// A transform filter plus the raw endpoint currently attached beneath it.
///
/// The transform state is kept across `pop`/`push`, so one chain can serve
/// several exchanges over different endpoints.
#[derive(Debug)]
pub struct FilterChain {
    encoding: Encoding,
    link: Option<Endpoint>,
    encoder: Base64Encoder,
    decoder: Base64Decoder,
    /// Encoded bytes staged for the endpoint
    staged: Vec<u8>,
    /// Decoded bytes not yet handed to a reader
    decoded: Vec<u8>,
    decoded_pos: usize,
    raw: Vec<u8>,
}

impl FilterChain {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            link: None,
            encoder: Base64Encoder::new(),
            decoder: Base64Decoder::new(),
            staged: Vec::new(),
            decoded: Vec::new(),
            decoded_pos: 0,
            raw: Vec::new(),
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn is_attached(&self) -> bool {
        self.link.is_some()
    }

    fn read_base64(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            if self.decoded_pos < self.decoded.len() {
                let available = &self.decoded[self.decoded_pos..];
                let n = available.len().min(buf.len() - filled);
                buf[filled..filled + n].copy_from_slice(&available[..n]);
                self.decoded_pos += n;
                filled += n;
                continue;
            }

            self.decoded.clear();
            self.decoded_pos = 0;
            self.raw.resize(RAW_CHUNK_SIZE, 0);
            let n = read_some(link_reader(&mut self.link)?, &mut self.raw)?;
            if n == 0 {
                trace!(filled = filled, pending = self.decoder.pending(), "Encoded stream ended");
                break;
            }
            self.decoder.update(&self.raw[..n], &mut self.decoded)?;
        }
        Ok(filled)
    }

    fn write_base64(&mut self, buf: &[u8]) -> Result<usize> {
        self.staged.clear();
        self.encoder.update(buf, &mut self.staged);
        let written = write_through(&mut self.link, &self.staged)?;

        if written < self.staged.len() {
            // Report the share of `buf` whose encoding reached the endpoint,
            // always short of the full length.
            return Ok((written / 4 * 3).min(buf.len().saturating_sub(1)));
        }
        Ok(buf.len())
    }
}

fn link_reader(link: &mut Option<Endpoint>) -> Result<&mut dyn Read> {
    link.as_mut()
        .ok_or(FilterError::Detached)?
        .as_read()
        .ok_or(FilterError::WrongDirection("read from"))
}

fn link_writer(link: &mut Option<Endpoint>) -> Result<&mut dyn Write> {
    link.as_mut()
        .ok_or(FilterError::Detached)?
        .as_write()
        .ok_or(FilterError::WrongDirection("written to"))
}

/// Writes `bytes` to the attached endpoint and pushes them out to the OS
/// rather than leaving them in a userspace buffer (stdout is line buffered).
fn write_through(link: &mut Option<Endpoint>, bytes: &[u8]) -> Result<usize> {
    let writer = link_writer(link)?;
    let written = write_full(writer, bytes)?;
    writer.flush()?;
    Ok(written)
}

impl StreamFilter for FilterChain {
    fn push(&mut self, endpoint: Endpoint) -> Result<()> {
        if self.link.is_some() {
            warn!(endpoint = ?endpoint, "Refusing to attach a second endpoint");
            return Err(FilterError::AlreadyAttached);
        }
        debug!(
            endpoint = ?endpoint,
            owned = endpoint.is_owned(),
            encoding = %self.encoding,
            "Endpoint attached"
        );
        self.link = Some(endpoint);
        Ok(())
    }

    fn pop(&mut self) -> Option<Endpoint> {
        let endpoint = self.link.take()?;
        if self.encoder.pending() > 0 || self.decoder.pending() > 0 {
            warn!(
                unencoded = self.encoder.pending(),
                undecoded = self.decoder.pending(),
                "Discarding partial base64 group on detach"
            );
        }
        self.encoder.reset();
        self.decoder.reset();
        self.decoded.clear();
        self.decoded_pos = 0;
        debug!(endpoint = ?endpoint, "Endpoint detached");
        Some(endpoint)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.encoding {
            Encoding::Raw => Ok(read_full(link_reader(&mut self.link)?, buf)?),
            Encoding::Base64 => self.read_base64(buf),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match self.encoding {
            Encoding::Raw => write_through(&mut self.link, buf),
            Encoding::Base64 => self.write_base64(buf),
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.staged.clear();
        self.encoder.finish(&mut self.staged);
        let expected = self.staged.len();
        let written = write_through(&mut self.link, &self.staged)?;
        if written < expected {
            return Err(FilterError::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("flushed {} of {} encoded bytes", written, expected),
            )));
        }
        trace!(bytes = expected, "Filter flushed");
        Ok(())
    }
}


#[cfg(test)]
pub use tests::{MockStreamFilter, SharedBuffer};
