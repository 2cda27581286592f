use pipestamp::clock::SystemClock;
use pipestamp::filter::{Encoding, Endpoint, FilterChain};
use pipestamp::probe::{LogSink, Logger, Mode, Probe, ProbeError, RecordFormat, Result};
use std::fs;
use std::io::{self, Cursor, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

/// Test helper: writer whose bytes remain readable after the endpoint is dropped
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Test helper: accepts a fixed number of bytes, then reports zero-length writes
struct Choked {
    remaining: usize,
}

impl Write for Choked {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining);
        self.remaining -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn temp_log(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "pipestamp-it-{}-{}.csv",
        std::process::id(),
        name
    ));
    let _ = fs::remove_file(&path);
    path
}

fn file_logger(path: &PathBuf) -> Logger {
    Logger::new(LogSink::open(path).expect("open log"), RecordFormat::Millis)
}

/// Test helper: accepts a fixed number of bytes, then fails like a closed pipe
struct Severed {
    remaining: usize,
}

impl Write for Severed {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        let n = buf.len().min(self.remaining);
        self.remaining -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs a sender into a loopback TCP stream and a receiver on the other end.
fn exchange_over_socket(
    encoding: Encoding,
    pad: usize,
    count: usize,
    log: &PathBuf,
) -> Result<Probe> {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
    let addr = listener.local_addr().expect("local addr");

    let sender = thread::spawn(move || -> Result<()> {
        let stream = TcpStream::connect(addr).expect("connect");
        let mut probe = Probe::sender(pad, encoding)?;
        probe.send(count, Endpoint::writer(stream))?.ensure_complete()?;
        Ok(())
    });

    let (stream, _) = listener.accept().expect("accept");
    let mut probe = Probe::receiver(pad, encoding, file_logger(log))?;
    let exchange = probe.recv(count, Endpoint::reader(stream))?;
    sender.join().expect("sender thread")?;

    exchange.ensure_complete()?;
    Ok(probe)
}

#[test]
fn test_raw_round_trip_over_socket() -> Result<()> {
    let log = temp_log("raw");
    let receiver = exchange_over_socket(Encoding::Raw, 32, 20, &log)?;
    let stats = receiver.statistics();
    assert_eq!(stats.count(), 20);
    assert_eq!(stats.negative_count(), 0);
    assert!(stats.min() <= stats.max());
    drop(receiver);

    let contents = fs::read_to_string(&log)?;
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 21);
    assert_eq!(lines[0], "DELTA,NORMALIZED");
    for line in &lines[1..] {
        let fields: Vec<i64> = line.split(',').map(|f| f.parse().unwrap()).collect();
        assert_eq!(fields.len(), 2);
        assert!(fields[0] >= 0 && fields[1] >= 0);
    }

    fs::remove_file(&log)?;
    Ok(())
}

#[test]
fn test_base64_round_trip_over_socket() -> Result<()> {
    let log = temp_log("base64");
    let receiver = exchange_over_socket(Encoding::Base64, 1, 50, &log)?;
    let stats = receiver.statistics();
    assert_eq!(stats.count() as usize + stats.negative_count(), 50);
    drop(receiver);

    fs::remove_file(&log)?;
    Ok(())
}

#[test]
fn test_base64_stream_is_text_and_decodes() -> Result<()> {
    for pad in [0usize, 1, 2, 3, 4096] {
        let wire = SharedBuffer::default();
        let mut sender = Probe::sender(pad, Encoding::Base64)?;
        assert!(sender.send(7, Endpoint::writer(wire.clone()))?.is_complete());

        let bytes = wire.contents();
        assert_eq!(bytes.len() % 4, 0);
        assert!(bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || b"+/=".contains(b)));

        let log = temp_log(&format!("decode-{}", pad));
        let mut receiver = Probe::receiver(pad, Encoding::Base64, file_logger(&log))?;
        let exchange = receiver.recv(7, Endpoint::reader(Cursor::new(bytes)))?;
        assert!(exchange.is_complete());
        assert_eq!(receiver.logger().map(Logger::records), Some(7));
        drop(receiver);
        fs::remove_file(&log)?;
    }
    Ok(())
}

#[test]
fn test_short_write_reports_fewer_frames() -> Result<()> {
    let frame_size = 16 + 8;
    let mut probe = Probe::sender(8, Encoding::Raw)?;
    let exchange = probe.send(
        5,
        Endpoint::writer(Choked {
            remaining: frame_size * 2 + 3,
        }),
    )?;
    assert_eq!(exchange.mode, Mode::Send);
    assert_eq!(exchange.completed, 2);
    assert!(exchange.ensure_complete().is_err());
    Ok(())
}

#[test]
fn test_base64_short_write_reports_fewer_frames() -> Result<()> {
    // 20 encoded bytes carry the first frame; the second is cut off mid-quad
    // and the held-back byte can no longer be flushed.
    let mut probe = Probe::sender(0, Encoding::Base64)?;
    let exchange = probe.send(5, Endpoint::writer(Choked { remaining: 30 }))?;
    assert_eq!(exchange.completed, 1);
    assert!(matches!(
        exchange.ensure_complete(),
        Err(ProbeError::CountMismatch {
            mode: Mode::Send,
            requested: 5,
            completed: 1,
        })
    ));
    Ok(())
}

#[test]
fn test_base64_broken_pipe_reports_fewer_frames() -> Result<()> {
    let mut probe = Probe::sender(0, Encoding::Base64)?;
    let exchange = probe.send(5, Endpoint::writer(Severed { remaining: 30 }))?;
    assert_eq!(exchange.completed, 1);
    assert!(matches!(
        exchange.ensure_complete(),
        Err(ProbeError::CountMismatch { completed: 1, .. })
    ));

    // The chain is detached and reusable after the failed flush.
    let wire = SharedBuffer::default();
    assert!(probe.send(2, Endpoint::writer(wire.clone()))?.is_complete());
    assert_eq!(wire.contents().len(), 44);
    Ok(())
}

#[test]
fn test_receiver_stops_at_end_of_stream() -> Result<()> {
    let wire = SharedBuffer::default();
    Probe::sender(0, Encoding::Raw)?.send(3, Endpoint::writer(wire.clone()))?;

    let log = temp_log("eof");
    let mut probe = Probe::receiver(0, Encoding::Raw, file_logger(&log))?;
    let exchange = probe.recv(10, Endpoint::reader(Cursor::new(wire.contents())))?;
    assert_eq!(exchange.completed, 3);
    drop(probe);

    assert_eq!(fs::read_to_string(&log)?.lines().count(), 4);
    fs::remove_file(&log)?;
    Ok(())
}

#[test]
fn test_mode_guard_rejects_wrong_direction() -> Result<()> {
    let mut probe = Probe::with_parts(
        Mode::Send,
        0,
        FilterChain::new(Encoding::Raw),
        SystemClock,
        None,
    )?;
    assert!(probe
        .recv(1, Endpoint::reader(Cursor::new(vec![0u8; 16])))
        .is_err());
    Ok(())
}

#[test]
fn test_teardown_keeps_stdout_open() -> Result<()> {
    // Zero frames: attach, flush and detach stdout without printing anything.
    let mut probe = Probe::sender(0, Encoding::Base64)?;
    let exchange = probe.send(0, Endpoint::stdout())?;
    assert!(exchange.is_complete());
    drop(probe);

    // The process stream must still be usable after the sender is gone.
    io::stdout().flush()?;
    Ok(())
}

#[test]
fn test_teardown_closes_owned_log_once() -> Result<()> {
    let log = temp_log("owned");
    let mut probe = Probe::receiver(0, Encoding::Raw, file_logger(&log))?;
    let mut wire = 1i64.to_le_bytes().to_vec();
    wire.extend_from_slice(&0i64.to_le_bytes());
    probe.recv(1, Endpoint::reader(Cursor::new(wire)))?;
    assert!(probe.logger().map(|l| l.sink().is_owned()).unwrap_or(false));
    drop(probe);

    // Everything was flushed before the file was closed.
    assert_eq!(fs::read_to_string(&log)?.lines().count(), 2);
    fs::remove_file(&log)?;
    Ok(())
}
