//! The device context and its client sessions.
//!
//! Lifecycle:
//! 1. [`RandomDevice::startup`] seeds the generator and pre-fills the buffer
//! 2. [`RandomDevice::open`] admits one reader and pins the device
//! 3. [`Session`] reads stream bytes, refilling the buffer at exhaustion
//! 4. [`Session::close`] (or drop) releases the slot and the pin
//! 5. [`RandomDevice::shutdown`] succeeds once nothing holds a pin
//!
//! Writes are rejected in every state.

use std::io::Write;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use serde::Serialize;

use crate::buffer::RandomBuffer;
use crate::config::{ByteOrder, DeviceConfig};
use crate::error::{ConfigError, DeviceError};
use crate::generator::Xoshiro256Plus;
use crate::session::{SessionController, SessionState};

/// Generator and buffer always move together, so they share one lock.
#[derive(Debug)]
struct Stream {
    rng: Xoshiro256Plus,
    buffer: RandomBuffer,
}

/// Shared state of one pseudo-random device.
#[derive(Debug)]
pub struct RandomDevice {
    config: DeviceConfig,
    stream: Mutex<Stream>,
    sessions: SessionController,
    pins: AtomicUsize,
    bytes_served: AtomicU64,
}

/// Point-in-time view of a device, for status output.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStats {
    pub name: String,
    pub capacity: usize,
    pub byte_order: ByteOrder,
    pub session: SessionState,
    pub pins: usize,
    pub sessions_opened: u64,
    pub sessions_rejected: u64,
    pub bytes_served: u64,
    pub refills: u64,
    pub buffer_remaining: usize,
}

impl RandomDevice {
    /// Validate `config`, seed the generator and pre-fill the buffer.
    pub fn startup(config: DeviceConfig) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;

        let mut rng = Xoshiro256Plus::new();
        rng.seed();
        let buffer = RandomBuffer::new(config.buffer_words, config.byte_order, &mut rng);

        log::info!(
            "{}: registered ({} byte buffer, {} byte order)",
            config.name,
            buffer.capacity(),
            config.byte_order
        );

        Ok(Arc::new(Self {
            config,
            stream: Mutex::new(Stream { rng, buffer }),
            sessions: SessionController::new(),
            pins: AtomicUsize::new(0),
            bytes_served: AtomicU64::new(0),
        }))
    }

    /// Admit a reader. Fails with [`DeviceError::Busy`] while another session
    /// is open; the stream is left untouched in that case.
    pub fn open(self: &Arc<Self>) -> Result<Session, DeviceError> {
        if let Err(e) = self.sessions.open() {
            log::warn!("{}: open rejected, device busy", self.config.name);
            return Err(e);
        }
        self.pins.fetch_add(1, Ordering::AcqRel);
        log::info!(
            "{}: session #{} opened",
            self.config.name,
            self.sessions.opened()
        );
        Ok(Session {
            device: Arc::clone(self),
            delivered: 0,
            open: true,
        })
    }

    /// The device is read-only; this always fails.
    pub fn write(&self, data: &[u8]) -> Result<usize, DeviceError> {
        log::warn!(
            "{}: write operation on /dev/{} not supported ({} byte(s) refused)",
            self.config.name,
            self.config.name,
            data.len()
        );
        Err(DeviceError::Unsupported {
            name: self.config.name.clone(),
        })
    }

    /// Allow the host to deregister the device. Refused while a session
    /// still pins it.
    pub fn shutdown(&self) -> Result<(), DeviceError> {
        let pins = self.pins.load(Ordering::Acquire);
        if pins > 0 {
            log::warn!(
                "{}: shutdown refused, {pins} session(s) still open",
                self.config.name
            );
            return Err(DeviceError::Pinned { pins });
        }
        log::info!(
            "{}: unregistered after {} byte(s) in {} session(s)",
            self.config.name,
            self.bytes_served.load(Ordering::Relaxed),
            self.sessions.opened()
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn session_state(&self) -> SessionState {
        self.sessions.state()
    }

    /// Sessions currently holding the device.
    pub fn pins(&self) -> usize {
        self.pins.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> DeviceStats {
        let stream = self.lock_stream();
        self.snapshot(&stream)
    }

    /// Like [`stats`](Self::stats), but gives up instead of waiting when the
    /// stream is busy.
    pub fn try_stats(&self) -> Option<DeviceStats> {
        let stream = match self.stream.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        Some(self.snapshot(&stream))
    }

    fn snapshot(&self, stream: &Stream) -> DeviceStats {
        DeviceStats {
            name: self.config.name.clone(),
            capacity: stream.buffer.capacity(),
            byte_order: self.config.byte_order,
            session: self.sessions.state(),
            pins: self.pins(),
            sessions_opened: self.sessions.opened(),
            sessions_rejected: self.sessions.rejected(),
            bytes_served: self.bytes_served.load(Ordering::Relaxed),
            refills: stream.buffer.refills(),
            buffer_remaining: stream.buffer.remaining(),
        }
    }

    fn lock_stream(&self) -> MutexGuard<'_, Stream> {
        // The stream has no invariant a panicking holder could break halfway.
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An open client session. Dropping it closes the session.
#[derive(Debug)]
pub struct Session {
    device: Arc<RandomDevice>,
    delivered: u64,
    open: bool,
}

impl Session {
    /// Fill `out` completely from the stream. Never short.
    pub fn read_into(&mut self, out: &mut [u8]) -> usize {
        {
            let mut guard = self.device.lock_stream();
            let Stream { rng, buffer } = &mut *guard;
            buffer.read_exact(rng, out);
        }
        self.account(out.len());
        out.len()
    }

    /// Read `len` bytes into a fresh vector.
    pub fn read_bytes(&mut self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        self.read_into(&mut out);
        out
    }

    /// Stream exactly `len` bytes into `dst`, one buffer chunk at a time.
    ///
    /// If `dst` rejects a chunk the read stops with [`DeviceError::Fault`].
    /// Chunks delivered before the failure stay consumed; the failing chunk
    /// is not consumed and will be the next thing read.
    ///
    /// The stream lock is not held while `dst` is written, so a stalled
    /// destination never blocks [`RandomDevice::stats`].
    pub fn read_to<W: Write + ?Sized>(
        &mut self,
        dst: &mut W,
        len: usize,
    ) -> Result<usize, DeviceError> {
        let mut scratch = Vec::new();
        let mut done = 0;
        while done < len {
            scratch.clear();
            {
                let mut guard = self.device.lock_stream();
                let Stream { rng, buffer } = &mut *guard;
                scratch.extend_from_slice(buffer.chunk(rng, len - done));
            }
            if let Err(source) = dst.write_all(&scratch) {
                self.account(done);
                return Err(DeviceError::Fault { source });
            }
            // Only the open session moves the cursor, so it is where we left it.
            self.device.lock_stream().buffer.consume(scratch.len());
            done += scratch.len();
        }
        self.account(done);
        Ok(done)
    }

    /// Always [`DeviceError::Unsupported`].
    pub fn write(&mut self, data: &[u8]) -> Result<usize, DeviceError> {
        self.device.write(data)
    }

    /// Bytes handed to this session so far.
    pub fn bytes_read(&self) -> u64 {
        self.delivered
    }

    /// Close the session, releasing the slot and the pin.
    pub fn close(mut self) {
        self.release();
    }

    fn account(&mut self, n: usize) {
        self.delivered += n as u64;
        self.device
            .bytes_served
            .fetch_add(n as u64, Ordering::Relaxed);
    }

    fn release(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if !self.device.sessions.close() {
            log::warn!("{}: close without an open session", self.device.name());
        }
        self.device.pins.fetch_sub(1, Ordering::AcqRel);
        log::info!(
            "{}: session closed after {} byte(s)",
            self.device.name(),
            self.delivered
        );
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::io::Read for Session {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.read_into(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::WORD_BYTES;

    fn small_device(words: usize) -> Arc<RandomDevice> {
        RandomDevice::startup(DeviceConfig {
            buffer_words: words,
            byte_order: ByteOrder::Little,
            ..DeviceConfig::default()
        })
        .unwrap()
    }

    fn raw_stream(n: usize) -> Vec<u8> {
        let mut rng = Xoshiro256Plus::new();
        let mut out = Vec::new();
        while out.len() < n {
            out.extend_from_slice(&rng.next_u64().to_le_bytes());
        }
        out.truncate(n);
        out
    }

    /// A writer that accepts `budget` bytes and then fails.
    struct Faulty {
        budget: usize,
        got: Vec<u8>,
    }

    impl Write for Faulty {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if buf.len() > self.budget {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "destination not writable",
                ));
            }
            self.budget -= buf.len();
            self.got.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn startup_rejects_invalid_config() {
        let err = RandomDevice::startup(DeviceConfig {
            buffer_words: 0,
            ..DeviceConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroCapacity));
    }

    #[test]
    fn first_bytes_are_first_words() {
        let dev = small_device(4);
        let mut s = dev.open().unwrap();
        assert_eq!(s.read_bytes(8), 5u64.to_le_bytes());
    }

    #[test]
    fn open_twice_is_busy_and_leaves_stream_alone() {
        let dev = small_device(4);
        let mut s = dev.open().unwrap();
        s.read_bytes(3);
        let before = dev.stats();
        assert!(matches!(dev.open(), Err(DeviceError::Busy)));
        let after = dev.stats();
        assert_eq!(before.buffer_remaining, after.buffer_remaining);
        assert_eq!(before.refills, after.refills);
        assert_eq!(after.sessions_rejected, 1);
        assert_eq!(dev.pins(), 1);
    }

    #[test]
    fn open_close_open() {
        let dev = small_device(4);
        dev.open().unwrap().close();
        assert_eq!(dev.session_state(), SessionState::Closed);
        let s = dev.open().unwrap();
        assert_eq!(dev.session_state(), SessionState::Open);
        drop(s);
        assert_eq!(dev.pins(), 0);
        assert_eq!(dev.stats().sessions_opened, 2);
    }

    #[test]
    fn stream_continues_across_sessions() {
        let dev = small_device(2);
        let a = dev.open().unwrap().read_bytes(21);
        let b = dev.open().unwrap().read_bytes(30);
        let mut joined = a;
        joined.extend(b);
        assert_eq!(joined, raw_stream(51));
    }

    #[test]
    fn write_is_unsupported_in_any_state() {
        let dev = small_device(2);
        let before = dev.stats();
        assert!(matches!(
            dev.write(b"hello"),
            Err(DeviceError::Unsupported { .. })
        ));
        let mut s = dev.open().unwrap();
        assert!(matches!(
            s.write(b"hello"),
            Err(DeviceError::Unsupported { .. })
        ));
        drop(s);
        let after = dev.stats();
        assert_eq!(before.buffer_remaining, after.buffer_remaining);
        assert_eq!(before.bytes_served, after.bytes_served);
        assert_eq!(after.session, SessionState::Closed);
    }

    #[test]
    fn read_to_streams_exact_length() {
        let dev = small_device(2);
        let mut s = dev.open().unwrap();
        let mut sink = Vec::new();
        assert_eq!(s.read_to(&mut sink, 100).unwrap(), 100);
        assert_eq!(sink, raw_stream(100));
        assert_eq!(s.bytes_read(), 100);
    }

    #[test]
    fn fault_aborts_and_keeps_consumed_bytes() {
        let dev = small_device(2);
        let mut s = dev.open().unwrap();
        // Chunks are 16 bytes; the second one does not fit.
        let mut dst = Faulty {
            budget: 20,
            got: Vec::new(),
        };
        let err = s.read_to(&mut dst, 64).unwrap_err();
        assert!(matches!(err, DeviceError::Fault { .. }), "got {err:?}");
        assert_eq!(dst.got, raw_stream(16));
        assert_eq!(s.bytes_read(), 16);
        // The failing chunk was not consumed.
        assert_eq!(s.read_bytes(16), raw_stream(32)[16..]);
    }

    /// A writer that blocks inside `write` until released.
    struct Stalled {
        entered: std::sync::mpsc::Sender<()>,
        release: std::sync::mpsc::Receiver<()>,
        got: Vec<u8>,
    }

    impl Write for Stalled {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let _ = self.entered.send(());
            let _ = self.release.recv();
            self.got.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stalled_destination_does_not_block_stats() {
        use std::time::{Duration, Instant};

        let dev = small_device(1);
        let mut s = dev.open().unwrap();
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let reader = std::thread::spawn(move || {
            let mut dst = Stalled {
                entered: entered_tx,
                release: release_rx,
                got: Vec::new(),
            };
            let n = s.read_to(&mut dst, 8).unwrap();
            (n, dst.got)
        });

        entered_rx.recv().unwrap();
        let started = Instant::now();
        let stats = dev.stats();
        assert!(started.elapsed() < Duration::from_millis(500));
        // The chunk in flight is not consumed until the write succeeds.
        assert_eq!(stats.buffer_remaining, 8);
        assert_eq!(stats.bytes_served, 0);
        assert!(dev.try_stats().is_some());

        release_tx.send(()).unwrap();
        let (n, got) = reader.join().unwrap();
        assert_eq!(n, 8);
        assert_eq!(got, raw_stream(8));
        let stats = dev.stats();
        assert_eq!(stats.buffer_remaining, 0);
        assert_eq!(stats.bytes_served, 8);
        assert_eq!(stats.pins, 0);
    }

    #[test]
    fn try_stats_gives_up_while_stream_is_locked() {
        let dev = small_device(1);
        let guard = dev.lock_stream();
        assert!(dev.try_stats().is_none());
        drop(guard);
        assert_eq!(dev.try_stats().unwrap().capacity, 8);
    }

    #[test]
    fn refills_match_whole_buffer_reads() {
        let dev = small_device(4);
        let cap = 4 * WORD_BYTES;
        let mut s = dev.open().unwrap();
        s.read_bytes(cap);
        assert_eq!(dev.stats().refills, 0);
        let body = s.read_bytes(cap * 3);
        assert_eq!(dev.stats().refills, 3);
        assert_eq!(body, raw_stream(cap * 4)[cap..]);
    }

    #[test]
    fn io_read_never_short() {
        use std::io::Read;
        let dev = small_device(1);
        let mut s = dev.open().unwrap();
        let mut buf = [0u8; 37];
        assert_eq!(s.read(&mut buf).unwrap(), 37);
        assert_eq!(buf.to_vec(), raw_stream(37));
    }

    #[test]
    fn shutdown_refused_while_pinned() {
        let dev = small_device(1);
        let s = dev.open().unwrap();
        assert!(matches!(
            dev.shutdown(),
            Err(DeviceError::Pinned { pins: 1 })
        ));
        s.close();
        assert!(dev.shutdown().is_ok());
    }

    #[test]
    fn stats_serialize() {
        let dev = small_device(1);
        let json = serde_json::to_value(dev.stats()).unwrap();
        assert_eq!(json["name"], "xoshiro256");
        assert_eq!(json["capacity"], 8);
        assert_eq!(json["session"], "closed");
        assert_eq!(json["byte_order"], "little");
    }
}
