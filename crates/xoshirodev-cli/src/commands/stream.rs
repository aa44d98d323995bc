use std::io::Write;

use xoshirodev_core::{DeviceConfig, DeviceError};

/// Bytes requested from the session per read.
const CHUNK: usize = 4096;

pub fn run(config: DeviceConfig, format: &str, n_bytes: usize) {
    let device = super::start_device(config);
    let mut session = match device.open() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error ({}): {e}", e.kind());
            std::process::exit(1);
        }
    };

    let stdout = std::io::stdout();
    let mut out: Box<dyn Write> = match format {
        "hex" => Box::new(HexWriter::new(stdout.lock())),
        _ => Box::new(stdout.lock()),
    };

    let mut total = 0usize;
    loop {
        if n_bytes > 0 && total >= n_bytes {
            break;
        }
        let want = if n_bytes == 0 {
            CHUNK
        } else {
            CHUNK.min(n_bytes - total)
        };
        match session.read_to(&mut out, want) {
            Ok(n) => total += n,
            // Broken pipe: the consumer is done.
            Err(DeviceError::Fault { .. }) => break,
            Err(e) => {
                eprintln!("Error ({}): {e}", e.kind());
                break;
            }
        }
    }
    let _ = out.flush();
    drop(out);
    session.close();
    let _ = device.shutdown();
}

/// Lowercase hex encoder in front of another writer.
pub struct HexWriter<W: Write> {
    inner: W,
}

impl<W: Write> HexWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for HexWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        const DIGITS: &[u8; 16] = b"0123456789abcdef";
        let mut encoded = Vec::with_capacity(buf.len() * 2);
        for &b in buf {
            encoded.push(DIGITS[(b >> 4) as usize]);
            encoded.push(DIGITS[(b & 0x0f) as usize]);
        }
        self.inner.write_all(&encoded)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
