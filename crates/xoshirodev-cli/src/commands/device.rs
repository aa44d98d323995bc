//! Host the device on a named pipe.
//!
//! The FIFO plays the part of the device node: each time a reader opens it a
//! session is opened on the device, and the session closes when the reader
//! goes away.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use xoshirodev_core::{DeviceConfig, DeviceError, RandomDevice};

/// How long a signal waits for an open session to finish its current chunk.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

pub fn run(config: DeviceConfig, dir: &str, chunk: usize) {
    let path = Path::new(dir).join(&config.name);
    let chunk = if chunk > 0 { chunk } else { 4096 };

    if let Err(e) = register(&path) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    let device = super::start_device(config);
    log::info!(
        "{}: created device file {}",
        device.name(),
        path.display()
    );
    println!("Serving {} (chunk={chunk}B)", path.display());
    println!("Press Ctrl+C to stop.");

    let stop = Arc::new(AtomicBool::new(false));
    let deregistered = Arc::new(AtomicBool::new(false));
    install_shutdown_handler(
        Arc::clone(&device),
        path.clone(),
        Arc::clone(&stop),
        Arc::clone(&deregistered),
    );

    serve(&device, &path, chunk, None, &stop);
    deregister(&device, &path, &deregistered);
}

/// Create the FIFO, or accept an existing one. Anything else at `path` is an
/// error.
pub fn register(path: &Path) -> std::io::Result<()> {
    if path.exists() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            let meta = std::fs::metadata(path)?;
            if !meta.file_type().is_fifo() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!("{} exists and is not a FIFO", path.display()),
                ));
            }
        }
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        // SAFETY: c_path is a valid NUL-terminated CString.
        let ret = unsafe { libc::mkfifo(c_path.as_ptr(), 0o644) };
        if ret != 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "named pipes not supported on this platform",
        ))
    }
}

/// Serve readers one at a time until `stop` is set or `max_sessions`
/// sessions have been served.
pub fn serve(
    device: &Arc<RandomDevice>,
    path: &Path,
    chunk: usize,
    max_sessions: Option<usize>,
    stop: &AtomicBool,
) {
    let mut served = 0usize;
    while !stop.load(Ordering::Acquire) && max_sessions.is_none_or(|max| served < max) {
        // Blocks until a reader opens the other end.
        let mut fifo = match std::fs::OpenOptions::new().write(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Error opening FIFO: {e}");
                break;
            }
        };
        let mut session = match device.open() {
            Ok(s) => s,
            Err(e) => {
                log::warn!("{}: {e}", device.name());
                continue;
            }
        };
        served += 1;

        while !stop.load(Ordering::Acquire) {
            match session.read_to(&mut fifo, chunk) {
                Ok(_) => {}
                Err(DeviceError::Fault { source, .. }) => {
                    log::debug!("{}: reader gone ({source})", device.name());
                    break;
                }
                Err(e) => {
                    log::error!("{}: {e}", device.name());
                    break;
                }
            }
        }
        session.close();
    }
}

/// Remove the FIFO and let the device go. Runs at most once per `done`
/// flag; returns whether this call did the work.
pub fn deregister(device: &RandomDevice, path: &Path, done: &AtomicBool) -> bool {
    if done.swap(true, Ordering::AcqRel) {
        return false;
    }
    if let Err(e) = std::fs::remove_file(path) {
        log::warn!("{}: could not remove {}: {e}", device.name(), path.display());
    }
    match device.shutdown() {
        Ok(()) => log::info!("{}: deleted {}", device.name(), path.display()),
        Err(e) => log::warn!("{}: {e}", device.name()),
    }
    // A reader stuck mid-write must not hold up the exit.
    match device.try_stats() {
        Some(stats) => {
            if let Ok(json) = serde_json::to_string(&stats) {
                log::info!("{}: final stats {json}", device.name());
            }
        }
        None => log::debug!("{}: stream busy, final stats skipped", device.name()),
    }
    true
}

/// On Ctrl+C / SIGTERM: stop serving, give an open session a moment to
/// finish, then deregister and exit.
fn install_shutdown_handler(
    device: Arc<RandomDevice>,
    path: PathBuf,
    stop: Arc<AtomicBool>,
    deregistered: Arc<AtomicBool>,
) {
    let result = ctrlc::set_handler(move || {
        stop.store(true, Ordering::Release);
        let deadline = Instant::now() + DRAIN_TIMEOUT;
        while device.pins() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        deregister(&device, &path, &deregistered);
        std::process::exit(0);
    });
    if let Err(e) = result {
        log::warn!("could not install signal handler: {e}");
    }
}
