//! Basic device example.
//!
//! Starts a device, opens a session, reads some bytes and prints them as hex.
//!
//! Run: `cargo run --example basic`

use xoshirodev_core::{DeviceConfig, RandomDevice};

fn main() {
    let device = match RandomDevice::startup(DeviceConfig::default()) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut session = match device.open() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let random = session.read_bytes(64);
    print!("Random bytes (hex): ");
    for b in &random {
        print!("{b:02x}");
    }
    println!();

    // Only one reader at a time.
    if let Err(e) = device.open() {
        println!("Second open: {e}");
    }
    session.close();

    let stats = device.stats();
    println!(
        "\nDevice {}: {} bytes served, {} refills, {} byte buffer",
        stats.name, stats.bytes_served, stats.refills, stats.capacity
    );
}
