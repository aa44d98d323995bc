use xoshirodev_core::{DEFAULT_SEED, DeviceConfig, WORD_BYTES};

/// Words as the device would serve them: read through a session and decoded
/// with the configured byte order.
pub fn device_words(config: DeviceConfig, count: usize) -> Vec<u64> {
    let order = config.byte_order;
    let device = super::start_device(config);
    let bytes = match device.open() {
        Ok(mut session) => session.read_bytes(count * WORD_BYTES),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    bytes
        .chunks_exact(WORD_BYTES)
        .map(|c| {
            let mut word = [0u8; WORD_BYTES];
            word.copy_from_slice(c);
            match order {
                xoshirodev_core::ByteOrder::Native => u64::from_ne_bytes(word),
                xoshirodev_core::ByteOrder::Little => u64::from_le_bytes(word),
                xoshirodev_core::ByteOrder::Big => u64::from_be_bytes(word),
            }
        })
        .collect()
}

pub fn run(config: DeviceConfig, count: usize) {
    println!(
        "Seed: [{}]  byte order: {}",
        DEFAULT_SEED.map(|w| w.to_string()).join(", "),
        config.byte_order
    );
    println!();
    for (i, word) in device_words(config, count).iter().enumerate() {
        println!("  {i:>4}  0x{word:016x}  {word}");
    }
}
