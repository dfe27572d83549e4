// Licensed under the Apache-2.0 license

//! Packs a JSON FRU record into a 512-byte JFRU image.
//!
//! ```bash
//! pack-jfru board.json board.bin
//! pack-jfru board.json eeprom.bin --offset 0x100 --dump
//! ```

use anyhow::Result;
use clap::Parser;
use clap_num::maybe_hex;
use fru_builder::{fru_image_create, hex_dump};
use log::LevelFilter;
use std::path::PathBuf;
use zerocopy::IntoBytes;

#[derive(Parser)]
#[command(name = "pack-jfru", version, about, long_about = None)]
struct Cli {
    /// JSON file holding the record fields
    input: PathBuf,

    /// Output image file
    output: PathBuf,

    /// Byte offset of the image within the output file
    #[arg(long, value_parser = maybe_hex::<u64>, default_value_t = 0)]
    offset: u64,

    /// Print a hex dump of the image
    #[arg(long, default_value_t = false)]
    dump: bool,

    #[arg(long, env = "JFRU_LOG_LEVEL", default_value_t = LevelFilter::Warn)]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = simple_logger::SimpleLogger::new()
        .with_level(cli.log_level)
        .init();

    let image = fru_image_create(&cli.input, &cli.output, cli.offset)?;

    println!("OK: {}", cli.output.display());
    println!(
        "payload_crc=0x{:08X} header_crc=0x{:08X}",
        image.payload_crc(),
        image.header_crc()
    );
    if cli.dump {
        print!("{}", hex_dump(image.as_bytes()));
    }

    Ok(())
}
