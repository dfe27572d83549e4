// Licensed under the Apache-2.0 license

use crate::record::FruFields;
use anyhow::{anyhow, Context, Result};
use fru_image::FruImage;
use log::{debug, info};
use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use zerocopy::IntoBytes;

const DUMP_LINE_LEN: usize = 16;

pub fn load_record(path: &Path) -> Result<FruFields> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Cannot read file '{}'", path.display()))?;
    let fields = FruFields::from_json_str(&contents)
        .with_context(|| format!("Cannot load record from '{}'", path.display()))?;
    debug!(
        "Loaded record from {}: {}",
        path.display(),
        serde_json::to_string(&fields)?
    );
    Ok(fields)
}

/// Writes `image` at `offset` into `path`.
///
/// At offset 0 the file is truncated so it holds exactly the image. Any other
/// offset patches the image into the existing file, leaving the rest intact.
pub fn write_image(image: &FruImage, offset: u64, path: &Path) -> Result<()> {
    let mut file = if offset == 0 {
        File::create(path)
    } else {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
    }
    .map_err(|e| anyhow!("Unable to open file {}: {}", path.display(), e))?;

    file.seek(SeekFrom::Start(offset)).map_err(|e| {
        anyhow!(
            "Unable to seek to offset {} in file {}: {}",
            offset,
            path.display(),
            e
        )
    })?;
    file.write_all(image.as_bytes())?;
    file.flush()?;
    Ok(())
}

/// Loads the JSON record at `input`, builds its image and writes it to
/// `output` at `offset`.
pub fn fru_image_create(input: &Path, output: &Path, offset: u64) -> Result<FruImage> {
    let fields = load_record(input)?;
    let image = FruImage::build(&fields.as_record());
    info!(
        "Built FRU image: payload_crc=0x{:08X} header_crc=0x{:08X}",
        image.payload_crc(),
        image.header_crc()
    );

    write_image(&image, offset, output)?;
    info!("Wrote {} at offset 0x{:X}", output.display(), offset);
    Ok(image)
}

/// Formats `data` as rows of 16 uppercase hex bytes, each prefixed with its
/// offset.
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::new();
    for (i, line) in data.chunks(DUMP_LINE_LEN).enumerate() {
        let bytes: Vec<String> = line.iter().map(|b| format!("{:02X}", b)).collect();
        let _ = writeln!(out, "{:04X}: {}", i * DUMP_LINE_LEN, bytes.join(" "));
    }
    out
}
