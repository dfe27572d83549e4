// Licensed under the Apache-2.0 license
#![no_std]

//! Layout and construction of the 512-byte JFRU identity image.
//!
//! An image is a 64-byte header followed by a 448-byte payload. The header
//! carries the CRC-32 of the payload plus a CRC-32 of the header itself,
//! computed with its own checksum slot zeroed.

use core::mem::{offset_of, size_of};

use crc32fast::Hasher;
use zerocopy::{
    byteorder::{LittleEndian, U16, U32},
    FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout,
};

pub const FRU_IMAGE_MAGIC: [u8; 4] = *b"JFRU";
pub const HEADER_VERSION: u16 = 0x0001;
pub const HEADER_LEN: usize = 0x40;
pub const TOTAL_LEN: usize = 512;
pub const PAYLOAD_LEN: usize = TOTAL_LEN - HEADER_LEN;

/// Size of each ASCII text slot in the payload.
pub const TEXT_SLOT_LEN: usize = 16;

pub const PAYLOAD_CRC_OFFSET: usize = offset_of!(FruHeader, payload_crc);
pub const HEADER_CRC_OFFSET: usize = offset_of!(FruHeader, header_crc);

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct FruHeader {
    pub magic: [u8; 4],
    pub version: U16<LittleEndian>,
    pub header_len: U16<LittleEndian>,
    pub total_len: U32<LittleEndian>,
    pub payload_crc: U32<LittleEndian>,
    pub header_crc: U32<LittleEndian>,
    pub reserved: [u8; 44],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct FruPayload {
    pub serial: [u8; TEXT_SLOT_LEN],
    pub part: [u8; TEXT_SLOT_LEN],
    pub mac: [u8; TEXT_SLOT_LEN],
    pub mfg_date: U32<LittleEndian>,
    pub flags: u8,
    pub reserved: [u8; 395],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct FruImage {
    header: FruHeader,
    payload: FruPayload,
}

const _: () = assert!(size_of::<FruHeader>() == HEADER_LEN);
const _: () = assert!(size_of::<FruPayload>() == PAYLOAD_LEN);
const _: () = assert!(size_of::<FruImage>() == TOTAL_LEN);

/// Input to [`FruImage::build`].
///
/// Numeric fields are taken as raw 64-bit values and narrowed by
/// [`u32le`] and [`u8_masked`]; text fields go through [`text_slot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FruRecord<'a> {
    pub serial: &'a str,
    pub part: &'a str,
    pub mac: &'a str,
    pub mfg_date: u64,
    pub flags: u64,
}

impl FruImage {
    /// Builds the image for `record`.
    ///
    /// The order of the steps below is part of the format: the payload CRC
    /// covers the finished payload (zero padding included) and is stored in
    /// the header before the header CRC is taken, and the header CRC is taken
    /// while its own slot still reads zero.
    pub fn build(record: &FruRecord) -> Self {
        let mut image = Self::new_zeroed();

        let payload = &mut image.payload;
        payload.serial = text_slot(record.serial);
        payload.part = text_slot(record.part);
        payload.mac = text_slot(record.mac);
        payload.mfg_date = U32::from_bytes(u32le(record.mfg_date));
        payload.flags = u8_masked(record.flags);

        let payload_crc = calculate_checksum(image.payload.as_bytes());

        let header = &mut image.header;
        header.magic = FRU_IMAGE_MAGIC;
        header.version = HEADER_VERSION.into();
        header.header_len = (HEADER_LEN as u16).into();
        header.total_len = (TOTAL_LEN as u32).into();
        header.payload_crc = payload_crc.into();
        header.header_crc = U32::ZERO;

        let header_crc = calculate_checksum(image.header.as_bytes());
        image.header.header_crc = header_crc.into();

        image
    }

    pub fn header(&self) -> &FruHeader {
        &self.header
    }

    pub fn payload(&self) -> &FruPayload {
        &self.payload
    }

    pub fn payload_crc(&self) -> u32 {
        self.header.payload_crc.get()
    }

    pub fn header_crc(&self) -> u32 {
        self.header.header_crc.get()
    }
}

/// CRC-32 (IEEE 802.3) of `data`.
pub fn calculate_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Keeps the ASCII bytes of `value`, truncated to `N` and zero-padded.
pub fn text_slot<const N: usize>(value: &str) -> [u8; N] {
    let mut slot = [0u8; N];
    for (dst, src) in slot.iter_mut().zip(value.bytes().filter(u8::is_ascii)) {
        *dst = src;
    }
    slot
}

/// Low 32 bits of `value`, little-endian.
pub fn u32le(value: u64) -> [u8; 4] {
    ((value & 0xFFFF_FFFF) as u32).to_le_bytes()
}

pub fn u8_masked(value: u64) -> u8 {
    (value & 0xFF) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD_BASE: usize = HEADER_LEN;

    fn scenario() -> FruRecord<'static> {
        FruRecord {
            serial: "SN123",
            part: "PN01",
            mac: "00:11:22",
            mfg_date: 1_700_000_000,
            flags: 3,
        }
    }

    fn assert_checksums_valid(bytes: &[u8]) {
        let stored_payload_crc = u32::from_le_bytes(
            bytes[PAYLOAD_CRC_OFFSET..PAYLOAD_CRC_OFFSET + 4]
                .try_into()
                .unwrap(),
        );
        assert_eq!(
            calculate_checksum(&bytes[HEADER_LEN..TOTAL_LEN]),
            stored_payload_crc
        );

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&bytes[..HEADER_LEN]);
        let stored_header_crc = u32::from_le_bytes(
            header[HEADER_CRC_OFFSET..HEADER_CRC_OFFSET + 4]
                .try_into()
                .unwrap(),
        );
        header[HEADER_CRC_OFFSET..HEADER_CRC_OFFSET + 4].fill(0);
        assert_eq!(calculate_checksum(&header), stored_header_crc);
    }

    #[test]
    fn test_text_slot() {
        assert_eq!(text_slot::<4>(""), [0; 4]);
        assert_eq!(&text_slot::<8>("ab"), b"ab\0\0\0\0\0\0");
        assert_eq!(&text_slot::<4>("abcdefgh"), b"abcd");
        // Non-ASCII characters are dropped, not replaced.
        assert_eq!(&text_slot::<6>("a\u{e9}b\u{4e2d}c"), b"abc\0\0\0");
    }

    #[test]
    fn test_numeric_normalizers() {
        assert_eq!(u8_masked(0x1FF), 0xFF);
        assert_eq!(u8_masked(0x100), 0);
        assert_eq!(u8_masked(u64::MAX), 0xFF);
        assert_eq!(u32le(1_700_000_000), 1_700_000_000u32.to_le_bytes());
        assert_eq!(u32le(0x1_2345_6789), [0x89, 0x67, 0x45, 0x23]);
        assert_eq!(u32le(u64::MAX), [0xFF; 4]);
    }

    #[test]
    fn test_header_fields() {
        let image = FruImage::build(&scenario());
        let bytes = image.as_bytes();

        assert_eq!(bytes.len(), TOTAL_LEN);
        assert_eq!(&bytes[0x00..0x04], b"JFRU");
        assert_eq!(&bytes[0x04..0x06], &[0x01, 0x00]);
        assert_eq!(&bytes[0x06..0x08], &[0x40, 0x00]);
        assert_eq!(&bytes[0x08..0x0C], &[0x00, 0x02, 0x00, 0x00]);
        assert_eq!(&bytes[0x0C..0x10], &image.payload_crc().to_le_bytes());
        assert_eq!(&bytes[0x10..0x14], &image.header_crc().to_le_bytes());
        assert!(bytes[0x14..HEADER_LEN].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_scenario_payload() {
        let image = FruImage::build(&scenario());
        let bytes = image.as_bytes();

        assert_eq!(&bytes[0x40..0x50], b"SN123\0\0\0\0\0\0\0\0\0\0\0");
        assert_eq!(&bytes[0x50..0x60], b"PN01\0\0\0\0\0\0\0\0\0\0\0\0");
        assert_eq!(&bytes[0x60..0x70], b"00:11:22\0\0\0\0\0\0\0\0");
        assert_eq!(&bytes[0x70..0x74], &1_700_000_000u32.to_le_bytes());
        assert_eq!(bytes[0x74], 0x03);
        assert!(bytes[0x75..TOTAL_LEN].iter().all(|&b| b == 0));
        assert_checksums_valid(bytes);
    }

    #[test]
    fn test_build_is_deterministic() {
        let first = FruImage::build(&scenario());
        let second = FruImage::build(&scenario());
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_empty_record() {
        let image = FruImage::build(&FruRecord::default());
        let bytes = image.as_bytes();

        assert!(bytes[PAYLOAD_BASE..TOTAL_LEN].iter().all(|&b| b == 0));
        assert_eq!(image.payload_crc(), calculate_checksum(&[0u8; PAYLOAD_LEN]));
        assert_checksums_valid(bytes);
    }

    #[test]
    fn test_oversized_text_stays_in_slot() {
        let record = FruRecord {
            serial: "SERIAL-0123456789-OVERFLOW",
            part: "PART-ABCDEFGHIJKLMNOP",
            mac: "00:11:22:33:44:55:66",
            ..Default::default()
        };
        let image = FruImage::build(&record);
        let payload = image.payload();

        assert_eq!(&payload.serial, b"SERIAL-012345678");
        assert_eq!(&payload.part, b"PART-ABCDEFGHIJK");
        assert_eq!(&payload.mac, b"00:11:22:33:44:5");
        assert_eq!(payload.mfg_date.get(), 0);
        assert_eq!(payload.flags, 0);
        assert_checksums_valid(image.as_bytes());
    }

    #[test]
    fn test_flags_and_date_are_masked() {
        let record = FruRecord {
            mfg_date: 0xAB_0000_0001,
            flags: 0x1FF,
            ..Default::default()
        };
        let image = FruImage::build(&record);
        let bytes = image.as_bytes();

        assert_eq!(&bytes[0x70..0x74], &[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(bytes[0x74], 0xFF);
        assert_eq!(bytes[0x75], 0x00);
    }

    #[test]
    fn test_header_crc_depends_on_payload_crc() {
        let a = FruImage::build(&scenario());
        let b = FruImage::build(&FruRecord {
            flags: 4,
            ..scenario()
        });

        assert_ne!(a.payload_crc(), b.payload_crc());
        assert_ne!(a.header_crc(), b.header_crc());
        assert_eq!(
            &a.as_bytes()[..PAYLOAD_CRC_OFFSET],
            &b.as_bytes()[..PAYLOAD_CRC_OFFSET]
        );
    }

    #[test]
    fn test_header_crc_computed_with_zeroed_slot() {
        let image = FruImage::build(&scenario());
        let mut header = *image.header();

        // Taking the CRC over the stored header (slot filled in) must not
        // reproduce the stored value.
        assert_ne!(calculate_checksum(header.as_bytes()), image.header_crc());

        header.header_crc = U32::ZERO;
        assert_eq!(calculate_checksum(header.as_bytes()), image.header_crc());
    }

    #[test]
    fn test_round_trip_through_bytes() {
        let image = FruImage::build(&scenario());
        let parsed = FruImage::read_from_bytes(image.as_bytes()).unwrap();
        assert_eq!(parsed.header().magic, FRU_IMAGE_MAGIC);
        assert_eq!(parsed.payload_crc(), image.payload_crc());
        assert_eq!(parsed.header_crc(), image.header_crc());
    }
}
