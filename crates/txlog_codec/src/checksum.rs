//! Checksum provider for journal headers and records.
//!
//! Journals use two checksums:
//!
//! - **CRC32** is CRC-32C (Castagnoli) applied as a raw register update. The
//!   caller passes the initial register as `seed` and no final inversion is
//!   applied. Journal writers always seed with [`CRC32_SEED`].
//! - **CRC64** uses the reflected Jones polynomial with an all-ones initial
//!   register and no final inversion. It backs topic and client-name hashes.
//!
//! [`SoftwareChecksum`] is a portable table-driven implementation.
//! [`AcceleratedChecksum`] routes CRC32 through the `crc32c` crate, which uses
//! SSE4.2 or ARMv8 CRC instructions when the CPU has them. Both produce
//! identical results.

use std::fmt;

/// Initial register used for every journal CRC32.
pub const CRC32_SEED: u32 = 0xFFFF_FFFF;

const CRC32C_POLY: u32 = 0x82F6_3B78;
const CRC64_JONES_POLY: u64 = 0x95AC_9329_AC4B_C9B5;

const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC32C_POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

const CRC64_TABLE: [u64; 256] = {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u64;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC64_JONES_POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// A pluggable checksum implementation.
pub trait Checksum: Send + Sync + fmt::Debug {
    /// Updates the CRC-32C register `seed` with `bytes`.
    fn crc32(&self, bytes: &[u8], seed: u32) -> u32;

    /// Computes the CRC64 of `bytes`.
    fn crc64(&self, bytes: &[u8]) -> u64;
}

/// Table-driven checksums with no platform requirements.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareChecksum;

impl Checksum for SoftwareChecksum {
    fn crc32(&self, bytes: &[u8], seed: u32) -> u32 {
        let mut crc = seed;
        for &byte in bytes {
            let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
            crc = (crc >> 8) ^ CRC32_TABLE[index];
        }
        crc
    }

    fn crc64(&self, bytes: &[u8]) -> u64 {
        crc64(bytes)
    }
}

/// CRC32 through the `crc32c` crate, CRC64 in software.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceleratedChecksum;

impl Checksum for AcceleratedChecksum {
    fn crc32(&self, bytes: &[u8], seed: u32) -> u32 {
        // crc32c_append works on finalized values; undo both inversions.
        !crc32c::crc32c_append(!seed, bytes)
    }

    fn crc64(&self, bytes: &[u8]) -> u64 {
        crc64(bytes)
    }
}

/// Returns the fastest available checksum provider.
#[must_use]
pub fn default_checksum() -> &'static dyn Checksum {
    static ACCELERATED: AcceleratedChecksum = AcceleratedChecksum;
    &ACCELERATED
}

/// Computes the journal CRC64 of `bytes`.
#[must_use]
pub fn crc64(bytes: &[u8]) -> u64 {
    let mut crc = u64::MAX;
    for &byte in bytes {
        let index = ((crc ^ u64::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC64_TABLE[index];
    }
    crc
}

/// Hash of a topic as stored in a record's `topic_hash` field.
///
/// The message type name and topic are joined by a NUL byte.
#[must_use]
pub fn topic_hash(message_type: &str, topic: &[u8]) -> u64 {
    let mut input = Vec::with_capacity(message_type.len() + 1 + topic.len());
    input.extend_from_slice(message_type.as_bytes());
    input.push(0);
    input.extend_from_slice(topic);
    crc64(&input)
}

/// Hash of a client name as stored in a record's `client_name_hash` field.
///
/// When an instance name is given it is appended after a `0x01` separator.
#[must_use]
pub fn client_name_hash(client_name: &str, instance: Option<&str>) -> u64 {
    match instance {
        Some(instance) => {
            let mut input = Vec::with_capacity(client_name.len() + 1 + instance.len());
            input.extend_from_slice(client_name.as_bytes());
            input.push(1);
            input.extend_from_slice(instance.as_bytes());
            crc64(&input)
        }
        None => crc64(client_name.as_bytes()),
    }
}
