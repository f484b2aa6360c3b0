//! File header and extents header.
//!
//! A journal file starts with two 512-byte blocks:
//!
//! ```text
//! [0, 512)    FileHeader     magic "AMPS" | version | instance | label[32]
//!                            | (v7+) compression[8] | pad | options | flags | crc
//! [512, 1024) ExtentsHeader  first | (v7+) first_ts | last | (v7+) last_ts | crc
//! ```
//!
//! Both CRCs cover every header byte before the CRC field, seeded with
//! [`CRC32_SEED`]. Records start at [`body_offset`].

use crate::error::{CoreError, CoreResult};
use txlog_codec::{ByteReader, Checksum, CodecResult, CRC32_SEED, LATEST_VERSION};

/// Magic bytes at the start of every journal.
pub const MAGIC: [u8; 4] = *b"AMPS";

/// Size of each of the two header blocks.
pub const HEADER_BLOCK_LEN: u64 = 512;

/// Offset of the extents header.
pub const EXTENTS_OFFSET: u64 = HEADER_BLOCK_LEN;

/// Segment size; version 4+ bodies start here and closed files end on it.
pub const SEGMENT_LEN: u64 = 4096;

/// Version label written by this crate.
pub const VERSION_LABEL: &str = "amps::txlog/v8";

/// Compression type written by this crate.
pub const DEFAULT_COMPRESSION_TYPE: &str = "gz";

/// Compression options written by this crate.
pub const DEFAULT_COMPRESSION_OPTIONS: u64 = 9;

const LABEL_LEN: usize = 32;
const COMPRESSION_TYPE_LEN: usize = 8;
const SHORT_HEADER_LEN: usize = 48;
const LONG_HEADER_LEN: usize = 76;
const SHORT_EXTENTS_LEN: usize = 20;
const LONG_EXTENTS_LEN: usize = 36;

/// Offset of the first record for a schema version.
#[must_use]
pub const fn body_offset(version: u32) -> u64 {
    if version >= 4 {
        SEGMENT_LEN
    } else {
        2 * HEADER_BLOCK_LEN
    }
}

const fn has_long_headers(version: u32) -> bool {
    version >= 7
}

fn fixed_text<const N: usize>(text: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let len = text.len().min(N);
    out[..len].copy_from_slice(&text.as_bytes()[..len]);
    out
}

fn trimmed_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_matches(char::from(0))
        .trim()
        .to_string()
}

/// The first header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Schema version of the records.
    pub version: u32,
    /// Identifier of the instance that wrote the file.
    pub instance_id: u32,
    /// Null-padded version label.
    pub label: [u8; LABEL_LEN],
    /// Null-padded compression type (version 7+).
    pub compression_type: [u8; COMPRESSION_TYPE_LEN],
    /// Compression options (version 7+).
    pub compression_options: u64,
    /// Header flags (version 7+).
    pub flags: u64,
    /// Stored CRC.
    pub crc: u32,
}

impl FileHeader {
    /// Creates a header for the latest version.
    #[must_use]
    pub fn latest(instance_id: u32, compression_type: &str, compression_options: u64) -> Self {
        Self {
            version: LATEST_VERSION,
            instance_id,
            label: fixed_text(VERSION_LABEL),
            compression_type: fixed_text(compression_type),
            compression_options,
            flags: 0,
            crc: CRC32_SEED,
        }
    }

    /// Creates a header for an older version, as legacy writers produced.
    #[must_use]
    pub fn legacy(version: u32, instance_id: u32, label: &str) -> Self {
        Self {
            version,
            instance_id,
            label: fixed_text(label),
            compression_type: [0; COMPRESSION_TYPE_LEN],
            compression_options: 0,
            flags: 0,
            crc: CRC32_SEED,
        }
    }

    /// Parses the first header block of `path`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if the magic is wrong or the block is too short.
    pub fn parse(path: &str, block: &[u8]) -> CoreResult<Self> {
        Self::parse_fields(block)
            .map_err(|err| CoreError::invalid_format(path, format!("file header: {err}")))
            .and_then(|(magic, header)| {
                if magic == MAGIC {
                    Ok(header)
                } else {
                    Err(CoreError::invalid_format(
                        path,
                        format!("bad magic {:?}", magic.escape_ascii().to_string()),
                    ))
                }
            })
    }

    fn parse_fields(block: &[u8]) -> CodecResult<([u8; 4], Self)> {
        let mut reader = ByteReader::new(block);
        let magic = reader.read_array::<4>()?;
        let version = reader.read_u32()?;
        let instance_id = reader.read_u32()?;
        let label = reader.read_array::<LABEL_LEN>()?;
        let mut header = Self::legacy(version, instance_id, "");
        header.label = label;

        if has_long_headers(version) {
            header.compression_type = reader.read_array::<COMPRESSION_TYPE_LEN>()?;
            reader.read_bytes(4)?;
            header.compression_options = reader.read_u64()?;
            header.flags = reader.read_u64()?;
        }
        header.crc = reader.read_u32()?;
        Ok((magic, header))
    }

    /// Returns the version label without padding.
    #[must_use]
    pub fn label_text(&self) -> String {
        trimmed_text(&self.label)
    }

    /// Returns the compression type without padding.
    #[must_use]
    pub fn compression_text(&self) -> String {
        trimmed_text(&self.compression_type)
    }

    /// Encodes the header with its stored CRC.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let long = has_long_headers(self.version);
        let mut out = Vec::with_capacity(if long { LONG_HEADER_LEN } else { SHORT_HEADER_LEN });
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.instance_id.to_le_bytes());
        out.extend_from_slice(&self.label);
        if long {
            out.extend_from_slice(&self.compression_type);
            out.extend_from_slice(&[0; 4]);
            out.extend_from_slice(&self.compression_options.to_le_bytes());
            out.extend_from_slice(&self.flags.to_le_bytes());
        }
        out.extend_from_slice(&self.crc.to_le_bytes());
        out
    }

    /// Computes the CRC over the encoded header and stores it.
    pub fn seal(&mut self, checksum: &dyn Checksum) {
        self.crc = CRC32_SEED;
        let bytes = self.encode();
        self.crc = checksum.crc32(&bytes[..bytes.len() - 4], CRC32_SEED);
    }

    /// Recomputes the CRC and compares it with the stored one.
    #[must_use]
    pub fn crc_matches(&self, checksum: &dyn Checksum) -> bool {
        let mut sealed = self.clone();
        sealed.seal(checksum);
        sealed.crc == self.crc
    }
}

/// The declared range of local transaction ids in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Extents {
    /// First local txid.
    pub first: u64,
    /// Timestamp of the first record (version 7+).
    pub first_timestamp: i64,
    /// Last local txid.
    pub last: u64,
    /// Timestamp of the last record (version 7+).
    pub last_timestamp: i64,
}

impl Extents {
    /// Creates extents without timestamps.
    #[must_use]
    pub const fn new(first: u64, last: u64) -> Self {
        Self {
            first,
            first_timestamp: 0,
            last,
            last_timestamp: 0,
        }
    }

    /// True when the first bound is set but the file was never finalized.
    #[must_use]
    pub const fn is_unwritten(&self) -> bool {
        self.first > 0 && self.last == 0
    }

    /// Widens the range to include `txid`.
    ///
    /// A bound that moves takes `timestamp`. Unset bounds are established by
    /// the first call.
    pub fn widen(&mut self, txid: u64, timestamp: i64) {
        if self.first == 0 || txid < self.first {
            self.first = txid;
            self.first_timestamp = timestamp;
        }
        if self.last == 0 || txid > self.last {
            self.last = txid;
            self.last_timestamp = timestamp;
        }
    }
}

/// The second header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtentsHeader {
    /// Schema version, which selects the layout.
    pub version: u32,
    /// Declared extents.
    pub extents: Extents,
    /// Stored CRC.
    pub crc: u32,
}

impl ExtentsHeader {
    /// Creates an extents header.
    #[must_use]
    pub const fn new(version: u32, extents: Extents) -> Self {
        Self {
            version,
            extents,
            crc: CRC32_SEED,
        }
    }

    /// Parses the second header block of `path`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if the block is too short.
    pub fn parse(path: &str, version: u32, block: &[u8]) -> CoreResult<Self> {
        Self::parse_fields(version, block)
            .map_err(|err| CoreError::invalid_format(path, format!("extents header: {err}")))
    }

    fn parse_fields(version: u32, block: &[u8]) -> CodecResult<Self> {
        let mut reader = ByteReader::new(block);
        let mut extents = Extents::default();
        extents.first = reader.read_u64()?;
        if has_long_headers(version) {
            extents.first_timestamp = reader.read_i64()?;
        }
        extents.last = reader.read_u64()?;
        if has_long_headers(version) {
            extents.last_timestamp = reader.read_i64()?;
        }
        let crc = reader.read_u32()?;
        Ok(Self {
            version,
            extents,
            crc,
        })
    }

    /// Encodes the header with its stored CRC.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let long = has_long_headers(self.version);
        let mut out =
            Vec::with_capacity(if long { LONG_EXTENTS_LEN } else { SHORT_EXTENTS_LEN });
        out.extend_from_slice(&self.extents.first.to_le_bytes());
        if long {
            out.extend_from_slice(&self.extents.first_timestamp.to_le_bytes());
        }
        out.extend_from_slice(&self.extents.last.to_le_bytes());
        if long {
            out.extend_from_slice(&self.extents.last_timestamp.to_le_bytes());
        }
        out.extend_from_slice(&self.crc.to_le_bytes());
        out
    }

    /// Computes the CRC over the encoded header and stores it.
    pub fn seal(&mut self, checksum: &dyn Checksum) {
        self.crc = CRC32_SEED;
        let bytes = self.encode();
        self.crc = checksum.crc32(&bytes[..bytes.len() - 4], CRC32_SEED);
    }
}
