//! # txlog Codec
//!
//! Pure, I/O-free translation between journal record bytes and the canonical
//! [`Record`].
//!
//! The journal format has had eight schema versions. Their fixed record
//! headers fall into five layout families ([`RecordSchema`]); all of them
//! decode into one [`Record`] and any record can be encoded into any layout,
//! though writers always use [`LATEST_VERSION`].
//!
//! ## Record layout
//!
//! ```text
//! fixed header (96..120 bytes) | topic | auth id | key | correlation id
//!     | replication path | message data | zero padding to 256
//! ```
//!
//! The CRC32 in the first four bytes covers everything after itself up to
//! the end of the message data.
//!
//! ## Usage
//!
//! ```
//! use txlog_codec::{decode_record, encode_record, default_checksum, Payload, Record, RecordType, LATEST_VERSION};
//!
//! let mut record = Record::new(RecordType::Publish);
//! record.local_txid = 1;
//! record.topic = b"orders".to_vec();
//! record.data = Payload::Bytes(b"{}".to_vec());
//!
//! let encoded = encode_record(LATEST_VERSION, &record, default_checksum()).unwrap();
//! assert_eq!(encoded.bytes.len(), 256);
//!
//! let decoded = decode_record(LATEST_VERSION, &encoded.bytes).unwrap();
//! assert_eq!(decoded.topic, b"orders");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bytes;
mod checksum;
mod decoder;
mod encoder;
mod entitlement;
mod error;
mod record;
mod render;
mod schema;

pub use bytes::ByteReader;
pub use checksum::{
    client_name_hash, crc64, default_checksum, topic_hash, AcceleratedChecksum, Checksum,
    SoftwareChecksum, CRC32_SEED,
};
pub use decoder::{decode_fixed_header, decode_record, record_crc, FixedHeader};
pub use encoder::{encode_record, EncodedRecord};
pub use entitlement::{parse_entitlements, render_entitlements, Entitlement};
pub use error::{CodecError, CodecResult};
pub use record::{
    message_type_label, DataView, Expiration, Flags, KeyView, MessageType, Payload, Record,
    RecordType, Transfer,
};
pub use render::{
    expiration_timestamp, iso8601_timestamp, iso_timestamp, journal_time_to_unix,
    unix_to_journal_time, ExpirationFormat, RenderOptions, TimeZoneMode,
    JOURNAL_EPOCH_OFFSET_SECS,
};
pub use schema::{align_up, Field, RecordSchema, Width, LATEST_VERSION, MIN_RECORD_SIZE};
