//! Comb identifiers
//!
//! A comb identifier is a 128-bit UUID whose last six bytes hold the
//! creation time as big-endian Unix milliseconds. The leading ten bytes are
//! random (or chosen by the caller), so the timestamp can be recovered from
//! any identifier and identifiers sharing a prefix sort by creation time.
//!
//! Layout (byte offsets):
//!
//! ```text
//! 0                                     10                      16
//! | random / caller-supplied (80 bits)  | unix millis, BE (48)  |
//! ```
//!
//! The layout is part of the persisted format: identifiers already stored
//! must keep decoding to the same instant.

mod generator;

pub use generator::{
    CombIdGenerator, comb_id_at, comb_id_from, comb_id_with_timestamp, extract_timestamp,
    new_comb_id, TIMESTAMP_LEN, TIMESTAMP_OFFSET,
};
