use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Offset of the timestamp field inside the 16-byte identifier.
pub const TIMESTAMP_OFFSET: usize = 10;

/// Width of the timestamp field in bytes.
pub const TIMESTAMP_LEN: usize = 6;

/// Creates a comb identifier from a random UUID and the current UTC time.
pub fn new_comb_id() -> Uuid {
    comb_id_with_timestamp(Uuid::new_v4(), Utc::now())
}

/// Stamps the current UTC time onto `base`, keeping its first ten bytes.
pub fn comb_id_from(base: Uuid) -> Uuid {
    comb_id_with_timestamp(base, Utc::now())
}

/// Creates a comb identifier with a random prefix and the given timestamp.
///
/// Useful when backdating identifiers, e.g. for migrated records.
pub fn comb_id_at(timestamp: DateTime<Utc>) -> Uuid {
    comb_id_with_timestamp(Uuid::new_v4(), timestamp)
}

/// Overwrites the last six bytes of `base` with `timestamp`.
///
/// Sub-millisecond precision is dropped. Instants before the epoch are
/// written as the low 48 bits of their two's-complement millisecond count
/// and therefore do not round-trip.
pub fn comb_id_with_timestamp(base: Uuid, timestamp: DateTime<Utc>) -> Uuid {
    let mut bytes = *base.as_bytes();
    write_timestamp(
        &mut bytes[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + TIMESTAMP_LEN],
        timestamp,
    );
    Uuid::from_bytes(bytes)
}

/// Reads the embedded timestamp back out of an identifier.
///
/// Every 128-bit value decodes: identifiers that were not produced by this
/// module simply yield whatever instant their last six bytes spell.
pub fn extract_timestamp(id: Uuid) -> DateTime<Utc> {
    let bytes = id.as_bytes();
    read_timestamp(&bytes[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + TIMESTAMP_LEN])
}

fn write_timestamp(destination: &mut [u8], timestamp: DateTime<Utc>) {
    let unix_millis = timestamp.timestamp_millis() as u64;
    let unix_bytes = unix_millis.to_be_bytes();
    destination.copy_from_slice(&unix_bytes[8 - TIMESTAMP_LEN..]);
}

fn read_timestamp(source: &[u8]) -> DateTime<Utc> {
    let mut unix_bytes = [0u8; 8];
    unix_bytes[8 - TIMESTAMP_LEN..].copy_from_slice(source);
    // At most 2^48 - 1 ms, roughly the year 10889: always representable.
    let unix_millis = i64::from_be_bytes(unix_bytes);
    DateTime::from_timestamp_millis(unix_millis).unwrap_or_default()
}

/// Comb identifier source with an injectable clock.
#[derive(Debug, Clone, Copy)]
pub struct CombIdGenerator {
    clock: fn() -> DateTime<Utc>,
}

impl CombIdGenerator {
    /// Generator stamping `Utc::now()`.
    pub fn system() -> Self {
        Self { clock: Utc::now }
    }

    /// Generator reading time from `clock` (handy for deterministic tests).
    pub fn with_clock(clock: fn() -> DateTime<Utc>) -> Self {
        Self { clock }
    }

    pub fn generate(&self) -> Uuid {
        comb_id_with_timestamp(Uuid::new_v4(), (self.clock)())
    }

    pub fn generate_from(&self, base: Uuid) -> Uuid {
        comb_id_with_timestamp(base, (self.clock)())
    }
}

impl Default for CombIdGenerator {
    fn default() -> Self {
        Self::system()
    }
}
