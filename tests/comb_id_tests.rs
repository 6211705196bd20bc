/// Comb identifier tests
///
/// Laws of the timestamp-embedding identifier generator.
/// Run with: cargo test --test comb_id_tests
use chrono::{DateTime, TimeZone, Utc};
use docsession::id::{TIMESTAMP_LEN, TIMESTAMP_OFFSET};
use docsession::{
    CombIdGenerator, comb_id_from, comb_id_with_timestamp, extract_timestamp, new_comb_id,
};
use proptest::prelude::*;
use uuid::Uuid;

// Largest millisecond count that fits the 48-bit field.
const MAX_MILLIS: i64 = (1 << 48) - 1;

fn timestamp_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..MAX_MILLIS).prop_map(|millis| {
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or_else(|| panic!("invalid millis {millis}"))
    })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

    #[test]
    fn timestamp_round_trips(base in any::<u128>(), at in timestamp_strategy()) {
        let id = comb_id_with_timestamp(Uuid::from_u128(base), at);
        prop_assert_eq!(extract_timestamp(id).timestamp_millis(), at.timestamp_millis());
    }

    #[test]
    fn extraction_never_faults(raw in any::<u128>()) {
        let extracted = extract_timestamp(Uuid::from_u128(raw));
        prop_assert!(extracted.timestamp_millis() >= 0);
        prop_assert!(extracted.timestamp_millis() <= MAX_MILLIS);
    }

    #[test]
    fn base_prefix_is_preserved(base in any::<u128>(), at in timestamp_strategy()) {
        let base = Uuid::from_u128(base);
        let id = comb_id_with_timestamp(base, at);
        prop_assert_eq!(&id.as_bytes()[..TIMESTAMP_OFFSET], &base.as_bytes()[..TIMESTAMP_OFFSET]);
    }
}

#[test]
fn test_generated_ids_carry_current_time() {
    let before = Utc::now().timestamp_millis();
    let id = new_comb_id();
    let after = Utc::now().timestamp_millis();

    let stamped = extract_timestamp(id).timestamp_millis();
    assert!(before <= stamped && stamped <= after);
}

#[test]
fn test_comb_from_base_keeps_prefix() {
    let base = Uuid::new_v4();
    let id = comb_id_from(base);
    assert_eq!(&id.as_bytes()[..TIMESTAMP_OFFSET], &base.as_bytes()[..TIMESTAMP_OFFSET]);
    assert_eq!(TIMESTAMP_OFFSET + TIMESTAMP_LEN, 16);
}

#[test]
fn test_fixed_clock_generator_is_deterministic_in_time() {
    fn fixed() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_123)
            .single()
            .unwrap_or_default()
    }

    let generator = CombIdGenerator::with_clock(fixed);
    let a = generator.generate();
    let b = generator.generate();

    assert_ne!(a, b);
    assert_eq!(extract_timestamp(a), fixed());
    assert_eq!(extract_timestamp(b), fixed());
}

#[test]
fn test_ids_sort_by_time_in_last_bytes() {
    let early = Utc.timestamp_millis_opt(1_000).single().unwrap();
    let late = Utc.timestamp_millis_opt(2_000).single().unwrap();

    let a = comb_id_with_timestamp(Uuid::new_v4(), early);
    let b = comb_id_with_timestamp(Uuid::new_v4(), late);
    assert!(a.as_bytes()[TIMESTAMP_OFFSET..] < b.as_bytes()[TIMESTAMP_OFFSET..]);
}
