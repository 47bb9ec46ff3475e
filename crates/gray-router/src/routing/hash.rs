//! Stable canary bucketing.
//!
//! `h = h * 31 + c` over UTF-16 code units with 32-bit wrapping. Clients that
//! compute the same value must land in the same bucket.

/// Number of buckets a tag can land in.
pub const BUCKETS: u8 = 100;

/// Map a canary tag to a bucket in `0..100`.
pub fn hash_to_bucket(tag: &str) -> u8 {
    let mut h: i32 = 0;
    for unit in tag.encode_utf16() {
        h = (h << 5).wrapping_sub(h).wrapping_add(i32::from(unit));
    }
    // widen before abs so i32::MIN does not overflow
    (i64::from(h).abs() % i64::from(BUCKETS)) as u8
}
