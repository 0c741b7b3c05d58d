//! Query identifiers: normalized text hashed the way PostgreSQL's
//! `hash_any_extended` does it.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::normalize::{NormalizeOptions, Normalizer};

/// Identifier of a normalized query.
///
/// Stored unsigned, shown and serialized as a signed `bigint` so it matches
/// what the database prints for the same query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(u64);

impl QueryId {
    /// Zero is reserved for "no id"; a zero hash becomes 1.
    pub fn from_hash(hash: u64) -> Self {
        if hash == 0 {
            QueryId(1)
        } else {
            QueryId(hash)
        }
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }
}

impl From<i64> for QueryId {
    fn from(value: i64) -> Self {
        QueryId(value as u64)
    }
}

impl From<u64> for QueryId {
    fn from(value: u64) -> Self {
        QueryId(value)
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

impl FromStr for QueryId {
    type Err = std::num::ParseIntError;

    /// Accepts both the signed form and the unsigned one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.parse::<i64>() {
            Ok(v) => Ok(QueryId::from(v)),
            Err(_) => s.parse::<u64>().map(QueryId::from),
        }
    }
}

impl Serialize for QueryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_i64())
    }
}

struct QueryIdVisitor;

impl<'de> Visitor<'de> for QueryIdVisitor {
    type Value = QueryId;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a 64-bit query identifier")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<QueryId, E> {
        Ok(QueryId::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<QueryId, E> {
        Ok(QueryId::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<QueryId, E> {
        v.parse().map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for QueryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(QueryIdVisitor)
    }
}

/// Options used for fingerprinting: compact, no trailing `;`, no EXPLAIN.
pub fn fingerprint_options() -> NormalizeOptions {
    NormalizeOptions {
        preserve_space: false,
        drop_trailing_semicolon: true,
        strip_explain: true,
    }
}

/// Computes the identifier of a query.
pub fn query_id(text: &str) -> QueryId {
    let normalized = Normalizer::new(fingerprint_options()).normalize(text);
    let id = QueryId::from_hash(hash_bytes_extended(normalized.text.as_bytes(), 0));
    debug!("QueryID {id} for {:?}", normalized.text);
    id
}

#[inline]
fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*c);
    *a ^= c.rotate_left(4);
    *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a);
    *b ^= a.rotate_left(6);
    *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b);
    *c ^= b.rotate_left(8);
    *b = b.wrapping_add(*a);
    *a = a.wrapping_sub(*c);
    *a ^= c.rotate_left(16);
    *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a);
    *b ^= a.rotate_left(19);
    *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b);
    *c ^= b.rotate_left(4);
    *b = b.wrapping_add(*a);
}

#[inline]
fn final_mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(14));
    *a ^= *c;
    *a = a.wrapping_sub(c.rotate_left(11));
    *b ^= *a;
    *b = b.wrapping_sub(a.rotate_left(25));
    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(16));
    *a ^= *c;
    *a = a.wrapping_sub(c.rotate_left(4));
    *b ^= *a;
    *b = b.wrapping_sub(a.rotate_left(14));
    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(24));
}

/// Little-endian word from up to four bytes.
fn le_word(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .enumerate()
        .fold(0u32, |acc, (i, &b)| acc | (u32::from(b) << (8 * i)))
}

/// Bob Jenkins' lookup3 hash, 64-bit output, as in PostgreSQL's
/// `hash_bytes_extended`. Words are read little-endian.
pub fn hash_bytes_extended(key: &[u8], seed: u64) -> u64 {
    let init = 0x9e37_79b9u32
        .wrapping_add(key.len() as u32)
        .wrapping_add(3_923_095);
    let (mut a, mut b, mut c) = (init, init, init);

    if seed != 0 {
        a = a.wrapping_add((seed >> 32) as u32);
        b = b.wrapping_add(seed as u32);
        mix(&mut a, &mut b, &mut c);
    }

    let mut chunks = key.chunks_exact(12);
    for chunk in &mut chunks {
        a = a.wrapping_add(le_word(&chunk[0..4]));
        b = b.wrapping_add(le_word(&chunk[4..8]));
        c = c.wrapping_add(le_word(&chunk[8..12]));
        mix(&mut a, &mut b, &mut c);
    }

    // The low byte of `c` is left for the length.
    let tail = chunks.remainder();
    if tail.len() > 8 {
        c = c.wrapping_add(le_word(&tail[8..]) << 8);
    }
    if tail.len() > 4 {
        b = b.wrapping_add(le_word(&tail[4..tail.len().min(8)]));
    }
    if !tail.is_empty() {
        a = a.wrapping_add(le_word(&tail[..tail.len().min(4)]));
    }

    final_mix(&mut a, &mut b, &mut c);
    (u64::from(b) << 32) | u64::from(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_known_values() {
        assert_eq!(hash_bytes_extended(b"", 0), 0x9fb1_b765_a7ea_466d);
        assert_eq!(hash_bytes_extended(b"a", 0), 0x31d9_4c66_4013_70b1);
        assert_eq!(hash_bytes_extended(b"SELECT ?", 0), 0x2a0e_9124_e341_ded6);
        assert_eq!(hash_bytes_extended(b"abcdefghijkl", 0), 0x9721_6e83_a176_3ad4);
        assert_eq!(
            hash_bytes_extended(b"SELECT * FROM t WHERE id = ?", 0),
            0x06c0_72cf_8f26_4106
        );
    }

    #[test]
    fn test_hash_seed_changes_result() {
        assert_eq!(hash_bytes_extended(b"SELECT ?", 42), 0xbc33_2ee1_f2dc_dc45);
        assert_ne!(hash_bytes_extended(b"SELECT ?", 42), hash_bytes_extended(b"SELECT ?", 0));
    }

    #[test]
    fn test_query_id_ignores_literals_and_layout() {
        let id = query_id("SELECT * FROM t WHERE id = 42");
        assert_eq!(id, query_id("select *   from t where id = 7;"));
        assert_eq!(id, query_id("SELECT * FROM t -- lookup\n WHERE id = -1"));
        assert_eq!(id.as_u64(), 0x06c0_72cf_8f26_4106);
        assert_ne!(id, query_id("SELECT * FROM u WHERE id = 42"));
    }

    #[test]
    fn test_query_id_ignores_explain() {
        let id = query_id("SELECT a FROM t WHERE b = 'x'");
        assert_eq!(id, query_id("EXPLAIN SELECT a FROM t WHERE b = 'y'"));
        assert_eq!(id, query_id("EXPLAIN (ANALYZE, BUFFERS) SELECT a FROM t WHERE b = 'z'"));
        assert_eq!(id, query_id("explain analyze SELECT a FROM t WHERE b = 'z'"));
    }

    #[test]
    fn test_query_id_ignores_sign_of_parenthesized_constant() {
        let id = query_id("SELECT * FROM t WHERE id IN (1)");
        assert_eq!(id, query_id("SELECT * FROM t WHERE id IN (-1)"));
        assert_eq!(id, query_id("SELECT * FROM t WHERE id IN (42);"));
        assert_ne!(id, query_id("SELECT * FROM t WHERE id IN (1, 2)"));
    }

    #[test]
    fn test_query_id_is_never_zero() {
        assert_eq!(QueryId::from_hash(0).as_u64(), 1);
        assert_eq!(QueryId::from_hash(7).as_u64(), 7);
    }

    #[test]
    fn test_display_is_signed() {
        let id = QueryId::from(0x9fb1_b765_a7ea_466du64);
        assert_eq!(id.to_string(), "-6939563903564495251");
        assert_eq!(id.as_i64(), -6939563903564495251);
    }

    #[test]
    fn test_parse_signed_and_unsigned() {
        let id: QueryId = "-6939563903564495251".parse().unwrap();
        assert_eq!(id.as_u64(), 0x9fb1_b765_a7ea_466d);
        let id: QueryId = "11507180170145056365".parse().unwrap();
        assert_eq!(id.as_u64(), 0x9fb1_b765_a7ea_466d);
        assert!("nope".parse::<QueryId>().is_err());
    }

    #[test]
    fn test_serde_uses_bigint_form() {
        let id = QueryId::from(-5i64);
        assert_eq!(serde_json::to_string(&id).unwrap(), "-5");
        let back: QueryId = serde_json::from_str("-5").unwrap();
        assert_eq!(back, id);
        let unsigned: QueryId = serde_json::from_str("18446744073709551611").unwrap();
        assert_eq!(unsigned, id);
        let quoted: QueryId = serde_json::from_str("\"-5\"").unwrap();
        assert_eq!(quoted, id);
    }
}
