//! Binary key layouts.
//!
//! - `outputs`: `outpoint(36) ++ topic`
//! - `topic_scores`: `topic ++ 0x00 ++ score_be(8) ++ outpoint(36)`
//! - `applied_transactions`: `txid(32) ++ topic`
//!
//! Topic names must not contain a NUL byte, which keeps every topic's score
//! index a contiguous key range.

use overlay_store::StoreError;
use overlay_types::{Outpoint, Score, TxId};

pub(crate) const TOPIC_TERMINATOR: u8 = 0x00;

pub(crate) fn check_topic(topic: &str) -> Result<(), StoreError> {
    if topic.as_bytes().contains(&TOPIC_TERMINATOR) {
        return Err(StoreError::Serialization(format!(
            "topic name contains NUL: {topic:?}"
        )));
    }
    Ok(())
}

pub(crate) fn output_key(outpoint: &Outpoint, topic: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(36 + topic.len());
    key.extend_from_slice(&outpoint.to_key());
    key.extend_from_slice(topic.as_bytes());
    key
}

pub(crate) fn topic_prefix(topic: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(topic.len() + 1);
    key.extend_from_slice(topic.as_bytes());
    key.push(TOPIC_TERMINATOR);
    key
}

pub(crate) fn score_key(topic: &str, score: Score, outpoint: &Outpoint) -> Vec<u8> {
    let mut key = topic_prefix(topic);
    key.extend_from_slice(&score.value().to_be_bytes());
    key.extend_from_slice(&outpoint.to_key());
    key
}

/// Smallest score-index key of `topic` with a score strictly above `since`.
pub(crate) fn score_lower_bound(topic: &str, since: Score) -> Option<Vec<u8>> {
    let next = since.value().checked_add(1)?;
    let mut key = topic_prefix(topic);
    key.extend_from_slice(&next.to_be_bytes());
    Some(key)
}

/// Outpoint stored in the tail of a score-index key.
pub(crate) fn outpoint_from_score_key(key: &[u8]) -> Option<Outpoint> {
    let start = key.len().checked_sub(36)?;
    Outpoint::from_key(&key[start..])
}

pub(crate) fn applied_key(txid: &TxId, topic: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(32 + topic.len());
    key.extend_from_slice(txid.as_bytes());
    key.extend_from_slice(topic.as_bytes());
    key
}

/// Increment a byte-string prefix to get an exclusive upper bound for range
/// scans. Returns `false` if the prefix is all `0xFF` (no upper bound).
pub(crate) fn increment_prefix(prefix: &mut Vec<u8>) -> bool {
    while let Some(last) = prefix.last_mut() {
        if *last < 0xFF {
            *last += 1;
            return true;
        }
        prefix.pop();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(b: u8, i: u32) -> Outpoint {
        Outpoint::new(TxId::new([b; 32]), i)
    }

    #[test]
    fn score_keys_sort_by_score_within_topic() {
        let a = score_key("t", Score::new(2), &op(9, 0));
        let b = score_key("t", Score::new(10), &op(1, 0));
        assert!(a < b);
    }

    #[test]
    fn topic_ranges_do_not_overlap() {
        let short = score_key("tm", Score::new(u64::MAX), &op(0xff, u32::MAX));
        let long = score_key("tm_a", Score::new(0), &op(0, 0));
        let mut upper = topic_prefix("tm");
        increment_prefix(&mut upper);
        assert!(short < upper);
        assert!(long > upper);
    }

    #[test]
    fn lower_bound_saturates() {
        assert!(score_lower_bound("t", Score::new(u64::MAX)).is_none());
    }

    #[test]
    fn outpoint_recovered_from_score_key() {
        let key = score_key("topic", Score::new(5), &op(3, 4));
        assert_eq!(outpoint_from_score_key(&key), Some(op(3, 4)));
    }

    #[test]
    fn rejects_nul_in_topic() {
        assert!(check_topic("bad\0topic").is_err());
        assert!(check_topic("tm_tokens").is_ok());
    }
}
