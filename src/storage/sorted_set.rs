//! Sorted Sets
//!
//! A sorted set keeps unique members ordered ascending by score. Members with
//! equal scores are ordered by their bytes, so ranks are deterministic.
//!
//! The sequence is re-sorted after every insert or update. Sets are expected
//! to stay small enough that a flat `Vec` beats a tree.

use crate::error::Result;
use crate::storage::engine::Store;
use crate::storage::list::normalize_range;
use crate::storage::value::Value;
use bytes::Bytes;

/// One member of a sorted set with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    pub member: Bytes,
    pub score: f64,
}

/// Members ordered by `(score, member)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SortedSet {
    items: Vec<ScoredMember>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `member` or updates its score.
    ///
    /// Returns true if the member was newly inserted.
    pub fn add(&mut self, member: Bytes, score: f64) -> bool {
        let inserted = match self.items.iter_mut().find(|item| item.member == member) {
            Some(existing) => {
                existing.score = score;
                false
            }
            None => {
                self.items.push(ScoredMember { member, score });
                true
            }
        };

        self.items.sort_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then_with(|| a.member.cmp(&b.member))
        });
        inserted
    }

    /// 0-based ascending position of `member`.
    pub fn rank(&self, member: &[u8]) -> Option<usize> {
        self.items.iter().position(|item| item.member == member)
    }

    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.items
            .iter()
            .find(|item| item.member == member)
            .map(|item| item.score)
    }

    /// Members between `start` and `stop` inclusive, with list range rules.
    pub fn range(&self, start: i64, stop: i64) -> &[ScoredMember] {
        match normalize_range(self.items.len(), start, stop) {
            Some((start, stop)) => &self.items[start..=stop],
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One element of a `ZRANGE` reply.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeItem {
    Member(Bytes),
    Score(f64),
}

// ============================================================================
// Store operations
// ============================================================================

impl Store {
    /// Adds or updates members, creating the set if needed.
    ///
    /// Returns the number of members that were newly inserted.
    pub fn zadd(&self, key: Bytes, members: Vec<(Bytes, f64)>) -> Result<usize> {
        self.write(&key, |ks| {
            let set = ks
                .values
                .entry(key.clone())
                .or_insert_with(|| Value::SortedSet(SortedSet::new()))
                .as_sorted_set_mut()?;

            let mut inserted = 0;
            for (member, score) in members {
                if set.add(member, score) {
                    inserted += 1;
                }
            }
            Ok(inserted)
        })
    }

    /// Members by ascending rank. With `with_scores`, each member is followed
    /// by its score. A missing key yields an empty range.
    pub fn zrange(
        &self,
        key: &[u8],
        start: i64,
        stop: i64,
        with_scores: bool,
    ) -> Result<Vec<RangeItem>> {
        self.read(key, |ks| {
            let Some(value) = ks.values.get(key) else {
                return Ok(Vec::new());
            };

            let mut items = Vec::new();
            for entry in value.as_sorted_set()?.range(start, stop) {
                items.push(RangeItem::Member(entry.member.clone()));
                if with_scores {
                    items.push(RangeItem::Score(entry.score));
                }
            }
            Ok(items)
        })
    }

    /// Ascending rank of `member`, or `None` if the key or member is missing.
    pub fn zrank(&self, key: &[u8], member: &[u8]) -> Result<Option<usize>> {
        self.read(key, |ks| match ks.values.get(key) {
            Some(value) => Ok(value.as_sorted_set()?.rank(member)),
            None => Ok(None),
        })
    }
}
