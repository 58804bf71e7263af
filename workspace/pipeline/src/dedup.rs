//! Earliest-wins deduplication.
//!
//! Rows sharing a key are ordered by `created_at`, ties broken by primary key
//! according to the configured [`TieBreak`]; the first row survives and every
//! other row is slated for deletion.

use chrono::NaiveDateTime;
use common::TieBreak;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

/// A row taking part in deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<K> {
    pub id: i32,
    pub key: K,
    pub created_at: NaiveDateTime,
}

impl<K> Candidate<K> {
    pub fn new(id: i32, key: K, created_at: NaiveDateTime) -> Self {
        Self { id, key, created_at }
    }
}

/// Outcome of grouping candidates by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupPlan<K> {
    /// Surviving row per key.
    pub survivors: Vec<Candidate<K>>,
    /// Ids of rows to delete, ascending.
    pub discarded: Vec<i32>,
}

impl<K> DedupPlan<K> {
    pub fn is_noop(&self) -> bool {
        self.discarded.is_empty()
    }
}

/// Orders two rows by precedence: the `Less` one wins.
pub fn precedence<K>(tie_break: TieBreak, a: &Candidate<K>, b: &Candidate<K>) -> Ordering {
    a.created_at.cmp(&b.created_at).then_with(|| match tie_break {
        TieBreak::LowestId => a.id.cmp(&b.id),
        TieBreak::HighestId => b.id.cmp(&a.id),
    })
}

/// Groups `candidates` by key and keeps the earliest row of every group.
pub fn earliest_wins<K, I>(candidates: I, tie_break: TieBreak) -> DedupPlan<K>
where
    K: Hash + Eq + Clone,
    I: IntoIterator<Item = Candidate<K>>,
{
    let mut groups: HashMap<K, Vec<Candidate<K>>> = HashMap::new();
    for candidate in candidates {
        groups.entry(candidate.key.clone()).or_default().push(candidate);
    }

    let mut survivors = Vec::with_capacity(groups.len());
    let mut discarded = Vec::new();
    for (_, mut group) in groups {
        group.sort_by(|a, b| precedence(tie_break, a, b));
        let mut rows = group.into_iter();
        if let Some(winner) = rows.next() {
            survivors.push(winner);
        }
        discarded.extend(rows.map(|row| row.id));
    }

    survivors.sort_by_key(|s| s.id);
    discarded.sort_unstable();

    DedupPlan {
        survivors,
        discarded,
    }
}

/// Number of rows that would be discarded, without building a plan.
pub fn surplus_count<K, I>(keys: I) -> i64
where
    K: Hash + Eq,
    I: IntoIterator<Item = K>,
{
    let mut seen: HashMap<K, i64> = HashMap::new();
    for key in keys {
        *seen.entry(key).or_insert(0) += 1;
    }
    seen.values().map(|count| count - 1).sum()
}
