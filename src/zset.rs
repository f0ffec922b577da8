use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::{BuildHasherDefault, Hash};

use rustc_hash::FxHasher;

use crate::error::Error;
use crate::handler::ScoreHandler;
use crate::range::RangeSpec;
use crate::scan::{Iter, Scan};
use crate::skiplist::SkipList;

pub type FastHashMap<K, V> = hashbrown::HashMap<K, V, BuildHasherDefault<FxHasher>>;

/// A `(member, score)` pair returned by queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry<K> {
    pub member: K,
    pub score: i64,
}

/// A sorted set of unique members with `i64` scores: a hash map from
/// member to score plus a skip list ordered by `(score, member)` under
/// the caller's [`ScoreHandler`] and member comparator. The comparator
/// must return `Equal` only for the same member and agree with the
/// member's `Hash`/`Eq`. Ranks are 0-based; negative rank arguments
/// count from the end. Single-threaded.
pub struct ZSet<K, H> {
    pub(crate) dict: FastHashMap<K, i64>,
    pub(crate) list: SkipList<K, H>,
}

impl<K, H> ZSet<K, H>
where
    K: Hash + Eq + Clone,
    H: ScoreHandler,
{
    pub fn new(handler: H) -> Self
    where
        K: Ord,
    {
        Self::with_comparator(|a: &K, b: &K| a.cmp(b), handler)
    }

    pub fn with_comparator<C>(cmp: C, handler: H) -> Self
    where
        C: Fn(&K, &K) -> Ordering + 'static,
    {
        Self {
            dict: FastHashMap::default(),
            list: SkipList::new(Box::new(cmp), handler),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.len() == 0
    }

    pub fn add(&mut self, score: i64, member: K) {
        use hashbrown::hash_map::Entry as MapEntry;
        match self.dict.entry(member) {
            MapEntry::Occupied(mut occ) => {
                let old = *occ.get();
                if self.list.score_compare(old, score) != Ordering::Equal {
                    *occ.get_mut() = score;
                    let member = occ.key().clone();
                    let removed = self.list.delete(old, &member);
                    debug_assert!(removed, "mapped member missing from ordered index");
                    self.list.insert(score, member);
                }
            }
            MapEntry::Vacant(vac) => {
                let member = vac.key().clone();
                vac.insert(score);
                self.list.insert(score, member);
            }
        }
    }

    pub fn add_if_absent(&mut self, score: i64, member: K) -> bool {
        use hashbrown::hash_map::Entry as MapEntry;
        match self.dict.entry(member) {
            MapEntry::Occupied(_) => false,
            MapEntry::Vacant(vac) => {
                let member = vac.key().clone();
                vac.insert(score);
                self.list.insert(score, member);
                true
            }
        }
    }

    /// An absent member starts from `delta`. Returns the stored score.
    pub fn incr_by(&mut self, delta: i64, member: K) -> i64 {
        let score = match self.dict.get(&member) {
            Some(&old) => self.list.sum(old, delta),
            None => delta,
        };
        self.add(score, member);
        score
    }

    pub fn remove(&mut self, member: &K) -> Option<i64> {
        let old = self.dict.remove(member)?;
        let removed = self.list.delete(old, member);
        debug_assert!(removed, "mapped member missing from ordered index");
        Some(old)
    }

    pub fn remove_range_by_score(&mut self, spec: RangeSpec) -> usize {
        let range = self.list.normalize(spec);
        self.list.delete_range_by_score(&range, &mut self.dict)
    }

    pub fn remove_range_by_score_inclusive(&mut self, start: i64, end: i64) -> usize {
        self.remove_range_by_score(RangeSpec::inclusive(start, end))
    }

    pub fn remove_by_rank(&mut self, rank: isize) -> Option<Entry<K>> {
        if rank < 0 || rank as usize >= self.list.len() {
            return None;
        }
        self.list
            .delete_by_rank(rank as usize + 1, &mut self.dict)
            .map(|(member, score)| Entry { member, score })
    }

    pub fn pop_first(&mut self) -> Option<Entry<K>> {
        self.remove_by_rank(0)
    }

    pub fn pop_last(&mut self) -> Option<Entry<K>> {
        self.remove_by_rank(self.list.len() as isize - 1)
    }

    pub fn remove_range_by_rank(&mut self, start: isize, end: isize) -> usize {
        let len = self.list.len();
        let Some((start, end)) = normalize_rank_range(start, end, len) else {
            return 0;
        };
        self.list
            .delete_range_by_rank(start + 1, end + 1, &mut self.dict)
    }

    /// Keep only the first `count` entries. Returns the count removed.
    pub fn limit(&mut self, count: usize) -> usize {
        let len = self.list.len();
        if len <= count {
            return 0;
        }
        self.list
            .delete_range_by_rank(count + 1, len, &mut self.dict)
    }

    /// Keep only the last `count` entries. Returns the count removed.
    pub fn rev_limit(&mut self, count: usize) -> usize {
        let len = self.list.len();
        if len <= count {
            return 0;
        }
        self.list
            .delete_range_by_rank(1, len - count, &mut self.dict)
    }

    pub fn score(&self, member: &K) -> Option<i64> {
        self.dict.get(member).copied()
    }

    pub fn contains(&self, member: &K) -> bool {
        self.dict.contains_key(member)
    }

    pub fn rank(&self, member: &K) -> Option<usize> {
        let score = *self.dict.get(member)?;
        let rank = self.list.rank_of(score, member);
        debug_assert!(rank > 0, "mapped member missing from ordered index");
        Some(rank - 1)
    }

    pub fn rev_rank(&self, member: &K) -> Option<usize> {
        let score = *self.dict.get(member)?;
        let rank = self.list.rank_of(score, member);
        debug_assert!(rank > 0, "mapped member missing from ordered index");
        Some(self.list.len() - rank)
    }

    pub fn member_by_rank(&self, rank: isize) -> Option<Entry<K>> {
        if rank < 0 || rank as usize >= self.list.len() {
            return None;
        }
        let idx = self.list.node_by_rank(rank as usize + 1)?;
        let (member, score) = self.list.entry(idx);
        Some(Entry {
            member: member.clone(),
            score,
        })
    }

    pub fn rev_member_by_rank(&self, rank: isize) -> Option<Entry<K>> {
        if rank < 0 || rank as usize >= self.list.len() {
            return None;
        }
        let idx = self.list.node_by_rank(self.list.len() - rank as usize)?;
        let (member, score) = self.list.entry(idx);
        Some(Entry {
            member: member.clone(),
            score,
        })
    }

    pub fn range_by_score(&self, spec: RangeSpec) -> Vec<Entry<K>> {
        self.range_by_score_internal(spec, 0, -1, false)
    }

    pub fn rev_range_by_score(&self, spec: RangeSpec) -> Vec<Entry<K>> {
        self.range_by_score_internal(spec, 0, -1, true)
    }

    pub fn range_by_score_inclusive(&self, start: i64, end: i64) -> Vec<Entry<K>> {
        self.range_by_score(RangeSpec::inclusive(start, end))
    }

    pub fn rev_range_by_score_inclusive(&self, start: i64, end: i64) -> Vec<Entry<K>> {
        self.rev_range_by_score(RangeSpec::inclusive(start, end))
    }

    /// Skips `offset` entries and yields at most `limit` (negative means
    /// unlimited). A negative `offset` is an error.
    pub fn range_by_score_with_options(
        &self,
        spec: RangeSpec,
        offset: isize,
        limit: isize,
        reverse: bool,
    ) -> Result<Vec<Entry<K>>, Error> {
        if offset < 0 {
            return Err(Error::NegativeOffset(offset));
        }
        Ok(self.range_by_score_internal(spec, offset as usize, limit, reverse))
    }

    fn range_by_score_internal(
        &self,
        spec: RangeSpec,
        mut offset: usize,
        limit: isize,
        reverse: bool,
    ) -> Vec<Entry<K>> {
        let range = self.list.normalize(spec);
        let mut node = if reverse {
            self.list.last_in_range(&range)
        } else {
            self.list.first_in_range(&range)
        };

        // Skip offset entries blindly; the collection loop re-checks the
        // boundary on every step anyway.
        while let Some(idx) = node {
            if offset == 0 {
                break;
            }
            offset -= 1;
            node = self.step(idx, reverse);
        }

        let mut remaining = if limit < 0 { usize::MAX } else { limit as usize };
        let mut out = Vec::new();
        while let Some(idx) = node {
            if remaining == 0 {
                break;
            }
            let (member, score) = self.list.entry(idx);
            let in_range = if reverse {
                self.list.gte_min(score, &range)
            } else {
                self.list.lte_max(score, &range)
            };
            if !in_range {
                break;
            }
            out.push(Entry {
                member: member.clone(),
                score,
            });
            remaining -= 1;
            node = self.step(idx, reverse);
        }
        out
    }

    pub fn range_by_rank(&self, start: isize, end: isize) -> Vec<Entry<K>> {
        self.range_by_rank_internal(start, end, false)
    }

    pub fn rev_range_by_rank(&self, start: isize, end: isize) -> Vec<Entry<K>> {
        self.range_by_rank_internal(start, end, true)
    }

    fn range_by_rank_internal(&self, start: isize, end: isize, reverse: bool) -> Vec<Entry<K>> {
        let len = self.list.len();
        let Some((start, end)) = normalize_rank_range(start, end, len) else {
            return Vec::new();
        };
        let mut span = end - start + 1;

        // Rank 0 starts at an end of the chain; skip the log(n) descent.
        let node = if reverse {
            if start > 0 {
                self.list.node_by_rank(len - start)
            } else {
                self.list.last()
            }
        } else if start > 0 {
            self.list.node_by_rank(start + 1)
        } else {
            self.list.first()
        };

        let mut out = Vec::with_capacity(span);
        let mut node = node;
        while let Some(idx) = node {
            if span == 0 {
                break;
            }
            span -= 1;
            let (member, score) = self.list.entry(idx);
            out.push(Entry {
                member: member.clone(),
                score,
            });
            node = self.step(idx, reverse);
        }
        out
    }

    /// Computed from the ranks of the boundary entries rather than by
    /// walking the range.
    pub fn count(&self, spec: RangeSpec) -> usize {
        let range = self.list.normalize(spec);
        let Some(first) = self.list.first_in_range(&range) else {
            return 0;
        };
        // A range with a first node always has a last node.
        let Some(last) = self.list.last_in_range(&range) else {
            return 0;
        };
        let (member, score) = self.list.entry(first);
        let first_rank = self.list.rank_of(score, member);
        let (member, score) = self.list.entry(last);
        let last_rank = self.list.rank_of(score, member);
        last_rank - first_rank + 1
    }

    pub fn count_inclusive(&self, start: i64, end: i64) -> usize {
        self.count(RangeSpec::inclusive(start, end))
    }

    pub fn scan(&self) -> Scan {
        self.scan_from(0)
    }

    /// Offsets `<= 0` start at the first entry; offsets at or past the end
    /// yield an exhausted cursor.
    pub fn scan_from(&self, offset: isize) -> Scan {
        let next = if offset <= 0 {
            self.list.first()
        } else if offset as usize >= self.list.len() {
            None
        } else {
            self.list.node_by_rank(offset as usize + 1)
        };
        Scan::new(next, self.list.epoch())
    }

    pub fn iter(&self) -> Iter<'_, K, H> {
        Iter::new(self)
    }

    #[inline]
    fn step(&self, idx: usize, reverse: bool) -> Option<usize> {
        if reverse {
            self.list.backward(idx)
        } else {
            self.list.forward(idx)
        }
    }

    /// Walks both indexes and asserts every structural invariant. Test
    /// support; O(n^2) in the worst case.
    pub fn check_invariants_for_test(&self) {
        self.list.check_invariants();
        assert_eq!(self.dict.len(), self.list.len(), "index sizes diverged");
        for (member, score) in self.iter() {
            assert_eq!(
                self.dict.get(member).copied(),
                Some(score),
                "indexes disagree on a member's score"
            );
        }
    }
}

impl<K, H> ZSet<K, H>
where
    K: Hash + Eq + Clone + Debug,
    H: ScoreHandler,
{
    pub fn dump(&self) -> String {
        use std::fmt::Write;
        let mut out = String::from("[");
        for (rank, (member, score)) in self.iter().enumerate() {
            if rank > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{{rank: {rank}, member: {member:?}, score: {score}}}");
        }
        out.push(']');
        out
    }
}

impl<H: ScoreHandler> ZSet<String, H> {
    pub fn strings(handler: H) -> Self {
        Self::new(handler)
    }
}

impl<H: ScoreHandler> ZSet<i64, H> {
    pub fn longs(handler: H) -> Self {
        Self::new(handler)
    }
}

impl<H: ScoreHandler> ZSet<i32, H> {
    pub fn ints(handler: H) -> Self {
        Self::new(handler)
    }
}

/// Clamp a 0-based, possibly negative rank pair to `[0, len)`; `None`
/// when the normalized range is empty.
fn normalize_rank_range(start: isize, end: isize, len: usize) -> Option<(usize, usize)> {
    let len = len as isize;
    let mut start = if start < 0 { start + len } else { start };
    if start < 0 {
        start = 0;
    }
    let mut end = if end < 0 { end + len } else { end };
    if end >= len {
        end = len - 1;
    }
    if start > end || start >= len {
        return None;
    }
    Some((start as usize, end as usize))
}
