use std::cmp::Ordering;
use std::hash::Hash;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;

use crate::handler::ScoreHandler;
use crate::range::{RangeSpec, ScoreRange};
use crate::zset::FastHashMap;

pub(crate) const MAX_LEVEL: usize = 32;
const LEVEL_P: f64 = 0.25;

// Arena slot of the header sentinel. The header is never freed, so forward
// pointers to slot 0 cannot occur.
const HEAD: usize = 0;

pub(crate) type MemberCmp<K> = Box<dyn Fn(&K, &K) -> Ordering>;

/// `span` counts level-0 steps to `forward` (1 when adjacent); with
/// `forward == None` it counts steps to the end of the list. Spans are
/// kept exact in both cases.
#[derive(Clone, Copy, Debug)]
struct Level {
    forward: Option<usize>,
    span: usize,
}

struct Node<K> {
    /// `None` only for the header sentinel.
    member: Option<K>,
    score: i64,
    levels: SmallVec<[Level; 2]>,
    backward: Option<usize>,
}

impl<K> Node<K> {
    fn key(&self) -> &K {
        self.member
            .as_ref()
            .expect("header sentinel carries no member")
    }
}

/// Span-augmented skip list ordered by `(score, member)` under the score
/// handler and member comparator. Nodes live in a slot arena with a free
/// list; links are arena indices. Ranks are 1-based internally: the header
/// occupies virtual rank 0.
pub(crate) struct SkipList<K, H> {
    nodes: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    tail: Option<usize>,
    level: usize,
    len: usize,
    epoch: u64,
    rng: SmallRng,
    cmp: MemberCmp<K>,
    handler: H,
}

impl<K, H: ScoreHandler> SkipList<K, H> {
    pub(crate) fn new(cmp: MemberCmp<K>, handler: H) -> Self {
        let mut levels = SmallVec::with_capacity(MAX_LEVEL);
        for _ in 0..MAX_LEVEL {
            levels.push(Level {
                forward: None,
                span: 0,
            });
        }
        let header = Node {
            member: None,
            score: 0,
            levels,
            backward: None,
        };
        Self {
            nodes: vec![Some(header)],
            free: Vec::new(),
            tail: None,
            level: 1,
            len: 0,
            epoch: 0,
            rng: SmallRng::from_entropy(),
            cmp,
            handler,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    #[inline]
    pub(crate) fn first(&self) -> Option<usize> {
        self.node(HEAD).levels[0].forward
    }

    #[inline]
    pub(crate) fn last(&self) -> Option<usize> {
        self.tail
    }

    #[inline]
    pub(crate) fn forward(&self, idx: usize) -> Option<usize> {
        self.node(idx).levels[0].forward
    }

    #[inline]
    pub(crate) fn backward(&self, idx: usize) -> Option<usize> {
        self.node(idx).backward
    }

    #[inline]
    pub(crate) fn entry(&self, idx: usize) -> (&K, i64) {
        let node = self.node(idx);
        (node.key(), node.score)
    }

    #[inline]
    pub(crate) fn score_compare(&self, a: i64, b: i64) -> Ordering {
        self.handler.compare(a, b)
    }

    #[inline]
    pub(crate) fn sum(&self, a: i64, b: i64) -> i64 {
        self.handler.sum(a, b)
    }

    #[inline]
    fn node(&self, idx: usize) -> &Node<K> {
        self.nodes[idx].as_ref().expect("live node")
    }

    #[inline]
    fn node_mut(&mut self, idx: usize) -> &mut Node<K> {
        self.nodes[idx].as_mut().expect("live node")
    }

    // Composite key: score first under the handler, member tie-breaks.
    fn compare_with(&self, idx: usize, score: i64, member: &K) -> Ordering {
        let node = self.node(idx);
        self.handler
            .compare(node.score, score)
            .then_with(|| (self.cmp)(node.key(), member))
    }

    #[inline]
    fn precedes(&self, idx: usize, score: i64, member: &K) -> bool {
        self.compare_with(idx, score, member) == Ordering::Less
    }

    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < MAX_LEVEL && self.rng.gen::<f64>() < LEVEL_P {
            level += 1;
        }
        level
    }

    fn alloc(&mut self, member: K, score: i64, level: usize) -> usize {
        let mut levels = SmallVec::with_capacity(level);
        for _ in 0..level {
            levels.push(Level {
                forward: None,
                span: 0,
            });
        }
        let node = Node {
            member: Some(member),
            score,
            levels,
            backward: None,
        };
        match self.free.pop() {
            Some(idx) => {
                debug_assert!(self.nodes[idx].is_none(), "free slot must be vacant");
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    /// The member must not already be present; the owning container checks
    /// its hash index before calling.
    pub(crate) fn insert(&mut self, score: i64, member: K) {
        let level = self.random_level();
        self.insert_at_level(score, member, level);
    }

    fn insert_at_level(&mut self, score: i64, member: K, level: usize) {
        let mut update = [HEAD; MAX_LEVEL];
        let mut rank = [0usize; MAX_LEVEL];

        // Descend, recording per level the landing node and the cumulative
        // level-0 rank crossed to reach it.
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            rank[i] = if i == self.level - 1 { 0 } else { rank[i + 1] };
            while let Some(fwd) = self.node(x).levels[i].forward {
                if self.precedes(fwd, score, &member) {
                    rank[i] += self.node(x).levels[i].span;
                    x = fwd;
                } else {
                    break;
                }
            }
            update[i] = x;
        }

        if level > self.level {
            // Levels the list has never used: the header's pointer there
            // spans the whole list until the new node splits it.
            for i in self.level..level {
                rank[i] = 0;
                update[i] = HEAD;
                self.node_mut(HEAD).levels[i].span = self.len;
            }
            self.level = level;
        }

        let new_idx = self.alloc(member, score, level);
        for i in 0..level {
            let (pred_fwd, pred_span) = {
                let pred = &self.node(update[i]).levels[i];
                (pred.forward, pred.span)
            };
            // rank[0] - rank[i] is the level-0 distance from update[i] to
            // the new node's predecessor; the old span splits there.
            {
                let node = self.node_mut(new_idx);
                node.levels[i].forward = pred_fwd;
                node.levels[i].span = pred_span - (rank[0] - rank[i]);
            }
            let pred = self.node_mut(update[i]);
            pred.levels[i].forward = Some(new_idx);
            pred.levels[i].span = (rank[0] - rank[i]) + 1;
        }
        // Untouched higher levels now skip one more node.
        for i in level..self.level {
            self.node_mut(update[i]).levels[i].span += 1;
        }

        self.node_mut(new_idx).backward = (update[0] != HEAD).then_some(update[0]);
        match self.node(new_idx).levels[0].forward {
            Some(next) => self.node_mut(next).backward = Some(new_idx),
            None => self.tail = Some(new_idx),
        }

        self.len += 1;
        self.epoch += 1;
    }

    pub(crate) fn delete(&mut self, score: i64, member: &K) -> bool {
        let mut update = [HEAD; MAX_LEVEL];
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(fwd) = self.node(x).levels[i].forward {
                if self.precedes(fwd, score, member) {
                    x = fwd;
                } else {
                    break;
                }
            }
            update[i] = x;
        }
        // Ties share a score, so both score and member must match.
        let Some(target) = self.node(x).levels[0].forward else {
            return false;
        };
        if self.handler.compare(self.node(target).score, score) == Ordering::Equal
            && (self.cmp)(self.node(target).key(), member) == Ordering::Equal
        {
            self.unlink(target, &update);
            true
        } else {
            false
        }
    }

    fn unlink(&mut self, target: usize, update: &[usize; MAX_LEVEL]) -> Node<K> {
        let target_level = self.node(target).levels.len();
        for i in 0..self.level {
            let pred_fwd = self.node(update[i]).levels[i].forward;
            if pred_fwd == Some(target) {
                let absorbed = self.node(target).levels[i];
                let pred = self.node_mut(update[i]);
                pred.levels[i].span = pred.levels[i].span + absorbed.span - 1;
                pred.levels[i].forward = absorbed.forward;
            } else {
                self.node_mut(update[i]).levels[i].span -= 1;
            }
        }

        match self.node(target).levels[0].forward {
            Some(next) => {
                let back = self.node(target).backward;
                self.node_mut(next).backward = back;
            }
            None => self.tail = self.node(target).backward,
        }

        // Only removing a node of the top level can strand empty levels.
        if target_level == self.level {
            while self.level > 1 && self.node(HEAD).levels[self.level - 1].forward.is_none() {
                self.level -= 1;
            }
        }

        self.len -= 1;
        self.epoch += 1;
        self.free.push(target);
        self.nodes[target].take().expect("live node")
    }

    /// 1-based rank of `(score, member)`, or 0 when absent. The walk may
    /// land on the target at any level.
    pub(crate) fn rank_of(&self, score: i64, member: &K) -> usize {
        let mut rank = 0;
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(fwd) = self.node(x).levels[i].forward {
                if self.compare_with(fwd, score, member) != Ordering::Greater {
                    rank += self.node(x).levels[i].span;
                    x = fwd;
                } else {
                    break;
                }
            }
            if x != HEAD && (self.cmp)(self.node(x).key(), member) == Ordering::Equal {
                return rank;
            }
        }
        0
    }

    pub(crate) fn node_by_rank(&self, rank: usize) -> Option<usize> {
        debug_assert!(rank >= 1, "internal ranks are 1-based");
        let mut traversed = 0;
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(fwd) = self.node(x).levels[i].forward {
                if traversed + self.node(x).levels[i].span <= rank {
                    traversed += self.node(x).levels[i].span;
                    x = fwd;
                } else {
                    break;
                }
            }
            if traversed == rank {
                return Some(x);
            }
        }
        None
    }

    pub(crate) fn normalize(&self, spec: RangeSpec) -> ScoreRange {
        if self.handler.compare(spec.start, spec.end) != Ordering::Greater {
            ScoreRange {
                min: spec.start,
                minex: spec.start_exclusive,
                max: spec.end,
                maxex: spec.end_exclusive,
            }
        } else {
            ScoreRange {
                min: spec.end,
                minex: spec.end_exclusive,
                max: spec.start,
                maxex: spec.start_exclusive,
            }
        }
    }

    pub(crate) fn gte_min(&self, value: i64, range: &ScoreRange) -> bool {
        if range.minex {
            self.handler.compare(value, range.min) == Ordering::Greater
        } else {
            self.handler.compare(value, range.min) != Ordering::Less
        }
    }

    pub(crate) fn lte_max(&self, value: i64, range: &ScoreRange) -> bool {
        if range.maxex {
            self.handler.compare(value, range.max) == Ordering::Less
        } else {
            self.handler.compare(value, range.max) != Ordering::Greater
        }
    }

    // Lets range queries bail out before descending.
    fn intersects(&self, range: &ScoreRange) -> bool {
        if self.handler.compare(range.min, range.max) == Ordering::Equal
            && (range.minex || range.maxex)
        {
            return false;
        }
        let Some(tail) = self.tail else {
            return false;
        };
        if !self.gte_min(self.node(tail).score, range) {
            return false;
        }
        let Some(first) = self.node(HEAD).levels[0].forward else {
            return false;
        };
        self.lte_max(self.node(first).score, range)
    }

    pub(crate) fn first_in_range(&self, range: &ScoreRange) -> Option<usize> {
        if !self.intersects(range) {
            return None;
        }
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            // Skip forward while still below the lower bound.
            while let Some(fwd) = self.node(x).levels[i].forward {
                if !self.gte_min(self.node(fwd).score, range) {
                    x = fwd;
                } else {
                    break;
                }
            }
        }
        let first = self.node(x).levels[0].forward?;
        self.lte_max(self.node(first).score, range).then_some(first)
    }

    pub(crate) fn last_in_range(&self, range: &ScoreRange) -> Option<usize> {
        if !self.intersects(range) {
            return None;
        }
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            // Skip forward while still within the upper bound.
            while let Some(fwd) = self.node(x).levels[i].forward {
                if self.lte_max(self.node(fwd).score, range) {
                    x = fwd;
                } else {
                    break;
                }
            }
        }
        if x == HEAD {
            return None;
        }
        self.gte_min(self.node(x).score, range).then_some(x)
    }

    /// Deletions walk level 0 left to right; the predecessor vector stays
    /// valid because every unlink performs the full cross-level fixup.
    pub(crate) fn delete_range_by_score(
        &mut self,
        range: &ScoreRange,
        dict: &mut FastHashMap<K, i64>,
    ) -> usize
    where
        K: Hash + Eq,
    {
        let mut update = [HEAD; MAX_LEVEL];
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(fwd) = self.node(x).levels[i].forward {
                if !self.gte_min(self.node(fwd).score, range) {
                    x = fwd;
                } else {
                    break;
                }
            }
            update[i] = x;
        }

        let mut removed = 0;
        let mut cur = self.node(x).levels[0].forward;
        while let Some(idx) = cur {
            if !self.lte_max(self.node(idx).score, range) {
                break;
            }
            cur = self.node(idx).levels[0].forward;
            let node = self.unlink(idx, &update);
            let stale = dict.remove(node.key());
            debug_assert!(stale.is_some(), "ordered index held an unmapped member");
            removed += 1;
        }
        removed
    }

    /// `start` and `end` are 1-based, both inclusive.
    pub(crate) fn delete_range_by_rank(
        &mut self,
        start: usize,
        end: usize,
        dict: &mut FastHashMap<K, i64>,
    ) -> usize
    where
        K: Hash + Eq,
    {
        let mut update = [HEAD; MAX_LEVEL];
        let mut traversed = 0;
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(fwd) = self.node(x).levels[i].forward {
                if traversed + self.node(x).levels[i].span < start {
                    traversed += self.node(x).levels[i].span;
                    x = fwd;
                } else {
                    break;
                }
            }
            update[i] = x;
        }

        traversed += 1;
        let mut removed = 0;
        let mut cur = self.node(x).levels[0].forward;
        while let Some(idx) = cur {
            if traversed > end {
                break;
            }
            cur = self.node(idx).levels[0].forward;
            let node = self.unlink(idx, &update);
            let stale = dict.remove(node.key());
            debug_assert!(stale.is_some(), "ordered index held an unmapped member");
            removed += 1;
            traversed += 1;
        }
        removed
    }

    pub(crate) fn delete_by_rank(
        &mut self,
        rank: usize,
        dict: &mut FastHashMap<K, i64>,
    ) -> Option<(K, i64)>
    where
        K: Hash + Eq,
    {
        let mut update = [HEAD; MAX_LEVEL];
        let mut traversed = 0;
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(fwd) = self.node(x).levels[i].forward {
                if traversed + self.node(x).levels[i].span < rank {
                    traversed += self.node(x).levels[i].span;
                    x = fwd;
                } else {
                    break;
                }
            }
            update[i] = x;
        }

        let target = self.node(x).levels[0].forward?;
        let node = self.unlink(target, &update);
        let member = node.member.expect("header is never unlinked");
        let stale = dict.remove(&member);
        debug_assert!(stale.is_some(), "ordered index held an unmapped member");
        Some((member, node.score))
    }

    /// Exhaustive structural check used by tests: ordering, backward
    /// chain, span exactness at every level, arena accounting.
    pub(crate) fn check_invariants(&self) {
        assert!((1..=MAX_LEVEL).contains(&self.level), "level out of bounds");
        for i in self.level..MAX_LEVEL {
            assert!(
                self.node(HEAD).levels[i].forward.is_none(),
                "header linked above the list level"
            );
        }
        assert!(
            self.level == 1 || self.node(HEAD).levels[self.level - 1].forward.is_some(),
            "list level exceeds the highest live node"
        );

        let mut count = 0;
        let mut prev: Option<usize> = None;
        let mut cur = self.node(HEAD).levels[0].forward;
        while let Some(idx) = cur {
            let node = self.node(idx);
            if let Some(p) = prev {
                let pred = self.node(p);
                let order = self
                    .handler
                    .compare(pred.score, node.score)
                    .then_with(|| (self.cmp)(pred.key(), node.key()));
                assert_eq!(order, Ordering::Less, "level-0 order violated");
            }
            assert_eq!(node.backward, prev, "backward chain broken");
            let node_level = node.levels.len();
            assert!(
                (1..=self.level).contains(&node_level),
                "node level outside [1, list level]"
            );
            prev = cur;
            count += 1;
            cur = node.levels[0].forward;
        }
        assert_eq!(count, self.len, "length disagrees with level-0 traversal");
        assert_eq!(self.tail, prev, "tail does not reference the last node");

        let live = self.nodes.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(live, self.len + 1, "arena live count disagrees with length");
        assert_eq!(
            self.free.len() + live,
            self.nodes.len(),
            "free list disagrees with arena"
        );

        let mut checked = Some(HEAD);
        while let Some(idx) = checked {
            let node = self.node(idx);
            let top = if idx == HEAD { self.level } else { node.levels.len() };
            for i in 0..top {
                let level = node.levels[i];
                if let Some(fwd) = level.forward {
                    assert!(
                        self.node(fwd).levels.len() > i,
                        "forward target not linked at this level"
                    );
                }
                assert_eq!(
                    level.span,
                    self.level0_steps(idx, level.forward),
                    "span disagrees with level-0 distance"
                );
            }
            checked = node.levels[0].forward;
        }
    }

    // Exact span a pointer from `from` to `to` must carry: the level-0
    // distance to `to`, or the number of nodes after `from` when `to` is
    // the end of the list.
    fn level0_steps(&self, from: usize, to: Option<usize>) -> usize {
        let mut steps = 0;
        let mut cur = self.node(from).levels[0].forward;
        while cur != to {
            let idx = cur.expect("span walk ran past the end");
            steps += 1;
            cur = self.node(idx).levels[0].forward;
        }
        match to {
            Some(_) => steps + 1,
            None => steps,
        }
    }
}
