use std::hash::Hash;

use crate::error::Error;
use crate::handler::ScoreHandler;
use crate::zset::{Entry, ZSet};

/// Detached cursor over a [`ZSet`], in list order. Holds no borrow of the
/// set, so entries can be removed mid-iteration; any mutation outside the
/// cursor's own `remove` fails subsequent calls with
/// [`Error::ConcurrentModification`]. Use only with the set that created it.
#[derive(Clone, Debug)]
pub struct Scan {
    next: Option<usize>,
    /// Entry yielded by the last `next`, cleared by `remove`.
    last: Option<usize>,
    epoch: u64,
}

impl Scan {
    pub(crate) fn new(next: Option<usize>, epoch: u64) -> Self {
        Self {
            next,
            last: None,
            epoch,
        }
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn next<K, H>(&mut self, set: &ZSet<K, H>) -> Result<Entry<K>, Error>
    where
        K: Hash + Eq + Clone,
        H: ScoreHandler,
    {
        if set.list.epoch() != self.epoch {
            return Err(Error::ConcurrentModification);
        }
        let idx = self.next.ok_or(Error::Exhausted)?;
        self.last = Some(idx);
        self.next = set.list.forward(idx);
        let (member, score) = set.list.entry(idx);
        Ok(Entry {
            member: member.clone(),
            score,
        })
    }

    pub fn remove<K, H>(&mut self, set: &mut ZSet<K, H>) -> Result<(), Error>
    where
        K: Hash + Eq + Clone,
        H: ScoreHandler,
    {
        let last = self.last.ok_or(Error::RemoveWithoutNext)?;
        if set.list.epoch() != self.epoch {
            return Err(Error::ConcurrentModification);
        }
        let (member, score) = {
            let (member, score) = set.list.entry(last);
            (member.clone(), score)
        };
        set.dict.remove(&member);
        let removed = set.list.delete(score, &member);
        debug_assert!(removed, "cursor entry missing from ordered index");
        self.last = None;
        self.epoch = set.list.epoch();
        Ok(())
    }
}

/// Borrowing iterator over `(member, score)` in list order.
pub struct Iter<'a, K, H> {
    set: &'a ZSet<K, H>,
    cur: Option<usize>,
}

impl<'a, K, H> Iter<'a, K, H>
where
    K: Hash + Eq + Clone,
    H: ScoreHandler,
{
    pub(crate) fn new(set: &'a ZSet<K, H>) -> Self {
        Self {
            set,
            cur: set.list.first(),
        }
    }
}

impl<'a, K, H> Iterator for Iter<'a, K, H>
where
    K: Hash + Eq + Clone,
    H: ScoreHandler,
{
    type Item = (&'a K, i64);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cur?;
        self.cur = self.set.list.forward(idx);
        let (member, score) = self.set.list.entry(idx);
        Some((member, score))
    }
}
