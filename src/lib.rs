#![deny(clippy::uninlined_format_args, clippy::to_string_in_format_args)]

//! Sorted-set container with integer scores and O(log n) rank queries.
//!
//! A [`ZSet`] keeps a set of unique members, each with an `i64` score, in
//! two coupled indexes: a hash map from member to score for O(1) lookups,
//! and a span-augmented skip list ordered by `(score, member)` for rank
//! and range queries. Score ordering and addition are delegated to a
//! [`ScoreHandler`], so a set can just as well rank descending scores
//! without callers juggling reversed APIs.
//!
//! ```
//! use rankset::{Ascending, ZSet};
//!
//! let mut board = ZSet::strings(Ascending);
//! board.add(120, "alice".to_owned());
//! board.add(95, "bob".to_owned());
//! board.add(120, "carol".to_owned());
//!
//! assert_eq!(board.rank(&"bob".to_owned()), Some(0));
//! assert_eq!(board.member_by_rank(1).unwrap().member, "alice");
//! assert_eq!(board.len(), 3);
//! ```

pub use crate::{
    error::Error,
    handler::{Ascending, Descending, ScoreHandler, WrappingAscending},
    range::RangeSpec,
    scan::{Iter, Scan},
    zset::{Entry, FastHashMap, ZSet},
};

mod error;
mod handler;
mod range;
mod scan;
mod skiplist;
mod zset;
