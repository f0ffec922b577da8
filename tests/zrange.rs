use rankset::{Ascending, Descending, Error, RangeSpec, ZSet};

fn m(name: &str) -> String {
    name.to_owned()
}

fn names(entries: &[rankset::Entry<String>]) -> Vec<&str> {
    entries.iter().map(|e| e.member.as_str()).collect()
}

fn abc() -> ZSet<String, Ascending> {
    let mut set = ZSet::strings(Ascending);
    set.add(2, m("a"));
    set.add(2, m("b"));
    set.add(3, m("c"));
    set
}

#[test]
fn range_by_score_inclusive_returns_whole_band() {
    let set = abc();
    let got = set.range_by_score_inclusive(2, 3);
    assert_eq!(names(&got), ["a", "b", "c"]);
    assert_eq!(got[0].score, 2);
    assert_eq!(got[2].score, 3);
}

#[test]
fn range_by_score_with_offset_and_reverse() {
    let set = abc();

    let fwd = set
        .range_by_score_with_options(RangeSpec::inclusive(2, 2), 1, -1, false)
        .unwrap();
    assert_eq!(names(&fwd), ["b"]);

    let rev = set
        .range_by_score_with_options(RangeSpec::inclusive(2, 2), 1, -1, true)
        .unwrap();
    assert_eq!(names(&rev), ["a"]);
}

#[test]
fn range_by_score_rejects_negative_offset() {
    let set = abc();
    let err = set
        .range_by_score_with_options(RangeSpec::inclusive(2, 3), -1, -1, false)
        .unwrap_err();
    assert_eq!(err, Error::NegativeOffset(-1));
}

#[test]
fn range_by_score_limit_truncates() {
    let set = abc();
    let got = set
        .range_by_score_with_options(RangeSpec::inclusive(2, 3), 0, 2, false)
        .unwrap();
    assert_eq!(names(&got), ["a", "b"]);

    let none = set
        .range_by_score_with_options(RangeSpec::inclusive(2, 3), 0, 0, false)
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn range_by_score_offset_past_range_is_empty() {
    let set = abc();
    let got = set
        .range_by_score_with_options(RangeSpec::inclusive(2, 3), 9, -1, false)
        .unwrap();
    assert!(got.is_empty());
}

#[test]
fn exclusive_bounds_trim_the_band() {
    let set = abc();
    assert_eq!(
        names(&set.range_by_score(RangeSpec::new(2, true, 3, false))),
        ["c"]
    );
    assert_eq!(
        names(&set.range_by_score(RangeSpec::new(2, false, 3, true))),
        ["a", "b"]
    );
    // Equal bounds with either end exclusive match nothing.
    assert!(set
        .range_by_score(RangeSpec::new(2, true, 2, false))
        .is_empty());
}

#[test]
fn range_bounds_swap_under_the_handler() {
    let set = abc();
    assert_eq!(names(&set.range_by_score_inclusive(3, 2)), ["a", "b", "c"]);

    let mut desc = ZSet::strings(Descending);
    desc.add(1, m("x"));
    desc.add(2, m("y"));
    desc.add(3, m("z"));
    // In descending handler order, 3 precedes 1.
    assert_eq!(names(&desc.range_by_score_inclusive(3, 1)), ["z", "y", "x"]);
    assert_eq!(names(&desc.range_by_score_inclusive(1, 3)), ["z", "y", "x"]);
}

#[test]
fn rev_range_by_score_walks_backward() {
    let set = abc();
    assert_eq!(
        names(&set.rev_range_by_score_inclusive(2, 3)),
        ["c", "b", "a"]
    );
    assert_eq!(
        names(&set.rev_range_by_score(RangeSpec::new(2, false, 3, true))),
        ["b", "a"]
    );
}

#[test]
fn range_by_rank_supports_negative_indices() {
    let set = abc();
    assert_eq!(names(&set.range_by_rank(0, -1)), ["a", "b", "c"]);
    assert_eq!(names(&set.range_by_rank(-2, -1)), ["b", "c"]);
    assert_eq!(names(&set.range_by_rank(1, 1)), ["b"]);
    assert_eq!(names(&set.range_by_rank(1, 99)), ["b", "c"]);
    assert!(set.range_by_rank(2, 1).is_empty());
    assert!(set.range_by_rank(5, 9).is_empty());
}

#[test]
fn rev_range_by_rank_counts_from_the_top() {
    let set = abc();
    assert_eq!(names(&set.rev_range_by_rank(0, -1)), ["c", "b", "a"]);
    assert_eq!(names(&set.rev_range_by_rank(0, 0)), ["c"]);
    assert_eq!(names(&set.rev_range_by_rank(-1, -1)), ["a"]);
}

#[test]
fn ranges_on_empty_set_are_empty() {
    let set = ZSet::strings(Ascending);
    assert!(set.range_by_rank(0, -1).is_empty());
    assert!(set.range_by_score_inclusive(i64::MIN, i64::MAX).is_empty());
    assert!(set.rev_range_by_rank(0, -1).is_empty());
}

#[test]
fn range_outside_the_score_band_is_empty() {
    let set = abc();
    assert!(set.range_by_score_inclusive(10, 20).is_empty());
    assert!(set.range_by_score_inclusive(-5, 1).is_empty());
}
