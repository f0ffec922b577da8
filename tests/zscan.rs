use rankset::{Ascending, Error, ZSet};

fn m(name: &str) -> String {
    name.to_owned()
}

fn abc() -> ZSet<String, Ascending> {
    let mut set = ZSet::strings(Ascending);
    set.add(1, m("a"));
    set.add(2, m("b"));
    set.add(3, m("c"));
    set
}

#[test]
fn scan_visits_every_entry_in_order() {
    let set = abc();
    let mut scan = set.scan();
    let mut seen = Vec::new();
    while scan.has_next() {
        let entry = scan.next(&set).unwrap();
        seen.push((entry.member, entry.score));
    }
    assert_eq!(seen, [(m("a"), 1), (m("b"), 2), (m("c"), 3)]);
    assert_eq!(scan.next(&set).unwrap_err(), Error::Exhausted);
}

#[test]
fn scan_from_offset_skips_ahead() {
    let set = abc();
    let mut scan = set.scan_from(1);
    assert_eq!(scan.next(&set).unwrap().member, m("b"));

    let mut past_end = set.scan_from(3);
    assert!(!past_end.has_next());
    assert_eq!(past_end.next(&set).unwrap_err(), Error::Exhausted);

    let mut negative = set.scan_from(-5);
    assert_eq!(negative.next(&set).unwrap().member, m("a"));
}

#[test]
fn external_mutation_fails_the_cursor() {
    let mut set = abc();
    let mut scan = set.scan();
    assert_eq!(scan.next(&set).unwrap().member, m("a"));

    set.remove(&m("c"));
    assert_eq!(scan.next(&set).unwrap_err(), Error::ConcurrentModification);
    assert_eq!(
        scan.remove(&mut set).unwrap_err(),
        Error::ConcurrentModification
    );
}

#[test]
fn add_also_fails_the_cursor() {
    let mut set = abc();
    let mut scan = set.scan();
    scan.next(&set).unwrap();
    set.add(9, m("z"));
    assert_eq!(scan.next(&set).unwrap_err(), Error::ConcurrentModification);
}

#[test]
fn noop_add_does_not_fail_the_cursor() {
    let mut set = abc();
    let mut scan = set.scan();
    scan.next(&set).unwrap();
    // Same handler-equal score: no mutation happens.
    set.add(1, m("a"));
    assert_eq!(scan.next(&set).unwrap().member, m("b"));
}

#[test]
fn cursor_remove_deletes_and_rearms() {
    let mut set = abc();
    let mut scan = set.scan();

    assert_eq!(scan.remove(&mut set).unwrap_err(), Error::RemoveWithoutNext);

    scan.next(&set).unwrap();
    scan.remove(&mut set).unwrap();
    assert_eq!(set.score(&m("a")), None);
    assert_eq!(set.len(), 2);
    set.check_invariants_for_test();

    // Removing twice for one yielded entry is an error.
    assert_eq!(scan.remove(&mut set).unwrap_err(), Error::RemoveWithoutNext);

    // The cursor keeps working after its own removal.
    assert_eq!(scan.next(&set).unwrap().member, m("b"));
    scan.remove(&mut set).unwrap();
    assert_eq!(scan.next(&set).unwrap().member, m("c"));
    scan.remove(&mut set).unwrap();
    assert!(set.is_empty());
    set.check_invariants_for_test();
}

#[test]
fn iter_reads_without_consuming() {
    let set = abc();
    let first: Vec<i64> = set.iter().map(|(_, s)| s).collect();
    let second: Vec<i64> = set.iter().map(|(_, s)| s).collect();
    assert_eq!(first, second);
    assert_eq!(first, [1, 2, 3]);
}

#[test]
fn dump_lists_entries_with_ranks() {
    let set = abc();
    let dump = set.dump();
    assert!(dump.starts_with('['), "{dump}");
    assert!(dump.contains("rank: 0"), "{dump}");
    assert!(dump.contains("\"b\""), "{dump}");
    assert!(dump.contains("score: 3"), "{dump}");

    let empty = ZSet::strings(Ascending);
    assert_eq!(empty.dump(), "[]");
}
