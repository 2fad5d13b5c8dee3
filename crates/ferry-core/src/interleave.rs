//! Merging per-repository commit ranges into one replay order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use crate::commit::Commit;

/// Merge oldest-first ranges into a single oldest-first sequence.
///
/// A stable k-way merge on committer date: the next commit is always the
/// oldest head among all ranges, ties going to the repository whose name sorts
/// first. Commits of one repository are never reordered relative to each other,
/// even if their own dates are not monotonic.
#[must_use]
pub fn interleave(ranges: &BTreeMap<String, Vec<Commit>>) -> Vec<Commit> {
    let total = ranges.values().map(Vec::len).sum();
    let mut merged = Vec::with_capacity(total);

    let mut heap: BinaryHeap<_> = ranges
        .iter()
        .filter_map(|(name, commits)| {
            commits
                .first()
                .map(|head| Reverse((head.date, name.as_str(), 0usize)))
        })
        .collect();

    while let Some(Reverse((_, name, index))) = heap.pop() {
        let commits = &ranges[name];
        merged.push(commits[index].clone().in_repo(name));

        if let Some(next) = commits.get(index + 1) {
            heap.push(Reverse((next.date, name, index + 1)));
        }
    }

    merged
}
