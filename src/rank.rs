use std::cmp::Ordering;

use crate::resolver::Hostname;
use crate::tally::Tally;

/// One line of the final report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub address: String,
    pub count: u64,
    /// Outcome of the reverse lookup; `None` when lookups are disabled.
    pub hostname: Option<Hostname>,
}

impl Entry {
    pub fn new(address: impl Into<String>, count: u64) -> Self {
        Entry {
            address: address.into(),
            count,
            hostname: None,
        }
    }

    /// The name to display: the resolved hostname, or the address itself.
    pub fn host(&self) -> &str {
        match &self.hostname {
            Some(Hostname::Resolved(name)) => name,
            _ => &self.address,
        }
    }
}

/// Drop every entry whose count is strictly below `min`.
pub fn apply_threshold(entries: &mut Vec<Entry>, min: u64) {
    entries.retain(|entry| entry.count >= min);
}

/// Order for the report: ascending by count, then by address bytes.
#[inline]
pub fn by_count_then_address(a: &Entry, b: &Entry) -> Ordering {
    a.count
        .cmp(&b.count)
        .then_with(|| a.address.as_bytes().cmp(b.address.as_bytes()))
}

/// Sort ascending, heaviest hitters last.
pub fn sort_ascending(entries: &mut [Entry]) {
    entries.sort_unstable_by(by_count_then_address);
}

/// Keep only the `n` heaviest entries of an ascending sequence, preserving
/// their order.
pub fn keep_heaviest(entries: &mut Vec<Entry>, n: usize) {
    let excess = entries.len().saturating_sub(n);
    entries.drain(..excess);
}

/// Turn the final tally into the report order.
///
/// The threshold is applied before sorting and the limit after it, so both
/// can be combined: "the 10 heaviest of those seen at least 5 times".
pub fn rank(tally: Tally, min_threshold: Option<u64>, max_results: Option<usize>) -> Vec<Entry> {
    let mut entries: Vec<Entry> = tally
        .into_counts()
        .map(|(address, count)| Entry::new(address, count))
        .collect();

    if let Some(min) = min_threshold {
        apply_threshold(&mut entries, min);
    }
    sort_ascending(&mut entries);
    if let Some(n) = max_results {
        keep_heaviest(&mut entries, n);
    }
    entries
}
