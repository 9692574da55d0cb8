use bstr::ByteSlice;
use rustc_hash::FxHashMap as HashMap;

/// Prefix of IPv4-mapped IPv6 addresses. Stripped before counting so that
/// `::ffff:192.0.2.1` and `192.0.2.1` land in the same bucket.
const MAPPED_PREFIX: &[u8] = b"::ffff:";

/// Normalize a selected address into its counting key.
#[inline]
pub fn normalize(address: &[u8]) -> &[u8] {
    match address.get(..MAPPED_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(MAPPED_PREFIX) => {
            &address[MAPPED_PREFIX.len()..]
        }
        _ => address,
    }
}

/// Occurrence counts per distinct address, built one line at a time.
///
/// Buckets are keyed by the raw bytes of the address, so inputs that are not
/// valid UTF-8 are never merged by lossy decoding.
///
/// A `Tally` belongs to a single run. It is filled by [`Tally::accumulate`]
/// and then handed over, by value, to [`crate::rank::rank`].
#[derive(Clone, Debug, Default)]
pub struct Tally {
    counts: HashMap<Vec<u8>, u64>,
    lines: u64,
    counted: u64,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one occurrence of `address`.
    #[inline]
    pub fn accumulate(&mut self, address: &[u8]) {
        let key = normalize(address);
        if let Some(count) = self.counts.get_mut(key) {
            *count += 1;
        } else {
            self.counts.insert(key.to_vec(), 1);
        }
        self.counted += 1;
    }

    /// Record that a line was read, whether or not it yielded an address.
    #[inline]
    pub fn line_seen(&mut self) {
        self.lines += 1;
    }

    /// Count for a single address, if it has been seen.
    pub fn get<A: AsRef<[u8]>>(&self, address: A) -> Option<u64> {
        self.counts.get(address.as_ref()).copied()
    }

    /// Number of distinct addresses.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of lines read.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Number of lines that contributed an address. Always equal to the sum
    /// of all counts.
    pub fn counted(&self) -> u64 {
        self.counted
    }

    /// Consume the tally, yielding each address with its count in no
    /// particular order. Addresses that are not valid UTF-8 are decoded
    /// lossily here, after counting.
    pub fn into_counts(self) -> impl Iterator<Item = (String, u64)> {
        self.counts.into_iter().map(|(address, count)| {
            let address = String::from_utf8(address)
                .unwrap_or_else(|err| err.into_bytes().to_str_lossy().into_owned());
            (address, count)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_then_increments() {
        let mut tally = Tally::new();
        tally.accumulate(b"1.2.3.4");
        assert_eq!(tally.get("1.2.3.4"), Some(1));
        tally.accumulate(b"1.2.3.4");
        assert_eq!(tally.get("1.2.3.4"), Some(2));
        assert_eq!(tally.len(), 1);
    }

    #[test]
    fn one_more_occurrence_touches_one_bucket() {
        let mut tally = Tally::new();
        let seen: [&[u8]; 3] = [b"1.2.3.4", b"5.6.7.8", b"1.2.3.4"];
        for address in seen {
            tally.accumulate(address);
        }
        let before_other = tally.get("5.6.7.8");
        let before = tally.get("1.2.3.4").unwrap();

        tally.accumulate(b"1.2.3.4");

        assert_eq!(tally.get("1.2.3.4"), Some(before + 1));
        assert_eq!(tally.get("5.6.7.8"), before_other);
    }

    #[test]
    fn mapped_prefix_is_stripped() {
        let mut tally = Tally::new();
        tally.accumulate(b"::ffff:192.0.2.1");
        tally.accumulate(b"::FFFF:192.0.2.1");
        tally.accumulate(b"192.0.2.1");
        assert_eq!(tally.get("192.0.2.1"), Some(3));
        assert_eq!(tally.len(), 1);
    }

    #[test]
    fn distinct_spellings_stay_distinct() {
        let mut tally = Tally::new();
        tally.accumulate(b"010.0.0.1");
        tally.accumulate(b"10.0.0.1");
        assert_eq!(tally.get("010.0.0.1"), Some(1));
        assert_eq!(tally.get("10.0.0.1"), Some(1));
    }

    #[test]
    fn invalid_utf8_is_not_merged() {
        let mut tally = Tally::new();
        tally.accumulate(b"host-\xff");
        tally.accumulate(b"host-\xfe");
        tally.accumulate(b"host-\xff");
        assert_eq!(tally.len(), 2);
        assert_eq!(tally.get(b"host-\xff"), Some(2));
        assert_eq!(tally.get(b"host-\xfe"), Some(1));

        let mut counts: Vec<u64> = tally.into_counts().map(|(_, count)| count).collect();
        counts.sort_unstable();
        assert_eq!(counts, vec![1, 2]);
    }

    #[test]
    fn counted_matches_sum() {
        let mut tally = Tally::new();
        for _ in 0..5 {
            tally.line_seen();
        }
        let seen: [&[u8]; 3] = [b"a", b"b", b"a"];
        for address in seen {
            tally.accumulate(address);
        }
        let sum: u64 = tally.clone().into_counts().map(|(_, count)| count).sum();
        assert_eq!(tally.counted(), 3);
        assert_eq!(sum, 3);
        assert_eq!(tally.lines(), 5);
    }

    #[test]
    fn normalize_leaves_plain_addresses() {
        assert_eq!(normalize(b"::1"), b"::1");
        assert_eq!(normalize(b"::ff"), b"::ff");
        assert_eq!(normalize(b"::ffff:10.0.0.1"), b"10.0.0.1");
    }
}
