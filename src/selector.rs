use std::num::NonZeroUsize;

use crate::error::{Error, Result};

/// Picks which of a line's matches gets counted.
///
/// The index is 1-based, the way it is given on the command line. A line with
/// fewer matches than the index contributes nothing; there is no fallback to
/// the last match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selector {
    index: NonZeroUsize,
}

impl Default for Selector {
    fn default() -> Self {
        Selector {
            index: NonZeroUsize::MIN,
        }
    }
}

impl Selector {
    /// Create a selector for the `index`-th match of each line.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSelector` when `index` is zero.
    pub fn new(index: usize) -> Result<Selector> {
        NonZeroUsize::new(index)
            .map(|index| Selector { index })
            .ok_or(Error::InvalidSelector { index })
    }

    /// The 1-based index this selector picks.
    #[inline]
    pub fn index(&self) -> usize {
        self.index.get()
    }

    /// Pick the configured match from an ordered sequence of matches.
    ///
    /// Only as many matches as needed are pulled from the iterator.
    #[inline]
    pub fn select<I: IntoIterator>(&self, matches: I) -> Option<I::Item> {
        matches.into_iter().nth(self.index.get() - 1)
    }
}
