use std::io::Read;
use std::num::NonZeroUsize;
use std::time::Duration;

use bstr::ByteSlice;
use ripline::{
    line_buffer::{LineBufferBuilder, LineBufferReader},
    lines::LineIter,
};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::extractor::{Extractor, ExtractorBuilder};
use crate::input::FileOrStdin;
use crate::rank::{self, Entry};
use crate::resolver::{self, DnsLookup, ReverseLookup};
use crate::selector::Selector;
use crate::tally::Tally;

/// Settings for one counting run.
#[derive(Clone, Debug)]
pub struct Config {
    /// Which address of a line to count, starting at 1.
    pub selector_index: usize,
    /// Look up a hostname for every reported address.
    pub resolve_hostnames: bool,
    /// Only report addresses seen at least this often.
    pub min_threshold: Option<u64>,
    /// Only report this many of the most frequent addresses.
    pub max_results: Option<usize>,
    pub ipv4: bool,
    pub ipv6: bool,
    /// Replaces the built-in address patterns.
    pub pattern: Option<String>,
    /// Every line holds exactly one address and nothing else.
    pub fixed_ips: bool,
    /// Fail on the first line that yields no address.
    pub pedantic: bool,
    pub lookup_timeout: Duration,
    pub lookup_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            selector_index: 1,
            resolve_hostnames: true,
            min_threshold: None,
            max_results: None,
            ipv4: true,
            ipv6: true,
            pattern: None,
            fixed_ips: false,
            pedantic: false,
            lookup_timeout: resolver::DEFAULT_TIMEOUT,
            lookup_concurrency: resolver::DEFAULT_CONCURRENCY.get(),
        }
    }
}

/// How addresses are located in a line.
#[derive(Clone, Debug)]
enum Matcher {
    Pattern(Extractor),
    WholeLine,
}

/// A validated, ready to run counting pipeline.
///
/// Reading and counting run synchronously, one line at a time, into a
/// [`Tally`] owned by the caller. Ranking and the optional hostname lookups
/// run once all input has been read.
#[derive(Clone, Debug)]
pub struct Pipeline {
    matcher: Matcher,
    selector: Selector,
    pedantic: bool,
    min_threshold: Option<u64>,
    max_results: Option<usize>,
    resolve_hostnames: bool,
    lookup_timeout: Duration,
    lookup_concurrency: NonZeroUsize,
}

impl Pipeline {
    /// Validate `config` and compile the address patterns.
    ///
    /// # Errors
    ///
    /// Returns a configuration error (see [`Error::is_configuration`]) for a
    /// zero key, a zero limit, a zero lookup concurrency, conflicting
    /// settings or an unusable pattern.
    pub fn new(config: &Config) -> Result<Pipeline> {
        let selector = Selector::new(config.selector_index)?;

        if let Some(limit) = config.max_results {
            if limit == 0 {
                return Err(Error::InvalidLimit { limit });
            }
        }
        let lookup_concurrency =
            NonZeroUsize::new(config.lookup_concurrency).ok_or(Error::InvalidConcurrency {
                concurrency: config.lookup_concurrency,
            })?;

        let matcher = if config.fixed_ips {
            if config.pattern.is_some() {
                return Err(Error::Conflict(
                    "a custom pattern cannot be used with fixed addresses",
                ));
            }
            if selector.index() != 1 {
                return Err(Error::Conflict(
                    "fixed addresses hold one address per line, the key must be 1",
                ));
            }
            Matcher::WholeLine
        } else {
            Matcher::Pattern(
                ExtractorBuilder::new()
                    .ipv4(config.ipv4)
                    .ipv6(config.ipv6)
                    .pattern(config.pattern.clone())
                    .build()?,
            )
        };

        Ok(Pipeline {
            matcher,
            selector,
            pedantic: config.pedantic,
            min_threshold: config.min_threshold,
            max_results: config.max_results,
            resolve_hostnames: config.resolve_hostnames,
            lookup_timeout: config.lookup_timeout,
            lookup_concurrency,
        })
    }

    /// Whether hostnames will be looked up for the report.
    pub fn resolves(&self) -> bool {
        self.resolve_hostnames
    }

    /// The address this line contributes, if any.
    #[inline]
    pub fn select<'a>(&'a self, line: &'a [u8]) -> Option<&'a [u8]> {
        match &self.matcher {
            Matcher::Pattern(extractor) => self.selector.select(extractor.extract(line)),
            Matcher::WholeLine => Some(line.trim()).filter(|address| !address.is_empty()),
        }
    }

    /// Count every line of `rdr` into `tally`. `name` identifies the input in
    /// errors.
    pub fn count_reader<R: Read>(&self, name: &str, rdr: R, tally: &mut Tally) -> Result<()> {
        let mut line_buffer = LineBufferBuilder::new().capacity(65536).build();
        let mut lb_reader = LineBufferReader::new(rdr, &mut line_buffer);
        let mut line_number: u64 = 0;

        while lb_reader.fill().map_err(|source| Error::Input {
            input: name.to_string(),
            source,
        })? {
            for line in LineIter::new(b'\n', lb_reader.buffer()) {
                line_number += 1;
                tally.line_seen();
                match self.select(line) {
                    Some(address) => tally.accumulate(address),
                    None if self.pedantic => {
                        return Err(Error::NoAddress {
                            input: name.to_string(),
                            line_number,
                            line: line
                                .trim_end_with(|c| c == '\n' || c == '\r')
                                .to_str_lossy()
                                .into_owned(),
                        });
                    }
                    None => {}
                }
            }
            lb_reader.consume_all();
        }
        Ok(())
    }

    /// Read all inputs in order into a single tally.
    pub fn count_inputs(&self, inputs: &[FileOrStdin]) -> Result<Tally> {
        let mut tally = Tally::new();
        for input in inputs {
            debug!(%input, "reading");
            let reader = input.reader()?;
            self.count_reader(&input.to_string(), reader, &mut tally)?;
        }
        info!(
            lines = tally.lines(),
            counted = tally.counted(),
            unique = tally.len(),
            "finished reading input"
        );
        Ok(tally)
    }

    /// Apply threshold, ordering and limit to a finished tally.
    pub fn rank(&self, tally: Tally) -> Vec<Entry> {
        rank::rank(tally, self.min_threshold, self.max_results)
    }

    /// Look up hostnames for ranked entries through `lookup`.
    pub async fn resolve_with<L: ReverseLookup>(
        &self,
        lookup: L,
        entries: Vec<Entry>,
    ) -> Vec<Entry> {
        resolver::Resolver::new(lookup)
            .timeout(self.lookup_timeout)
            .concurrency(self.lookup_concurrency)
            .resolve_all(entries)
            .await
    }

    /// Run the whole pipeline over `inputs`.
    ///
    /// An async runtime is only started when hostnames are looked up.
    pub fn run(&self, inputs: &[FileOrStdin]) -> Result<Vec<Entry>> {
        let tally = self.count_inputs(inputs)?;
        let entries = self.rank(tally);
        if !self.resolve_hostnames || entries.is_empty() {
            return Ok(entries);
        }

        debug!(entries = entries.len(), "resolving hostnames");
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(async move {
            let lookup = DnsLookup::from_system_conf(self.lookup_timeout);
            self.resolve_with(lookup, entries).await
        }))
    }
}
