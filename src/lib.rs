//! The ipcount library: count and rank the IP addresses found in text.
//!
//! Lines are scanned for IPv4 and IPv6 shaped tokens, one address per line is
//! selected and counted, and the final counts are filtered, sorted ascending
//! (heaviest last) and optionally enriched with reverse DNS names.
//!
//! # Examples
//!
//! ```rust
//! use ipcount::{Config, Pipeline, Tally};
//!
//! let config = Config {
//!     resolve_hostnames: false,
//!     ..Config::default()
//! };
//! let pipeline = Pipeline::new(&config)?;
//!
//! let mut tally = Tally::new();
//! let log = "1.2.3.4 connect\n1.2.3.4 connect\n5.6.7.8 connect\n";
//! pipeline.count_reader("log", log.as_bytes(), &mut tally)?;
//!
//! let ranked: Vec<_> = pipeline
//!     .rank(tally)
//!     .into_iter()
//!     .map(|entry| (entry.address, entry.count))
//!     .collect();
//! assert_eq!(
//!     ranked,
//!     vec![("5.6.7.8".to_string(), 1), ("1.2.3.4".to_string(), 2)]
//! );
//! # Ok::<(), ipcount::Error>(())
//! ```

pub mod error;
pub mod extractor;
pub mod input;
pub mod pipeline;
pub mod rank;
pub mod report;
pub mod resolver;
pub mod selector;
pub mod tally;
pub mod template;

pub use crate::error::{Error, Result};
pub use crate::extractor::{Extractor, ExtractorBuilder};
pub use crate::pipeline::{Config, Pipeline};
pub use crate::rank::Entry;
pub use crate::report::Reporter;
pub use crate::resolver::{Hostname, LookupFailure, ReverseLookup};
pub use crate::selector::Selector;
pub use crate::tally::Tally;
