use std::ops::Range;

use regex_automata::meta::Regex;
use regex_syntax::hir::Hir;

use crate::error::{Error, Result};

/// Dotted quad of one to three digit groups. Octet ranges are deliberately
/// not checked: `999.999.999.999` is counted like any other match.
static IPV4_PATTERN: &str = r"(?:[0-9]{1,3}\.){3}[0-9]{1,3}";

/// IPv6 shapes, most specific alternative first so that leftmost-first
/// matching does not stop at a shorter prefix (`1::` of `1::2`).
static IPV6_PATTERN: &str = concat!(
    r"(?:",
    // ::1.2.3.4, ::ffff:1.2.3.4 and ::ffff:0:1.2.3.4
    r"::(?:[fF]{4}:(?:0{1,4}:)?)?(?:[0-9]{1,3}\.){3}[0-9]{1,3}",
    // 64:ff9b::1.2.3.4
    r"|(?:[0-9a-fA-F]{1,4}:){1,6}:(?:[0-9]{1,3}\.){3}[0-9]{1,3}",
    // 2001:db8:0:0:0:0:0:1
    r"|(?:[0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}",
    // 2001:db8::1
    r"|(?:[0-9a-fA-F]{1,4}:){1,6}(?::[0-9a-fA-F]{1,4}){1,6}",
    // 2001:db8::
    r"|(?:[0-9a-fA-F]{1,4}:){1,7}:",
    // ::1
    r"|:(?::[0-9a-fA-F]{1,4}){1,7}",
    r")",
    // fe80::1%eth0
    r"(?:%[0-9a-zA-Z]+)?",
);

/// A searcher for finding address-shaped tokens in text.
///
/// All enabled patterns are compiled into a single multi-pattern regex, so a
/// line is scanned exactly once and overlapping candidates are settled by the
/// engine's leftmost-first semantics.
#[derive(Clone, Debug)]
pub struct Extractor {
    regex: Regex,
}

impl Extractor {
    /// Return an iterator of match ranges found in the haystack, left to right.
    #[inline(always)]
    pub fn find_iter<'a>(&'a self, haystack: &'a [u8]) -> impl Iterator<Item = Range<usize>> + 'a {
        self.regex.find_iter(haystack).map(|m| m.range())
    }

    /// Return an iterator of the matched byte slices, in order of appearance.
    #[inline(always)]
    pub fn extract<'a>(&'a self, line: &'a [u8]) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.find_iter(line).map(move |range| &line[range])
    }
}

/// Builder for constructing an address extractor with custom settings.
#[derive(Clone, Debug, Default)]
pub struct ExtractorBuilder {
    include_ipv4: bool,
    include_ipv6: bool,
    custom: Option<String>,
}

impl ExtractorBuilder {
    /// Create a new builder matching both IPv4 and IPv6 shapes.
    #[inline]
    pub fn new() -> Self {
        Self {
            include_ipv4: true,
            include_ipv6: true,
            custom: None,
        }
    }

    /// Include or exclude IPv4 addresses.
    #[inline(always)]
    pub fn ipv4(&mut self, include: bool) -> &mut Self {
        self.include_ipv4 = include;
        self
    }

    /// Include or exclude IPv6 addresses.
    #[inline(always)]
    pub fn ipv6(&mut self, include: bool) -> &mut Self {
        self.include_ipv6 = include;
        self
    }

    /// Replace the built-in patterns with a user supplied one. The whole match
    /// is taken as the address; capture groups are ignored.
    #[inline(always)]
    pub fn pattern(&mut self, pattern: Option<String>) -> &mut Self {
        self.custom = pattern;
        self
    }

    /// Build the extractor with the current settings.
    pub fn build(&self) -> Result<Extractor> {
        let mut patterns: Vec<Hir> = Vec::with_capacity(2);

        if let Some(custom) = &self.custom {
            patterns.push(regex_syntax::Parser::new().parse(custom)?);
        } else {
            if self.include_ipv4 {
                patterns.push(regex_syntax::Parser::new().parse(IPV4_PATTERN)?);
            }
            if self.include_ipv6 {
                patterns.push(regex_syntax::Parser::new().parse(IPV6_PATTERN)?);
            }
        }

        if patterns.is_empty() {
            return Err(Error::NoPatterns);
        }

        let regex = Regex::builder()
            .configure(
                Regex::config()
                    .auto_prefilter(true)
                    .match_kind(regex_automata::MatchKind::LeftmostFirst),
            )
            .build_many_from_hir(&patterns)?;

        Ok(Extractor { regex })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_all(extractor: &Extractor, line: &str) -> Vec<String> {
        extractor
            .extract(line.as_bytes())
            .map(|m| String::from_utf8_lossy(m).into_owned())
            .collect()
    }

    fn default_extractor() -> Extractor {
        ExtractorBuilder::new().build().expect("Failed to build extractor")
    }

    #[test]
    fn ipv4_in_order() {
        let extractor = default_extractor();
        assert_eq!(
            extract_all(&extractor, "10.0.0.1 -> 10.0.0.2 via 192.168.1.254"),
            vec!["10.0.0.1", "10.0.0.2", "192.168.1.254"]
        );
    }

    #[test]
    fn out_of_range_octets_still_match() {
        let extractor = default_extractor();
        assert_eq!(
            extract_all(&extractor, "bogus 999.999.999.999 here"),
            vec!["999.999.999.999"]
        );
    }

    #[test]
    fn version_strings_are_counted() {
        let extractor = default_extractor();
        assert_eq!(extract_all(&extractor, "openssl 1.1.1.20 built"), vec!["1.1.1.20"]);
    }

    #[test]
    fn too_few_groups_do_not_match() {
        let extractor = default_extractor();
        assert!(extract_all(&extractor, "version 1.2.3 and 10.20").is_empty());
    }

    #[test]
    fn ipv6_shapes() {
        let extractor = default_extractor();
        assert_eq!(
            extract_all(
                &extractor,
                "full 2001:0db8:85a3:0000:0000:8a2e:0370:7334 short 2001:db8::1 local ::1"
            ),
            vec![
                "2001:0db8:85a3:0000:0000:8a2e:0370:7334",
                "2001:db8::1",
                "::1"
            ]
        );
    }

    #[test]
    fn ipv6_trailing_compression_and_zone() {
        let extractor = default_extractor();
        assert_eq!(
            extract_all(&extractor, "net 2001:db8:: link fe80::1%eth0 end"),
            vec!["2001:db8::", "fe80::1%eth0"]
        );
    }

    #[test]
    fn mapped_ipv4_is_one_match() {
        let extractor = default_extractor();
        assert_eq!(
            extract_all(&extractor, "from ::ffff:192.0.2.7 port 22"),
            vec!["::ffff:192.0.2.7"]
        );
    }

    #[test]
    fn ipv6_does_not_disturb_ipv4() {
        let extractor = default_extractor();
        assert_eq!(
            extract_all(&extractor, "Feb 10 12:34:56 host sshd: 203.0.113.9 and ::1"),
            vec!["203.0.113.9", "::1"]
        );
    }

    #[test]
    fn mac_addresses_are_not_ipv6() {
        let extractor = default_extractor();
        assert!(extract_all(&extractor, "ether 00:11:22:33:44:55").is_empty());
    }

    #[test]
    fn ipv4_only() {
        let extractor = ExtractorBuilder::new().ipv6(false).build().unwrap();
        assert_eq!(extract_all(&extractor, "1.2.3.4 2001:db8::1"), vec!["1.2.3.4"]);
    }

    #[test]
    fn ipv6_only() {
        let extractor = ExtractorBuilder::new().ipv4(false).build().unwrap();
        assert_eq!(extract_all(&extractor, "1.2.3.4 2001:db8::1"), vec!["2001:db8::1"]);
    }

    #[test]
    fn no_patterns_is_an_error() {
        let err = ExtractorBuilder::new().ipv4(false).ipv6(false).build().unwrap_err();
        assert!(matches!(err, Error::NoPatterns));
    }

    #[test]
    fn custom_pattern_replaces_builtins() {
        let extractor = ExtractorBuilder::new()
            .pattern(Some(r"client=\S+".to_string()))
            .build()
            .unwrap();
        assert_eq!(
            extract_all(&extractor, "1.2.3.4 client=alpha client=beta"),
            vec!["client=alpha", "client=beta"]
        );
    }

    #[test]
    fn invalid_custom_pattern() {
        let err = ExtractorBuilder::new()
            .pattern(Some("(unclosed".to_string()))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Pattern(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn ranges_point_into_haystack() {
        let extractor = default_extractor();
        let haystack = b"a 1.2.3.4 b";
        let ranges: Vec<_> = extractor.find_iter(haystack).collect();
        assert_eq!(ranges, vec![2..9]);
        assert_eq!(extractor.find_iter(b"nothing here").count(), 0);
    }
}
