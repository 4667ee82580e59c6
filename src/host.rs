//! Host header matching for domains.
//!
//! A domain is declared with one or more host patterns, each of which may be a
//! comma separated list. A request matches the domain when any single pattern
//! matches its `Host` header:
//! ```ignore
//!  Pattern              Host                   Result
//!  example.com          example.com:8080       match (no port in pattern)
//!  example.com:8080     example.com            no match (port required)
//!  example.com:*        example.com:3000       match
//!  example.com:*        example.com            no match (some port required)
//!  *.example.com        api.example.com        match
//!  *.example.com        example.com            no match
//!  [::1]:8080           [::1]:8080             match
//! ```

/// Port requirement of a host pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PortRule {
    Any,
    Required,
    Exact(String),
}

/// A single, comma-free host pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HostPattern {
    name: String,
    port: PortRule,
}

impl HostPattern {
    fn parse(pattern: &str) -> Option<Self> {
        let (name, port) = split_host(pattern);
        if name.is_empty() {
            return None;
        }

        let port = match port {
            None => PortRule::Any,
            Some("*") => PortRule::Required,
            Some(port) => PortRule::Exact(port.to_owned()),
        };

        Some(Self {
            name: name.to_owned(),
            port,
        })
    }

    fn matches(&self, name: &str, port: Option<&str>) -> bool {
        let port_ok = match (&self.port, port) {
            (PortRule::Any, _) => true,
            (PortRule::Required, Some(_)) => true,
            (PortRule::Exact(expected), Some(port)) => expected == port,
            (_, None) => false,
        };
        if !port_ok {
            return false;
        }

        if self.name == name {
            return true;
        }

        // bracketed IPv6 literals only ever match exactly
        if self.name.starts_with('[') {
            return false;
        }

        match self.name.strip_prefix("*.") {
            Some(apex) => {
                name.contains('.')
                    && name.len() > apex.len()
                    && name.ends_with(apex)
                    && name.as_bytes()[name.len() - apex.len() - 1] == b'.'
            }
            None => false,
        }
    }
}

/// Splits `host[:port]` into its name and port. Bracketed IPv6 literals keep
/// their brackets as part of the name.
fn split_host(host: &str) -> (&str, Option<&str>) {
    let (name, port) = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => {
                let (name, rest) = host.split_at(end + 1);
                (name, rest.strip_prefix(':'))
            }
            None => (host, None),
        }
    } else {
        match host.rfind(':') {
            Some(i) => (&host[..i], Some(&host[i + 1..])),
            None => (host, None),
        }
    };

    (name, port.filter(|port| !port.is_empty()))
}

/// A precompiled set of host patterns, matched with OR semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSet {
    patterns: Vec<HostPattern>,
}

impl HostSet {
    /// Compiles a list of host patterns. Entries may themselves be comma
    /// separated lists; blank entries are ignored.
    /// ```rust
    /// use hostrouter::host::HostSet;
    ///
    /// let hosts = HostSet::new(&["example.com, www.example.com", "*.api.example.com"]);
    /// assert!(hosts.matches("www.example.com"));
    /// assert!(hosts.matches("v1.api.example.com:443"));
    /// assert!(!hosts.matches("example.org"));
    /// ```
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .flat_map(|entry| entry.as_ref().split(','))
            .map(str::trim)
            .filter_map(HostPattern::parse)
            .collect();

        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `host` matches any pattern in the set. An empty host never matches.
    pub fn matches(&self, host: &str) -> bool {
        if host.is_empty() {
            return false;
        }

        let (name, port) = split_host(host);
        self.patterns
            .iter()
            .any(|pattern| pattern.matches(name, port))
    }
}

/// Matches a host against uncompiled domain patterns.
/// ```rust
/// use hostrouter::host::matches;
///
/// assert!(matches(&["*.example.com"], "api.example.com"));
/// assert!(!matches(&["*.example.com"], "example.com"));
/// assert!(!matches(&["example.com:8080"], "example.com"));
/// ```
pub fn matches<S: AsRef<str>>(patterns: &[S], host: &str) -> bool {
    HostSet::new(patterns).matches(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_hosts() {
        assert!(matches(&["example.com"], "example.com"));
        assert!(matches(&["example.com"], "example.com:8080"));
        assert!(!matches(&["example.com"], "example.org"));
        assert!(!matches(&["example.com"], "www.example.com"));
    }

    #[test]
    fn wildcard_subdomains() {
        let pattern = ["*.example.com"];
        assert!(matches(&pattern, "api.example.com"));
        assert!(matches(&pattern, "v1.api.example.com"));
        assert!(matches(&pattern, "api.example.com:3000"));
        assert!(!matches(&pattern, "example.com"));
        assert!(!matches(&pattern, "badexample.com"));
    }

    #[test]
    fn exact_port() {
        let pattern = ["example.com:8080"];
        assert!(matches(&pattern, "example.com:8080"));
        assert!(!matches(&pattern, "example.com"));
        assert!(!matches(&pattern, "example.com:3000"));
    }

    #[test]
    fn wildcard_port() {
        let pattern = ["example.com:*"];
        assert!(matches(&pattern, "example.com:8080"));
        assert!(matches(&pattern, "example.com:3000"));
        assert!(!matches(&pattern, "example.com"));
        assert!(!matches(&pattern, "other.com:8080"));
    }

    #[test]
    fn wildcard_subdomain_with_port() {
        let pattern = ["*.example.com:8443"];
        assert!(matches(&pattern, "api.example.com:8443"));
        assert!(!matches(&pattern, "api.example.com"));
        assert!(!matches(&pattern, "api.example.com:443"));
    }

    #[test]
    fn ipv6_literals() {
        let pattern = ["[::1]:8080"];
        assert!(matches(&pattern, "[::1]:8080"));
        assert!(!matches(&pattern, "[::1]"));
        assert!(!matches(&pattern, "[::1]:3000"));

        assert!(matches(&["[::1]"], "[::1]"));
        assert!(matches(&["[::1]"], "[::1]:9000"));
        assert!(!matches(&["[::1]"], "[::2]"));
        assert!(!matches(&["[*.1]"], "[::1]"));
    }

    #[test]
    fn comma_lists_are_or_ed() {
        let patterns = ["a.com, b.com", "c.com:81"];
        assert!(matches(&patterns, "a.com"));
        assert!(matches(&patterns, "b.com"));
        assert!(matches(&patterns, "c.com:81"));
        assert!(!matches(&patterns, "c.com"));
        assert!(!matches(&patterns, "d.com"));
    }

    #[test]
    fn empty_never_matches() {
        assert!(!matches(&["example.com"], ""));
        assert!(!matches(&[""], "example.com"));
        assert!(!matches(&[" , "], "example.com"));
        assert!(!matches::<&str>(&[], "example.com"));
        assert!(HostSet::new(&[",,"]).is_empty());
    }

    #[test]
    fn splits_host_and_port() {
        assert_eq!(split_host("example.com:80"), ("example.com", Some("80")));
        assert_eq!(split_host("example.com"), ("example.com", None));
        assert_eq!(split_host("[::1]:80"), ("[::1]", Some("80")));
        assert_eq!(split_host("[::1]"), ("[::1]", None));
        assert_eq!(split_host("example.com:"), ("example.com", None));
    }
}
