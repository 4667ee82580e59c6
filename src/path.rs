//! Route path patterns.
//!
//! A pattern is split on `/` into segments:
//! ```ignore
//!  Syntax       Type
//!  literal      must equal the request segment
//!  :name        named parameter, one non-empty segment
//!  :name?       optional parameter
//!  :name...     greedy parameter, the rest of the path (last segment only)
//!  *name        greedy parameter, same as :name...
//!  * or **      trailing wildcard, matches anything below it (last segment only)
//! ```
//!
//! Parameter names are made of letters, digits, `_` and `-`. The whole
//! patterns `/*` and `/**` match every path. A pattern without
//! parameters is compared to the request path as a plain string, and one that
//! ends in `/*` matches every path starting with the text in front of it:
//! ```ignore
//!  Pattern: /files/*
//!
//!   /files                 match
//!   /files/a/b.txt         match
//!   /fil                   no match
//! ```

use std::collections::HashSet;

use crate::error::PatternError;
use crate::params::Params;

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    names: Vec<String>,
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    CatchAll,
    Exact,
    Prefix(usize),
    Segments { segments: Vec<Segment>, tail: Tail },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    Optional(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tail {
    None,
    Wildcard,
    Greedy(String),
}

impl Pattern {
    /// Compiles a fully-qualified pattern.
    /// ```rust
    /// use hostrouter::path::Pattern;
    ///
    /// let pattern = Pattern::parse("/articles/:category/:id?").unwrap();
    /// assert_eq!(pattern.param_names(), vec!["category", "id"]);
    ///
    /// assert!(Pattern::parse("/files/*rest/meta").is_err());
    /// assert!(Pattern::parse("/:id/:id").is_err());
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if !pattern.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash);
        }

        let raw = pattern.to_owned();

        if pattern == "/*" || pattern == "/**" {
            return Ok(Self {
                raw,
                names: Vec::new(),
                kind: Kind::CatchAll,
            });
        }

        let parts: Vec<&str> = pattern[1..].split('/').collect();
        let last = parts.len() - 1;

        let mut segments = Vec::with_capacity(parts.len());
        let mut tail = Tail::None;
        let mut seen = HashSet::new();
        let mut names = Vec::new();

        for (i, part) in parts.iter().enumerate() {
            let name = match classify(part)? {
                Parsed::Static => {
                    segments.push(Segment::Static((*part).to_owned()));
                    continue;
                }
                Parsed::Wildcard => {
                    if i != last {
                        return Err(PatternError::NotLast((*part).to_owned()));
                    }
                    tail = Tail::Wildcard;
                    continue;
                }
                Parsed::Greedy(name) => {
                    if i != last {
                        return Err(PatternError::NotLast((*part).to_owned()));
                    }
                    tail = Tail::Greedy(name.to_owned());
                    name
                }
                Parsed::Param(name) => {
                    segments.push(Segment::Param(name.to_owned()));
                    name
                }
                Parsed::Optional(name) => {
                    segments.push(Segment::Optional(name.to_owned()));
                    name
                }
            };

            if !seen.insert(name) {
                return Err(PatternError::DuplicateParam(name.to_owned()));
            }
            names.push(name.to_owned());
        }

        let kind = if !names.is_empty() {
            Kind::Segments { segments, tail }
        } else if tail == Tail::Wildcard {
            // the text in front of the final `/*` or `/**`
            Kind::Prefix(pattern.len() - parts[last].len() - 1)
        } else {
            Kind::Exact
        };

        Ok(Self { raw, names, kind })
    }

    /// The pattern text this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Names of the parameters the pattern captures, in order.
    ///
    /// The list is collected once when the pattern is compiled.
    pub fn param_names(&self) -> Vec<&str> {
        self.names.iter().map(String::as_str).collect()
    }

    /// Matches a request path, returning the captured parameters on success.
    /// ```rust
    /// use hostrouter::path::Pattern;
    ///
    /// let pattern = Pattern::parse("/static/*filepath").unwrap();
    /// let params = pattern.matches("/static/js/main.js").unwrap();
    /// assert_eq!(params.get("filepath"), Some("js/main.js"));
    ///
    /// assert!(pattern.matches("/static").is_none());
    /// ```
    pub fn matches(&self, path: &str) -> Option<Params> {
        match &self.kind {
            Kind::CatchAll => Some(Params::default()),
            Kind::Exact => {
                if self.raw == path {
                    Some(Params::default())
                } else {
                    None
                }
            }
            Kind::Prefix(len) => {
                if path.as_bytes().starts_with(&self.raw.as_bytes()[..*len]) {
                    Some(Params::default())
                } else {
                    None
                }
            }
            Kind::Segments { segments, tail } => match_segments(segments, tail, path),
        }
    }
}

enum Parsed<'a> {
    Static,
    Wildcard,
    Param(&'a str),
    Optional(&'a str),
    Greedy(&'a str),
}

fn classify(part: &str) -> Result<Parsed<'_>, PatternError> {
    if part == "*" || part == "**" {
        return Ok(Parsed::Wildcard);
    }

    let parsed = if let Some(name) = part.strip_prefix('*') {
        Parsed::Greedy(name)
    } else if let Some(name) = part.strip_prefix(':') {
        if let Some(name) = name.strip_suffix("...") {
            Parsed::Greedy(name)
        } else if let Some(name) = name.strip_suffix('?') {
            Parsed::Optional(name)
        } else {
            Parsed::Param(name)
        }
    } else {
        return Ok(Parsed::Static);
    };

    match parsed {
        Parsed::Param(name) | Parsed::Optional(name) | Parsed::Greedy(name) if name.is_empty() => {
            Err(PatternError::EmptyName)
        }
        Parsed::Param(name) | Parsed::Optional(name) | Parsed::Greedy(name)
            if !is_identifier(name) =>
        {
            Err(PatternError::InvalidName(name.to_owned()))
        }
        parsed => Ok(parsed),
    }
}

fn is_identifier(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

// Splits the next segment off `rest`. `None` once the path is used up.
fn next_segment<'p>(rest: &mut Option<&'p str>) -> Option<&'p str> {
    let current = rest.take()?;
    match current.find('/') {
        Some(i) => {
            *rest = Some(&current[i + 1..]);
            Some(&current[..i])
        }
        None => Some(current),
    }
}

fn match_segments(segments: &[Segment], tail: &Tail, path: &str) -> Option<Params> {
    let mut rest = Some(path.strip_prefix('/')?);
    let mut params = Params::with_capacity(segments.len() + 1);

    for (i, segment) in segments.iter().enumerate() {
        let value = match next_segment(&mut rest) {
            Some(value) => value,
            None => {
                // the path ran out: only optional parameters may remain
                let optional_only = segments[i..]
                    .iter()
                    .all(|segment| matches!(segment, Segment::Optional(_)));
                return match tail {
                    Tail::Greedy(_) => None,
                    _ if optional_only => Some(params),
                    _ => None,
                };
            }
        };

        match segment {
            Segment::Static(literal) => {
                if literal != value {
                    return None;
                }
            }
            Segment::Param(name) => {
                if value.is_empty() {
                    return None;
                }
                params.push(name, value);
            }
            Segment::Optional(name) => {
                if !value.is_empty() {
                    params.push(name, value);
                }
            }
        }
    }

    match tail {
        Tail::None => {
            if rest.is_some() {
                return None;
            }
        }
        Tail::Wildcard => {}
        Tail::Greedy(name) => match rest {
            Some(remainder) if !remainder.is_empty() => params.push(name, remainder),
            _ => return None,
        },
    }

    Some(params)
}

/// Matches `path` against an uncompiled pattern.
///
/// A malformed pattern never matches.
/// ```rust
/// use hostrouter::path::matches;
///
/// let params = matches("/articles/:category/:id?", "/articles/tech").unwrap();
/// assert_eq!(params.get("category"), Some("tech"));
/// assert!(!params.contains_key("id"));
///
/// assert!(matches("/users/:id", "/posts/1").is_none());
/// ```
pub fn matches(pattern: &str, path: &str) -> Option<Params> {
    Pattern::parse(pattern).ok()?.matches(path)
}

/// Names declared in a pattern or pattern fragment, ignoring anything malformed.
pub(crate) fn param_names(pattern: &str) -> Vec<&str> {
    pattern
        .split('/')
        .filter_map(|part| match classify(part) {
            Ok(Parsed::Param(name)) | Ok(Parsed::Optional(name)) | Ok(Parsed::Greedy(name)) => {
                Some(name)
            }
            _ => None,
        })
        .collect()
}
