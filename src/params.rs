//! Path parameters captured while matching a request.

use std::slice;

use hyper::Request;

/// Parameters captured from the request path, in pattern order.
///
/// A fresh `Params` is created for every matched request and stored in the
/// request's extensions before the handler chain runs. A parameter that did
/// not take part in the match (an absent `:name?`) has no entry at all, which
/// is distinct from an entry holding the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: &str, value: &str) {
        self.entries.push((name.to_owned(), value.to_owned()));
    }

    /// Returns the value captured for `name`.
    /// ```rust
    /// use hostrouter::path::matches;
    ///
    /// let params = matches("/users/:id", "/users/42").unwrap();
    /// assert_eq!(params.get("id"), Some("42"));
    /// assert_eq!(params.get("name"), None);
    /// ```
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in the order they appear in the pattern.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over captured parameters.
#[derive(Debug)]
pub struct Iter<'a> {
    inner: slice::Iter<'a, (String, String)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Access to the parameters the router attached to a request.
/// ```rust
/// use hostrouter::{Params, RequestExt};
/// use hyper::{Body, Request};
///
/// let req = Request::new(Body::empty());
/// assert!(req.params().is_none());
/// assert_eq!(req.param("id"), None);
/// ```
pub trait RequestExt {
    /// All captured parameters, or `None` if the request was not routed.
    fn params(&self) -> Option<&Params>;

    /// A single captured parameter.
    fn param(&self, name: &str) -> Option<&str> {
        self.params().and_then(|params| params.get(name))
    }
}

impl<B> RequestExt for Request<B> {
    fn params(&self) -> Option<&Params> {
        self.extensions().get::<Params>()
    }
}
