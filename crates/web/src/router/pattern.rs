//! Route patterns and path matching.
//!
//! A pattern is a `/`-separated list of segments. A segment starting with `:` is a named
//! parameter that binds whatever the request path has at that position; every other segment must
//! match literally. A pattern holds at most one parameter.
//!
//! ```
//! use switchyard_web::router::RoutePattern;
//!
//! let pattern = RoutePattern::parse("/users/:id").unwrap();
//! let params = pattern.matches("/users/42").unwrap();
//! assert_eq!(params.get("id"), Some("42"));
//! assert!(pattern.matches("/users/42/extra").is_none());
//! ```
//!
//! The only normalisation is a single trailing slash: `/users` also matches `/users/`, and
//! `/users/:id` matches `/users/42/`. A parameter never binds an empty segment. Nothing is
//! percent-decoded and dot segments are not resolved.
//!
//! Matching a single pattern says nothing about precedence. The [`Router`](crate::Router) tries
//! routes in registration order, so `/users/:id` registered before `/users/me` shadows it.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::request::Params;

const PARAM_MARKER: char = ':';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern `{pattern}` has more than one parameter segment")]
    MultipleParams { pattern: String },

    #[error("pattern `{pattern}` has a parameter segment without a name")]
    EmptyParamName { pattern: String },
}

/// A parsed route pattern such as `/items/:id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
    has_param: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();
        let mut has_param = false;

        for segment in pattern.split('/') {
            match segment.strip_prefix(PARAM_MARKER) {
                Some("") => return Err(PatternError::EmptyParamName { pattern: pattern.to_owned() }),
                Some(_) if has_param => return Err(PatternError::MultipleParams { pattern: pattern.to_owned() }),
                Some(name) => {
                    has_param = true;
                    segments.push(Segment::Param(name.to_owned()));
                }
                None => segments.push(Segment::Literal(segment.to_owned())),
            }
        }

        Ok(Self { raw: pattern.to_owned(), segments, has_param })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The name of the parameter segment, if the pattern has one
    pub fn param_name(&self) -> Option<&str> {
        self.segments.iter().find_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Matches `path` against this pattern, returning the bound parameters on success.
    ///
    /// For a parametric pattern one trailing `/` is ignored, so `/users/:id` matches `/users/42/`
    /// with `id = "42"`. A parameter never binds an empty segment: `/users/:id` does not match
    /// `/users/`.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let path = if self.has_param { path.strip_suffix('/').unwrap_or(path) } else { path };
        let mut actual = path.split('/');
        let mut params = Params::new();

        for segment in &self.segments {
            let value = actual.next()?;
            match segment {
                Segment::Literal(literal) if literal != value => return None,
                Segment::Literal(_) => {}
                Segment::Param(_) if value.is_empty() => return None,
                Segment::Param(name) => {
                    params.insert(name.as_str(), value);
                }
            }
        }

        match actual.next() {
            None => Some(params),
            Some("") if !self.has_param && actual.next().is_none() => Some(params),
            Some(_) => None,
        }
    }
}

impl FromStr for RoutePattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parses `pattern` and matches `path` against it in one step.
pub fn match_path(pattern: &str, path: &str) -> Result<Option<Params>, PatternError> {
    Ok(RoutePattern::parse(pattern)?.matches(path))
}
