//! Route template parsing and parameter substitution.
//!
//! # Responsibilities
//! - Discover `:name` placeholders in a route template
//! - Substitute captured route parameters into the template
//! - Translate `:name` declarations into the host router's `{name}` syntax
//!
//! # Design Decisions
//! - Placeholder identifiers are `[A-Za-z0-9_]+`, ending at the first other character
//! - Every occurrence of a placeholder is replaced, matched by whole token
//!   (`:foo` never matches inside `:foobar`)
//! - A parameter that is present but empty still replaces its placeholder
//! - Values are inserted verbatim, without percent-encoding

use std::collections::HashMap;
use std::fmt;

/// Route parameters captured by the host router, keyed by placeholder name.
pub type ParamMap = HashMap<String, String>;

/// Marker that opens a placeholder.
pub const MARKER: char = ':';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed route template.
///
/// Parsing happens once, when the route is declared; [`PathTemplate::resolve`]
/// then only walks the pre-split segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
    names: Vec<String>,
}

impl PathTemplate {
    /// Parse a template such as `/users/:id/posts/:post`.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let mut segments = Vec::new();
        let mut names: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            if c != MARKER {
                literal.push(c);
                continue;
            }

            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if !is_ident_char(next) {
                    break;
                }
                name.push(next);
                chars.next();
            }

            if name.is_empty() {
                // A bare marker is plain text.
                literal.push(c);
                continue;
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            if !names.contains(&name) {
                names.push(name.clone());
            }
            segments.push(Segment::Placeholder(name));
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { raw, segments, names }
    }

    /// The template text as declared.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True for the empty template, meaning "use the inbound path".
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// True if the template contains at least one placeholder.
    pub fn is_parametric(&self) -> bool {
        !self.names.is_empty()
    }

    /// Placeholder names in order of first appearance, without duplicates.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Placeholder names with no entry in `params`.
    pub fn unresolved<'a>(&'a self, params: &'a ParamMap) -> impl Iterator<Item = &'a str> {
        self.placeholders().filter(move |name| !params.contains_key(*name))
    }

    /// Substitute `params` into the template.
    ///
    /// Placeholders without a matching key are left as literal `:name` text.
    pub fn resolve(&self, params: &ParamMap) -> String {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => match params.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push(MARKER);
                        out.push_str(name);
                    }
                },
            }
        }
        out
    }

    /// The template in the host router's declaration syntax (`{name}`).
    pub fn router_path(&self) -> String {
        let mut out = String::with_capacity(self.raw.len() + self.names.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => {
                    for c in text.chars() {
                        match c {
                            '{' => out.push_str("{{"),
                            '}' => out.push_str("}}"),
                            c => out.push(c),
                        }
                    }
                }
                Segment::Placeholder(name) => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
        }
        out
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for PathTemplate {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// Substitute captured parameters into `template`.
///
/// ```
/// use pixie_proxy::routing::{resolve, ParamMap};
///
/// let params = ParamMap::from([("foo".to_string(), "beans".to_string())]);
/// assert_eq!(resolve("/:foo", &params), "/beans");
/// ```
pub fn resolve(template: &str, params: &ParamMap) -> String {
    PathTemplate::parse(template).resolve(params)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
