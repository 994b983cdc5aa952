//! Change paths
//!
//! A `ChangePath` names a location that exists in the old tree, the new tree,
//! or both. Paths are the join key between the two trees and render in a
//! JSONPath-like form: `$.properties.amount`, `$.properties.tags[]`,
//! `$.properties.amount.minimum`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Serialize, Serializer};

/// One step of a change path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// A named property of an object node
    Property(String),
    /// The item schema of an array node
    Items,
    /// A keyword of the node itself (`enum`, `minimum`, `type`, ...)
    Keyword(&'static str),
}

fn plain_name() -> &'static Regex {
    static PLAIN: OnceLock<Regex> = OnceLock::new();
    PLAIN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(name) if plain_name().is_match(name) => {
                write!(f, ".properties.{}", name)
            }
            Self::Property(name) => {
                let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
                write!(f, ".properties['{}']", escaped)
            }
            Self::Items => write!(f, "[]"),
            Self::Keyword(keyword) => write!(f, ".{}", keyword),
        }
    }
}

/// Path from the schema root to a changed location
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChangePath(Vec<PathSegment>);

impl ChangePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn property(&self, name: &str) -> Self {
        self.child(PathSegment::Property(name.to_string()))
    }

    pub fn items(&self) -> Self {
        self.child(PathSegment::Items)
    }

    pub fn keyword(&self, keyword: &'static str) -> Self {
        self.child(PathSegment::Keyword(keyword))
    }

    fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Property and item steps only, i.e. the node this path points into
    pub fn depth(&self) -> usize {
        self.0
            .iter()
            .filter(|s| !matches!(s, PathSegment::Keyword(_)))
            .count()
    }
}

impl fmt::Display for ChangePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl Serialize for ChangePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
