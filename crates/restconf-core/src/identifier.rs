//! Resource identifiers
//!
//! A [`ResourceIdentifier`] is the structured form of a RESTCONF data
//! resource path such as `/onos/restconf/data/test:top/list=1,2`. Each path
//! segment becomes one [`PathElement`]; the first segment is the root's
//! child and every following segment goes one level deeper.
//!
//! Segment grammar: `[namespace ":"] name ["=" key ("," key)*]`.
//!
//! A segment without a namespace inherits the namespace of the nearest
//! preceding element that declared one.
//!
//! Segments are percent-decoded before this grammar applies, so `%2C` splits
//! keys the same way a literal `,` does. Only `%2F` survives as data, since
//! the path is cut on `/` first.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{RestconfError, RestconfResult};
use crate::path::{decode_path, encode_segment};

/// Marker between the RESTCONF root and the data resource path
pub const DATA_MARKER: &str = "/data";

/// Key value substituted for an empty key token (`list=a,,b`)
pub const NULL_KEY: &str = "null";

/// Whether a path element addresses a replicable node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Container or leaf; cannot be replicated
    SingleInstance,
    /// List entry or leaf-list value; addressed by instance keys
    MultiInstance,
}

/// One node in a resource identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathElement {
    /// Local node name
    pub name: String,
    /// Explicit or inherited namespace (module name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Single or multi instance
    pub kind: ElementKind,
    /// Instance keys in segment order; empty for single-instance elements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
}

impl PathElement {
    /// Create a single-instance element
    pub fn single(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.map(str::to_string),
            kind: ElementKind::SingleInstance,
            keys: Vec::new(),
        }
    }

    /// Create a multi-instance element with the given keys
    pub fn multi<I, K>(name: impl Into<String>, namespace: Option<&str>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            name: name.into(),
            namespace: namespace.map(str::to_string),
            kind: ElementKind::MultiInstance,
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_multi_instance(&self) -> bool {
        self.kind == ElementKind::MultiInstance
    }

    /// Write this element as a path segment, emitting the namespace only
    /// when it differs from `inherited`.
    fn write_segment(&self, f: &mut fmt::Formatter<'_>, inherited: Option<&str>) -> fmt::Result {
        if let Some(ns) = self.namespace.as_deref() {
            if inherited != Some(ns) {
                write!(f, "{}:", encode_segment(ns))?;
            }
        }
        f.write_str(&encode_segment(&self.name))?;
        if self.is_multi_instance() {
            let keys: Vec<String> = self.keys.iter().map(|k| encode_segment(k)).collect();
            write!(f, "={}", keys.join(","))?;
        }
        Ok(())
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_segment(f, None)
    }
}

/// Ordered path from the datastore root to a target node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    /// Configured mount point the identifier was parsed under (may be empty)
    root_path: String,
    elements: Vec<PathElement>,
}

impl ResourceIdentifier {
    pub fn new(root_path: impl Into<String>, elements: Vec<PathElement>) -> Self {
        Self {
            root_path: root_path.into(),
            elements,
        }
    }

    /// Parse a path that is already relative to the `/data` marker,
    /// e.g. `/test:top/list=1,2`.
    pub fn from_data_path(path: &str) -> RestconfResult<Self> {
        let segments = decode_path(path)?;
        parse_segments(&segments, None)
    }

    /// Parse the path of a full request URI.
    ///
    /// The path must start with `root_path` followed by `/data`. Anything
    /// after `?` or `#` is ignored.
    pub fn from_uri(root_path: &str, uri_path: &str) -> RestconfResult<Self> {
        let path = uri_path
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let root = root_path.trim_end_matches('/');

        let after_root = path.strip_prefix(root).ok_or_else(|| {
            RestconfError::NotADataResource(format!(
                "'{}' is outside the RESTCONF root '{}'",
                path, root
            ))
        })?;

        let data_path = after_root
            .strip_prefix(DATA_MARKER)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .ok_or_else(|| {
                RestconfError::NotADataResource(format!(
                    "'{}' has no '{}' marker after the RESTCONF root",
                    path, DATA_MARKER
                ))
            })?;

        let mut identifier = Self::from_data_path(data_path)?;
        identifier.root_path = root.to_string();
        trace!(uri = %path, elements = identifier.len(), "Parsed resource identifier");
        Ok(identifier)
    }

    /// An identifier is valid when it addresses at least one node
    pub fn is_valid(&self) -> bool {
        !self.elements.is_empty()
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// The addressed (deepest) element
    pub fn target(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl fmt::Display for ResourceIdentifier {
    /// Re-serializes the element list as a data path (`/ns:a/b=k1,k2`)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut inherited: Option<&str> = None;
        for element in &self.elements {
            f.write_str("/")?;
            element.write_segment(f, inherited)?;
            if element.namespace.is_some() {
                inherited = element.namespace.as_deref();
            }
        }
        Ok(())
    }
}

/// Accumulator threaded through [`parse_segments`]
#[derive(Debug, Default)]
struct ParseState {
    namespace: Option<String>,
    elements: Vec<PathElement>,
}

impl ParseState {
    fn push(mut self, segment: &str) -> RestconfResult<Self> {
        let element = parse_segment(segment, self.namespace.as_deref())?;
        if element.namespace.is_some() {
            self.namespace = element.namespace.clone();
        }
        self.elements.push(element);
        Ok(self)
    }
}

/// Parse already-decoded segments into an identifier, left to right.
///
/// `inherited_namespace` seeds namespace inheritance for a first segment
/// that does not declare one.
pub fn parse_segments<S: AsRef<str>>(
    segments: &[S],
    inherited_namespace: Option<&str>,
) -> RestconfResult<ResourceIdentifier> {
    let seed = ParseState {
        namespace: inherited_namespace.map(str::to_string),
        elements: Vec::with_capacity(segments.len()),
    };
    let state = segments
        .iter()
        .try_fold(seed, |state, segment| state.push(segment.as_ref()))?;

    Ok(ResourceIdentifier::new(String::new(), state.elements))
}

/// Parse one decoded segment.
///
/// ```
/// # use restconf_core::identifier::{parse_segment, ElementKind};
/// let element = parse_segment("list=k1,,k3", Some("test")).unwrap();
/// assert_eq!(element.namespace.as_deref(), Some("test"));
/// assert_eq!(element.kind, ElementKind::MultiInstance);
/// assert_eq!(element.keys, vec!["k1", "null", "k3"]);
/// ```
pub fn parse_segment(segment: &str, inherited_namespace: Option<&str>) -> RestconfResult<PathElement> {
    let eq = segment.find('=');
    let colon = segment.find(':');

    // A ':' only separates a namespace when it precedes the first '='
    let (namespace, rest) = match colon {
        Some(idx) if eq.map_or(true, |eq| idx < eq) => {
            let (ns, rest) = (&segment[..idx], &segment[idx + 1..]);
            if ns.is_empty() {
                return Err(RestconfError::malformed(segment, "empty namespace"));
            }
            (Some(ns), rest)
        }
        _ => (inherited_namespace, segment),
    };

    let (name, key_part) = match rest.split_once('=') {
        Some((name, keys)) => (name, Some(keys)),
        None => (rest, None),
    };

    if name.is_empty() {
        return Err(RestconfError::malformed(segment, "empty node name"));
    }
    if name.contains(':') {
        return Err(RestconfError::malformed(
            segment,
            "more than one namespace in segment",
        ));
    }

    match key_part {
        None => Ok(PathElement::single(name, namespace)),
        Some("") => Err(RestconfError::malformed(
            segment,
            "multi-instance node requires at least one key",
        )),
        Some(keys) => {
            let keys = keys
                .split(',')
                .map(|key| if key.is_empty() { NULL_KEY } else { key });
            Ok(PathElement::multi(name, namespace, keys))
        }
    }
}
