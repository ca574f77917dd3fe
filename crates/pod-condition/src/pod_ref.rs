//! References to the pod a condition is about.

use std::collections::HashMap;

use crate::template::replace_macros;

/// A pod name and optional namespace, as configured.
///
/// Both fields may contain placeholders; call [`PodRef::resolve`] to expand
/// them against a build environment before querying.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PodRef {
    /// The pod name template.
    pub name: String,
    /// The namespace template. `None` leaves the namespace to `kubectl`.
    pub namespace: Option<String>,
}

impl PodRef {
    /// Create a new reference. A blank namespace is treated as absent.
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        PodRef {
            name: name.into(),
            namespace: namespace
                .filter(|ns| !ns.trim().is_empty())
                .map(|ns| ns.to_owned()),
        }
    }

    /// Expand placeholders in the name and namespace and normalize the name.
    ///
    /// A namespace that is blank after expansion is dropped.
    pub fn resolve(&self, env: &HashMap<String, String>) -> PodRef {
        PodRef {
            name: normalize_name(&replace_macros(&self.name, env)),
            namespace: self
                .namespace
                .as_ref()
                .map(|ns| replace_macros(ns, env))
                .filter(|ns| !ns.trim().is_empty()),
        }
    }
}

// Build environments commonly use underscores in job and pod identifiers, but
// Kubernetes object names are lower-case RFC 1123 labels.
/// Lower-case a pod name and replace every `_` with `-`.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace('_', "-")
}
