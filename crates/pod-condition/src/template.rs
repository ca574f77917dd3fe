//! Placeholder expansion for configured values.
//!
//! Pod names and namespaces are configured as templates that may reference
//! variables of the build environment, either as `${NAME}` or as `$NAME`.
//! Placeholders naming a variable that is not defined are left untouched.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\$(?:\{([A-Za-z0-9_.]+)\}|([A-Za-z0-9_]+))").unwrap();
}

/// Replace every `${NAME}` and `$NAME` in `template` with the value of `NAME`
/// in `env`.
pub fn replace_macros(template: &str, env: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match env.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_owned(),
            }
        })
        .into_owned()
}
