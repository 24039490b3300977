//! Rendering context built from `key=value` arguments.

use std::collections::BTreeMap;

/// Variable values for one render. Every value is a string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    values: BTreeMap<String, String>,
}

impl RenderContext {
    /// Build a context from `key=value` assignments. A later assignment to the
    /// same key replaces an earlier one.
    pub fn from_assignments<I>(assignments: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        assignments.into_iter().collect()
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `k=v` pairs joined with `, `, for the "Applied Variables" line.
    pub fn summary(&self) -> String {
        self.values
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromIterator<(String, String)> for RenderContext {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Parse one `key=value` argument. Splits on the first `=`; the value may be
/// empty or contain further `=` characters. Used as a clap value parser.
pub fn parse_assignment(arg: &str) -> Result<(String, String), String> {
    let Some((key, value)) = arg.split_once('=') else {
        return Err(format!("expected KEY=VALUE, got '{}'", arg));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing variable name in '{}'", arg));
    }
    Ok((key.to_string(), value.to_string()))
}
