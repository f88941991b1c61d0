//! Legacy URL redirects.

use std::collections::{BTreeMap, HashMap};

/// Old paths that moved, and where they live now.
const BUILT_IN: &[(&str, &str)] = &[
    ("/about", "/about/pratilipi"),
    ("/career", "/work-with-us"),
    ("/careers", "/work-with-us"),
    ("/contact", "/contact-us"),
    ("/privacy", "/privacy-policy"),
    ("/terms", "/terms-of-service"),
    ("/pratilipi-write", "/write"),
];

/// Exact-path redirect table, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct LegacyRedirects {
    table: HashMap<String, String>,
}

impl LegacyRedirects {
    /// Built-in entries with `overrides` merged on top.
    pub fn new(overrides: &BTreeMap<String, String>) -> Self {
        let mut table: HashMap<String, String> = BUILT_IN
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        table.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { table }
    }

    /// Redirect location for `path`, carrying the original query over
    /// unless the target already has one.
    pub fn lookup(&self, path: &str, query: Option<&str>) -> Option<String> {
        let target = self.table.get(path)?;
        match query {
            Some(q) if !target.contains('?') => Some(format!("{}?{}", target, q)),
            _ => Some(target.clone()),
        }
    }
}
