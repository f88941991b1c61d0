//! Hostname → Site lookup.
//!
//! # Responsibilities
//! - Hold the immutable site table
//! - Resolve an inbound Host header to its Site in O(1)
//! - Know which hostnames are `www.` / configured aliases of a canonical host
//!
//! # Design Decisions
//! - Index built once at startup; read-only afterwards (no locking)
//! - Exact string comparison, case as received
//! - Hostname collisions between different sites are a startup error

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sites::language::Language;

/// Environment class a site belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentClass {
    Production,
    Gamma,
    Devo,
    /// Developer machine, plain HTTP on loopback.
    Local,
}

/// An immutable site descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Site {
    /// Symbolic name, also used to name the site's assets (`PWA-<name>.html`).
    pub name: String,
    pub primary_host: String,
    pub mobile_host: String,
    pub display_language: Language,
    /// `None` means the site aggregates all languages.
    #[serde(default)]
    pub content_filter_language: Option<Language>,
    pub environment: EnvironmentClass,
}

impl Site {
    pub fn is_test_environment(&self) -> bool {
        self.environment != EnvironmentClass::Production
    }

    pub fn is_local(&self) -> bool {
        self.environment == EnvironmentClass::Local
    }

    /// True for the "all languages" aggregate variant.
    pub fn is_aggregate(&self) -> bool {
        self.content_filter_language.is_none()
    }

    /// Parent domain shared by all hosts of the family, used to scope cookies.
    /// Local sites get a host-only cookie.
    pub fn cookie_domain(&self) -> Option<String> {
        if self.is_local() {
            return None;
        }
        let host = self
            .primary_host
            .split(':')
            .next()
            .unwrap_or(&self.primary_host);
        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 2 {
            return None;
        }
        Some(labels[labels.len() - 2..].join("."))
    }
}

/// How an inbound hostname relates to the site it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKind {
    Primary,
    Mobile,
    /// Known alias; clients should be sent to `canonical`.
    Alias { canonical: String },
}

/// Successful registry lookup.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub site: Arc<Site>,
    pub kind: HostKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("hostname {host} is registered by both {first} and {second}")]
    DuplicateHost {
        host: String,
        first: String,
        second: String,
    },

    #[error("alias {alias} points at unregistered host {target}")]
    UnknownAliasTarget { alias: String, target: String },

    #[error("site table is empty")]
    Empty,
}

/// Immutable site table plus a precomputed hostname index.
#[derive(Debug)]
pub struct SiteRegistry {
    sites: Vec<Arc<Site>>,
    index: HashMap<String, (Arc<Site>, HostKind)>,
}

impl SiteRegistry {
    /// Build the registry. `aliases` maps extra hostnames to a registered host.
    pub fn new(sites: Vec<Site>, aliases: &BTreeMap<String, String>) -> Result<Self, RegistryError> {
        if sites.is_empty() {
            return Err(RegistryError::Empty);
        }

        let sites: Vec<Arc<Site>> = sites.into_iter().map(Arc::new).collect();
        let mut index: HashMap<String, (Arc<Site>, HostKind)> = HashMap::new();

        for site in &sites {
            for (host, kind) in [
                (&site.primary_host, HostKind::Primary),
                (&site.mobile_host, HostKind::Mobile),
            ] {
                match index.get(host) {
                    // Local sites reuse one host for both roles.
                    Some((existing, _)) if existing.name == site.name => {}
                    Some((existing, _)) => {
                        return Err(RegistryError::DuplicateHost {
                            host: host.clone(),
                            first: existing.name.clone(),
                            second: site.name.clone(),
                        });
                    }
                    None => {
                        index.insert(host.clone(), (site.clone(), kind));
                    }
                }
            }
        }

        for (alias, target) in aliases {
            let site = match index.get(target) {
                Some((site, HostKind::Primary | HostKind::Mobile)) => site.clone(),
                _ => {
                    return Err(RegistryError::UnknownAliasTarget {
                        alias: alias.clone(),
                        target: target.clone(),
                    });
                }
            };
            if let Some((existing, _)) = index.get(alias) {
                return Err(RegistryError::DuplicateHost {
                    host: alias.clone(),
                    first: existing.name.clone(),
                    second: site.name.clone(),
                });
            }
            index.insert(
                alias.clone(),
                (site, HostKind::Alias { canonical: target.clone() }),
            );
        }

        // Generated www. aliases never shadow an explicit registration.
        for site in &sites {
            for host in [&site.primary_host, &site.mobile_host] {
                if !wants_www_alias(host) {
                    continue;
                }
                let alias = format!("www.{}", host);
                index.entry(alias).or_insert_with(|| {
                    (site.clone(), HostKind::Alias { canonical: host.clone() })
                });
            }
        }

        tracing::debug!(sites = sites.len(), hostnames = index.len(), "Site registry built");

        Ok(Self { sites, index })
    }

    /// Registry over the built-in site table.
    pub fn with_defaults(aliases: &BTreeMap<String, String>) -> Result<Self, RegistryError> {
        Self::new(default_sites(), aliases)
    }

    /// Resolve a Host header value. `None` is an expected outcome for foreign hosts.
    pub fn resolve(&self, host: &str) -> Option<Resolution> {
        self.index.get(host).map(|(site, kind)| Resolution {
            site: site.clone(),
            kind: kind.clone(),
        })
    }

    /// Look a site up by its symbolic name.
    pub fn get(&self, name: &str) -> Option<&Arc<Site>> {
        self.sites.iter().find(|s| s.name == name)
    }

    pub fn sites(&self) -> impl Iterator<Item = &Arc<Site>> {
        self.sites.iter()
    }
}

fn wants_www_alias(host: &str) -> bool {
    !host.starts_with("www.") && !host.contains(':') && host.contains('.')
}

type SiteRow = (
    &'static str,
    &'static str,
    &'static str,
    Language,
    Option<Language>,
    EnvironmentClass,
);

const DEFAULT_SITES: &[SiteRow] = {
    use EnvironmentClass::*;
    use Language::*;
    &[
        ("ALL_LANGUAGE", "www.pratilipi.com", "m.pratilipi.com", English, None, Production),
        ("HINDI", "hindi.pratilipi.com", "hi.pratilipi.com", Hindi, Some(Hindi), Production),
        ("GUJARATI", "gujarati.pratilipi.com", "gu.pratilipi.com", Gujarati, Some(Gujarati), Production),
        ("TAMIL", "tamil.pratilipi.com", "ta.pratilipi.com", Tamil, Some(Tamil), Production),
        ("MARATHI", "marathi.pratilipi.com", "mr.pratilipi.com", Marathi, Some(Marathi), Production),
        ("MALAYALAM", "malayalam.pratilipi.com", "ml.pratilipi.com", Malayalam, Some(Malayalam), Production),
        ("BENGALI", "bengali.pratilipi.com", "bn.pratilipi.com", Bengali, Some(Bengali), Production),
        ("KANNADA", "kannada.pratilipi.com", "kn.pratilipi.com", Kannada, Some(Kannada), Production),
        ("TELUGU", "telugu.pratilipi.com", "te.pratilipi.com", Telugu, Some(Telugu), Production),
        ("GAMMA_ALL_LANGUAGE", "gamma.pratilipi.com", "m-gamma.pratilipi.com", English, None, Gamma),
        ("GAMMA_HINDI", "hindi-gamma.pratilipi.com", "hi-gamma.pratilipi.com", Hindi, Some(Hindi), Gamma),
        ("GAMMA_GUJARATI", "gujarati-gamma.pratilipi.com", "gu-gamma.pratilipi.com", Gujarati, Some(Gujarati), Gamma),
        ("GAMMA_TAMIL", "tamil-gamma.pratilipi.com", "ta-gamma.pratilipi.com", Tamil, Some(Tamil), Gamma),
        ("GAMMA_MARATHI", "marathi-gamma.pratilipi.com", "mr-gamma.pratilipi.com", Marathi, Some(Marathi), Gamma),
        ("GAMMA_MALAYALAM", "malayalam-gamma.pratilipi.com", "ml-gamma.pratilipi.com", Malayalam, Some(Malayalam), Gamma),
        ("GAMMA_BENGALI", "bengali-gamma.pratilipi.com", "bn-gamma.pratilipi.com", Bengali, Some(Bengali), Gamma),
        ("GAMMA_KANNADA", "kannada-gamma.pratilipi.com", "kn-gamma.pratilipi.com", Kannada, Some(Kannada), Gamma),
        ("GAMMA_TELUGU", "telugu-gamma.pratilipi.com", "te-gamma.pratilipi.com", Telugu, Some(Telugu), Gamma),
        ("DEVO_ALL_LANGUAGE", "devo.pratilipi.com", "m-devo.pratilipi.com", English, None, Devo),
        ("DEVO_HINDI", "hindi-devo.pratilipi.com", "hi-devo.pratilipi.com", Hindi, Some(Hindi), Devo),
        ("DEVO_GUJARATI", "gujarati-devo.pratilipi.com", "gu-devo.pratilipi.com", Gujarati, Some(Gujarati), Devo),
        ("DEVO_TAMIL", "tamil-devo.pratilipi.com", "ta-devo.pratilipi.com", Tamil, Some(Tamil), Devo),
        ("DEVO_MARATHI", "marathi-devo.pratilipi.com", "mr-devo.pratilipi.com", Marathi, Some(Marathi), Devo),
        ("DEVO_MALAYALAM", "malayalam-devo.pratilipi.com", "ml-devo.pratilipi.com", Malayalam, Some(Malayalam), Devo),
        ("DEVO_BENGALI", "bengali-devo.pratilipi.com", "bn-devo.pratilipi.com", Bengali, Some(Bengali), Devo),
        ("ALPHA", "localhost:8080", "localhost:8080", Hindi, Some(Hindi), Local),
    ]
};

/// The built-in site table.
pub fn default_sites() -> Vec<Site> {
    DEFAULT_SITES
        .iter()
        .map(|&(name, primary, mobile, display, filter, environment)| Site {
            name: name.to_string(),
            primary_host: primary.to_string(),
            mobile_host: mobile.to_string(),
            display_language: display,
            content_filter_language: filter,
            environment,
        })
        .collect()
}
