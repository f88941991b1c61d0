//! Client classification from the User-Agent header.
//!
//! # Data Flow
//! ```text
//! User-Agent (optional)
//!     → crawler.rs (signature table; any match ⇒ Crawler)
//!     → capability.rs (ordered browser-family rules, only for non-crawlers)
//!     → ClientClass
//! ```
//!
//! # Design Decisions
//! - Pure functions over the header string: deterministic, no I/O, no caching
//! - Missing UA is never a crawler and always capability-limited
//! - Unrecognized UAs surface as `Unknown`; callers route them like
//!   capability-limited clients and log them

pub mod capability;
pub mod crawler;

pub use capability::{capability, Capability};
pub use crawler::{crawler_signature, is_crawler};

/// Classification of the requesting client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientClass {
    Crawler,
    CapabilityLimited,
    Modern,
    Unknown,
}

impl ClientClass {
    /// Whether this client should get the simplified experience.
    pub fn needs_basic(self) -> bool {
        matches!(self, ClientClass::CapabilityLimited | ClientClass::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClientClass::Crawler => "crawler",
            ClientClass::CapabilityLimited => "capability_limited",
            ClientClass::Modern => "modern",
            ClientClass::Unknown => "unknown",
        }
    }
}

/// Classify a client from its User-Agent header value.
pub fn classify(user_agent: Option<&str>) -> ClientClass {
    if is_crawler(user_agent) {
        return ClientClass::Crawler;
    }
    match capability(user_agent) {
        Capability::Modern => ClientClass::Modern,
        Capability::Basic => ClientClass::CapabilityLimited,
        Capability::Unrecognized => ClientClass::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn googlebot_literal() {
        let ua = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";
        assert_eq!(classify(Some(ua)), ClientClass::Crawler);
    }

    #[test]
    fn absent_header_is_limited_not_crawler() {
        assert_eq!(classify(None), ClientClass::CapabilityLimited);
        assert_eq!(classify(Some("")), ClientClass::CapabilityLimited);
    }

    #[test]
    fn unknown_is_routed_like_limited() {
        let class = classify(Some("SomeEmbeddedBrowser/1.0"));
        assert_eq!(class, ClientClass::Unknown);
        assert!(class.needs_basic());
        assert!(!ClientClass::Modern.needs_basic());
    }

    #[test]
    fn classification_is_deterministic() {
        let ua = "Mozilla/5.0 (Linux; Android 5.0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/39.0.2171.93 Mobile Safari/537.36";
        assert_eq!(classify(Some(ua)), classify(Some(ua)));
        assert_eq!(classify(Some(ua)), ClientClass::Modern);
    }
}
