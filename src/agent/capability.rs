//! Browser rendering-capability rules.
//!
//! Rules are evaluated in order and the first family token found in the
//! User-Agent decides. Chromium derivatives also carry `Chrome/` and
//! `Safari/`, so they must come before those families.

/// Outcome of capability classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Can run the full client application.
    Modern,
    /// Needs the simplified experience.
    Basic,
    /// No rule matched.
    Unrecognized,
}

#[derive(Debug, Clone, Copy)]
enum Verdict {
    Basic,
    Modern,
    /// Modern when the major version after the token is at least this.
    MinVersion(u32),
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    token: &'static str,
    verdict: Verdict,
}

const fn rule(token: &'static str, verdict: Verdict) -> Rule {
    Rule { token, verdict }
}

const RULES: &[Rule] = &[
    rule("Opera Mini/", Verdict::Basic),
    rule("UCBrowser/", Verdict::Basic),
    rule("OPR/", Verdict::MinVersion(22)),
    rule("Edge/", Verdict::MinVersion(15)),
    rule("Edg/", Verdict::Modern),
    rule("SamsungBrowser/", Verdict::MinVersion(4)),
    rule("CriOS/", Verdict::MinVersion(35)),
    rule("Chrome/", Verdict::MinVersion(35)),
    rule("FxiOS/", Verdict::Modern),
    rule("Firefox/", Verdict::MinVersion(40)),
    rule("Trident/", Verdict::Basic),
    rule("MSIE ", Verdict::Basic),
    rule("Opera/", Verdict::Basic),
    // Safari reports its release after Version/.
    rule("Version/", Verdict::MinVersion(10)),
];

/// Classify a (non-crawler) User-Agent by rendering capability.
pub fn capability(user_agent: Option<&str>) -> Capability {
    let ua = match user_agent {
        Some(ua) if !ua.is_empty() => ua,
        _ => return Capability::Basic,
    };

    for rule in RULES {
        let Some(start) = ua.find(rule.token) else {
            continue;
        };
        return match rule.verdict {
            Verdict::Basic => Capability::Basic,
            Verdict::Modern => Capability::Modern,
            Verdict::MinVersion(min) => match major_version(&ua[start + rule.token.len()..]) {
                Some(v) if v >= min => Capability::Modern,
                _ => Capability::Basic,
            },
        };
    }

    Capability::Unrecognized
}

/// The number between the family token and the next `.`.
fn major_version(rest: &str) -> Option<u32> {
    let end = rest.find('.').unwrap_or(rest.len());
    rest[..end].trim().parse().ok()
}
