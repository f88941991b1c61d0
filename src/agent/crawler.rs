//! Crawler signature matching.

/// Known crawler / preview-fetcher / archiver User-Agent fragments.
/// Matched as case-sensitive substrings.
const CRAWLER_SIGNATURES: &[&str] = &[
    // Search engines
    "Googlebot",
    "Google-InspectionTool",
    "AdsBot-Google",
    "Mediapartners-Google",
    "bingbot",
    "BingPreview",
    "Slurp",
    "DuckDuckBot",
    "Baiduspider",
    "YandexBot",
    "Sogou",
    "Exabot",
    "Applebot",
    // Social previews
    "facebookexternalhit",
    "Facebot",
    "Twitterbot",
    "LinkedInBot",
    "WhatsApp",
    "TelegramBot",
    "Slackbot",
    "Pinterestbot",
    // Archives and SEO crawlers
    "ia_archiver",
    "archive.org_bot",
    "AhrefsBot",
    "SemrushBot",
];

/// Returns the matched signature, if the User-Agent belongs to a crawler.
pub fn crawler_signature(user_agent: Option<&str>) -> Option<&'static str> {
    let ua = user_agent?;
    if ua.is_empty() {
        return None;
    }
    CRAWLER_SIGNATURES.iter().copied().find(|sig| ua.contains(sig))
}

pub fn is_crawler(user_agent: Option<&str>) -> bool {
    crawler_signature(user_agent).is_some()
}
