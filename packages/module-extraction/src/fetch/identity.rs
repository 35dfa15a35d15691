//! Browser identities for the HTTP strategies.

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

/// Current desktop and mobile browser user agents.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.4; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
];

/// Hosts known to sit behind aggressive bot protection.
pub const DIFFICULT_DOMAINS: &[&str] = &[
    "instagram.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "linkedin.com",
    "discord.com",
    "slack.com",
    "notion.so",
    "neo.space",
    "zendesk.com",
    "cloudflare.com",
    "akamai.com",
    "fastly.com",
];

/// Pick a user agent at random.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Whether the URL's host is on the difficult-site list.
pub fn is_difficult_site(url: &str) -> bool {
    let host = match Url::parse(url) {
        Ok(parsed) => parsed.host_str().unwrap_or_default().to_lowercase(),
        Err(_) => return false,
    };
    DIFFICULT_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
}

/// A random public-looking IPv4 address for forwarded-address headers.
pub fn random_forwarded_ip() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "{}.{}.{}.{}",
        rng.gen_range(11..=223),
        rng.gen_range(0..=255),
        rng.gen_range(0..=255),
        rng.gen_range(1..=254)
    )
}

/// Headers a desktop browser sends on a top-level navigation.
pub fn browser_headers(user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert(&mut headers, "user-agent", user_agent);
    insert(
        &mut headers,
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    );
    insert(&mut headers, "accept-language", "en-US,en;q=0.9");
    insert(&mut headers, "upgrade-insecure-requests", "1");
    headers
}

/// Browser headers plus the fetch-metadata set sent by modern browsers.
///
/// For difficult sites the request also claims to come from the site
/// itself.
pub fn stealth_headers(url: &str, user_agent: &str) -> HeaderMap {
    let mut headers = browser_headers(user_agent);
    insert(&mut headers, "cache-control", "max-age=0");
    insert(&mut headers, "dnt", "1");
    insert(&mut headers, "sec-fetch-dest", "document");
    insert(&mut headers, "sec-fetch-mode", "navigate");
    insert(&mut headers, "sec-fetch-site", "none");
    insert(&mut headers, "sec-fetch-user", "?1");

    if is_difficult_site(url) {
        if let Ok(parsed) = Url::parse(url) {
            let origin = crate::security::origin(&parsed);
            insert(&mut headers, "referer", &format!("{}/", origin));
            insert(&mut headers, "origin", &origin);
            insert(&mut headers, "x-requested-with", "XMLHttpRequest");
            insert(&mut headers, "sec-fetch-site", "same-origin");
        }
    }
    headers
}

/// Stealth headers plus a rotated forwarded address.
pub fn rotated_identity_headers(url: &str) -> HeaderMap {
    let mut headers = stealth_headers(url, random_user_agent());
    let ip = random_forwarded_ip();
    insert(&mut headers, "x-forwarded-for", &ip);
    insert(&mut headers, "x-real-ip", &ip);
    insert(&mut headers, "cf-connecting-ip", &ip);
    headers
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficult_sites() {
        assert!(is_difficult_site("https://acme.zendesk.com/hc/en-us"));
        assert!(is_difficult_site("https://www.notion.so/page"));
        assert!(!is_difficult_site("https://docs.rs/tokio"));
        assert!(!is_difficult_site("not a url"));
        assert!(!is_difficult_site("https://notzendesk.com/"));
    }

    #[test]
    fn test_stealth_headers_for_difficult_site() {
        let headers = stealth_headers("https://acme.zendesk.com/hc", USER_AGENTS[0]);
        assert_eq!(headers["origin"], "https://acme.zendesk.com");
        assert_eq!(headers["referer"], "https://acme.zendesk.com/");
        assert_eq!(headers["sec-fetch-site"], "same-origin");

        let plain = stealth_headers("https://docs.rs/", USER_AGENTS[0]);
        assert!(plain.get("origin").is_none());
        assert_eq!(plain["sec-fetch-site"], "none");
    }

    #[test]
    fn test_rotated_identity_sets_forwarded_ip() {
        let headers = rotated_identity_headers("https://docs.rs/");
        let ip = headers["x-forwarded-for"].to_str().unwrap();
        assert_eq!(ip.split('.').count(), 4);
        assert_eq!(headers["x-real-ip"], headers["x-forwarded-for"]);
        assert!(USER_AGENTS.contains(&headers["user-agent"].to_str().unwrap()));
    }
}
