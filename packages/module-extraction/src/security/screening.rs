//! URL screening before any fetch is attempted.
//!
//! Rejects URLs that are unparsable, point at internal infrastructure
//! (SSRF protection), or obviously aren't documentation pages.

use std::collections::HashSet;
use std::net::IpAddr;
use url::Url;

use crate::error::{SecurityError, SecurityResult};
use crate::types::report::SkipReason;

/// Path and extension fragments that mark non-documentation URLs.
const NON_DOCUMENT_PATTERNS: &[&str] = &[
    // downloads
    ".zip", ".tar.gz", ".tar.bz2", ".pdf", ".doc", ".docx",
    "/archives/", "/download/", "/downloads/", "/releases/",
    // machine endpoints
    "/api/", "/json", "/xml", "/rss",
    // media
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".mp4", ".mp3",
    // account pages
    "/search", "/login", "/register", "/logout", "/admin",
];

/// URL validator for SSRF protection and documentation screening.
///
/// Blocks:
/// - Internal services (localhost, 127.0.0.1)
/// - Private IP ranges (10.x, 172.16.x, 192.168.x)
/// - Cloud metadata services (169.254.x)
/// - Non-HTTP(S) schemes (file://, ftp://)
#[derive(Debug, Clone)]
pub struct UrlValidator {
    allowed_schemes: HashSet<String>,
    blocked_hosts: HashSet<String>,
    blocked_cidrs: Vec<ipnet::IpNet>,
    /// Hosts that bypass the host and CIDR checks
    allowed_hosts: HashSet<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlValidator {
    /// Create a validator with the default blocklists.
    pub fn new() -> Self {
        let blocked_cidrs = [
            "10.0.0.0/8",
            "172.16.0.0/12",
            "192.168.0.0/16",
            "169.254.0.0/16", // link-local / cloud metadata
            "127.0.0.0/8",
            "0.0.0.0/8",
            "::1/128",
            "fc00::/7",
            "fe80::/10",
        ]
        .iter()
        .filter_map(|cidr| cidr.parse().ok())
        .collect();

        Self {
            allowed_schemes: ["http", "https"].into_iter().map(String::from).collect(),
            blocked_hosts: [
                "localhost",
                "metadata.google.internal",
                "metadata.gke.internal",
                "instance-data",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            blocked_cidrs,
            allowed_hosts: HashSet::new(),
        }
    }

    /// Add an allowed host (bypasses host and CIDR checks).
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.insert(host.into());
        self
    }

    /// Block an additional host.
    pub fn block_host(mut self, host: impl Into<String>) -> Self {
        self.blocked_hosts.insert(host.into());
        self
    }

    /// Validate a URL for safety, returning the parsed form.
    pub fn validate(&self, url: &str) -> SecurityResult<Url> {
        let parsed = Url::parse(url)?;

        if !self.allowed_schemes.contains(parsed.scheme()) {
            return Err(SecurityError::DisallowedScheme(parsed.scheme().to_string()));
        }

        let host = parsed.host_str().ok_or(SecurityError::NoHost)?;
        if self.allowed_hosts.contains(host) {
            return Ok(parsed);
        }

        if self.blocked_hosts.contains(host) {
            return Err(SecurityError::BlockedHost(host.to_string()));
        }

        let bare = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare.parse::<IpAddr>() {
            if self.blocked_cidrs.iter().any(|cidr| cidr.contains(&ip)) {
                return Err(SecurityError::BlockedCidr(ip.to_string()));
            }
        }

        Ok(parsed)
    }

    /// Decide whether a URL should enter the pipeline at all.
    pub fn screen(&self, url: &str) -> Result<Url, SkipReason> {
        match self.validate(url) {
            Ok(parsed) if is_non_document_url(parsed.as_str()) => Err(SkipReason::NonDocumentUrl),
            Ok(parsed) => Ok(parsed),
            Err(SecurityError::UrlParse(_))
            | Err(SecurityError::DisallowedScheme(_))
            | Err(SecurityError::NoHost) => Err(SkipReason::InvalidUrl),
            Err(SecurityError::BlockedHost(_)) | Err(SecurityError::BlockedCidr(_)) => {
                Err(SkipReason::BlockedUrl)
            }
        }
    }
}

/// Downloads, media, API endpoints and account pages.
pub fn is_non_document_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    NON_DOCUMENT_PATTERNS.iter().any(|p| lower.contains(p))
}

/// `scheme://host[:port]` of a URL.
pub fn origin(url: &Url) -> String {
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), url.host_str().unwrap_or(""), port),
        None => format!("{}://{}", url.scheme(), url.host_str().unwrap_or("")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_localhost() {
        let validator = UrlValidator::new();
        assert!(validator.validate("http://localhost/").is_err());
        assert!(validator.validate("http://127.0.0.1/").is_err());
        assert!(validator.validate("http://[::1]/").is_err());
    }

    #[test]
    fn test_blocks_private_ips() {
        let validator = UrlValidator::new();
        assert!(validator.validate("http://10.0.0.1/").is_err());
        assert!(validator.validate("http://172.16.0.1/").is_err());
        assert!(validator.validate("http://192.168.1.1/").is_err());
        assert!(validator.validate("http://169.254.169.254/").is_err());
    }

    #[test]
    fn test_blocks_non_http() {
        let validator = UrlValidator::new();
        assert!(validator.validate("file:///etc/passwd").is_err());
        assert!(validator.validate("ftp://example.com/").is_err());
    }

    #[test]
    fn test_allowed_hosts_bypass() {
        let validator = UrlValidator::new().allow_host("127.0.0.1");
        assert!(validator.validate("http://127.0.0.1:8080/docs").is_ok());
    }

    #[test]
    fn test_screen_reasons() {
        let validator = UrlValidator::new();
        assert!(validator.screen("https://docs.python.org/3/").is_ok());
        assert_eq!(validator.screen("not a url"), Err(SkipReason::InvalidUrl));
        assert_eq!(validator.screen("ftp://example.com/"), Err(SkipReason::InvalidUrl));
        assert_eq!(validator.screen("http://10.1.2.3/docs"), Err(SkipReason::BlockedUrl));
        assert_eq!(
            validator.screen("https://example.com/manual.pdf"),
            Err(SkipReason::NonDocumentUrl)
        );
        assert_eq!(
            validator.screen("https://example.com/login"),
            Err(SkipReason::NonDocumentUrl)
        );
    }

    #[test]
    fn test_origin() {
        let url = Url::parse("https://support.example.com/hc/en-us?x=1").unwrap();
        assert_eq!(origin(&url), "https://support.example.com");

        let url = Url::parse("http://127.0.0.1:9000/path").unwrap();
        assert_eq!(origin(&url), "http://127.0.0.1:9000");
    }
}
