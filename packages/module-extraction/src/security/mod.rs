//! Credential handling and URL screening.

pub mod credentials;
pub mod screening;

pub use credentials::{ModelCredentials, SecretString};
pub use screening::{is_non_document_url, origin, UrlValidator};
