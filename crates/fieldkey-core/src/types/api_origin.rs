//! API origin type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, InvalidInputError};

/// A validated base URL of the remote API or identity backend.
///
/// This type ensures the URL is absolute, uses HTTPS (or HTTP for loopback
/// hosts), has a host, and is normalized for endpoint construction.
///
/// # Example
///
/// ```
/// use fieldkey_core::ApiOrigin;
///
/// let api = ApiOrigin::new("https://API.Example.com/v1/").unwrap();
/// assert_eq!(api.host(), "api.example.com");
/// assert_eq!(api.endpoint("login"), "https://api.example.com/v1/login");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiOrigin {
    url: Url,
    host: String,
}

impl ApiOrigin {
    /// Create a new origin from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not valid or doesn't meet requirements.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| InvalidInputError::ApiOrigin {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        let host = Self::validate(&url, s)?;

        // Normalize: no trailing slash, no query or fragment
        let mut url = url;
        let trimmed = url.path().trim_end_matches('/').to_string();
        url.set_path(&trimmed);
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self { url, host })
    }

    /// Returns the URL of an endpoint below this origin.
    pub fn endpoint(&self, path: &str) -> String {
        // The URL crate always renders an empty root path as "/"
        let base = self.url.as_str().trim_end_matches('/');
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    /// Returns the lower-cased host name.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// True if `url` targets this origin's host, compared case-insensitively.
    /// URLs without a host never match.
    pub fn matches_host(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|h| h.eq_ignore_ascii_case(&self.host))
    }

    /// Returns the base URL as a string.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Returns the inner URL.
    pub fn as_url(&self) -> &Url {
        &self.url
    }

    fn validate(url: &Url, original: &str) -> Result<String, Error> {
        let invalid = |reason: &str| -> Error {
            InvalidInputError::ApiOrigin {
                value: original.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        if url.cannot_be_a_base() {
            return Err(invalid("must be an absolute URL"));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("must have a host"))?
            .to_ascii_lowercase();

        // HTTPS, or HTTP for loopback only
        let scheme = url.scheme();
        let is_loopback = matches!(host.as_str(), "localhost" | "127.0.0.1" | "[::1]");
        if scheme != "https" && !(scheme == "http" && is_loopback) {
            return Err(invalid("must use HTTPS (HTTP allowed only for localhost)"));
        }

        Ok(host)
    }
}

impl fmt::Display for ApiOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

impl FromStr for ApiOrigin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ApiOrigin {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.url.as_str())
    }
}

impl<'de> Deserialize<'de> for ApiOrigin {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ApiOrigin::new(&s).map_err(serde::de::Error::custom)
    }
}
