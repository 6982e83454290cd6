use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while parsing a `Content-Type` value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaTypeError {
    #[error("media type is empty")]
    Empty,

    #[error("media type `{0}` has no subtype")]
    MissingSubtype(String),

    #[error("invalid token `{0}` in media type")]
    InvalidToken(String),

    #[error("invalid media type parameter `{0}`")]
    InvalidParameter(String),
}

/// A parsed `type/subtype; key=value` content type.
///
/// Type, subtype and parameter names are lowercased on parse; parameter
/// values keep their case with surrounding quotes removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    type_: String,
    subtype: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    pub fn parse(s: &str) -> Result<Self, MediaTypeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MediaTypeError::Empty);
        }

        let mut parts = s.split(';');
        // split always yields at least one item
        let essence = parts.next().unwrap_or_default().trim();
        let (type_, subtype) = essence
            .split_once('/')
            .ok_or_else(|| MediaTypeError::MissingSubtype(essence.to_string()))?;
        let (type_, subtype) = (type_.trim(), subtype.trim());
        if subtype.is_empty() {
            return Err(MediaTypeError::MissingSubtype(essence.to_string()));
        }
        for token in [type_, subtype] {
            if !is_token(token) {
                return Err(MediaTypeError::InvalidToken(token.to_string()));
            }
        }

        let mut params = Vec::new();
        for raw in parts {
            let raw = raw.trim();
            // Tolerate a trailing `;`
            if raw.is_empty() {
                continue;
            }
            let (name, value) = raw
                .split_once('=')
                .ok_or_else(|| MediaTypeError::InvalidParameter(raw.to_string()))?;
            let name = name.trim();
            if !is_token(name) {
                return Err(MediaTypeError::InvalidParameter(raw.to_string()));
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            params.push((name.to_ascii_lowercase(), value.to_string()));
        }

        Ok(Self {
            type_: type_.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params,
        })
    }

    pub fn octet_stream() -> Self {
        Self {
            type_: "application".to_string(),
            subtype: "octet-stream".to_string(),
            params: Vec::new(),
        }
    }

    pub fn type_(&self) -> &str {
        &self.type_
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Looks up a parameter by case-insensitive name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn charset(&self) -> Option<&str> {
        self.param("charset")
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (name, value) in &self.params {
            if is_token(value) {
                write!(f, "; {}={}", name, value)?;
            } else {
                write!(f, "; {}=\"{}\"", name, value)?;
            }
        }
        Ok(())
    }
}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// RFC 7230 `token`: one or more tchars.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

#[derive(Debug, Clone)]
pub struct AuthenticationInfo {
    pub username: String,
    pub password: String,
}

/// What the server answered to a successful upload.
#[derive(Debug, Clone)]
pub struct UploadResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request body failed: {0}")]
    Body(std::io::Error),

    #[error("server rejected upload with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("body writer task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("invalid header: {0}")]
    InvalidHeader(String),
}
