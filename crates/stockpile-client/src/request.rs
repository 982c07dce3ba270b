//! Request descriptions and outcomes.

use serde_json::Value;

use stockpile_core::signature::RequestSignature;

/// HTTP methods the backend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Idempotent read; eligible for response caching.
    Get,
    /// Creation or action; deduplicated while in flight.
    Post,
    /// Replacement; deduplicated while in flight.
    Put,
    /// Removal; deduplicated while in flight.
    Delete,
}

impl Method {
    /// Returns `true` for methods whose responses may be cached and which
    /// skip in-flight deduplication.
    #[must_use]
    pub fn is_idempotent(self) -> bool {
        matches!(self, Self::Get)
    }

    /// The method's wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One part of a multipart upload.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Form field name.
    pub name: String,
    /// File name reported to the server.
    pub file_name: String,
    /// MIME type of the content.
    pub mime: String,
    /// The content itself.
    pub bytes: Vec<u8>,
}

/// An owned multipart form. Parts are owned bytes rather than a reqwest
/// form so a retried request can rebuild the form for its second attempt.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    /// Plain text fields.
    pub fields: Vec<(String, String)>,
    /// File parts.
    pub files: Vec<FilePart>,
}

impl MultipartForm {
    /// Adds a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Adds a file part.
    #[must_use]
    pub fn file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }

    pub(crate) fn to_form(&self) -> reqwest::multipart::Form {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        for file in &self.files {
            let mut part = reqwest::multipart::Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone());
            if let Ok(with_mime) = part.mime_str(&file.mime) {
                part = with_mime;
            } else {
                part = reqwest::multipart::Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone());
            }
            form = form.part(file.name.clone(), part);
        }
        form
    }
}

/// Request payload.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// JSON body, serialized with `Content-Type: application/json`.
    Json(Value),
    /// Multipart body, encoded by reqwest and left untouched by the JSON
    /// serialization step.
    Multipart(MultipartForm),
}

/// Per-request cache override.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    /// Whether a GET may be served from / stored into the cache.
    pub enabled: bool,
    /// Entry lifetime override; `None` uses the client default.
    pub ttl: Option<std::time::Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: None,
        }
    }
}

impl CachePolicy {
    /// A policy that bypasses the cache entirely.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ttl: None,
        }
    }
}

/// Description of one request through the pipeline.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the configured base URL.
    pub path: String,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Request payload.
    pub body: RequestBody,
    /// Cache behavior for GET requests.
    pub cache: CachePolicy,
}

impl RequestSpec {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            cache: CachePolicy::default(),
        }
    }

    /// A GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// A POST request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// A PUT request.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// A DELETE request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Sets a multipart body.
    #[must_use]
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Bypasses the response cache for this request.
    #[must_use]
    pub fn no_cache(mut self) -> Self {
        self.cache = CachePolicy::disabled();
        self
    }

    /// Overrides the cache entry lifetime for this request.
    #[must_use]
    pub fn cache_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.cache.ttl = Some(ttl);
        self
    }

    /// Canonical identity of this request, used for caching and
    /// deduplication. Multipart payload bytes are not part of the identity:
    /// two concurrent uploads to the same path with the same parameters are
    /// duplicates.
    #[must_use]
    pub fn signature(&self) -> RequestSignature {
        let body = match &self.body {
            RequestBody::Json(value) => Some(value),
            RequestBody::Empty | RequestBody::Multipart(_) => None,
        };
        RequestSignature::compute(self.method.as_str(), &self.path, &self.query, body)
    }
}

/// Result of a coordinated request.
///
/// Supersession is a no-op signal, not an error: a request cancelled by its
/// own newer duplicate resolves here so callers can ignore it silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The decoded `data` payload of a successful envelope.
    Payload(Value),
    /// The request was cancelled by a newer identical request.
    Superseded,
}

impl Outcome {
    /// The payload, or `None` for a superseded request.
    #[must_use]
    pub fn payload(self) -> Option<Value> {
        match self {
            Self::Payload(value) => Some(value),
            Self::Superseded => None,
        }
    }

    /// Returns `true` when the request was superseded.
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}
