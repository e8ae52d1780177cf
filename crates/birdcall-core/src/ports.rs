use std::{fmt, io::Read, path::Path};

use async_trait::async_trait;

use crate::Result;

// ============== HTTP ==============

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file part for a multipart upload. The bytes are read from the attachment
/// right before the request is built; no file handle outlives that read.
#[derive(Clone)]
pub struct MultipartFile {
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for MultipartFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartFile")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub enum RequestBody {
    Empty,
    Json(String),
    Form(Vec<(String, String)>),
    Multipart(MultipartFile),
}

#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    /// Full URL, including any query string.
    pub url: String,
    /// Extra headers; `Authorization` is always present.
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Hexagonal port for HTTP.
///
/// Timeout and TLS verification are fixed when the implementation is built. Connection,
/// DNS, TLS and timeout failures come back as `Err`; any HTTP status is an `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, req: HttpRequest) -> Result<HttpResponse>;
}

// ============== Signing ==============

/// Produces the `Authorization` header value for one request.
///
/// `params` holds the query and form-encoded body parameters; JSON and multipart
/// bodies contribute none.
pub trait RequestSigner: Send + Sync {
    fn authorization(&self, method: Method, url: &str, params: &[(String, String)]) -> String;
}

// ============== Attachments ==============

/// A local file handed to the dispatcher.
pub trait Attachment: Send + Sync {
    /// Whether the underlying content exists and can be read.
    fn is_accessible(&self) -> bool;
    fn mime_type(&self) -> &str;
    /// File name to report to the remote side; may be empty.
    fn name(&self) -> &str;
    fn path(&self) -> &Path;
    fn open(&self) -> std::io::Result<Box<dyn Read + Send + '_>>;
}
