//! Fakes for the ports, shared by the unit tests.

use std::{
    io::{Cursor, Read},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    errors::Error,
    ports::{Attachment, HttpRequest, HttpResponse, Method, RequestSigner, Transport},
    Result,
};

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync>;

/// Transport answering by URL substring; first registered match wins. Every request is recorded.
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: Mutex<Vec<(String, Responder)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn route(
        &self,
        fragment: &str,
        f: impl Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
    ) {
        self.routes
            .lock()
            .unwrap()
            .push((fragment.to_string(), Box::new(f)));
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, fragment: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, req: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(req.clone());
        let routes = self.routes.lock().unwrap();
        for (fragment, f) in routes.iter() {
            if req.url.contains(fragment.as_str()) {
                return f(&req);
            }
        }
        Err(Error::Transport(format!("no route for {}", req.url)))
    }
}

pub(crate) fn json_response(status: u16, body: Value) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("content-type".into(), "application/json".into())],
        body: body.to_string().into_bytes(),
    }
}

pub(crate) struct FixedSigner;

impl RequestSigner for FixedSigner {
    fn authorization(&self, _method: Method, _url: &str, _params: &[(String, String)]) -> String {
        "OAuth test".to_string()
    }
}

/// In-memory attachment; `data == None` simulates a file that disappears before reading.
pub(crate) struct MemoryAttachment {
    name: String,
    mime_type: String,
    path: PathBuf,
    accessible: bool,
    data: Option<Vec<u8>>,
}

impl MemoryAttachment {
    pub(crate) fn new(name: &str, mime_type: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            path: PathBuf::from(format!("/mem/{name}")),
            accessible: true,
            data: Some(data.to_vec()),
        }
    }

    pub(crate) fn unreadable(name: &str, mime_type: &str) -> Self {
        Self {
            data: None,
            ..Self::new(name, mime_type, b"")
        }
    }

    pub(crate) fn missing(name: &str, mime_type: &str) -> Self {
        Self {
            accessible: false,
            data: None,
            ..Self::new(name, mime_type, b"")
        }
    }
}

impl Attachment for MemoryAttachment {
    fn is_accessible(&self) -> bool {
        self.accessible
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + Send + '_>> {
        match &self.data {
            Some(d) => Ok(Box::new(Cursor::new(d.as_slice()))),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "gone",
            )),
        }
    }
}
