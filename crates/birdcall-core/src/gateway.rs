use std::{fmt, io::Read, sync::Arc};

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    ports::{
        Attachment, HttpRequest, Method, MultipartFile, RequestBody, RequestSigner, Transport,
    },
    rate_limit::RateLimiter,
    Result,
};

/// Multipart field the upload endpoint expects the file under.
const MEDIA_FIELD: &str = "media";

/// What to put on the wire for one request.
pub enum Payload<'a> {
    None,
    /// Appended to the URL as a query string (lookups).
    Query(Vec<(String, String)>),
    Json(Value),
    Form(Vec<(String, String)>),
    Media(&'a dyn Attachment),
}

impl fmt::Debug for Payload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::None => f.write_str("None"),
            Payload::Query(q) => f.debug_tuple("Query").field(q).finish(),
            Payload::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Payload::Form(p) => f.debug_tuple("Form").field(p).finish(),
            Payload::Media(a) => f.debug_tuple("Media").field(&a.path()).finish(),
        }
    }
}

/// Outcome of one request. `ok == false` is an ordinary result, never an error.
#[derive(Clone, Debug, PartialEq)]
pub struct GatewayResponse {
    pub ok: bool,
    pub body: Value,
}

impl GatewayResponse {
    fn failed() -> Self {
        Self {
            ok: false,
            body: Value::Object(Map::new()),
        }
    }
}

/// One `errors[]` entry of a rejected request.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "Error Code {code}: ")?,
            None => f.write_str("Error Code unk: ")?,
        }
        f.write_str(self.message.as_deref().unwrap_or("None"))
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    errors: Vec<ApiError>,
}

/// Best-effort extraction of `errors[].{code,message}`; any other shape yields nothing.
pub fn api_errors(body: &Value) -> Vec<ApiError> {
    ErrorEnvelope::deserialize(body)
        .map(|e| e.errors)
        .unwrap_or_default()
}

/// Issues single authenticated requests and keeps the rate-limit state current.
///
/// Methods take `&mut self`: one gateway serves one caller at a time, so the
/// throttle window can never be bypassed by an interleaved request on the same instance.
pub struct HttpGateway {
    transport: Arc<dyn Transport>,
    signer: Arc<dyn RequestSigner>,
    rate: RateLimiter,
    user_agent: String,
}

impl HttpGateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        signer: Arc<dyn RequestSigner>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            signer,
            rate: RateLimiter::new(),
            user_agent: user_agent.into(),
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate
    }

    pub async fn send(&mut self, method: Method, url: &str, payload: Payload<'_>) -> GatewayResponse {
        debug!("Twitter {method} URL: {url}");
        debug!("Twitter Payload: {payload:?}");

        if let Some(wait) = self.rate.should_wait(Utc::now()) {
            info!("rate limit exhausted; waiting {:.1}s", wait.as_secs_f64());
            sleep(wait).await;
        }

        let mut headers = vec![("User-Agent".to_string(), self.user_agent.clone())];
        let mut signed_params: Vec<(String, String)> = Vec::new();
        let mut full_url = url.to_string();

        let body = match payload {
            Payload::None => RequestBody::Empty,
            Payload::Query(params) => {
                match Url::parse_with_params(url, params.iter()) {
                    Ok(u) => full_url = u.to_string(),
                    Err(e) => {
                        warn!("Invalid Twitter {method} URL {url}: {e}");
                        return GatewayResponse::failed();
                    }
                }
                RequestBody::Empty
            }
            Payload::Json(value) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                RequestBody::Json(value.to_string())
            }
            Payload::Form(params) => {
                signed_params = params.clone();
                RequestBody::Form(params)
            }
            Payload::Media(attachment) => match read_media(attachment) {
                Ok(file) => RequestBody::Multipart(file),
                Err(e) => {
                    warn!(
                        "An I/O error occurred while handling {}.",
                        attachment.path().display()
                    );
                    debug!("I/O Exception: {e}");
                    return GatewayResponse::failed();
                }
            },
        };

        let auth = self.signer.authorization(method, &full_url, &signed_params);
        headers.push(("Authorization".to_string(), auth));

        let req = HttpRequest {
            method,
            url: full_url,
            headers,
            body,
        };

        let resp = match self.transport.execute(req).await {
            Ok(r) => r,
            Err(e) => {
                warn!("Exception received when sending Twitter {method} to {url}");
                debug!("Socket Exception: {e}");
                return GatewayResponse::failed();
            }
        };

        self.rate.observe(&resp);

        let body = serde_json::from_slice::<Value>(&resp.body)
            .unwrap_or_else(|_| Value::Object(Map::new()));

        if !resp.is_success() {
            warn!(
                "Failed to send Twitter {method} to {url}: error={}.",
                resp.status
            );
            debug!(
                "Response Details:\r\n{}",
                String::from_utf8_lossy(&resp.body)
            );
            for err in api_errors(&body) {
                debug!("{err}");
            }
            return GatewayResponse { ok: false, body };
        }

        GatewayResponse { ok: true, body }
    }
}

/// Read the whole attachment; the reader is dropped (and the file closed) before returning.
fn read_media(attachment: &dyn Attachment) -> Result<MultipartFile> {
    let mut bytes = Vec::new();
    {
        let mut reader = attachment.open()?;
        reader.read_to_end(&mut bytes)?;
    }
    Ok(MultipartFile {
        field: MEDIA_FIELD.to_string(),
        file_name: attachment.name().to_string(),
        mime_type: attachment.mime_type().to_string(),
        bytes,
    })
}
