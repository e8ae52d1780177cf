//! reqwest adapter for the birdcall HTTP port.
//!
//! Timeouts and TLS verification are fixed at construction; every HTTP status is
//! returned as a response, only connection-level failures become errors.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use birdcall_core::{
    config::Config,
    errors::Error,
    ports::{HttpRequest, HttpResponse, Method, RequestBody, Transport},
    Result,
};

#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration, timeout: Duration, verify_tls: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self { http })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.connect_timeout, cfg.request_timeout, cfg.verify_tls)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, req: HttpRequest) -> Result<HttpResponse> {
        let mut builder = match req.method {
            Method::Get => self.http.get(&req.url),
            Method::Post => self.http.post(&req.url),
        };

        for (k, v) in &req.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }

        builder = match req.body {
            RequestBody::Empty => builder,
            RequestBody::Json(s) => builder.body(s),
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Multipart(file) => {
                let part = reqwest::multipart::Part::bytes(file.bytes)
                    .file_name(file.file_name)
                    .mime_str(&file.mime_type)
                    .map_err(|e| Error::Transport(format!("multipart error: {e}")))?;
                builder.multipart(reqwest::multipart::Form::new().part(file.field, part))
            }
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| Error::Transport(format!("request error: {e}")))?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("response read error: {e}")))?
            .to_vec();

        debug!("{} {} -> {status}", req.method, req.url);

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
