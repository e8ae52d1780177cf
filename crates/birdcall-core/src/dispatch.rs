//! Top-level orchestration of one notification.
//!
//! `dispatch` runs: target check → uploads → (batch planning | recipient resolution)
//! → sequential sends → a single verdict. All requests go out one after another
//! through the dispatcher's own gateway; nothing runs in parallel.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{
    batch::plan_batches,
    config::{ApiEndpoints, Config},
    domain::{DispatchMode, MediaId, Targets, UploadDescriptor, UserId},
    endpoint::Endpoint,
    errors::Error,
    formatting::{fold_title, page_text, truncate_chars},
    gateway::{api_errors, HttpGateway, Payload},
    identity::IdentityResolver,
    oauth::OAuth1Signer,
    ports::{Attachment, Method, RequestSigner, Transport},
    upload::{upload_all, UploadAbort},
    Result,
};

/// Why a dispatch stopped before sending anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbortReason {
    /// Explicit targets were given and none of them were valid handles.
    InvalidTargets,
    /// An attachment could not be accessed.
    AttachmentUnavailable,
    /// An attachment upload request failed.
    UploadRejected,
    /// No recipient could be resolved to an account id.
    NoRecipients,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Sub-messages sent (or attempted).
    pub attempted: usize,
    pub failed: usize,
    pub aborted: Option<AbortReason>,
}

impl DispatchReport {
    fn aborted(reason: AbortReason) -> Self {
        Self {
            aborted: Some(reason),
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        self.aborted.is_none() && self.failed == 0
    }
}

/// Sends notifications for one account.
///
/// A dispatcher owns its rate-limit state and identity cache. Methods take
/// `&mut self`; share one across tasks only behind your own lock.
pub struct Dispatcher {
    endpoint: Endpoint,
    api: ApiEndpoints,
    gateway: HttpGateway,
    identities: IdentityResolver,
}

impl Dispatcher {
    pub fn new(
        endpoint: Endpoint,
        transport: Arc<dyn Transport>,
        api: ApiEndpoints,
        user_agent: impl Into<String>,
    ) -> Self {
        let signer = Arc::new(OAuth1Signer::new(endpoint.credentials.clone()));
        Self::with_signer(endpoint, transport, signer, api, user_agent)
    }

    pub fn with_signer(
        endpoint: Endpoint,
        transport: Arc<dyn Transport>,
        signer: Arc<dyn RequestSigner>,
        api: ApiEndpoints,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            endpoint,
            api,
            gateway: HttpGateway::new(transport, signer, user_agent),
            identities: IdentityResolver::new(),
        }
    }

    /// Build from `Config::url`; a missing or malformed URL is a config error.
    pub fn from_config(cfg: &Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let url = cfg
            .url
            .as_deref()
            .ok_or_else(|| Error::Config("BIRDCALL_URL is not set".to_string()))?;
        let endpoint = Endpoint::parse(url)?;
        Ok(Self::new(
            endpoint,
            transport,
            cfg.api.clone(),
            cfg.user_agent.clone(),
        ))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn identities(&self) -> &IdentityResolver {
        &self.identities
    }

    /// Send one notification; `true` only if every sub-message went through.
    pub async fn dispatch(
        &mut self,
        body: &str,
        title: &str,
        attachments: &[&dyn Attachment],
    ) -> bool {
        self.dispatch_report(body, title, attachments)
            .await
            .succeeded()
    }

    pub async fn dispatch_report(
        &mut self,
        body: &str,
        title: &str,
        attachments: &[&dyn Attachment],
    ) -> DispatchReport {
        if self.endpoint.targets.is_invalid() {
            warn!("No valid Twitter targets to notify.");
            return DispatchReport::aborted(AbortReason::InvalidTargets);
        }

        let mode = self.endpoint.mode;
        let body = truncate_chars(&fold_title(title, body), mode.body_max_len());

        let uploads = match upload_all(&mut self.gateway, &self.api.media_upload, attachments).await
        {
            Ok(u) => u,
            Err(UploadAbort::Unavailable(_)) => {
                return DispatchReport::aborted(AbortReason::AttachmentUnavailable)
            }
            Err(UploadAbort::Rejected(_)) => {
                return DispatchReport::aborted(AbortReason::UploadRejected)
            }
        };

        match mode {
            DispatchMode::PublicPost => self.send_posts(&body, &uploads).await,
            DispatchMode::DirectMessage => self.send_direct_messages(&body, &uploads).await,
        }
    }

    async fn send_posts(&mut self, body: &str, uploads: &[UploadDescriptor]) -> DispatchReport {
        let forms = post_forms(body, uploads, self.endpoint.batch);
        let total = forms.len();
        let mut report = DispatchReport::default();

        for (no, form) in forms.into_iter().enumerate() {
            let no = no + 1;
            report.attempted += 1;

            let resp = self
                .gateway
                .send(Method::Post, &self.api.post, Payload::Form(form))
                .await;

            if !resp.ok {
                report.failed += 1;
                for err in api_errors(&resp.body) {
                    debug!("Tweet [{no:02}/{total:02}] Details: {err}");
                }
                continue;
            }

            debug!("Tweet [{no:02}/{total:02}] Details: {}", post_link(&resp.body));
            info!("Sent [{no:02}/{total:02}] Twitter notification as public tweet.");
        }

        report
    }

    async fn send_direct_messages(
        &mut self,
        body: &str,
        uploads: &[UploadDescriptor],
    ) -> DispatchReport {
        let use_cache = self.endpoint.cache;
        let recipients = match &self.endpoint.targets {
            Targets::Users(handles) => {
                self.identities
                    .resolve_many(&mut self.gateway, &self.api.lookup, handles, use_cache)
                    .await
            }
            Targets::Myself | Targets::Invalid(_) => {
                self.identities
                    .resolve_self(&mut self.gateway, &self.api.whoami, use_cache)
                    .await
            }
        };

        if recipients.is_empty() {
            warn!("Failed to acquire user(s) to Direct Message via Twitter");
            return DispatchReport::aborted(AbortReason::NoRecipients);
        }

        let messages = dm_messages(body, uploads);
        let total = messages.len();
        let mut report = DispatchReport::default();

        for (no, (text, media)) in messages.iter().enumerate() {
            let no = no + 1;
            for (screen_name, user_id) in &recipients {
                report.attempted += 1;

                let payload = dm_payload(*user_id, text, media.as_ref());
                let resp = self
                    .gateway
                    .send(Method::Post, &self.api.direct_message, Payload::Json(payload))
                    .await;

                if !resp.ok {
                    report.failed += 1;
                    continue;
                }

                info!("Sent [{no:02}/{total:02}] Twitter DM notification to @{screen_name}.");
            }
        }

        report
    }
}

/// One form per post: the plain body, or one per media group with page markers.
fn post_forms(
    body: &str,
    uploads: &[UploadDescriptor],
    batch: bool,
) -> Vec<Vec<(String, String)>> {
    if uploads.is_empty() {
        return vec![vec![("status".to_string(), body.to_string())]];
    }

    let groups = plan_batches(uploads, batch);
    let total = groups.len();
    groups
        .into_iter()
        .enumerate()
        .map(|(i, group)| {
            let ids = group.iter().map(|m| m.0.as_str()).collect::<Vec<_>>().join(",");
            vec![
                ("status".to_string(), page_text(body, i, total)),
                ("media_ids".to_string(), ids),
            ]
        })
        .collect()
}

/// Direct messages carry at most one attachment each.
fn dm_messages(body: &str, uploads: &[UploadDescriptor]) -> Vec<(String, Option<MediaId>)> {
    if uploads.is_empty() {
        return vec![(body.to_string(), None)];
    }
    let total = uploads.len();
    uploads
        .iter()
        .enumerate()
        .map(|(i, u)| (page_text(body, i, total), Some(u.media_id.clone())))
        .collect()
}

fn dm_payload(recipient: UserId, text: &str, media: Option<&MediaId>) -> Value {
    let mut message_data = json!({ "text": text });
    if let Some(media) = media {
        message_data["attachment"] = json!({
            "type": "media",
            "media": { "id": media.0 },
        });
    }

    json!({
        "event": {
            "type": "message_create",
            "message_create": {
                "target": { "recipient_id": recipient.to_string() },
                "message_data": message_data,
            },
        },
    })
}

fn post_link(body: &Value) -> String {
    let name = body
        .get("user")
        .and_then(|u| u.get("screen_name"))
        .and_then(Value::as_str);
    let id = body.get("id_str").and_then(Value::as_str);
    match (name, id) {
        (Some(name), Some(id)) => format!("https://twitter.com/{name}/status/{id}"),
        _ => "unknown".to_string(),
    }
}
