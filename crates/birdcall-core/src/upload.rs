use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::{
    domain::{MediaId, UploadDescriptor},
    gateway::{HttpGateway, Payload},
    ports::{Attachment, Method},
};

fn image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^image/").expect("valid regex"))
}

/// Why an upload pass gave up on the whole dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadAbort {
    /// The attachment could not be accessed at all.
    Unavailable(String),
    /// The upload request failed or the server rejected it.
    Rejected(String),
}

/// Upload every usable attachment, in order.
///
/// Non-image attachments and responses without a media id are skipped. An
/// inaccessible attachment or a failed upload request aborts the pass: nothing
/// should be sent with a silently missing file.
pub async fn upload_all(
    gateway: &mut HttpGateway,
    url: &str,
    attachments: &[&dyn Attachment],
) -> Result<Vec<UploadDescriptor>, UploadAbort> {
    let mut uploaded = Vec::new();

    for (no, attachment) in attachments.iter().enumerate() {
        let path = attachment.path().display().to_string();

        if !attachment.is_accessible() {
            error!("Could not access attachment {path}.");
            return Err(UploadAbort::Unavailable(path));
        }

        if !image_re().is_match(attachment.mime_type()) {
            warn!("Ignoring unsupported Twitter attachment {path}.");
            continue;
        }

        debug!("Preparing Twitter attachment {path}");

        let resp = gateway
            .send(Method::Post, url, Payload::Media(*attachment))
            .await;
        if !resp.ok {
            return Err(UploadAbort::Rejected(path));
        }

        let file_name = if attachment.name().is_empty() {
            format!("file{:03}.dat", no + 1)
        } else {
            attachment.name().to_string()
        };

        let Some(media_id) = media_id(&resp.body) else {
            debug!(
                "Could not attach the file to Twitter: {file_name} (mime={})",
                attachment.mime_type()
            );
            continue;
        };

        uploaded.push(UploadDescriptor {
            media_id,
            file_name,
            mime_type: attachment.mime_type().to_string(),
            path: attachment.path().to_path_buf(),
        });
    }

    Ok(uploaded)
}

fn media_id(body: &Value) -> Option<MediaId> {
    if let Some(s) = body.get("media_id_string").and_then(Value::as_str) {
        if !s.is_empty() {
            return Some(MediaId(s.to_string()));
        }
    }
    match body.get("media_id")? {
        Value::Number(n) if n.as_u64().is_some_and(|v| v > 0) => Some(MediaId(n.to_string())),
        Value::String(s) if !s.is_empty() => Some(MediaId(s.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{json_response, FakeTransport, FixedSigner, MemoryAttachment};
    use serde_json::json;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    const UPLOAD: &str = "https://upload.test/1.1/media/upload.json";

    fn gateway(t: &Arc<FakeTransport>) -> HttpGateway {
        HttpGateway::new(t.clone(), Arc::new(FixedSigner), "test")
    }

    fn sequential_ids(t: &FakeTransport) {
        let n = AtomicUsize::new(100);
        t.route("media/upload", move |_| {
            let id = n.fetch_add(1, Ordering::SeqCst);
            Ok(json_response(200, json!({"media_id": id, "media_id_string": id.to_string()})))
        });
    }

    #[tokio::test]
    async fn uploads_images_in_order_and_skips_others() {
        let t = FakeTransport::new();
        sequential_ids(&t);
        let mut gw = gateway(&t);

        let a = MemoryAttachment::new("a.png", "image/png", b"a");
        let doc = MemoryAttachment::new("notes.txt", "text/plain", b"n");
        let b = MemoryAttachment::new("", "image/gif", b"b");
        let list: Vec<&dyn Attachment> = vec![&a, &doc, &b];

        let got = upload_all(&mut gw, UPLOAD, &list).await.unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].media_id, MediaId("100".into()));
        assert_eq!(got[0].file_name, "a.png");
        assert_eq!(got[1].media_id, MediaId("101".into()));
        assert_eq!(got[1].file_name, "file003.dat");
        assert_eq!(got[1].mime_type, "image/gif");
        assert_eq!(t.count("media/upload"), 2);
    }

    #[tokio::test]
    async fn missing_media_id_is_skipped() {
        let t = FakeTransport::new();
        let n = Arc::new(AtomicUsize::new(0));
        let c = n.clone();
        t.route("media/upload", move |_| {
            if c.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(json_response(200, json!({"expires_after_secs": 86400})))
            } else {
                Ok(json_response(200, json!({"media_id": 7})))
            }
        });
        let mut gw = gateway(&t);

        let a = MemoryAttachment::new("a.png", "image/png", b"a");
        let b = MemoryAttachment::new("b.png", "image/png", b"b");
        let got = upload_all(&mut gw, UPLOAD, &[&a, &b]).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].media_id, MediaId("7".into()));
        assert_eq!(got[0].file_name, "b.png");
    }

    #[tokio::test]
    async fn inaccessible_attachment_aborts_before_any_upload() {
        let t = FakeTransport::new();
        sequential_ids(&t);
        let mut gw = gateway(&t);

        let gone = MemoryAttachment::missing("gone.png", "image/png");
        let a = MemoryAttachment::new("a.png", "image/png", b"a");
        let r = upload_all(&mut gw, UPLOAD, &[&gone, &a]).await;
        assert_eq!(r, Err(UploadAbort::Unavailable("/mem/gone.png".into())));
        assert!(t.requests().is_empty());
    }

    #[tokio::test]
    async fn rejected_upload_aborts() {
        let t = FakeTransport::new();
        t.route("media/upload", |_| Ok(json_response(400, json!({}))));
        let mut gw = gateway(&t);

        let a = MemoryAttachment::new("a.png", "image/png", b"a");
        let r = upload_all(&mut gw, UPLOAD, &[&a]).await;
        assert!(matches!(r, Err(UploadAbort::Rejected(_))));
    }

    #[test]
    fn media_id_prefers_string_form() {
        assert_eq!(
            media_id(&json!({"media_id": 710511363345354753u64, "media_id_string": "710511363345354753"})),
            Some(MediaId("710511363345354753".into()))
        );
        assert_eq!(media_id(&json!({"media_id": 5})), Some(MediaId("5".into())));
        assert_eq!(media_id(&json!({"media_id": 0})), None);
        assert_eq!(media_id(&json!({})), None);
    }
}
