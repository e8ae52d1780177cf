use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{MediaId, UploadDescriptor};

/// Most images a single post may carry.
pub const POST_MEDIA_LIMIT: usize = 4;

fn groupable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^image/(png|jpe?g)").expect("valid regex"))
}

/// PNG and JPEG may share a post; anything else (GIF etc.) rides alone.
pub fn is_groupable(mime_type: &str) -> bool {
    groupable_re().is_match(mime_type)
}

/// Partition uploads into per-post media groups, preserving caller order.
///
/// A group closes as soon as it reaches the size ceiling (1 without batching,
/// [`POST_MEDIA_LIMIT`] with). A non-groupable item closes the open group and
/// then forms a group of its own, so GIF-class media never share a post.
pub fn plan_batches(descriptors: &[UploadDescriptor], batch: bool) -> Vec<Vec<MediaId>> {
    let limit = if batch { POST_MEDIA_LIMIT } else { 1 };

    let mut groups = Vec::new();
    let mut current: Vec<MediaId> = Vec::new();
    for d in descriptors {
        if !is_groupable(&d.mime_type) {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
            groups.push(vec![d.media_id.clone()]);
            continue;
        }
        current.push(d.media_id.clone());
        if current.len() >= limit {
            groups.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}
