//! Acceptance checks applied to every candidate before it is downloaded

use crate::models::{ImageFilter, Resolution};

/// Exact membership in the filter's allow-list
pub fn is_content_type_allowed(content_type: &str, filter: &ImageFilter) -> bool {
    filter
        .allowed_content_types
        .iter()
        .any(|allowed| allowed == content_type)
}

/// Decide whether an image may be kept.
///
/// Missing URL, resolution or content type always fails. Resolution bounds
/// are inclusive on both ends.
pub fn is_image_valid(
    url: Option<&str>,
    resolution: Option<Resolution>,
    content_type: Option<&str>,
    filter: &ImageFilter,
) -> bool {
    let (Some(url), Some(resolution), Some(content_type)) = (url, resolution, content_type) else {
        return false;
    };
    if url.is_empty() || content_type.is_empty() {
        return false;
    }

    is_content_type_allowed(content_type, filter)
        && resolution.is_within(filter.min_resolution, filter.max_resolution)
}
