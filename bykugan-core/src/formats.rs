//! Media type constants and encoding negotiation
//!
//! Centralizes the recording mime types and the order in which they are
//! tried. Everything that needs to pick an encoding goes through here.

use tracing::debug;

/// Recording mime type constants
pub mod mime {
    /// WebM container, VP9 video (best compression)
    pub const WEBM_VP9: &str = "video/webm;codecs=vp9";
    /// WebM container, VP8 video (broad compatibility)
    pub const WEBM_VP8: &str = "video/webm;codecs=vp8";
    /// WebM container, platform-chosen codec
    pub const WEBM: &str = "video/webm";
    /// MP4 container, platform-chosen codec
    pub const MP4: &str = "video/mp4";
}

/// Encodings tried in order when the caller did not request a supported one
///
/// Compression efficiency first, compatibility as fallback. The order is
/// part of the observable behavior and must stay stable.
pub const PREFERRED_MIME_TYPES: [&str; 4] = [mime::WEBM_VP9, mime::WEBM_VP8, mime::WEBM, mime::MP4];

/// Pick the encoding for a new recording
///
/// Returns the requested type when the platform supports it, else the first
/// supported entry of [`PREFERRED_MIME_TYPES`]. `None` means the encoder
/// should be created without an explicit type.
pub fn negotiate_mime_type<F>(requested: Option<&str>, supports: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    negotiate_with_order(requested, &PREFERRED_MIME_TYPES, supports)
}

/// Same as [`negotiate_mime_type`] with an explicit preference order
pub fn negotiate_with_order<F>(requested: Option<&str>, order: &[&str], supports: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    if let Some(requested) = requested.filter(|r| !r.trim().is_empty()) {
        if supports(requested) {
            debug!("Using requested mime type {}", requested);
            return Some(requested.to_string());
        }
        debug!("Requested mime type {} not supported, falling back", requested);
    }

    let chosen = order.iter().find(|candidate| supports(**candidate)).map(|s| s.to_string());
    match &chosen {
        Some(mime) => debug!("Negotiated mime type {}", mime),
        None => debug!("No preferred mime type supported, deferring to platform default"),
    }
    chosen
}

/// Container part of a mime type, without codec parameters
pub fn container(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or(mime_type).trim()
}

/// File extension matching a mime type's container
pub fn file_extension(mime_type: &str) -> &'static str {
    match container(mime_type) {
        "video/mp4" => "mp4",
        "video/x-matroska" => "mkv",
        "video/ogg" => "ogv",
        _ => "webm",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_order() {
        assert_eq!(PREFERRED_MIME_TYPES[0], mime::WEBM_VP9);
        assert_eq!(PREFERRED_MIME_TYPES[3], mime::MP4);
    }

    #[test]
    fn test_everything_supported_picks_vp9() {
        assert_eq!(negotiate_mime_type(None, |_| true).as_deref(), Some(mime::WEBM_VP9));
    }

    #[test]
    fn test_nothing_supported() {
        assert_eq!(negotiate_mime_type(Some(mime::MP4), |_| false), None);
    }

    #[test]
    fn test_blank_request_ignored() {
        let chosen = negotiate_mime_type(Some("  "), |m| m == mime::WEBM);
        assert_eq!(chosen.as_deref(), Some(mime::WEBM));
    }

    #[test]
    fn test_container() {
        assert_eq!(container(mime::WEBM_VP9), "video/webm");
        assert_eq!(container(mime::MP4), "video/mp4");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension(mime::WEBM_VP8), "webm");
        assert_eq!(file_extension("video/mp4;codecs=avc1"), "mp4");
        assert_eq!(file_extension("application/octet-stream"), "webm");
    }
}
