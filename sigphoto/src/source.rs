//! Which photo the signature renderer actually shows

use std::borrow::Cow;

use crate::image::NormalizedPhoto;

#[derive(Debug, Clone, PartialEq)]
pub enum PhotoReference {
    Upload(NormalizedPhoto),
    RemoteUrl(String),
    /// Caller's placeholder, nothing else was available
    Default(String),
}

impl PhotoReference {
    /// Value for an `<img src>`
    pub fn src(&self) -> Cow<'_, str> {
        match self {
            PhotoReference::Upload(photo) => Cow::Owned(photo.to_data_uri()),
            PhotoReference::RemoteUrl(url) | PhotoReference::Default(url) => Cow::Borrowed(url),
        }
    }
}

/// A non-blank URL override beats any upload, an upload beats the placeholder
pub fn resolve(
    normalized: Option<&NormalizedPhoto>,
    url_override: &str,
    fallback_default: &str,
) -> PhotoReference {
    let url = url_override.trim();
    if !url.is_empty() {
        return PhotoReference::RemoteUrl(url.to_string());
    }

    match normalized {
        Some(photo) => PhotoReference::Upload(photo.clone()),
        None => PhotoReference::Default(fallback_default.to_string()),
    }
}
