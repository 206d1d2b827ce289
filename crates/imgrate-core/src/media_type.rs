//! Extension and MIME resolution for migrated images.
//!
//! Both functions are total: an unrecognizable input falls back to PNG,
//! so destination keys and upload content types can always be derived.

/// Derive a canonical file extension for an image, in priority order:
/// the URL's path extension (query ignored, case-insensitive), then the
/// declared content type, then `.png`.
pub fn extension_for(src: &str, content_type: Option<&str>) -> &'static str {
    if let Some(ext) = extension_from_path(src) {
        return ext;
    }

    if let Some(content_type) = content_type {
        match content_type {
            "image/jpeg" | "image/jpg" => return ".jpg",
            "image/png" => return ".png",
            "image/webp" => return ".webp",
            "image/gif" => return ".gif",
            "image/svg+xml" => return ".svg",
            _ => {}
        }
    }

    ".png"
}

/// MIME type for a destination key, derived from its extension.
/// Inverse of the table above; defaults to `image/png`.
pub fn mime_for_key(key: &str) -> &'static str {
    let ext = key.rsplit('.').next().unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "image/png",
    }
}

fn extension_from_path(src: &str) -> Option<&'static str> {
    // The query component never contributes an extension; relative or
    // otherwise unparseable locators fall back to a manual strip.
    let path = match url::Url::parse(src) {
        Ok(url) => url.path().to_string(),
        Err(_) => {
            let stripped = src.split(['?', '#']).next().unwrap_or(src);
            stripped.to_string()
        }
    };

    let ext = path.rsplit('.').next()?;
    if ext.len() == path.len() {
        return None;
    }

    match ext.to_ascii_lowercase().as_str() {
        "png" => Some(".png"),
        "jpg" => Some(".jpg"),
        "jpeg" => Some(".jpeg"),
        "webp" => Some(".webp"),
        "gif" => Some(".gif"),
        "svg" => Some(".svg"),
        _ => None,
    }
}
