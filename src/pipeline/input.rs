//! Input resolution: normalise a URL, local path, or pre-decoded image into
//! one in-memory raster.
//!
//! The input shape is decided exactly once, here, via the [`ImageInput`] sum
//! type; downstream stages only ever see a [`ResolvedImage`]. URL bodies are
//! decoded straight from memory — nothing is written to disk — and the fetch
//! is the only operation in the whole pipeline with a wall-clock timeout.

use crate::error::Page2DocError;
use image::DynamicImage;
use std::path::PathBuf;
use tracing::{debug, info};

/// Placeholder source identifier for images supplied already decoded.
pub const DECODED_SOURCE: &str = "<in-memory image>";

/// One conversion input, decided at the boundary.
pub enum ImageInput {
    /// Absolute URI with a scheme; fetched over HTTP.
    Url(String),
    /// Local filesystem path.
    Path(PathBuf),
    /// Already-decoded raster; accepted as-is.
    Decoded(DynamicImage),
}

impl ImageInput {
    /// Classify a raw string as URL or local path.
    ///
    /// Anything shaped `scheme://…` is treated as a URL (non-HTTP schemes
    /// then fail at fetch time with a transport error, matching the
    /// fetch-error contract). Empty strings mean "no input" and return
    /// `None`.
    pub fn from_str_input(raw: &str) -> Option<ImageInput> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if has_scheme(trimmed) {
            Some(ImageInput::Url(trimmed.to_string()))
        } else {
            Some(ImageInput::Path(PathBuf::from(trimmed)))
        }
    }

    /// The identifier logged for this input: the URL, the path, or a fixed
    /// placeholder for decoded images.
    pub fn source_id(&self) -> String {
        match self {
            ImageInput::Url(url) => url.clone(),
            ImageInput::Path(path) => path.display().to_string(),
            ImageInput::Decoded(_) => DECODED_SOURCE.to_string(),
        }
    }
}

/// A decoded page image plus the identifier it resolved from.
#[derive(Debug)]
pub struct ResolvedImage {
    pub image: DynamicImage,
    pub source: String,
}

/// True when the string starts with `scheme://`.
fn has_scheme(s: &str) -> bool {
    match s.find("://") {
        Some(idx) if idx > 0 => {
            let scheme = &s[..idx];
            scheme
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Resolve an optional input into a decoded image.
///
/// Absent input fails with `MissingInput`; each variant keeps its own error
/// shape so the boundary messages distinguish fetch, open, and decode
/// failures. Resolution logs the source identifier on success.
pub async fn resolve(
    input: Option<ImageInput>,
    fetch_timeout_secs: u64,
) -> Result<ResolvedImage, Page2DocError> {
    let input = input.ok_or(Page2DocError::MissingInput)?;
    let source = input.source_id();

    let image = match input {
        ImageInput::Url(url) => fetch_and_decode(&url, fetch_timeout_secs).await?,
        ImageInput::Path(path) => open_and_decode(&path).await?,
        ImageInput::Decoded(img) => img,
    };

    info!("Resolved input image: {}", source);
    Ok(ResolvedImage { image, source })
}

/// Fetch a URL with a bounded timeout and decode the body from memory.
async fn fetch_and_decode(url: &str, timeout_secs: u64) -> Result<DynamicImage, Page2DocError> {
    debug!("Fetching image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Page2DocError::UrlFetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Page2DocError::UrlFetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(Page2DocError::UrlFetch {
            url: url.to_string(),
            reason: format!("HTTP {}", status),
        });
    }

    let bytes = response.bytes().await.map_err(|e| Page2DocError::UrlFetch {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    image::load_from_memory(&bytes).map_err(|e| Page2DocError::UrlDecode {
        url: url.to_string(),
        detail: e.to_string(),
    })
}

/// Read and decode a local file.
async fn open_and_decode(path: &PathBuf) -> Result<DynamicImage, Page2DocError> {
    if !path.exists() {
        return Err(Page2DocError::FileNotFound { path: path.clone() });
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Page2DocError::FileOpen {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    image::load_from_memory(&bytes).map_err(|e| Page2DocError::FileDecode {
        path: path.display().to_string(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Write;

    #[test]
    fn scheme_detection() {
        assert!(has_scheme("https://example.com/a.png"));
        assert!(has_scheme("http://example.com/a.png"));
        assert!(has_scheme("ftp://example.com/a.png"));
        assert!(!has_scheme("/tmp/a.png"));
        assert!(!has_scheme("a.png"));
        assert!(!has_scheme("://nope"));
        assert!(!has_scheme(""));
    }

    #[test]
    fn from_str_classifies() {
        assert!(matches!(
            ImageInput::from_str_input("http://h/x.png"),
            Some(ImageInput::Url(_))
        ));
        assert!(matches!(
            ImageInput::from_str_input("page.png"),
            Some(ImageInput::Path(_))
        ));
        assert!(ImageInput::from_str_input("").is_none());
        assert!(ImageInput::from_str_input("   ").is_none());
    }

    #[test]
    fn decoded_source_is_placeholder() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255])));
        assert_eq!(ImageInput::Decoded(img).source_id(), DECODED_SOURCE);
    }

    #[tokio::test]
    async fn resolve_none_is_missing_input() {
        let err = resolve(None, 10).await.unwrap_err();
        assert!(matches!(err, Page2DocError::MissingInput));
    }

    #[tokio::test]
    async fn resolve_missing_file() {
        let input = ImageInput::Path(PathBuf::from("/definitely/not/here.png"));
        let err = resolve(Some(input), 10).await.unwrap_err();
        assert_eq!(err.to_string(), "Error: Image file not found.");
    }

    #[tokio::test]
    async fn resolve_non_image_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"this is not an image").unwrap();
        let input = ImageInput::Path(f.path().to_path_buf());
        let err = resolve(Some(input), 10).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Error: Could not identify image file: "));
    }

    #[tokio::test]
    async fn resolve_valid_png_file() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 3, Rgba([9, 9, 9, 255])));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        img.save(&path).unwrap();

        let resolved = resolve(Some(ImageInput::Path(path.clone())), 10)
            .await
            .expect("valid PNG must resolve");
        assert_eq!(resolved.image.width(), 4);
        assert_eq!(resolved.image.height(), 3);
        assert_eq!(resolved.source, path.display().to_string());
    }

    #[tokio::test]
    async fn resolve_unreachable_url() {
        // Port 9 (discard) on loopback is refused immediately.
        let input = ImageInput::Url("http://127.0.0.1:9/x.png".into());
        let err = resolve(Some(input), 2).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Error fetching image from URL: "));
    }
}
