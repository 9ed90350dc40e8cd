use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{IsolationError, MediaError};
use crate::options::MediaOptions;

/// Format every normalized image is re-encoded to.
pub const NORMALIZED_MIME: &str = "image/jpeg";

const UNKNOWN_MIME: &str = "application/octet-stream";

/// A self-contained, storage-ready image: a `data:<mime>;base64,...` URL.
///
/// Older records may hold arbitrary strings here; they are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        Self(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
    }

    /// Embed bytes as-is, sniffing the MIME type from the content.
    pub fn from_raw(bytes: &[u8]) -> Self {
        let mime = image::guess_format(bytes)
            .map(|f| f.to_mime_type())
            .unwrap_or(UNKNOWN_MIME);
        Self::from_bytes(mime, bytes)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.split().map(|(mime, _)| mime)
    }

    /// Decode the embedded payload back to bytes.
    pub fn decode(&self) -> Result<Vec<u8>, MediaError> {
        let (_, payload) = self.split().ok_or(MediaError::InvalidDataUrl)?;
        STANDARD
            .decode(payload)
            .map_err(|_| MediaError::InvalidDataUrl)
    }

    fn split(&self) -> Option<(&str, &str)> {
        self.0.strip_prefix("data:")?.split_once(";base64,")
    }
}

impl From<String> for ImageRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A normalized photo plus its background-isolated variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    pub original: ImageRef,
    pub processed: ImageRef,
    /// Display preference only; both images are always kept.
    pub use_processed: bool,
}

impl MediaAsset {
    /// An asset whose processed form is the original itself.
    pub fn unprocessed(image: ImageRef) -> Self {
        Self {
            processed: image.clone(),
            original: image,
            use_processed: false,
        }
    }

    /// The image the UI should show by default.
    pub fn displayed(&self) -> &ImageRef {
        if self.use_processed {
            &self.processed
        } else {
            &self.original
        }
    }

    pub fn with_use_processed(mut self, use_processed: bool) -> Self {
        self.use_processed = use_processed;
        self
    }

    pub fn has_distinct_versions(&self) -> bool {
        self.original != self.processed
    }
}

/// Which photo slot an upload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaRole {
    Bib,
    Finisher,
    Medal,
}

impl MediaRole {
    pub fn isolates_background(self) -> bool {
        matches!(self, Self::Bib | Self::Medal)
    }
}

/// Output of stage 1: JPEG bytes and their dimensions.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl NormalizedImage {
    pub fn to_image_ref(&self) -> ImageRef {
        ImageRef::from_bytes(NORMALIZED_MIME, &self.bytes)
    }
}

/// Separates a photo's subject from its background.
///
/// Takes encoded image bytes and returns encoded image bytes in any format the
/// `image` crate can recognize (typically PNG with transparency).
#[async_trait]
pub trait BackgroundIsolator: Send + Sync {
    async fn isolate(&self, image: &[u8]) -> Result<Vec<u8>, IsolationError>;
}

/// Largest size with the same aspect ratio that fits in `max_width` x
/// `max_height`. Images already within bounds are left alone.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let (max_width, max_height) = (max_width.max(1), max_height.max(1));
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale = (max_width as f64 / width as f64).min(max_height as f64 / height as f64);
    let scaled = |side: u32, max: u32| ((side as f64 * scale).round() as u32).clamp(1, max);
    (scaled(width, max_width), scaled(height, max_height))
}

/// Stage 1: decode, shrink to fit, re-encode as JPEG.
pub fn normalize_image(bytes: &[u8], opts: &MediaOptions) -> Result<NormalizedImage, MediaError> {
    let img = image::load_from_memory(bytes).map_err(MediaError::DecodeFailure)?;
    let (width, height) = img.dimensions();
    let (target_w, target_h) = fit_within(width, height, opts.max_width, opts.max_height);

    let img = if (target_w, target_h) == (width, height) {
        img
    } else {
        img.resize_exact(target_w, target_h, FilterType::Triangle)
    };

    // JPEG has no alpha channel.
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, opts.jpeg_quality()))
        .map_err(MediaError::EncodeFailure)?;

    Ok(NormalizedImage {
        bytes: out,
        width: target_w,
        height: target_h,
    })
}

/// Normalizes uploaded photos and, for bib and medal photos, isolates the
/// subject from the background.
#[derive(Clone)]
pub struct MediaPipeline {
    options: MediaOptions,
    isolator: Option<Arc<dyn BackgroundIsolator>>,
}

impl MediaPipeline {
    pub fn new(options: MediaOptions) -> Self {
        Self {
            options,
            isolator: None,
        }
    }

    pub fn with_isolator(mut self, isolator: Arc<dyn BackgroundIsolator>) -> Self {
        self.isolator = Some(isolator);
        self
    }

    /// Stage 1 on a blocking worker.
    pub async fn normalize(&self, bytes: &[u8]) -> Result<NormalizedImage, MediaError> {
        let bytes = bytes.to_vec();
        let opts = self.options.clone();
        tokio::task::spawn_blocking(move || normalize_image(&bytes, &opts))
            .await
            .map_err(|e| MediaError::Worker(e.to_string()))?
    }

    /// Full pipeline for one upload. Only a stage-1 failure is an error;
    /// isolation problems fall back to the normalized original.
    pub async fn process(&self, role: MediaRole, bytes: &[u8]) -> Result<MediaAsset, MediaError> {
        let normalized = self.normalize(bytes).await?;
        let original = normalized.to_image_ref();

        if !role.isolates_background() {
            return Ok(MediaAsset::unprocessed(original));
        }
        let Some(isolator) = &self.isolator else {
            debug!(?role, "no background isolator configured; keeping original");
            return Ok(MediaAsset::unprocessed(original));
        };

        match self.isolate(isolator, &normalized).await {
            Ok(processed) => Ok(MediaAsset {
                original,
                processed,
                use_processed: true,
            }),
            Err(e) => {
                warn!(?role, error = %e, "background isolation failed, using original");
                Ok(MediaAsset::unprocessed(original))
            }
        }
    }

    /// Stage 1 only, for photos shown as taken.
    pub async fn process_photo(&self, bytes: &[u8]) -> Result<ImageRef, MediaError> {
        Ok(self.normalize(bytes).await?.to_image_ref())
    }

    /// Stage 2. Runs on its own task so a panicking or hung isolator is
    /// contained; the task is aborted once the timeout elapses.
    async fn isolate(
        &self,
        isolator: &Arc<dyn BackgroundIsolator>,
        image: &NormalizedImage,
    ) -> Result<ImageRef, IsolationError> {
        let timeout = self.options.isolation_timeout();
        let isolator = Arc::clone(isolator);
        let input = image.bytes.clone();
        let mut handle = tokio::spawn(async move { isolator.isolate(&input).await });

        let output = match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_err)) => return Err(IsolationError::Failed(join_err.to_string())),
            Err(_) => {
                handle.abort();
                return Err(IsolationError::TimedOut(timeout));
            }
        };

        let format = image::guess_format(&output)
            .map_err(|e| IsolationError::Unsupported(e.to_string()))?;
        Ok(ImageRef::from_bytes(format.to_mime_type(), &output))
    }
}
