use std::time::Duration;

use thiserror::Error;
use wasm_bindgen::JsValue;

use crate::entry::EntryId;

/// Failure to turn a track document into points.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed track document: {reason}")]
    MalformedDocument { reason: String },

    #[error("no track points found in track document")]
    EmptyTrack,
}

impl ParseError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            reason: reason.into(),
        }
    }
}

impl From<quick_xml::Error> for ParseError {
    fn from(e: quick_xml::Error) -> Self {
        Self::malformed(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ParseError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::malformed(e.to_string())
    }
}

/// Failure to normalize an uploaded image. Fatal for that one asset.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("image could not be decoded: {0}")]
    DecodeFailure(#[source] image::ImageError),

    #[error("image could not be encoded: {0}")]
    EncodeFailure(#[source] image::ImageError),

    #[error("not a base64 data URL")]
    InvalidDataUrl,

    #[error("image worker failed: {0}")]
    Worker(String),
}

/// Failure of the background-isolation capability. Always recovered by the pipeline.
#[derive(Debug, Error)]
pub enum IsolationError {
    #[error("background isolation failed: {0}")]
    Failed(String),

    #[error("background isolation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("background isolation returned unsupported output: {0}")]
    Unsupported(String),
}

/// Persistence failures. These are the only errors that abort a submission.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("race entry {0} not found")]
    NotFound(EntryId),

    #[error("race store unavailable: {0}")]
    Unavailable(String),
}

impl From<ParseError> for JsValue {
    fn from(e: ParseError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

impl From<MediaError> for JsValue {
    fn from(e: MediaError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}
