//! Ingestion core for a personal race scrapbook.
//!
//! Turns raw uploads into storable records: GPX track files become analyzed
//! [`RouteTrack`]s, photos are normalized (and, for bib and medal photos,
//! background-isolated) into self-contained [`MediaAsset`]s, and the
//! [`EntryProcessor`] assembles both into a [`RaceRecord`] for a [`RaceStore`].

pub mod analytics;
pub mod converter;
pub mod entry;
pub mod error;
pub mod ingest;
pub mod media;
pub mod options;
pub mod parser;
pub mod scrapbook;
pub mod store;
pub mod track_types;

#[cfg(test)]
mod test_support;

use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

pub use crate::entry::{
    EntryId, MediaInput, PhotoInput, RaceDraft, RaceEntry, RaceRecord, RaceResults, RaceSummary,
    RawUpload, TrackInput,
};
pub use crate::error::{IsolationError, MediaError, ParseError, StoreError};
pub use crate::ingest::{EntryField, EntryProcessor, FieldWarning, ProcessedEntry};
pub use crate::media::{BackgroundIsolator, ImageRef, MediaAsset, MediaPipeline, MediaRole};
pub use crate::options::MediaOptions;
pub use crate::parser::parse_route;
pub use crate::scrapbook::{Scrapbook, Submission};
pub use crate::store::{MemoryStore, RaceStore};
pub use crate::track_types::{BoundingBox, GeoPoint, RouteStats, RouteTrack};

/// Parse a GPX string into a route with bounds and stats, returned as a JS object.
#[wasm_bindgen(js_name = parseRoute)]
pub fn parse_route_js(gpx_string: &str) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let route = parse_route(gpx_string.as_bytes())?;
    serde_wasm_bindgen::to_value(&route).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Parse a GPX string into a route, returned as a JSON string.
#[wasm_bindgen(js_name = parseRouteString)]
pub fn parse_route_string(gpx_string: &str) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let route = parse_route(gpx_string.as_bytes())?;
    serde_json::to_string(&route).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Parse a GPX string and return the route as a GeoJSON Feature.
#[wasm_bindgen(js_name = routeToGeoJson)]
pub fn route_to_geojson(gpx_string: &str) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let route = parse_route(gpx_string.as_bytes())?;
    let feature = converter::route_to_feature(&route);
    serde_wasm_bindgen::to_value(&feature).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Resize and re-encode an image, returning a JPEG data URL.
#[wasm_bindgen(js_name = normalizeImage)]
pub fn normalize_image_js(bytes: js_sys::Uint8Array, options: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts: MediaOptions = parse_options(options)?;
    let normalized = media::normalize_image(&bytes.to_vec(), &opts)?;
    Ok(normalized.to_image_ref().as_str().to_string())
}

fn parse_options<T: DeserializeOwned + Default>(options: JsValue) -> Result<T, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(T::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
