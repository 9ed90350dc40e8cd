use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::entry::{MediaInput, PhotoInput, RaceDraft, RaceRecord, RawUpload, TrackInput};
use crate::media::{ImageRef, MediaAsset, MediaPipeline, MediaRole};
use crate::parser::parse_route;
use crate::track_types::RouteTrack;

/// Entry fields that are processed independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryField {
    BibPhoto,
    FinisherPhoto,
    MedalPhoto,
    Route,
}

/// A field that could not be processed as submitted. The entry was still
/// saved; the field holds a fallback value or is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldWarning {
    pub field: EntryField,
    pub message: String,
}

impl FieldWarning {
    fn new(field: EntryField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Normalized record plus any per-field warnings for the UI.
#[derive(Debug, Clone)]
pub struct ProcessedEntry {
    pub record: RaceRecord,
    pub warnings: Vec<FieldWarning>,
}

/// Result of resolving one field: its value (if any) and an optional warning.
type Resolved<T> = (Option<T>, Option<FieldWarning>);

/// Turns drafts into normalized records.
#[derive(Clone)]
pub struct EntryProcessor {
    media: MediaPipeline,
}

impl EntryProcessor {
    pub fn new(media: MediaPipeline) -> Self {
        Self { media }
    }

    /// Process every field of a draft concurrently. Never fails: a field that
    /// cannot be processed degrades to a fallback or to absent, with a warning.
    #[instrument(skip_all, fields(race = %draft.race_name))]
    pub async fn process(&self, draft: RaceDraft) -> ProcessedEntry {
        let RaceDraft {
            race_name,
            race_type,
            location,
            date,
            bib_photo,
            finisher_photo,
            medal_photo,
            track,
            results,
            notes,
        } = draft;

        let (bib, finisher, medal, route) = tokio::join!(
            self.resolve_media(EntryField::BibPhoto, MediaRole::Bib, bib_photo),
            self.resolve_photo(finisher_photo),
            self.resolve_media(EntryField::MedalPhoto, MediaRole::Medal, medal_photo),
            resolve_track(track),
        );

        let (bib_photo, bib_warning) = bib;
        let (finisher_photo, finisher_warning) = finisher;
        let (medal_photo, medal_warning) = medal;
        let (route, route_warning) = route;
        let (route, route_file_name) = route.unzip();

        ProcessedEntry {
            record: RaceRecord {
                race_name,
                race_type,
                location,
                date,
                bib_photo,
                finisher_photo,
                medal_photo,
                route,
                route_file_name: route_file_name.flatten(),
                results,
                notes,
            },
            warnings: [bib_warning, finisher_warning, medal_warning, route_warning]
                .into_iter()
                .flatten()
                .collect(),
        }
    }

    async fn resolve_media(
        &self,
        field: EntryField,
        role: MediaRole,
        input: Option<MediaInput>,
    ) -> Resolved<MediaAsset> {
        match input {
            None => (None, None),
            Some(MediaInput::Processed(asset)) => (Some(asset), None),
            Some(MediaInput::Legacy(image)) => (Some(MediaAsset::unprocessed(image)), None),
            Some(MediaInput::Upload(upload)) => {
                match self.media.process(role, &upload.bytes).await {
                    Ok(asset) => (Some(asset), None),
                    Err(e) => {
                        let (image, warning) = raw_fallback(field, &upload, &e.to_string());
                        (image.map(MediaAsset::unprocessed), Some(warning))
                    }
                }
            }
        }
    }

    async fn resolve_photo(&self, input: Option<PhotoInput>) -> Resolved<ImageRef> {
        match input {
            None => (None, None),
            Some(PhotoInput::Stored(image)) => (Some(image), None),
            Some(PhotoInput::Upload(upload)) => {
                match self.media.process_photo(&upload.bytes).await {
                    Ok(image) => (Some(image), None),
                    Err(e) => {
                        let (image, warning) =
                            raw_fallback(EntryField::FinisherPhoto, &upload, &e.to_string());
                        (image, Some(warning))
                    }
                }
            }
        }
    }
}

/// Embed an upload that could not be normalized exactly as it arrived.
fn raw_fallback(
    field: EntryField,
    upload: &RawUpload,
    reason: &str,
) -> (Option<ImageRef>, FieldWarning) {
    let file = upload.file_name.as_deref().unwrap_or("upload");
    if upload.bytes.is_empty() {
        warn!(?field, file, reason, "dropping empty upload");
        return (None, FieldWarning::new(field, format!("{file} is empty")));
    }

    warn!(?field, file, reason, "image could not be normalized, storing it unprocessed");
    (
        Some(ImageRef::from_raw(&upload.bytes)),
        FieldWarning::new(field, format!("{file} could not be processed: {reason}")),
    )
}

/// Resolve the track field to a route and the name of the file it came from.
async fn resolve_track(input: Option<TrackInput>) -> Resolved<(RouteTrack, Option<String>)> {
    let upload = match input {
        None => return (None, None),
        Some(TrackInput::Parsed { route, file_name }) => return (Some((route, file_name)), None),
        Some(TrackInput::Upload(upload)) => upload,
    };

    let RawUpload { file_name, bytes } = upload;
    let parsed = tokio::task::spawn_blocking(move || parse_route(&bytes))
        .await
        .map_err(|e| e.to_string())
        .and_then(|result| result.map_err(|e| e.to_string()));

    match parsed {
        Ok(route) => (Some((route, file_name)), None),
        Err(reason) => {
            let file = file_name.as_deref().unwrap_or("track file");
            warn!(file, reason = %reason, "track file could not be parsed, saving without route");
            (
                None,
                Some(FieldWarning::new(
                    EntryField::Route,
                    format!("{file} could not be read: {reason}"),
                )),
            )
        }
    }
}
