use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::media::{ImageRef, MediaAsset};
use crate::track_types::RouteTrack;

/// Store-assigned identifier of a race entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Results as the runner entered them, e.g. `"3:41:07"` or `"112 / 4350"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_group_place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
}

/// A fully normalized entry, ready to be stored. Has no id or timestamps yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceRecord {
    pub race_name: String,
    pub race_type: String,
    pub location: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub bib_photo: Option<MediaAsset>,
    #[serde(default)]
    pub finisher_photo: Option<ImageRef>,
    #[serde(default)]
    pub medal_photo: Option<MediaAsset>,
    #[serde(default)]
    pub route: Option<RouteTrack>,
    /// Name of the uploaded track file the route came from.
    #[serde(default)]
    pub route_file_name: Option<String>,
    #[serde(default)]
    pub results: RaceResults,
    #[serde(default)]
    pub notes: String,
}

/// A stored entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceEntry {
    pub id: EntryId,
    #[serde(flatten)]
    pub record: RaceRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RaceEntry {
    pub fn summary(&self) -> RaceSummary {
        let r = &self.record;
        RaceSummary {
            id: self.id,
            race_name: r.race_name.clone(),
            race_type: r.race_type.clone(),
            location: r.location.clone(),
            date: r.date,
            finish_time: r.results.finish_time.clone(),
            distance_km: r.route.as_ref().map(|route| route.stats().total_distance_km),
        }
    }
}

/// List-view projection of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceSummary {
    pub id: EntryId,
    pub race_name: String,
    pub race_type: String,
    pub location: String,
    pub date: NaiveDate,
    pub finish_time: Option<String>,
    pub distance_km: Option<f64>,
}

/// A file the user just picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUpload {
    #[serde(default)]
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl RawUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            bytes,
        }
    }
}

/// Bib or medal photo as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum MediaInput {
    /// New upload; goes through the full pipeline.
    Upload(RawUpload),
    /// Previously processed asset re-submitted by an edit.
    Processed(MediaAsset),
    /// Bare image string from records that predate processed assets.
    Legacy(ImageRef),
}

/// Finisher photo as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum PhotoInput {
    Upload(RawUpload),
    Stored(ImageRef),
}

/// Track as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TrackInput {
    Upload(RawUpload),
    #[serde(rename_all = "camelCase")]
    Parsed {
        route: RouteTrack,
        #[serde(default)]
        file_name: Option<String>,
    },
}

/// Input to the ingestion pipeline for a new entry or an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceDraft {
    pub race_name: String,
    pub race_type: String,
    pub location: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub bib_photo: Option<MediaInput>,
    #[serde(default)]
    pub finisher_photo: Option<PhotoInput>,
    #[serde(default)]
    pub medal_photo: Option<MediaInput>,
    #[serde(default)]
    pub track: Option<TrackInput>,
    #[serde(default)]
    pub results: RaceResults,
    #[serde(default)]
    pub notes: String,
}

impl RaceDraft {
    pub fn new(
        race_name: impl Into<String>,
        race_type: impl Into<String>,
        location: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            race_name: race_name.into(),
            race_type: race_type.into(),
            location: location.into(),
            date,
            bib_photo: None,
            finisher_photo: None,
            medal_photo: None,
            track: None,
            results: RaceResults::default(),
            notes: String::new(),
        }
    }

    /// Draft that re-submits a stored entry unchanged, as an edit form would.
    pub fn from_entry(entry: &RaceEntry) -> Self {
        let r = entry.record.clone();
        Self {
            race_name: r.race_name,
            race_type: r.race_type,
            location: r.location,
            date: r.date,
            bib_photo: r.bib_photo.map(MediaInput::Processed),
            finisher_photo: r.finisher_photo.map(PhotoInput::Stored),
            medal_photo: r.medal_photo.map(MediaInput::Processed),
            track: r.route.map(|route| TrackInput::Parsed {
                route,
                file_name: r.route_file_name,
            }),
            results: r.results,
            notes: r.notes,
        }
    }
}
