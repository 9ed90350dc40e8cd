use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::error::ParseError;
use crate::track_types::{GeoPoint, RouteTrack, MAX_LATITUDE, MAX_LONGITUDE};

type Result<T> = std::result::Result<T, ParseError>;

/// Track points and name extracted from a GPX document, before analytics.
#[derive(Debug, Default)]
pub struct ParsedTrack {
    pub name: Option<String>,
    pub points: Vec<GeoPoint>,
}

/// Parse an uploaded track file into a fully analyzed route.
pub fn parse_route(bytes: &[u8]) -> Result<RouteTrack> {
    let parsed = parse_track_bytes(bytes)?;
    RouteTrack::from_points(parsed.name, parsed.points)
}

/// Parse raw track-file bytes. The document must be UTF-8.
pub fn parse_track_bytes(bytes: &[u8]) -> Result<ParsedTrack> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ParseError::malformed(format!("track file is not UTF-8: {e}")))?;
    parse_track(text)
}

/// Parse a GPX XML string, collecting every `<trkpt>` in document order.
pub fn parse_track(xml: &str) -> Result<ParsedTrack> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut reader = Reader::from_str(xml);
    let mut track = ParsedTrack::default();
    let mut metadata_name: Option<String> = None;
    // Local names of the currently open elements, outermost first.
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                enter_element(&open, &mut seen_root)?;
                match e.local_name().as_ref() {
                    b"trkpt" => {
                        if let Some(pt) = parse_point(&e, &mut reader)? {
                            track.points.push(pt);
                        }
                    }
                    b"name" if track.name.is_none() && parent_is(&open, b"trk") => {
                        track.name = read_text_owned(&mut reader, &e)?;
                    }
                    b"name" if metadata_name.is_none() && parent_is(&open, b"metadata") => {
                        metadata_name = read_text_owned(&mut reader, &e)?;
                    }
                    name => open.push(name.to_vec()),
                }
            }
            Event::Empty(e) => {
                enter_element(&open, &mut seen_root)?;
                if e.local_name().as_ref() == b"trkpt" {
                    if let Some((lat, lon)) = parse_lat_lon(&e, reader.decoder())? {
                        track.points.push(GeoPoint::new(lat, lon));
                    }
                }
            }
            Event::End(_) => {
                if open.pop().is_none() {
                    return Err(ParseError::malformed("closing tag without a matching start tag"));
                }
            }
            Event::Text(e) => {
                if open.is_empty() && !is_blank(&e) {
                    return Err(ParseError::malformed("text outside the root element"));
                }
            }
            Event::CData(_) | Event::GeneralRef(_) if open.is_empty() => {
                return Err(ParseError::malformed("content outside the root element"));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(ParseError::malformed(format!(
            "unclosed element <{}>",
            String::from_utf8_lossy(unclosed)
        )));
    }
    if !seen_root {
        return Err(ParseError::malformed("document has no root element"));
    }
    if track.points.is_empty() {
        return Err(ParseError::EmptyTrack);
    }

    track.name = track.name.or(metadata_name);
    Ok(track)
}

/// Reject a second top-level element; XML allows exactly one root.
fn enter_element(open: &[Vec<u8>], seen_root: &mut bool) -> Result<()> {
    if open.is_empty() {
        if *seen_root {
            return Err(ParseError::malformed("more than one root element"));
        }
        *seen_root = true;
    }
    Ok(())
}

fn parent_is(open: &[Vec<u8>], local_name: &[u8]) -> bool {
    open.last().is_some_and(|parent| parent.as_slice() == local_name)
}

fn is_blank(text: &[u8]) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

/// Read lat/lon from a track point's start tag.
///
/// Returns `Ok(None)` for a point that should be skipped: a coordinate is
/// missing, not a finite number, or out of range. Values are unescaped first,
/// so `lat="&#49;"` reads as 1.
fn parse_lat_lon(e: &BytesStart<'_>, decoder: Decoder) -> Result<Option<(f64, f64)>> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result?;
        let key = attr.key.local_name();
        match key.as_ref() {
            b"lat" => {
                lat = parse_coordinate(&attr.decode_and_unescape_value(decoder)?, MAX_LATITUDE);
            }
            b"lon" => {
                lon = parse_coordinate(&attr.decode_and_unescape_value(decoder)?, MAX_LONGITUDE);
            }
            _ => {}
        }
    }

    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Some((lat, lon))),
        _ => {
            debug!(?lat, ?lon, "skipping track point without valid lat/lon");
            Ok(None)
        }
    }
}

fn parse_coordinate(raw: &str, limit: f64) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() <= limit)
}

/// Parse a `<trkpt>` and its children. Called after its `Event::Start`;
/// consumes everything up to and including the matching end tag.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
) -> Result<Option<GeoPoint>> {
    let Some((lat, lon)) = parse_lat_lon(start, reader.decoder())? else {
        reader.read_to_end(start.name())?;
        return Ok(None);
    };

    let mut point = GeoPoint::new(lat, lon);

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if e.local_name().as_ref() == b"ele" && point.elevation.is_none() {
                    point.elevation = read_text_owned(reader, &e)?
                        .and_then(|text| text.parse::<f64>().ok())
                        .filter(|v| v.is_finite());
                } else {
                    // time, extensions and anything else we don't keep
                    reader.read_to_end(e.name())?;
                }
            }
            // Nested elements are consumed above, so this is </trkpt>.
            Event::End(_) => break,
            Event::Eof => return Err(ParseError::malformed("unclosed <trkpt> element")),
            _ => {}
        }
    }

    Ok(Some(point))
}

/// Read the text content of an element, trimmed. Empty text yields `None`.
/// Handles regular text, CDATA sections, and entity references.
fn read_text_owned<'a>(
    reader: &mut Reader<&'a [u8]>,
    start: &BytesStart<'_>,
) -> Result<Option<String>> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                text.push_str(std::str::from_utf8(&e).unwrap_or_default());
            }
            Event::CData(e) => {
                text.push_str(std::str::from_utf8(&e).unwrap_or_default());
            }
            Event::GeneralRef(e) => {
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    text.push(ch);
                } else {
                    match std::str::from_utf8(&e).unwrap_or_default() {
                        "amp" => text.push('&'),
                        "lt" => text.push('<'),
                        "gt" => text.push('>'),
                        "quot" => text.push('"'),
                        "apos" => text.push('\''),
                        _ => {}
                    }
                }
            }
            Event::Start(e) => {
                reader.read_to_end(e.name())?;
            }
            Event::End(e) if e.name().0 == end_name.as_slice() => break,
            Event::Eof => return Err(ParseError::malformed("unclosed text element")),
            _ => {}
        }
    }

    let trimmed = text.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}
