use std::path::Path;

use lofty::prelude::*;
use lofty::tag::ItemKey;
use tracing::debug;

use super::model::{Metadata, MetadataField};

fn insert_trimmed(out: &mut Metadata, field: MetadataField, value: Option<&str>) {
    if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
        out.insert(field, v.to_string());
    }
}

/// Read the requested fields from the tags of a local audio file.
///
/// Fields the file does not carry are left out of the map; an unreadable
/// file yields an empty map. `Length` is reported in whole seconds, the unit
/// the resolver expects for short lengths.
pub fn read_fields(path: &Path, fields: &[MetadataField]) -> Metadata {
    let mut out = Metadata::new();
    if fields.is_empty() {
        return out;
    }

    let tagged = match lofty::read_from_path(path) {
        Ok(t) => t,
        Err(e) => {
            debug!("no readable tags in {}: {e}", path.display());
            return out;
        }
    };

    if fields.contains(&MetadataField::Length) {
        let secs = (tagged.properties().duration().as_millis() + 500) / 1000;
        if secs > 0 {
            out.insert(MetadataField::Length, secs.to_string());
        }
    }

    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return out;
    };

    for field in fields {
        match field {
            MetadataField::Title => insert_trimmed(&mut out, *field, tag.title().as_deref()),
            MetadataField::Artist => insert_trimmed(&mut out, *field, tag.artist().as_deref()),
            MetadataField::Album => insert_trimmed(&mut out, *field, tag.album().as_deref()),
            MetadataField::Genre => insert_trimmed(&mut out, *field, tag.genre().as_deref()),
            MetadataField::TrackNumber => {
                if let Some(n) = tag.track() {
                    out.insert(*field, n.to_string());
                }
            }
            MetadataField::Year => {
                let year = tag
                    .items()
                    .find(|item| matches!(item.key(), ItemKey::Year | ItemKey::RecordingDate))
                    .and_then(|item| item.value().text());
                insert_trimmed(&mut out, *field, year);
            }
            MetadataField::Length => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn unreadable_file_yields_no_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.mp3");
        fs::write(&path, b"not a real mp3").unwrap();

        assert!(read_fields(&path, &MetadataField::ALL).is_empty());
    }

    #[test]
    fn missing_file_yields_no_fields() {
        let path = Path::new("/definitely/not/here.flac");
        assert!(read_fields(path, &MetadataField::ALL).is_empty());
    }

    /// Silent 16-bit mono PCM, `seconds` long.
    fn wav_bytes(seconds: u32) -> Vec<u8> {
        let rate = 8_000u32;
        let data_len = rate * 2 * seconds;
        let mut v = Vec::new();
        v.extend_from_slice(b"RIFF");
        v.extend_from_slice(&(36 + data_len).to_le_bytes());
        v.extend_from_slice(b"WAVEfmt ");
        v.extend_from_slice(&16u32.to_le_bytes());
        v.extend_from_slice(&1u16.to_le_bytes());
        v.extend_from_slice(&1u16.to_le_bytes());
        v.extend_from_slice(&rate.to_le_bytes());
        v.extend_from_slice(&(rate * 2).to_le_bytes());
        v.extend_from_slice(&2u16.to_le_bytes());
        v.extend_from_slice(&16u16.to_le_bytes());
        v.extend_from_slice(b"data");
        v.extend_from_slice(&data_len.to_le_bytes());
        v.resize(v.len() + data_len as usize, 0);
        v
    }

    #[test]
    fn short_file_length_is_reported_in_seconds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("jingle.wav");
        fs::write(&path, wav_bytes(4)).unwrap();

        let out = read_fields(&path, &[MetadataField::Length]);
        assert_eq!(out.get(&MetadataField::Length).map(String::as_str), Some("4"));
        assert_eq!(
            crate::resolve::normalize_duration_ms(
                out.get(&MetadataField::Length).and_then(|l| crate::resolve::parse_length(l))
            ),
            4_000
        );
    }

    #[test]
    fn no_requested_fields_skips_the_read() {
        let path = Path::new("/definitely/not/here.flac");
        assert!(read_fields(path, &[]).is_empty());
    }
}
