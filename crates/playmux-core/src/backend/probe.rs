//! Media inspection for the generic backend.

use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, StandardTagKey};
use symphonia::core::probe::Hint;

use crate::error::{PlayerError, PlayerResult};

/// Containers symphonia cannot open but which carry video.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mkv", "webm", "mov", "avi", "ts", "m2ts", "mpg", "m3u8"];

/// What the generic backend knows about a piece of media.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaInfo {
    pub has_audio: bool,
    pub has_video: bool,
    pub audio_tracks: i32,
    pub duration_ms: Option<i64>,
    pub total_bytes: Option<i64>,
    pub audio_codec: Option<String>,
    pub sample_rate: Option<u32>,
    pub bits_per_sample: Option<u32>,
    pub title: Option<String>,
    pub artist: Option<String>,
}

/// Local path named by a `file:` URI.
pub fn file_path(uri: &str) -> Option<PathBuf> {
    let rest = uri
        .strip_prefix("file://")
        .or_else(|| uri.strip_prefix("file:"))?;
    if rest.is_empty() {
        return None;
    }
    Some(PathBuf::from(rest))
}

fn extension(path: &str) -> String {
    Path::new(path.split(['?', '#']).next().unwrap_or(path))
        .extension()
        .and_then(OsStr::to_str)
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn looks_like_video(path: &str) -> bool {
    VIDEO_EXTENSIONS.contains(&extension(path).as_str())
}

/// Best guess for a network stream that cannot be probed up front.
pub fn guess_stream(uri: &str) -> MediaInfo {
    MediaInfo {
        has_audio: true,
        has_video: looks_like_video(uri),
        audio_tracks: 1,
        ..MediaInfo::default()
    }
}

/// Open a local file and read its stream parameters and tags.
pub fn probe_file(path: &Path) -> PlayerResult<MediaInfo> {
    let file = File::open(path).map_err(|e| {
        PlayerError::operation_failed(format!("open {}: {e}", path.display()))
    })?;
    let total_bytes = file.metadata().ok().map(|m| m.len() as i64);

    let ext = extension(&path.to_string_lossy());
    let mut hint = Hint::new();
    if !ext.is_empty() {
        hint.with_extension(&ext);
    }

    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut probed = match symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    ) {
        Ok(probed) => probed,
        Err(_) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => {
            return Ok(MediaInfo {
                has_audio: true,
                has_video: true,
                audio_tracks: 1,
                total_bytes,
                ..MediaInfo::default()
            });
        }
        Err(e) => {
            return Err(PlayerError::operation_failed(format!(
                "unsupported media {}: {e}",
                path.display()
            )));
        }
    };

    let mut info = MediaInfo {
        has_audio: true,
        total_bytes,
        audio_tracks: probed.format.tracks().len() as i32,
        ..MediaInfo::default()
    };

    if let Some(track) = probed.format.default_track() {
        let params = &track.codec_params;
        info.sample_rate = params.sample_rate;
        info.bits_per_sample = params.bits_per_sample;
        info.audio_codec = symphonia::default::get_codecs()
            .get_codec(params.codec)
            .map(|descriptor| descriptor.short_name.to_string());
        if let (Some(frames), Some(rate)) = (params.n_frames, params.sample_rate) {
            if rate > 0 {
                info.duration_ms = Some((frames.saturating_mul(1000) / rate as u64) as i64);
            }
        }
    }

    if let Some(rev) = probed.format.metadata().current() {
        for tag in rev.tags() {
            match tag.std_key {
                Some(StandardTagKey::TrackTitle) if info.title.is_none() => {
                    info.title = Some(tag.value.to_string());
                }
                Some(StandardTagKey::Artist) if info.artist.is_none() => {
                    info.artist = Some(tag.value.to_string());
                }
                _ => {}
            }
        }
    }

    Ok(info)
}
