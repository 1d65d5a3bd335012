//! Assembly job and output blob.

use serde::{Deserialize, Serialize};

use super::clip::{AudioTrackSpec, ClipSpec};

/// MIME type of every produced artifact.
pub const VIDEO_MP4: &str = "video/mp4";

/// One episode assembly request.
///
/// Clips form the video track in order; audio tracks are overlaid in any
/// order (their placement comes from `position`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssemblyJob {
    /// Name used in logs and error context.
    pub name: String,
    /// Video clips in timeline order.
    #[serde(default)]
    pub clips: Vec<ClipSpec>,
    /// Overlay audio tracks.
    #[serde(default, rename = "audioClips")]
    pub audio_tracks: Vec<AudioTrackSpec>,
}

impl AssemblyJob {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_clip(mut self, clip: ClipSpec) -> Self {
        self.clips.push(clip);
        self
    }

    pub fn with_clips(mut self, clips: impl IntoIterator<Item = ClipSpec>) -> Self {
        self.clips.extend(clips);
        self
    }

    pub fn with_audio_track(mut self, track: AudioTrackSpec) -> Self {
        self.audio_tracks.push(track);
        self
    }

    pub fn with_audio_tracks(mut self, tracks: impl IntoIterator<Item = AudioTrackSpec>) -> Self {
        self.audio_tracks.extend(tracks);
        self
    }

    /// Audio tracks that have a source to mix, in the order given.
    pub fn usable_audio_tracks(&self) -> Vec<AudioTrackSpec> {
        self.audio_tracks
            .iter()
            .filter(|track| track.is_usable())
            .cloned()
            .collect()
    }

    /// Total length of the video track in seconds.
    pub fn timeline_duration(&self) -> f64 {
        self.clips.iter().map(ClipSpec::duration).sum()
    }
}

/// Encoded video produced by a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    /// Container bytes.
    pub bytes: Vec<u8>,
    /// MIME type (always `video/mp4`).
    pub mime: &'static str,
}

impl MediaBlob {
    /// Wrap MP4 container bytes.
    pub fn mp4(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: VIDEO_MP4,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Take the container bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
