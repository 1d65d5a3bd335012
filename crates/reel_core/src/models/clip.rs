//! Clip and audio track specifications.

use serde::{Deserialize, Serialize};

/// One video clip on the episode track: a source URL and a time window.
///
/// Times are in seconds; fractional values are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSpec {
    /// Source locator (HTTP(S) URL or local path).
    pub url: String,
    /// Window start in seconds.
    #[serde(rename = "startTime")]
    pub start: f64,
    /// Window end in seconds.
    #[serde(rename = "endTime")]
    pub end: f64,
}

impl ClipSpec {
    pub fn new(url: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            url: url.into(),
            start,
            end,
        }
    }

    /// Length of the window in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Check `0 <= start <= end` with finite values and a non-empty URL.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("clip has an empty source URL".to_string());
        }
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(format!(
                "clip {} has a non-finite time window ({}..{})",
                self.url, self.start, self.end
            ));
        }
        if self.start < 0.0 {
            return Err(format!(
                "clip {} starts before zero ({})",
                self.url, self.start
            ));
        }
        if self.start > self.end {
            return Err(format!(
                "clip {} ends before it starts ({} > {})",
                self.url, self.start, self.end
            ));
        }
        Ok(())
    }
}

/// An overlay audio track placed on the episode timeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioTrackSpec {
    /// Source locator. Empty URLs are skipped by the mixer.
    pub url: String,
    /// Offset into the source where playback starts, in seconds.
    #[serde(rename = "startTime", default)]
    pub start: f64,
    /// Offset into the source where playback ends, in seconds.
    #[serde(rename = "endTime", default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    /// Explicit play length in seconds; wins over `end`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Position on the episode timeline, in seconds.
    #[serde(default)]
    pub position: f64,
    /// Volume multiplier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl AudioTrackSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_start(mut self, start: f64) -> Self {
        self.start = start;
        self
    }

    pub fn with_end(mut self, end: f64) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_position(mut self, position: f64) -> Self {
        self.position = position;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Whether the track has a source to mix.
    pub fn is_usable(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// Start offset clamped to a finite, non-negative value.
    pub fn effective_start(&self) -> f64 {
        if self.start.is_finite() && self.start > 0.0 {
            self.start
        } else {
            0.0
        }
    }

    /// Play length: explicit duration, else `end - start`, else unbounded.
    ///
    /// A non-positive result means "play the remaining track".
    pub fn effective_duration(&self) -> Option<f64> {
        let duration = match (self.duration, self.end) {
            (Some(duration), _) => duration,
            (None, Some(end)) => end - self.effective_start(),
            (None, None) => return None,
        };
        (duration.is_finite() && duration > 0.0).then_some(duration)
    }

    /// Volume multiplier; unset, zero or negative values fall back to 1.
    pub fn effective_volume(&self) -> f64 {
        match self.volume {
            Some(volume) if volume.is_finite() && volume > 0.0 => volume,
            _ => 1.0,
        }
    }

    /// Timeline position as whole milliseconds (never negative).
    pub fn delay_ms(&self) -> u64 {
        if !self.position.is_finite() || self.position <= 0.0 {
            return 0;
        }
        (self.position * 1000.0).round() as u64
    }
}
