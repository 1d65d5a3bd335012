//! Audio overlay: probing the base track and building the mix graph.
//!
//! The graph has one branch per input. The base video's own audio (when
//! present) is passed through with reset timestamps; each overlay track is
//! optionally windowed, re-timed, gain-adjusted and delayed to its
//! position. All branches feed one `amix` without normalization, padded
//! with silence so `-shortest` cuts the result at the video's length.

use crate::command::{format_number, EngineCommand};
use crate::config::MixingSettings;
use crate::logging::JobLogger;
use crate::models::AudioTrackSpec;
use crate::orchestrator::StepResult;
use crate::workspace::Workspace;

use super::run_command;

/// Label of the mixed audio stream in the graph.
pub const MIX_OUTPUT_LABEL: &str = "[aout]";

const BASE_BRANCH: &str = "[0:a]asetpts=PTS-STARTPTS[basea]";
const BASE_LABEL: &str = "[basea]";

/// Whether a file carries an audio stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioProbe {
    HasAudio,
    NoAudio,
    /// The probe itself failed; the answer is unknown.
    ProbeError(String),
}

impl AudioProbe {
    /// Collapse to a yes/no, treating an unknown answer as "no audio".
    pub fn has_audio(&self) -> bool {
        matches!(self, Self::HasAudio)
    }
}

/// Probe `name` for a first audio stream.
pub async fn probe_audio(ws: &Workspace, name: &str) -> AudioProbe {
    match ws.exec(&EngineCommand::probe_audio(name)).await {
        Ok(outcome) if outcome.success() => AudioProbe::HasAudio,
        Ok(_) => AudioProbe::NoAudio,
        Err(e) => AudioProbe::ProbeError(e.to_string()),
    }
}

/// Extension for a staged audio file, taken from the URL's last path
/// segment (query and fragment ignored), e.g. `.wav`.
pub fn audio_extension(url: &str, fallback: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();

    match segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
        {
            format!(".{}", ext)
        }
        _ => fallback.to_string(),
    }
}

/// Filter graph mixing overlay tracks into a video's audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixGraph {
    branches: Vec<String>,
    mix: String,
    inputs: usize,
}

impl MixGraph {
    /// Build the graph for `tracks`, which become inputs `1..=tracks.len()`.
    ///
    /// Returns `None` when there is nothing to mix.
    pub fn build(base_has_audio: bool, tracks: &[AudioTrackSpec]) -> Option<Self> {
        let mut branches = Vec::with_capacity(tracks.len() + 1);
        let mut labels = Vec::with_capacity(tracks.len() + 1);

        if base_has_audio {
            branches.push(BASE_BRANCH.to_string());
            labels.push(BASE_LABEL.to_string());
        }

        for (i, track) in tracks.iter().enumerate() {
            let label = format!("[a{}]", i);
            branches.push(track_branch(i + 1, track, &label));
            labels.push(label);
        }

        if labels.is_empty() {
            return None;
        }

        let mix = format!(
            "{}amix=inputs={}:normalize=0,apad{}",
            labels.concat(),
            labels.len(),
            MIX_OUTPUT_LABEL
        );

        Some(Self {
            branches,
            mix,
            inputs: labels.len(),
        })
    }

    /// Number of streams entering `amix`.
    pub fn input_count(&self) -> usize {
        self.inputs
    }

    /// Per-input branches, base first.
    pub fn branches(&self) -> &[String] {
        &self.branches
    }

    pub fn filter_complex(&self) -> String {
        let mut parts = self.branches.clone();
        parts.push(self.mix.clone());
        parts.join(";")
    }

    /// The full mix invocation for this graph.
    pub fn command(
        &self,
        video: &str,
        audio_inputs: &[String],
        settings: &MixingSettings,
        output: &str,
    ) -> EngineCommand {
        EngineCommand::Mix {
            video: video.to_string(),
            audio_inputs: audio_inputs.to_vec(),
            filter_complex: self.filter_complex(),
            audio_label: MIX_OUTPUT_LABEL.to_string(),
            audio_codec: settings.audio_codec.clone(),
            audio_bitrate: settings.audio_bitrate.clone(),
            output: output.to_string(),
        }
    }
}

fn track_branch(input_index: usize, track: &AudioTrackSpec, label: &str) -> String {
    let start = track.effective_start();
    let duration = track.effective_duration();

    let mut filter = format!("[{}:a]", input_index);
    if start > 0.0 || duration.is_some() {
        filter.push_str(&format!("atrim=start={}", format_number(start)));
        if let Some(duration) = duration {
            filter.push_str(&format!(":duration={}", format_number(duration)));
        }
        filter.push(',');
    }
    filter.push_str("asetpts=PTS-STARTPTS");

    let volume = track.effective_volume();
    if volume != 1.0 {
        filter.push_str(&format!(",volume={}", format_number(volume)));
    }

    let delay = track.delay_ms();
    if delay > 0 {
        filter.push_str(&format!(",adelay={}:all=1", delay));
    }

    filter.push_str(label);
    filter
}

/// Outcome of [`mix_staged`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixOutcome {
    /// The mixed file was written.
    Mixed { output: String, inputs: usize },
    /// Nothing to mix; the video is unchanged.
    Unchanged,
}

/// Mix already staged audio files over `video` into `output`.
///
/// `staged` pairs each workspace name with its track, in input order.
pub async fn mix_staged(
    ws: &Workspace,
    logger: &JobLogger,
    settings: &MixingSettings,
    video: &str,
    staged: &[(String, AudioTrackSpec)],
    output: &str,
) -> StepResult<MixOutcome> {
    let probe = probe_audio(ws, video).await;
    match &probe {
        AudioProbe::HasAudio => logger.debug("Base video has an audio stream"),
        AudioProbe::NoAudio => logger.debug("Base video has no audio stream"),
        AudioProbe::ProbeError(e) => {
            logger.warn(&format!("Audio probe failed, assuming no base audio: {}", e))
        }
    }

    let tracks: Vec<AudioTrackSpec> = staged.iter().map(|(_, track)| track.clone()).collect();
    let Some(graph) = MixGraph::build(probe.has_audio(), &tracks) else {
        return Ok(MixOutcome::Unchanged);
    };

    let names: Vec<String> = staged.iter().map(|(name, _)| name.clone()).collect();
    let command = graph.command(video, &names, settings, output);
    run_command(ws, logger, &command).await?;

    Ok(MixOutcome::Mixed {
        output: output.to_string(),
        inputs: graph.input_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryEngine;
    use std::sync::Arc;

    #[test]
    fn plain_track_without_base_audio() {
        let graph = MixGraph::build(false, &[AudioTrackSpec::new("a.mp3")]).unwrap();
        assert_eq!(
            graph.filter_complex(),
            "[1:a]asetpts=PTS-STARTPTS[a0];[a0]amix=inputs=1:normalize=0,apad[aout]"
        );
        assert_eq!(graph.input_count(), 1);
    }

    #[test]
    fn volume_and_delay_filters() {
        let track = AudioTrackSpec::new("a.mp3")
            .with_volume(2.0)
            .with_position(1.5);
        let graph = MixGraph::build(true, &[track]).unwrap();

        assert_eq!(graph.input_count(), 2);
        assert_eq!(graph.branches()[0], "[0:a]asetpts=PTS-STARTPTS[basea]");
        assert_eq!(
            graph.branches()[1],
            "[1:a]asetpts=PTS-STARTPTS,volume=2,adelay=1500:all=1[a0]"
        );
        assert!(graph
            .filter_complex()
            .ends_with("[basea][a0]amix=inputs=2:normalize=0,apad[aout]"));
    }

    #[test]
    fn window_is_trimmed() {
        let track = AudioTrackSpec::new("a.mp3").with_start(1.25).with_duration(3.0);
        let graph = MixGraph::build(false, &[track]).unwrap();
        assert_eq!(
            graph.branches()[0],
            "[1:a]atrim=start=1.25:duration=3,asetpts=PTS-STARTPTS[a0]"
        );

        let from_zero = AudioTrackSpec::new("a.mp3").with_duration(3.0);
        let graph = MixGraph::build(false, &[from_zero]).unwrap();
        assert!(graph.branches()[0].starts_with("[1:a]atrim=start=0:duration=3,"));
    }

    #[test]
    fn end_time_implies_duration() {
        let track = AudioTrackSpec::new("a.mp3").with_start(2.0).with_end(4.5);
        let graph = MixGraph::build(false, &[track]).unwrap();
        assert!(graph.branches()[0].contains("atrim=start=2:duration=2.5,"));
    }

    #[test]
    fn unit_volume_and_zero_position_add_nothing() {
        let track = AudioTrackSpec::new("a.mp3").with_volume(1.0).with_position(0.0);
        let graph = MixGraph::build(false, &[track]).unwrap();
        assert_eq!(graph.branches()[0], "[1:a]asetpts=PTS-STARTPTS[a0]");
    }

    #[test]
    fn inputs_are_numbered_in_order() {
        let tracks = [
            AudioTrackSpec::new("a.mp3"),
            AudioTrackSpec::new("b.mp3"),
            AudioTrackSpec::new("c.mp3"),
        ];
        let graph = MixGraph::build(false, &tracks).unwrap();
        assert!(graph.branches()[2].starts_with("[3:a]"));
        assert!(graph.branches()[2].ends_with("[a2]"));
        assert!(graph.filter_complex().contains("[a0][a1][a2]amix=inputs=3"));
    }

    #[test]
    fn nothing_to_mix() {
        assert!(MixGraph::build(false, &[]).is_none());
        assert_eq!(MixGraph::build(true, &[]).unwrap().input_count(), 1);
    }

    #[test]
    fn extension_from_url_path() {
        assert_eq!(audio_extension("https://cdn.example.com/bgm/theme.wav", ".mp3"), ".wav");
        assert_eq!(
            audio_extension("https://cdn.example.com/voice.m4a?token=abc.def", ".mp3"),
            ".m4a"
        );
        assert_eq!(audio_extension("https://cdn.example.com/stream", ".mp3"), ".mp3");
        assert_eq!(audio_extension("https://cdn.example.com/a.toolong", ".mp3"), ".mp3");
        assert_eq!(audio_extension("https://cdn.example.com/.hidden", ".mp3"), ".mp3");
    }

    #[tokio::test]
    async fn probe_is_tri_state() {
        let engine = Arc::new(MemoryEngine::new());
        let ws = Workspace::new(engine.clone());
        ws.write("final.mp4", b"V").await.unwrap();

        engine.set_base_audio(true);
        assert_eq!(probe_audio(&ws, "final.mp4").await, AudioProbe::HasAudio);

        engine.set_base_audio(false);
        assert_eq!(probe_audio(&ws, "final.mp4").await, AudioProbe::NoAudio);

        engine.fail_exec_when("0:a:0");
        let probe = probe_audio(&ws, "final.mp4").await;
        assert!(matches!(probe, AudioProbe::ProbeError(_)));
        assert!(!probe.has_audio());
    }

    #[tokio::test]
    async fn mix_staged_runs_one_command() {
        let engine = Arc::new(MemoryEngine::new());
        let ws = Workspace::new(engine.clone());
        let logger = JobLogger::detached("ep");
        ws.write("final.mp4", b"V").await.unwrap();
        ws.write("audio_0.mp3", b"S").await.unwrap();
        engine.set_base_audio(false);

        let staged = vec![("audio_0.mp3".to_string(), AudioTrackSpec::new("a.mp3"))];
        let outcome = mix_staged(
            &ws,
            &logger,
            &MixingSettings::default(),
            "final.mp4",
            &staged,
            "final_audio.mp4",
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            MixOutcome::Mixed {
                output: "final_audio.mp4".to_string(),
                inputs: 1
            }
        );
        let mix = engine.commands().pop().unwrap();
        assert!(mix.contains(&"-filter_complex".to_string()));
        assert!(ws.read("final_audio.mp4").await.is_ok());
    }
}
