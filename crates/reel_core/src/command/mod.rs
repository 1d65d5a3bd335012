//! Typed engine commands.
//!
//! Each variant renders to the exact argument list the engine receives.
//! Building commands from values instead of string fragments keeps
//! workspace names and numbers from being split or misquoted.

use std::fmt;

/// Render a number the way the filter and seek syntax expects it:
/// shortest form, no trailing zeros (`1.5`, `2`, `0.25`).
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{}", value)
}

/// One engine invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    /// Cut `[start, end]` out of `input` without re-encoding.
    Trim {
        input: String,
        output: String,
        start: f64,
        end: f64,
    },
    /// Join the files listed in a concat manifest without re-encoding.
    Concat { list: String, output: String },
    /// Decode the first audio stream to nowhere; exit 0 iff it exists.
    ProbeAudio { input: String },
    /// Mix audio inputs over a video through a filter graph.
    Mix {
        video: String,
        audio_inputs: Vec<String>,
        filter_complex: String,
        audio_label: String,
        audio_codec: String,
        audio_bitrate: String,
        output: String,
    },
}

impl EngineCommand {
    pub fn trim(input: impl Into<String>, output: impl Into<String>, start: f64, end: f64) -> Self {
        Self::Trim {
            input: input.into(),
            output: output.into(),
            start,
            end,
        }
    }

    pub fn concat(list: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Concat {
            list: list.into(),
            output: output.into(),
        }
    }

    pub fn probe_audio(input: impl Into<String>) -> Self {
        Self::ProbeAudio {
            input: input.into(),
        }
    }

    /// Short label for logs and error context.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Trim { .. } => "trim",
            Self::Concat { .. } => "concat",
            Self::ProbeAudio { .. } => "probe",
            Self::Mix { .. } => "mix",
        }
    }

    /// File the command writes, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Trim { output, .. } | Self::Concat { output, .. } | Self::Mix { output, .. } => {
                Some(output.as_str())
            }
            Self::ProbeAudio { .. } => None,
        }
    }

    /// Argument list, without the program name.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        let mut push = |values: &[&str]| args.extend(values.iter().map(|v| v.to_string()));

        match self {
            Self::Trim {
                input,
                output,
                start,
                end,
            } => {
                let start = format_number(*start);
                let end = format_number(*end);
                push(&["-i", input.as_str()]);
                push(&["-ss", start.as_str(), "-to", end.as_str()]);
                push(&["-c", "copy", "-avoid_negative_ts", "1", output.as_str()]);
            }
            Self::Concat { list, output } => {
                push(&["-f", "concat", "-safe", "0", "-i", list.as_str()]);
                push(&["-c", "copy", output.as_str()]);
            }
            Self::ProbeAudio { input } => {
                push(&["-i", input.as_str(), "-map", "0:a:0", "-f", "null", "-"]);
            }
            Self::Mix {
                video,
                audio_inputs,
                filter_complex,
                audio_label,
                audio_codec,
                audio_bitrate,
                output,
            } => {
                push(&["-i", video.as_str()]);
                for audio in audio_inputs {
                    push(&["-i", audio.as_str()]);
                }
                push(&["-filter_complex", filter_complex.as_str()]);
                push(&["-map", "0:v", "-map", audio_label.as_str()]);
                push(&["-c:v", "copy", "-c:a", audio_codec.as_str()]);
                push(&["-b:a", audio_bitrate.as_str()]);
                push(&["-shortest", "-y", output.as_str()]);
            }
        }

        args
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ffmpeg")?;
        for arg in self.to_args() {
            if arg.contains(' ') || arg.contains(';') || arg.is_empty() {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_have_no_trailing_zeros() {
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn trim_args() {
        let cmd = EngineCommand::trim("input_0.mp4", "trimmed_0.mp4", 2.0, 5.0);
        assert_eq!(
            cmd.to_args(),
            [
                "-i",
                "input_0.mp4",
                "-ss",
                "2",
                "-to",
                "5",
                "-c",
                "copy",
                "-avoid_negative_ts",
                "1",
                "trimmed_0.mp4"
            ]
        );
        assert_eq!(cmd.output(), Some("trimmed_0.mp4"));
    }

    #[test]
    fn concat_args() {
        let cmd = EngineCommand::concat("filelist.txt", "final.mp4");
        assert_eq!(
            cmd.to_args().join(" "),
            "-f concat -safe 0 -i filelist.txt -c copy final.mp4"
        );
    }

    #[test]
    fn probe_writes_nothing() {
        let cmd = EngineCommand::probe_audio("final.mp4");
        assert_eq!(cmd.to_args().join(" "), "-i final.mp4 -map 0:a:0 -f null -");
        assert_eq!(cmd.output(), None);
        assert_eq!(cmd.label(), "probe");
    }

    #[test]
    fn mix_args_map_video_and_mixed_audio() {
        let cmd = EngineCommand::Mix {
            video: "final.mp4".to_string(),
            audio_inputs: vec!["audio_0.mp3".to_string(), "audio_1.wav".to_string()],
            filter_complex: "[1:a]asetpts=PTS-STARTPTS[a0];[a0]amix=inputs=1:normalize=0,apad[aout]"
                .to_string(),
            audio_label: "[aout]".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            output: "final_audio.mp4".to_string(),
        };
        let args = cmd.to_args();
        assert_eq!(&args[..6], ["-i", "final.mp4", "-i", "audio_0.mp3", "-i", "audio_1.wav"]);
        assert_eq!(
            args[8..].join(" "),
            "-map 0:v -map [aout] -c:v copy -c:a aac -b:a 128k -shortest -y final_audio.mp4"
        );
    }

    #[test]
    fn display_quotes_graphs() {
        let cmd = EngineCommand::concat("file list.txt", "final.mp4");
        assert!(cmd.to_string().starts_with("ffmpeg -f concat"));
        assert!(cmd.to_string().contains("\"file list.txt\""));
    }
}
