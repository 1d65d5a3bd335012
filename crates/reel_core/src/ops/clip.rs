//! Stream-copy trim and concatenation.

use crate::command::EngineCommand;
use crate::logging::JobLogger;
use crate::orchestrator::StepResult;
use crate::workspace::Workspace;

use super::run_command;

/// Cut `[start, end]` seconds of `input` into `output` without re-encoding.
///
/// Cuts snap to keyframes, so the result may start slightly early.
pub async fn trim(
    ws: &Workspace,
    logger: &JobLogger,
    input: &str,
    output: &str,
    start: f64,
    end: f64,
) -> StepResult<()> {
    run_command(ws, logger, &EngineCommand::trim(input, output, start, end)).await?;
    Ok(())
}

/// Join the files listed in the manifest `list` into `output`.
pub async fn concat(ws: &Workspace, logger: &JobLogger, list: &str, output: &str) -> StepResult<()> {
    run_command(ws, logger, &EngineCommand::concat(list, output)).await?;
    Ok(())
}

/// Render a concat demuxer manifest, one `file '<name>'` line per input.
pub fn concat_manifest<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|name| format!("file '{}'", name.as_ref().replace('\'', "'\\''")))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::StepError;
    use crate::testing::MemoryEngine;
    use std::sync::Arc;

    #[test]
    fn manifest_lists_files_in_order() {
        let manifest = concat_manifest(&["trimmed_0.mp4", "trimmed_1.mp4"]);
        assert_eq!(manifest, "file 'trimmed_0.mp4'\nfile 'trimmed_1.mp4'");
    }

    #[test]
    fn manifest_escapes_quotes() {
        assert_eq!(concat_manifest(&["it's.mp4"]), "file 'it'\\''s.mp4'");
    }

    #[tokio::test]
    async fn trim_issues_stream_copy_command() {
        let engine = Arc::new(MemoryEngine::new());
        let ws = Workspace::new(engine.clone());
        let logger = JobLogger::detached("ep");
        ws.write("input_0.mp4", b"A").await.unwrap();

        trim(&ws, &logger, "input_0.mp4", "trimmed_0.mp4", 2.0, 5.0)
            .await
            .unwrap();

        let command = engine.commands().pop().unwrap().join(" ");
        assert_eq!(
            command,
            "-i input_0.mp4 -ss 2 -to 5 -c copy -avoid_negative_ts 1 trimmed_0.mp4"
        );
        assert!(ws.read("trimmed_0.mp4").await.is_ok());
    }

    #[tokio::test]
    async fn failed_command_is_processing_error() {
        let engine = Arc::new(MemoryEngine::new());
        let ws = Workspace::new(engine.clone());
        let logger = JobLogger::detached("ep");

        let err = trim(&ws, &logger, "missing.mp4", "trimmed_0.mp4", 0.0, 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::Processing { exit_code: 1, .. }));
        assert!(!logger.get_tail().is_empty());
    }

    #[tokio::test]
    async fn concat_preserves_manifest_order() {
        let engine = Arc::new(MemoryEngine::new());
        let ws = Workspace::new(engine.clone());
        let logger = JobLogger::detached("ep");
        ws.write("b.mp4", b"B").await.unwrap();
        ws.write("a.mp4", b"A").await.unwrap();
        ws.write("filelist.txt", concat_manifest(&["b.mp4", "a.mp4"]).as_bytes())
            .await
            .unwrap();

        concat(&ws, &logger, "filelist.txt", "final.mp4").await.unwrap();
        assert_eq!(ws.read("final.mp4").await.unwrap(), b"BA");
    }
}
