//! Media operations built from engine commands.
//!
//! - [`clip`]: stream-copy trim and concat
//! - [`mix`]: audio probing and the overlay filter graph

pub mod clip;
pub mod mix;

use crate::command::EngineCommand;
use crate::engine::ExecOutcome;
use crate::logging::JobLogger;
use crate::orchestrator::{StepError, StepResult};
use crate::workspace::Workspace;

pub use clip::{concat, concat_manifest, trim};
pub use mix::{audio_extension, probe_audio, AudioProbe, MixGraph};

/// Run a command and require exit code 0.
///
/// Engine output is copied into the job log tail; on failure the tail is
/// shown and carried in the error.
pub async fn run_command(
    ws: &Workspace,
    logger: &JobLogger,
    command: &EngineCommand,
) -> StepResult<ExecOutcome> {
    logger.command(&command.to_string());

    let outcome = ws
        .exec(command)
        .await
        .map_err(|e| StepError::engine(command.label(), e))?;

    for line in &outcome.log_tail {
        logger.engine_line(line);
    }

    if !outcome.success() {
        logger.show_tail(command.label());
        let message = if outcome.log_tail.is_empty() {
            "engine produced no output".to_string()
        } else {
            outcome.tail_message()
        };
        return Err(StepError::processing(
            command.label(),
            outcome.exit_code,
            message,
        ));
    }

    Ok(outcome)
}
