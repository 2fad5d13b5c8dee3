//! Interactive conflict handling.

use colored::Colorize;
use ferry_core::{ConflictContext, ConflictHandler, Resolution};
use inquire::Confirm;

use crate::output;

/// Stops on an unrecoverable conflict and waits for the operator.
///
/// The operator resolves the conflict in another terminal and finishes the
/// cherry-pick; answering no (or interrupting the prompt) aborts the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptOnConflict;

impl ConflictHandler for PromptOnConflict {
    fn on_conflict(&self, context: &ConflictContext<'_>) -> Resolution {
        output::warn(&format!(
            "cherry-pick of {} ({}) into {} stopped",
            context.commit.short_hash(),
            context.commit.message,
            context.repository
        ));
        if let Some(dir) = context.workdir {
            output::detail(&format!("  in {}", dir.display()));
        }
        for file in context.files {
            output::detail(&format!("  {} {file}", "conflict:".red()));
        }
        output::detail(context.output.trim_end());

        let answer = Confirm::new("Resolved the conflict and ran `git cherry-pick --continue`?")
            .with_default(false)
            .with_help_message("answer no to abort the synchronization")
            .prompt();

        match answer {
            Ok(true) => Resolution::Continue,
            Ok(false) => Resolution::Abort,
            Err(err) => {
                tracing::warn!(error = %err, "conflict prompt failed");
                Resolution::Abort
            }
        }
    }
}

/// The handler for this run.
#[must_use]
pub fn handler(pause_on_error: bool) -> Box<dyn ConflictHandler> {
    if pause_on_error {
        Box::new(PromptOnConflict)
    } else {
        Box::new(ferry_core::AbortOnConflict)
    }
}
