//! Confirmation gate around mutating steps
//!
//! A mutating step (writing the archive, uploading the blob) is described in
//! one line and handed to [`ConfirmGate::run`]. Depending on the mode the
//! step is performed straight away, performed after the user agrees, or
//! only described (what-if).

use crate::core::error::{PublishError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::path::PathBuf;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

/// How the gate decides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmMode {
    /// Ask the prompter before each mutating step
    #[default]
    Prompt,
    /// Proceed without asking (force flag, `--yes`, CI)
    AssumeYes,
    /// Describe each step and skip it
    WhatIf,
}

/// Outcome of a gated step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome<T> {
    Taken(T),
    Skipped,
}

impl<T> GateOutcome<T> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, GateOutcome::Skipped)
    }
}

/// Source of yes/no answers
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn ask(&self, question: &str) -> Result<bool>;
}

/// Prompter reading answers from standard input
///
/// End of input counts as "no".
pub struct StdinPrompter;

#[async_trait]
impl Prompter for StdinPrompter {
    async fn ask(&self, question: &str) -> Result<bool> {
        let stdio_err = |e| PublishError::io(PathBuf::from("<stdin>"), e);

        let mut stdout = io::stdout();
        stdout
            .write_all(format!("{} (yes/no): ", question).as_bytes())
            .await
            .map_err(stdio_err)?;
        stdout.flush().await.map_err(stdio_err)?;

        let mut reader = BufReader::new(io::stdin());
        let mut answer = String::new();
        reader.read_line(&mut answer).await.map_err(stdio_err)?;

        let answer = answer.trim().to_lowercase();
        Ok(answer == "yes" || answer == "y")
    }
}

/// Prompter with a fixed answer
pub struct FixedPrompter(pub bool);

#[async_trait]
impl Prompter for FixedPrompter {
    async fn ask(&self, _question: &str) -> Result<bool> {
        Ok(self.0)
    }
}

/// Gate wrapping every mutating step of a run
pub struct ConfirmGate {
    mode: ConfirmMode,
    prompter: Box<dyn Prompter>,
}

impl ConfirmGate {
    pub fn new(mode: ConfirmMode, prompter: Box<dyn Prompter>) -> Self {
        Self { mode, prompter }
    }

    /// Gate that never asks
    pub fn assume_yes() -> Self {
        Self::new(ConfirmMode::AssumeYes, Box::new(FixedPrompter(true)))
    }

    /// Gate that describes and skips every step
    pub fn what_if() -> Self {
        Self::new(ConfirmMode::WhatIf, Box::new(FixedPrompter(false)))
    }

    /// Interactive gate on stdin
    pub fn interactive() -> Self {
        Self::new(ConfirmMode::Prompt, Box::new(StdinPrompter))
    }

    pub fn mode(&self) -> ConfirmMode {
        self.mode
    }

    /// Run `action` if the step described by `description` is confirmed
    ///
    /// `force` bypasses the prompt but not what-if mode.
    pub async fn run<T, F, Fut>(
        &self,
        description: &str,
        force: bool,
        action: F,
    ) -> Result<GateOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let proceed = match self.mode {
            ConfirmMode::WhatIf => {
                tracing::info!("What if: {}", description);
                false
            }
            ConfirmMode::AssumeYes => true,
            ConfirmMode::Prompt if force => true,
            ConfirmMode::Prompt => self.prompter.ask(description).await?,
        };

        if !proceed {
            tracing::warn!("Skipped: {}", description);
            return Ok(GateOutcome::Skipped);
        }

        action().await.map(GateOutcome::Taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPrompter {
        answer: bool,
        asked: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Prompter for CountingPrompter {
        async fn ask(&self, _question: &str) -> Result<bool> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer)
        }
    }

    fn counting_gate(answer: bool) -> (ConfirmGate, Arc<AtomicUsize>) {
        let asked = Arc::new(AtomicUsize::new(0));
        let prompter = CountingPrompter {
            answer,
            asked: Arc::clone(&asked),
        };
        (
            ConfirmGate::new(ConfirmMode::Prompt, Box::new(prompter)),
            asked,
        )
    }

    #[tokio::test]
    async fn test_assume_yes_runs_action() {
        let gate = ConfirmGate::assume_yes();

        let outcome = gate
            .run("Create archive", false, || async { Ok(42) })
            .await
            .unwrap();

        assert_eq!(outcome, GateOutcome::Taken(42));
    }

    #[tokio::test]
    async fn test_what_if_never_runs_action() {
        let gate = ConfirmGate::what_if();
        let ran = AtomicUsize::new(0);

        let outcome = gate
            .run("Upload blob", true, || async {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();

        assert!(outcome.is_skipped());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prompt_declined_skips() {
        let (gate, asked) = counting_gate(false);

        let outcome = gate
            .run("Upload blob", false, || async { Ok("uploaded") })
            .await
            .unwrap();

        assert!(outcome.is_skipped());
        assert_eq!(asked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prompt_accepted_runs() {
        let (gate, asked) = counting_gate(true);

        let outcome = gate
            .run("Upload blob", false, || async { Ok("uploaded") })
            .await
            .unwrap();

        assert_eq!(outcome, GateOutcome::Taken("uploaded"));
        assert_eq!(asked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_bypasses_prompt() {
        let (gate, asked) = counting_gate(false);

        let outcome = gate
            .run("Upload blob", true, || async { Ok(()) })
            .await
            .unwrap();

        assert_eq!(outcome, GateOutcome::Taken(()));
        assert_eq!(asked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_action_error_propagates() {
        let gate = ConfirmGate::assume_yes();

        let result: Result<GateOutcome<()>> = gate
            .run("Create archive", false, || async {
                Err(PublishError::DestinationExists {
                    destination: "/out/site.zip".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(PublishError::DestinationExists { .. })));
    }
}
