// Operator prompts on the terminal

use async_trait::async_trait;
use itl_core::traits::OperatorGate;
use itl_core::workflow::Phase;
use std::io::{self, BufRead, Write};

/// Asks the operator on stdin before every phase
///
/// Only an exact `y` (surrounding whitespace ignored) confirms.
#[derive(Debug, Default)]
pub struct TerminalGate;

#[async_trait]
impl OperatorGate for TerminalGate {
    async fn confirm(&self, phase: &Phase) -> bool {
        let prompt = phase.prompt();
        let answer = tokio::task::spawn_blocking(move || ask(&prompt)).await;

        match answer {
            Ok(Ok(line)) => is_confirmation(&line),
            Ok(Err(e)) => {
                tracing::error!("Failed to read the operator's answer: {}", e);
                false
            }
            Err(e) => {
                tracing::error!("Prompt task failed: {}", e);
                false
            }
        }
    }
}

/// Print `prompt` and read one line from stdin
pub fn ask(prompt: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    stdout.write_all(prompt.as_bytes())?;
    stdout.flush()?;

    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stdin closed",
        ));
    }
    Ok(line)
}

fn is_confirmation(answer: &str) -> bool {
    answer.trim() == "y"
}
