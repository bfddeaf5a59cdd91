//! Terminal prompt surfaces.

use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;

use moodlog_core::error::Result;
use moodlog_core::{PromptOutcome, PromptRequest, PromptResponse, Prompter};

use crate::commands::now;

/// Asks on stdin/stdout and auto-dismisses after the request's timeout.
///
/// A single reader thread feeds lines into a channel so a prompt that timed
/// out does not leave a blocked read behind for the next one.
pub struct TerminalPrompter {
    lines: Receiver<String>,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        let (tx, lines) = mpsc::channel();
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self { lines }
    }

    fn pick(request: &PromptRequest, input: &str) -> Option<String> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if let Ok(n) = input.parse::<usize>() {
            return request
                .choices
                .get(n.checked_sub(1)?)
                .map(|mood| mood.name.clone());
        }
        Some(input.to_string())
    }
}

impl Prompter for TerminalPrompter {
    fn prompt(&mut self, request: &PromptRequest) -> Result<PromptOutcome> {
        // Anything typed while no prompt was open is not an answer.
        while self.lines.try_recv().is_ok() {}

        let mut out = std::io::stdout().lock();
        writeln!(out, "How are you feeling? ({})", request.bucket)?;
        for (i, mood) in request.choices.iter().enumerate() {
            writeln!(out, "  {:>2}. {}", i + 1, mood.name)?;
        }
        write!(out, "> ")?;
        out.flush()?;
        drop(out);

        let response = match self.lines.recv_timeout(request.timeout) {
            Ok(line) => match Self::pick(request, &line) {
                Some(name) => PromptResponse::Answered(name),
                None => PromptResponse::TimedOut,
            },
            Err(RecvTimeoutError::Timeout) => {
                println!();
                PromptResponse::TimedOut
            }
            Err(RecvTimeoutError::Disconnected) => PromptResponse::TimedOut,
        };
        Ok(PromptOutcome {
            response,
            at: now(),
        })
    }
}

/// Leaves a one-line notice and returns immediately.
#[derive(Debug, Default)]
pub struct NoticePrompter;

impl Prompter for NoticePrompter {
    fn prompt(&mut self, request: &PromptRequest) -> Result<PromptOutcome> {
        eprintln!(
            "Mood check for {}: answer with `moodlog record <MOOD>`",
            request.bucket
        );
        Ok(PromptOutcome {
            response: PromptResponse::Deferred,
            at: request.issued_at,
        })
    }
}
