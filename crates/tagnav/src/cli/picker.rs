//! Interactive candidate selection on the terminal.

use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal};

use crate::app::navigation::{Candidate, TagPicker};

/// Lists candidates on stderr and reads a 1-based choice.
pub struct PromptPicker {
    editor: Reedline,
}

impl PromptPicker {
    pub fn new() -> Self {
        Self {
            editor: Reedline::create(),
        }
    }
}

impl Default for PromptPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl TagPicker for PromptPicker {
    fn pick(&mut self, candidates: &[Candidate]) -> Option<usize> {
        for (idx, candidate) in candidates.iter().enumerate() {
            eprintln!("{:>3}  {candidate}", idx + 1);
        }

        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic("tag".into()),
            DefaultPromptSegment::Empty,
        );
        match self.editor.read_line(&prompt) {
            Ok(Signal::Success(input)) => parse_choice(&input, candidates.len()),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read selection");
                None
            }
        }
    }
}

/// Convert a 1-based answer into an index; anything else cancels.
pub fn parse_choice(input: &str, count: usize) -> Option<usize> {
    let choice: usize = input.trim().parse().ok()?;
    (1..=count).contains(&choice).then(|| choice - 1)
}
