use crate::domain::event::Prompt;
use crate::error::{ParcelError, Result};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct PromptRow<'a> {
    chat_id: i64,
    replace_previous: bool,
    text: &'a str,
    /// JSON array of `{label, tag}` objects; empty when there are no buttons.
    choices: String,
}

/// Writes outbound prompts as CSV: `chat_id,replace_previous,text,choices`.
pub struct PromptWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PromptWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_prompts(&mut self, prompts: &[Prompt]) -> Result<()> {
        for prompt in prompts {
            let choices = if prompt.choices.is_empty() {
                String::new()
            } else {
                serde_json::to_string(&prompt.choices)
                    .map_err(|e| ParcelError::ValidationError(e.to_string()))?
            };
            self.writer.serialize(PromptRow {
                chat_id: prompt.chat_id,
                replace_previous: prompt.replace_previous,
                text: &prompt.text,
                choices,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
