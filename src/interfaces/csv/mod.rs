//! CSV adapters used by the console gateway and the daily dump.

pub mod event_reader;
pub mod prompt_writer;
pub mod record_writer;
