//! Domain model: barcodes, packages, dialogue sessions and the ports the
//! conversation engine talks to.

pub mod conversation;
pub mod event;
pub mod identifier;
pub mod package;
pub mod ports;
