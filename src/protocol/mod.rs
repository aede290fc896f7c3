//! Protocol definitions for the serial link.
//!
//! This module contains the low-level protocol pieces:
//! - Line framing
//! - Telemetry line parsing
//! - Control tokens

pub mod command;
pub mod frame;
pub mod parser;

pub use command::{ControlToken, Toggle};
pub use frame::{LINE_DELIMITER, LineDecoder, MAX_LINE_LENGTH, encode as encode_line};
pub use parser::{decode_line, parse_record};
