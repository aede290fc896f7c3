//! Telemetry line parsing.

use serde::de::Error as _;
use serde_json::Value;

use crate::error::Result;
use crate::types::{DecodedLine, Field};

/// Spelling of the humidity key used by some firmware builds.
pub const HUMIDITY_ALIAS: &str = "humidity";

/// Parses one line as a telemetry record.
///
/// # Errors
///
/// Returns `Error::Json` if the line is not a JSON object.
pub fn parse_record(line: &str) -> Result<DecodedLine> {
    // Structs also deserialize from arrays, which the device never sends
    let Value::Object(mut map) = serde_json::from_str(line.trim())? else {
        return Err(serde_json::Error::custom("telemetry line is not an object").into());
    };

    // The device's own spelling wins when both keys are present
    if let Some(value) = map.remove(HUMIDITY_ALIAS) {
        map.entry(Field::Humidity.key()).or_insert(value);
    }

    Ok(serde_json::from_value(Value::Object(map))?)
}

/// Decodes one line into the telemetry fields it carries.
///
/// Never fails: anything that is not a JSON object (debug prints, partial
/// lines after a reset) decodes to an empty line.
#[must_use]
pub fn decode_line(line: &str) -> DecodedLine {
    match parse_record(line) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::trace!("dropping non-telemetry line {:?}: {}", line, e);
            DecodedLine::default()
        }
    }
}
