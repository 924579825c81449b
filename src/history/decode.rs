//! Line decoding.

use crate::model::RawEntry;

/// Decode one transcript line.
///
/// Blank lines decode to `Ok(None)`. Unknown fields and entry types are
/// accepted; only text that is not a JSON entry at all is an error.
pub fn decode_line(line: &[u8]) -> Result<Option<RawEntry>, serde_json::Error> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(line).map(Some)
}
