//! Snapshots of a `Connections` memory with bincode.
//!
//! A snapshot carries the configuration, every pool, the per-column state and the counters, so a
//! trained pooler continues exactly where it stopped. The random number generator is not part of
//! the snapshot; it is reseeded from the configured seed when a snapshot is loaded.

use super::connections::Connections;
use crate::error::{HtmError, Result};
use std::io::{Read, Write};

impl Connections {
    /// Encodes the memory into bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| HtmError::Serialization(e.to_string()))
    }

    /// Decodes a memory produced by `to_bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut c: Connections =
            bincode::deserialize(bytes).map_err(|e| HtmError::Serialization(e.to_string()))?;
        c.reseed();
        Ok(c)
    }

    /// Writes the encoded memory to `writer`.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        bincode::serialize_into(writer, self).map_err(|e| HtmError::Serialization(e.to_string()))
    }

    /// Reads a memory written by `write_to`.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let mut c: Connections =
            bincode::deserialize_from(reader).map_err(|e| HtmError::Serialization(e.to_string()))?;
        c.reseed();
        Ok(c)
    }
}
