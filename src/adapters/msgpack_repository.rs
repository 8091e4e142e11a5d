//! MessagePack implementation of the agent repository.
//!
//! This adapter implements the AgentRepository port using rmp_serde for
//! compact binary serialization.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use crate::{Result, error::Error, ports::AgentRepository, q_learning::SavedAgent};

/// MessagePack-based agent repository.
///
/// Loads are validated before they are returned, so a corrupt or
/// version-mismatched file surfaces as [`Error::Load`].
///
/// # Examples
///
/// ```no_run
/// use platformer_q::adapters::MsgPackRepository;
/// use platformer_q::ports::AgentRepository;
/// use std::path::Path;
///
/// let repo = MsgPackRepository;
/// let saved = repo.load(Path::new("trained.msgpack"))?;
/// repo.save(&saved, Path::new("copy.msgpack"))?;
/// # Ok::<(), platformer_q::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackRepository;

impl MsgPackRepository {
    /// Create a new MessagePack repository.
    pub fn new() -> Self {
        Self
    }
}

impl AgentRepository for MsgPackRepository {
    fn save(&self, agent: &SavedAgent, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|source| Error::Io {
            operation: format!("create file {path:?}"),
            source,
        })?;
        let mut writer = BufWriter::new(file);

        rmp_serde::encode::write(&mut writer, agent).map_err(|e| Error::SerializationContext {
            operation: "serialize agent to MessagePack".to_string(),
            message: e.to_string(),
        })?;
        writer.flush()?;

        Ok(())
    }

    fn load(&self, path: &Path) -> Result<SavedAgent> {
        let file = File::open(path).map_err(|source| Error::Io {
            operation: format!("open file {path:?}"),
            source,
        })?;

        let agent: SavedAgent = rmp_serde::decode::from_read(BufReader::new(file))
            .map_err(|e| Error::load("agent", e.to_string()))?;
        agent.validate()?;

        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_load_nonexistent_returns_error() {
        let repo = MsgPackRepository::new();
        let result = repo.load(Path::new("/tmp/nonexistent_platformer_12345.msgpack"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_load_garbage_is_load_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("garbage.msgpack");
        std::fs::write(&path, b"not an agent").expect("Failed to write");

        let result = MsgPackRepository::new().load(&path);
        assert!(matches!(result, Err(Error::Load { .. })));
    }
}
