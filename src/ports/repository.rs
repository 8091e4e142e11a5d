//! Repository port for trained agent persistence.
//!
//! This module defines the trait boundary between the domain and infrastructure
//! layers for storing and retrieving a trained agent (codebook plus value table).

use std::path::Path;

use crate::{Result, q_learning::SavedAgent};

/// Port for persisting and loading trained agents.
///
/// This trait abstracts the storage mechanism, allowing different implementations
/// (MessagePack, in-memory, etc.) without coupling the domain logic to
/// specific serialization formats.
///
/// # Examples
///
/// ```no_run
/// use platformer_q::ports::AgentRepository;
/// use platformer_q::q_learning::SavedAgent;
/// use std::path::Path;
///
/// fn store<R: AgentRepository>(
///     repo: &R,
///     agent: &SavedAgent,
///     path: &Path,
/// ) -> platformer_q::Result<()> {
///     repo.save(agent, path)
/// }
/// ```
pub trait AgentRepository {
    /// Save an agent to persistent storage.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path cannot be created or written to
    /// - Serialization fails
    fn save(&self, agent: &SavedAgent, path: &Path) -> Result<()>;

    /// Load an agent from persistent storage.
    ///
    /// Loading is all-or-nothing: a corrupt or version-mismatched record
    /// yields [`crate::Error::Load`] and no partially restored agent.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist or cannot be read
    /// - The record is corrupted or from an unsupported version
    fn load(&self, path: &Path) -> Result<SavedAgent>;
}
