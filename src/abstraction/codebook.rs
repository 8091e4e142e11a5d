//! Persisted codebook: PCA basis plus prototype centroids.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use super::{clustering::Prototype, pca::Basis};
use crate::{Error, Result};

/// Everything `resolve` needs, without retraining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCodebook {
    pub version: u32,
    pub basis: Basis,
    pub prototypes: Vec<Prototype>,
}

impl SavedCodebook {
    pub const VERSION: u32 = 1;

    pub fn new(basis: Basis, prototypes: Vec<Prototype>) -> Self {
        Self {
            version: Self::VERSION,
            basis,
            prototypes,
        }
    }

    /// Check version, prototype order and dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] describing the first inconsistency.
    pub fn validate(&self) -> Result<()> {
        if self.version != Self::VERSION {
            return Err(Error::load(
                "codebook",
                format!(
                    "unsupported version {} (expected {})",
                    self.version,
                    Self::VERSION
                ),
            ));
        }
        if self.prototypes.is_empty() {
            return Err(Error::load("codebook", "no prototypes"));
        }
        let components = self.basis.components();
        for (position, prototype) in self.prototypes.iter().enumerate() {
            if prototype.index != position {
                return Err(Error::load(
                    "codebook",
                    format!("prototype at {position} has index {}", prototype.index),
                ));
            }
            if prototype.centroid.len() != components {
                return Err(Error::load(
                    "codebook",
                    format!(
                        "prototype {position} has {} components, basis has {components}",
                        prototype.centroid.len()
                    ),
                ));
            }
        }
        // Re-run the basis shape checks on deserialized data.
        Basis::from_parts(
            self.basis.mean().to_vec(),
            self.basis.directions().to_vec(),
            self.basis.eigenvalues().to_vec(),
        )?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec(self).map_err(|e| Error::SerializationContext {
            operation: "serialize codebook to MessagePack".to_string(),
            message: e.to_string(),
        })
    }

    /// Decode and validate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] on corrupt bytes or an inconsistent codebook.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let saved: SavedCodebook =
            rmp_serde::from_slice(bytes).map_err(|e| Error::load("codebook", e.to_string()))?;
        saved.validate()?;
        Ok(saved)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref()).map_err(|source| Error::Io {
            operation: format!("create file {}", path.as_ref().display()),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        rmp_serde::encode::write(&mut writer, self).map_err(|e| Error::SerializationContext {
            operation: "serialize codebook to MessagePack".to_string(),
            message: e.to_string(),
        })?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|source| Error::Io {
            operation: format!("open file {}", path.as_ref().display()),
            source,
        })?;
        let saved: SavedCodebook = rmp_serde::decode::from_read(BufReader::new(file))
            .map_err(|e| Error::load("codebook", e.to_string()))?;
        saved.validate()?;
        Ok(saved)
    }
}
