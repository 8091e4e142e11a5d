//! Persistence for value tables and trained agents.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    abstraction::SavedCodebook,
    features::ExtractorConfig,
    q_learning::{
        agent::LearningParams,
        q_table::{ValueRecord, ValueTable},
    },
    types::{Action, StateActionKey},
};

/// Versioned record list behind [`ValueTable::export`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedValueTable {
    pub version: u32,
    pub initial_value: f64,
    pub records: Vec<ValueRecord>,
}

impl SavedValueTable {
    pub const VERSION: u32 = 1;

    pub fn from_table(table: &ValueTable) -> Self {
        Self {
            version: Self::VERSION,
            initial_value: table.initial_value(),
            records: table.records(),
        }
    }

    /// Build the table, rejecting the whole blob on the first bad record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] for a version mismatch, an unknown action id,
    /// a duplicate key, or (with `codebook_size`) an out-of-range state id.
    pub fn to_table(&self, codebook_size: Option<usize>) -> Result<ValueTable> {
        if self.version != Self::VERSION {
            return Err(Error::load(
                "value table",
                format!(
                    "unsupported version {} (expected {})",
                    self.version,
                    Self::VERSION
                ),
            ));
        }
        let mut values = HashMap::with_capacity(self.records.len());
        for record in &self.records {
            let action = Action::from_id(record.action_id)
                .map_err(|e| Error::load("value table", e.to_string()))?;
            if let Some(size) = codebook_size.filter(|&size| record.state_id >= size) {
                return Err(Error::load(
                    "value table",
                    format!(
                        "state {} outside codebook of size {size}",
                        record.state_id
                    ),
                ));
            }
            let key = StateActionKey::new(record.state_id, action);
            if values.insert(key, record.value).is_some() {
                return Err(Error::load("value table", format!("duplicate key {key}")));
            }
        }
        Ok(ValueTable::from_parts(self.initial_value, values))
    }
}

impl ValueTable {
    /// MessagePack blob of the sorted record list.
    pub fn export(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec(&SavedValueTable::from_table(self)).map_err(|e| {
            Error::SerializationContext {
                operation: "serialize value table to MessagePack".to_string(),
                message: e.to_string(),
            }
        })
    }

    /// # Errors
    ///
    /// Returns [`Error::Load`] on a corrupt or incompatible blob.
    pub fn import(blob: &[u8]) -> Result<ValueTable> {
        decode(blob)?.to_table(None)
    }

    /// Replace this table's contents with `blob`; untouched on failure.
    pub fn import_into(&mut self, blob: &[u8]) -> Result<()> {
        *self = Self::import(blob)?;
        Ok(())
    }

    /// Like [`ValueTable::import_into`], also requiring every state id to
    /// lie in `[0, codebook_size)`.
    pub fn import_checked(&mut self, blob: &[u8], codebook_size: usize) -> Result<()> {
        *self = decode(blob)?.to_table(Some(codebook_size))?;
        Ok(())
    }

    /// Write `state_id,action_id,action,value` rows in key order.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        for record in self.records() {
            let action = Action::from_id(record.action_id)?;
            csv.serialize(CsvRow {
                state_id: record.state_id,
                action_id: record.action_id,
                action: action.name(),
                value: record.value,
            })?;
        }
        csv.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    state_id: usize,
    action_id: usize,
    action: &'a str,
    value: f64,
}

fn decode(blob: &[u8]) -> Result<SavedValueTable> {
    rmp_serde::from_slice(blob).map_err(|e| Error::load("value table", e.to_string()))
}

/// Training run summary stored alongside a saved agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    /// Learning episodes run
    pub episodes_trained: Option<usize>,
    /// Feature vectors used to train the abstraction
    pub batch_size: Option<usize>,
    /// Random seed used (if any)
    pub seed: Option<u64>,
    /// Seconds since the Unix epoch when saved
    pub saved_at: Option<u64>,
    /// Environment the agent was trained in
    pub environment: Option<String>,
}

impl TrainingMetadata {
    pub fn stamped(mut self) -> Self {
        self.saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_secs());
        self
    }
}

/// Everything needed to resume or evaluate a trained agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedAgent {
    pub version: u32,
    pub extractor: ExtractorConfig,
    pub codebook: SavedCodebook,
    pub values: SavedValueTable,
    pub params: LearningParams,
    pub metadata: TrainingMetadata,
}

impl SavedAgent {
    pub const VERSION: u32 = 1;

    pub fn new(
        extractor: ExtractorConfig,
        codebook: SavedCodebook,
        table: &ValueTable,
        params: LearningParams,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            version: Self::VERSION,
            extractor,
            codebook,
            values: SavedValueTable::from_table(table),
            params,
            metadata,
        }
    }

    /// Check every nested part without building anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] for the first inconsistency found.
    pub fn validate(&self) -> Result<()> {
        if self.version != Self::VERSION {
            return Err(Error::load(
                "agent",
                format!(
                    "unsupported version {} (expected {})",
                    self.version,
                    Self::VERSION
                ),
            ));
        }
        self.codebook.validate()?;
        self.params
            .validate()
            .map_err(|e| Error::load("agent", e.to_string()))?;
        let expected = self.extractor.feature_len();
        if self.codebook.basis.dimension() != expected {
            return Err(Error::load(
                "agent",
                format!(
                    "codebook expects {} features, extractor produces {expected}",
                    self.codebook.basis.dimension()
                ),
            ));
        }
        self.values.to_table(Some(self.codebook.prototypes.len()))?;
        Ok(())
    }

    /// Value table checked against this agent's codebook.
    pub fn value_table(&self) -> Result<ValueTable> {
        self.values.to_table(Some(self.codebook.prototypes.len()))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref()).map_err(|source| Error::Io {
            operation: format!("create file {}", path.as_ref().display()),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        rmp_serde::encode::write(&mut writer, self).map_err(|e| Error::SerializationContext {
            operation: "serialize agent to MessagePack".to_string(),
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
        let saved: SavedAgent = rmp_serde::decode::from_read(BufReader::new(file))
            .map_err(|e| Error::load("agent", e.to_string()))?;
        saved.validate()?;
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ValueTable {
        let mut table = ValueTable::new(20.0);
        table.set(0, Action::Right, 1.25);
        table.set(3, Action::LeftJumpSpeed, -7.0);
        table.set(1, Action::Stay, 0.1 + 0.2);
        table
    }

    #[test]
    fn test_export_import_exact() {
        let original = table();
        let restored = ValueTable::import(&original.export().unwrap()).unwrap();
        assert_eq!(restored, original);
        assert_eq!(
            restored.get(1, Action::Stay).to_bits(),
            (0.1f64 + 0.2).to_bits()
        );
    }

    #[test]
    fn test_corrupt_blob_leaves_table_untouched() {
        let mut target = table();
        let before = target.clone();
        assert!(matches!(
            target.import_into(&[0xc1, 0x00, 0x13]),
            Err(Error::Load { .. })
        ));
        assert_eq!(target, before);
    }

    #[test]
    fn test_bad_record_rejects_whole_blob() {
        let mut saved = SavedValueTable::from_table(&table());
        saved.records.push(ValueRecord {
            state_id: 9,
            action_id: 12,
            value: 1.0,
        });
        let blob = rmp_serde::to_vec(&saved).unwrap();
        let mut target = ValueTable::new(0.0);
        assert!(target.import_into(&blob).is_err());
        assert!(target.is_empty());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut saved = SavedValueTable::from_table(&table());
        saved.version = 99;
        let blob = rmp_serde::to_vec(&saved).unwrap();
        assert!(matches!(ValueTable::import(&blob), Err(Error::Load { .. })));
    }

    #[test]
    fn test_import_checked_bounds_states() {
        let blob = table().export().unwrap();
        let mut target = ValueTable::new(0.0);
        assert!(target.import_checked(&blob, 3).is_err());
        assert!(target.is_empty());
        target.import_checked(&blob, 4).unwrap();
        assert_eq!(target.len(), 3);
    }

    #[test]
    fn test_csv_columns() {
        let mut out = Vec::new();
        table().write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("state_id,action_id,action,value"));
        assert_eq!(lines.next(), Some("0,8,right,1.25"));
        assert_eq!(text.lines().count(), 4);
    }
}
