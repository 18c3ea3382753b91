//! Dataset store: the immutable list of plate records loaded once at startup.

use std::collections::HashSet;
use std::path::Path;

use crate::collate;
use crate::error::{KennzeichenError, Result};
use crate::types::{DatasetMetadata, FederalState, PlateDataset, PlateRecord};

/// Default number of entries returned by [`Dataset::suggestions`].
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<PlateRecord>,
    metadata: DatasetMetadata,
}

impl Dataset {
    /// Build a dataset from records, dropping duplicate codes (first one wins).
    pub fn from_records(records: Vec<PlateRecord>) -> Self {
        Self::with_metadata(records, DatasetMetadata::default())
    }

    pub fn with_metadata(records: Vec<PlateRecord>, metadata: DatasetMetadata) -> Self {
        let mut seen = HashSet::with_capacity(records.len());
        let mut unique = Vec::with_capacity(records.len());
        for record in records {
            if !seen.insert(record.code.to_uppercase()) {
                tracing::warn!("duplicate license plate code '{}' ignored", record.code);
                continue;
            }
            if record.state().is_none() {
                tracing::warn!(
                    "license plate '{}' has unknown federal state '{}'",
                    record.code,
                    record.federal_state
                );
            }
            unique.push(record);
        }
        Self {
            records: unique,
            metadata,
        }
    }

    /// Parse the dataset resource from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        let data: PlateDataset = serde_json::from_str(content)?;
        Ok(Self::with_metadata(data.license_plates, data.metadata))
    }

    /// Read and parse the dataset resource.
    pub fn try_load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            KennzeichenError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read dataset at {}: {}", path.display(), e),
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn records(&self) -> &[PlateRecord] {
        &self.records
    }

    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find a record by code, ignoring case.
    pub fn find(&self, code: &str) -> Option<&PlateRecord> {
        let code = code.trim();
        self.records.iter().find(|r| unicase::eq(r.code.as_str(), code))
    }

    /// Code-prefix suggestions, shortest codes first.
    pub fn suggestions(&self, input: &str, limit: usize) -> Vec<&PlateRecord> {
        let input = input.trim();
        if input.is_empty() {
            return Vec::new();
        }
        let term = input.to_lowercase();
        let mut matches: Vec<&PlateRecord> = self
            .records
            .iter()
            .filter(|r| r.code.to_lowercase().starts_with(&term))
            .collect();
        matches.sort_by(|a, b| {
            a.code
                .chars()
                .count()
                .cmp(&b.code.chars().count())
                .then_with(|| collate::compare(&a.code, &b.code))
        });
        matches.truncate(limit);
        matches
    }

    /// Number of records per known state, in [`FederalState::ALL`] order.
    pub fn state_counts(&self) -> Vec<(FederalState, usize)> {
        FederalState::ALL
            .into_iter()
            .map(|state| {
                let count = self
                    .records
                    .iter()
                    .filter(|r| r.federal_state == state.name())
                    .count();
                (state, count)
            })
            .collect()
    }
}
