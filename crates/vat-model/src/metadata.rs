use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Per-dataset enum vocabularies: dataset name -> field name -> ordered values.
pub type EnumDefinitions = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// How provenance merges resolve a key claimed by two different sources.
///
/// The safe default rejects: a collision means two reference collections
/// disagree about who provides a dataset or enum vocabulary, and silently
/// picking one would corrupt the provenance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    #[default]
    Reject,
    LastWriteWins,
}

/// Idempotency token for one ingested project batch. Membership in the
/// annotation table's `updates` ledger marks the pair as already folded in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub callset: String,
    pub project_guid: String,
}

impl UpdateRecord {
    pub fn new(callset: impl Into<String>, project_guid: impl Into<String>) -> Self {
        Self {
            callset: callset.into(),
            project_guid: project_guid.into(),
        }
    }
}

/// Global metadata of an assembled reference dataset collection.
///
/// Rebuilding a collection replaces this wholesale; nothing from a prior
/// build survives. When the collection is folded into an annotation table
/// the derived provenance views below are merged instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    /// Build timestamp, RFC 3339.
    pub date: String,
    /// Semantic version of the collection build.
    pub version: String,
    /// Dataset name -> source table path.
    pub datasets: BTreeMap<String, String>,
    /// Enum vocabularies declared by member datasets.
    #[serde(default)]
    pub enum_definitions: EnumDefinitions,
}

/// Global metadata of the long-lived annotation table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationMetadata {
    /// Source name -> path, accumulated from every collection consulted.
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
    /// Collection name -> semantic version.
    #[serde(default)]
    pub versions: BTreeMap<String, String>,
    /// Enum vocabularies accumulated from every collection consulted.
    #[serde(default)]
    pub enums: EnumDefinitions,
    /// Ledger of `(callset, project_guid)` pairs already applied.
    /// Grows monotonically; entries are never removed.
    #[serde(default)]
    pub updates: BTreeSet<UpdateRecord>,
}

impl AnnotationMetadata {
    /// Drop accumulated provenance ahead of re-deriving it from the
    /// collections consulted by the current run. The updates ledger is
    /// untouched.
    pub fn reset_provenance(&mut self) {
        self.paths.clear();
        self.versions.clear();
        self.enums.clear();
    }

    /// Fold one collection's provenance into the accumulator.
    ///
    /// Field-wise union: dataset paths and enum vocabularies merge under
    /// their dataset names, the collection version is recorded under
    /// `collection_name`. A key already present from another source is a
    /// collision, resolved per `policy`.
    pub fn merge_collection(
        &mut self,
        collection_name: &str,
        metadata: &CollectionMetadata,
        policy: CollisionPolicy,
    ) -> Result<()> {
        for (dataset, path) in &metadata.datasets {
            insert_checked(&mut self.paths, dataset, path.clone(), "paths", policy)?;
        }
        insert_checked(
            &mut self.versions,
            collection_name,
            metadata.version.clone(),
            "versions",
            policy,
        )?;
        for (dataset, fields) in &metadata.enum_definitions {
            insert_checked(&mut self.enums, dataset, fields.clone(), "enums", policy)?;
        }
        Ok(())
    }

    /// Whether every requested pair has already been applied.
    pub fn contains_all(&self, records: &[UpdateRecord]) -> bool {
        records.iter().all(|record| self.updates.contains(record))
    }

    pub fn record_updates(&mut self, records: impl IntoIterator<Item = UpdateRecord>) {
        self.updates.extend(records);
    }
}

fn insert_checked<V: PartialEq>(
    map: &mut BTreeMap<String, V>,
    key: &str,
    value: V,
    section: &str,
    policy: CollisionPolicy,
) -> Result<()> {
    if let Some(existing) = map.get(key) {
        if *existing == value {
            return Ok(());
        }
        if policy == CollisionPolicy::Reject {
            return Err(PipelineError::MetadataCollision {
                section: section.to_string(),
                key: key.to_string(),
            });
        }
    }
    map.insert(key.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(version: &str, dataset: &str, path: &str) -> CollectionMetadata {
        CollectionMetadata {
            date: "2026-01-01T00:00:00Z".to_string(),
            version: version.to_string(),
            datasets: BTreeMap::from([(dataset.to_string(), path.to_string())]),
            enum_definitions: BTreeMap::new(),
        }
    }

    #[test]
    fn merge_accumulates_disjoint_sources() {
        let mut meta = AnnotationMetadata::default();
        meta.merge_collection("combined", &collection("1.0.0", "clinvar", "/a"), CollisionPolicy::Reject)
            .unwrap();
        meta.merge_collection("hgmd", &collection("1.0.0", "hgmd", "/b"), CollisionPolicy::Reject)
            .unwrap();
        assert_eq!(meta.paths.len(), 2);
        assert_eq!(meta.versions.len(), 2);
    }

    #[test]
    fn merge_rejects_conflicting_dataset_path() {
        let mut meta = AnnotationMetadata::default();
        meta.merge_collection("combined", &collection("1.0.0", "clinvar", "/a"), CollisionPolicy::Reject)
            .unwrap();
        let err = meta
            .merge_collection("other", &collection("2.0.0", "clinvar", "/b"), CollisionPolicy::Reject)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MetadataCollision { ref section, .. } if section == "paths"
        ));
    }

    #[test]
    fn merge_accepts_identical_re_registration() {
        let mut meta = AnnotationMetadata::default();
        let source = collection("1.0.0", "clinvar", "/a");
        meta.merge_collection("combined", &source, CollisionPolicy::Reject)
            .unwrap();
        meta.merge_collection("combined", &source, CollisionPolicy::Reject)
            .unwrap();
        assert_eq!(meta.paths.len(), 1);
    }

    #[test]
    fn last_write_wins_overwrites() {
        let mut meta = AnnotationMetadata::default();
        meta.merge_collection(
            "combined",
            &collection("1.0.0", "clinvar", "/a"),
            CollisionPolicy::LastWriteWins,
        )
        .unwrap();
        meta.merge_collection(
            "other",
            &collection("2.0.0", "clinvar", "/b"),
            CollisionPolicy::LastWriteWins,
        )
        .unwrap();
        assert_eq!(meta.paths.get("clinvar").map(String::as_str), Some("/b"));
    }

    #[test]
    fn updates_ledger_only_grows() {
        let mut meta = AnnotationMetadata::default();
        let first = UpdateRecord::new("gs://callsets/c1.vcf.gz", "P1");
        meta.record_updates([first.clone()]);
        meta.record_updates([first.clone(), UpdateRecord::new("gs://callsets/c2.vcf.gz", "P2")]);
        assert_eq!(meta.updates.len(), 2);
        assert!(meta.contains_all(&[first]));
        assert!(!meta.contains_all(&[UpdateRecord::new("gs://callsets/c3.vcf.gz", "P3")]));
    }

    #[test]
    fn reset_preserves_updates() {
        let mut meta = AnnotationMetadata::default();
        meta.record_updates([UpdateRecord::new("c", "p")]);
        meta.merge_collection("combined", &collection("1.0.0", "clinvar", "/a"), CollisionPolicy::Reject)
            .unwrap();
        meta.reset_provenance();
        assert!(meta.paths.is_empty());
        assert!(meta.versions.is_empty());
        assert_eq!(meta.updates.len(), 1);
    }
}
