//! Typed view over the recognised annotations of an announcement.

use crate::config::AnnotationKeys;
use crate::metadata::{Annotation, EndpointMetadata};

/// The parts of an announcement's annotation list the registry acts on.
///
/// Parsed once when metadata enters the registry. The replica ordinal is
/// never read from the announcement; only the registry assigns it, and hosts
/// see it as the `ID` annotation on the stored metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceAnnotations {
    /// Logical service name, empty if absent.
    pub name: String,
    /// Logical parent name, empty if this is not a counted replica.
    pub parent: String,
    /// Child names this endpoint owns.
    pub children: Vec<String>,
    /// Replica ordinal handed out by the registry.
    pub(crate) assigned_id: Option<u32>,
}

impl ServiceAnnotations {
    /// Extract `Name`, `Parent` and `Children`. Blank values are skipped; a
    /// later non-blank occurrence overrides an earlier one.
    pub fn parse(annotations: &[Annotation], keys: &AnnotationKeys) -> Self {
        let mut parsed = Self::default();
        for annotation in annotations {
            if annotation.value.trim().is_empty() {
                continue;
            }
            if annotation.name == keys.name {
                parsed.name = annotation.value.clone();
            } else if annotation.name == keys.parent {
                parsed.parent = annotation.value.clone();
            } else if annotation.name == keys.children {
                parsed.children = annotation
                    .value
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
            }
        }
        parsed
    }

    /// Parse the annotations of `metadata`.
    pub fn from_metadata(metadata: &EndpointMetadata, keys: &AnnotationKeys) -> Self {
        Self::parse(&metadata.annotations, keys)
    }

    /// True if this endpoint is part of a counted replica group.
    pub fn is_replica(&self) -> bool {
        !self.parent.is_empty()
    }
}

/// Replace every `ID` annotation on `metadata` with the given ordinal.
pub(crate) fn stamp_id(metadata: &mut EndpointMetadata, keys: &AnnotationKeys, id: u32) {
    metadata.annotations.retain(|a| a.name != keys.id);
    metadata
        .annotations
        .push(Annotation::new(keys.id.clone(), id.to_string()));
}
