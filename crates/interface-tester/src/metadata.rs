//! Implementation metadata and its discovery.
//!
//! The `MetadataProvider` trait abstracts how metadata for the implementation
//! under test is located. `CharmDirMetadataProvider` autoloads it from the
//! implementation's source root; `StaticMetadataProvider` returns a fixed
//! spec for testing and embedding.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{TesterError, TesterResult};
use crate::types::{ImplementationDescriptor, Role};

/// File names read from an implementation's source root.
pub const METADATA_FILE: &str = "metadata.yaml";
pub const ACTIONS_FILE: &str = "actions.yaml";
pub const CONFIG_FILE: &str = "config.yaml";

// ── Metadata ───────────────────────────────────────────────────────────

/// Declaration of a single endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// Interface the endpoint speaks.
    pub interface: String,
    /// Maximum number of relations on this endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Whether the implementation can run without this relation.
    #[serde(default)]
    pub optional: bool,
}

impl EndpointSpec {
    /// Endpoint speaking `interface` with no limit.
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            limit: None,
            optional: false,
        }
    }
}

/// Endpoint declarations of an implementation, partitioned by role.
///
/// Endpoints keep the order they are declared in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharmMetadata {
    /// Implementation name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Endpoints in the provider role.
    #[serde(default)]
    pub provides: IndexMap<String, EndpointSpec>,
    /// Endpoints in the requirer role.
    #[serde(default)]
    pub requires: IndexMap<String, EndpointSpec>,
    /// Peer endpoints (never under test).
    #[serde(default)]
    pub peers: IndexMap<String, EndpointSpec>,
}

impl CharmMetadata {
    /// Empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an endpoint for a role.
    pub fn with_endpoint(
        mut self,
        role: Role,
        endpoint: impl Into<String>,
        interface: impl Into<String>,
    ) -> Self {
        self.endpoints_mut(role)
            .insert(endpoint.into(), EndpointSpec::new(interface));
        self
    }

    /// Endpoint declarations for a role, in declaration order.
    pub fn endpoints(&self, role: Role) -> &IndexMap<String, EndpointSpec> {
        match role {
            Role::Provider => &self.provides,
            Role::Requirer => &self.requires,
        }
    }

    fn endpoints_mut(&mut self, role: Role) -> &mut IndexMap<String, EndpointSpec> {
        match role {
            Role::Provider => &mut self.provides,
            Role::Requirer => &mut self.requires,
        }
    }
}

/// Metadata plus the optional secondary documents.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCharmSpec {
    /// Endpoint metadata.
    pub meta: CharmMetadata,
    /// Action declarations, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<serde_json::Value>,
    /// Configuration options, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl ResolvedCharmSpec {
    /// Spec with metadata only.
    pub fn from_meta(meta: CharmMetadata) -> Self {
        Self {
            meta,
            actions: None,
            config: None,
        }
    }
}

// ── MetadataProvider Trait ─────────────────────────────────────────────

/// Locates metadata for an implementation.
pub trait MetadataProvider: Send + Sync {
    /// Resolve metadata for `implementation`.
    ///
    /// Fails with [`TesterError::Discovery`] if it cannot be located.
    fn resolve(&self, implementation: &ImplementationDescriptor) -> TesterResult<ResolvedCharmSpec>;

    /// Name of this provider for logging.
    fn name(&self) -> &str;
}

// ── Charm directory provider ───────────────────────────────────────────

/// Autoloads metadata from the implementation's source root.
///
/// `metadata.yaml` is required; `actions.yaml` and `config.yaml` are read
/// when present.
#[derive(Clone, Debug, Default)]
pub struct CharmDirMetadataProvider;

impl CharmDirMetadataProvider {
    pub fn new() -> Self {
        Self
    }

    fn read_optional(root: &Path, file: &str) -> TesterResult<Option<serde_json::Value>> {
        let path = root.join(file);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let value = serde_yaml::from_str(&text).map_err(|e| TesterError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(value))
    }
}

impl MetadataProvider for CharmDirMetadataProvider {
    fn resolve(
        &self,
        implementation: &ImplementationDescriptor,
    ) -> TesterResult<ResolvedCharmSpec> {
        let root = implementation.root.as_deref().ok_or_else(|| {
            TesterError::Discovery(format!(
                "{} has no source root to autoload {} from",
                implementation.name, METADATA_FILE
            ))
        })?;

        let meta_path = root.join(METADATA_FILE);
        if !meta_path.is_file() {
            return Err(TesterError::Discovery(format!(
                "{} not found at {}",
                METADATA_FILE,
                meta_path.display()
            )));
        }
        let text = fs::read_to_string(&meta_path)?;
        let meta: CharmMetadata = serde_yaml::from_str(&text).map_err(|e| TesterError::Parse {
            path: meta_path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(ResolvedCharmSpec {
            meta,
            actions: Self::read_optional(root, ACTIONS_FILE)?,
            config: Self::read_optional(root, CONFIG_FILE)?,
        })
    }

    fn name(&self) -> &str {
        "charm-dir"
    }
}

// ── Static provider ────────────────────────────────────────────────────

/// Returns a fixed spec, or fails discovery when constructed empty.
#[derive(Clone, Debug, Default)]
pub struct StaticMetadataProvider {
    spec: Option<ResolvedCharmSpec>,
}

impl StaticMetadataProvider {
    /// Provider that always resolves to `spec`.
    pub fn new(spec: ResolvedCharmSpec) -> Self {
        Self { spec: Some(spec) }
    }

    /// Provider that never finds metadata.
    pub fn empty() -> Self {
        Self { spec: None }
    }
}

impl MetadataProvider for StaticMetadataProvider {
    fn resolve(
        &self,
        implementation: &ImplementationDescriptor,
    ) -> TesterResult<ResolvedCharmSpec> {
        self.spec.clone().ok_or_else(|| {
            TesterError::Discovery(format!("no metadata registered for {}", implementation.name))
        })
    }

    fn name(&self) -> &str {
        "static"
    }
}
