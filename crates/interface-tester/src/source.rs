//! Contract test spec retrieval.
//!
//! The `SpecSource` trait abstracts fetching an interface's contract tests.
//! `GitSpecSource` shallow-clones the contract repository; `DirectorySpecSource`
//! reads an existing checkout; `InMemorySpecSource` serves fixed specs for
//! testing.
//!
//! On-disk layout, relative to `<checkout>/<base_path>`:
//!
//! ```text
//! <interface, '-' replaced by '_'>/
//!   v<version>/
//!     schema.yaml                  {provider: <schema>, requirer: <schema>}
//!     interface_tests/
//!       provider.yaml              [<test case>, ...]
//!       requirer.yaml              [<test case>, ...]
//! ```
//!
//! Every document may also be written as `.yml` or `.json`, and every document
//! is optional; only the version directory itself must exist.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::ContractSource;
use crate::error::{TesterError, TesterResult};
use crate::types::{InterfaceTestSpec, Role, RoleTestSpec, Schema, TestCase};

/// Extensions tried, in order, for every contract document.
const DOCUMENT_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Directory holding per-role test case files.
pub const TESTS_DIR: &str = "interface_tests";

// ── SpecSource Trait ───────────────────────────────────────────────────

/// Fetches contract test specs for an interface version.
pub trait SpecSource: Send + Sync {
    /// Fetch both roles' specs.
    ///
    /// Fails with [`TesterError::Retrieval`] if the interface version does not
    /// exist at the configured location and revision.
    fn fetch(
        &self,
        source: &ContractSource,
        interface: &str,
        version: u32,
    ) -> TesterResult<InterfaceTestSpec>;

    /// Name of this source for logging.
    fn name(&self) -> &str;
}

// ── Directory source ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    provider: Schema,
    #[serde(default)]
    requirer: Schema,
}

/// Reads contract specs from a local checkout.
#[derive(Clone, Debug)]
pub struct DirectorySpecSource {
    root: PathBuf,
}

impl DirectorySpecSource {
    /// Source rooted at a checkout of the contract repository.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Checkout root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory expected to hold `interface` at `version`.
    pub fn version_dir(&self, source: &ContractSource, interface: &str, version: u32) -> PathBuf {
        self.root
            .join(&source.base_path)
            .join(interface.replace('-', "_"))
            .join(format!("v{}", version))
    }

    fn read_document<T: DeserializeOwned>(dir: &Path, stem: &str) -> TesterResult<Option<T>> {
        for ext in DOCUMENT_EXTENSIONS {
            let path = dir.join(format!("{}.{}", stem, ext));
            if !path.is_file() {
                continue;
            }
            let text = fs::read_to_string(&path)?;
            // YAML is a superset of JSON, one parser covers every extension.
            let doc = serde_yaml::from_str(&text).map_err(|e| TesterError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            debug!(path = %path.display(), "loaded contract document");
            return Ok(Some(doc));
        }
        Ok(None)
    }
}

impl SpecSource for DirectorySpecSource {
    fn fetch(
        &self,
        source: &ContractSource,
        interface: &str,
        version: u32,
    ) -> TesterResult<InterfaceTestSpec> {
        let dir = self.version_dir(source, interface, version);
        if !dir.is_dir() {
            return Err(TesterError::Retrieval(format!(
                "interface spec dir not found at expected location: check that {} is a valid \
                 path in the contract repository selected for this run",
                dir.display()
            )));
        }

        let schemas: SchemaDocument = Self::read_document(&dir, "schema")?.unwrap_or_default();
        let tests_dir = dir.join(TESTS_DIR);
        let tests_for = |role: Role| -> TesterResult<Vec<TestCase>> {
            Ok(Self::read_document(&tests_dir, role.as_str())?.unwrap_or_default())
        };

        Ok(InterfaceTestSpec {
            provider: RoleTestSpec::new(tests_for(Role::Provider)?, schemas.provider),
            requirer: RoleTestSpec::new(tests_for(Role::Requirer)?, schemas.requirer),
        })
    }

    fn name(&self) -> &str {
        "directory"
    }
}

// ── Git source ─────────────────────────────────────────────────────────

/// Shallow-clones the contract repository into a temporary directory.
#[derive(Clone, Debug)]
pub struct GitSpecSource {
    git: PathBuf,
}

impl GitSpecSource {
    /// Source using `git` from `PATH`.
    pub fn new() -> Self {
        Self { git: "git".into() }
    }

    /// Source using a specific git binary.
    pub fn with_git(git: impl Into<PathBuf>) -> Self {
        Self { git: git.into() }
    }
}

impl Default for GitSpecSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecSource for GitSpecSource {
    fn fetch(
        &self,
        source: &ContractSource,
        interface: &str,
        version: u32,
    ) -> TesterResult<InterfaceTestSpec> {
        let checkout = tempfile::tempdir()
            .map_err(|e| TesterError::Retrieval(format!("cannot create checkout dir: {}", e)))?;

        debug!(repo = %source.repo, branch = %source.branch, "cloning contract repository");
        let output = Command::new(&self.git)
            .args(["clone", "--depth", "1", "--branch"])
            .arg(&source.branch)
            .arg(&source.repo)
            .current_dir(checkout.path())
            .output()
            .map_err(|e| {
                TesterError::Retrieval(format!("cannot run {}: {}", self.git.display(), e))
            })?;

        if !output.status.success() {
            return Err(TesterError::Retrieval(format!(
                "failed to fetch {}:{}, check that the ref is correct. out={} err={}",
                source.repo,
                source.branch,
                String::from_utf8_lossy(&output.stdout).trim(),
                String::from_utf8_lossy(&output.stderr).trim(),
            )));
        }

        // The checkout is removed when `checkout` drops, after parsing.
        DirectorySpecSource::new(checkout.path().join(source.repo_name())).fetch(
            source,
            interface,
            version,
        )
    }

    fn name(&self) -> &str {
        "git"
    }
}

// ── In-memory source ───────────────────────────────────────────────────

/// Serves fixed specs keyed by interface and version.
#[derive(Clone, Debug, Default)]
pub struct InMemorySpecSource {
    specs: HashMap<(String, u32), InterfaceTestSpec>,
}

impl InMemorySpecSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a spec.
    pub fn with_spec(mut self, interface: &str, version: u32, spec: InterfaceTestSpec) -> Self {
        self.specs.insert((interface.to_string(), version), spec);
        self
    }
}

impl SpecSource for InMemorySpecSource {
    fn fetch(
        &self,
        _source: &ContractSource,
        interface: &str,
        version: u32,
    ) -> TesterResult<InterfaceTestSpec> {
        self.specs
            .get(&(interface.to_string(), version))
            .cloned()
            .ok_or_else(|| {
                TesterError::Retrieval(format!("no spec registered for {}/v{}", interface, version))
            })
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RawEvent;

    fn write(path: PathBuf, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn version_dir_replaces_dashes() {
        let source = DirectorySpecSource::new("/checkout");
        let dir = source.version_dir(&ContractSource::default(), "tls-certificates", 2);
        assert_eq!(dir, PathBuf::from("/checkout/interfaces/tls_certificates/v2"));
    }

    #[test]
    fn directory_source_reads_tests_and_schemas() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("interfaces/mysql_client/v0");
        write(
            dir.join("schema.yaml"),
            "provider:\n  type: object\nrequirer:\n  type: object\n",
        );
        write(
            dir.join("interface_tests/provider.yaml"),
            r#"
- name: provider_publishes_endpoint
  event: database-relation-joined
- name: provider_handles_update
  event:
    name: update_status
"#,
        );
        write(
            dir.join("interface_tests/requirer.json"),
            r#"[{"name": "requirer_starts", "event": "start"}]"#,
        );

        let spec = DirectorySpecSource::new(root.path())
            .fetch(&ContractSource::default(), "mysql-client", 0)
            .unwrap();
        assert_eq!(spec.provider.tests.len(), 2);
        assert_eq!(spec.provider.schema.0["type"], "object");
        assert_eq!(
            spec.provider.tests[0].event,
            RawEvent::Name("database-relation-joined".into())
        );
        assert_eq!(spec.requirer.tests[0].name, "requirer_starts");
    }

    #[test]
    fn json_documents_carry_unit_databags() {
        let root = tempfile::tempdir().unwrap();
        write(
            root.path().join("interfaces/db/v0/interface_tests/provider.json"),
            r#"[
  {
    "name": "provider_reads_unit_data",
    "input_state": {
      "relations": [
        {"endpoint": "database", "interface": "db",
         "remote_units_data": {"0": {"host": "10.0.0.1"}}}
      ]
    },
    "event": "database-relation-changed"
  },
  {
    "name": "provider_sees_departing_unit",
    "event": {
      "name": "database-relation-departed",
      "relation": {"endpoint": "database", "interface": "db",
                   "remote_units_data": {"1": {"host": "10.0.0.2"}}}
    }
  }
]"#,
        );

        let spec = DirectorySpecSource::new(root.path())
            .fetch(&ContractSource::default(), "db", 0)
            .unwrap();
        let tests = &spec.provider.tests;
        assert_eq!(tests.len(), 2);

        let input = tests[0].input_state.as_ref().unwrap();
        assert_eq!(input.relations[0].remote_units_data["0"]["host"], "10.0.0.1");

        match &tests[1].event {
            RawEvent::Structured(event) => {
                let relation = event.relation.as_ref().unwrap();
                assert_eq!(relation.remote_units_data["1"]["host"], "10.0.0.2");
            }
            other => panic!("expected a structured event, got {other:?}"),
        }
    }

    #[test]
    fn directory_source_tolerates_missing_documents() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("interfaces/db/v1")).unwrap();
        let spec = DirectorySpecSource::new(root.path())
            .fetch(&ContractSource::default(), "db", 1)
            .unwrap();
        assert!(spec.has_no_tests());
        assert!(spec.provider.schema.is_empty());
    }

    #[test]
    fn missing_version_dir_is_a_retrieval_error() {
        let root = tempfile::tempdir().unwrap();
        let err = DirectorySpecSource::new(root.path())
            .fetch(&ContractSource::default(), "db", 3)
            .unwrap_err();
        assert!(matches!(err, TesterError::Retrieval(_)));
        assert!(err.to_string().contains("v3"));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let root = tempfile::tempdir().unwrap();
        write(
            root.path().join("interfaces/db/v0/interface_tests/provider.yaml"),
            "- name: missing_event\n",
        );
        let err = DirectorySpecSource::new(root.path())
            .fetch(&ContractSource::default(), "db", 0)
            .unwrap_err();
        assert!(matches!(err, TesterError::Parse { .. }));
    }

    #[test]
    fn git_source_reports_missing_binary() {
        let source = GitSpecSource::with_git("/nonexistent/git-binary");
        let err = source.fetch(&ContractSource::default(), "db", 0).unwrap_err();
        assert!(matches!(err, TesterError::Retrieval(_)));
    }

    #[test]
    fn in_memory_source() {
        let source = InMemorySpecSource::new().with_spec("db", 0, InterfaceTestSpec::default());
        assert!(source.fetch(&ContractSource::default(), "db", 0).is_ok());
        let err = source.fetch(&ContractSource::default(), "db", 1).unwrap_err();
        assert!(matches!(err, TesterError::Retrieval(_)));
    }
}
