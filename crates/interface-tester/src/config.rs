//! Tester configuration.
//!
//! Configuration is assembled incrementally from [`TesterOptions`] updates
//! into [`TesterSettings`], then validated in one step into a frozen
//! [`ResolvedConfig`]. Nothing downstream of validation ever sees a partially
//! populated configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::metadata::{CharmMetadata, MetadataProvider, ResolvedCharmSpec};
use crate::types::{ImplementationDescriptor, State};

/// Default contract repository.
pub const DEFAULT_REPO: &str = "https://github.com/canonical/charm-relation-interfaces";
/// Default contract branch.
pub const DEFAULT_BRANCH: &str = "main";
/// Default subtree holding interface specs.
pub const DEFAULT_BASE_PATH: &str = "interfaces";

// ── Contract source ────────────────────────────────────────────────────

/// Where contract tests are fetched from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSource {
    /// Repository URL or path.
    pub repo: String,
    /// Branch or tag.
    pub branch: String,
    /// Subtree holding the interface specs.
    pub base_path: String,
}

impl ContractSource {
    /// Directory name `git clone` creates for the repository.
    pub fn repo_name(&self) -> &str {
        let trimmed = self.repo.trim_end_matches('/');
        let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
        last.strip_suffix(".git").unwrap_or(last)
    }
}

impl Default for ContractSource {
    fn default() -> Self {
        Self {
            repo: DEFAULT_REPO.into(),
            branch: DEFAULT_BRANCH.into(),
            base_path: DEFAULT_BASE_PATH.into(),
        }
    }
}

impl fmt::Display for ContractSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.repo, self.branch, self.base_path)
    }
}

// ── Lenient values ─────────────────────────────────────────────────────

/// A setting that is either well-typed or kept raw for later reporting.
///
/// Values read from files deserialize as `Typed` when they fit and fall back
/// to `Raw` otherwise, so validation can report every bad field at once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lenient<T> {
    Typed(T),
    Raw(serde_json::Value),
}

impl<T> Lenient<T> {
    /// The typed value, or the raw value that failed to type-check.
    pub fn typed(&self) -> Result<&T, &serde_json::Value> {
        match self {
            Self::Typed(value) => Ok(value),
            Self::Raw(raw) => Err(raw),
        }
    }
}

impl<T> From<T> for Lenient<T> {
    fn from(value: T) -> Self {
        Self::Typed(value)
    }
}

// ── Partial options ────────────────────────────────────────────────────

/// A partial configuration update.
///
/// Fields left as `None` keep their previous value when applied. Zero is a
/// valid explicit interface version.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TesterOptions {
    pub implementation: Option<ImplementationDescriptor>,
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub base_path: Option<String>,
    pub interface_name: Option<String>,
    pub interface_version: Option<Lenient<u32>>,
    pub state_template: Option<Lenient<State>>,
    pub meta: Option<CharmMetadata>,
    pub actions: Option<serde_json::Value>,
    pub config: Option<serde_json::Value>,
}

impl TesterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn implementation(mut self, implementation: ImplementationDescriptor) -> Self {
        self.implementation = Some(implementation);
        self
    }

    pub fn repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn interface_name(mut self, name: impl Into<String>) -> Self {
        self.interface_name = Some(name.into());
        self
    }

    pub fn interface_version(mut self, version: u32) -> Self {
        self.interface_version = Some(Lenient::Typed(version));
        self
    }

    pub fn state_template(mut self, template: State) -> Self {
        self.state_template = Some(Lenient::Typed(template));
        self
    }

    pub fn meta(mut self, meta: CharmMetadata) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn actions(mut self, actions: serde_json::Value) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn overlay(self, other: TesterOptions) -> Self {
        Self {
            implementation: other.implementation.or(self.implementation),
            repo: other.repo.or(self.repo),
            branch: other.branch.or(self.branch),
            base_path: other.base_path.or(self.base_path),
            interface_name: other.interface_name.or(self.interface_name),
            interface_version: other.interface_version.or(self.interface_version),
            state_template: other.state_template.or(self.state_template),
            meta: other.meta.or(self.meta),
            actions: other.actions.or(self.actions),
            config: other.config.or(self.config),
        }
    }
}

// ── Accumulated settings ───────────────────────────────────────────────

/// Configuration as accumulated so far; not yet validated.
#[derive(Clone, Debug, PartialEq)]
pub struct TesterSettings {
    pub implementation: Option<ImplementationDescriptor>,
    pub source: ContractSource,
    pub interface_name: Option<String>,
    pub interface_version: Lenient<u32>,
    pub state_template: Option<Lenient<State>>,
    pub meta: Option<CharmMetadata>,
    pub actions: Option<serde_json::Value>,
    pub config: Option<serde_json::Value>,
}

impl Default for TesterSettings {
    fn default() -> Self {
        Self {
            implementation: None,
            source: ContractSource::default(),
            interface_name: None,
            interface_version: Lenient::Typed(0),
            state_template: None,
            meta: None,
            actions: None,
            config: None,
        }
    }
}

impl TesterSettings {
    /// Apply a partial update; absent fields keep their current value.
    pub fn apply(&mut self, options: TesterOptions) {
        let TesterOptions {
            implementation,
            repo,
            branch,
            base_path,
            interface_name,
            interface_version,
            state_template,
            meta,
            actions,
            config,
        } = options;

        if let Some(implementation) = implementation {
            self.implementation = Some(implementation);
        }
        if let Some(repo) = repo {
            self.source.repo = repo;
        }
        if let Some(branch) = branch {
            self.source.branch = branch;
        }
        if let Some(base_path) = base_path {
            self.source.base_path = base_path;
        }
        if let Some(interface_name) = interface_name {
            self.interface_name = Some(interface_name);
        }
        if let Some(interface_version) = interface_version {
            self.interface_version = interface_version;
        }
        if let Some(state_template) = state_template {
            self.state_template = Some(state_template);
        }
        if let Some(meta) = meta {
            self.meta = Some(meta);
        }
        if let Some(actions) = actions {
            self.actions = Some(actions);
        }
        if let Some(config) = config {
            self.config = Some(config);
        }
    }

    /// Validate and freeze.
    ///
    /// Metadata is resolved here, once: explicitly supplied meta wins, and
    /// `provider` is consulted only when none was supplied. Every violation
    /// is collected before failing.
    pub fn resolve(
        &self,
        provider: &dyn MetadataProvider,
    ) -> Result<ResolvedConfig, ConfigurationError> {
        let mut violations = Vec::new();

        if (self.actions.is_some() || self.config.is_some()) && self.meta.is_none() {
            violations.push("cannot set actions and config without setting meta".to_string());
        }
        if self.implementation.is_none() {
            violations.push("needs an implementation descriptor".to_string());
        }

        let charm = match (&self.meta, &self.implementation) {
            (Some(meta), _) => Some(ResolvedCharmSpec {
                meta: meta.clone(),
                actions: self.actions.clone(),
                config: self.config.clone(),
            }),
            (None, Some(implementation)) => match provider.resolve(implementation) {
                Ok(spec) => Some(spec),
                Err(e) => {
                    violations.push(format!(
                        "no metadata: it was not provided, and it cannot be autoloaded ({})",
                        e
                    ));
                    None
                }
            },
            (None, None) => {
                violations.push(
                    "no metadata: it was not provided, and it cannot be autoloaded".to_string(),
                );
                None
            }
        };

        if self.source.repo.trim().is_empty() {
            violations.push("repo missing".to_string());
        }
        if self.source.branch.trim().is_empty() {
            violations.push("branch missing".to_string());
        }

        let interface_name = self
            .interface_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        if interface_name.is_none() {
            violations.push("interface_name missing".to_string());
        }

        let interface_version = match self.interface_version.typed() {
            Ok(version) => Some(*version),
            Err(raw) => {
                violations.push(format!(
                    "interface_version should be a non-negative integer, not: {}",
                    raw
                ));
                None
            }
        };

        let state_template = match self.state_template.as_ref().map(Lenient::typed) {
            None => Some(State::default()),
            Some(Ok(state)) => Some(state.clone()),
            Some(Err(raw)) => {
                violations.push(format!("state_template should be a State, not: {}", raw));
                None
            }
        };

        match (
            &self.implementation,
            charm,
            interface_name,
            interface_version,
            state_template,
        ) {
            (Some(implementation), Some(charm), Some(name), Some(version), Some(template))
                if violations.is_empty() =>
            {
                Ok(ResolvedConfig {
                    implementation: implementation.clone(),
                    source: self.source.clone(),
                    interface_name: name.to_string(),
                    interface_version: version,
                    state_template: template,
                    charm,
                })
            }
            _ => Err(ConfigurationError::new(violations)),
        }
    }
}

impl fmt::Display for TesterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show<T: fmt::Debug>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map(|v| format!("{:?}", v))
                .unwrap_or_else(|| "None".into())
        }

        writeln!(f, "<Interface Tester:")?;
        writeln!(f, "\trepo={}", self.source.repo)?;
        writeln!(f, "\tbranch={}", self.source.branch)?;
        writeln!(f, "\tbase_path={}", self.source.base_path)?;
        writeln!(f, "\timplementation={}", show(&self.implementation))?;
        writeln!(f, "\tmeta={}", show(&self.meta))?;
        writeln!(f, "\tactions={}", show(&self.actions))?;
        writeln!(f, "\tconfig={}", show(&self.config))?;
        writeln!(f, "\tinterface_name={}", show(&self.interface_name))?;
        writeln!(f, "\tinterface_version={:?}", self.interface_version)?;
        write!(f, "\tstate_template={}>", show(&self.state_template))
    }
}

// ── Resolved configuration ─────────────────────────────────────────────

/// Fully validated configuration for one run.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedConfig {
    pub implementation: ImplementationDescriptor,
    pub source: ContractSource,
    pub interface_name: String,
    pub interface_version: u32,
    pub state_template: State,
    pub charm: ResolvedCharmSpec,
}

impl fmt::Display for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/v{} against {} (contracts: {})",
            self.interface_name, self.interface_version, self.implementation, self.source
        )
    }
}
