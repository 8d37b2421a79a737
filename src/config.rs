//! # Run Configuration
//!
//! This module defines the data structures that represent one resolved
//! scaffolding run. The configuration is produced by an outer collaborator
//! (an interactive prompt, a CLI, a saved preset); by the time it reaches
//! this crate every choice has already been made. The engine treats the
//! value as immutable for the whole run.
//!
//! ## Key Components
//!
//! - **`ProjectConfig`**: the full set of stack choices — project name,
//!   frontend variants, backend, database, ORM, auth provider, addon set,
//!   deployment target, package manager, and the TypeScript flag.
//!
//! - **`PackageManager`**: the supported package manager ids. The selected
//!   id is exposed to template rendering as the `package_manager` variable.
//!
//! Single-choice categories use `Option<String>`: `None` is the explicit
//! "none" selection, not an unset field. Addons are a set because they are
//! not mutually exclusive (a project can select a monorepo layout, a test
//! framework, linting, and containerization at the same time).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Well-known addon id: route frontend/backend/database/auth output into a
/// monorepo topology (`apps/*`, `packages/*`).
pub const ADDON_MONOREPO: &str = "turborepo";

/// Well-known addon id: containerization tooling.
pub const ADDON_DOCKER: &str = "docker";

/// Well-known addon id: linting tooling.
pub const ADDON_LINT: &str = "biome";

/// Addon ids that select a test-framework tooling subtree.
pub const TEST_FRAMEWORK_ADDONS: &[&str] = &["vitest", "playwright"];

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Npm,
    Pnpm,
    Yarn,
    Bun,
}

impl PackageManager {
    /// The id used in template contexts and tooling subtree names.
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Yarn => "yarn",
            PackageManager::Bun => "bun",
        }
    }
}

/// A fully resolved scaffolding run configuration.
///
/// One value of this type drives one composition run. All fields are plain
/// ids matching template subtree names on disk; the engine never interprets
/// them beyond path construction and render-context derivation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectConfig {
    /// Name of the project being scaffolded. Used as the output directory
    /// name by callers and exposed to templates as `project_name`.
    pub project_name: String,
    /// Selected frontend variant ids (zero or more, e.g. `react`, `svelte`).
    #[serde(default)]
    pub frontends: Vec<String>,
    /// Selected backend id, or `None` for no backend.
    #[serde(default)]
    pub backend: Option<String>,
    /// Selected database engine id, or `None` for no database.
    #[serde(default)]
    pub database: Option<String>,
    /// Selected ORM id, or `None`. Database integration subtrees are keyed
    /// by ORM, not by database engine.
    #[serde(default)]
    pub orm: Option<String>,
    /// Selected auth provider id, or `None`.
    #[serde(default)]
    pub auth: Option<String>,
    /// Non-exclusive addon ids (monorepo flag, containerization, linting,
    /// test frameworks).
    #[serde(default)]
    pub addons: BTreeSet<String>,
    /// Selected deployment target id, or `None`.
    #[serde(default)]
    pub deployment: Option<String>,
    /// Package manager the generated project will use.
    #[serde(default)]
    pub package_manager: PackageManager,
    /// Whether the generated project uses TypeScript.
    #[serde(default)]
    pub typescript: bool,
}

impl ProjectConfig {
    /// Create a configuration with the given project name and defaults for
    /// everything else.
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Self::default()
        }
    }

    /// Whether the monorepo addon is selected for this run.
    ///
    /// This single flag changes the destination root for frontend, backend,
    /// database, and auth output.
    pub fn is_monorepo(&self) -> bool {
        self.addons.contains(ADDON_MONOREPO)
    }

    /// Validate the configuration before any filesystem mutation.
    ///
    /// The caller is responsible for resolving the choices; the engine only
    /// refuses values that cannot name a directory.
    pub fn validate(&self) -> Result<()> {
        if self.project_name.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "project name is empty".to_string(),
            });
        }
        if self.project_name.contains('/') || self.project_name.contains('\\') {
            return Err(Error::InvalidConfig {
                message: format!(
                    "project name '{}' contains a path separator",
                    self.project_name
                ),
            });
        }
        Ok(())
    }
}
