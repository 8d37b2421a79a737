//! # Conflict Resolution
//!
//! When a layer wants to write a destination path that an earlier layer (or
//! the rename table) already claimed, the orchestrator asks this module what
//! to do. The resolver is a pure decision function: given a project-relative
//! target path it returns an action, a human-readable reason, and (for
//! renames) the mapped destination. It never touches the filesystem.
//!
//! ## Precedence
//!
//! Rules are evaluated in fixed order, first match wins:
//!
//! 1. **Rename table** - exact-filename lookup mapping neutral marker names
//!    to their real dotfile names (`_gitignore` -> `.gitignore`).
//! 2. **Merge set** - the project manifest, merged structurally.
//! 3. **Append set** - env files, ignore files, README; concatenated.
//! 4. **Override globs** - anchored patterns (`**` any depth, `*` one path
//!    segment) for source trees, component trees, route trees, and
//!    `*.config.*` files.
//! 5. **Default** - override.
//!
//! The rule tables are an explicit, immutable [`ConflictRules`] value passed
//! to [`ConflictResolver::new`], so tests can substitute arbitrary rule sets.

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use std::path::Path;

use crate::error::Result;

/// The resolver's verdict for a colliding destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictAction {
    /// Write under the mapped real name instead of the marker name.
    Rename,
    /// Structurally merge the incoming manifest into the existing one.
    Merge,
    /// Concatenate incoming content onto the existing content.
    Append,
    /// Replace the existing content with the incoming content.
    Override,
}

impl std::fmt::Display for ConflictAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConflictAction::Rename => "rename",
            ConflictAction::Merge => "merge",
            ConflictAction::Append => "append",
            ConflictAction::Override => "override",
        };
        f.write_str(name)
    }
}

/// A single resolver decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub action: ConflictAction,
    /// Short human-readable justification, surfaced in the run report.
    pub reason: String,
    /// Full relative destination the file is renamed to, for
    /// [`ConflictAction::Rename`] only.
    pub renamed_to: Option<String>,
}

/// One resolver decision recorded for the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictRecord {
    /// Project-relative destination path the decision applies to.
    pub file: String,
    pub action: ConflictAction,
    pub reason: String,
    /// Where the file actually landed, when renamed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renamed_to: Option<String>,
}

/// The immutable rule tables driving resolution.
///
/// `Default` yields the production tables; tests may build substitutes.
#[derive(Debug, Clone)]
pub struct ConflictRules {
    /// Exact marker file name -> real dotfile name.
    pub rename_table: Vec<(String, String)>,
    /// Exact file names merged structurally (the project manifest).
    pub merge_files: Vec<String>,
    /// Exact file names resolved by concatenation.
    pub append_files: Vec<String>,
    /// Anchored glob patterns resolved by override. `**` matches any
    /// depth, `*` a single path segment.
    pub override_globs: Vec<String>,
}

impl Default for ConflictRules {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            rename_table: vec![
                ("_gitignore".to_string(), ".gitignore".to_string()),
                ("_npmrc".to_string(), ".npmrc".to_string()),
                ("_env".to_string(), ".env".to_string()),
            ],
            merge_files: owned(&["package.json"]),
            append_files: owned(&[
                ".env",
                ".env.example",
                ".gitignore",
                ".dockerignore",
                "README.md",
            ]),
            override_globs: owned(&[
                "src/**",
                "components/**",
                "routes/**",
                "*.config.*",
                "**/*.config.*",
            ]),
        }
    }
}

/// Pure, deterministic conflict resolver over a fixed [`ConflictRules`]
/// value. Compiles the override globs once at construction.
#[derive(Debug)]
pub struct ConflictResolver {
    rules: ConflictRules,
    override_patterns: Vec<Pattern>,
}

/// `*` must not cross directory separators; `**` covers arbitrary depth.
const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl ConflictResolver {
    /// Build a resolver, compiling the override glob patterns.
    pub fn new(rules: ConflictRules) -> Result<Self> {
        let override_patterns = rules
            .override_globs
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            rules,
            override_patterns,
        })
    }

    /// Resolver over the production rule tables.
    pub fn with_default_rules() -> Self {
        // The default tables are static and known-valid.
        Self::new(ConflictRules::default()).unwrap_or_else(|_| unreachable!())
    }

    /// The real destination name for a marker file name, if the rename
    /// table maps it.
    ///
    /// Rename-table names are destination-mapping rules: they apply to
    /// every file carrying the marker name, whichever layer supplies it and
    /// whether or not the target exists yet.
    pub fn rename_target(&self, file_name: &str) -> Option<&str> {
        self.rules
            .rename_table
            .iter()
            .find(|(marker, _)| marker == file_name)
            .map(|(_, real)| real.as_str())
    }

    /// Decide the action for a colliding project-relative target path.
    ///
    /// Pure and deterministic; evaluates the rule tables in precedence
    /// order and falls back to override.
    pub fn resolve(&self, target: &Path) -> Resolution {
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some(real) = self.rename_target(&file_name) {
            let renamed = target.with_file_name(real);
            return Resolution {
                action: ConflictAction::Rename,
                reason: format!("marker file name maps to '{}'", real),
                renamed_to: Some(renamed.to_string_lossy().into_owned()),
            };
        }

        if self.rules.merge_files.iter().any(|f| *f == file_name) {
            return Resolution {
                action: ConflictAction::Merge,
                reason: "project manifest is merged key-wise".to_string(),
                renamed_to: None,
            };
        }

        if self.rules.append_files.iter().any(|f| *f == file_name) {
            return Resolution {
                action: ConflictAction::Append,
                reason: "appendable file is concatenated across layers".to_string(),
                renamed_to: None,
            };
        }

        for (pattern, raw) in self
            .override_patterns
            .iter()
            .zip(&self.rules.override_globs)
        {
            if pattern.matches_path_with(target, GLOB_OPTIONS) {
                return Resolution {
                    action: ConflictAction::Override,
                    reason: format!("matched override pattern '{}'", raw),
                    renamed_to: None,
                };
            }
        }

        Resolution {
            action: ConflictAction::Override,
            reason: "default behavior".to_string(),
            renamed_to: None,
        }
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::with_default_rules()
    }
}
