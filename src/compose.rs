//! # Layer Composition
//!
//! The orchestrator walks the six template layers in fixed order, maps the
//! run configuration to the source subtrees each layer contributes, and
//! materializes every file into the output tree - consulting the conflict
//! resolver for colliding destinations and executing every mutation through
//! the run's single [`Transaction`].
//!
//! ## Process
//!
//! 1.  **Plan**: [`crate::layer::layer_plan`] turns the configuration into
//!     an ordered list of selected subtrees per layer.
//!
//! 2.  **Walk**: each selected subtree is walked recursively; the relative
//!     structure is mirrored under the selection's destination root.
//!     Absent layer directories and absent option subtrees are skipped
//!     silently - "not implemented" is a normal state, never fatal.
//!
//! 3.  **Name**: the `.hbs` template marker is stripped from destination
//!     names, and rename-table marker names map to their real dotfile
//!     names at this point, whichever layer supplies them.
//!
//! 4.  **Resolve and execute**: a destination that already exists goes
//!     through the conflict resolver; the resulting action (merge, append,
//!     override) executes through the transaction, which backs up the
//!     existing file first. New destinations are written directly.
//!
//! Execution is strictly sequential: one layer, one subtree, one file at a
//! time. Any fatal error aborts the walk and bubbles to the transaction
//! wrapper, which rolls back.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;
use serde_json::Value;
use walkdir::WalkDir;

use crate::config::ProjectConfig;
use crate::conflict::{ConflictAction, ConflictRecord, ConflictResolver};
use crate::error::{Error, Result};
use crate::layer::layer_plan;
use crate::render::{render_context, strip_template_suffix, RenderContext, Renderer};
use crate::transaction::{run_in_transaction, Transaction, TransactionOutcome};

/// Separator placed between existing and incoming content when a file
/// resolves to append.
pub const APPEND_SEPARATOR: &str = "\n\n";

/// Structured result of one composition run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComposeReport {
    /// Project-relative paths of every materialized file, in processing
    /// order.
    pub processed_files: Vec<PathBuf>,
    /// Resolver decisions recorded during the run.
    pub conflicts: Vec<ConflictRecord>,
}

/// Walks the layers for one run and executes the resulting mutations.
///
/// Owns no filesystem state itself; all writes go through the
/// [`Transaction`] passed to [`Orchestrator::compose`].
pub struct Orchestrator<'a> {
    config: &'a ProjectConfig,
    layers_root: &'a Path,
    output_root: &'a Path,
    renderer: &'a dyn Renderer,
    resolver: ConflictResolver,
    context: RenderContext,
}

impl<'a> Orchestrator<'a> {
    /// Orchestrator with the production conflict rules.
    pub fn new(
        config: &'a ProjectConfig,
        layers_root: &'a Path,
        output_root: &'a Path,
        renderer: &'a dyn Renderer,
    ) -> Self {
        Self::with_resolver(
            config,
            layers_root,
            output_root,
            renderer,
            ConflictResolver::with_default_rules(),
        )
    }

    /// Orchestrator with a substitute conflict resolver.
    pub fn with_resolver(
        config: &'a ProjectConfig,
        layers_root: &'a Path,
        output_root: &'a Path,
        renderer: &'a dyn Renderer,
        resolver: ConflictResolver,
    ) -> Self {
        let context = render_context(config);
        Self {
            config,
            layers_root,
            output_root,
            renderer,
            resolver,
            context,
        }
    }

    /// Compose all layers through `txn`, returning the run report.
    pub fn compose(&self, txn: &mut Transaction) -> Result<ComposeReport> {
        let mut report = ComposeReport::default();

        for (layer, selections) in layer_plan(self.config) {
            let layer_dir = self.layers_root.join(layer.dir_name());
            if !layer_dir.is_dir() {
                debug!("Layer '{}' has no template directory; skipping", layer);
                continue;
            }
            for selection in selections {
                let source_dir = self.layers_root.join(&selection.source);
                if !source_dir.is_dir() {
                    debug!(
                        "Selected subtree '{}' not present; skipping",
                        selection.source.display()
                    );
                    continue;
                }
                self.apply_subtree(&source_dir, &selection.dest, txn, &mut report)?;
            }
        }

        Ok(report)
    }

    /// Mirror one selected subtree into the destination root.
    fn apply_subtree(
        &self,
        source_dir: &Path,
        dest_root: &Path,
        txn: &mut Transaction,
        report: &mut ComposeReport,
    ) -> Result<()> {
        for entry in WalkDir::new(source_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Filesystem {
                message: format!("Failed to walk '{}': {}", source_dir.display(), e),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(source_dir).map_err(|_| {
                Error::Filesystem {
                    message: format!(
                        "Walked entry '{}' escapes its subtree",
                        entry.path().display()
                    ),
                }
            })?;
            self.process_file(entry.path(), relative, dest_root, txn, report)?;
        }
        Ok(())
    }

    /// Materialize one source file at its computed destination.
    fn process_file(
        &self,
        source: &Path,
        relative: &Path,
        dest_root: &Path,
        txn: &mut Transaction,
        report: &mut ComposeReport,
    ) -> Result<()> {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        // template marker strips off the destination name
        let (dest_name, render) = match strip_template_suffix(&file_name) {
            Some(stripped) => (stripped.to_string(), true),
            None => (file_name, false),
        };

        let mut dest_rel = match relative.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                dest_root.join(parent).join(&dest_name)
            }
            _ => dest_root.join(&dest_name),
        };

        // Rename-table names are destination-mapping rules: they fire for
        // every file carrying the marker name, not only on collisions.
        if self.resolver.rename_target(&dest_name).is_some() {
            let resolution = self.resolver.resolve(&dest_rel);
            let renamed = resolution
                .renamed_to
                .clone()
                .map(PathBuf::from)
                .unwrap_or_else(|| dest_rel.clone());
            report.conflicts.push(ConflictRecord {
                file: dest_rel.to_string_lossy().into_owned(),
                action: resolution.action,
                reason: resolution.reason,
                renamed_to: resolution.renamed_to,
            });
            dest_rel = renamed;
        }

        let dest_abs = self.output_root.join(&dest_rel);

        if dest_abs.exists() {
            let resolution = self.resolver.resolve(&dest_rel);
            match resolution.action {
                ConflictAction::Merge => {
                    let incoming = self.incoming_manifest(source, render)?;
                    txn.merge_manifest_file(&dest_abs, &incoming)?;
                }
                ConflictAction::Append => {
                    let existing = fs::read_to_string(&dest_abs).map_err(|e| {
                        Error::Filesystem {
                            message: format!(
                                "Failed to read '{}' for append: {}",
                                dest_abs.display(),
                                e
                            ),
                        }
                    })?;
                    let incoming = self.incoming_text(source, render)?;
                    let combined = format!("{}{}{}", existing, APPEND_SEPARATOR, incoming);
                    txn.create_file(&dest_abs, combined.as_bytes())?;
                }
                // rename was already applied at destination computation;
                // a colliding renamed target falls through to override
                ConflictAction::Rename | ConflictAction::Override => {
                    self.write_file(source, &dest_abs, render, txn)?;
                }
            }
            report.conflicts.push(ConflictRecord {
                file: dest_rel.to_string_lossy().into_owned(),
                action: resolution.action,
                reason: resolution.reason,
                renamed_to: None,
            });
        } else {
            self.write_file(source, &dest_abs, render, txn)?;
        }

        report.processed_files.push(dest_rel);
        Ok(())
    }

    /// Write one source file to `dest`, rendering templates, copying
    /// everything else verbatim.
    fn write_file(
        &self,
        source: &Path,
        dest: &Path,
        render: bool,
        txn: &mut Transaction,
    ) -> Result<()> {
        if render {
            let rendered = self.incoming_text(source, true)?;
            txn.create_file(dest, rendered.as_bytes())
        } else {
            txn.copy_file(source, dest)
        }
    }

    /// Incoming content of one source file, rendered when marked.
    fn incoming_text(&self, source: &Path, render: bool) -> Result<String> {
        let raw = fs::read_to_string(source).map_err(|e| Error::Filesystem {
            message: format!("Failed to read '{}': {}", source.display(), e),
        })?;
        if render {
            self.renderer
                .render(&raw, &self.context)
                .map_err(|e| match e {
                    Error::Render { message, file: None } => Error::Render {
                        message,
                        file: Some(source.display().to_string()),
                    },
                    other => other,
                })
        } else {
            Ok(raw)
        }
    }

    /// Incoming manifest content parsed to JSON.
    fn incoming_manifest(&self, source: &Path, render: bool) -> Result<Value> {
        let text = self.incoming_text(source, render)?;
        serde_json::from_str(&text).map_err(|e| Error::ManifestParse {
            path: source.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Materialize a project in one transactional run.
///
/// Validates the configuration, composes all layers through a fresh
/// transaction, and rolls back on any fatal error. Never raises: the
/// outcome carries the report or the error plus the transaction summary.
pub fn materialize(
    config: &ProjectConfig,
    layers_root: &Path,
    output_root: &Path,
    renderer: &dyn Renderer,
) -> TransactionOutcome<ComposeReport> {
    if let Err(e) = config.validate() {
        return TransactionOutcome {
            result: Err(e),
            summary: Default::default(),
            rolled_back: false,
        };
    }
    let orchestrator = Orchestrator::new(config, layers_root, output_root, renderer);
    run_in_transaction(|txn| orchestrator.compose(txn))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::PassthroughRenderer;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    /// Minimal `{{var}}` substitution, standing in for the external
    /// rendering capability.
    struct VarRenderer;

    impl Renderer for VarRenderer {
        fn render(&self, template: &str, context: &BTreeMap<String, String>) -> Result<String> {
            let mut out = template.to_string();
            for (key, value) in context {
                out = out.replace(&format!("{{{{{}}}}}", key), value);
            }
            Ok(out)
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn compose_into(
        config: &ProjectConfig,
        layers: &Path,
        output: &Path,
        renderer: &dyn Renderer,
    ) -> ComposeReport {
        let orchestrator = Orchestrator::new(config, layers, output, renderer);
        let mut txn = Transaction::new().unwrap();
        let report = orchestrator.compose(&mut txn).unwrap();
        txn.cleanup().unwrap();
        report
    }

    #[test]
    fn test_base_layer_is_mirrored() {
        let layers = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(layers.path(), "base/index.html", "<html></html>");
        write(layers.path(), "base/src/main.ts", "console.log(1)");

        let config = ProjectConfig::new("demo");
        let report = compose_into(&config, layers.path(), output.path(), &PassthroughRenderer);

        assert_eq!(report.processed_files.len(), 2);
        assert!(output.path().join("index.html").exists());
        assert!(output.path().join("src/main.ts").exists());
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn test_missing_layers_are_skipped_silently() {
        let layers = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        // no layer directories at all

        let mut config = ProjectConfig::new("demo");
        config.frontends = vec!["react".to_string()];
        let report = compose_into(&config, layers.path(), output.path(), &PassthroughRenderer);

        assert!(report.processed_files.is_empty());
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn test_missing_option_subtree_is_skipped() {
        let layers = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(layers.path(), "frameworks/frontend/react/app.tsx", "react");

        let mut config = ProjectConfig::new("demo");
        config.frontends = vec!["react".to_string(), "solid".to_string()];
        let report = compose_into(&config, layers.path(), output.path(), &PassthroughRenderer);

        // solid has no subtree; only react materializes
        assert_eq!(report.processed_files.len(), 1);
        assert!(output.path().join("frontend/app.tsx").exists());
    }

    #[test]
    fn test_template_suffix_is_stripped_and_rendered() {
        let layers = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(
            layers.path(),
            "base/package.json.hbs",
            r#"{"name": "{{project_name}}"}"#,
        );

        let config = ProjectConfig::new("demo");
        let report = compose_into(&config, layers.path(), output.path(), &VarRenderer);

        assert_eq!(report.processed_files, vec![PathBuf::from("package.json")]);
        let content = fs::read_to_string(output.path().join("package.json")).unwrap();
        assert_eq!(content, r#"{"name": "demo"}"#);
        assert!(!output.path().join("package.json.hbs").exists());
    }

    #[test]
    fn test_rename_marker_applies_on_first_write() {
        let layers = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(layers.path(), "base/_gitignore", "node_modules/");

        let config = ProjectConfig::new("demo");
        let report = compose_into(&config, layers.path(), output.path(), &PassthroughRenderer);

        assert!(output.path().join(".gitignore").exists());
        assert!(!output.path().join("_gitignore").exists());
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].action, ConflictAction::Rename);
        assert_eq!(report.conflicts[0].renamed_to.as_deref(), Some(".gitignore"));
        assert_eq!(report.processed_files, vec![PathBuf::from(".gitignore")]);
    }

    #[test]
    fn test_later_layer_overrides_earlier() {
        let layers = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(layers.path(), "base/src/index.ts", "base");
        write(
            layers.path(),
            "frameworks/frontend/react/src/index.ts",
            "react",
        );

        let mut config = ProjectConfig::new("demo");
        config.frontends = vec!["react".to_string()];
        // flat topology: react lands under frontend/, no collision with base
        let report = compose_into(&config, layers.path(), output.path(), &PassthroughRenderer);
        assert!(report.conflicts.is_empty());

        // same destination root forces the collision
        let output2 = TempDir::new().unwrap();
        write(layers.path(), "tooling/docker/src/index.ts", "docker");
        let mut config2 = ProjectConfig::new("demo");
        config2.addons.insert("docker".to_string());
        let report2 =
            compose_into(&config2, layers.path(), output2.path(), &PassthroughRenderer);

        let content = fs::read_to_string(output2.path().join("src/index.ts")).unwrap();
        assert_eq!(content, "docker");
        assert_eq!(report2.conflicts.len(), 1);
        assert_eq!(report2.conflicts[0].action, ConflictAction::Override);
    }

    #[test]
    fn test_manifest_collision_merges() {
        let layers = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(
            layers.path(),
            "base/package.json",
            r#"{"name": "base", "scripts": {"dev": "a"}}"#,
        );
        write(
            layers.path(),
            "tooling/biome/package.json",
            r#"{"scripts": {"lint": "biome check"}, "devDependencies": {"@biomejs/biome": "^1"}}"#,
        );

        let mut config = ProjectConfig::new("demo");
        config.addons.insert("biome".to_string());
        let report = compose_into(&config, layers.path(), output.path(), &PassthroughRenderer);

        let merged: Value =
            serde_json::from_str(&fs::read_to_string(output.path().join("package.json")).unwrap())
                .unwrap();
        assert_eq!(merged["name"], "base");
        assert_eq!(merged["scripts"]["dev"], "a");
        assert_eq!(merged["scripts"]["lint"], "biome check");
        assert_eq!(merged["devDependencies"]["@biomejs/biome"], "^1");
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].action, ConflictAction::Merge);
    }

    #[test]
    fn test_append_collision_concatenates() {
        let layers = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(layers.path(), "base/README.md", "# Base");
        write(layers.path(), "tooling/docker/README.md", "## Docker");

        let mut config = ProjectConfig::new("demo");
        config.addons.insert("docker".to_string());
        compose_into(&config, layers.path(), output.path(), &PassthroughRenderer);

        let content = fs::read_to_string(output.path().join("README.md")).unwrap();
        assert_eq!(content, format!("# Base{}## Docker", APPEND_SEPARATOR));
    }

    #[test]
    fn test_malformed_existing_manifest_is_fatal() {
        let layers = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(layers.path(), "base/package.json", "{broken json");
        write(layers.path(), "tooling/docker/package.json", r#"{"name": "x"}"#);

        // the second layer's manifest merge hits the malformed existing one
        let mut config = ProjectConfig::new("demo");
        config.addons.insert("docker".to_string());
        let orchestrator = Orchestrator::new(
            &config,
            layers.path(),
            output.path(),
            &PassthroughRenderer,
        );
        let mut txn = Transaction::new().unwrap();
        let err = orchestrator.compose(&mut txn).unwrap_err();
        assert!(matches!(err, Error::ManifestParse { .. }));
    }

    #[test]
    fn test_materialize_rejects_invalid_config() {
        let layers = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        let outcome = materialize(
            &ProjectConfig::new(""),
            layers.path(),
            output.path(),
            &PassthroughRenderer,
        );
        assert!(!outcome.is_success());
        assert!(matches!(
            outcome.result.unwrap_err(),
            Error::InvalidConfig { .. }
        ));
    }

    #[test]
    fn test_materialize_full_run() {
        let layers = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(layers.path(), "base/package.json", r#"{"name": "placeholder"}"#);
        write(layers.path(), "base/_gitignore", "node_modules/");
        write(layers.path(), "frameworks/frontend/react/app.tsx", "app");

        let mut config = ProjectConfig::new("demo");
        config.frontends = vec!["react".to_string()];
        let outcome = materialize(&config, layers.path(), output.path(), &PassthroughRenderer);

        assert!(outcome.is_success());
        let report = outcome.result.unwrap();
        assert_eq!(report.processed_files.len(), 3);
        assert!(output.path().join(".gitignore").exists());
        assert!(output.path().join("frontend/app.tsx").exists());
        assert!(!outcome.rolled_back);
    }
}
