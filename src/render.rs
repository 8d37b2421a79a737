//! # Rendering Capability
//!
//! Template substitution is an external collaborator: the engine recognizes
//! which files are templates, derives the variable context from the run
//! configuration, and calls whatever [`Renderer`] the caller wires in. The
//! substitution syntax itself is opaque here.
//!
//! Template files are identified by the fixed `.hbs` filename suffix. The
//! suffix is stripped from the destination name, so
//! `package.json.hbs` materializes as `package.json` with rendered content
//! while `index.html` copies verbatim.

use std::collections::BTreeMap;

use crate::config::ProjectConfig;
use crate::error::Result;

/// Filename suffix marking a file as render-eligible.
pub const TEMPLATE_SUFFIX: &str = ".hbs";

/// Variable map handed to the renderer, derived from the run
/// configuration. Ordered for deterministic iteration in tests and logs.
pub type RenderContext = BTreeMap<String, String>;

/// The external text-substitution service.
///
/// Implementations receive the raw template text and the context map and
/// return rendered text. Errors are fatal for the run (write-class).
pub trait Renderer {
    fn render(&self, template: &str, context: &RenderContext) -> Result<String>;
}

/// Renderer that returns template text unchanged.
///
/// Useful for callers that ship pre-rendered templates and for tests; also
/// the reference for the capability's contract: rendering may transform
/// content but never paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRenderer;

impl Renderer for PassthroughRenderer {
    fn render(&self, template: &str, _context: &RenderContext) -> Result<String> {
        Ok(template.to_string())
    }
}

/// Strip the template marker from a file name, if present.
///
/// Returns `Some(destination_name)` for template files, `None` otherwise.
/// A bare `.hbs` file name is not a template marker - there would be no
/// destination name left.
pub fn strip_template_suffix(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_suffix(TEMPLATE_SUFFIX)?;
    if stem.is_empty() {
        return None;
    }
    Some(stem)
}

/// Derive the render context for one run.
///
/// Deterministic over the configuration: the project name, package manager,
/// TypeScript flag, the joined frontend list, and each selected
/// single-choice id when present.
pub fn render_context(config: &ProjectConfig) -> RenderContext {
    let mut context = RenderContext::new();
    context.insert("project_name".to_string(), config.project_name.clone());
    context.insert(
        "package_manager".to_string(),
        config.package_manager.as_str().to_string(),
    );
    context.insert("typescript".to_string(), config.typescript.to_string());
    if !config.frontends.is_empty() {
        context.insert("frontends".to_string(), config.frontends.join(","));
    }
    for (key, value) in [
        ("backend", &config.backend),
        ("database", &config.database),
        ("orm", &config.orm),
        ("auth", &config.auth),
        ("deployment", &config.deployment),
    ] {
        if let Some(id) = value {
            context.insert(key.to_string(), id.clone());
        }
    }
    context
}
