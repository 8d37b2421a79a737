//! # Template Layers and Selection Mapping
//!
//! A scaffolding run composes six template layers in a fixed order. Later
//! layers override earlier ones at colliding destination paths unless the
//! conflict resolver decides otherwise. This module owns that order, the
//! mapping from a run configuration to the source subtrees each layer
//! contributes, and the destination topology.
//!
//! ## Layer order
//!
//! 1. `base` - the scaffold applied to every project, wholesale.
//! 2. `frameworks` - one subtree per selected frontend variant, plus the
//!    backend subtree when a backend is selected.
//! 3. `integrations` - the database integration subtree, keyed by ORM.
//! 4. `features` - the auth feature subtree.
//! 5. `tooling` - one subtree per relevant selected addon (addons are not
//!    mutually exclusive).
//! 6. `deployment` - the deployment target subtree.
//!
//! ## Destination topology
//!
//! The monorepo addon rewrites the destination root for four categories:
//! frontend output goes to `apps/web`, backend to `apps/server`, database
//! to `packages/database`, and auth to `packages/auth`. Without it those
//! categories land in flat `frontend/`, `backend/`, `database/`, `auth/`
//! directories. Base, tooling, and deployment target the project root in
//! both topologies.
//!
//! The dispatch is an ordered list of `(Layer, selector)` pairs rather than
//! a conditional chain, so adding a layer means adding one table entry.

use std::path::PathBuf;

use crate::config::{
    ProjectConfig, ADDON_DOCKER, ADDON_LINT, ADDON_MONOREPO, TEST_FRAMEWORK_ADDONS,
};

/// One of the six ordered template source categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Base,
    Frameworks,
    Integrations,
    Features,
    Tooling,
    Deployment,
}

impl Layer {
    /// All layers in override order. Later entries win collisions unless
    /// the conflict resolver says otherwise.
    pub const ALL: [Layer; 6] = [
        Layer::Base,
        Layer::Frameworks,
        Layer::Integrations,
        Layer::Features,
        Layer::Tooling,
        Layer::Deployment,
    ];

    /// Directory name of this layer under the template root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Layer::Base => "base",
            Layer::Frameworks => "frameworks",
            Layer::Integrations => "integrations",
            Layer::Features => "features",
            Layer::Tooling => "tooling",
            Layer::Deployment => "deployment",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Destination categories whose root depends on the monorepo flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackCategory {
    Frontend,
    Backend,
    Database,
    Auth,
}

impl StackCategory {
    /// Destination root for this category under the given topology.
    fn dest_root(&self, monorepo: bool) -> PathBuf {
        let dir = match (self, monorepo) {
            (StackCategory::Frontend, true) => "apps/web",
            (StackCategory::Backend, true) => "apps/server",
            (StackCategory::Database, true) => "packages/database",
            (StackCategory::Auth, true) => "packages/auth",
            (StackCategory::Frontend, false) => "frontend",
            (StackCategory::Backend, false) => "backend",
            (StackCategory::Database, false) => "database",
            (StackCategory::Auth, false) => "auth",
        };
        PathBuf::from(dir)
    }
}

/// One source subtree selected for application.
///
/// `source` is relative to the template root, `dest` relative to the output
/// root. The orchestrator mirrors the subtree's relative structure from one
/// to the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Source subtree, relative to the layers root
    /// (e.g. `frameworks/frontend/react`).
    pub source: PathBuf,
    /// Destination root, relative to the project output root
    /// (e.g. `apps/web`; empty for the project root).
    pub dest: PathBuf,
}

impl Selection {
    fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }
}

type SelectorFn = fn(&ProjectConfig) -> Vec<Selection>;

/// Ordered layer dispatch table. Processing order is the table order.
const SELECTORS: &[(Layer, SelectorFn)] = &[
    (Layer::Base, select_base),
    (Layer::Frameworks, select_frameworks),
    (Layer::Integrations, select_integrations),
    (Layer::Features, select_features),
    (Layer::Tooling, select_tooling),
    (Layer::Deployment, select_deployment),
];

/// Compute the full, ordered application plan for one run.
///
/// Each entry pairs a layer with the subtrees it contributes under the
/// given configuration. Layers that contribute nothing still appear with an
/// empty selection list, preserving the fixed order for the orchestrator.
pub fn layer_plan(config: &ProjectConfig) -> Vec<(Layer, Vec<Selection>)> {
    SELECTORS
        .iter()
        .map(|(layer, select)| (*layer, select(config)))
        .collect()
}

fn select_base(_config: &ProjectConfig) -> Vec<Selection> {
    vec![Selection::new("base", "")]
}

fn select_frameworks(config: &ProjectConfig) -> Vec<Selection> {
    let monorepo = config.is_monorepo();
    let mut selections = Vec::new();
    for variant in &config.frontends {
        selections.push(Selection::new(
            PathBuf::from("frameworks/frontend").join(variant),
            StackCategory::Frontend.dest_root(monorepo),
        ));
    }
    if let Some(backend) = &config.backend {
        selections.push(Selection::new(
            PathBuf::from("frameworks/backend").join(backend),
            StackCategory::Backend.dest_root(monorepo),
        ));
    }
    selections
}

fn select_integrations(config: &ProjectConfig) -> Vec<Selection> {
    // Database integrations are keyed by ORM, not by database engine: the
    // same postgres choice ships different files under drizzle vs prisma.
    match (&config.database, &config.orm) {
        (Some(_), Some(orm)) => vec![Selection::new(
            PathBuf::from("integrations/database").join(orm),
            StackCategory::Database.dest_root(config.is_monorepo()),
        )],
        _ => Vec::new(),
    }
}

fn select_features(config: &ProjectConfig) -> Vec<Selection> {
    match &config.auth {
        Some(auth) => vec![Selection::new(
            PathBuf::from("features/auth").join(auth),
            StackCategory::Auth.dest_root(config.is_monorepo()),
        )],
        None => Vec::new(),
    }
}

fn select_tooling(config: &ProjectConfig) -> Vec<Selection> {
    // Addons with a tooling subtree, in application order. Addons outside
    // this list are ignored by the tooling layer.
    let mut relevant = vec![ADDON_MONOREPO, ADDON_DOCKER, ADDON_LINT];
    relevant.extend_from_slice(TEST_FRAMEWORK_ADDONS);

    relevant
        .into_iter()
        .filter(|addon| config.addons.contains(*addon))
        .map(|addon| Selection::new(PathBuf::from("tooling").join(addon), ""))
        .collect()
}

fn select_deployment(config: &ProjectConfig) -> Vec<Selection> {
    match &config.deployment {
        Some(target) => vec![Selection::new(PathBuf::from("deployment").join(target), "")],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> ProjectConfig {
        let mut config = ProjectConfig::new("demo");
        config.frontends = vec!["react".to_string(), "svelte".to_string()];
        config.backend = Some("hono".to_string());
        config.database = Some("postgres".to_string());
        config.orm = Some("drizzle".to_string());
        config.auth = Some("better-auth".to_string());
        config.addons.insert("docker".to_string());
        config.addons.insert("vitest".to_string());
        config.deployment = Some("cloudflare".to_string());
        config
    }

    #[test]
    fn test_layer_order_is_fixed() {
        let plan = layer_plan(&ProjectConfig::new("demo"));
        let layers: Vec<Layer> = plan.iter().map(|(layer, _)| *layer).collect();
        assert_eq!(layers, Layer::ALL.to_vec());
    }

    #[test]
    fn test_base_always_selected() {
        let plan = layer_plan(&ProjectConfig::new("demo"));
        let (_, selections) = &plan[0];
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].source, PathBuf::from("base"));
        assert_eq!(selections[0].dest, PathBuf::from(""));
    }

    #[test]
    fn test_minimal_config_selects_only_base() {
        let plan = layer_plan(&ProjectConfig::new("demo"));
        let total: usize = plan.iter().map(|(_, s)| s.len()).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_frameworks_one_subtree_per_frontend_plus_backend() {
        let plan = layer_plan(&full_config());
        let (layer, selections) = &plan[1];
        assert_eq!(*layer, Layer::Frameworks);
        assert_eq!(selections.len(), 3);
        assert_eq!(
            selections[0].source,
            PathBuf::from("frameworks/frontend/react")
        );
        assert_eq!(
            selections[1].source,
            PathBuf::from("frameworks/frontend/svelte")
        );
        assert_eq!(selections[2].source, PathBuf::from("frameworks/backend/hono"));
    }

    #[test]
    fn test_flat_topology_destinations() {
        let plan = layer_plan(&full_config());
        let (_, frameworks) = &plan[1];
        assert_eq!(frameworks[0].dest, PathBuf::from("frontend"));
        assert_eq!(frameworks[2].dest, PathBuf::from("backend"));
        let (_, integrations) = &plan[2];
        assert_eq!(integrations[0].dest, PathBuf::from("database"));
        let (_, features) = &plan[3];
        assert_eq!(features[0].dest, PathBuf::from("auth"));
    }

    #[test]
    fn test_monorepo_topology_destinations() {
        let mut config = full_config();
        config.addons.insert(ADDON_MONOREPO.to_string());
        let plan = layer_plan(&config);
        let (_, frameworks) = &plan[1];
        assert_eq!(frameworks[0].dest, PathBuf::from("apps/web"));
        assert_eq!(frameworks[1].dest, PathBuf::from("apps/web"));
        assert_eq!(frameworks[2].dest, PathBuf::from("apps/server"));
        let (_, integrations) = &plan[2];
        assert_eq!(integrations[0].dest, PathBuf::from("packages/database"));
        let (_, features) = &plan[3];
        assert_eq!(features[0].dest, PathBuf::from("packages/auth"));
    }

    #[test]
    fn test_integration_keyed_by_orm() {
        let config = full_config();
        let plan = layer_plan(&config);
        let (_, integrations) = &plan[2];
        // postgres is the engine, drizzle the ORM; the subtree follows the ORM
        assert_eq!(
            integrations[0].source,
            PathBuf::from("integrations/database/drizzle")
        );
    }

    #[test]
    fn test_database_without_orm_selects_nothing() {
        let mut config = ProjectConfig::new("demo");
        config.database = Some("sqlite".to_string());
        let plan = layer_plan(&config);
        let (_, integrations) = &plan[2];
        assert!(integrations.is_empty());
    }

    #[test]
    fn test_tooling_addons_are_not_exclusive() {
        let plan = layer_plan(&full_config());
        let (layer, selections) = &plan[4];
        assert_eq!(*layer, Layer::Tooling);
        assert_eq!(selections.len(), 2);
        assert_eq!(selections[0].source, PathBuf::from("tooling/docker"));
        assert_eq!(selections[1].source, PathBuf::from("tooling/vitest"));
    }

    #[test]
    fn test_monorepo_addon_also_selects_tooling_subtree() {
        let mut config = ProjectConfig::new("demo");
        config.addons.insert(ADDON_MONOREPO.to_string());
        let plan = layer_plan(&config);
        let (_, tooling) = &plan[4];
        assert_eq!(tooling.len(), 1);
        assert_eq!(tooling[0].source, PathBuf::from("tooling/turborepo"));
        assert_eq!(tooling[0].dest, PathBuf::from(""));
    }

    #[test]
    fn test_unrecognized_addon_selects_no_tooling() {
        let mut config = ProjectConfig::new("demo");
        config.addons.insert("starship-prompt".to_string());
        let plan = layer_plan(&config);
        let (_, tooling) = &plan[4];
        assert!(tooling.is_empty());
    }

    #[test]
    fn test_deployment_targets_project_root() {
        let plan = layer_plan(&full_config());
        let (layer, selections) = &plan[5];
        assert_eq!(*layer, Layer::Deployment);
        assert_eq!(selections[0].source, PathBuf::from("deployment/cloudflare"));
        assert_eq!(selections[0].dest, PathBuf::from(""));
    }
}
