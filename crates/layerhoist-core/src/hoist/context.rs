//! One-shot registry loading for a hook session.
//!
//! The context starts `Uninitialized`. The first [`HoistContext::ensure_ready`]
//! either replays the lock artifact (frozen) or runs discovery, flattens and
//! rewrites the lock (refresh), then stays `Ready` for the rest of the session.

use super::discovery::{CommandDiscovery, Discovery};
use super::error::HoistError;
use super::exclusion::DuplicateExclusion;
use super::flatten::{flatten, FlattenReport};
use super::lock::{lock_digest, lock_path, read_lock, write_lock};
use super::registry::{build_registry, referenced_layers, BuiltRegistry, LayerRegistry};
use crate::config::{Config, InstallMode};
use layerhoist_util::hash::digest_file;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Registry loading state.
#[derive(Debug)]
pub enum LoadState {
    Uninitialized,
    /// A load is in progress, or the last load failed.
    Discovering,
    Ready(LayerRegistry),
}

/// Where the registry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Lockfile,
    Discovery,
}

impl LoadSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lockfile => "lockfile",
            Self::Discovery => "discovery",
        }
    }
}

/// Per-layer entry counts after flattening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSummary {
    pub name: String,
    pub dependencies: usize,
    pub dev_dependencies: usize,
}

/// What a registry load did.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub source: LoadSource,
    pub lock_path: PathBuf,
    /// Every name referenced as a layer.
    pub referenced: Vec<String>,
    /// Discovered packages dropped as non-layers (discovery only).
    pub pruned: Vec<String>,
    /// Side-channel lines that failed to parse (discovery only).
    pub ignored_lines: usize,
    pub duplicates: Vec<DuplicateExclusion>,
    /// Empty when loaded from the lock artifact.
    pub flatten: FlattenReport,
    pub layers: Vec<LayerSummary>,
    pub elapsed: Duration,
    /// BLAKE3 digest of the lock artifact as written (or read).
    pub digest: String,
}

/// Session state shared by every hook invocation.
pub struct HoistContext {
    root: PathBuf,
    mode: InstallMode,
    discovery: Box<dyn Discovery>,
    state: LoadState,
    report: Option<LoadReport>,
}

impl fmt::Debug for HoistContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HoistContext")
            .field("root", &self.root)
            .field("mode", &self.mode)
            .field("state", &self.state_name())
            .finish_non_exhaustive()
    }
}

impl HoistContext {
    /// Create a context for a workspace root with an injected discovery.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, mode: InstallMode, discovery: Box<dyn Discovery>) -> Self {
        Self {
            root: root.into(),
            mode,
            discovery,
            state: LoadState::Uninitialized,
            report: None,
        }
    }

    /// Create a context that discovers through the configured shell command.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.cwd.clone(),
            config.mode,
            Box::new(CommandDiscovery::new(config.discovery_command())),
        )
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn mode(&self) -> InstallMode {
        self.mode
    }

    /// Load the registry on first use and return it.
    ///
    /// After a failed load the context stays `Discovering` and every later
    /// call fails with `HOIST_LOAD_REENTRANT`.
    pub fn ensure_ready(&mut self) -> Result<&LayerRegistry, HoistError> {
        if matches!(self.state, LoadState::Uninitialized) {
            self.state = LoadState::Discovering;

            let started = Instant::now();
            let (registry, mut report) = match self.mode {
                InstallMode::Frozen => load_frozen(&self.root)?,
                InstallMode::Refresh => load_discovered(&self.root, self.discovery.as_mut())?,
            };
            report.elapsed = started.elapsed();

            self.report = Some(report);
            self.state = LoadState::Ready(registry);
        }

        match &self.state {
            LoadState::Ready(registry) => Ok(registry),
            _ => Err(HoistError::load_reentrant()),
        }
    }

    /// The registry, if loaded.
    #[must_use]
    pub fn registry(&self) -> Option<&LayerRegistry> {
        match &self.state {
            LoadState::Ready(registry) => Some(registry),
            _ => None,
        }
    }

    /// Take the report of the completed load (once).
    pub fn take_report(&mut self) -> Option<LoadReport> {
        self.report.take()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, LoadState::Ready(_))
    }

    #[must_use]
    pub fn state_name(&self) -> &'static str {
        match self.state {
            LoadState::Uninitialized => "uninitialized",
            LoadState::Discovering => "discovering",
            LoadState::Ready(_) => "ready",
        }
    }
}

/// Rebuild the registry from the lock artifact. No discovery runs.
pub fn load_frozen(root: &Path) -> Result<(LayerRegistry, LoadReport), HoistError> {
    let records = read_lock(root)?;
    let path = lock_path(root);
    let digest = digest_file(&path)
        .map_err(|e| HoistError::lock_invalid(format!("Failed to read {}: {e}", path.display())))?
        .unwrap_or_default();
    let referenced = referenced_layers(&records).into_iter().collect();

    let (registry, duplicates) = LayerRegistry::from_records(records);
    let report = LoadReport {
        source: LoadSource::Lockfile,
        lock_path: path,
        referenced,
        pruned: Vec::new(),
        ignored_lines: 0,
        duplicates,
        flatten: FlattenReport::default(),
        layers: summarize(&registry),
        elapsed: Duration::ZERO,
        digest,
    };

    Ok((registry, report))
}

/// Run discovery, build and flatten the registry, and rewrite the lock artifact.
///
/// Nothing is written if discovery fails or a layer is missing.
pub fn load_discovered(
    root: &Path,
    discovery: &mut dyn Discovery,
) -> Result<(LayerRegistry, LoadReport), HoistError> {
    let output = discovery.discover(root)?;
    let BuiltRegistry {
        mut records,
        exclusions,
        referenced,
        pruned,
        duplicates,
        ignored_lines,
    } = build_registry(&output)?;

    let flatten_report = flatten(&mut records, &exclusions);
    let registry = LayerRegistry::new(records, exclusions);

    let sorted = registry.to_sorted_vec();
    let lock_path = write_lock(root, &sorted)?;
    let digest = lock_digest(&sorted)?;

    let report = LoadReport {
        source: LoadSource::Discovery,
        lock_path,
        referenced: referenced.into_iter().collect(),
        pruned,
        ignored_lines,
        duplicates,
        flatten: flatten_report,
        layers: summarize(&registry),
        elapsed: Duration::ZERO,
        digest,
    };

    Ok((registry, report))
}

fn summarize(registry: &LayerRegistry) -> Vec<LayerSummary> {
    registry
        .records()
        .map(|r| LayerSummary {
            name: r.name.clone(),
            dependencies: r.dependencies.len(),
            dev_dependencies: r.dev_dependencies.len(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hoist::collector::SENTINEL;
    use crate::hoist::error::codes;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::tempdir;

    /// Returns canned output and counts invocations.
    struct FakeDiscovery {
        output: Result<String, HoistError>,
        calls: Rc<Cell<usize>>,
    }

    fn fake(output: Result<String, HoistError>) -> (Box<dyn Discovery>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let discovery = FakeDiscovery {
            output,
            calls: Rc::clone(&calls),
        };
        (Box::new(discovery), calls)
    }

    impl Discovery for FakeDiscovery {
        fn discover(&mut self, _root: &Path) -> Result<String, HoistError> {
            self.calls.set(self.calls.get() + 1);
            self.output.clone()
        }
    }

    fn walk(lines: &[&str]) -> String {
        lines
            .iter()
            .map(|l| format!("{SENTINEL}{l}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn chain_walk() -> String {
        walk(&[
            r#"{"name":"app","dependencies":{"mid":"*","lodash":"^3.0.0"}}"#,
            r#"{"name":"mid","dependencies":{"base":"*"},"hoistLayer":["base"]}"#,
            r#"{"name":"base","dependencies":{"lodash":"^4.0.0"}}"#,
            "{not json",
        ])
    }

    #[test]
    fn test_refresh_discovers_once_and_writes_lock() {
        let dir = tempdir().unwrap();
        let (discovery, calls) = fake(Ok(chain_walk()));
        let mut ctx = HoistContext::new(dir.path(), InstallMode::Refresh, discovery);
        assert_eq!(ctx.state_name(), "uninitialized");

        let registry = ctx.ensure_ready().unwrap();
        assert_eq!(
            registry.get("mid").unwrap().dependencies.get("lodash").map(String::as_str),
            Some("^4.0.0")
        );
        ctx.ensure_ready().unwrap();
        assert_eq!(calls.get(), 1);
        assert!(ctx.is_ready());

        let report = ctx.take_report().unwrap();
        assert_eq!(report.source, LoadSource::Discovery);
        assert_eq!(report.referenced, ["base", "mid"]);
        assert_eq!(report.pruned, ["app"]);
        assert_eq!(report.ignored_lines, 1);
        assert_eq!(report.layers.len(), 2);
        assert!(report.lock_path.exists());
        assert_eq!(report.digest.len(), 64);
        assert!(ctx.take_report().is_none());
    }

    #[test]
    fn test_frozen_replays_lock_without_discovery() {
        let dir = tempdir().unwrap();
        let (discovery, _) = fake(Ok(walk(&[
            r#"{"name":"app","dependencies":{"shared":"*"},"hoistLayer":[["shared",["react"]]]}"#,
            r#"{"name":"shared","dependencies":{"react":"^18","zod":"^3"}}"#,
        ])));
        let mut refresh = HoistContext::new(dir.path(), InstallMode::Refresh, discovery);
        refresh.ensure_ready().unwrap();
        let written = refresh.take_report().unwrap();

        let (discovery, calls) = fake(Err(HoistError::new(codes::HOIST_DISCOVERY_FAILED, "unused")));
        let mut frozen = HoistContext::new(dir.path(), InstallMode::Frozen, discovery);
        let registry = frozen.ensure_ready().unwrap();

        assert_eq!(calls.get(), 0);
        assert!(registry.exclusions().is_excluded("app", "shared", "react"));
        assert_eq!(
            registry.get("app").unwrap().dependencies.get("zod").map(String::as_str),
            Some("^3")
        );
        let report = frozen.take_report().unwrap();
        assert_eq!(report.source, LoadSource::Lockfile);
        assert_eq!(report.digest, written.digest);
    }

    #[test]
    fn test_frozen_without_lock_fails_then_reentrant() {
        let dir = tempdir().unwrap();
        let (discovery, calls) = fake(Ok(String::new()));
        let mut ctx = HoistContext::new(dir.path(), InstallMode::Frozen, discovery);

        let err = ctx.ensure_ready().unwrap_err();
        assert_eq!(err.code(), codes::HOIST_LOCK_NOT_FOUND);
        assert_eq!(calls.get(), 0);
        assert_eq!(ctx.state_name(), "discovering");

        let err = ctx.ensure_ready().unwrap_err();
        assert_eq!(err.code(), codes::HOIST_LOAD_REENTRANT);
    }

    #[test]
    fn test_missing_layer_writes_no_lock() {
        let dir = tempdir().unwrap();
        let (discovery, _) = fake(Ok(walk(&[
            r#"{"name":"app","dependencies":{},"hoistLayer":["ghost"]}"#,
        ])));
        let mut ctx = HoistContext::new(dir.path(), InstallMode::Refresh, discovery);

        let err = ctx.ensure_ready().unwrap_err();
        assert_eq!(err.code(), codes::HOIST_LAYER_MISSING);
        assert!(!lock_path(dir.path()).exists());
        assert!(ctx.registry().is_none());
    }

    #[test]
    fn test_discovery_failure_propagates() {
        let dir = tempdir().unwrap();
        let failure = HoistError::discovery_exit("pnpm -r i", Some(1), "", "ERR_PNPM boom");
        let (discovery, _) = fake(Err(failure));
        let mut ctx = HoistContext::new(dir.path(), InstallMode::Refresh, discovery);

        let err = ctx.ensure_ready().unwrap_err();
        assert_eq!(err.code(), codes::HOIST_DISCOVERY_FAILED);
        assert!(err.details().iter().any(|d| d.contains("ERR_PNPM boom")));
    }

    #[test]
    fn test_from_config_uses_mode_and_root() {
        let config = Config::new(PathBuf::from("/ws")).with_mode(InstallMode::Frozen);
        let ctx = HoistContext::from_config(&config);
        assert_eq!(ctx.root(), Path::new("/ws"));
        assert_eq!(ctx.mode(), InstallMode::Frozen);
        assert!(!ctx.is_ready());
    }
}
