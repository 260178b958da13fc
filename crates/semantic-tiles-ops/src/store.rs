//! Domain stores: where sibling sets come from and where positions go back to.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use semantic_tiles_core::{DistanceMap, Domain, DomainId, PositionedDomain};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{OpsError, OpsResult};

/// Name of the persistence folder.
pub const TILES_DIR: &str = ".tiles";

const CATALOG_FILE: &str = "catalog.json";

/// Distance table key used for the top level of the hierarchy.
const ROOT_LEVEL: &str = "";

/// One level of the hierarchy: the children of `parent`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiblingSet {
    pub parent: Option<DomainId>,
    pub domains: Vec<Domain>,
    pub distances: DistanceMap,
}

/// Source of sibling sets and sink for computed positions.
///
/// Calls are blocking; the recompute pipeline runs them off the async
/// executor.
pub trait DomainStore: Send + Sync + 'static {
    /// Children of `parent` (top level for `None`) with their pair distances.
    fn fetch_sibling_domains(&self, parent: Option<&DomainId>) -> OpsResult<SiblingSet>;

    /// Write computed positions back as the domains' cached coordinates.
    fn persist_positions(
        &self,
        parent: Option<&DomainId>,
        positions: &[PositionedDomain],
    ) -> OpsResult<()>;
}

/// Whole hierarchy plus per-level distance tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default = "catalog_version")]
    pub version: u32,

    #[serde(default)]
    pub domains: Vec<Domain>,

    /// Distance tables keyed by parent id (`""` for the top level).
    #[serde(default)]
    pub distances: BTreeMap<String, DistanceMap>,
}

fn catalog_version() -> u32 {
    1
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            version: catalog_version(),
            ..Self::default()
        }
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domains.push(domain);
        self
    }

    /// Set the distance table of one level.
    pub fn with_distances(mut self, parent: Option<&DomainId>, distances: DistanceMap) -> Self {
        self.distances.insert(level_key(parent).to_string(), distances);
        self
    }

    /// Children of `parent` in catalog order.
    pub fn siblings(&self, parent: Option<&DomainId>) -> SiblingSet {
        SiblingSet {
            parent: parent.cloned(),
            domains: self
                .domains
                .iter()
                .filter(|d| d.parent_id.as_ref() == parent)
                .cloned()
                .collect(),
            distances: self
                .distances
                .get(level_key(parent))
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Copy positions onto matching children of `parent`. Returns how many changed.
    pub fn apply_positions(
        &mut self,
        parent: Option<&DomainId>,
        positions: &[PositionedDomain],
    ) -> usize {
        let by_id: BTreeMap<&DomainId, &PositionedDomain> =
            positions.iter().map(|p| (&p.id, p)).collect();
        let mut updated = 0;
        for domain in self
            .domains
            .iter_mut()
            .filter(|d| d.parent_id.as_ref() == parent)
        {
            if let Some(p) = by_id.get(&domain.id) {
                domain.x = Some(p.x);
                domain.y = Some(p.y);
                updated += 1;
            }
        }
        updated
    }
}

fn level_key(parent: Option<&DomainId>) -> &str {
    parent.map(DomainId::as_str).unwrap_or(ROOT_LEVEL)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// JSON file store
// =============================================================================

/// Store backed by `<root>/.tiles/catalog.json`.
#[derive(Debug)]
pub struct JsonStore {
    /// Root path of the workspace.
    root: PathBuf,

    /// Path to the `.tiles` directory.
    tiles_dir: PathBuf,

    /// Serializes read-modify-write cycles on the catalog file.
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Create a new store for the given root.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let tiles_dir = root.join(TILES_DIR);
        Self {
            root,
            tiles_dir,
            write_lock: Mutex::new(()),
        }
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.tiles_dir.join(CATALOG_FILE)
    }

    /// Check if the catalog exists.
    pub fn exists(&self) -> bool {
        self.catalog_path().exists()
    }

    /// Load the catalog.
    pub fn load(&self) -> OpsResult<Catalog> {
        let path = self.catalog_path();
        if !path.exists() {
            return Err(OpsError::StoreNotFound {
                path: self.tiles_dir.clone(),
            });
        }

        let json = std::fs::read_to_string(&path)?;
        let catalog: Catalog = serde_json::from_str(&json)?;

        debug!(
            path = %path.display(),
            domains = catalog.domains.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// Write the catalog, creating `.tiles` if needed.
    pub fn save(&self, catalog: &Catalog) -> OpsResult<()> {
        if !self.tiles_dir.exists() {
            std::fs::create_dir_all(&self.tiles_dir)?;
            debug!(path = %self.tiles_dir.display(), "Created .tiles directory");
        }

        let path = self.catalog_path();
        let json = serde_json::to_string_pretty(catalog)?;
        // Write-then-rename so readers never see a half-written catalog.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;

        info!(
            path = %path.display(),
            domains = catalog.domains.len(),
            "Saved catalog"
        );
        Ok(())
    }
}

impl DomainStore for JsonStore {
    fn fetch_sibling_domains(&self, parent: Option<&DomainId>) -> OpsResult<SiblingSet> {
        Ok(self.load()?.siblings(parent))
    }

    fn persist_positions(
        &self,
        parent: Option<&DomainId>,
        positions: &[PositionedDomain],
    ) -> OpsResult<()> {
        let _guard = lock(&self.write_lock);
        let mut catalog = self.load()?;
        let updated = catalog.apply_positions(parent, positions);
        self.save(&catalog)?;
        debug!(updated, "Persisted positions");
        Ok(())
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Store holding the catalog in memory, with optional write failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: Mutex<Catalog>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Mutex::new(catalog),
            ..Self::default()
        }
    }

    /// Make every subsequent `persist_positions` call fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of the current catalog.
    pub fn catalog(&self) -> Catalog {
        lock(&self.catalog).clone()
    }
}

impl DomainStore for MemoryStore {
    fn fetch_sibling_domains(&self, parent: Option<&DomainId>) -> OpsResult<SiblingSet> {
        Ok(lock(&self.catalog).siblings(parent))
    }

    fn persist_positions(
        &self,
        parent: Option<&DomainId>,
        positions: &[PositionedDomain],
    ) -> OpsResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(OpsError::Persistence("store is read-only".to_string()));
        }
        lock(&self.catalog).apply_positions(parent, positions);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
