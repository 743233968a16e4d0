//! Binds the installed runtime: probe, load, resolve, publish.

use std::path::PathBuf;
use std::sync::OnceLock;

use libloading::Library;

use super::candidates::{Candidate, SearchPlan};
use super::error::BindError;
use super::loader::{ModuleLoader, SystemLoader};
use super::symbols::{RuntimeApi, SymbolTable};

/// Observable lifecycle of a [`Binder`].
///
/// There is no "attempting" state: concurrent callers of [`Binder::bind`]
/// block until the first attempt finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinderState {
    Uninitialized,
    Bound,
    Failed,
}

/// A fully resolved runtime. Holding it keeps the module loaded.
pub struct BoundRuntime<M> {
    candidate: Candidate,
    table: SymbolTable,
    api: RuntimeApi,
    _module: M,
}

impl<M> BoundRuntime<M> {
    pub fn api(&self) -> &RuntimeApi {
        &self.api
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    pub fn library_path(&self) -> &std::path::Path {
        &self.candidate.path
    }
}

impl<M> std::fmt::Debug for BoundRuntime<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundRuntime")
            .field("candidate", &self.candidate)
            .field("symbols", &self.table.len())
            .finish_non_exhaustive()
    }
}

/// Locates, loads and resolves the runtime exactly once.
///
/// The first outcome of [`Binder::bind`], success or failure, is cached:
/// later calls return it without touching the filesystem or the loader.
pub struct Binder<L: ModuleLoader> {
    plan: SearchPlan,
    loader: L,
    state: OnceLock<Result<BoundRuntime<L::Module>, BindError>>,
}

impl<L: ModuleLoader> Binder<L> {
    pub fn new(plan: SearchPlan, loader: L) -> Self {
        Self {
            plan,
            loader,
            state: OnceLock::new(),
        }
    }

    pub fn plan(&self) -> &SearchPlan {
        &self.plan
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn state(&self) -> BinderState {
        match self.state.get() {
            None => BinderState::Uninitialized,
            Some(Ok(_)) => BinderState::Bound,
            Some(Err(_)) => BinderState::Failed,
        }
    }

    /// The bound runtime, if a previous [`Binder::bind`] succeeded.
    pub fn bound(&self) -> Option<&BoundRuntime<L::Module>> {
        self.state.get().and_then(|outcome| outcome.as_ref().ok())
    }

    pub fn bind(&self) -> Result<&BoundRuntime<L::Module>, BindError> {
        self.state
            .get_or_init(|| self.attempt())
            .as_ref()
            .map_err(Clone::clone)
    }

    fn attempt(&self) -> Result<BoundRuntime<L::Module>, BindError> {
        let (candidate, module) = self.locate().inspect_err(|e| tracing::error!("{}", e))?;

        let (table, api) = RuntimeApi::resolve(&module, &candidate.path)
            .inspect_err(|e| tracing::error!("{}", e))?;

        tracing::info!(
            "Bound runtime {} from {:?} ({} symbols)",
            candidate.version,
            candidate.path,
            table.len()
        );

        Ok(BoundRuntime {
            candidate,
            table,
            api,
            _module: module,
        })
    }

    /// First-match probe over the candidate list.
    fn locate(&self) -> Result<(Candidate, L::Module), BindError> {
        let candidates = self.plan.candidates();
        let mut tried: Vec<PathBuf> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            tried.push(candidate.path.clone());

            // dlopen of a missing versioned path inside a framework may hand
            // back a different installed version. Never ask for one.
            if !candidate.path.exists() {
                tracing::info!("Skipping {:?}: not present", candidate.path);
                continue;
            }

            match self.loader.load(&candidate.path) {
                Ok(module) => return Ok((candidate, module)),
                Err(e) => {
                    tracing::warn!("Failed to load {:?}: {:#}", candidate.path, e);
                }
            }
        }

        Err(BindError::RuntimeNotFound { tried })
    }
}

static GLOBAL: OnceLock<Binder<SystemLoader>> = OnceLock::new();

/// Binds the process-wide runtime with the default search plan.
pub fn bind() -> Result<&'static BoundRuntime<Library>, BindError> {
    bind_with(SearchPlan::default())
}

/// Binds the process-wide runtime.
///
/// The first call fixes the search plan; `plan` is ignored on later calls,
/// which return the cached outcome.
pub fn bind_with(plan: SearchPlan) -> Result<&'static BoundRuntime<Library>, BindError> {
    GLOBAL
        .get_or_init(|| Binder::new(plan, SystemLoader))
        .bind()
}

/// The process-wide runtime API, once bound.
pub fn runtime() -> Option<&'static RuntimeApi> {
    GLOBAL.get()?.bound().map(BoundRuntime::api)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::SymbolSource;
    use crate::core::symbols::REQUIRED_SYMBOLS;
    use crate::utils::test_helpers::install_fake_runtime;
    use std::collections::HashSet;
    use std::ffi::c_void;
    use std::path::Path;
    use std::ptr::NonNull;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    static SENTINEL: u8 = 0;

    struct FakeModule {
        missing: HashSet<&'static str>,
    }

    impl SymbolSource for FakeModule {
        fn lookup(&self, name: &str) -> Option<NonNull<c_void>> {
            if self.missing.contains(name) {
                None
            } else {
                Some(NonNull::from(&SENTINEL).cast())
            }
        }
    }

    #[derive(Default)]
    struct FakeLoader {
        attempts: Mutex<Vec<PathBuf>>,
        broken: HashSet<PathBuf>,
        missing: HashSet<&'static str>,
    }

    impl FakeLoader {
        fn attempts(&self) -> Vec<PathBuf> {
            self.attempts.lock().unwrap().clone()
        }
    }

    impl ModuleLoader for FakeLoader {
        type Module = FakeModule;

        fn load(&self, path: &Path) -> anyhow::Result<FakeModule> {
            self.attempts.lock().unwrap().push(path.to_path_buf());
            if self.broken.contains(path) {
                anyhow::bail!("not a valid image");
            }
            Ok(FakeModule {
                missing: self.missing.clone(),
            })
        }
    }

    fn plan_for<P: AsRef<Path>>(bases: &[P]) -> SearchPlan {
        SearchPlan {
            env_var: "RUNTIME_THUNK_BINDER_UNIT_UNUSED".to_string(),
            fallback_dirs: bases.iter().map(|b| b.as_ref().to_path_buf()).collect(),
            ..Default::default()
        }
    }

    #[test]
    #[traced_test]
    fn first_existing_candidate_wins() {
        let root = tempfile::tempdir().unwrap();
        let first = root.path().join("first");
        let second = root.path().join("second");
        let plan = plan_for(&[&first, &second]);
        install_fake_runtime(&plan, &second, "2.5");
        let expected = install_fake_runtime(&plan, &second, "2.6");

        let binder = Binder::new(plan, FakeLoader::default());
        assert_eq!(binder.state(), BinderState::Uninitialized);
        let bound = binder.bind().unwrap();

        assert_eq!(bound.candidate().base, second);
        assert_eq!(bound.candidate().version, "2.6");
        assert_eq!(bound.library_path(), expected);
        assert_eq!(binder.loader().attempts(), vec![expected]);
        assert_eq!(binder.state(), BinderState::Bound);
        assert!(logs_contain("not present"));
    }

    #[test]
    #[traced_test]
    fn nothing_on_disk_means_not_found_and_no_load() {
        let root = tempfile::tempdir().unwrap();
        let plan = plan_for(&[&root.path().join("a"), &root.path().join("b")]);

        let binder = Binder::new(plan, FakeLoader::default());
        let err = binder.bind().unwrap_err();

        match err {
            BindError::RuntimeNotFound { tried } => assert_eq!(tried.len(), 4),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(binder.loader().attempts().is_empty());
        assert_eq!(binder.state(), BinderState::Failed);
        assert!(logs_contain("not present"));
        assert!(logs_contain("Cannot find path to the runtime library"));
    }

    #[test]
    fn broken_candidate_falls_through_to_the_next() {
        let root = tempfile::tempdir().unwrap();
        let base = root.path().join("fw");
        let plan = plan_for(&[&base]);
        let broken = install_fake_runtime(&plan, &base, "2.6");
        let good = install_fake_runtime(&plan, &base, "2.5");

        let loader = FakeLoader {
            broken: HashSet::from([broken.clone()]),
            ..Default::default()
        };
        let binder = Binder::new(plan, loader);
        let bound = binder.bind().unwrap();

        assert_eq!(bound.library_path(), good);
        assert_eq!(binder.loader().attempts(), vec![broken, good]);
    }

    #[test]
    fn every_existing_candidate_broken_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let base = root.path().join("fw");
        let plan = plan_for(&[&base]);
        let only = install_fake_runtime(&plan, &base, "2.6");

        let loader = FakeLoader {
            broken: HashSet::from([only]),
            ..Default::default()
        };
        let binder = Binder::new(plan, loader);

        assert!(matches!(
            binder.bind(),
            Err(BindError::RuntimeNotFound { .. })
        ));
        assert_eq!(binder.loader().attempts().len(), 1);
    }

    #[test]
    #[traced_test]
    fn missing_symbol_publishes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let base = root.path().join("fw");
        let plan = plan_for(&[&base]);
        let library = install_fake_runtime(&plan, &base, "2.6");

        let loader = FakeLoader {
            missing: HashSet::from(["PyType_Ready"]),
            ..Default::default()
        };
        let binder = Binder::new(plan, loader);
        let err = binder.bind().unwrap_err();

        assert_eq!(
            err,
            BindError::SymbolMissing {
                symbol: "PyType_Ready",
                library,
            }
        );
        assert!(binder.bound().is_none());
        assert_eq!(binder.state(), BinderState::Failed);
        assert!(logs_contain("Cannot find symbol PyType_Ready"));
    }

    #[test]
    fn bound_table_holds_exactly_the_required_set() {
        let root = tempfile::tempdir().unwrap();
        let base = root.path().join("fw");
        let plan = plan_for(&[&base]);
        install_fake_runtime(&plan, &base, "2.5");

        let binder = Binder::new(plan, FakeLoader::default());
        let table = binder.bind().unwrap().table();

        let mut expected: Vec<&str> = REQUIRED_SYMBOLS.to_vec();
        expected.sort_unstable();
        assert_eq!(table.names().collect::<Vec<_>>(), expected);
        assert!(REQUIRED_SYMBOLS
            .iter()
            .all(|name| table.address(name).is_some()));
    }

    #[test]
    fn second_bind_does_not_probe_again() {
        let root = tempfile::tempdir().unwrap();
        let base = root.path().join("fw");
        let plan = plan_for(&[&base]);
        let library = install_fake_runtime(&plan, &base, "2.6");

        let binder = Binder::new(plan, FakeLoader::default());
        let first = binder.bind().unwrap();
        std::fs::remove_file(&library).unwrap();
        let second = binder.bind().unwrap();

        assert!(std::ptr::eq(first, second));
        assert_eq!(binder.loader().attempts().len(), 1);
    }

    #[test]
    fn failed_bind_is_cached() {
        let root = tempfile::tempdir().unwrap();
        let base = root.path().join("fw");
        let plan = plan_for(&[&base]);

        let binder = Binder::new(plan.clone(), FakeLoader::default());
        let first = binder.bind().unwrap_err();
        install_fake_runtime(&plan, &base, "2.6");
        let second = binder.bind().unwrap_err();

        assert_eq!(first, second);
        assert!(binder.loader().attempts().is_empty());
    }
}
