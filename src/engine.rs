//! Classification engine with atomic hot reload.
//!
//! The engine serves classifications from one immutable snapshot holding the
//! current decision tree and the rules rejected while building it. A reload
//! builds a complete new snapshot off to the side and publishes it with a
//! single atomic swap:
//! - in-flight classifications finish on the snapshot they started with
//! - new classifications see the new snapshot
//! - a failed reload leaves the current snapshot serving

use arc_swap::ArcSwap;
use log::{debug, error, info};
use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::decision::{PreprocessedRule, Tree, TreeInfo};
use crate::error::{Error, Result};
use crate::provider::ClassificationRuleProvider;
use crate::request::ClassificationRequest;
use crate::rule::Rule;

/// Notified after every successful reload.
pub trait ReloadListener: Send + Sync {
    /// Called with the accepted rules, in provider order, without the
    /// derived reversed rules.
    fn rules_reloaded(&self, rules: &[Rule]);
}

impl<F> ReloadListener for F
where
    F: Fn(&[Rule]) + Send + Sync,
{
    fn rules_reloaded(&self, rules: &[Rule]) {
        self(rules)
    }
}

/// What a reload publishes.
struct Snapshot {
    tree: Tree,
    invalid_rules: Vec<Rule>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            tree: Tree::empty(),
            invalid_rules: Vec::new(),
        }
    }
}

/// Classifies flows against a hot-reloadable rule set.
///
/// # Example
///
/// ```
/// use flowclass::{ClassificationEngine, ClassificationRequest, EngineConfig, Rule, StaticRuleProvider};
///
/// let provider = StaticRuleProvider::new(vec![
///     Rule::new("HTTP").with_protocol("tcp").with_dst_port("80").with_position(1),
///     Rule::new("DEFAULT").with_position(2),
/// ]);
/// let engine = ClassificationEngine::new(provider, EngineConfig::default());
/// engine.start().unwrap();
///
/// let request = ClassificationRequest::new().with_protocol(6).with_dst_port(80);
/// assert_eq!(engine.classify(&request).as_deref(), Some("HTTP"));
///
/// let request = ClassificationRequest::new().with_protocol(6).with_dst_port(443);
/// assert_eq!(engine.classify(&request).as_deref(), Some("DEFAULT"));
/// ```
pub struct ClassificationEngine {
    provider: Box<dyn ClassificationRuleProvider>,
    config: EngineConfig,
    snapshot: ArcSwap<Snapshot>,
    listeners: RwLock<Vec<Arc<dyn ReloadListener>>>,
    /// Serializes reloads
    reload_lock: Mutex<()>,
    /// Number of successful reloads
    generation: AtomicU64,
}

impl ClassificationEngine {
    /// Create an engine serving the empty tree until the first reload.
    pub fn new<P>(provider: P, config: EngineConfig) -> Self
    where
        P: ClassificationRuleProvider + 'static,
    {
        Self {
            provider: Box::new(provider),
            config,
            snapshot: ArcSwap::from_pointee(Snapshot::empty()),
            listeners: RwLock::new(Vec::new()),
            reload_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Create an engine and load its rules right away.
    pub fn with_rules<P>(provider: P) -> Result<Self>
    where
        P: ClassificationRuleProvider + 'static,
    {
        let engine = Self::new(provider, EngineConfig::default());
        engine.reload()?;
        Ok(engine)
    }

    /// Perform the initial reload if the configuration asks for it.
    pub fn start(&self) -> Result<()> {
        if self.config.reload_on_start {
            self.reload()
        } else {
            debug!("Skipping initial reload");
            Ok(())
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Classify a request against the current snapshot.
    ///
    /// Returns the name of the highest-priority matching rule, or `None` if
    /// no rule matches.
    #[inline]
    pub fn classify(&self, request: &ClassificationRequest) -> Option<Arc<str>> {
        let snapshot = self.snapshot.load();
        snapshot
            .tree
            .classify(request)
            .map(|result| Arc::clone(&result.name))
    }

    /// Rules rejected by the last successful reload.
    pub fn invalid_rules(&self) -> Vec<Rule> {
        self.snapshot.load().invalid_rules.clone()
    }

    /// Construction statistics of the tree currently serving.
    pub fn tree_info(&self) -> TreeInfo {
        *self.snapshot.load().tree.info()
    }

    /// Number of successful reloads so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Rebuild the decision tree from the provider's current rules.
    ///
    /// Rules that fail to parse are skipped and reported through
    /// [`invalid_rules`](Self::invalid_rules). If the provider fails, the
    /// error is returned and the current snapshot keeps serving.
    pub fn reload(&self) -> Result<()> {
        let _guard = self.reload_lock.lock();
        let started = Instant::now();

        let rules = self.provider.rules().map_err(|e| {
            error!("Failed to load classification rules: {}", e);
            e
        })?;

        let mut accepted = Vec::with_capacity(rules.len());
        let mut preprocessed = Vec::with_capacity(rules.len());
        let mut invalid_rules = Vec::new();
        for rule in rules {
            match PreprocessedRule::of(rule.clone()) {
                Ok(pre) => {
                    let reversed = pre.rule.can_be_reversed().then(|| pre.reverse());
                    preprocessed.push(pre);
                    preprocessed.extend(reversed);
                    accepted.push(rule);
                }
                Err(source) => {
                    let err = Error::InvalidRule {
                        name: rule.name.clone(),
                        source,
                    };
                    error!("Skipping rule {}: {}", rule, err);
                    invalid_rules.push(rule);
                }
            }
        }

        let tree = Tree::build(&preprocessed, self.config.tree_options()).map_err(|e| {
            error!("Failed to build classification tree: {}", e);
            e
        })?;

        info!(
            "Classification tree built in {:?}: {} rules ({} with reversed), {} invalid\n{}",
            started.elapsed(),
            accepted.len(),
            preprocessed.len(),
            invalid_rules.len(),
            tree.info()
        );

        self.snapshot.store(Arc::new(Snapshot {
            tree,
            invalid_rules,
        }));
        self.generation.fetch_add(1, Ordering::SeqCst);

        self.notify(&accepted);
        Ok(())
    }

    fn notify(&self, rules: &[Rule]) {
        // Listeners may register or remove listeners themselves.
        let listeners: Vec<Arc<dyn ReloadListener>> = self.listeners.read().clone();
        for listener in listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.rules_reloaded(rules)));
            if outcome.is_err() {
                error!("Reload listener panicked; continuing with remaining listeners");
            }
        }
    }

    /// Register a listener called after every successful reload.
    pub fn add_reload_listener(&self, listener: Arc<dyn ReloadListener>) {
        self.listeners.write().push(listener);
    }

    /// Remove a previously registered listener.
    ///
    /// Returns `false` if the listener was not registered.
    pub fn remove_reload_listener(&self, listener: &Arc<dyn ReloadListener>) -> bool {
        let target = Arc::as_ptr(listener) as *const ();
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| Arc::as_ptr(l) as *const () != target);
        listeners.len() != before
    }
}
