use std::error::Error as StdError;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use crate::callback::CompositeCallback;
use crate::name::parent_name;
use crate::simon::{Context, SimonCommon};
use crate::tree::Tree;
use crate::{
    Callback, Clock, Configuration, Counter, Error, NodeId, ROOT_SIMON_NAME, Result, SimonHandle,
    SimonKind, SimonPattern, SimonState, Stopwatch, SystemClock, is_valid_name,
};

/// Owner of a hierarchy of named Simons.
///
/// Simons are created on first lookup, typed on first typed lookup and live until they are
/// destroyed or the registry is cleared. Names are dot-delimited paths (`app.db.query`);
/// every missing ancestor of a requested name is created as a placeholder
/// ([`SimonKind::Unknown`]). The root is the placeholder with the empty name.
///
/// The registry is a cheap handle: clones share the same hierarchy. Structural changes
/// (creating, upgrading and destroying Simons, changing states) are serialized by one lock.
/// Recording values into counters and stopwatches never takes that lock.
///
/// # Example
///
/// ```
/// use simons::{Registry, SimonKind, SimonState};
///
/// let registry = Registry::new();
///
/// let hits = registry.counter("app.cache.hits").unwrap();
/// hits.increase();
///
/// // The ancestors exist as placeholders.
/// assert_eq!(registry.get("app.cache").unwrap().kind(), SimonKind::Unknown);
///
/// // Disabling an ancestor disables everything that inherits from it.
/// registry
///     .set_state(&registry.get("app").unwrap(), SimonState::Disabled, false)
///     .unwrap();
/// assert!(!hits.is_enabled());
/// ```
#[derive(Clone, Debug)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug)]
struct RegistryInner {
    tree: RwLock<Tree>,
    context: Arc<Context>,
    configuration: Configuration,
    next_id: AtomicU64,
}

impl Registry {
    /// Creates a registry with the system clock, no callbacks and no configuration rules.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a registry with custom settings.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    fn from_builder(builder: RegistryBuilder) -> Self {
        let clock: Arc<dyn Clock> = match builder.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock::new()),
        };

        let context = Arc::new(Context {
            clock,
            callbacks: CompositeCallback::new(builder.callbacks),
        });

        let next_id = AtomicU64::new(0);
        let root = Self::new_root(&context, &builder.configuration, &next_id);

        Self {
            inner: Arc::new(RegistryInner {
                tree: RwLock::new(Tree::new(root)),
                context,
                configuration: builder.configuration,
                next_id,
            }),
        }
    }

    fn new_root(
        context: &Arc<Context>,
        configuration: &Configuration,
        next_id: &AtomicU64,
    ) -> SimonHandle {
        // The root never inherits, there is nothing above it.
        let state = configuration
            .initial_state(ROOT_SIMON_NAME, SimonKind::Unknown)
            .filter(|state| *state != SimonState::Inherit)
            .unwrap_or(SimonState::Enabled);

        SimonHandle::new_node(
            SimonKind::Unknown,
            SimonCommon::new(
                NodeId::new(next_id.fetch_add(1, Ordering::Relaxed)),
                Some(ROOT_SIMON_NAME.to_string()),
                state,
                state == SimonState::Enabled,
                Arc::clone(context),
            ),
            false,
        )
    }

    fn new_common(&self, name: Option<String>, state: SimonState, enabled: bool) -> SimonCommon {
        SimonCommon::new(
            NodeId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed)),
            name,
            state,
            enabled,
            Arc::clone(&self.inner.context),
        )
    }

    /// The clock all Simons of this registry use.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.context.clock
    }

    /// Returns the Simon named `name`, creating or upgrading it as needed.
    ///
    /// * A `kind` of [`SimonKind::Unknown`] returns whatever exists under the name, or creates
    ///   a placeholder. The empty name returns the root.
    /// * A placeholder requested as a counter or stopwatch is upgraded in place. Its state
    ///   and position in the hierarchy carry over, existing handles to the placeholder go
    ///   stale.
    /// * Missing ancestors are created as placeholders.
    ///
    /// [`Callback::on_simon_created()`] fires for the requested Simon when it was created or
    /// upgraded, never for placeholders created along the way.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidName`] if `name` does not match the name grammar.
    /// * [`Error::RootSimonMisuse`] if the root is requested as a counter or stopwatch.
    /// * [`Error::KindConflict`] if the name is already bound to a different concrete kind.
    pub fn get_or_create(&self, name: &str, kind: SimonKind) -> Result<SimonHandle> {
        if name == ROOT_SIMON_NAME {
            return match kind {
                SimonKind::Unknown => Ok(self.root()),
                _ => Err(Error::RootSimonMisuse {
                    operation: "typed lookup",
                }),
            };
        }

        if !is_valid_name(name) {
            return Err(Error::InvalidName {
                name: name.to_string(),
            });
        }

        let existing = self.inner.tree.read().get(name).cloned();

        if let Some(existing) = existing {
            if let Some(reused) = reuse(name, &existing, kind)? {
                return Ok(reused);
            }
        }

        let (simon, created) = {
            let mut tree = self.inner.tree.write();
            self.create_locked(&mut tree, name, kind)?
        };

        if created {
            let callbacks = &self.inner.context.callbacks;
            callbacks.dispatch(|callback| callback.on_simon_created(&simon));
        }

        Ok(simon)
    }

    /// Returns the counter named `name`, creating or upgrading it as needed.
    ///
    /// # Errors
    ///
    /// See [`get_or_create()`][Self::get_or_create].
    pub fn counter(&self, name: &str) -> Result<Counter> {
        match self.get_or_create(name, SimonKind::Counter)? {
            SimonHandle::Counter(counter) => Ok(counter),
            other => Err(kind_conflict(name, other.kind(), SimonKind::Counter)),
        }
    }

    /// Returns the stopwatch named `name`, creating or upgrading it as needed.
    ///
    /// # Errors
    ///
    /// See [`get_or_create()`][Self::get_or_create].
    pub fn stopwatch(&self, name: &str) -> Result<Stopwatch> {
        match self.get_or_create(name, SimonKind::Stopwatch)? {
            SimonHandle::Stopwatch(stopwatch) => Ok(stopwatch),
            other => Err(kind_conflict(name, other.kind(), SimonKind::Stopwatch)),
        }
    }

    fn create_locked(
        &self,
        tree: &mut Tree,
        name: &str,
        kind: SimonKind,
    ) -> Result<(SimonHandle, bool)> {
        // Another thread may have created the name between our read and write locks.
        if let Some(id) = tree.id_of(name) {
            let Some(existing) = tree.slot(id).map(|slot| slot.simon.clone()) else {
                return Err(Error::NotFound {
                    name: name.to_string(),
                });
            };

            if let Some(reused) = reuse(name, &existing, kind)? {
                return Ok((reused, false));
            }

            let common = existing.common();
            let upgraded = SimonHandle::new_node(
                kind,
                SimonCommon::new(
                    id,
                    Some(name.to_string()),
                    common.state(),
                    common.is_enabled(),
                    Arc::clone(&self.inner.context),
                ),
                self.inner.configuration.online_stats(name),
            );
            tree.replace(id, upgraded.clone());

            debug!(name, %kind, "upgraded Simon from placeholder");
            return Ok((upgraded, true));
        }

        let parent = self.ensure_placeholders(tree, parent_name(name));
        let simon = self.insert_new(tree, parent, name, kind);

        Ok((simon, true))
    }

    /// Returns the id of `name`, creating it and its missing ancestors as placeholders.
    fn ensure_placeholders(&self, tree: &mut Tree, name: &str) -> NodeId {
        if name == ROOT_SIMON_NAME {
            return tree.root_id();
        }

        if let Some(id) = tree.id_of(name) {
            return id;
        }

        let parent = self.ensure_placeholders(tree, parent_name(name));
        self.insert_new(tree, parent, name, SimonKind::Unknown).id()
    }

    fn insert_new(
        &self,
        tree: &mut Tree,
        parent: NodeId,
        name: &str,
        kind: SimonKind,
    ) -> SimonHandle {
        let configuration = &self.inner.configuration;
        let state = configuration
            .initial_state(name, kind)
            .unwrap_or(SimonState::Inherit);
        let enabled = state.resolve(
            tree.slot(parent)
                .is_none_or(|parent| parent.simon.is_enabled()),
        );

        let simon = SimonHandle::new_node(
            kind,
            self.new_common(Some(name.to_string()), state, enabled),
            configuration.online_stats(name),
        );
        tree.insert(parent, simon.clone());

        debug!(name, %kind, %state, "created Simon");
        simon
    }

    /// The Simon named `name`, if it exists. The empty name is the root.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<SimonHandle> {
        self.inner.tree.read().get(name).cloned()
    }

    /// The root Simon.
    #[must_use]
    pub fn root(&self) -> SimonHandle {
        let tree = self.inner.tree.read();

        tree.slot(tree.root_id())
            .map(|slot| slot.simon.clone())
            .expect("the root slot exists for the whole lifetime of a tree")
    }

    /// Number of Simons in the hierarchy, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.tree.read().len()
    }

    /// Whether the hierarchy contains nothing but the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Names of all Simons, including the empty root name, in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .tree
            .read()
            .handles()
            .filter_map(|simon| simon.name().map(str::to_string))
            .collect();

        names.sort_unstable();
        names
    }

    /// All Simons whose name matches `pattern`, or all Simons without a pattern, sorted by name.
    #[must_use]
    pub fn simons(&self, pattern: Option<&SimonPattern>) -> Vec<SimonHandle> {
        let mut simons: Vec<SimonHandle> = self
            .inner
            .tree
            .read()
            .handles()
            .filter(|simon| {
                pattern.is_none_or(|pattern| pattern.matches(simon.name().unwrap_or_default()))
            })
            .cloned()
            .collect();

        simons.sort_unstable_by(|a, b| a.name().cmp(&b.name()));
        simons
    }

    /// The parent of `simon` in the hierarchy. `None` for the root and for Simons that are
    /// no longer registered.
    #[must_use]
    pub fn parent(&self, simon: impl Into<SimonHandle>) -> Option<SimonHandle> {
        let simon = simon.into();
        let tree = self.inner.tree.read();

        tree.slot_of(&simon)
            .and_then(|slot| slot.parent)
            .and_then(|parent| tree.slot(parent))
            .map(|slot| slot.simon.clone())
    }

    /// The children of `simon`, in creation order. Empty for Simons that are no longer
    /// registered.
    #[must_use]
    pub fn children(&self, simon: impl Into<SimonHandle>) -> Vec<SimonHandle> {
        let simon = simon.into();
        let tree = self.inner.tree.read();

        tree.slot_of(&simon)
            .map(|slot| {
                slot.children
                    .iter()
                    .filter_map(|child| tree.slot(*child))
                    .map(|slot| slot.simon.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Changes the explicit state of `simon` and updates the effective state of every
    /// Simon that inherits from it.
    ///
    /// With `overrule`, every descendant is switched to [`SimonState::Inherit`] first, so
    /// the whole subtree follows the new state.
    ///
    /// The root and anonymous Simons cannot inherit; requesting [`SimonState::Inherit`] for
    /// them does nothing.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if `simon` is a stale handle of a destroyed or upgraded Simon.
    pub fn set_state(
        &self,
        simon: impl Into<SimonHandle>,
        state: SimonState,
        overrule: bool,
    ) -> Result<()> {
        let simon = simon.into();
        let common = simon.common();

        let Some(name) = common.name() else {
            if state != SimonState::Inherit {
                common.store_state(state);
                common.store_enabled(state == SimonState::Enabled);
            }

            return Ok(());
        };

        // Exclusive even though the tree itself is not modified: propagation must not
        // interleave with another state change or an upgrade.
        let tree = self.inner.tree.write();

        let Some(slot) = tree.slot_of(&simon) else {
            return Err(Error::NotFound {
                name: name.to_string(),
            });
        };

        if state == SimonState::Inherit && slot.parent.is_none() {
            return Ok(());
        }

        let id = simon.id();
        common.store_state(state);
        common.store_enabled(state.resolve(tree.parent_enabled(id)));
        tree.propagate(id, overrule);

        debug!(name, %state, overrule, "changed Simon state");
        Ok(())
    }

    /// Removes the Simon named `name`.
    ///
    /// A Simon with children is replaced by a fresh placeholder that inherits its state, so
    /// the children keep their place. A Simon without children is unlinked entirely.
    ///
    /// # Errors
    ///
    /// * [`Error::RootSimonMisuse`] for the root.
    /// * [`Error::NotFound`] if no Simon has this name.
    pub fn destroy(&self, name: &str) -> Result<()> {
        if name == ROOT_SIMON_NAME {
            return Err(Error::RootSimonMisuse {
                operation: "destroy",
            });
        }

        let destroyed = {
            let mut tree = self.inner.tree.write();

            let id = tree.id_of(name).ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })?;

            let has_children = tree
                .slot(id)
                .is_some_and(|slot| !slot.children.is_empty());

            if has_children {
                let placeholder = SimonHandle::new_node(
                    SimonKind::Unknown,
                    SimonCommon::new(
                        id,
                        Some(name.to_string()),
                        SimonState::Inherit,
                        tree.parent_enabled(id),
                        Arc::clone(&self.inner.context),
                    ),
                    false,
                );

                let destroyed = tree.replace(id, placeholder);
                tree.propagate(id, false);
                destroyed
            } else {
                tree.remove_leaf(id)
            }
        };

        debug!(name, "destroyed Simon");

        if let Some(destroyed) = destroyed {
            self.inner
                .context
                .callbacks
                .dispatch(|callback| callback.on_simon_destroyed(&destroyed));
        }

        Ok(())
    }

    /// Discards every Simon and starts over with a fresh root.
    ///
    /// Handles obtained before stay usable but are no longer part of the hierarchy.
    pub fn clear(&self) {
        let root = Self::new_root(
            &self.inner.context,
            &self.inner.configuration,
            &self.inner.next_id,
        );

        let previous = {
            let mut tree = self.inner.tree.write();
            mem::replace(&mut *tree, Tree::new(root))
        };

        debug!(discarded = previous.len(), "cleared registry");
        drop(previous);

        self.inner
            .context
            .callbacks
            .dispatch(|callback| callback.on_registry_cleared());
    }

    /// Resets `simon` and every Simon below it.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if `simon` is not part of this registry's hierarchy.
    pub fn reset_subtree(&self, simon: impl Into<SimonHandle>) -> Result<()> {
        let simon = simon.into();

        let subtree = {
            let tree = self.inner.tree.read();

            if tree.slot_of(&simon).is_none() {
                return Err(Error::NotFound {
                    name: simon.name().unwrap_or_default().to_string(),
                });
            }

            tree.subtree(simon.id())
        };

        for simon in subtree {
            simon.reset();
        }

        Ok(())
    }

    /// Forgets every incremental sampling key, in every Simon, that was last used strictly
    /// before `cutoff_millis`.
    ///
    /// Returns the number of forgotten keys. Each Simon is locked only while its own keys are
    /// examined.
    pub fn purge_incremental_older_than(&self, cutoff_millis: i64) -> usize {
        let simons: Vec<SimonHandle> = self.inner.tree.read().handles().cloned().collect();

        simons
            .iter()
            .map(|simon| simon.purge_incremental_older_than(cutoff_millis))
            .sum()
    }

    /// Creates a counter that is not part of the hierarchy and is always enabled.
    #[must_use]
    pub fn anonymous_counter(&self) -> Counter {
        Counter::new(self.new_common(None, SimonState::Enabled, true))
    }

    /// Creates a stopwatch that is not part of the hierarchy and is always enabled.
    #[must_use]
    pub fn anonymous_stopwatch(&self) -> Stopwatch {
        Stopwatch::new(self.new_common(None, SimonState::Enabled, true), true)
    }

    /// The hierarchy rendered as text, one Simon per line, indented by depth.
    #[must_use]
    pub fn tree_string(&self) -> String {
        self.inner.tree.read().render()
    }

    /// Adds a callback. It receives events from now on.
    pub fn add_callback(&self, callback: Arc<dyn Callback>) {
        self.inner.context.callbacks.add(callback);
    }

    /// Removes a callback added earlier. Returns whether it was registered.
    pub fn remove_callback(&self, callback: &Arc<dyn Callback>) -> bool {
        self.inner.context.callbacks.remove(callback)
    }

    /// Publishes an informational message to all callbacks.
    pub fn message(&self, message: &str) {
        self.inner
            .context
            .callbacks
            .dispatch(|callback| callback.on_message(message));
    }

    /// Publishes a warning to all callbacks.
    pub fn warning(&self, message: &str, cause: Option<&(dyn StdError + 'static)>) {
        self.inner
            .context
            .callbacks
            .dispatch(|callback| callback.on_warning(message, cause));
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Decides whether an existing Simon satisfies a request for `kind`.
///
/// `Ok(None)` means the existing Simon is a placeholder that has to be upgraded.
fn reuse(name: &str, existing: &SimonHandle, kind: SimonKind) -> Result<Option<SimonHandle>> {
    let existing_kind = existing.kind();

    if kind == SimonKind::Unknown || existing_kind == kind {
        Ok(Some(existing.clone()))
    } else if existing_kind == SimonKind::Unknown {
        Ok(None)
    } else {
        Err(kind_conflict(name, existing_kind, kind))
    }
}

fn kind_conflict(name: &str, existing: SimonKind, requested: SimonKind) -> Error {
    Error::KindConflict {
        name: name.to_string(),
        existing,
        requested,
    }
}

/// Builder for a [`Registry`] with a custom clock, callbacks or configuration.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use simons::{Configuration, ManualClock, Registry};
///
/// let clock = ManualClock::new();
///
/// let registry = Registry::builder()
///     .clock(Arc::new(clock.clone()))
///     .configuration(Configuration::new())
///     .build();
///
/// assert!(registry.is_empty());
/// ```
#[derive(Debug)]
#[must_use]
pub struct RegistryBuilder {
    clock: Option<Arc<dyn Clock>>,
    callbacks: Vec<Arc<dyn Callback>>,
    configuration: Configuration,
}

impl RegistryBuilder {
    fn new() -> Self {
        Self {
            clock: None,
            callbacks: Vec::new(),
            configuration: Configuration::new(),
        }
    }

    /// Uses `clock` instead of the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Adds a callback. May be called more than once.
    pub fn callback(mut self, callback: Arc<dyn Callback>) -> Self {
        self.callbacks.push(callback);
        self
    }

    /// Applies `configuration` to every Simon the registry constructs.
    pub fn configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = configuration;
        self
    }

    /// Builds the registry.
    #[must_use]
    pub fn build(self) -> Registry {
        Registry::from_builder(self)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use parking_lot::Mutex;
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::{ConfigurationRule, ManualClock};

    assert_impl_all!(Registry: Send, Sync, Clone);
    assert_impl_all!(RegistryBuilder: Send);

    fn names_of(simons: &[SimonHandle]) -> Vec<&str> {
        simons
            .iter()
            .map(|simon| simon.name().unwrap_or_default())
            .collect()
    }

    #[test]
    fn fresh_registry_has_only_root() {
        let registry = Registry::new();

        assert!(registry.is_empty());
        assert_eq!(registry.names(), vec![String::new()]);

        let root = registry.root();
        assert_eq!(root.kind(), SimonKind::Unknown);
        assert_eq!(root.state(), SimonState::Enabled);
        assert!(root.is_enabled());
        assert!(registry.parent(&root).is_none());
    }

    #[test]
    fn empty_name_as_unknown_is_root() {
        let registry = Registry::new();

        let root = registry.get_or_create("", SimonKind::Unknown).unwrap();

        assert!(root.ptr_eq(&registry.root()));
    }

    #[test]
    fn root_rejects_typed_use() {
        let registry = Registry::new();

        assert!(matches!(
            registry.counter(""),
            Err(Error::RootSimonMisuse { .. })
        ));
        assert!(matches!(
            registry.destroy(""),
            Err(Error::RootSimonMisuse { .. })
        ));
    }

    #[test]
    fn invalid_name_is_rejected() {
        let registry = Registry::new();

        assert!(matches!(
            registry.stopwatch("has space"),
            Err(Error::InvalidName { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn same_name_returns_same_node() {
        let registry = Registry::new();

        let first = registry.counter("a.b").unwrap();
        let second = registry.counter("a.b").unwrap();

        assert!(first.ptr_eq(&second));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn unknown_request_returns_concrete_node() {
        let registry = Registry::new();
        let counter = registry.counter("a").unwrap();

        let found = registry.get_or_create("a", SimonKind::Unknown).unwrap();

        assert_eq!(found.kind(), SimonKind::Counter);
        assert!(found.as_counter().is_some_and(|found| found.ptr_eq(&counter)));
    }

    #[test]
    fn upgrade_keeps_id_and_state() {
        let registry = Registry::new();
        let _child = registry.stopwatch("a.b").unwrap();
        let placeholder = registry.get("a").unwrap();
        registry
            .set_state(&placeholder, SimonState::Disabled, false)
            .unwrap();

        let counter = registry.counter("a").unwrap();

        assert_eq!(counter.id(), placeholder.id());
        assert_eq!(counter.state(), SimonState::Disabled);
        assert!(!counter.is_enabled());
        // The placeholder handle is stale now.
        assert!(matches!(
            registry.set_state(&placeholder, SimonState::Enabled, false),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn conflicting_kind_is_rejected() {
        let registry = Registry::new();
        registry.counter("a").unwrap();

        let error = registry.stopwatch("a").unwrap_err();

        assert!(matches!(
            error,
            Error::KindConflict {
                existing: SimonKind::Counter,
                requested: SimonKind::Stopwatch,
                ..
            }
        ));
    }

    #[test]
    fn destroy_leaf_unlinks() {
        let registry = Registry::new();
        registry.counter("a.b").unwrap();

        registry.destroy("a.b").unwrap();

        assert!(registry.get("a.b").is_none());
        assert!(registry.children(&registry.get("a").unwrap()).is_empty());
        assert!(matches!(
            registry.destroy("a.b"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn destroy_with_children_leaves_placeholder() {
        let registry = Registry::new();
        let parent = registry.counter("a").unwrap();
        let child = registry.stopwatch("a.b").unwrap();
        registry
            .set_state(&parent, SimonState::Disabled, false)
            .unwrap();
        assert!(!child.is_enabled());

        registry.destroy("a").unwrap();

        let placeholder = registry.get("a").unwrap();
        assert_eq!(placeholder.kind(), SimonKind::Unknown);
        assert_eq!(placeholder.state(), SimonState::Inherit);
        // The placeholder inherits from the enabled root, and so does the child.
        assert!(child.is_enabled());
        assert!(
            registry
                .parent(&child)
                .is_some_and(|parent| parent.ptr_eq(&placeholder))
        );
    }

    #[test]
    fn set_state_inherit_on_root_is_ignored() {
        let registry = Registry::new();

        registry
            .set_state(registry.root(), SimonState::Inherit, false)
            .unwrap();

        assert_eq!(registry.root().state(), SimonState::Enabled);
    }

    #[test]
    fn anonymous_simons_stay_outside_hierarchy() {
        let registry = Registry::new();
        let counter = registry.anonymous_counter();
        let stopwatch = registry.anonymous_stopwatch();

        assert_eq!(counter.name(), None);
        assert_eq!(stopwatch.state(), SimonState::Enabled);
        assert!(registry.is_empty());

        registry
            .set_state(&counter, SimonState::Inherit, false)
            .unwrap();
        assert_eq!(counter.state(), SimonState::Enabled);

        registry
            .set_state(&counter, SimonState::Disabled, false)
            .unwrap();
        assert!(!counter.is_enabled());
    }

    #[test]
    fn simons_filters_by_pattern() {
        let registry = Registry::new();
        registry.counter("app.db.reads").unwrap();
        registry.counter("app.db.writes").unwrap();
        registry.stopwatch("app.http").unwrap();

        let pattern = SimonPattern::new("app.db.*").unwrap();

        assert_eq!(
            names_of(&registry.simons(Some(&pattern))),
            vec!["app.db.reads", "app.db.writes"]
        );
        assert_eq!(registry.simons(None).len(), 6);
    }

    #[test]
    fn clear_discards_everything() {
        let registry = Registry::new();
        let counter = registry.counter("a.b").unwrap();
        let old_root = registry.root();

        registry.clear();

        assert!(registry.is_empty());
        assert!(registry.get("a.b").is_none());
        assert!(!registry.root().ptr_eq(&old_root));
        assert_ne!(registry.root().id(), old_root.id());
        // Old handles still work on their own.
        counter.increase();
        assert_eq!(counter.value(), 1);
    }

    #[test]
    fn configuration_sets_initial_state_and_stats() {
        let configuration = Configuration::new()
            .rule(
                ConfigurationRule::new(SimonPattern::new("quiet.*").unwrap())
                    .state(SimonState::Disabled),
            )
            .rule(ConfigurationRule::new(SimonPattern::new("*.lean").unwrap()).online_stats(false));
        let registry = Registry::builder().configuration(configuration).build();

        let quiet = registry.counter("quiet.one").unwrap();
        let lean = registry.stopwatch("app.lean").unwrap();
        let normal = registry.stopwatch("app.normal").unwrap();

        assert!(!quiet.is_enabled());
        assert!(!lean.has_online_stats());
        assert!(normal.has_online_stats());
    }

    #[test]
    fn reset_subtree_resets_descendants() {
        let clock = ManualClock::new();
        let registry = Registry::builder().clock(Arc::new(clock.clone())).build();
        let counter = registry.counter("a.b.c").unwrap();
        let sibling = registry.counter("x").unwrap();
        counter.set(5);
        sibling.set(5);

        clock.set_millis(77);
        registry.reset_subtree(&registry.get("a").unwrap()).unwrap();

        assert_eq!(counter.value(), 0);
        assert_eq!(counter.last_reset(), 77);
        assert_eq!(sibling.value(), 5);
    }

    #[test]
    fn tree_string_lists_every_simon() {
        let registry = Registry::new();
        registry.counter("a.b").unwrap();
        registry.stopwatch("a.c").unwrap();

        let rendered = registry.tree_string();

        assert_eq!(rendered.lines().count(), 4);
        assert!(rendered.contains("  Unknown 'a' [INHERIT]"));
        assert!(rendered.contains("    Counter 'a.b' [INHERIT]"));
        assert!(rendered.contains("    Stopwatch 'a.c' [INHERIT]"));
    }

    #[derive(Debug, Default)]
    struct Events {
        created: Mutex<Vec<String>>,
        destroyed: AtomicUsize,
        cleared: AtomicUsize,
        messages: Mutex<Vec<String>>,
    }

    impl Callback for Events {
        fn on_simon_created(&self, simon: &SimonHandle) {
            self.created
                .lock()
                .push(simon.name().unwrap_or_default().to_string());
        }

        fn on_simon_destroyed(&self, _simon: &SimonHandle) {
            self.destroyed.fetch_add(1, Ordering::Relaxed);
        }

        fn on_registry_cleared(&self) {
            self.cleared.fetch_add(1, Ordering::Relaxed);
        }

        fn on_message(&self, message: &str) {
            self.messages.lock().push(message.to_string());
        }
    }

    #[test]
    fn callbacks_see_lifecycle_events() {
        let events = Arc::new(Events::default());
        let registry = Registry::builder().callback(events.clone()).build();

        registry.stopwatch("a.b.c").unwrap();
        registry.stopwatch("a.b.c").unwrap();
        registry.counter("a").unwrap();
        registry.destroy("a.b.c").unwrap();
        registry.message("hello");
        registry.clear();

        // Placeholders created on the way are not announced, upgrades are.
        assert_eq!(*events.created.lock(), vec!["a.b.c", "a"]);
        assert_eq!(events.destroyed.load(Ordering::Relaxed), 1);
        assert_eq!(events.cleared.load(Ordering::Relaxed), 1);
        assert_eq!(*events.messages.lock(), vec!["hello"]);
    }

    #[test]
    fn removed_callback_stops_receiving() {
        let events = Arc::new(Events::default());
        let callback: Arc<dyn Callback> = events.clone();
        let registry = Registry::new();

        registry.add_callback(Arc::clone(&callback));
        registry.message("one");
        assert!(registry.remove_callback(&callback));
        registry.message("two");

        assert_eq!(*events.messages.lock(), vec!["one"]);
    }
}
