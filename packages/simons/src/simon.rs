use std::fmt::{self, Display};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};

use parking_lot::Mutex;

use crate::callback::CompositeCallback;
use crate::{Clock, Counter, Sample, SimonKind, SimonState, Stopwatch, UnknownSample};

/// Stable identity of a Simon within its registry.
///
/// Upgrading a placeholder to a counter or stopwatch keeps the identity, and so does
/// destroying a Simon that still has children (its placeholder takes over the identity).
/// Removing a leaf or clearing the registry retires it. Identities are never reused by the
/// same registry.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw numeric value of the identity.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What every Simon of a registry shares: the time source and the callbacks.
#[derive(Debug)]
pub(crate) struct Context {
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) callbacks: CompositeCallback,
}

/// Identity and enable state of one Simon, common to all kinds.
///
/// The explicit state and the effective enabled flag are only written by the registry while
/// it holds its structural lock. The hot path only reads the enabled flag.
#[derive(Debug)]
pub(crate) struct SimonCommon {
    id: NodeId,
    name: Option<String>,
    state: AtomicU8,
    enabled: AtomicBool,
    note: Mutex<Option<String>>,
    context: Arc<Context>,
}

impl SimonCommon {
    pub(crate) fn new(
        id: NodeId,
        name: Option<String>,
        state: SimonState,
        enabled: bool,
        context: Arc<Context>,
    ) -> Self {
        Self {
            id,
            name,
            state: AtomicU8::new(state.to_u8()),
            enabled: AtomicBool::new(enabled),
            note: Mutex::new(None),
            context,
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn state(&self) -> SimonState {
        SimonState::from_u8(self.state.load(Ordering::Relaxed))
    }

    pub(crate) fn store_state(&self, state: SimonState) {
        self.state.store(state.to_u8(), Ordering::Relaxed);
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn store_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn note(&self) -> Option<String> {
        self.note.lock().clone()
    }

    pub(crate) fn set_note(&self, note: Option<String>) {
        *self.note.lock() = note;
    }

    pub(crate) fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub(crate) fn millis(&self) -> i64 {
        self.context.clock.millis()
    }

    pub(crate) fn callbacks(&self) -> &CompositeCallback {
        &self.context.callbacks
    }
}

/// Accessors every handle type forwards to its [`SimonCommon`].
macro_rules! common_accessors {
    () => {
        /// Identity of this Simon within its registry.
        #[must_use]
        pub fn id(&self) -> $crate::NodeId {
            self.inner.common.id()
        }

        /// Hierarchical name, `None` for an anonymous Simon.
        #[must_use]
        pub fn name(&self) -> Option<&str> {
            self.inner.common.name()
        }

        /// The explicitly configured state.
        #[must_use]
        pub fn state(&self) -> $crate::SimonState {
            self.inner.common.state()
        }

        /// Whether this Simon currently records anything, taking inheritance into account.
        #[must_use]
        pub fn is_enabled(&self) -> bool {
            self.inner.common.is_enabled()
        }

        /// Free-form note attached to this Simon.
        #[must_use]
        pub fn note(&self) -> Option<String> {
            self.inner.common.note()
        }

        /// Attaches a free-form note, replacing any previous one.
        pub fn set_note(&self, note: Option<String>) {
            self.inner.common.set_note(note);
        }
    };
}

pub(crate) use common_accessors;

#[derive(Debug)]
pub(crate) struct UnknownInner {
    common: SimonCommon,
    last_reset: AtomicI64,
}

/// A placeholder occupying a position in the hierarchy that has no kind yet.
///
/// Placeholders are created for every missing ancestor of a requested name. The root of
/// every registry is one. A placeholder records nothing, but its state is inherited by the
/// Simons below it.
#[derive(Clone, Debug)]
pub struct UnknownSimon {
    inner: Arc<UnknownInner>,
}

impl UnknownSimon {
    pub(crate) fn new(common: SimonCommon) -> Self {
        Self {
            inner: Arc::new(UnknownInner {
                common,
                last_reset: AtomicI64::new(0),
            }),
        }
    }

    common_accessors!();

    /// Always `0`, a placeholder is never used.
    #[must_use]
    pub fn first_usage(&self) -> i64 {
        0
    }

    /// Always `0`, a placeholder is never used.
    #[must_use]
    pub fn last_usage(&self) -> i64 {
        0
    }

    /// Wall-clock millis of the most recent reset, `0` if never reset.
    #[must_use]
    pub fn last_reset(&self) -> i64 {
        self.inner.last_reset.load(Ordering::Relaxed)
    }

    /// Records the reset time. A placeholder has no statistics to clear.
    pub fn reset(&self) {
        self.inner
            .last_reset
            .store(self.inner.common.millis(), Ordering::Relaxed);
    }

    /// Snapshot of the common attributes.
    #[must_use]
    pub fn sample(&self) -> UnknownSample {
        UnknownSample {
            name: self.inner.common.name().unwrap_or_default().to_string(),
            note: self.inner.common.note(),
            first_usage: 0,
            last_usage: 0,
            last_reset: self.last_reset(),
        }
    }

    pub(crate) fn common(&self) -> &SimonCommon {
        &self.inner.common
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Display for UnknownSimon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown '{}' [{}]",
            self.inner.common.name().unwrap_or_default(),
            self.inner.common.state()
        )
    }
}

/// A Simon of any kind.
///
/// Returned by lookups that do not fix the kind, such as
/// [`Registry::get()`][crate::Registry::get]. Handles are cheap to clone and all clones refer
/// to the same node. A handle goes stale once its node is upgraded or destroyed; fetch the
/// name again to get the current node.
#[derive(Clone, Debug)]
#[expect(
    clippy::exhaustive_enums,
    reason = "one variant per SimonKind, which is itself exhaustive"
)]
pub enum SimonHandle {
    /// A counter.
    Counter(Counter),

    /// A stopwatch.
    Stopwatch(Stopwatch),

    /// A placeholder.
    Unknown(UnknownSimon),
}

impl SimonHandle {
    /// Constructs a fresh node of the given kind.
    pub(crate) fn new_node(kind: SimonKind, common: SimonCommon, online_stats: bool) -> Self {
        match kind {
            SimonKind::Counter => Self::Counter(Counter::new(common)),
            SimonKind::Stopwatch => Self::Stopwatch(Stopwatch::new(common, online_stats)),
            SimonKind::Unknown => Self::Unknown(UnknownSimon::new(common)),
        }
    }

    pub(crate) fn common(&self) -> &SimonCommon {
        match self {
            Self::Counter(counter) => counter.common(),
            Self::Stopwatch(stopwatch) => stopwatch.common(),
            Self::Unknown(unknown) => unknown.common(),
        }
    }

    /// Whether both handles refer to the very same node, not just the same name.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Counter(a), Self::Counter(b)) => a.ptr_eq(b),
            (Self::Stopwatch(a), Self::Stopwatch(b)) => a.ptr_eq(b),
            (Self::Unknown(a), Self::Unknown(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Kind of the node.
    #[must_use]
    pub fn kind(&self) -> SimonKind {
        match self {
            Self::Counter(_) => SimonKind::Counter,
            Self::Stopwatch(_) => SimonKind::Stopwatch,
            Self::Unknown(_) => SimonKind::Unknown,
        }
    }

    /// Identity of the node within its registry.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.common().id()
    }

    /// Hierarchical name, `None` for an anonymous Simon. The root has the empty name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.common().name()
    }

    /// The explicitly configured state.
    #[must_use]
    pub fn state(&self) -> SimonState {
        self.common().state()
    }

    /// Whether the node currently records anything, taking inheritance into account.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.common().is_enabled()
    }

    /// Free-form note attached to the node.
    #[must_use]
    pub fn note(&self) -> Option<String> {
        self.common().note()
    }

    /// Attaches a free-form note, replacing any previous one.
    pub fn set_note(&self, note: Option<String>) {
        self.common().set_note(note);
    }

    /// Wall-clock millis of the first recorded usage, `0` if never used.
    #[must_use]
    pub fn first_usage(&self) -> i64 {
        match self {
            Self::Counter(counter) => counter.first_usage(),
            Self::Stopwatch(stopwatch) => stopwatch.first_usage(),
            Self::Unknown(unknown) => unknown.first_usage(),
        }
    }

    /// Wall-clock millis of the most recent usage, `0` if never used.
    #[must_use]
    pub fn last_usage(&self) -> i64 {
        match self {
            Self::Counter(counter) => counter.last_usage(),
            Self::Stopwatch(stopwatch) => stopwatch.last_usage(),
            Self::Unknown(unknown) => unknown.last_usage(),
        }
    }

    /// Wall-clock millis of the most recent reset, `0` if never reset.
    #[must_use]
    pub fn last_reset(&self) -> i64 {
        match self {
            Self::Counter(counter) => counter.last_reset(),
            Self::Stopwatch(stopwatch) => stopwatch.last_reset(),
            Self::Unknown(unknown) => unknown.last_reset(),
        }
    }

    /// Consistent snapshot of the node's statistics.
    #[must_use]
    pub fn sample(&self) -> Sample {
        match self {
            Self::Counter(counter) => Sample::Counter(counter.sample()),
            Self::Stopwatch(stopwatch) => Sample::Stopwatch(stopwatch.sample()),
            Self::Unknown(unknown) => Sample::Unknown(unknown.sample()),
        }
    }

    /// Clears the node's statistics.
    pub fn reset(&self) {
        match self {
            Self::Counter(counter) => counter.reset(),
            Self::Stopwatch(stopwatch) => stopwatch.reset(),
            Self::Unknown(unknown) => unknown.reset(),
        }
    }

    /// The counter, if the node is one.
    #[must_use]
    pub fn as_counter(&self) -> Option<&Counter> {
        match self {
            Self::Counter(counter) => Some(counter),
            _ => None,
        }
    }

    /// The stopwatch, if the node is one.
    #[must_use]
    pub fn as_stopwatch(&self) -> Option<&Stopwatch> {
        match self {
            Self::Stopwatch(stopwatch) => Some(stopwatch),
            _ => None,
        }
    }

    /// Evicts incremental sampling keys last used before `cutoff_millis`.
    pub(crate) fn purge_incremental_older_than(&self, cutoff_millis: i64) -> usize {
        match self {
            Self::Counter(counter) => counter.purge_incremental_older_than(cutoff_millis),
            Self::Stopwatch(stopwatch) => stopwatch.purge_incremental_older_than(cutoff_millis),
            Self::Unknown(_) => 0,
        }
    }
}

impl From<Counter> for SimonHandle {
    fn from(counter: Counter) -> Self {
        Self::Counter(counter)
    }
}

impl From<&Counter> for SimonHandle {
    fn from(counter: &Counter) -> Self {
        Self::Counter(counter.clone())
    }
}

impl From<Stopwatch> for SimonHandle {
    fn from(stopwatch: Stopwatch) -> Self {
        Self::Stopwatch(stopwatch)
    }
}

impl From<&Stopwatch> for SimonHandle {
    fn from(stopwatch: &Stopwatch) -> Self {
        Self::Stopwatch(stopwatch.clone())
    }
}

impl From<UnknownSimon> for SimonHandle {
    fn from(unknown: UnknownSimon) -> Self {
        Self::Unknown(unknown)
    }
}

impl From<&SimonHandle> for SimonHandle {
    fn from(handle: &SimonHandle) -> Self {
        handle.clone()
    }
}

impl Display for SimonHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter(counter) => counter.fmt(f),
            Self::Stopwatch(stopwatch) => stopwatch.fmt(f),
            Self::Unknown(unknown) => unknown.fmt(f),
        }
    }
}
