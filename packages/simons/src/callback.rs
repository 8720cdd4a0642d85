use std::any::Any;
use std::error::Error as StdError;
use std::fmt::{self, Debug};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{error, warn};

use crate::{Counter, CounterSample, SimonHandle, Split, Stopwatch, StopwatchSample};

/// Hooks through which a [`Registry`][crate::Registry] reports what happens to its Simons.
///
/// Every method has an empty default, so implementations only override what they care about.
/// Callbacks run synchronously on the thread that caused the event, after the affected
/// Simon's lock has been released. Samples passed in were taken while the lock was held and
/// reflect the state right after the event.
///
/// A panicking callback does not disturb the engine: the panic is caught, logged and
/// reported to the other callbacks through [`on_warning()`][Callback::on_warning].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// use simons::{Callback, Counter, CounterSample, Registry};
///
/// #[derive(Debug, Default)]
/// struct Increases(AtomicUsize);
///
/// impl Callback for Increases {
///     fn on_counter_increase(&self, _counter: &Counter, _delta: i64, _sample: &CounterSample) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
///
/// let increases = Arc::new(Increases::default());
/// let registry = Registry::builder().callback(increases.clone()).build();
///
/// registry.counter("requests").unwrap().increase();
///
/// assert_eq!(increases.0.load(Ordering::Relaxed), 1);
/// ```
pub trait Callback: Debug + Send + Sync + 'static {
    /// A Simon was created or upgraded to a concrete kind.
    fn on_simon_created(&self, _simon: &SimonHandle) {}

    /// A Simon was destroyed. The handle is the node as it was before destruction.
    fn on_simon_destroyed(&self, _simon: &SimonHandle) {}

    /// The registry was cleared.
    fn on_registry_cleared(&self) {}

    /// A split was started on an enabled stopwatch.
    fn on_stopwatch_start(&self, _split: &Split) {}

    /// A split was stopped and folded into its stopwatch.
    fn on_stopwatch_stop(&self, _split: &Split, _sample: &StopwatchSample) {}

    /// A split duration was added to a stopwatch directly.
    fn on_stopwatch_add(
        &self,
        _stopwatch: &Stopwatch,
        _split_nanos: i64,
        _sample: &StopwatchSample,
    ) {
    }

    /// A counter was set to a value.
    fn on_counter_set(&self, _counter: &Counter, _value: i64, _sample: &CounterSample) {}

    /// A counter was increased by `delta`.
    fn on_counter_increase(&self, _counter: &Counter, _delta: i64, _sample: &CounterSample) {}

    /// A counter was decreased by `delta`.
    fn on_counter_decrease(&self, _counter: &Counter, _delta: i64, _sample: &CounterSample) {}

    /// An informational message was published through the registry.
    fn on_message(&self, _message: &str) {}

    /// A warning was published through the registry or raised by the engine itself.
    fn on_warning(&self, _message: &str, _cause: Option<&(dyn StdError + 'static)>) {}
}

/// The callbacks of one registry.
///
/// Readers load an `ArcSwap` snapshot, so the hot path can check for the presence of
/// callbacks without locking.
pub(crate) struct CompositeCallback {
    callbacks: ArcSwap<Vec<Arc<dyn Callback>>>,
}

impl CompositeCallback {
    pub(crate) fn new(callbacks: Vec<Arc<dyn Callback>>) -> Self {
        Self {
            callbacks: ArcSwap::from_pointee(callbacks),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.callbacks.load().is_empty()
    }

    pub(crate) fn add(&self, callback: Arc<dyn Callback>) {
        self.callbacks.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&callback));
            next
        });
    }

    /// Removes a callback previously added. Returns whether it was found.
    pub(crate) fn remove(&self, callback: &Arc<dyn Callback>) -> bool {
        let previous = self.callbacks.rcu(|current| {
            current
                .iter()
                .filter(|existing| !Arc::ptr_eq(*existing, callback))
                .cloned()
                .collect::<Vec<_>>()
        });

        previous.iter().any(|existing| Arc::ptr_eq(existing, callback))
    }

    /// Invokes `event` on every callback, containing any panic it raises.
    pub(crate) fn dispatch(&self, event: impl Fn(&dyn Callback)) {
        let callbacks = self.callbacks.load_full();

        for (index, callback) in callbacks.iter().enumerate() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| event(callback.as_ref())))
            {
                let message = format!("callback panicked: {}", panic_message(payload.as_ref()));
                warn!(callback = ?callback, panic = message.as_str(), "callback panicked");

                Self::warn_others(&callbacks, index, &message);
            }
        }
    }

    fn warn_others(callbacks: &[Arc<dyn Callback>], culprit: usize, message: &str) {
        for (index, callback) in callbacks.iter().enumerate() {
            if index == culprit {
                continue;
            }

            if let Err(payload) =
                panic::catch_unwind(AssertUnwindSafe(|| callback.on_warning(message, None)))
            {
                error!(
                    callback = ?callback,
                    panic = panic_message(payload.as_ref()),
                    "callback panicked while handling a warning about another callback"
                );
            }
        }
    }
}

impl Debug for CompositeCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeCallback")
            .field("callbacks", &self.callbacks.load().len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
