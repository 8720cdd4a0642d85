use std::mem;

use foldhash::{HashMap, HashMapExt};

#[derive(Debug)]
struct Entry<W> {
    window: W,
    last_access_millis: i64,
}

/// Per-client bookkeeping behind `sample_increment()`.
///
/// Every client key owns a window: a private tally that receives the same updates as the
/// Simon itself, starting empty at the key's previous call. Resetting the Simon does not
/// touch the windows. Lives inside the stat data of one Simon and is only touched under
/// that Simon's lock.
#[derive(Debug)]
pub(crate) struct IncrementalSampler<W> {
    entries: HashMap<String, Entry<W>>,
}

impl<W> IncrementalSampler<W> {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Feeds one update to the window of every key.
    pub(crate) fn record(&mut self, mut update: impl FnMut(&mut W)) {
        for entry in self.entries.values_mut() {
            update(&mut entry.window);
        }
    }

    /// Closes the window of `key` and opens `fresh` in its place.
    ///
    /// Returns the closed window, or `None` if `key` was not being sampled. In that case the
    /// caller reports the cumulative state, which becomes the key's baseline.
    pub(crate) fn take_window(&mut self, key: &str, fresh: W, now_millis: i64) -> Option<W> {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_access_millis = now_millis;
            return Some(mem::replace(&mut entry.window, fresh));
        }

        self.entries.insert(
            key.to_string(),
            Entry {
                window: fresh,
                last_access_millis: now_millis,
            },
        );

        None
    }

    /// Forgets `key`. Returns whether the key was being sampled.
    pub(crate) fn stop_sampling(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Forgets every key last accessed strictly before `cutoff_millis`.
    ///
    /// Returns the number of forgotten keys.
    pub(crate) fn purge_older_than(&mut self, cutoff_millis: i64) -> usize {
        let before = self.entries.len();

        self.entries
            .retain(|_, entry| entry.last_access_millis >= cutoff_millis);

        before.saturating_sub(self.entries.len())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
