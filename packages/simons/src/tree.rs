use std::fmt::Write as _;
use std::mem;

use foldhash::{HashMap, HashMapExt};

use crate::{NodeId, SimonHandle, SimonState};

#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) simon: SimonHandle,
}

/// Arena holding the hierarchy of one registry.
///
/// Nodes refer to each other by [`NodeId`] only. The arena is always guarded by the
/// registry's structural lock, which is what makes multi-node changes atomic.
#[derive(Debug)]
pub(crate) struct Tree {
    slots: HashMap<NodeId, Slot>,
    by_name: HashMap<String, NodeId>,
    root: NodeId,
}

impl Tree {
    pub(crate) fn new(root: SimonHandle) -> Self {
        let root_id = root.id();
        let mut slots = HashMap::new();
        let mut by_name = HashMap::new();

        by_name.insert(root.name().unwrap_or_default().to_string(), root_id);
        slots.insert(
            root_id,
            Slot {
                parent: None,
                children: Vec::new(),
                simon: root,
            },
        );

        Self {
            slots,
            by_name,
            root: root_id,
        }
    }

    pub(crate) fn root_id(&self) -> NodeId {
        self.root
    }

    pub(crate) fn id_of(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn slot(&self, id: NodeId) -> Option<&Slot> {
        self.slots.get(&id)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&SimonHandle> {
        self.id_of(name)
            .and_then(|id| self.slot(id))
            .map(|slot| &slot.simon)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// The slot of `simon`, unless the handle is stale or belongs elsewhere.
    pub(crate) fn slot_of(&self, simon: &SimonHandle) -> Option<&Slot> {
        self.slot(simon.id())
            .filter(|slot| slot.simon.ptr_eq(simon))
    }

    pub(crate) fn handles(&self) -> impl Iterator<Item = &SimonHandle> {
        self.slots.values().map(|slot| &slot.simon)
    }

    /// Links a new node as the last child of `parent`.
    pub(crate) fn insert(&mut self, parent: NodeId, simon: SimonHandle) {
        let id = simon.id();

        if let Some(parent_slot) = self.slots.get_mut(&parent) {
            parent_slot.children.push(id);
        }

        self.by_name
            .insert(simon.name().unwrap_or_default().to_string(), id);
        self.slots.insert(
            id,
            Slot {
                parent: Some(parent),
                children: Vec::new(),
                simon,
            },
        );
    }

    /// Swaps the node at `id` for another one, keeping all links. Returns the previous node.
    pub(crate) fn replace(&mut self, id: NodeId, simon: SimonHandle) -> Option<SimonHandle> {
        self.slots
            .get_mut(&id)
            .map(|slot| mem::replace(&mut slot.simon, simon))
    }

    /// Unlinks a childless node. Returns the removed node.
    pub(crate) fn remove_leaf(&mut self, id: NodeId) -> Option<SimonHandle> {
        let slot = self.slots.remove(&id)?;

        if let Some(parent) = slot.parent.and_then(|parent| self.slots.get_mut(&parent)) {
            parent.children.retain(|child| *child != id);
        }

        if let Some(name) = slot.simon.name() {
            self.by_name.remove(name);
        }

        Some(slot.simon)
    }

    /// Effective enabled flag of the parent of `id`. The root counts as its own parent.
    pub(crate) fn parent_enabled(&self, id: NodeId) -> bool {
        self.slot(id)
            .and_then(|slot| slot.parent)
            .and_then(|parent| self.slot(parent))
            .is_none_or(|parent| parent.simon.is_enabled())
    }

    /// Pushes the effective enabled flag of `id` down into its subtree.
    ///
    /// Descends only through children in the `Inherit` state. With `overrule`, every
    /// descendant is forced to `Inherit` first, so the whole subtree follows.
    pub(crate) fn propagate(&self, id: NodeId, overrule: bool) {
        let Some(slot) = self.slot(id) else {
            return;
        };

        let enabled = slot.simon.is_enabled();
        let mut pending: Vec<NodeId> = slot.children.clone();

        while let Some(child_id) = pending.pop() {
            let Some(child) = self.slot(child_id) else {
                continue;
            };

            let common = child.simon.common();

            if overrule {
                common.store_state(SimonState::Inherit);
            }

            if common.state() == SimonState::Inherit {
                common.store_enabled(enabled);
                pending.extend_from_slice(&child.children);
            }
        }
    }

    /// Every node in the subtree rooted at `id`, parents before children.
    pub(crate) fn subtree(&self, id: NodeId) -> Vec<SimonHandle> {
        let mut result = Vec::new();
        let mut pending = vec![id];

        while let Some(next) = pending.pop() {
            if let Some(slot) = self.slot(next) {
                result.push(slot.simon.clone());
                pending.extend(slot.children.iter().rev());
            }
        }

        result
    }

    /// One line per node, indented by depth, in child insertion order.
    pub(crate) fn render(&self) -> String {
        let mut output = String::new();
        let mut pending = vec![(self.root, 0_usize)];

        while let Some((id, depth)) = pending.pop() {
            let Some(slot) = self.slot(id) else {
                continue;
            };

            writeln!(
                output,
                "{:indent$}{}",
                "",
                slot.simon,
                indent = depth.saturating_mul(2)
            )
            .expect("we expect writing to a String to be infallible");

            pending.extend(
                slot.children
                    .iter()
                    .rev()
                    .map(|child| (*child, depth.saturating_add(1))),
            );
        }

        output
    }
}
