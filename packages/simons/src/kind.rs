use std::fmt::{self, Display};

/// The concrete kind of a Simon.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "the hierarchy only knows these three kinds"
)]
pub enum SimonKind {
    /// Tracks a signed value together with its increments, decrements and extremes.
    Counter,

    /// Accumulates elapsed-time splits together with concurrency statistics.
    Stopwatch,

    /// Placeholder for a hierarchy position that has not been typed yet.
    ///
    /// Created automatically for every missing ancestor of a requested name. The root
    /// Simon is always of this kind.
    Unknown,
}

impl Display for SimonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Counter => "Counter",
            Self::Stopwatch => "Stopwatch",
            Self::Unknown => "Unknown",
        };

        f.write_str(label)
    }
}

/// The explicitly configured enable state of a Simon.
///
/// The effective state that decides whether a Simon records anything is derived from this:
/// a Simon is effectively enabled if its state is [`Enabled`][SimonState::Enabled], or if
/// its state is [`Inherit`][SimonState::Inherit] and its parent is effectively enabled.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "tri-state by definition, more states would change the inheritance model"
)]
pub enum SimonState {
    /// Always records, regardless of ancestors.
    Enabled,

    /// Never records, regardless of ancestors.
    Disabled,

    /// Follows the effective state of the parent.
    ///
    /// The root Simon and anonymous Simons can never hold this state.
    #[default]
    Inherit,
}

impl SimonState {
    pub(crate) const fn to_u8(self) -> u8 {
        match self {
            Self::Enabled => 0,
            Self::Disabled => 1,
            Self::Inherit => 2,
        }
    }

    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Enabled,
            1 => Self::Disabled,
            _ => Self::Inherit,
        }
    }

    /// Resolves the effective enabled flag for a Simon in this state with the given parent.
    #[must_use]
    pub(crate) const fn resolve(self, parent_enabled: bool) -> bool {
        match self {
            Self::Enabled => true,
            Self::Disabled => false,
            Self::Inherit => parent_enabled,
        }
    }
}

impl Display for SimonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Enabled => "ENABLED",
            Self::Disabled => "DISABLED",
            Self::Inherit => "INHERIT",
        };

        f.write_str(label)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn state_survives_u8_encoding() {
        for state in [SimonState::Enabled, SimonState::Disabled, SimonState::Inherit] {
            assert_eq!(SimonState::from_u8(state.to_u8()), state);
        }
    }

    #[test]
    fn resolve_follows_parent_only_for_inherit() {
        assert!(SimonState::Enabled.resolve(false));
        assert!(!SimonState::Disabled.resolve(true));
        assert!(SimonState::Inherit.resolve(true));
        assert!(!SimonState::Inherit.resolve(false));
    }

    #[test]
    fn default_state_is_inherit() {
        assert_eq!(SimonState::default(), SimonState::Inherit);
    }
}
