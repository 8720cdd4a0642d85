use crate::{SimonKind, SimonPattern, SimonState};

/// Per-name defaults applied when a registry constructs a Simon.
///
/// A configuration is an ordered list of [`ConfigurationRule`]s. For every setting, the last
/// matching rule that specifies it wins.
///
/// * The initial state is only applied to freshly created Simons. A placeholder upgraded to
///   a counter or stopwatch keeps the state it already had.
/// * The online statistics switch applies to every stopwatch the registry constructs.
///   Without a matching rule, stopwatches collect online statistics.
///
/// # Example
///
/// ```
/// use simons::{Configuration, ConfigurationRule, Registry, SimonPattern, SimonState};
///
/// let debug_simons = SimonPattern::new("app.debug.*").unwrap();
/// let configuration = Configuration::new()
///     .rule(ConfigurationRule::new(debug_simons).state(SimonState::Disabled));
///
/// let registry = Registry::builder().configuration(configuration).build();
/// let counter = registry.counter("app.debug.cache_misses").unwrap();
///
/// assert_eq!(counter.state(), SimonState::Disabled);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    rules: Vec<ConfigurationRule>,
}

impl Configuration {
    /// Creates a configuration without rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule. Rules added later take precedence over earlier ones.
    #[must_use]
    pub fn rule(mut self, rule: ConfigurationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// The rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[ConfigurationRule] {
        &self.rules
    }

    pub(crate) fn initial_state(&self, name: &str, kind: SimonKind) -> Option<SimonState> {
        self.matching(name, kind).rev().find_map(|rule| rule.state)
    }

    pub(crate) fn online_stats(&self, name: &str) -> bool {
        self.matching(name, SimonKind::Stopwatch)
            .rev()
            .find_map(|rule| rule.online_stats)
            .unwrap_or(true)
    }

    fn matching<'a>(
        &'a self,
        name: &'a str,
        kind: SimonKind,
    ) -> impl DoubleEndedIterator<Item = &'a ConfigurationRule> + 'a {
        self.rules.iter().filter(move |rule| rule.applies_to(name, kind))
    }
}

/// One entry of a [`Configuration`].
#[derive(Clone, Debug)]
pub struct ConfigurationRule {
    pattern: SimonPattern,
    kind: Option<SimonKind>,
    state: Option<SimonState>,
    online_stats: Option<bool>,
}

impl ConfigurationRule {
    /// A rule for all Simons whose name matches `pattern`. It changes nothing until one of
    /// the settings is specified.
    #[must_use]
    pub fn new(pattern: SimonPattern) -> Self {
        Self {
            pattern,
            kind: None,
            state: None,
            online_stats: None,
        }
    }

    /// Restricts the rule to Simons of one kind.
    #[must_use]
    pub fn kind(mut self, kind: SimonKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// The state a newly created Simon starts in.
    #[must_use]
    pub fn state(mut self, state: SimonState) -> Self {
        self.state = Some(state);
        self
    }

    /// Whether matching stopwatches collect online statistics.
    #[must_use]
    pub fn online_stats(mut self, enabled: bool) -> Self {
        self.online_stats = Some(enabled);
        self
    }

    /// The pattern selecting the Simons this rule applies to.
    #[must_use]
    pub fn pattern(&self) -> &SimonPattern {
        &self.pattern
    }

    fn applies_to(&self, name: &str, kind: SimonKind) -> bool {
        self.kind.is_none_or(|only| only == kind) && self.pattern.matches(name)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn pattern(source: &str) -> SimonPattern {
        SimonPattern::new(source).unwrap()
    }

    #[test]
    fn empty_configuration_has_defaults() {
        let configuration = Configuration::new();

        assert_eq!(configuration.initial_state("a", SimonKind::Counter), None);
        assert!(configuration.online_stats("a"));
    }

    #[test]
    fn later_rules_win_per_setting() {
        let configuration = Configuration::new()
            .rule(
                ConfigurationRule::new(pattern("app.*"))
                    .state(SimonState::Disabled)
                    .online_stats(false),
            )
            .rule(ConfigurationRule::new(pattern("app.db.*")).state(SimonState::Enabled));

        assert_eq!(
            configuration.initial_state("app.db.query", SimonKind::Stopwatch),
            Some(SimonState::Enabled)
        );
        assert_eq!(
            configuration.initial_state("app.cache", SimonKind::Stopwatch),
            Some(SimonState::Disabled)
        );
        // The second rule says nothing about online stats, so the first one still applies.
        assert!(!configuration.online_stats("app.db.query"));
        assert!(configuration.online_stats("other"));
    }

    #[test]
    fn kind_filter_limits_rule() {
        let configuration = Configuration::new().rule(
            ConfigurationRule::new(SimonPattern::any())
                .kind(SimonKind::Counter)
                .state(SimonState::Disabled),
        );

        assert_eq!(
            configuration.initial_state("x", SimonKind::Counter),
            Some(SimonState::Disabled)
        );
        assert_eq!(configuration.initial_state("x", SimonKind::Stopwatch), None);
        assert_eq!(configuration.rules().len(), 1);
    }
}
