//! Measures some simulated work with a stopwatch and a counter, then prints the hierarchy
//! and the per-round deltas seen by an incremental sampler.
//!
//! Run with `RUST_LOG=simons=debug` to also see the registry's own log output.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use simons::{
    Callback, Configuration, ConfigurationRule, Purger, Registry, SimonPattern, SimonState, Split,
    StopwatchSample, present_nanos,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct SlowSplitReporter {
    threshold_nanos: i64,
}

impl Callback for SlowSplitReporter {
    fn on_stopwatch_stop(&self, split: &Split, sample: &StopwatchSample) {
        let nanos = split.running_for();

        if nanos >= self.threshold_nanos {
            info!(
                stopwatch = sample.name().unwrap_or_default(),
                duration = present_nanos(nanos),
                "slow split"
            );
        }
    }
}

fn main() {
    const ROUNDS: usize = 3;
    const ITEMS_PER_ROUND: u64 = 5;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Debug-only Simons stay silent unless someone switches them on.
    let configuration = Configuration::new().rule(
        ConfigurationRule::new(SimonPattern::new("demo.debug.*").unwrap())
            .state(SimonState::Disabled),
    );

    let registry = Registry::builder()
        .configuration(configuration)
        .callback(Arc::new(SlowSplitReporter {
            threshold_nanos: 3_000_000,
        }))
        .build();

    let purger = Purger::new(&registry);
    purger.start(Duration::from_secs(60)).unwrap();

    let processing = registry.stopwatch("demo.work.processing").unwrap();
    let items = registry.counter("demo.work.items").unwrap();
    let traces = registry.counter("demo.debug.traces").unwrap();

    for round in 0..ROUNDS {
        for item in 0..ITEMS_PER_ROUND {
            let split = processing.start();
            thread::sleep(Duration::from_millis(item.saturating_add(1)));
            split.stop();

            items.increase();
            traces.increase();
        }

        let delta = processing.sample_increment("demo");
        println!(
            "round {round}: {} splits, {} total, mean {}",
            delta.counter(),
            present_nanos(delta.total()),
            present_nanos(delta.total().checked_div(delta.counter()).unwrap_or_default())
        );
    }

    println!();
    println!("{}", registry.tree_string());
    println!("{}", processing.sample());
    println!("{}", items.sample());
    println!("debug traces recorded: {}", traces.value());

    purger.cancel().unwrap();
}
