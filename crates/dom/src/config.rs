//! Per-context bridge configuration.
//!
//! Sizes the command and tree-changed channels, bounds how many timers a
//! single tick may fire, and toggles leak reporting at teardown. Values can be
//! loaded from environment variables or constructed programmatically.

use std::env;

/// Runtime configuration for one script context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Capacity of the inbound command channel, in batches
    pub command_queue_capacity: usize,
    /// Capacity of the tree-changed broadcast channel, in batches
    pub update_channel_capacity: usize,
    /// Maximum number of timer callbacks fired per tick
    pub timer_budget_per_tick: usize,
    /// Whether teardown logs nodes that were never disposed
    pub report_leaks: bool,
}

impl BridgeConfig {
    /// Default inbound command queue capacity.
    pub const DEFAULT_COMMAND_QUEUE: usize = 1024;
    /// Default tree-changed channel capacity.
    pub const DEFAULT_UPDATE_CAPACITY: usize = 256;
    /// Default timer budget per tick.
    pub const DEFAULT_TIMER_BUDGET: usize = 64;

    /// Construct a new `BridgeConfig` with explicit values.
    ///
    /// # Arguments
    ///
    /// * `command_queue_capacity` - Inbound command batches buffered (minimum 1)
    /// * `update_channel_capacity` - Tree-changed batches buffered per subscriber (minimum 1)
    /// * `timer_budget_per_tick` - Timers fired per tick (minimum 1)
    /// * `report_leaks` - Whether teardown warns about undisposed nodes
    #[inline]
    #[must_use]
    pub fn new(
        command_queue_capacity: usize,
        update_channel_capacity: usize,
        timer_budget_per_tick: usize,
        report_leaks: bool,
    ) -> Self {
        Self {
            command_queue_capacity: command_queue_capacity.max(1),
            update_channel_capacity: update_channel_capacity.max(1),
            timer_budget_per_tick: timer_budget_per_tick.max(1),
            report_leaks,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `DOM_BRIDGE_COMMAND_QUEUE`: inbound command capacity (default: 1024)
    /// - `DOM_BRIDGE_UPDATE_CAPACITY`: tree-changed channel capacity (default: 256)
    /// - `DOM_BRIDGE_TIMER_BUDGET`: timers fired per tick (default: 64)
    /// - `DOM_BRIDGE_REPORT_LEAKS`: set to "0" to silence leak reports (default: enabled)
    #[inline]
    #[must_use]
    pub fn from_env() -> Self {
        let report_leaks = env::var("DOM_BRIDGE_REPORT_LEAKS").ok().as_deref() != Some("0");
        Self::new(
            read_usize("DOM_BRIDGE_COMMAND_QUEUE", Self::DEFAULT_COMMAND_QUEUE),
            read_usize("DOM_BRIDGE_UPDATE_CAPACITY", Self::DEFAULT_UPDATE_CAPACITY),
            read_usize("DOM_BRIDGE_TIMER_BUDGET", Self::DEFAULT_TIMER_BUDGET),
            report_leaks,
        )
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_COMMAND_QUEUE,
            Self::DEFAULT_UPDATE_CAPACITY,
            Self::DEFAULT_TIMER_BUDGET,
            true,
        )
    }
}

fn read_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacities_are_clamped() {
        let config = BridgeConfig::new(0, 0, 0, false);
        assert_eq!(config.command_queue_capacity, 1);
        assert_eq!(config.update_channel_capacity, 1);
        assert_eq!(config.timer_budget_per_tick, 1);
    }

    #[test]
    fn defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.command_queue_capacity, 1024);
        assert_eq!(config.update_channel_capacity, 256);
        assert_eq!(config.timer_budget_per_tick, 64);
        assert!(config.report_leaks);
    }
}
