//! Node configuration.

use apiary_storage::RedundancyLevel;

/// How the node participates in the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[derive(strum::IntoStaticStr)]
#[derive(strum::EnumString)]
#[derive(strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NodeMode {
    /// Full node with a capacity issuer.
    Full,
    /// Development node. Only deferred uploads are accepted.
    Dev,
}

impl Default for NodeMode {
    #[inline]
    fn default() -> Self {
        Self::Full
    }
}

/// Default number of blocks a batch must be confirmed for before use.
pub const DEFAULT_CONFIRMATIONS: u64 = 5;

/// Settings a [`Node`](crate::Node) is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NodeConfig {
    mode: NodeMode,
    confirmations: u64,
    pin: bool,
    redundancy: RedundancyLevel,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            mode: NodeMode::default(),
            confirmations: DEFAULT_CONFIRMATIONS,
            pin: false,
            redundancy: RedundancyLevel::default(),
        }
    }
}

impl NodeConfig {
    /// Set the node mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: NodeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the confirmation threshold for batches.
    #[must_use]
    pub const fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// Make uploads deferred and pin the roots they finalize.
    #[must_use]
    pub const fn with_pin(mut self, pin: bool) -> Self {
        self.pin = pin;
        self
    }

    /// Redundancy used when an upload does not ask for one.
    #[must_use]
    pub const fn with_redundancy(mut self, redundancy: RedundancyLevel) -> Self {
        self.redundancy = redundancy;
        self
    }

    /// Returns the node mode.
    #[inline]
    pub const fn mode(&self) -> NodeMode {
        self.mode
    }

    /// Returns the confirmation threshold.
    #[inline]
    pub const fn confirmations(&self) -> u64 {
        self.confirmations
    }

    /// Returns whether uploads are pinned.
    #[inline]
    pub const fn pin(&self) -> bool {
        self.pin
    }

    /// Returns the default redundancy level.
    #[inline]
    pub const fn redundancy(&self) -> RedundancyLevel {
        self.redundancy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let config = NodeConfig::default()
            .with_mode(NodeMode::Dev)
            .with_confirmations(0)
            .with_pin(true)
            .with_redundancy(RedundancyLevel::Strong);
        assert_eq!(config.mode(), NodeMode::Dev);
        assert_eq!(config.confirmations(), 0);
        assert!(config.pin());
        assert_eq!(config.redundancy(), RedundancyLevel::Strong);
    }

    #[test]
    fn mode_names() {
        assert_eq!(NodeMode::Dev.to_string(), "dev");
        assert_eq!("full".parse::<NodeMode>().unwrap(), NodeMode::Full);
    }
}
