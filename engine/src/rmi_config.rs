//! RMI Shape Configuration
//!
//! Tree shape parameters with layered loading. Priority order (highest to lowest):
//! 1. Environment variables (RMI__* prefix)
//! 2. Config file (YAML/TOML/JSON, detected by extension)
//! 3. Built-in defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

/// Default branching factor of every internal layer
pub const DEFAULT_WIDTH: usize = 10;

/// Default number of layers (root + leaves)
pub const DEFAULT_DEPTH: usize = 2;

/// Default ceiling on the total number of node slots a tree may allocate
pub const DEFAULT_MAX_NODES: usize = 1 << 20;

/// RMI shape configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RmiConfig {
    /// Number of children per internal node
    pub width: usize,
    /// Number of layers; layer `depth - 1` holds the leaf models
    pub depth: usize,
    /// Upper bound on `sum(width^i for i in 0..depth)`
    pub max_nodes: usize,
}

impl Default for RmiConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            depth: DEFAULT_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

impl RmiConfig {
    pub fn new(width: usize, depth: usize) -> Self {
        Self {
            width,
            depth,
            ..Self::default()
        }
    }

    /// Load configuration with priority chain:
    /// 1. Environment variables (RMI__WIDTH, RMI__DEPTH, RMI__MAX_NODES)
    /// 2. Config file (if provided)
    /// 3. Built-in defaults
    pub fn load(config_file: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        let defaults_json =
            serde_json::to_string(&Self::default()).context("Failed to serialize defaults")?;
        builder = builder.add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        if let Some(path) = config_file {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("RMI")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build().context("Failed to build config")?;
        let config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize config")?;

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from the same `RMI__*` variables `load` reads,
    /// keeping defaults for anything missing, zero or unparsable
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(width) = parse_env("RMI__WIDTH") {
            if width >= 1 {
                config.width = width;
            } else {
                warn!(width, "RMI__WIDTH must be >= 1, keeping {}", config.width);
            }
        }

        if let Some(depth) = parse_env("RMI__DEPTH") {
            if depth >= 1 {
                config.depth = depth;
            } else {
                warn!(depth, "RMI__DEPTH must be >= 1, keeping {}", config.depth);
            }
        }

        if let Some(max_nodes) = parse_env("RMI__MAX_NODES") {
            config.max_nodes = max_nodes.max(1);
        }

        config
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.width >= 1, "width must be >= 1, got {}", self.width);
        anyhow::ensure!(self.depth >= 1, "depth must be >= 1, got {}", self.depth);
        anyhow::ensure!(
            self.max_nodes >= 1,
            "max_nodes must be >= 1, got {}",
            self.max_nodes
        );

        let slots = total_slots(self.width, self.depth);
        anyhow::ensure!(
            matches!(slots, Some(n) if n <= self.max_nodes),
            "tree of width {} and depth {} needs more than max_nodes={} slots",
            self.width,
            self.depth,
            self.max_nodes
        );
        Ok(())
    }

    /// Total node slots for this shape, `None` on overflow
    pub fn total_slots(&self) -> Option<usize> {
        total_slots(self.width, self.depth)
    }
}

/// `sum(width^i for i in 0..depth)`, or `None` if it does not fit in `usize`.
pub(crate) fn total_slots(width: usize, depth: usize) -> Option<usize> {
    let mut layer = 1usize;
    let mut total = 0usize;
    for i in 0..depth {
        if i > 0 {
            layer = layer.checked_mul(width)?;
        }
        total = total.checked_add(layer)?;
    }
    Some(total)
}

fn parse_env(name: &str) -> Option<usize> {
    let value = env::var(name).ok()?;
    match value.trim().parse::<usize>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(
                variable = name,
                value = value.as_str(),
                "could not parse as an integer, using default"
            );
            None
        }
    }
}
