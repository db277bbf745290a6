//! Tree shape parsing and per-level router layout.
//!
//! A shape is written as `f0xf1x...xfk`. `f0` is the number of hosts under
//! each leaf router and every following entry is the number of children a
//! router at that level serves. The last level must collapse to a single
//! root router.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use super::error::TopologyError;

/// Match: "2x4", "4", "8x2x2"
static SHAPE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(x\d+)*$").expect("Invalid shape regex"));

/// Per-level fan-out of a tree interconnect
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    fanouts: Vec<usize>,
}

impl Shape {
    /// Create a shape from explicit fan-outs, rejecting empty or zero entries
    pub fn new(fanouts: Vec<usize>) -> Result<Self, TopologyError> {
        if fanouts.is_empty() {
            return Err(TopologyError::config("shape must have at least one level"));
        }
        if let Some(level) = fanouts.iter().position(|&f| f == 0) {
            return Err(TopologyError::config(format!(
                "fan-out at level {} must be positive",
                level
            )));
        }
        Ok(Self { fanouts })
    }

    pub fn fanouts(&self) -> &[usize] {
        &self.fanouts
    }

    pub fn num_levels(&self) -> usize {
        self.fanouts.len()
    }

    /// Fan-out of routers at `level`
    pub fn fanout(&self, level: usize) -> Option<usize> {
        self.fanouts.get(level).copied()
    }

    /// Hosts attached to each leaf router
    pub fn hosts_per_leaf(&self) -> usize {
        self.fanouts[0]
    }

    /// Number of children under the root router
    pub fn root_fanout(&self) -> usize {
        self.fanouts[self.fanouts.len() - 1]
    }

    /// Compute how many routers each level holds for `total_hosts` hosts.
    ///
    /// Every level must divide evenly and the top level must hold exactly one
    /// router, otherwise the tree cannot be balanced.
    pub fn layout(&self, total_hosts: usize) -> Result<LevelLayout, TopologyError> {
        if total_hosts == 0 {
            return Err(TopologyError::config("total_hosts must be positive"));
        }

        let mut counts = Vec::with_capacity(self.fanouts.len());
        let mut below = total_hosts;
        for (level, &fanout) in self.fanouts.iter().enumerate() {
            if below % fanout != 0 {
                return Err(TopologyError::config(format!(
                    "{} {} at level {} cannot be divided evenly by fan-out {}",
                    below,
                    if level == 0 { "hosts" } else { "routers" },
                    level,
                    fanout
                )));
            }
            below /= fanout;
            counts.push(below);
        }

        if below != 1 {
            return Err(TopologyError::config(format!(
                "shape {} with {} hosts leaves {} routers at the top level, expected a single root",
                self, total_hosts, below
            )));
        }

        Ok(LevelLayout::from_counts(counts))
    }
}

impl FromStr for Shape {
    type Err = TopologyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if !SHAPE_PATTERN.is_match(value) {
            return Err(TopologyError::config(format!(
                "invalid shape '{}', expected 'x'-delimited positive integers such as 2x4",
                value
            )));
        }

        let fanouts = value
            .split('x')
            .map(|part| {
                part.parse::<usize>().map_err(|e| {
                    TopologyError::config(format!("invalid fan-out '{}' in shape: {}", part, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(fanouts)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.fanouts.iter().map(|f| f.to_string()).collect();
        write!(f, "{}", parts.join("x"))
    }
}

/// Router counts and id offsets for each level of a balanced tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelLayout {
    counts: Vec<usize>,
    offsets: Vec<usize>,
}

impl LevelLayout {
    fn from_counts(counts: Vec<usize>) -> Self {
        let mut offsets = Vec::with_capacity(counts.len());
        let mut next = 0;
        for &count in &counts {
            offsets.push(next);
            next += count;
        }
        Self { counts, offsets }
    }

    /// Routers held by each level, leaf level first
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// First router id of `level`
    pub fn offset(&self, level: usize) -> usize {
        self.offsets[level]
    }

    pub fn num_levels(&self) -> usize {
        self.counts.len()
    }

    pub fn total_routers(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn root_id(&self) -> usize {
        self.total_routers() - 1
    }

    /// Level of router `id`, found by walking the cumulative level counts
    pub fn level_of(&self, id: usize) -> Option<usize> {
        let mut cumulated = 0;
        for (level, &count) in self.counts.iter().enumerate() {
            cumulated += count;
            if id < cumulated {
                return Some(level);
            }
        }
        None
    }
}
