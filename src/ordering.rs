//!
//! waypoint ordering engine
//! ------------------------
//! Sparse fractional positions for the task board. Each item carries an `f64`
//! rank inside its status column; moving an item computes one new rank from its
//! would-be neighbours and leaves every other stored rank untouched.
//!
//! The computation is pure. Persisting the result, and repairing a column whose
//! gaps have been bisected down to nothing, belongs to the storage layer.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default gap `D` between neighbouring ranks, and the rank given to the first
/// item of an empty column.
pub const DEFAULT_GAP: f64 = 10_000.0;

/// Smallest neighbour gap still considered safe to bisect.
pub const MIN_GAP: f64 = 1e-6;

/// Task board columns. The set is closed; anything else is rejected when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Where an insertion lands relative to the existing ranks of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Column has no other items.
    Empty,
    /// Insert ahead of the current first item.
    BeforeFirst { first: f64 },
    /// Insert after the current last item.
    AfterLast { last: f64 },
    /// Insert between two adjacent items.
    Between { before: f64, after: f64 },
}

impl Placement {
    /// Classify an insertion at `index` into `positions`.
    ///
    /// `positions` must be finite and strictly ascending and must not contain the
    /// item being moved; `index` must be in `0..=positions.len()`. Violations are
    /// caller bugs and panic.
    pub fn resolve(positions: &[f64], index: usize) -> Placement {
        assert!(
            index <= positions.len(),
            "insertion index {} out of range for column of {}",
            index,
            positions.len()
        );
        assert!(positions.iter().all(|p| p.is_finite()), "column positions must be finite");
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "column positions must be strictly ascending"
        );

        if positions.is_empty() {
            Placement::Empty
        } else if index == 0 {
            Placement::BeforeFirst { first: positions[0] }
        } else if index == positions.len() {
            Placement::AfterLast { last: positions[index - 1] }
        } else {
            Placement::Between { before: positions[index - 1], after: positions[index] }
        }
    }

    /// Rank to store for the inserted item.
    pub fn position(&self) -> f64 {
        match *self {
            Placement::Empty => DEFAULT_GAP,
            Placement::BeforeFirst { first } => first / 2.0,
            Placement::AfterLast { last } => last + DEFAULT_GAP,
            Placement::Between { before, after } => (before + after) / 2.0,
        }
    }

    /// True when the computed rank would no longer sort strictly between its
    /// neighbours, or the neighbours are already closer than [`MIN_GAP`].
    pub fn is_degenerate(&self) -> bool {
        let p = self.position();
        match *self {
            Placement::Empty => false,
            Placement::BeforeFirst { first } => first < MIN_GAP || p >= first,
            Placement::AfterLast { last } => p <= last,
            Placement::Between { before, after } => after - before < MIN_GAP || p <= before || p >= after,
        }
    }
}

/// True when `positions` is finite and strictly ascending, the form
/// [`Placement::resolve`] requires.
pub fn is_well_formed(positions: &[f64]) -> bool {
    positions.iter().all(|p| p.is_finite()) && positions.windows(2).all(|w| w[0] < w[1])
}

/// Rank for an item moved to `index` of a column whose other items hold `positions`.
pub fn insertion_position(positions: &[f64], index: usize) -> f64 {
    Placement::resolve(positions, index).position()
}

/// Whether inserting at `index` needs the column renumbered first.
pub fn is_degenerate(positions: &[f64], index: usize) -> bool {
    Placement::resolve(positions, index).is_degenerate()
}

/// Rank for a newly created item appended after the column's current maximum.
pub fn append_position(last: Option<f64>) -> f64 {
    match last {
        Some(last) => Placement::AfterLast { last }.position(),
        None => Placement::Empty.position(),
    }
}

/// Fresh evenly spaced ranks `D, 2D, 3D, ...` for a column of `count` items.
pub fn renumbered(count: usize) -> Vec<f64> {
    (1..=count).map(|i| i as f64 * DEFAULT_GAP).collect()
}
