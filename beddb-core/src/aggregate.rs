//! Groups interval records by gene and computes one bounding interval per group.

use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// How member importances combine into a group's representative importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportanceFold {
    /// The last member folded wins.
    #[default]
    Last,
    Max,
    Sum,
}

impl ImportanceFold {
    pub fn fold(self, acc: f64, next: f64) -> f64 {
        match self {
            Self::Last => next,
            Self::Max => acc.max(next),
            Self::Sum => acc + next,
        }
    }
}

impl FromStr for ImportanceFold {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "last" => Ok(Self::Last),
            "max" => Ok(Self::Max),
            "sum" => Ok(Self::Sum),
            _ => Err(format!("unknown importance fold '{}': expected last, max or sum", s)),
        }
    }
}

impl fmt::Display for ImportanceFold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Last => "last",
            Self::Max => "max",
            Self::Sum => "sum",
        };
        f.write_str(name)
    }
}

/// Folds records into per-group bounding intervals, in order of first appearance.
#[derive(Debug, Default)]
pub struct GeneAggregator {
    fold: ImportanceFold,
    groups: Vec<BoundingInterval>,
    group_index: HashMap<String, usize>,
}

impl GeneAggregator {
    pub fn new(fold: ImportanceFold) -> Self {
        Self {
            fold,
            groups: Vec::new(),
            group_index: HashMap::new(),
        }
    }

    pub fn add(&mut self, id: RecordId, record: &IntervalRecord) {
        match self.group_index.get(&record.group_key) {
            Some(&idx) => {
                let group = &mut self.groups[idx];
                group.min_start = group.min_start.min(record.start_pos);
                group.max_end = group.max_end.max(record.end_pos);
                group.importance = self.fold.fold(group.importance, record.importance);
                group.members.push(id);
            }
            None => {
                self.group_index.insert(record.group_key.clone(), self.groups.len());
                self.groups.push(BoundingInterval {
                    group_key: record.group_key.clone(),
                    min_start: record.start_pos,
                    max_end: record.end_pos,
                    importance: record.importance,
                    members: vec![id],
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn finish(self) -> Vec<BoundingInterval> {
        self.groups
    }

    /// Group `records`; member ids are indices into `records`.
    pub fn aggregate(records: &[IntervalRecord], fold: ImportanceFold) -> Vec<BoundingInterval> {
        let mut aggregator = Self::new(fold);
        for (id, record) in records.iter().enumerate() {
            aggregator.add(id, record);
        }
        aggregator.finish()
    }
}
