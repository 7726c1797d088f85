use crate::common::Trajectory;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

/// Best result for one initial deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetResult {
    pub budget: usize,
    pub max_coins: usize,
    /// Cells of one trajectory achieving `max_coins`, agent start first.
    pub trajectory: Trajectory,
    /// Set when the search hit its expansion cap; `max_coins` is then a lower bound.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

/// Maximum coins per initial deadline, for budgets `0..=max_budget`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTable {
    entries: Vec<BudgetResult>,
}

impl ResultTable {
    pub fn new() -> Self {
        ResultTable::default()
    }

    /// Appends the result for the next budget.
    ///
    /// Budgets must arrive in order starting at 0. A result that collects
    /// fewer coins than the previous budget (only possible after a truncated
    /// search) is replaced by the previous trajectory, which stays feasible.
    pub(crate) fn push(&mut self, mut result: BudgetResult) {
        assert_eq!(result.budget, self.entries.len());

        if let Some(previous) = self.entries.last() {
            if previous.max_coins > result.max_coins {
                result.max_coins = previous.max_coins;
                result.trajectory = previous.trajectory.clone();
            }
        }
        self.entries.push(result);
    }

    pub fn get(&self, budget: usize) -> Option<usize> {
        self.entries.get(budget).map(|entry| entry.max_coins)
    }

    pub fn entry(&self, budget: usize) -> Option<&BudgetResult> {
        self.entries.get(budget)
    }

    pub fn entries(&self) -> &[BudgetResult] {
        &self.entries
    }

    /// `(budget, max_coins)` pairs, budget ascending.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        self.entries
            .iter()
            .map(|entry| (entry.budget, entry.max_coins))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.entries.iter().any(|entry| entry.truncated)
    }

    pub fn print(&self, show_paths: bool) {
        info!("Number of budgets: {}", self.entries.len());
        for entry in &self.entries {
            if show_paths {
                let path: Vec<String> = entry.trajectory.iter().map(ToString::to_string).collect();
                info!("  > m{} = {}  via {}", entry.budget, entry.max_coins, path.join(" -> "));
            } else {
                info!("  > m{} = {}", entry.budget, entry.max_coins);
            }
        }
    }

    /// Writes the table as JSON when `path` ends in `.json`, YAML otherwise.
    pub fn write_to_file(&self, path: &str) -> anyhow::Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("cannot create directory for {path}"))?;
            }
        }
        let file = File::create(path).with_context(|| format!("cannot create {path}"))?;
        let mut writer = io::BufWriter::new(file);

        let data = if path.ends_with(".json") {
            serde_json::to_string_pretty(self)?
        } else {
            serde_yaml::to_string(self)?
        };
        writer.write_all(data.as_bytes())?;
        writer.flush()?;

        Ok(())
    }
}
