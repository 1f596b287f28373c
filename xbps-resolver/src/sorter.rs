//! Topologically sorts a built [`Transaction`] into an executable plan order.

use std::collections::HashMap;

use xbps_types::Name;

use crate::{Error, Transaction, types::TransactionEntry};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Sorts a transaction's unsorted entries into plan order.
#[derive(Debug, Default)]
pub struct TransactionSorter;

impl TransactionSorter {
    /// Creates a sorter.
    pub fn new() -> Self {
        Self
    }

    /// Produces a linear extension of the depends-on partial order restricted to `txn`'s entries.
    ///
    /// Depth-first with cycle detection; entries are visited in name order (the iteration order of
    /// `unsorted_deps`, a `BTreeMap`), which fixes the tie-break for entries with no relative
    /// ordering requirement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DependencyCycle`] if the depends-on relation restricted to the plan
    /// contains a cycle.
    pub fn sort(&self, txn: &Transaction) -> Result<Vec<TransactionEntry>, Error> {
        let mut marks: HashMap<Name, Mark> = HashMap::new();
        let mut stack: Vec<Name> = Vec::new();
        let mut out: Vec<TransactionEntry> = Vec::new();

        for name in txn.unsorted_deps.keys() {
            self.visit(txn, name, &mut marks, &mut stack, &mut out)?;
        }
        Ok(out)
    }

    fn visit(
        &self,
        txn: &Transaction,
        name: &Name,
        marks: &mut HashMap<Name, Mark>,
        stack: &mut Vec<Name>,
        out: &mut Vec<TransactionEntry>,
    ) -> Result<(), Error> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = stack.iter().position(|n| n == name).unwrap_or(0);
                let mut cycle = stack[start..].to_vec();
                cycle.push(name.clone());
                return Err(Error::DependencyCycle { cycle });
            }
            None => {}
        }

        let Some(entry) = txn.unsorted_deps.get(name) else {
            // Dependency resolves to something outside the plan (already installed); nothing to
            // order relative to.
            return Ok(());
        };

        marks.insert(name.clone(), Mark::InProgress);
        stack.push(name.clone());

        for pattern in &entry.record.run_depends {
            let dep_name = self.resolve_plan_dependency(txn, pattern);
            if let Some(dep_name) = dep_name {
                self.visit(txn, &dep_name, marks, stack, out)?;
            }
        }

        stack.pop();
        marks.insert(name.clone(), Mark::Done);
        out.push(entry.clone());
        Ok(())
    }

    /// Finds the plan entry (if any) that satisfies `pattern`, by real name or virtual provision.
    fn resolve_plan_dependency(&self, txn: &Transaction, pattern: &xbps_types::DependencyPattern) -> Option<Name> {
        if let Some(entry) = txn.unsorted_deps.get(pattern.name())
            && pattern.matches(&entry.record.version)
        {
            return Some(entry.name().clone());
        }
        txn.unsorted_deps
            .values()
            .find(|entry| entry.record.provides_pattern(pattern))
            .map(|entry| entry.name().clone())
    }
}
