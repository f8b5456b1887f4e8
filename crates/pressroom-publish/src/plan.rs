//! Change plans: what a commit would contain.

use std::fmt;

/// Staged paths grouped by change type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangePlan {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl ChangePlan {
    /// Build a plan from `git status --porcelain=v1 --no-renames -z` output.
    ///
    /// Only the index column is read; unstaged and untracked entries are ignored.
    pub fn from_porcelain(status: &str) -> Self {
        let mut plan = Self::default();

        for record in status.split('\0') {
            let (Some(index), Some(path)) = (record.chars().next(), record.get(3..)) else {
                continue;
            };
            if path.is_empty() {
                continue;
            }
            let path = path.to_string();

            match index {
                'A' => plan.added.push(path),
                'M' | 'T' => plan.modified.push(path),
                'D' => plan.deleted.push(path),
                _ => {}
            }
        }

        plan.added.sort();
        plan.modified.sort();
        plan.deleted.sort();
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Total number of changed paths.
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    /// Count summary, e.g. `3 added, 1 modified, 0 deleted`.
    pub fn summary(&self) -> String {
        format!(
            "{} added, {} modified, {} deleted",
            self.added.len(),
            self.modified.len(),
            self.deleted.len()
        )
    }
}

impl fmt::Display for ChangePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for path in &self.added {
            writeln!(f, "A {path}")?;
        }
        for path in &self.modified {
            writeln!(f, "M {path}")?;
        }
        for path in &self.deleted {
            writeln!(f, "D {path}")?;
        }
        Ok(())
    }
}
