//! Workload thread membership
//!
//! Seeded with the workload's root thread and grown by forks whose parent
//! is already a member. Membership never shrinks and preserves the order in
//! which threads joined.

use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct WorkloadMembership {
    order: Vec<String>,
    members: HashSet<String>,
}

impl WorkloadMembership {
    /// Start a workload rooted at `root`
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let mut members = HashSet::new();
        members.insert(root.clone());
        Self {
            order: vec![root],
            members,
        }
    }

    pub fn root(&self) -> &str {
        &self.order[0]
    }

    pub fn contains(&self, tid: &str) -> bool {
        self.members.contains(tid)
    }

    /// Append `tid`; returns `false` if it was already a member
    pub fn admit(&mut self, tid: &str) -> bool {
        if self.members.contains(tid) {
            return false;
        }
        self.members.insert(tid.to_string());
        self.order.push(tid.to_string());
        true
    }

    /// Members in the order they joined
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Always false: the root is a member from the start
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
