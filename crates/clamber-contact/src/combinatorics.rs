//! Lazy enumeration of contact subsets.
//!
//! [`MaintainCombinations`] walks the subsets of a stance's contacts obtained
//! by breaking `0..=max_broken` of them. [`CreationCombinations`] walks the
//! subsets of free effectors to bring into contact. Both yield in priority
//! order and hold only O(n) state.

use std::collections::VecDeque;

use clamber_core::{CandidateStance, EffectorPriority, Stance};

// ---------------------------------------------------------------------------
// MaintainCombinations
// ---------------------------------------------------------------------------

/// Stances obtained by breaking up to `max_broken` contacts of a base stance.
///
/// Candidates breaking fewer contacts come first. Within one break count,
/// subsets are ordered lexicographically over the contacts sorted by effector
/// priority, so higher-priority effectors are broken first.
#[derive(Debug, Clone)]
pub struct MaintainCombinations {
    base: Stance,
    /// Current contacts in priority order.
    contacts: Vec<String>,
    max_broken: usize,
    /// Indices into `contacts` of the next subset to break. `None` once done.
    indices: Option<Vec<usize>>,
}

impl MaintainCombinations {
    pub fn new(base: Stance, priority: &EffectorPriority, max_broken: usize) -> Self {
        let mut contacts = base.contact_order().to_vec();
        priority.sort(&mut contacts);
        let max_broken = max_broken.min(contacts.len());
        Self {
            base,
            contacts,
            max_broken,
            indices: Some(Vec::new()),
        }
    }

    /// Advance `indices` to the next subset, growing the break count when the
    /// current size is exhausted.
    fn advance(&mut self) {
        let Some(indices) = self.indices.as_mut() else {
            return;
        };
        if next_combination(indices, self.contacts.len()) {
            return;
        }
        let k = indices.len() + 1;
        self.indices = (k <= self.max_broken).then(|| (0..k).collect());
    }
}

impl Iterator for MaintainCombinations {
    type Item = Stance;

    fn next(&mut self) -> Option<Stance> {
        let indices = self.indices.as_ref()?;
        let mut stance = self.base.clone();
        for &i in indices {
            stance.remove_contact(&self.contacts[i]);
        }
        self.advance();
        Some(stance)
    }
}

/// Step a sorted k-subset of `0..n` to its lexicographic successor.
///
/// Returns `false` when `indices` was the last subset (or empty).
fn next_combination(indices: &mut [usize], n: usize) -> bool {
    let k = indices.len();
    let Some(i) = (0..k).rev().find(|&i| indices[i] < n - k + i) else {
        return false;
    };
    indices[i] += 1;
    for j in i + 1..k {
        indices[j] = indices[j - 1] + 1;
    }
    true
}

/// Every stance reachable from `stance` by breaking at most
/// `max_broken_contacts` contacts, fewest breaks first.
pub fn maintain_contacts_combinatorial(
    stance: &Stance,
    priority: &EffectorPriority,
    max_broken_contacts: usize,
) -> VecDeque<Stance> {
    MaintainCombinations::new(stance.clone(), priority, max_broken_contacts).collect()
}

// ---------------------------------------------------------------------------
// CreationCombinations
// ---------------------------------------------------------------------------

/// One pending branch of the peel-and-branch walk.
#[derive(Debug, Clone)]
struct Branch {
    created: Vec<String>,
    /// Next free effector to decide on.
    next: usize,
    budget: usize,
}

/// Subsets of free effectors to bring into contact, at most `max_created`.
///
/// The walk peels the highest-priority undecided effector and branches into
/// "contact it" then "skip it". An explicit stack replaces recursion; the
/// "contact it" branch is explored first, so larger creations come before
/// their subsets and the no-creation candidate comes last.
#[derive(Debug, Clone)]
pub struct CreationCombinations {
    base: Stance,
    free: Vec<String>,
    stack: Vec<Branch>,
}

impl CreationCombinations {
    /// `free` must be in priority order.
    pub fn new(base: Stance, free: Vec<String>, max_created: usize) -> Self {
        Self {
            base,
            free,
            stack: vec![Branch {
                created: Vec::new(),
                next: 0,
                budget: max_created,
            }],
        }
    }

    fn leaf(&self, created: Vec<String>) -> CandidateStance {
        let free_effectors = self
            .free
            .iter()
            .filter(|name| !created.contains(name))
            .cloned()
            .collect();
        CandidateStance {
            stance: self.base.clone(),
            created,
            free_effectors,
        }
    }
}

impl Iterator for CreationCombinations {
    type Item = CandidateStance;

    fn next(&mut self) -> Option<CandidateStance> {
        loop {
            let branch = self.stack.pop()?;
            if branch.budget == 0 || branch.next == self.free.len() {
                return Some(self.leaf(branch.created));
            }
            let mut with = branch.created.clone();
            with.push(self.free[branch.next].clone());
            // LIFO: push "skip" first so "contact" is explored first.
            self.stack.push(Branch {
                created: branch.created,
                next: branch.next + 1,
                budget: branch.budget,
            });
            self.stack.push(Branch {
                created: with,
                next: branch.next + 1,
                budget: branch.budget - 1,
            });
        }
    }
}

/// Every way of contacting at most `max_created_contacts` of
/// `free_effectors` from `stance`.
pub fn gen_contacts_combinatorial(
    free_effectors: &[String],
    stance: &Stance,
    max_created_contacts: usize,
) -> VecDeque<CandidateStance> {
    CreationCombinations::new(stance.clone(), free_effectors.to_vec(), max_created_contacts)
        .collect()
}
