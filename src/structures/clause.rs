//! Clauses as stored in the [clause database](crate::db).
use std::sync::Mutex;

use super::literal::Lit;

/// Identifies a clause in the [arena](crate::db::ClauseDb). Stable across a
/// clause's lifetime; `shrinkSimp` is the only operation that invalidates
/// `ClauseId`s, and it remaps every reference it touches as it compacts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClauseId(pub u32);

impl ClauseId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The lifecycle state of a clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClauseStatus {
    /// Present in the input formula.
    Original,

    /// Produced as a resolvent, gate substitution, or hyper-binary consequence.
    Learnt,

    /// Logically removed; the slot remains in the arena until `shrinkSimp`.
    Deleted,
}

/// The mutable contents of a clause, guarded by [`SClause::lock`].
#[derive(Clone, Debug)]
pub struct ClauseData {
    /// Current literals, sorted ascending, with no duplicates or complementary pair.
    pub literals: Vec<Lit>,

    pub status: ClauseStatus,

    /// Literal-block-distance, maintained for learnt clauses only.
    pub lbd: u32,

    /// Bloom signature: `OR of (1 << (lit.index() & 0x1F))` over `literals`.
    pub sig: u32,

    /// Usage counter in `0..=3`, used by HSE/ERE heuristics to prefer
    /// recently-useful clauses when a choice between candidates exists.
    pub usage: u8,

    /// Set while a clause is part of a gate recognized during the current BVE pass.
    pub molten: bool,

    /// Set when a clause was produced as a resolvent during the current pass.
    pub added: bool,
}

impl ClauseData {
    pub fn new(mut literals: Vec<Lit>, status: ClauseStatus) -> Self {
        literals.sort_unstable();
        literals.dedup();
        let sig = signature(&literals);
        ClauseData {
            literals,
            status,
            lbd: 0,
            sig,
            usage: 0,
            molten: false,
            added: false,
        }
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.status, ClauseStatus::Deleted)
    }

    /// Recomputes `sig` from the current literals. Must be called after any
    /// mutation of `literals` so the signature-correctness invariant holds.
    pub fn recompute_sig(&mut self) {
        self.sig = signature(&self.literals);
    }

    /// Removes `lit` from the clause (strengthening), keeping the sortedness
    /// and signature invariants intact. Returns `true` if `lit` was present.
    pub fn strengthen(&mut self, lit: Lit) -> bool {
        let before = self.literals.len();
        self.literals.retain(|&l| l != lit);
        let removed = self.literals.len() != before;
        if removed {
            self.recompute_sig();
        }
        removed
    }

    /// `true` if every literal of `self` also occurs in `other` (subsumption).
    pub fn subset_of(&self, other: &ClauseData) -> bool {
        if self.sig & !other.sig != 0 {
            return false;
        }
        self.literals.iter().all(|l| other.literals.binary_search(l).is_ok())
    }

    /// If `self`'s literals are a subset of `other`'s modulo exactly one
    /// flipped literal, returns that literal (as it appears in `other`) --
    /// self-subsumption's strengthening candidate.
    pub fn self_subsumes(&self, other: &ClauseData) -> Option<Lit> {
        if self.literals.len() > other.literals.len() {
            return None;
        }
        let mut flipped = None;
        for &l in &self.literals {
            if other.literals.binary_search(&l).is_ok() {
                continue;
            }
            if other.literals.binary_search(&l.flip()).is_ok() {
                if flipped.is_some() {
                    return None;
                }
                flipped = Some(l.flip());
            } else {
                return None;
            }
        }
        flipped
    }
}

/// `OR of (1 << (lit.index() & 0x1F))` over `literals`: the O(1) subsumption filter.
pub fn signature(literals: &[Lit]) -> u32 {
    literals
        .iter()
        .fold(0u32, |acc, l| acc | (1u32 << (l.index() as u32 & 0x1F)))
}

/// A clause together with its per-clause lock.
///
/// Every mutation (strengthening, deletion, promotion) happens with the lock
/// held; readers that only need a stable snapshot (e.g. to compute a
/// resolvent) clone the guard's contents rather than holding the lock across
/// further lock acquisitions, which would risk deadlock against the
/// occurrence-list locks.
#[derive(Debug)]
pub struct SClause {
    inner: Mutex<ClauseData>,
}

impl SClause {
    pub fn new(literals: Vec<Lit>, status: ClauseStatus) -> Self {
        SClause {
            inner: Mutex::new(ClauseData::new(literals, status)),
        }
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, ClauseData> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A cheap snapshot read, for call sites that only need a consistent copy
    /// (e.g. to build a resolvent candidate outside the lock).
    pub fn snapshot(&self) -> ClauseData {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::literal::Lit;

    fn lits(vars: &[(u32, bool)]) -> Vec<Lit> {
        vars.iter().map(|&(v, p)| Lit::new(v, p)).collect()
    }

    #[test]
    fn sorted_no_duplicates() {
        let c = ClauseData::new(lits(&[(3, true), (1, true), (1, true), (2, false)]), ClauseStatus::Original);
        assert_eq!(c.literals, lits(&[(1, true), (2, false), (3, true)]));
    }

    #[test]
    fn subset_detection() {
        let small = ClauseData::new(lits(&[(1, true), (2, true)]), ClauseStatus::Original);
        let big = ClauseData::new(lits(&[(1, true), (2, true), (3, false)]), ClauseStatus::Original);
        assert!(small.subset_of(&big));
        assert!(!big.subset_of(&small));
    }

    #[test]
    fn self_subsumption_detects_single_flip() {
        let small = ClauseData::new(lits(&[(1, true), (2, true)]), ClauseStatus::Original);
        let big = ClauseData::new(lits(&[(1, true), (2, false), (3, false)]), ClauseStatus::Original);
        assert_eq!(small.self_subsumes(&big), Some(Lit::new(2, false)));
    }

    #[test]
    fn signature_correctness_after_strengthen() {
        let mut c = ClauseData::new(lits(&[(1, true), (2, true), (3, true)]), ClauseStatus::Original);
        let target = c.literals[1];
        c.strengthen(target);
        assert_eq!(c.sig, signature(&c.literals));
        assert_eq!(c.literals.len(), 2);
    }
}
