/*!
The clause database: an arena of [`SClause`]s plus an occurrence index `OT`
mapping each literal to the clauses that currently contain it.

Shaped like a keyed store behind a thin public surface, internal layout
private. Every phase of the simplifier reads and mutates this structure
through [`ClauseDb`]; nothing outside this module indexes the arena or the
occurrence lists directly.
*/
use std::sync::Mutex;

use crate::misc::log::targets;
use crate::pool::WorkerPool;
use crate::structures::clause::{ClauseData, ClauseId, ClauseStatus, SClause};
use crate::structures::literal::{index_bound, Lit, Var};
use crate::types::err::ClauseDBError;

pub mod reconstruction;
pub mod vstate;

/// The clause arena and its occurrence index.
pub struct ClauseDb {
    arena: Vec<SClause>,
    occurs: Vec<Mutex<Vec<ClauseId>>>,
    max_var: Var,
    /// Soft cap on total (arena + occurs) entries; exceeding it during
    /// `createOT`/`shrinkSimp` raises `ClauseDBError::MemoryExceeded`.
    memory_cap_entries: usize,
}

impl ClauseDb {
    /// Builds an empty database over variables `1..=max_var`.
    pub fn new(max_var: Var, memory_cap_entries: usize) -> Self {
        let bound = index_bound(max_var);
        ClauseDb {
            arena: Vec::new(),
            occurs: (0..bound).map(|_| Mutex::new(Vec::new())).collect(),
            max_var,
            memory_cap_entries,
        }
    }

    pub fn max_var(&self) -> Var {
        self.max_var
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Appends a clause to the arena (without touching `OT`; call `createOT`
    /// to index it) and returns its id.
    pub fn add_clause(&mut self, literals: Vec<Lit>, status: ClauseStatus) -> ClauseId {
        let id = ClauseId(self.arena.len() as u32);
        self.arena.push(SClause::new(literals, status));
        id
    }

    pub fn clause(&self, id: ClauseId) -> &SClause {
        &self.arena[id.index()]
    }

    pub fn occurs(&self, lit: Lit) -> &Mutex<Vec<ClauseId>> {
        &self.occurs[lit.index()]
    }

    /// Iterates every clause id currently in the arena (deleted or not).
    pub fn all_ids(&self) -> impl Iterator<Item = ClauseId> {
        (0..self.arena.len() as u32).map(ClauseId)
    }

    /// Snapshot-reads every non-deleted clause's literals, for callers (tests,
    /// the caller-facing `newBeginning` handoff) that want a plain `Vec<Vec<Lit>>`.
    pub fn live_clauses(&self) -> Vec<Vec<Lit>> {
        self.all_ids()
            .filter_map(|id| {
                let data = self.clause(id).lock();
                if data.is_deleted() {
                    None
                } else {
                    Some(data.literals.clone())
                }
            })
            .collect()
    }

    fn projected_entries(&self) -> usize {
        let clause_lits: usize = self
            .all_ids()
            .map(|id| self.clause(id).lock().len())
            .sum();
        self.arena.len() + clause_lits
    }

    /// `checkMem`: compares a projected entry count against the configured cap.
    pub fn check_projected_size(&self) -> Result<(), ClauseDBError> {
        if self.projected_entries() > self.memory_cap_entries {
            Err(ClauseDBError::MemoryExceeded)
        } else {
            Ok(())
        }
    }

    /// Rebuilds `OT` from scratch (`reset = true` clears every list first, in
    /// parallel) by scanning every non-deleted clause and pushing its id onto
    /// each literal's list under that list's lock.
    pub fn create_ot(&self, pool: &WorkerPool, reset: bool) -> Result<(), ClauseDBError> {
        self.check_projected_size()?;

        if reset {
            pool.do_work_for_each(0, self.occurs.len(), usize::MAX, |i| {
                self.occurs[i].lock().unwrap().clear();
            });
            // do_work_for_each already blocks until the clear finishes; join()
            // here only exists to surface an interrupt raised mid-clear.
            pool.join().ok();
        }

        pool.do_work_for_each(0, self.arena.len(), 4096, |i| {
            let id = ClauseId(i as u32);
            let data = self.clause(id).lock();
            if data.is_deleted() {
                return;
            }
            for &lit in &data.literals {
                self.occurs[lit.index()].lock().unwrap().push(id);
            }
        });
        pool.join().ok();

        log::debug!(target: targets::CLAUSE_DB, "createOT: indexed {} clauses", self.arena.len());
        Ok(())
    }

    /// Compacts every occurrence list in parallel, dropping references to
    /// deleted clauses while preserving relative order.
    pub fn reduce_ot(&self, pool: &WorkerPool) {
        pool.do_work_for_each(0, self.occurs.len(), usize::MAX, |i| {
            let mut list = self.occurs[i].lock().unwrap();
            list.retain(|&id| !self.clause(id).lock().is_deleted());
        });
        pool.join().ok();
        log::trace!(target: targets::OCCURS, "reduceOT done");
    }

    /// Sorts occurrence lists. `partial_only` restricts the pass to the
    /// literals of `pivots` and uses [`cmp_key`]; the full pass sorts every
    /// list with [`cmp_abs`].
    pub fn sort_ot(&self, pool: &WorkerPool, partial_only: Option<&[Var]>) {
        match partial_only {
            Some(pivots) => {
                let lits: Vec<Lit> = pivots
                    .iter()
                    .flat_map(|&v| [Lit::pos(v), Lit::neg(v)])
                    .collect();
                let lits_owned = lits;
                pool.do_work_for_each(0, lits_owned.len(), usize::MAX, move |i| {
                    self.sort_one_list(lits_owned[i], true);
                });
            }
            None => {
                pool.do_work_for_each(0, self.occurs.len(), usize::MAX, |i| {
                    self.sort_one_list(Lit::from_index(i), false);
                });
            }
        }
        pool.join().ok();
    }

    fn sort_one_list(&self, lit: Lit, partial: bool) {
        let mut list = self.occurs[lit.index()].lock().unwrap();
        let mut keyed: Vec<(ClauseId, ClauseData)> = list
            .iter()
            .map(|&id| (id, self.clause(id).lock().clone()))
            .collect();
        if partial {
            keyed.sort_by(|(_, a), (_, b)| cmp_key(a, b));
        } else {
            keyed.sort_by(|(_, a), (_, b)| cmp_abs(a, b));
        }
        *list = keyed.into_iter().map(|(id, _)| id).collect();
    }

    /// Physically removes deleted clauses from the arena and remaps every
    /// `ClauseId` referenced by `OT`. Single-threaded: this only runs between
    /// parallel phases, at most once every `shrink_rate` outer iterations.
    pub fn shrink_simp(&mut self, pool: &WorkerPool) -> Result<(), ClauseDBError> {
        self.check_projected_size()?;

        let mut remap = vec![None; self.arena.len()];
        let mut kept = Vec::with_capacity(self.arena.len());
        for (old_index, clause) in self.arena.drain(..).enumerate() {
            let deleted = clause.lock().is_deleted();
            if deleted {
                continue;
            }
            let new_id = ClauseId(kept.len() as u32);
            remap[old_index] = Some(new_id);
            kept.push(clause);
        }
        self.arena = kept;

        for list in &self.occurs {
            let mut list = list.lock().unwrap();
            list.retain_mut(|id| match remap[id.index()] {
                Some(new_id) => {
                    *id = new_id;
                    true
                }
                None => false,
            });
        }

        log::info!(target: targets::CLAUSE_DB, "shrinkSimp: {} clauses remain", self.arena.len());
        let _ = pool;
        Ok(())
    }

    /// Marks a clause deleted under its own lock.
    pub fn delete(&self, id: ClauseId) {
        self.clause(id).lock().status = ClauseStatus::Deleted;
    }
}

/// `CNF_CMP_KEY`: shorter clauses first, then lexicographic on the first two
/// literals and the last literal, with `sig` as a final tiebreaker.
pub fn cmp_key(a: &ClauseData, b: &ClauseData) -> std::cmp::Ordering {
    a.len()
        .cmp(&b.len())
        .then_with(|| a.literals.first().cmp(&b.literals.first()))
        .then_with(|| a.literals.get(1).cmp(&b.literals.get(1)))
        .then_with(|| a.literals.last().cmp(&b.literals.last()))
        .then_with(|| a.sig.cmp(&b.sig))
}

/// `CNF_CMP_ABS`: size then signed literal order (the literal encoding's
/// natural ordering, variable-major with positive before negative).
pub fn cmp_abs(a: &ClauseData, b: &ClauseData) -> std::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.literals.cmp(&b.literals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::literal::Lit;

    fn db_with(max_var: Var, clauses: &[&[(u32, bool)]]) -> ClauseDb {
        let mut db = ClauseDb::new(max_var, usize::MAX);
        for c in clauses {
            let lits = c.iter().map(|&(v, p)| Lit::new(v, p)).collect();
            db.add_clause(lits, ClauseStatus::Original);
        }
        db
    }

    #[test]
    fn create_ot_indexes_every_literal_occurrence() {
        let db = db_with(3, &[&[(1, true), (2, true)], &[(1, false), (3, true)]]);
        let pool = WorkerPool::new(2);
        db.create_ot(&pool, true).unwrap();

        assert_eq!(db.occurs(Lit::pos(1)).lock().unwrap().len(), 1);
        assert_eq!(db.occurs(Lit::neg(1)).lock().unwrap().len(), 1);
        assert_eq!(db.occurs(Lit::pos(2)).lock().unwrap().len(), 1);
        assert_eq!(db.occurs(Lit::pos(3)).lock().unwrap().len(), 1);
        assert_eq!(db.occurs(Lit::neg(2)).lock().unwrap().len(), 0);
    }

    #[test]
    fn reduce_ot_drops_deleted_clause_references() {
        let db = db_with(2, &[&[(1, true), (2, true)], &[(1, true)]]);
        let pool = WorkerPool::new(2);
        db.create_ot(&pool, true).unwrap();
        db.delete(ClauseId(0));
        db.reduce_ot(&pool);
        let remaining = db.occurs(Lit::pos(1)).lock().unwrap().clone();
        assert_eq!(remaining, vec![ClauseId(1)]);
    }

    #[test]
    fn shrink_simp_compacts_and_remaps() {
        let mut db = db_with(2, &[&[(1, true)], &[(2, true)], &[(1, true), (2, true)]]);
        let pool = WorkerPool::new(2);
        db.create_ot(&pool, true).unwrap();
        db.delete(ClauseId(0));
        db.shrink_simp(&pool).unwrap();
        assert_eq!(db.len(), 2);
        // The surviving clause referencing var 2 alone should have been remapped to id 0.
        let occs = db.occurs(Lit::pos(2)).lock().unwrap().clone();
        assert!(occs.contains(&ClauseId(0)));
    }

    #[test]
    fn memory_cap_is_enforced() {
        let db = db_with(1, &[&[(1, true)]]);
        let mut capped = ClauseDb::new(1, 0);
        capped.add_clause(vec![Lit::pos(1)], ClauseStatus::Original);
        let pool = WorkerPool::new(1);
        assert_eq!(capped.create_ot(&pool, true), Err(ClauseDBError::MemoryExceeded));
        let _ = db;
    }
}
