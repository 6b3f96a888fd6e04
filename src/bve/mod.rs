/*!
Bounded variable elimination (BVE): pure-literal removal, gate-guided
substitution (equivalence/NOT, AND/OR, ITE, XOR, tried in that priority
order), and a plain n-by-m resolution fallback, each guarded by a
doesn't-grow-the-formula size check before being committed.

Pivots are processed independently and in parallel via
[`WorkerPool::do_work_for_each`], each writing its [`PivotOutcome`] into its
own pre-allocated slot rather than contending on a shared structure -- the
parallel equivalent of `spec.md`'s thread-local `new_res[i]`/`resolved[i]`
buffers. The coordinator then walks the slots in pivot order and commits
them to the database and reconstruction log one at a time, since two
pivots melting variables that share a clause cannot be applied concurrently
without risking a lost update.
*/
use std::sync::Mutex;

use crate::config::Config;
use crate::db::reconstruction::ReconstructionLog;
use crate::db::vstate::{VState, VarStates};
use crate::db::ClauseDb;
use crate::elim::resolve_on;
use crate::misc::log::targets;
use crate::pool::WorkerPool;
use crate::structures::clause::{ClauseId, ClauseStatus};
use crate::structures::literal::{Lit, Var};

pub mod gates;

/// What committing one pivot's elimination does to the database.
pub struct PivotOutcome {
    pub var: Var,
    pub new_clauses: Vec<Vec<Lit>>,
    pub deleted: Vec<ClauseId>,
    pub recon: Vec<ReconPush>,
}

/// A deferred reconstruction-log write (deferred so pivots can be found in
/// parallel but the log, which is not internally synchronized, is only
/// touched by the single-threaded commit pass).
pub enum ReconPush {
    Unit(Lit),
    Clause(Vec<Lit>, Lit),
}

/// Runs one BVE pass over `pivots`, applying every accepted elimination to
/// `db` and `log`. Returns the number of variables eliminated.
pub fn eliminate(
    db: &mut ClauseDb,
    log: &mut ReconstructionLog,
    vstates: &VarStates,
    pool: &WorkerPool,
    pivots: &[Var],
    config: &Config,
) -> usize {
    if !config.ve_en {
        return 0;
    }

    let slots: Vec<Mutex<Option<PivotOutcome>>> = (0..pivots.len()).map(|_| Mutex::new(None)).collect();
    {
        // Reborrowed immutably for the parallel detection phase: every
        // job only reads `db` and writes into its own slot.
        let db_ref: &ClauseDb = db;
        pool.do_work_for_each(0, pivots.len(), 1, |i| {
            let outcome = eliminate_pivot(db_ref, pivots[i], vstates, config);
            *slots[i].lock().unwrap() = outcome;
        });
        pool.join().ok();
    }

    let mut eliminated = 0;
    for slot in slots {
        let Some(outcome) = slot.into_inner().unwrap() else {
            continue;
        };
        for id in &outcome.deleted {
            db.delete(*id);
        }
        for lits in outcome.new_clauses {
            let id = db.add_clause(lits.clone(), ClauseStatus::Learnt);
            for &l in &lits {
                db.occurs(l).lock().unwrap().push(id);
            }
        }
        for push in outcome.recon {
            match push {
                ReconPush::Unit(lit) => log.push_unit(lit),
                ReconPush::Clause(lits, witness) => log.push_clause(lits, witness),
            }
        }
        vstates.set(outcome.var, VState::Melted);
        eliminated += 1;
    }

    log::debug!(target: targets::BVE, "BVE: {eliminated} variables eliminated");
    eliminated
}

/// Attempts to eliminate one pivot, trying (when `config.ve_plus_en`) each
/// gate kind in turn before falling back to plain resolution. Returns `None`
/// if the variable is inactive, has no occurrences, or every strategy's
/// added-clause count would exceed its current occurrence count.
fn eliminate_pivot(db: &ClauseDb, v: Var, vstates: &VarStates, config: &Config) -> Option<PivotOutcome> {
    if !vstates.is_active(v) {
        return None;
    }

    let p = Lit::pos(v);
    let n = Lit::neg(v);
    let pos_ids: Vec<ClauseId> = db
        .occurs(p)
        .lock()
        .unwrap()
        .iter()
        .copied()
        .filter(|&id| !db.clause(id).lock().is_deleted())
        .collect();
    let neg_ids: Vec<ClauseId> = db
        .occurs(n)
        .lock()
        .unwrap()
        .iter()
        .copied()
        .filter(|&id| !db.clause(id).lock().is_deleted())
        .collect();

    if pos_ids.is_empty() && neg_ids.is_empty() {
        return None;
    }

    if pos_ids.is_empty() || neg_ids.is_empty() {
        let (lit, ids) = if pos_ids.is_empty() { (n, neg_ids) } else { (p, pos_ids) };
        return Some(PivotOutcome {
            var: v,
            new_clauses: Vec::new(),
            deleted: ids,
            recon: vec![ReconPush::Unit(lit)],
        });
    }

    if config.ve_plus_en {
        if let Some(m) = gates::find_equivalence_gate(db, p, n) {
            if let Some(outcome) = try_gate(db, v, p, n, &pos_ids, &neg_ids, m) {
                return Some(outcome);
            }
        }
        if let Some(m) = gates::find_and_or_gate(db, p, n) {
            if let Some(outcome) = try_gate(db, v, p, n, &pos_ids, &neg_ids, m) {
                return Some(outcome);
            }
        }
        if let Some(mut m) = gates::find_and_or_gate(db, n, p) {
            // The OR gate is the AND gate with polarity swapped: the match's
            // `pos_gate`/`neg_gate` come back relative to the swapped call
            // (carrying `n`/`p` respectively), so swap them back before
            // handing them to `try_gate`, which assumes `pos_gate` clauses
            // carry the real positive pivot literal.
            std::mem::swap(&mut m.pos_gate, &mut m.neg_gate);
            if let Some(outcome) = try_gate(db, v, p, n, &pos_ids, &neg_ids, m) {
                return Some(outcome);
            }
        }
        if let Some(m) = gates::find_ite_gate(db, p, n) {
            if let Some(outcome) = try_gate(db, v, p, n, &pos_ids, &neg_ids, m) {
                return Some(outcome);
            }
        }
        if let Some(m) = gates::find_xor_gate(db, p, config) {
            if let Some(outcome) = try_gate(db, v, p, n, &pos_ids, &neg_ids, m) {
                return Some(outcome);
            }
        }
    }

    try_resolution_fallback(db, v, p, n, &pos_ids, &neg_ids)
}

/// Generalizes the AND/OR-gate substitution described in `spec.md`'s worked
/// example to every gate kind: each `pos_gate` clause resolves against every
/// non-gate clause carrying `n`, and each `neg_gate` clause resolves against
/// every non-gate clause carrying `p`. Clauses within the gate are never
/// resolved against each other -- that cross term belongs to the gate's own
/// (already-encoded) structure, not the substitution.
fn gate_resolvents(
    pos_gate: &[(ClauseId, Vec<Lit>)],
    neg_gate: &[(ClauseId, Vec<Lit>)],
    other_pos: &[(ClauseId, Vec<Lit>)],
    other_neg: &[(ClauseId, Vec<Lit>)],
    v: Var,
) -> Vec<Vec<Lit>> {
    let mut out = Vec::new();
    for (_, pg) in pos_gate {
        for (_, on) in other_neg {
            if let Some(r) = resolve_on(pg, on, v) {
                out.push(r);
            }
        }
    }
    for (_, ng) in neg_gate {
        for (_, op) in other_pos {
            if let Some(r) = resolve_on(ng, op, v) {
                out.push(r);
            }
        }
    }
    out
}

fn try_gate(
    db: &ClauseDb,
    v: Var,
    p: Lit,
    n: Lit,
    pos_ids: &[ClauseId],
    neg_ids: &[ClauseId],
    gate: gates::GateMatch,
) -> Option<PivotOutcome> {
    for &(id, _) in gate.pos_gate.iter().chain(gate.neg_gate.iter()) {
        db.clause(id).lock().molten = true;
    }

    let gate_pos_ids: std::collections::HashSet<ClauseId> = gate.pos_gate.iter().map(|&(id, _)| id).collect();
    let gate_neg_ids: std::collections::HashSet<ClauseId> = gate.neg_gate.iter().map(|&(id, _)| id).collect();

    let other_pos: Vec<(ClauseId, Vec<Lit>)> = pos_ids
        .iter()
        .filter(|id| !gate_pos_ids.contains(id))
        .map(|&id| (id, db.clause(id).snapshot().literals))
        .collect();
    let other_neg: Vec<(ClauseId, Vec<Lit>)> = neg_ids
        .iter()
        .filter(|id| !gate_neg_ids.contains(id))
        .map(|&id| (id, db.clause(id).snapshot().literals))
        .collect();

    let resolvents = gate_resolvents(&gate.pos_gate, &gate.neg_gate, &other_pos, &other_neg, v);
    let original_count = pos_ids.len() + neg_ids.len();

    if resolvents.len() > original_count {
        // Unconditionally clear `molten` on every bail-out path, regardless of
        // which gate kind or which guard tripped: `spec.md`'s open question on
        // gate bail-out cleanup, resolved in `DESIGN.md`.
        for &(id, _) in gate.pos_gate.iter().chain(gate.neg_gate.iter()) {
            db.clause(id).lock().molten = false;
        }
        return None;
    }

    let mut all_pos = gate.pos_gate;
    all_pos.extend(other_pos);
    let mut all_neg = gate.neg_gate;
    all_neg.extend(other_neg);

    Some(commit(v, p, n, all_pos, all_neg, resolvents))
}

fn try_resolution_fallback(
    db: &ClauseDb,
    v: Var,
    p: Lit,
    n: Lit,
    pos_ids: &[ClauseId],
    neg_ids: &[ClauseId],
) -> Option<PivotOutcome> {
    let pos: Vec<(ClauseId, Vec<Lit>)> = pos_ids.iter().map(|&id| (id, db.clause(id).snapshot().literals)).collect();
    let neg: Vec<(ClauseId, Vec<Lit>)> = neg_ids.iter().map(|&id| (id, db.clause(id).snapshot().literals)).collect();

    let mut resolvents = Vec::new();
    for (_, pl) in &pos {
        for (_, nl) in &neg {
            if let Some(r) = resolve_on(pl, nl, v) {
                resolvents.push(r);
            }
        }
    }

    if resolvents.len() > pos.len() + neg.len() {
        return None;
    }

    Some(commit(v, p, n, pos, neg, resolvents))
}

/// The reconstruction-log discipline, shared by every elimination strategy:
/// the side of `v` with fewer original clauses is the one saved, since
/// replaying only that side is sufficient to extend a model and keeps the
/// log as small as possible.
fn commit(
    v: Var,
    p: Lit,
    n: Lit,
    pos_clauses: Vec<(ClauseId, Vec<Lit>)>,
    neg_clauses: Vec<(ClauseId, Vec<Lit>)>,
    resolvents: Vec<Vec<Lit>>,
) -> PivotOutcome {
    let mut recon = Vec::new();
    if pos_clauses.len() <= neg_clauses.len() {
        for (_, lits) in &pos_clauses {
            recon.push(ReconPush::Clause(lits.clone(), p));
        }
    } else {
        for (_, lits) in &neg_clauses {
            recon.push(ReconPush::Clause(lits.clone(), n));
        }
    }

    let deleted: Vec<ClauseId> = pos_clauses
        .into_iter()
        .map(|(id, _)| id)
        .chain(neg_clauses.into_iter().map(|(id, _)| id))
        .collect();

    PivotOutcome {
        var: v,
        new_clauses: resolvents,
        deleted,
        recon,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::clause::ClauseStatus;

    fn db_with(max_var: Var, clauses: &[&[(u32, bool)]]) -> ClauseDb {
        let mut db = ClauseDb::new(max_var, usize::MAX);
        for c in clauses {
            let lits = c.iter().map(|&(v, p)| Lit::new(v, p)).collect();
            db.add_clause(lits, ClauseStatus::Original);
        }
        db
    }

    #[test]
    fn pure_literal_is_eliminated_with_a_unit_witness() {
        // (x1∨x2) ∧ (x1∨¬x2): x1 is pure positive.
        let mut db = db_with(2, &[&[(1, true), (2, true)], &[(1, true), (2, false)]]);
        let pool = WorkerPool::new(2);
        db.create_ot(&pool, true).unwrap();

        let vstates = VarStates::new(2);
        let mut log = ReconstructionLog::new();
        let config = Config::default();
        let eliminated = eliminate(&mut db, &mut log, &vstates, &pool, &[1], &config);

        assert_eq!(eliminated, 1);
        assert_eq!(vstates.get(1), VState::Melted);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn and_gate_eliminates_without_exhaustive_resolution() {
        // (¬g∨a),(¬g∨b),(g∨¬a∨¬b),(g∨c),(¬g∨d): eliminating g should not
        // produce a spurious (c∨d) resolvent.
        let g = Lit::pos(1);
        let a = Lit::pos(2);
        let b = Lit::pos(3);
        let c = Lit::pos(4);
        let d = Lit::pos(5);
        let mut db = db_with(
            5,
            &[
                &[(1, false), (2, true)],
                &[(1, false), (3, true)],
                &[(1, true), (2, false), (3, false)],
                &[(1, true), (4, true)],
                &[(1, false), (5, true)],
            ],
        );
        let pool = WorkerPool::new(2);
        db.create_ot(&pool, true).unwrap();

        let vstates = VarStates::new(5);
        let mut log = ReconstructionLog::new();
        let config = Config::default();
        let eliminated = eliminate(&mut db, &mut log, &vstates, &pool, &[1], &config);
        assert_eq!(eliminated, 1);

        let survivors: Vec<Vec<Lit>> = db.live_clauses();
        assert!(!survivors.iter().any(|cl| cl.contains(&c) && cl.contains(&d) && cl.len() == 2));
        assert!(survivors.iter().any(|cl| cl.contains(&a) && cl.contains(&c)));
        assert!(survivors.iter().any(|cl| cl.contains(&b) && cl.contains(&c)));
    }

    #[test]
    fn plain_resolution_fallback_is_used_when_ve_plus_is_disabled() {
        let mut db = db_with(3, &[&[(1, true), (2, true)], &[(1, false), (3, true)]]);
        let pool = WorkerPool::new(2);
        db.create_ot(&pool, true).unwrap();

        let vstates = VarStates::new(3);
        let mut log = ReconstructionLog::new();
        let mut config = Config::default();
        config.ve_plus_en = false;
        let eliminated = eliminate(&mut db, &mut log, &vstates, &pool, &[1], &config);

        assert_eq!(eliminated, 1);
        let survivors = db.live_clauses();
        assert!(survivors.iter().any(|cl| cl.contains(&Lit::pos(2)) && cl.contains(&Lit::pos(3))));
    }
}
