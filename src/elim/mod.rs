/*!
Clause-elimination kernels that don't require replacing a variable's
clauses with resolvents: hidden (self-)subsumption (HSE), blocked-clause
elimination (BCE), and equivalence-resolvent elimination (ERE), plus the
fused `CE` driver that runs HSE and (optionally) BCE in one per-clause pass.

Each kernel is parallel over the pivot-variable set `PVs`: different pivots
can touch the same clause, so every mutation still goes through that
clause's own lock (`spec.md` §4.4's contract), but the occurrence-list scan
itself is partitioned one pivot per unit of work via
[`WorkerPool::do_work_for_each`].
*/
use crate::config::Config;
use crate::db::ClauseDb;
use crate::misc::log::targets;
use crate::pool::WorkerPool;
use crate::structures::clause::{signature, ClauseStatus};
use crate::structures::literal::{Lit, Var};

/// Hidden (self-)subsumption: for each pivot, clauses in the shorter of
/// `OT[v]`/`OT[¬v]` are tested against every other clause sharing the
/// pivot variable. A subset match deletes the longer clause outright; a
/// subset match modulo one flipped literal strengthens it.
///
/// Returns `(clauses deleted, clauses strengthened)`.
pub fn hse(db: &ClauseDb, pool: &WorkerPool, pivots: &[Var], config: &Config) -> (usize, usize) {
    if !config.hse_en {
        return (0, 0);
    }
    let deleted = std::sync::atomic::AtomicUsize::new(0);
    let strengthened = std::sync::atomic::AtomicUsize::new(0);

    pool.do_work_for_each(0, pivots.len(), 1, |i| {
        let (d, s) = hse_pivot(db, pivots[i], config);
        deleted.fetch_add(d, std::sync::atomic::Ordering::Relaxed);
        strengthened.fetch_add(s, std::sync::atomic::Ordering::Relaxed);
    });
    pool.join().ok();

    let deleted = deleted.load(std::sync::atomic::Ordering::Relaxed);
    let strengthened = strengthened.load(std::sync::atomic::Ordering::Relaxed);
    log::debug!(target: targets::HSE, "HSE: {deleted} deleted, {strengthened} strengthened");
    (deleted, strengthened)
}

fn hse_pivot(db: &ClauseDb, v: Var, config: &Config) -> (usize, usize) {
    let p = Lit::pos(v);
    let n = Lit::neg(v);
    let pos_ids = db.occurs(p).lock().unwrap().clone();
    let neg_ids = db.occurs(n).lock().unwrap().clone();

    // `hse_limit`, like `bce_limit`/`ere_limit`, skips the pivot outright
    // once either polarity's occurrence list grows past the threshold.
    if pos_ids.len() > config.hse_limit || neg_ids.len() > config.hse_limit {
        return (0, 0);
    }

    // The spec picks the shorter of `OT[v]`/`OT[¬v]` purely to bound the
    // outer iteration for performance; since a variable occurring on only
    // one polarity would then iterate an empty list and never find its
    // subsuming partners (which share the *other* polarity's clauses too),
    // both `c` and `d` are drawn from the full combined set here.
    let mut all = pos_ids;
    all.extend(neg_ids);

    let mut deleted = 0;
    let mut strengthened = 0;

    for &d_id in &all {
        let d_data = db.clause(d_id).snapshot();
        if d_data.is_deleted() || d_data.len() > config.hse_max_cl_size {
            continue;
        }

        for &c_id in &all {
            if c_id == d_id {
                continue;
            }
            let mut c_data = db.clause(c_id).lock();
            if c_data.is_deleted() || c_data.len() > config.hse_max_cl_size || c_data.len() < d_data.len() {
                continue;
            }

            if d_data.subset_of(&c_data) {
                let promote_to_original = matches!(d_data.status, ClauseStatus::Original)
                    && matches!(c_data.status, ClauseStatus::Learnt);
                if promote_to_original {
                    // A learnt clause subsuming an original is promoted rather
                    // than the original being discarded: `d` carries the
                    // weaker (or equal) constraint and is the one kept live.
                    c_data.status = ClauseStatus::Original;
                }
                c_data.status = ClauseStatus::Deleted;
                deleted += 1;
            } else if let Some(flipped) = d_data.self_subsumes(&c_data) {
                c_data.strengthen(flipped);
                strengthened += 1;
            }
        }
    }

    (deleted, strengthened)
}

/// Blocked-clause elimination: a clause `c` containing literal `l` is
/// removed if every non-learnt, non-deleted clause in `OT[flip(l)]`
/// resolves with `c` on `abs(l)` to a tautology.
pub fn bce(db: &ClauseDb, pool: &WorkerPool, pivots: &[Var], config: &Config) -> usize {
    if !config.bce_en {
        return 0;
    }
    let deleted = std::sync::atomic::AtomicUsize::new(0);
    pool.do_work_for_each(0, pivots.len(), 1, |i| {
        let d = bce_pivot(db, pivots[i], config);
        deleted.fetch_add(d, std::sync::atomic::Ordering::Relaxed);
    });
    pool.join().ok();
    let deleted = deleted.load(std::sync::atomic::Ordering::Relaxed);
    log::debug!(target: targets::BCE, "BCE: {deleted} clauses blocked");
    deleted
}

fn bce_pivot(db: &ClauseDb, v: Var, config: &Config) -> usize {
    let p = Lit::pos(v);
    let n = Lit::neg(v);
    let mut deleted = 0;

    for &(l, flip_l) in &[(p, n), (n, p)] {
        let l_ids = db.occurs(l).lock().unwrap().clone();
        let flip_ids = db.occurs(flip_l).lock().unwrap().clone();
        if l_ids.len() > config.bce_limit || flip_ids.len() > config.bce_limit {
            continue;
        }

        for &c_id in &l_ids {
            let c_data = db.clause(c_id).snapshot();
            if c_data.is_deleted() || matches!(c_data.status, ClauseStatus::Learnt) {
                continue;
            }

            let mut all_tautological = true;
            for &d_id in &flip_ids {
                let d_data = db.clause(d_id).snapshot();
                if d_data.is_deleted() || matches!(d_data.status, ClauseStatus::Learnt) {
                    continue;
                }
                let tautological = c_data
                    .literals
                    .iter()
                    .any(|&cl| cl != l && d_data.literals.binary_search(&cl.flip()).is_ok());
                if !tautological {
                    all_tautological = false;
                    break;
                }
            }

            if all_tautological {
                db.delete(c_id);
                deleted += 1;
            }
        }
    }

    deleted
}

/// Equivalence-resolvent elimination: for each cross pair `(c+, c-)` whose
/// resolvent on the pivot is small and non-tautological, delete an existing
/// clause equal to that resolvent (it is redundant given `c+, c-`).
///
/// The inner bound test is applied as `OT[p].len() <= ere_limit &&
/// OT[flip(p)].len() <= ere_limit`, per the spec's resolution of an apparent
/// source bug where the loop variable served as both pivot index and literal.
pub fn ere(db: &ClauseDb, pool: &WorkerPool, pivots: &[Var], config: &Config) -> usize {
    if !config.ere_en {
        return 0;
    }
    let deleted = std::sync::atomic::AtomicUsize::new(0);
    pool.do_work_for_each(0, pivots.len(), 1, |i| {
        let d = ere_pivot(db, pivots[i], config);
        deleted.fetch_add(d, std::sync::atomic::Ordering::Relaxed);
    });
    pool.join().ok();
    let deleted = deleted.load(std::sync::atomic::Ordering::Relaxed);
    log::debug!(target: targets::ERE, "ERE: {deleted} redundant clauses removed");
    deleted
}

fn ere_pivot(db: &ClauseDb, v: Var, config: &Config) -> usize {
    let p = Lit::pos(v);
    let n = Lit::neg(v);
    let pos_ids = db.occurs(p).lock().unwrap().clone();
    let neg_ids = db.occurs(n).lock().unwrap().clone();
    if pos_ids.len() > config.ere_limit || neg_ids.len() > config.ere_limit {
        return 0;
    }

    let mut deleted = 0;
    for &cp in &pos_ids {
        let cp_data = db.clause(cp).snapshot();
        if cp_data.is_deleted() {
            continue;
        }
        for &cn in &neg_ids {
            let cn_data = db.clause(cn).snapshot();
            if cn_data.is_deleted() {
                continue;
            }

            let Some(resolvent) = resolve_on(&cp_data.literals, &cn_data.literals, v) else {
                continue;
            };
            if resolvent.len() <= 1 || resolvent.len() > config.max_ere_out {
                continue;
            }

            let best = best_lit(db, &resolvent);
            let sig = signature(&resolvent);
            let candidates = db.occurs(best).lock().unwrap().clone();
            for cand in candidates {
                if cand == cp || cand == cn {
                    continue;
                }
                let mut cand_data = db.clause(cand).lock();
                if cand_data.is_deleted() || cand_data.sig != sig {
                    continue;
                }
                if cand_data.literals == resolvent {
                    cand_data.status = ClauseStatus::Deleted;
                    deleted += 1;
                    break;
                }
            }
        }
    }
    deleted
}

/// Resolves `a` and `b` on variable `v`, returning `None` if the result is
/// tautological (some other complementary pair survives).
pub(crate) fn resolve_on(a: &[Lit], b: &[Lit], v: Var) -> Option<Vec<Lit>> {
    let mut out: Vec<Lit> = a.iter().chain(b.iter()).filter(|l| l.var() != v).copied().collect();
    out.sort_unstable();
    out.dedup();
    for w in out.windows(2) {
        if w[0].flip() == w[1] {
            return None;
        }
    }
    Some(out)
}

/// Picks the literal of `m` with the shortest current occurrence list, to
/// minimize the scan for an existing equal clause.
fn best_lit(db: &ClauseDb, m: &[Lit]) -> Lit {
    *m.iter()
        .min_by_key(|&&l| db.occurs(l).lock().unwrap().len())
        .expect("resolvent is non-empty by construction")
}

/// The fused `CE` driver: runs HSE and (when enabled) BCE together, per
/// pivot, in one pass over the elected set.
pub fn run_ce(db: &ClauseDb, pool: &WorkerPool, pivots: &[Var], config: &Config) -> CeOutcome {
    if !config.ce_en {
        return CeOutcome::default();
    }
    let (deleted, strengthened) = hse(db, pool, pivots, config);
    let blocked = bce(db, pool, pivots, config);
    CeOutcome {
        deleted,
        strengthened,
        blocked,
    }
}

/// Totals produced by one [`run_ce`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CeOutcome {
    pub deleted: usize,
    pub strengthened: usize,
    pub blocked: usize,
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
    fn subsumed_clause_is_deleted() {
        // (1 ∨ 2) subsumes (1 ∨ 2 ∨ 3).
        let db = db_with(3, &[&[(1, true), (2, true)], &[(1, true), (2, true), (3, true)]]);
        let pool = WorkerPool::new(2);
        db.create_ot(&pool, true).unwrap();
        let config = Config::default();
        let (deleted, _) = hse(&db, &pool, &[1, 2, 3], &config);
        assert_eq!(deleted, 1);
        assert!(db.clause(crate::structures::clause::ClauseId(1)).lock().is_deleted());
    }

    #[test]
    fn hse_limit_skips_pivots_whose_occurrence_list_is_too_long() {
        // Same subsumption as above, but with `hse_limit` set below either
        // polarity's occurrence count: the pivot is skipped outright.
        let db = db_with(3, &[&[(1, true), (2, true)], &[(1, true), (2, true), (3, true)]]);
        let pool = WorkerPool::new(2);
        db.create_ot(&pool, true).unwrap();
        let mut config = Config::default();
        config.hse_limit = 1;
        let (deleted, strengthened) = hse(&db, &pool, &[1, 2, 3], &config);
        assert_eq!(deleted, 0);
        assert_eq!(strengthened, 0);
        assert!(!db.clause(crate::structures::clause::ClauseId(1)).lock().is_deleted());
    }

    #[test]
    fn self_subsuming_clause_is_strengthened() {
        // (1 ∨ 2) and (¬1 ∨ 2 ∨ 3): self-subsumption strengthens the second to (2 ∨ 3).
        let db = db_with(3, &[&[(1, true), (2, true)], &[(1, false), (2, true), (3, true)]]);
        let pool = WorkerPool::new(2);
        db.create_ot(&pool, true).unwrap();
        let config = Config::default();
        let (_, strengthened) = hse(&db, &pool, &[1, 2, 3], &config);
        assert_eq!(strengthened, 1);
        let remaining = db.clause(crate::structures::clause::ClauseId(1)).snapshot();
        assert_eq!(remaining.literals, vec![Lit::pos(2), Lit::pos(3)]);
    }

    #[test]
    fn blocked_clause_is_removed() {
        // (1 ∨ 2) and (¬1 ∨ ¬2) resolve tautologically on var 1 (the other
        // survivor pair is 2, ¬2). Each is the other's only opposing clause,
        // so once the first is blocked and removed the second's own check
        // finds nothing left in `OT[flip(l)]` and is vacuously blocked too:
        // both are eliminated.
        let db = db_with(2, &[&[(1, true), (2, true)], &[(1, false), (2, false)]]);
        let pool = WorkerPool::new(2);
        db.create_ot(&pool, true).unwrap();
        let config = Config::default();
        let removed = bce(&db, &pool, &[1, 2], &config);
        assert_eq!(removed, 2);
    }

    #[test]
    fn resolve_on_detects_tautology() {
        let a = vec![Lit::pos(1), Lit::pos(2)];
        let b = vec![Lit::neg(1), Lit::neg(2)];
        assert!(resolve_on(&a, &b, 1).is_none());
    }
}
