/*!
Gate recognition for bounded variable elimination: equivalence/NOT,
AND/OR, if-then-else, and XOR, per `spec.md` §4.5's priority order (tried
in that sequence; the first match wins for a given pivot).

Every gate is represented the same way once found -- a `pos_gate` (clauses
containing the pivot's positive literal that define the gate) and a
`neg_gate` (clauses containing its negative literal) -- so
[`super::gate_resolvents`] can substitute any of the four kinds with one
routine: every `pos_gate` clause resolves against every clause outside the
gate that carries the negative literal, and every `neg_gate` clause
resolves against every outside clause carrying the positive one.
*/
use std::collections::HashMap;

use crate::config::Config;
use crate::db::ClauseDb;
use crate::structures::clause::ClauseId;
use crate::structures::literal::Lit;

/// A recognized gate: the clauses that define it, split by which side of
/// the pivot they carry.
pub struct GateMatch {
    pub pos_gate: Vec<(ClauseId, Vec<Lit>)>,
    pub neg_gate: Vec<(ClauseId, Vec<Lit>)>,
}

fn snapshot(db: &ClauseDb, ids: &[ClauseId]) -> Vec<(ClauseId, Vec<Lit>)> {
    ids.iter()
        .filter_map(|&id| {
            let c = db.clause(id).snapshot();
            if c.is_deleted() {
                None
            } else {
                Some((id, c.literals))
            }
        })
        .collect()
}

/// Equivalence/NOT gate: a pair of binary clauses `(¬p∨q)`, `(p∨¬q)`
/// asserting `p ≡ q`. `p` is the pivot's positive literal, `n` its negative.
pub fn find_equivalence_gate(db: &ClauseDb, p: Lit, n: Lit) -> Option<GateMatch> {
    let n_ids = db.occurs(n).lock().unwrap().clone();
    let p_ids = db.occurs(p).lock().unwrap().clone();
    let p_bin = snapshot(db, &p_ids);

    for (c_id, c_lits) in snapshot(db, &n_ids) {
        if c_lits.len() != 2 {
            continue;
        }
        let q = *c_lits.iter().find(|&&l| l != n)?;
        for &(d_id, ref d_lits) in &p_bin {
            if d_lits.len() != 2 {
                continue;
            }
            if d_lits.contains(&p) && d_lits.contains(&q.flip()) {
                return Some(GateMatch {
                    pos_gate: vec![(d_id, d_lits.clone())],
                    neg_gate: vec![(c_id, c_lits.clone())],
                });
            }
        }
    }
    None
}

/// AND/OR gate: a set of binary fan-in clauses `(¬p∨l_i)` for `i in 1..=k`
/// paired with a single closing clause `(p∨¬l_1∨...∨¬l_k)`. (An OR gate is
/// the same shape with `p`/`n` swapped by the caller.)
pub fn find_and_or_gate(db: &ClauseDb, p: Lit, n: Lit) -> Option<GateMatch> {
    let n_ids = db.occurs(n).lock().unwrap().clone();
    let p_ids = db.occurs(p).lock().unwrap().clone();

    let mut fanin_map: HashMap<Lit, (ClauseId, Vec<Lit>)> = HashMap::new();
    for (id, lits) in snapshot(db, &n_ids) {
        if lits.len() == 2 {
            let li = *lits.iter().find(|&&l| l != n)?;
            fanin_map.entry(li).or_insert((id, lits));
        }
    }
    if fanin_map.is_empty() {
        return None;
    }

    for (closing_id, closing_lits) in snapshot(db, &p_ids) {
        if closing_lits.len() < 2 || !closing_lits.contains(&p) {
            continue;
        }
        let others: Vec<Lit> = closing_lits.iter().copied().filter(|&l| l != p).collect();
        let mut fanins = Vec::with_capacity(others.len());
        let mut ok = true;
        for &neg_lit in &others {
            let li = neg_lit.flip();
            match fanin_map.get(&li) {
                Some(entry) => fanins.push(entry.clone()),
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok && !fanins.is_empty() {
            return Some(GateMatch {
                pos_gate: vec![(closing_id, closing_lits.clone())],
                neg_gate: fanins,
            });
        }
    }
    None
}

/// If-then-else gate: `(p∨y∨z)`, `(p∨¬y∨w)` paired with `(¬p∨y∨¬z)`,
/// `(¬p∨¬y∨¬w)`, encoding `p = ite(y, z, w)`.
pub fn find_ite_gate(db: &ClauseDb, p: Lit, n: Lit) -> Option<GateMatch> {
    let p_ids = db.occurs(p).lock().unwrap().clone();
    let n_ids = db.occurs(n).lock().unwrap().clone();
    let p_tern: Vec<(ClauseId, Vec<Lit>)> = snapshot(db, &p_ids).into_iter().filter(|(_, l)| l.len() == 3).collect();
    let n_tern: Vec<(ClauseId, Vec<Lit>)> = snapshot(db, &n_ids).into_iter().filter(|(_, l)| l.len() == 3).collect();

    for &(c1_id, ref c1) in &p_tern {
        let rest1: Vec<Lit> = c1.iter().copied().filter(|&l| l != p).collect();
        if rest1.len() != 2 {
            continue;
        }
        for &y in &rest1 {
            let z = *rest1.iter().find(|&&l| l != y).unwrap();

            for &(c2_id, ref c2) in &p_tern {
                if c2_id == c1_id {
                    continue;
                }
                if !c2.contains(&y.flip()) {
                    continue;
                }
                let w = *c2.iter().find(|&&l| l != p && l != y.flip())?;

                let d1 = n_tern.iter().find(|(_, l)| l.contains(&y) && l.contains(&z.flip()));
                let d2 = n_tern.iter().find(|(_, l)| l.contains(&y.flip()) && l.contains(&w.flip()));
                if let (Some(&(d1_id, ref d1_lits)), Some(&(d2_id, ref d2_lits))) = (d1, d2) {
                    return Some(GateMatch {
                        pos_gate: vec![(c1_id, c1.clone()), (c2_id, c2.clone())],
                        neg_gate: vec![(d1_id, d1_lits.clone()), (d2_id, d2_lits.clone())],
                    });
                }
            }
        }
    }
    None
}

/// XOR gate: the full `2^k`-clause parity encoding over the pivot and `k`
/// other variables (every sign pattern with an odd number of negated
/// literals among `{p-or-n, l_1, ..., l_k}` is a required clause).
pub fn find_xor_gate(db: &ClauseDb, p: Lit, config: &Config) -> Option<GateMatch> {
    let p_ids = db.occurs(p).lock().unwrap().clone();

    'candidates: for (base_id, base_lits) in snapshot(db, &p_ids) {
        let k = base_lits.len().saturating_sub(1);
        if k == 0 || k > config.xor_max_arity {
            continue;
        }
        let vars: Vec<crate::structures::literal::Var> =
            base_lits.iter().filter(|&&l| l != p).map(|l| l.var()).collect();
        let pivot_var = p.var();

        // For each of the 2^(k+1) sign patterns over {pivot} ∪ vars, an odd
        // number of negated literals is required. Collect all such clauses
        // and check each is present as a live clause somewhere in the db.
        let mut gate_clauses: Vec<(ClauseId, Vec<Lit>)> = Vec::with_capacity(1 << (k + 1));
        let all_vars: Vec<crate::structures::literal::Var> =
            std::iter::once(pivot_var).chain(vars.iter().copied()).collect();

        for mask in 0u32..(1 << all_vars.len()) {
            let neg_count = mask.count_ones();
            if neg_count % 2 == 0 {
                continue;
            }
            let mut lits: Vec<Lit> = all_vars
                .iter()
                .enumerate()
                .map(|(i, &v)| Lit::new(v, mask & (1 << i) == 0))
                .collect();
            lits.sort_unstable();

            match find_exact_clause(db, &lits) {
                Some((id, found_lits)) => gate_clauses.push((id, found_lits)),
                None => continue 'candidates,
            }
        }

        let (pos_gate, neg_gate): (Vec<_>, Vec<_>) =
            gate_clauses.into_iter().partition(|(_, l)| l.contains(&p));
        return Some(GateMatch { pos_gate, neg_gate });
    }
    None
}

fn find_exact_clause(db: &ClauseDb, literals: &[Lit]) -> Option<(ClauseId, Vec<Lit>)> {
    let ids = db.occurs(literals[0]).lock().unwrap().clone();
    for id in ids {
        let c = db.clause(id).snapshot();
        if !c.is_deleted() && c.literals == literals {
            return Some((id, c.literals));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::WorkerPool;
    use crate::structures::clause::ClauseStatus;

    #[test]
    fn equivalence_gate_is_recognized() {
        let mut db = ClauseDb::new(2, usize::MAX);
        let p = Lit::pos(1);
        let n = Lit::neg(1);
        let q = Lit::pos(2);
        db.add_clause(vec![n, q], ClauseStatus::Original);
        db.add_clause(vec![p, q.flip()], ClauseStatus::Original);
        let pool = WorkerPool::new(2);
        db.create_ot(&pool, true).unwrap();

        let gate = find_equivalence_gate(&db, p, n).unwrap();
        assert_eq!(gate.pos_gate.len(), 1);
        assert_eq!(gate.neg_gate.len(), 1);
    }

    #[test]
    fn and_gate_is_recognized_with_extra_occurrences() {
        // (¬g∨a),(¬g∨b),(g∨¬a∨¬b),(g∨c),(¬g∨d)
        let mut db = ClauseDb::new(5, usize::MAX);
        let g = Lit::pos(1);
        let a = Lit::pos(2);
        let b = Lit::pos(3);
        let c = Lit::pos(4);
        let d = Lit::pos(5);
        db.add_clause(vec![g.flip(), a], ClauseStatus::Original);
        db.add_clause(vec![g.flip(), b], ClauseStatus::Original);
        db.add_clause(vec![g, a.flip(), b.flip()], ClauseStatus::Original);
        db.add_clause(vec![g, c], ClauseStatus::Original);
        db.add_clause(vec![g.flip(), d], ClauseStatus::Original);
        let pool = WorkerPool::new(2);
        db.create_ot(&pool, true).unwrap();

        let gate = find_and_or_gate(&db, g, g.flip()).unwrap();
        assert_eq!(gate.pos_gate.len(), 1);
        assert_eq!(gate.neg_gate.len(), 2);
    }
}
