/*!
Phase D of implication-graph reasoning: a queue-driven exploration of the
graph in child-before-parent order that merges reachability sets, detects
failed literals, and (optionally) performs hyper-binary resolution.

The queue is processed by the calling (coordinator) thread rather than
fanned out across [`crate::pool::WorkerPool`] workers: the node lock
discipline below (read locks on children taken and released one at a time,
per the concurrency design notes) is what makes a worker-parallel version
safe, but a single-threaded drain of the same queue is a valid
specialization of it and keeps the control flow -- requeueing a literal
whose children aren't all explored yet -- straightforward to follow.
*/
use std::collections::{HashSet, VecDeque};

use crate::config::Config;
use crate::db::ClauseDb;
use crate::misc::log::targets;
use crate::propagate::Propagator;
use crate::structures::clause::ClauseStatus;
use crate::structures::literal::Lit;
use crate::types::err::IgrError;

use super::ImplicationGraph;

/// Summary of one [`explore`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExplorationOutcome {
    pub failed_literals: usize,
    pub hbr_clauses: usize,
}

/// Runs Phase D to completion: seeds the queue with literals whose children
/// are all explored already (including orphans, which vacuously qualify),
/// then drains it, requeueing any literal found not yet ready.
pub fn explore(
    graph: &ImplicationGraph,
    db: &mut ClauseDb,
    prop: &Propagator,
    config: &Config,
) -> Result<ExplorationOutcome, IgrError> {
    let mut outcome = ExplorationOutcome::default();
    let mut hbr_budget = config.hbr_max;

    let mut queue: VecDeque<Lit> = graph
        .literals()
        .filter(|&lit| {
            let node = graph.node(lit).read();
            !node.reduced && !node.explored && children_all_explored(graph, &node.children)
        })
        .collect();

    let mut stall_guard = 0usize;
    let stall_limit = queue.len().max(1) * 4 + 16;

    while let Some(lit) = queue.pop_front() {
        let lit = graph.resolve(lit);

        let ready = {
            let node = graph.node(lit).read();
            if node.explored {
                continue;
            }
            children_all_explored(graph, &node.children)
        };
        if !ready {
            queue.push_back(lit);
            stall_guard += 1;
            if stall_guard > stall_limit {
                // every remaining literal in the queue is waiting on a cycle
                // that can only be broken by SCC collapse -- nothing left to
                // explore productively this pass.
                break;
            }
            continue;
        }
        stall_guard = 0;

        merge_descendants(graph, lit);

        let entails_contradiction = graph.node(lit).read().descendants.binary_search(&lit.flip()).is_ok();

        if entails_contradiction && config.fle_en {
            handle_failed_literal(graph, prop, lit)?;
            outcome.failed_literals += 1;
        } else {
            if config.hbr_en {
                let added = try_hyper_binary_resolution(graph, db, prop, lit, &mut hbr_budget)?;
                outcome.hbr_clauses += added;
            }
            graph.node(lit).write().explored = true;
        }

        let parents: Vec<Lit> = graph
            .node(lit)
            .read()
            .parents
            .iter()
            .map(|&(p, _)| graph.resolve(p))
            .collect();
        for p in parents {
            if !graph.node(p).read().explored {
                queue.push_back(p);
            }
        }
    }

    log::debug!(
        target: targets::IGR,
        "DFS exploration: {} failed literals, {} HBR clauses",
        outcome.failed_literals,
        outcome.hbr_clauses
    );
    Ok(outcome)
}

fn children_all_explored(graph: &ImplicationGraph, children: &[super::Edge]) -> bool {
    children.iter().all(|&(c, _)| {
        let c = graph.resolve(c);
        graph.node(c).read().explored
    })
}

fn merge_descendants(graph: &ImplicationGraph, lit: Lit) {
    let children: Vec<Lit> = graph
        .node(lit)
        .read()
        .children
        .iter()
        .map(|&(c, _)| graph.resolve(c))
        .collect();

    let mut to_add = Vec::new();
    for c in &children {
        to_add.push(*c);
        to_add.extend(graph.node(*c).read().descendants.iter().copied());
    }

    let mut node = graph.node(lit).write();
    for d in to_add {
        node.insert_descendant(d);
    }
}

/// A failed literal: `lit` entails `flip(lit)`. Forces `flip(lit)` (and,
/// transitively, everything it in turn forces is picked up by the next
/// `prop()` call) and clears `lit`'s outgoing edges since it is now subsumed
/// by the unit assignment.
fn handle_failed_literal(graph: &ImplicationGraph, prop: &Propagator, lit: Lit) -> Result<(), IgrError> {
    if prop.value(lit) == Some(true) {
        return Err(IgrError::Conflict);
    }
    prop.enqueue(lit.flip());
    let mut node = graph.node(lit).write();
    node.explored = true;
    node.children.clear();
    Ok(())
}

/// Computes the transitive closure `{lit} ∪ children(lit) ∪ descendants(lit)`
/// and the propagation closure reached from it (unit-implied literals found
/// by scanning every clause for exactly one undetermined literal), and
/// attaches a new binary clause `(flip(lit), u)` for every literal `u` in the
/// propagation closure but not the transitive one.
///
/// Per the worked example of a chain `(¬a∨b),(¬a∨c),(¬b∨¬c∨d)` entailing
/// `(¬a∨d)`: the emitted clause is the implication `lit -> u`, stored with
/// `lit`'s negation first. (`spec.md`'s prose describes the emitted clause as
/// `(¬u, ¬lit)`, which the worked example contradicts for any run where `u`
/// is not `lit` itself; the clause form used here is the one the example
/// demonstrates.)
fn try_hyper_binary_resolution(
    graph: &ImplicationGraph,
    db: &mut ClauseDb,
    prop: &Propagator,
    lit: Lit,
    hbr_budget: &mut Option<usize>,
) -> Result<usize, IgrError> {
    if *hbr_budget == Some(0) {
        return Ok(0);
    }

    let transitive: HashSet<Lit> = {
        let node = graph.node(lit).read();
        let mut s: HashSet<Lit> = node.children.iter().map(|&(c, _)| graph.resolve(c)).collect();
        s.extend(node.descendants.iter().copied());
        s.insert(lit);
        s
    };

    let closure = propagation_closure(db, prop, lit, &transitive)?;

    let mut added = 0;
    for &u in &closure {
        if transitive.contains(&u) {
            continue;
        }
        if *hbr_budget == Some(0) {
            break;
        }

        let mut literals = vec![lit.flip(), u];
        literals.sort_unstable();
        literals.dedup();
        if literals.len() == 1 {
            // lit.flip() == u: the clause would be a tautology-free unit;
            // treat as an immediate forced assignment instead of a binary clause.
            prop.enqueue(u);
            continue;
        }

        let id = db.add_clause(literals.clone(), ClauseStatus::Learnt);
        db.occurs(literals[0]).lock().unwrap().push(id);
        db.occurs(literals[1]).lock().unwrap().push(id);
        graph.add_edge(literals[0], literals[1], id);

        added += 1;
        if let Some(b) = hbr_budget {
            *b -= 1;
        }
    }

    Ok(added)
}

/// Starting from `transitive`, repeatedly scans `db` for a clause with
/// exactly one literal not yet falsified by the growing closure (every other
/// literal's flip is in the closure, or already false in `prop`), adding that
/// literal. A clause whose single undetermined literal is `flip(lit)` is a
/// second derivation of the same failed literal; reported as a conflict so
/// the caller short-circuits to the Phase D failed-literal handling instead.
fn propagation_closure(
    db: &ClauseDb,
    prop: &Propagator,
    lit: Lit,
    transitive: &HashSet<Lit>,
) -> Result<HashSet<Lit>, IgrError> {
    let mut closure = transitive.clone();
    loop {
        let mut newly_implied = Vec::new();
        for id in db.all_ids() {
            let data = db.clause(id).lock();
            if data.is_deleted() {
                continue;
            }
            if data
                .literals
                .iter()
                .any(|&l| closure.contains(&l) || prop.value(l) == Some(true))
            {
                continue;
            }

            let mut undetermined = None;
            let mut more_than_one = false;
            for &l in &data.literals {
                let falsified = closure.contains(&l.flip()) || prop.value(l) == Some(false);
                if !falsified {
                    if undetermined.is_some() {
                        more_than_one = true;
                        break;
                    }
                    undetermined = Some(l);
                }
            }
            if more_than_one {
                continue;
            }
            if let Some(u) = undetermined {
                if u == lit.flip() {
                    return Err(IgrError::Conflict);
                }
                if !closure.contains(&u) {
                    newly_implied.push(u);
                }
            }
        }
        if newly_implied.is_empty() {
            break;
        }
        closure.extend(newly_implied);
    }
    Ok(closure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::clause::{ClauseId, ClauseStatus};

    #[test]
    fn failed_literal_is_detected_on_a_chain_back_to_its_own_negation() {
        // x1 -> x2 -> x3 -> ¬x1
        let g = ImplicationGraph::new(3);
        let x1 = Lit::pos(1);
        let x2 = Lit::pos(2);
        let x3 = Lit::pos(3);
        g.build([
            (x1.flip(), x2, ClauseId(0)),
            (x2.flip(), x3, ClauseId(1)),
            (x3.flip(), x1.flip(), ClauseId(2)),
        ]);

        let mut db = ClauseDb::new(3, usize::MAX);
        let prop = Propagator::new(3);
        let config = Config::default();
        let outcome = explore(&g, &mut db, &prop, &config).unwrap();

        assert_eq!(outcome.failed_literals, 1);
        assert_eq!(prop.value(x1), Some(false));
    }

    #[test]
    fn hyper_binary_resolution_finds_the_chain_consequence() {
        // (¬a∨b),(¬a∨c),(¬b∨¬c∨d): assuming a, d is forced though only
        // {a,b,c} are in the transitive (binary-only) closure.
        let g = ImplicationGraph::new(4);
        let a = Lit::pos(1);
        let b = Lit::pos(2);
        let c = Lit::pos(3);
        let d = Lit::pos(4);
        g.build([(a.flip(), b, ClauseId(0)), (a.flip(), c, ClauseId(1))]);

        let mut db = ClauseDb::new(4, usize::MAX);
        db.add_clause(vec![b.flip(), c.flip(), d], ClauseStatus::Original);

        let prop = Propagator::new(4);
        let config = Config::default();
        let outcome = explore(&g, &mut db, &prop, &config).unwrap();

        assert_eq!(outcome.hbr_clauses, 1);
        // The new binary (¬a ∨ d) makes a a parent of d: d's node should now
        // have an edge back from a.flip()'s children set.
        assert!(g.node(a.flip()).read().children.iter().any(|&(l, _)| l == d));
    }
}
