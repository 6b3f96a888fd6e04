/*!
Bounded constraint propagation: draining the assignment trail against the
occurrence index `OT`, in parallel.

The richest of the three `prop()` contracts noted in `spec.md`'s Design Notes
is implemented here: every strengthening is a binary-collection sink candidate
when the clause lands at size two, every clause mutation happens under that
clause's own lock, and the trail itself is guarded by a single coordinator
lock rather than decomposed into the hand-rolled dual-condvar loop the source
describes -- `WorkerPool::do_work_for_each` already gives termination-detected
batch dispatch over an index range, so layering a second, bespoke
wait/notify loop on top of it would just be two copies of the same
synchronization primitive. See `DESIGN.md` for this resolution.
*/
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

use crate::db::ClauseDb;
use crate::misc::log::targets;
use crate::pool::WorkerPool;
use crate::structures::clause::ClauseId;
use crate::structures::literal::{Lit, Var};
use crate::types::err::PropagationError;

/// The default batch size handed to [`WorkerPool::do_work_for_each`] while
/// propagating; small enough that one worker stalling on a long occurrence
/// list doesn't stall the whole wave.
const PROP_BATCH: usize = 256;

/// `cnfstate`: the tri-state outcome of the whole simplification round.
#[derive(Debug, Default)]
pub struct CnfState(AtomicU8);

const UNSOLVED: u8 = 0;
const SAT: u8 = 1;
const UNSAT: u8 = 2;

/// The three values [`CnfState`] can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CnfStateValue {
    Unsolved,
    Sat,
    Unsat,
}

impl CnfState {
    pub fn get(&self) -> CnfStateValue {
        match self.0.load(Ordering::SeqCst) {
            SAT => CnfStateValue::Sat,
            UNSAT => CnfStateValue::Unsat,
            _ => CnfStateValue::Unsolved,
        }
    }

    pub fn is_unsat(&self) -> bool {
        self.0.load(Ordering::SeqCst) == UNSAT
    }

    pub fn set_unsat(&self) {
        self.0.store(UNSAT, Ordering::SeqCst);
    }

    pub fn set_sat(&self) {
        // UNSAT always wins a race against SAT: never downgrade a conflict.
        let _ = self
            .0
            .compare_exchange(UNSOLVED, SAT, Ordering::SeqCst, Ordering::SeqCst);
    }
}

/// The assignment state `SP`: a value per variable, plus the trail that
/// records assignment order and the `propagated` watermark.
#[derive(Debug)]
pub struct Assignment {
    values: Vec<Option<bool>>,
    trail: Vec<Lit>,
    /// The next untried index in `trail` -- literals `trail[..propagated]`
    /// have already had their consequences drawn out against `OT`.
    pub propagated: usize,
}

impl Assignment {
    pub fn new(max_var: Var) -> Self {
        Assignment {
            values: vec![None; max_var as usize],
            trail: Vec::new(),
            propagated: 0,
        }
    }

    /// The literal's truth value under the current assignment, or `None` if
    /// its variable is unassigned.
    pub fn value(&self, lit: Lit) -> Option<bool> {
        self.values[(lit.var() - 1) as usize].map(|v| v == lit.polarity())
    }

    /// Pushes `lit` onto the trail if its variable is unassigned. Returns
    /// `true` if it was newly enqueued, `false` if it was already true
    /// (a no-op) -- callers must check [`Assignment::value`] first if they
    /// need to detect a conflicting assignment.
    fn enqueue(&mut self, lit: Lit) -> bool {
        match self.values[(lit.var() - 1) as usize] {
            Some(_) => false,
            None => {
                self.values[(lit.var() - 1) as usize] = Some(lit.polarity());
                self.trail.push(lit);
                true
            }
        }
    }

    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }
}

/// A sink newly-born binary clauses are pushed onto during propagation, so
/// implication-graph reasoning can pick them up without a second scan of
/// `SCNF`.
#[derive(Debug, Default)]
pub struct BinarySink {
    clauses: Mutex<Vec<(Lit, Lit)>>,
}

impl BinarySink {
    pub fn new() -> Self {
        BinarySink::default()
    }

    fn push(&self, a: Lit, b: Lit) {
        self.clauses.lock().unwrap().push((a, b));
    }

    /// Drains every binary clause collected since the last drain.
    pub fn drain(&self) -> Vec<(Lit, Lit)> {
        std::mem::take(&mut self.clauses.lock().unwrap())
    }
}

/// Bounded, parallel unit propagation over a [`ClauseDb`].
pub struct Propagator {
    assignment: Mutex<Assignment>,
    state: CnfState,
}

impl Propagator {
    pub fn new(max_var: Var) -> Self {
        Propagator {
            assignment: Mutex::new(Assignment::new(max_var)),
            state: CnfState::default(),
        }
    }

    pub fn state(&self) -> CnfStateValue {
        self.state.get()
    }

    /// The literal's current value, or `None` if unassigned.
    pub fn value(&self, lit: Lit) -> Option<bool> {
        self.assignment.lock().unwrap().value(lit)
    }

    /// A snapshot of the trail in assignment order.
    pub fn trail_snapshot(&self) -> Vec<Lit> {
        self.assignment.lock().unwrap().trail().to_vec()
    }

    /// Unconditionally enqueues `lit` as forced. If its variable is already
    /// assigned the opposite way, the conflict is recorded on [`CnfState`].
    /// Returns `true` if `lit` was newly enqueued.
    pub fn enqueue(&self, lit: Lit) -> bool {
        let mut a = self.assignment.lock().unwrap();
        match a.value(lit) {
            Some(false) => {
                self.state.set_unsat();
                false
            }
            Some(true) => false,
            None => a.enqueue(lit),
        }
    }

    /// Drains the trail against `db` in parallel, in waves of
    /// `[propagated, trail.len())`, until no new literal was produced.
    ///
    /// Returns the number of literals forced during this call, or `-1` if
    /// the empty clause was derived.
    pub fn propagate(
        &self,
        db: &ClauseDb,
        pool: &WorkerPool,
        sink: Option<&BinarySink>,
    ) -> Result<i64, PropagationError> {
        let initial_len = self.assignment.lock().unwrap().trail().len();

        loop {
            if self.state.is_unsat() {
                return Err(PropagationError::Conflict);
            }
            let (start, end) = {
                let a = self.assignment.lock().unwrap();
                (a.propagated, a.trail.len())
            };
            if start == end {
                break;
            }

            pool.do_work_for_each(start, end, PROP_BATCH, |i| {
                let lit = self.assignment.lock().unwrap().trail[i];
                self.propagate_one(db, lit, sink);
            });
            pool.join().ok();

            self.assignment.lock().unwrap().propagated = end;

            if self.state.is_unsat() {
                return Err(PropagationError::Conflict);
            }
        }

        let forced = self.assignment.lock().unwrap().trail().len() - initial_len;
        log::trace!(target: targets::PROPAGATION, "prop(): forced {forced} literals");
        Ok(forced as i64)
    }

    /// Resolves every consequence of `lit` having just been assigned true:
    /// satisfies `OT[lit]`, strengthens `OT[flip(lit)]`.
    fn propagate_one(&self, db: &ClauseDb, lit: Lit, sink: Option<&BinarySink>) {
        let satisfied_ids: Vec<ClauseId> = db.occurs(lit).lock().unwrap().clone();
        for id in satisfied_ids {
            db.delete(id);
        }

        let flip = lit.flip();
        let falsified_ids: Vec<ClauseId> = db.occurs(flip).lock().unwrap().clone();
        for id in falsified_ids {
            let mut data = db.clause(id).lock();
            if data.is_deleted() {
                continue;
            }
            let already_true = {
                let a = self.assignment.lock().unwrap();
                data.literals.iter().any(|&l| l != flip && a.value(l) == Some(true))
            };
            if already_true {
                continue;
            }

            data.strengthen(flip);
            match data.len() {
                0 => {
                    self.state.set_unsat();
                }
                1 => {
                    let remaining = data.literals[0];
                    drop(data);
                    let mut a = self.assignment.lock().unwrap();
                    match a.value(remaining) {
                        Some(false) => {
                            drop(a);
                            self.state.set_unsat();
                        }
                        Some(true) => {}
                        None => {
                            a.enqueue(remaining);
                        }
                    }
                }
                2 => {
                    if let Some(sink) = sink {
                        sink.push(data.literals[0], data.literals[1]);
                    }
                }
                _ => {}
            }
        }

        db.occurs(lit).lock().unwrap().clear();
        db.occurs(flip).lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::clause::ClauseStatus;

    fn unit_chain_db() -> (ClauseDb, Var) {
        // (x1) ∧ (¬x1 ∨ x2) ∧ (¬x2 ∨ x3)
        let max_var = 3;
        let mut db = ClauseDb::new(max_var, usize::MAX);
        db.add_clause(vec![Lit::pos(1)], ClauseStatus::Original);
        db.add_clause(vec![Lit::neg(1), Lit::pos(2)], ClauseStatus::Original);
        db.add_clause(vec![Lit::neg(2), Lit::pos(3)], ClauseStatus::Original);
        (db, max_var)
    }

    #[test]
    fn unit_propagation_forces_the_whole_chain() {
        let (db, max_var) = unit_chain_db();
        let pool = WorkerPool::new(2);
        db.create_ot(&pool, true).unwrap();

        let prop = Propagator::new(max_var);
        prop.enqueue(Lit::pos(1));
        let forced = prop.propagate(&db, &pool, None).unwrap();

        assert_eq!(forced, 3);
        assert_eq!(prop.state(), CnfStateValue::Unsolved);
        assert_eq!(prop.value(Lit::pos(1)), Some(true));
        assert_eq!(prop.value(Lit::pos(2)), Some(true));
        assert_eq!(prop.value(Lit::pos(3)), Some(true));
    }

    #[test]
    fn conflicting_unit_clauses_are_detected() {
        let max_var = 1;
        let mut db = ClauseDb::new(max_var, usize::MAX);
        db.add_clause(vec![Lit::pos(1)], ClauseStatus::Original);
        db.add_clause(vec![Lit::neg(1)], ClauseStatus::Original);
        let pool = WorkerPool::new(2);
        db.create_ot(&pool, true).unwrap();

        let prop = Propagator::new(max_var);
        prop.enqueue(Lit::pos(1));
        prop.enqueue(Lit::neg(1));
        let result = prop.propagate(&db, &pool, None);
        assert_eq!(result, Err(PropagationError::Conflict));
        assert_eq!(prop.state(), CnfStateValue::Unsat);
    }

    #[test]
    fn strengthening_collects_new_binaries_on_the_sink() {
        // (x1) ∧ (¬x1 ∨ x2 ∨ x3): strengthens to a binary once x1 is true.
        let max_var = 3;
        let mut db = ClauseDb::new(max_var, usize::MAX);
        db.add_clause(vec![Lit::pos(1)], ClauseStatus::Original);
        db.add_clause(
            vec![Lit::neg(1), Lit::pos(2), Lit::pos(3)],
            ClauseStatus::Original,
        );
        let pool = WorkerPool::new(2);
        db.create_ot(&pool, true).unwrap();

        let prop = Propagator::new(max_var);
        let sink = BinarySink::new();
        prop.enqueue(Lit::pos(1));
        prop.propagate(&db, &pool, Some(&sink)).unwrap();

        let born = sink.drain();
        assert_eq!(born.len(), 1);
        assert_eq!(born[0], (Lit::pos(2), Lit::pos(3)));
    }

    #[test]
    fn bcp_is_confluent_across_worker_counts() {
        let (db, max_var) = unit_chain_db();
        let pool2 = WorkerPool::new(2);
        db.create_ot(&pool2, true).unwrap();
        let prop2 = Propagator::new(max_var);
        prop2.enqueue(Lit::pos(1));
        prop2.propagate(&db, &pool2, None).unwrap();

        let (db2, max_var2) = unit_chain_db();
        let pool5 = WorkerPool::new(5);
        db2.create_ot(&pool5, true).unwrap();
        let prop5 = Propagator::new(max_var2);
        prop5.enqueue(Lit::pos(1));
        prop5.propagate(&db2, &pool5, None).unwrap();

        assert_eq!(prop2.trail_snapshot(), prop5.trail_snapshot());
        assert_eq!(prop2.state(), prop5.state());
    }
}
