/*!
Per-variable elimination state (`vstate`): `ACTIVE`, `FROZEN`, or `MELTED`.

Tracked separately from [`crate::structures::clause::ClauseData`] since it's
a property of the *variable*, not any one clause, and is read by both BVE
(to skip already-melted pivots) and the outer driver's LCVE scoring (which
only considers active variables).
*/
use std::sync::atomic::{AtomicU8, Ordering};

use crate::structures::literal::Var;

const ACTIVE: u8 = 0;
const FROZEN: u8 = 1;
const MELTED: u8 = 2;

/// A variable's elimination state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VState {
    /// Eligible for elimination and present in the live formula.
    Active,

    /// Temporarily untouchable in the current pass (e.g. while a concurrent
    /// pivot's gate recognition holds its clauses molten).
    Frozen,

    /// Eliminated; appears in no non-deleted clause and has a reconstruction
    /// log witness.
    Melted,
}

fn decode(v: u8) -> VState {
    match v {
        FROZEN => VState::Frozen,
        MELTED => VState::Melted,
        _ => VState::Active,
    }
}

fn encode(v: VState) -> u8 {
    match v {
        VState::Active => ACTIVE,
        VState::Frozen => FROZEN,
        VState::Melted => MELTED,
    }
}

/// One atomic state cell per variable, `1..=max_var`.
pub struct VarStates {
    states: Vec<AtomicU8>,
}

impl VarStates {
    pub fn new(max_var: Var) -> Self {
        VarStates {
            states: (0..max_var).map(|_| AtomicU8::new(ACTIVE)).collect(),
        }
    }

    pub fn get(&self, v: Var) -> VState {
        decode(self.states[(v - 1) as usize].load(Ordering::SeqCst))
    }

    pub fn set(&self, v: Var, state: VState) {
        self.states[(v - 1) as usize].store(encode(state), Ordering::SeqCst);
    }

    pub fn is_active(&self, v: Var) -> bool {
        self.get(v) == VState::Active
    }

    /// The number of variables still `Active`.
    pub fn active_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| decode(s.load(Ordering::SeqCst)) == VState::Active)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_start_active() {
        let vs = VarStates::new(5);
        for v in 1..=5 {
            assert!(vs.is_active(v));
        }
        assert_eq!(vs.active_count(), 5);
    }

    #[test]
    fn melted_variables_are_no_longer_active() {
        let vs = VarStates::new(3);
        vs.set(2, VState::Melted);
        assert_eq!(vs.get(2), VState::Melted);
        assert_eq!(vs.active_count(), 2);
    }
}
