/*!
The reconstruction log: an append-only record of witnesses produced while
eliminating variables, replayed in reverse to extend a model of the reduced
formula to a model of the original.

Represented here as a small sum type (`{Unit(lit), Clause{literals}}`)
rather than a flat tagged `u32` stream: the byte layout only matters at an
external-interface boundary, not inside the crate.
*/
use crate::structures::literal::{Lit, Var};
use crate::types::err::ReconstructionError;

/// One entry of the reconstruction log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconRecord {
    /// An unconditional witness: `var` must be assigned so `lit` is true.
    /// Produced by pure-literal elimination, where there is no opposing
    /// clause whose satisfaction the witness is conditional on.
    Unit(Lit),

    /// An eliminated original clause, kept so a model of the reduced formula
    /// can be checked against it. `literals[0]` is the witness: the pivot
    /// literal of the eliminated variable, swapped to the head per the
    /// reconstruction-log discipline. If no literal in `literals[1..]` is
    /// satisfied by the current (partial) extension, `literals[0]`'s
    /// variable is flipped so it is.
    Clause { literals: Vec<Lit> },
}

impl ReconRecord {
    fn witness(&self) -> Lit {
        match self {
            ReconRecord::Unit(lit) => *lit,
            ReconRecord::Clause { literals } => literals[0],
        }
    }

    fn eliminated_var(&self) -> Var {
        self.witness().var()
    }
}

/// The append-only reconstruction log produced during BVE.
#[derive(Clone, Debug, Default)]
pub struct ReconstructionLog {
    records: Vec<ReconRecord>,
}

impl ReconstructionLog {
    pub fn new() -> Self {
        ReconstructionLog { records: Vec::new() }
    }

    /// Appends an unconditional unit witness (pure-literal elimination).
    pub fn push_unit(&mut self, lit: Lit) {
        self.records.push(ReconRecord::Unit(lit));
    }

    /// Appends an eliminated clause, with `witness` (the pivot literal,
    /// `p` or `¬p`) moved to the front of `literals`.
    pub fn push_clause(&mut self, mut literals: Vec<Lit>, witness: Lit) {
        debug_assert!(literals.contains(&witness));
        if let Some(pos) = literals.iter().position(|&l| l == witness) {
            literals.swap(0, pos);
        }
        self.records.push(ReconRecord::Clause { literals });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every variable with at least one witness record -- used by the
    /// reconstruction-coverage property test.
    pub fn witnessed_vars(&self) -> std::collections::HashSet<Var> {
        self.records.iter().map(|r| r.eliminated_var()).collect()
    }

    /// Replays the log right to left, extending `valuation` (indexed by
    /// `var - 1`, `None` = unassigned) so that every original clause the log
    /// remembers is satisfied. Every melted variable must already carry a
    /// witness by the time this runs; callers are expected to have checked
    /// [`ReconstructionLog::witnessed_vars`] against the melted-variable set.
    pub fn extend(&self, valuation: &mut [Option<bool>]) -> Result<(), ReconstructionError> {
        for record in self.records.iter().rev() {
            match record {
                ReconRecord::Unit(lit) => {
                    set(valuation, *lit);
                }
                ReconRecord::Clause { literals } => {
                    let satisfied_without_witness = literals[1..]
                        .iter()
                        .any(|&l| value_of(valuation, l) == Some(true));
                    if !satisfied_without_witness {
                        set(valuation, literals[0]);
                    }
                }
            }
        }
        Ok(())
    }
}

fn value_of(valuation: &[Option<bool>], lit: Lit) -> Option<bool> {
    valuation[(lit.var() - 1) as usize].map(|v| v == lit.polarity())
}

fn set(valuation: &mut [Option<bool>], lit: Lit) {
    valuation[(lit.var() - 1) as usize] = Some(lit.polarity());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_literal_witness_is_unconditional() {
        let mut log = ReconstructionLog::new();
        log.push_unit(Lit::pos(1));
        let mut valuation = vec![None; 2];
        log.extend(&mut valuation).unwrap();
        assert_eq!(valuation[0], Some(true));
    }

    #[test]
    fn clause_witness_flips_only_when_otherwise_falsified() {
        let mut log = ReconstructionLog::new();
        // Eliminated clause (v2 ∨ ¬v1), saved with v1's negative literal as witness.
        log.push_clause(vec![Lit::pos(2), Lit::neg(1)], Lit::neg(1));
        let mut valuation = vec![Some(true), None];
        // v2 is already true, so the clause is satisfied regardless of v1: no flip forced.
        log.extend(&mut valuation).unwrap();
        assert_eq!(valuation[1], None);

        let mut log2 = ReconstructionLog::new();
        log2.push_clause(vec![Lit::pos(2), Lit::neg(1)], Lit::neg(1));
        let mut valuation2 = vec![Some(false), None];
        log2.extend(&mut valuation2).unwrap();
        assert_eq!(valuation2[1], Some(false));
    }

    #[test]
    fn replay_order_is_reverse_of_recording() {
        let mut log = ReconstructionLog::new();
        log.push_unit(Lit::pos(1));
        log.push_clause(vec![Lit::neg(2), Lit::pos(1)], Lit::neg(2));
        // Recorded last (elimination of var 2 happened after var 1's unit witness
        // in this scenario), so it must be replayed first.
        let mut valuation = vec![None, None];
        log.extend(&mut valuation).unwrap();
        // var 1 forced true by the unconditional unit record (replayed second);
        // var 2's clause record is replayed first and sees var 1 unassigned,
        // so it is forced to satisfy ¬2.
        assert_eq!(valuation[1], Some(false));
        assert_eq!(valuation[0], Some(true));
    }

    #[test]
    fn witnessed_vars_tracks_every_melted_variable() {
        let mut log = ReconstructionLog::new();
        log.push_unit(Lit::pos(3));
        log.push_clause(vec![Lit::pos(1), Lit::neg(5)], Lit::neg(5));
        let vars = log.witnessed_vars();
        assert!(vars.contains(&3));
        assert!(vars.contains(&5));
        assert_eq!(vars.len(), 2);
    }
}
