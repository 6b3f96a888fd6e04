/*!
A parallel conjunctive-normal-form inprocessing engine.

parasimp reduces a CNF formula ahead of (or between runs of) a CDCL search:
bounded variable elimination with gate-guided substitution, hidden
(self-)subsumption, blocked-clause elimination, equivalence-resolvent
elimination, and implication-graph reasoning (SCC collapse, failed-literal
detection, hyper-binary resolution), all driven by an outer loop ([sigma])
over a clause database ([db]) shared across a small [worker pool](pool).

This crate does not search for a model itself -- it only simplifies a
formula and hands back enough of a [reconstruction log](db::reconstruction)
to extend a model of the reduced formula to one of the original. Plugging
the output into a CDCL solver, or reading the input in from DIMACS, is left
to the caller.

# Example

```rust
use parasimp::{config::Config, simplify, structures::literal::Lit};

// (x1 ∨ x2) ∧ (x1 ∨ ¬x2): x1 is pure, so it should be eliminated with a
// unit witness and leave nothing behind.
let clauses = vec![
    vec![Lit::pos(1), Lit::pos(2)],
    vec![Lit::pos(1), Lit::neg(2)],
];

let result = simplify(2, clauses, Config::default()).unwrap();
assert!(result.clauses.is_empty());

let mut model = vec![None; 2];
result.extend_model(&mut model).unwrap();
assert_eq!(model[0], Some(true));
```
*/
pub mod bve;
pub mod config;
pub mod db;
pub mod elim;
pub mod ig;
pub mod misc;
pub mod pool;
pub mod proof;
pub mod propagate;
pub mod sigma;
pub mod structures;
pub mod types;

use config::Config;
use db::reconstruction::ReconstructionLog;
use sigma::Sigma;
use structures::literal::{Lit, Var};
use types::err::{ReconstructionError, SigmaError};

/// The output of one [`simplify`] call: the surviving clauses and the log
/// needed to extend a model back to the original formula.
pub struct SimplificationResult {
    pub clauses: Vec<Vec<Lit>>,
    pub max_var: Var,
    reconstruction: ReconstructionLog,
}

impl SimplificationResult {
    /// Extends `valuation` (indexed by `var - 1`, `None` = unassigned) from
    /// a model of [`SimplificationResult::clauses`] to a model of the
    /// original formula passed to [`simplify`], by replaying the
    /// reconstruction log right to left.
    pub fn extend_model(&self, valuation: &mut [Option<bool>]) -> Result<(), ReconstructionError> {
        self.reconstruction.extend(valuation)
    }

    pub fn reconstruction_log(&self) -> &ReconstructionLog {
        &self.reconstruction
    }
}

/// Runs one simplification pass over `clauses` (a formula over
/// `1..=max_var`) under `config`, to completion.
///
/// `Err` is only returned for [`SigmaError::UnsatDerived`] and the resource/
/// interrupt conditions -- a formula that simplifies away entirely
/// ([`SigmaError::SatTrivial`]) is reported as `Ok` with an empty clause set,
/// since that is a valid (trivial) outcome for a caller to build a model
/// from rather than an error to propagate.
pub fn simplify(max_var: Var, clauses: Vec<Vec<Lit>>, config: Config) -> Result<SimplificationResult, SigmaError> {
    let mut sigma = Sigma::new(max_var, clauses, config)?;
    match sigma.run() {
        Ok(()) | Err(SigmaError::SatTrivial) => {}
        Err(other) => return Err(other),
    }

    Ok(SimplificationResult {
        clauses: sigma.live_clauses(),
        max_var,
        reconstruction: sigma.reconstruction_log().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_pure_literal_formula_simplifies_to_nothing_and_extends_cleanly() {
        let clauses = vec![vec![Lit::pos(1), Lit::pos(2)], vec![Lit::pos(1), Lit::neg(2)]];
        let result = simplify(2, clauses, Config::default()).unwrap();
        assert!(result.clauses.is_empty());

        let mut model = vec![None; 2];
        result.extend_model(&mut model).unwrap();
        assert_eq!(model[0], Some(true));
    }

    #[test]
    fn a_contradictory_formula_reports_unsat() {
        let clauses = vec![vec![Lit::pos(1)], vec![Lit::neg(1)]];
        let result = simplify(1, clauses, Config::default());
        assert_eq!(result.err(), Some(SigmaError::UnsatDerived));
    }
}
