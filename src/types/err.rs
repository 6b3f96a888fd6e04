/*!
Error types used in the library.

Names of the error enums overlap with the subsystem that raises them, so `err::{self}`
is typically imported and used to prefix the type, e.g. `err::BveError`.

Most of the taxonomy is internal signalling (a BCP conflict is expected and
drives control flow, not a bug); `SigmaError` carries the outer exit conditions
a caller of the simplifier actually needs to branch on.
*/

/// A union of every subsystem's error kind.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// An error from the [worker pool](crate::pool).
    Pool(PoolError),

    /// An error from the [clause database](crate::db).
    ClauseDB(ClauseDBError),

    /// An error from [propagation](crate::propagate).
    Propagation(PropagationError),

    /// An error from [implication-graph reasoning](crate::ig).
    Igr(IgrError),

    /// An error from [bounded variable elimination](crate::bve).
    Bve(BveError),

    /// An error from a [clause-elimination kernel](crate::elim).
    Elimination(EliminationError),

    /// An error from the [reconstruction log](crate::reconstruction).
    Reconstruction(ReconstructionError),

    /// An error from the [outer driver](crate::sigma).
    Sigma(SigmaError),
}

/// Errors raised by the worker pool.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PoolError {
    /// `join` was called after the pool had already been shut down.
    PoolShutDown,

    /// An external interrupt was observed while waiting for workers to quiesce.
    Interrupted,
}

impl From<PoolError> for ErrorKind {
    fn from(e: PoolError) -> Self {
        ErrorKind::Pool(e)
    }
}

/// Errors raised by the clause database / occurrence index.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClauseDBError {
    /// A projected allocation exceeded the configured memory cap.
    MemoryExceeded,

    /// A clause key did not resolve to a live clause.
    InvalidKey,

    /// An attempt was made to store an empty clause (should have been caught earlier).
    EmptyClause,
}

impl From<ClauseDBError> for ErrorKind {
    fn from(e: ClauseDBError) -> Self {
        ErrorKind::ClauseDB(e)
    }
}

/// Errors (and control-flow signals) raised during BCP.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PropagationError {
    /// The empty clause was derived; the formula is unsatisfiable.
    ///
    /// This is expected from time to time, and not a bug.
    Conflict,

    /// Some corruption was found in the trail or occurrence lists.
    /// This is unexpected.
    Corrupt,
}

impl From<PropagationError> for ErrorKind {
    fn from(e: PropagationError) -> Self {
        ErrorKind::Propagation(e)
    }
}

/// Errors raised during implication-graph reasoning.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IgrError {
    /// A failed-literal or SCC-collapse derivation produced the empty clause.
    Conflict,

    /// The pluggable SCC implementation returned an inconsistent assignment.
    CorruptScc,
}

impl From<IgrError> for ErrorKind {
    fn from(e: IgrError) -> Self {
        ErrorKind::Igr(e)
    }
}

/// Errors raised during bounded variable elimination.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BveError {
    /// Resolving a pivot's occurrences produced the empty clause.
    Conflict,

    /// A gate-clause bookkeeping step found a missing clause.
    MissingGateClause,
}

impl From<BveError> for ErrorKind {
    fn from(e: BveError) -> Self {
        ErrorKind::Bve(e)
    }
}

/// Errors raised by HSE / BCE / ERE.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EliminationError {
    /// A clause reference in an occurrence list did not resolve.
    DanglingReference,
}

impl From<EliminationError> for ErrorKind {
    fn from(e: EliminationError) -> Self {
        ErrorKind::Elimination(e)
    }
}

/// Errors raised while appending to or replaying the reconstruction log.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReconstructionError {
    /// A melted variable had no witness record at replay time.
    MissingWitness,
}

impl From<ReconstructionError> for ErrorKind {
    fn from(e: ReconstructionError) -> Self {
        ErrorKind::Reconstruction(e)
    }
}

/// The exit conditions of an outer simplification round, per the error handling
/// design: most are surfaced to the caller, `MemoryExceeded` and an interrupted
/// round both discard in-progress work but keep the database consistent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SigmaError {
    /// The empty clause was derived: `UNSAT_DERIVED`.
    UnsatDerived,

    /// All clauses were eliminated and the trail is consistent: `SAT_TRIVIAL`.
    SatTrivial,

    /// A projected allocation exceeded the configured cap: `MEMORY_EXCEEDED`.
    MemoryExceeded,

    /// An external interrupt was observed at a phase boundary: `INTERRUPTED`.
    Interrupted,

    /// The wall-clock deadline elapsed at a phase boundary: `TIMEOUT`.
    Timeout,

    /// An internal invariant was violated.
    ///
    /// In debug builds this should instead be caught by a `debug_assert!` and
    /// abort with diagnostics; this variant is the release-build fallback,
    /// treated the same as `Interrupted`.
    InvariantViolated,
}

impl From<PoolError> for SigmaError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::PoolShutDown | PoolError::Interrupted => SigmaError::Interrupted,
        }
    }
}

impl From<ClauseDBError> for SigmaError {
    fn from(e: ClauseDBError) -> Self {
        match e {
            ClauseDBError::MemoryExceeded => SigmaError::MemoryExceeded,
            ClauseDBError::InvalidKey | ClauseDBError::EmptyClause => {
                SigmaError::InvariantViolated
            }
        }
    }
}

impl From<PropagationError> for SigmaError {
    fn from(e: PropagationError) -> Self {
        match e {
            PropagationError::Conflict => SigmaError::UnsatDerived,
            PropagationError::Corrupt => SigmaError::InvariantViolated,
        }
    }
}

impl From<IgrError> for SigmaError {
    fn from(e: IgrError) -> Self {
        match e {
            IgrError::Conflict => SigmaError::UnsatDerived,
            IgrError::CorruptScc => SigmaError::InvariantViolated,
        }
    }
}

impl From<BveError> for SigmaError {
    fn from(e: BveError) -> Self {
        match e {
            BveError::Conflict => SigmaError::UnsatDerived,
            BveError::MissingGateClause => SigmaError::InvariantViolated,
        }
    }
}

impl From<EliminationError> for SigmaError {
    fn from(_: EliminationError) -> Self {
        SigmaError::InvariantViolated
    }
}

impl From<ReconstructionError> for SigmaError {
    fn from(_: ReconstructionError) -> Self {
        SigmaError::InvariantViolated
    }
}

impl From<SigmaError> for ErrorKind {
    fn from(e: SigmaError) -> Self {
        ErrorKind::Sigma(e)
    }
}
