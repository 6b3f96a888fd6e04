/*!
Miscellaneous items related to [logging](log).

Calls to the log macro are made throughout the library, targeted so that a
consumer of the crate can narrow output to a single subsystem (via
`RUST_LOG=clause_db=debug`, for example) without drowning in noise from the
others.

No log implementation is provided; attach [env_logger](https://docs.rs/env_logger)
or similar in a binary that links against this crate.
*/

/// Targets to be used within a [log]! macro, one per subsystem.
pub mod targets {
    /// Logs related to the [worker pool](crate::pool)
    pub const WORKER_POOL: &str = "worker_pool";

    /// Logs related to the [clause database](crate::db)
    pub const CLAUSE_DB: &str = "clause_db";

    /// Logs related to the occurrence index
    pub const OCCURS: &str = "occurs";

    /// Logs related to [propagation](crate::propagate)
    pub const PROPAGATION: &str = "propagation";

    /// Logs related to [implication-graph reasoning](crate::ig)
    pub const IGR: &str = "igr";

    /// Logs related to [SCC collapse](crate::ig::scc)
    pub const SCC: &str = "scc";

    /// Logs related to [bounded variable elimination](crate::bve)
    pub const BVE: &str = "bve";

    /// Logs related to gate recognition within BVE
    pub const GATES: &str = "gates";

    /// Logs related to hidden (self-)subsumption
    pub const HSE: &str = "hse";

    /// Logs related to blocked-clause elimination
    pub const BCE: &str = "bce";

    /// Logs related to equivalence-resolvent elimination
    pub const ERE: &str = "ere";

    /// Logs related to the outer [sigma driver](crate::sigma)
    pub const SIGMA: &str = "sigma";

    /// Logs related to the [reconstruction log](crate::reconstruction)
    pub const RECONSTRUCTION: &str = "reconstruction";

    /// Logs related to the [proof sink](crate::proof)
    pub const PROOF: &str = "proof";
}
