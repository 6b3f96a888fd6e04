/*!
Configuration of a simplifier run.

All recognized options live on one [`Config`] struct. A simplification
round reads its configuration once at the start of
[`crate::sigma::Sigma::run`] and never mutates it mid-run, so a bare field
is enough here; see `DESIGN.md` for this design note.
*/

/// The primary configuration structure for a simplification run.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    // -- Enable flags -----------------------------------------------------
    /// Enable bounded variable elimination.
    pub ve_en: bool,

    /// Enable the fused clause-elimination driver (HSE, optionally BCE).
    pub ce_en: bool,

    /// Enable hidden (self-)subsumption.
    pub hse_en: bool,

    /// Enable blocked-clause elimination.
    pub bce_en: bool,

    /// Enable equivalence-resolvent elimination.
    pub ere_en: bool,

    /// Enable implication-graph reasoning (SCC collapse, failed literals, HBR).
    pub igr_en: bool,

    /// Enable hyper-binary resolution within IGR.
    pub hbr_en: bool,

    /// Enable failed-literal detection within IGR.
    pub fle_en: bool,

    /// Enable the "plus" variants of BVE (gate-guided substitution; when
    /// disabled, only pure-literal and plain n-by-m resolution are used).
    pub ve_plus_en: bool,

    /// Enable the live variant of the outer driver (reshapes `OT` between
    /// every kernel rather than only between phases).
    pub sigma_live_en: bool,

    /// Master enable for the outer driver; when `false`, `Sigma::run` is a no-op.
    pub sigma_en: bool,

    /// Optional redundant-edge pruning during IGR's SCC loop. Disabled by
    /// default: it trades extra bookkeeping for a smaller graph and is only
    /// worth it on dense implication graphs.
    pub igr_prune_edges: bool,

    /// Emit DRAT-style clause add/delete records to a [proof sink](crate::proof).
    pub proof_en: bool,

    /// Enable per-phase timers in the outer driver's logging.
    pub profile_simp: bool,

    // -- Per-list size thresholds ------------------------------------------
    /// Clauses longer than this are skipped by HSE.
    pub hse_limit: usize,

    /// Occurrence lists longer than this are skipped by BCE.
    pub bce_limit: usize,

    /// Occurrence lists longer than this are skipped by ERE, applied to both
    /// `OT[p]` and `OT[flip(p)]`.
    pub ere_limit: usize,

    /// Maximum resolvent size accepted by ERE (`MAX_ERE_OUT`).
    pub max_ere_out: usize,

    /// Maximum length of a clause HSE will still attempt to subsume with (`HSE_MAX_CL_SIZE`).
    pub hse_max_cl_size: usize,

    // -- Bounds --------------------------------------------------------
    /// Maximum hyper-binary resolutions performed per IGR call; `None` = unlimited.
    pub hbr_max: Option<usize>,

    /// Maximum XOR gate arity considered during gate detection.
    pub xor_max_arity: usize,

    // -- Outer loop ------------------------------------------------------
    /// Maximum number of outer iterations.
    pub phases: usize,

    /// Outer iterations between arena compactions (`shrinkSimp`).
    pub shrink_rate: usize,

    /// Stop the outer loop once remaining literals fall at or below this count.
    pub lits_min: usize,

    /// Stop the outer loop once the elected pivot-variable set falls at or below this size.
    pub lcve_min: usize,

    /// Stop the outer loop once the variable count falls at or below this count.
    pub sigma_min: usize,

    // -- LCVE scoring ------------------------------------------------------
    /// Multiplier applied to positive occurrences when scoring pivot candidates.
    pub mu_pos: u32,

    /// Multiplier applied to negative occurrences when scoring pivot candidates.
    pub mu_neg: u32,

    // -- Resources ---------------------------------------------------------
    /// Size of the worker pool.
    pub worker_count: usize,

    /// Proportion (0.0-1.0) of system-free memory a projected allocation may
    /// consume before `checkMem` rejects it.
    pub memory_cap_fraction: f64,

    /// Path a [proof sink](crate::proof) writes its byte stream to, when `proof_en`.
    pub proof_path: Option<std::path::PathBuf>,
}

impl Default for Config {
    /// Defaults follow a reference CNF-simplifier's option defaults where one
    /// is known; fields it leaves unspecified use conservative values noted
    /// in `DESIGN.md`.
    fn default() -> Self {
        Config {
            ve_en: true,
            ce_en: true,
            hse_en: true,
            bce_en: true,
            ere_en: false,
            igr_en: true,
            hbr_en: true,
            fle_en: true,
            ve_plus_en: true,
            sigma_live_en: false,
            sigma_en: true,
            igr_prune_edges: false,
            proof_en: false,
            profile_simp: false,

            hse_limit: 1000,
            bce_limit: 1000,
            ere_limit: 1000,
            max_ere_out: 350,
            hse_max_cl_size: 1000,

            hbr_max: None,
            xor_max_arity: 10,

            phases: 5,
            shrink_rate: 4,
            lits_min: 0,
            lcve_min: 1,
            sigma_min: 0,

            mu_pos: 4,
            mu_neg: 3,

            worker_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            memory_cap_fraction: 0.75,
            proof_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let cfg = Config::default();
        assert!(cfg.worker_count >= 1);
        assert!(cfg.max_ere_out <= cfg.ere_limit * cfg.ere_limit || cfg.max_ere_out > 0);
        assert!(cfg.phases >= 1);
    }
}
