//! Sweep phases, growth sides, and the factory configuration.

use std::fmt;
use std::path::PathBuf;

/// Phase of the renormalization sweep.
///
/// `InitialGrowth` is the infinite-algorithm warmup during which both
/// blocks grow; the two expand phases are the finite-algorithm sweeps.
/// The same enum doubles as the growth direction reported by `push`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    InitialGrowth,
    ExpandSystem,
    ExpandEnviron,
}

impl SweepPhase {
    /// Stable numeric code used by the checkpoint layer.
    pub fn code(self) -> u8 {
        match self {
            SweepPhase::InitialGrowth => 0,
            SweepPhase::ExpandSystem => 1,
            SweepPhase::ExpandEnviron => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SweepPhase::InitialGrowth),
            1 => Some(SweepPhase::ExpandSystem),
            2 => Some(SweepPhase::ExpandEnviron),
            _ => None,
        }
    }
}

impl fmt::Display for SweepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SweepPhase::InitialGrowth => "initial growth",
            SweepPhase::ExpandSystem => "expand system",
            SweepPhase::ExpandEnviron => "expand environment",
        };
        write!(f, "{}", name)
    }
}

/// Which block of the bipartition a transform snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthSide {
    System,
    Environ,
}

impl fmt::Display for GrowthSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GrowthSide::System => "system",
            GrowthSide::Environ => "environment",
        };
        write!(f, "{}", name)
    }
}

/// Per-step option bundle handed by value into strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WftOptions {
    pub phase: SweepPhase,
    pub two_site: bool,
    pub first_call: bool,
    pub counter: usize,
    /// Density above which a sparse representation would be converted to
    /// dense by the numeric kernels.
    pub dense_sparse_threshold: f64,
}

impl WftOptions {
    pub fn new(two_site: bool, dense_sparse_threshold: f64) -> Self {
        Self {
            phase: SweepPhase::InitialGrowth,
            two_site,
            first_call: true,
            counter: 0,
            dense_sparse_threshold,
        }
    }
}

/// Construction-time configuration of the transformation factory.
#[derive(Debug, Clone)]
pub struct WftParams {
    /// Master switch; a disabled factory only hands out random vectors.
    pub enabled: bool,
    /// Two-site sweep variant, which needs one snapshot of lookahead.
    pub two_site: bool,
    /// Non-abelian (SU(2)) symmetry run.
    pub su2: bool,
    /// The run resumes from a checkpoint.
    pub restart: bool,
    /// On restart, skip loading transform history and rebuild it by
    /// sweeping until every interior site has been visited.
    pub skip_restart_load: bool,
    /// Write the checkpoint when asked to save.
    pub save_on_finish: bool,
    /// Seed of the instance-scoped random generator.
    pub seed: u64,
    pub dense_sparse_threshold: f64,
    /// Checkpoint to read when restarting.
    pub checkpoint_in: Option<PathBuf>,
}

impl Default for WftParams {
    fn default() -> Self {
        Self {
            enabled: true,
            two_site: false,
            su2: false,
            restart: false,
            skip_restart_load: false,
            save_on_finish: true,
            seed: 3433117,
            dense_sparse_threshold: 0.2,
            checkpoint_in: None,
        }
    }
}

impl WftParams {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_two_site(mut self, two_site: bool) -> Self {
        self.two_site = two_site;
        self
    }

    pub fn with_su2(mut self, su2: bool) -> Self {
        self.su2 = su2;
        self
    }

    pub fn with_restart(mut self, checkpoint_in: PathBuf) -> Self {
        self.restart = true;
        self.checkpoint_in = Some(checkpoint_in);
        self
    }

    pub fn with_skip_restart_load(mut self, skip: bool) -> Self {
        self.skip_restart_load = skip;
        self
    }

    pub fn with_save_on_finish(mut self, save: bool) -> Self {
        self.save_on_finish = save;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_dense_sparse_threshold(mut self, threshold: f64) -> Self {
        self.dense_sparse_threshold = threshold;
        self
    }
}
