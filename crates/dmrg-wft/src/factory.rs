//! The wavefunction-transformation factory: the sweep-facing state
//! machine that stores truncation snapshots, arms the transformation
//! window on direction changes, and routes trial-vector requests to the
//! strategy or to the random fallback.

use std::path::Path;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use dmrg_core::{BlockDiagonalMatrix, LeftRightSuper, Scalar, SectorVector};

use crate::checkpoint;
use crate::combined::CombinedWave;
use crate::error::{Result, WftError};
use crate::options::{GrowthSide, SweepPhase, WftOptions, WftParams};
use crate::random;
use crate::snapshot::TransformSnapshot;
use crate::stack::TransformStack;
use crate::strategy::{strategy_for, WftStrategy};

/// Vectors with a norm below this are unusable as transform input or
/// output.
const MIN_NORM: f64 = 1e-5;

/// Relative norm drift beyond this after a transform is logged, never
/// fatal.
const NORM_TOLERANCE: f64 = 1e-5;

/// Orchestrates the transform history and the per-step transformation
/// window.
///
/// Driven by the sweep engine in call order: `set_stage` at phase
/// boundaries, `push` once per completed truncation step, `trigger_on` /
/// `trigger_off` bracketing each step's window, and `set_initial_vector`
/// to obtain the next trial state. Calls are serialized by the caller;
/// the factory holds no locks.
pub struct WaveFunctionTransformation<T: Scalar> {
    enabled: bool,
    options: WftOptions,
    combined: CombinedWave<T>,
    system_stack: TransformStack<T>,
    environ_stack: TransformStack<T>,
    strategy: Box<dyn WftStrategy<T> + Send + Sync>,
    rng: ChaCha8Rng,
    window_open: bool,
    /// Restart without loaded history; lifted once every interior site
    /// has been grown over at least once.
    no_load: bool,
    sites_seen: Vec<usize>,
    save_on_finish: bool,
}

impl<T: Scalar> WaveFunctionTransformation<T> {
    pub fn new(params: WftParams) -> Result<Self> {
        if params.skip_restart_load && !params.restart {
            return Err(WftError::Config(
                "skipping the restart load requires a restart run".to_string(),
            ));
        }

        let mut factory = Self {
            enabled: params.enabled,
            options: WftOptions::new(params.two_site, params.dense_sparse_threshold),
            combined: CombinedWave::new(),
            system_stack: TransformStack::new(),
            environ_stack: TransformStack::new(),
            strategy: strategy_for(params.su2),
            rng: ChaCha8Rng::seed_from_u64(params.seed),
            window_open: false,
            no_load: false,
            sites_seen: Vec::new(),
            save_on_finish: params.save_on_finish,
        };

        if !factory.enabled {
            return Ok(factory);
        }

        if params.restart {
            if params.skip_restart_load {
                factory.no_load = true;
            } else {
                let path = params.checkpoint_in.as_deref().ok_or_else(|| {
                    WftError::Config("restart requested without a checkpoint path".to_string())
                })?;
                factory.read_checkpoint(path)?;
            }
        }

        Ok(factory)
    }

    /// Records a phase change; repeating the current phase is a no-op,
    /// a change resets the step counter.
    pub fn set_stage(&mut self, phase: SweepPhase) {
        if phase == self.options.phase {
            return;
        }
        self.options.phase = phase;
        self.options.counter = 0;
    }

    /// Stores one truncation step's snapshot according to the current
    /// phase and the reported growth direction.
    pub fn push(
        &mut self,
        snapshot: TransformSnapshot<T>,
        direction: SweepPhase,
        lrs: &LeftRightSuper,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        match self.options.phase {
            SweepPhase::InitialGrowth => match direction {
                SweepPhase::ExpandSystem => {
                    self.system_stack.push(snapshot.clone());
                    self.combined.set_wave(GrowthSide::System, snapshot);
                }
                SweepPhase::ExpandEnviron => {
                    self.environ_stack.push(snapshot.clone());
                    self.combined.set_wave(GrowthSide::Environ, snapshot);
                }
                SweepPhase::InitialGrowth => {
                    return Err(WftError::DirectionMismatch {
                        phase: self.options.phase,
                        direction,
                    })
                }
            },
            SweepPhase::ExpandEnviron => {
                if direction != SweepPhase::ExpandEnviron {
                    return Err(WftError::DirectionMismatch {
                        phase: self.options.phase,
                        direction,
                    });
                }
                self.combined.set_wave(GrowthSide::System, snapshot.clone());
                self.combined.set_wave(GrowthSide::Environ, snapshot.clone());
                self.environ_stack.push(snapshot);
            }
            SweepPhase::ExpandSystem => {
                if direction != SweepPhase::ExpandSystem {
                    return Err(WftError::DirectionMismatch {
                        phase: self.options.phase,
                        direction,
                    });
                }
                self.combined.set_wave(GrowthSide::System, snapshot.clone());
                self.combined.set_wave(GrowthSide::Environ, snapshot.clone());
                self.system_stack.push(snapshot);
            }
        }

        self.combined.set_lrs(lrs);
        log::debug!(
            "pushed transform, direction {} in phase {}",
            direction,
            self.options.phase
        );

        if self.no_load {
            let center = Self::compute_center(lrs, direction)?;
            self.update_no_load(lrs, center);
        }

        Ok(())
    }

    /// Opens the transformation window by arming the combined structure
    /// from the opposite-side history.
    ///
    /// A no-op during initial growth, while restart data is missing, or
    /// when disabled. Popping an empty stack is an error and leaves the
    /// factory untouched.
    pub fn trigger_on(&mut self) -> Result<()> {
        let allow = matches!(
            self.options.phase,
            SweepPhase::ExpandSystem | SweepPhase::ExpandEnviron
        ) && !self.no_load;
        if !self.enabled || !allow {
            return Ok(());
        }

        self.before_wft()?;
        self.window_open = true;
        log::info!("window open, ready to transform vectors");
        Ok(())
    }

    /// Produces the next trial vector: a transform of `src` while the
    /// window is open, a normalized random state otherwise.
    pub fn set_initial_vector(
        &mut self,
        dest: &mut SectorVector<T>,
        src: &SectorVector<T>,
        lrs: &LeftRightSuper,
        nk: &[usize],
    ) -> Result<()> {
        let allow = matches!(
            self.options.phase,
            SweepPhase::ExpandSystem | SweepPhase::ExpandEnviron
        ) && !self.no_load;

        if self.enabled && allow && self.window_open {
            self.transform_vector(dest, src, lrs, nk)
        } else {
            random::fill_random(&mut self.rng, dest)?;
            log::debug!("window closed, seeded a random trial vector");
            Ok(())
        }
    }

    /// Transforms `src` into the basis described by `lrs` through the
    /// armed snapshots.
    ///
    /// The source norm must clear the minimal threshold, and so must the
    /// result; a relative norm drift in between is logged and accepted.
    pub fn transform_vector(
        &self,
        dest: &mut SectorVector<T>,
        src: &SectorVector<T>,
        lrs: &LeftRightSuper,
        nk: &[usize],
    ) -> Result<()> {
        let norm1 = src.norm();
        if norm1 < MIN_NORM {
            return Err(WftError::NormTooSmall {
                context: "source vector",
                norm: norm1,
                threshold: MIN_NORM,
            });
        }

        self.strategy
            .transform_vector(dest, src, &self.combined, lrs, nk, self.options)?;

        let norm2 = dest.norm();
        if (norm1 - norm2).abs() > NORM_TOLERANCE * norm1 {
            log::warn!(
                "transform drifted the norm: source {:.12e}, destination {:.12e}",
                norm1,
                norm2
            );
        }
        if norm2 < MIN_NORM {
            return Err(WftError::NormTooSmall {
                context: "transformed vector",
                norm: norm2,
                threshold: MIN_NORM,
            });
        }

        log::info!("transformation completed");
        Ok(())
    }

    /// Closes the window: clears the active snapshots, re-seeds the
    /// composite basis, and advances the step counter.
    pub fn trigger_off(&mut self, lrs: &LeftRightSuper) {
        let allow = matches!(
            self.options.phase,
            SweepPhase::ExpandSystem | SweepPhase::ExpandEnviron
        ) && !self.no_load;
        if !self.enabled || !allow {
            return;
        }

        self.combined.clear();
        self.combined.set_lrs(lrs);
        self.options.first_call = false;
        self.options.counter += 1;
        self.window_open = false;
        log::info!("window closed, no more transformations");
    }

    /// Writes the factory state to an HDF5 checkpoint; skipped when
    /// disabled or when saving was opted out.
    pub fn save_checkpoint(&self, path: &Path) -> Result<()> {
        if !self.enabled || !self.save_on_finish {
            return Ok(());
        }
        checkpoint::write_factory(
            path,
            self.enabled,
            &self.options,
            &self.combined,
            &self.system_stack,
            &self.environ_stack,
        )?;
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn options(&self) -> WftOptions {
        self.options
    }

    pub fn is_window_open(&self) -> bool {
        self.window_open
    }

    /// Active transform for one side of the bipartition.
    pub fn transform(&self, side: GrowthSide) -> &BlockDiagonalMatrix<T> {
        self.combined.transform(side)
    }

    pub fn history_len(&self, side: GrowthSide) -> usize {
        match side {
            GrowthSide::System => self.system_stack.len(),
            GrowthSide::Environ => self.environ_stack.len(),
        }
    }

    fn read_checkpoint(&mut self, path: &Path) -> Result<()> {
        let state = checkpoint::read_factory::<T>(path)?;
        self.enabled = state.enabled;
        self.options = state.options;
        self.combined = state.combined;
        self.system_stack = state.system_stack;
        self.environ_stack = state.environ_stack;
        Ok(())
    }

    fn before_wft(&mut self) -> Result<()> {
        // growing into one side consumes the opposite side's history
        let side = if self.options.phase == SweepPhase::ExpandEnviron {
            GrowthSide::System
        } else {
            GrowthSide::Environ
        };

        let (popped, lookahead) = {
            let stack = match side {
                GrowthSide::System => &mut self.system_stack,
                GrowthSide::Environ => &mut self.environ_stack,
            };
            let popped = stack.pop().ok_or(WftError::EmptyStack { side })?;
            (popped, stack.top().cloned())
        };

        self.combined.set_wave(side, popped);
        // the two-site sweep needs one snapshot of lookahead beyond the
        // one just consumed
        if self.options.two_site {
            if let Some(next) = &lookahead {
                self.combined.set_wave(side, next.clone());
            }
        }
        // the remaining top, when present, re-arms the single-site path
        // the same way
        if let Some(next) = lookahead {
            self.combined.set_wave(side, next);
        }

        Ok(())
    }

    fn compute_center(lrs: &LeftRightSuper, direction: SweepPhase) -> Result<usize> {
        if direction == SweepPhase::ExpandSystem {
            lrs.left()
                .sites()
                .last()
                .copied()
                .ok_or(WftError::SizeMismatch {
                    context: "left block sites",
                    expected: 1,
                    actual: 0,
                })
        } else {
            lrs.right()
                .sites()
                .first()
                .copied()
                .ok_or(WftError::SizeMismatch {
                    context: "right block sites",
                    expected: 1,
                    actual: 0,
                })
        }
    }

    fn update_no_load(&mut self, lrs: &LeftRightSuper, center: usize) {
        self.sites_seen.push(center);
        let number_of_sites = lrs.super_basis().sites().len();
        if self.check_sites(number_of_sites) {
            self.no_load = false;
            log::info!("transform history now available");
        }
    }

    /// Interior sites are `1..n-1`; the ends are grown implicitly.
    fn check_sites(&self, number_of_sites: usize) -> bool {
        if number_of_sites == 0 {
            return false;
        }
        (1..number_of_sites.saturating_sub(1)).all(|site| self.sites_seen.contains(&site))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use dmrg_core::SectorBasis;

    fn lrs_2x1() -> LeftRightSuper {
        LeftRightSuper::new(
            SectorBasis::natural(2, vec![0]),
            SectorBasis::natural(1, vec![1]),
            SectorBasis::natural(2, vec![0, 1]),
        )
        .unwrap()
    }

    fn identity_snapshot(sizes: &[usize]) -> TransformSnapshot<f64> {
        TransformSnapshot::new(
            BlockDiagonalMatrix::identity(sizes),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
    }

    fn unit_vector() -> SectorVector<f64> {
        let mut v = SectorVector::zeroed(vec![0, 2], &[0]).unwrap();
        v.set_sector(0, vec![0.6, 0.8]).unwrap();
        v
    }

    /// Factory with an armed window over identity transforms.
    fn armed_identity_factory() -> (WaveFunctionTransformation<f64>, LeftRightSuper) {
        let lrs = lrs_2x1();
        let mut factory = WaveFunctionTransformation::<f64>::new(WftParams::default()).unwrap();
        factory
            .push(identity_snapshot(&[2]), SweepPhase::ExpandSystem, &lrs)
            .unwrap();
        factory
            .push(identity_snapshot(&[1]), SweepPhase::ExpandEnviron, &lrs)
            .unwrap();
        factory.set_stage(SweepPhase::ExpandEnviron);
        factory.trigger_on().unwrap();
        (factory, lrs)
    }

    #[test]
    fn set_stage_counter_semantics() {
        let mut factory = WaveFunctionTransformation::<f64>::new(WftParams::default()).unwrap();
        assert_eq!(factory.options().counter, 0);

        factory.set_stage(SweepPhase::ExpandSystem);
        factory.trigger_off(&lrs_2x1());
        assert_eq!(factory.options().counter, 1);

        // same phase: counter untouched
        factory.set_stage(SweepPhase::ExpandSystem);
        assert_eq!(factory.options().counter, 1);

        // different phase: counter reset
        factory.set_stage(SweepPhase::ExpandEnviron);
        assert_eq!(factory.options().counter, 0);
    }

    #[test]
    fn push_direction_must_match_sweep_phase() {
        let lrs = lrs_2x1();
        let mut factory = WaveFunctionTransformation::<f64>::new(WftParams::default()).unwrap();
        factory.set_stage(SweepPhase::ExpandSystem);
        let err = factory.push(identity_snapshot(&[2]), SweepPhase::ExpandEnviron, &lrs);
        assert!(matches!(err, Err(WftError::DirectionMismatch { .. })));
        assert_eq!(factory.history_len(GrowthSide::System), 0);
        assert_eq!(factory.history_len(GrowthSide::Environ), 0);
    }

    #[test]
    fn initial_growth_routes_by_direction() {
        let lrs = lrs_2x1();
        let mut factory = WaveFunctionTransformation::<f64>::new(WftParams::default()).unwrap();
        factory
            .push(identity_snapshot(&[2]), SweepPhase::ExpandSystem, &lrs)
            .unwrap();
        factory
            .push(identity_snapshot(&[1]), SweepPhase::ExpandEnviron, &lrs)
            .unwrap();
        assert_eq!(factory.history_len(GrowthSide::System), 1);
        assert_eq!(factory.history_len(GrowthSide::Environ), 1);
        assert_eq!(factory.transform(GrowthSide::System).rows(), 2);
        assert_eq!(factory.transform(GrowthSide::Environ).rows(), 1);
    }

    #[test]
    fn sweep_phase_push_arms_both_sides() {
        let lrs = lrs_2x1();
        let mut factory = WaveFunctionTransformation::<f64>::new(WftParams::default()).unwrap();
        factory.set_stage(SweepPhase::ExpandSystem);
        factory
            .push(identity_snapshot(&[2]), SweepPhase::ExpandSystem, &lrs)
            .unwrap();
        assert_eq!(factory.history_len(GrowthSide::System), 1);
        assert_eq!(factory.history_len(GrowthSide::Environ), 0);
        assert_eq!(factory.transform(GrowthSide::System).rows(), 2);
        assert_eq!(factory.transform(GrowthSide::Environ).rows(), 2);
    }

    #[test]
    fn empty_stack_is_fatal_and_mutation_free() {
        let mut factory = WaveFunctionTransformation::<f64>::new(WftParams::default()).unwrap();
        factory.set_stage(SweepPhase::ExpandEnviron);

        let err = factory.trigger_on();
        assert!(matches!(
            err,
            Err(WftError::EmptyStack {
                side: GrowthSide::System
            })
        ));
        assert!(!factory.is_window_open());
        assert!(factory.transform(GrowthSide::System).is_empty());

        // the factory still works once history exists
        let lrs = lrs_2x1();
        factory.set_stage(SweepPhase::InitialGrowth);
        factory
            .push(identity_snapshot(&[2]), SweepPhase::ExpandSystem, &lrs)
            .unwrap();
        factory.set_stage(SweepPhase::ExpandEnviron);
        factory.trigger_on().unwrap();
        assert!(factory.is_window_open());
    }

    #[test]
    fn identity_transform_is_exact() {
        let (mut factory, lrs) = armed_identity_factory();
        let src = unit_vector();
        let mut dest = SectorVector::zeroed(vec![0, 2], &[0]).unwrap();

        factory.set_initial_vector(&mut dest, &src, &lrs, &[1]).unwrap();
        assert_eq!(dest.slice(0), &[0.6, 0.8]);

        // the popped snapshot was consumed
        assert_eq!(factory.history_len(GrowthSide::System), 0);
    }

    #[test]
    fn window_closes_after_trigger_off() {
        let (mut factory, lrs) = armed_identity_factory();
        assert!(factory.is_window_open());

        factory.trigger_off(&lrs);
        assert!(!factory.is_window_open());
        assert_eq!(factory.options().counter, 1);
        assert!(!factory.options().first_call);
        assert!(factory.transform(GrowthSide::System).is_empty());
        assert!(factory.transform(GrowthSide::Environ).is_empty());

        // closed window: a random normalized vector instead of a copy
        let src = unit_vector();
        let mut dest = SectorVector::zeroed(vec![0, 2], &[0]).unwrap();
        factory.set_initial_vector(&mut dest, &src, &lrs, &[1]).unwrap();
        assert_relative_eq!(dest.norm(), 1.0, epsilon = 1e-12);
        assert_ne!(dest.slice(0), src.slice(0));
    }

    #[test]
    fn lookahead_re_arms_from_the_new_top() {
        let lrs = LeftRightSuper::new(
            SectorBasis::natural(3, vec![0]),
            SectorBasis::natural(1, vec![1]),
            SectorBasis::natural(3, vec![0, 1]),
        )
        .unwrap();
        for two_site in [false, true] {
            let mut factory = WaveFunctionTransformation::<f64>::new(
                WftParams::default().with_two_site(two_site),
            )
            .unwrap();
            factory
                .push(identity_snapshot(&[3]), SweepPhase::ExpandSystem, &lrs)
                .unwrap();
            factory
                .push(identity_snapshot(&[2]), SweepPhase::ExpandSystem, &lrs)
                .unwrap();
            factory.set_stage(SweepPhase::ExpandEnviron);
            factory.trigger_on().unwrap();

            // top (2x2) was popped, the remaining top (3x3) is armed
            assert_eq!(factory.history_len(GrowthSide::System), 1);
            assert_eq!(factory.transform(GrowthSide::System).rows(), 3);
        }
    }

    #[test]
    fn disabled_factory_only_randomizes() {
        let lrs = lrs_2x1();
        let mut factory =
            WaveFunctionTransformation::<f64>::new(WftParams::default().with_enabled(false))
                .unwrap();
        factory
            .push(identity_snapshot(&[2]), SweepPhase::ExpandSystem, &lrs)
            .unwrap();
        assert_eq!(factory.history_len(GrowthSide::System), 0);

        factory.set_stage(SweepPhase::ExpandEnviron);
        factory.trigger_on().unwrap();
        assert!(!factory.is_window_open());

        let src = unit_vector();
        let mut dest = SectorVector::zeroed(vec![0, 2], &[0]).unwrap();
        factory.set_initial_vector(&mut dest, &src, &lrs, &[1]).unwrap();
        assert_relative_eq!(dest.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn tiny_source_norm_is_rejected() {
        let (factory, lrs) = armed_identity_factory();
        let mut src = SectorVector::zeroed(vec![0, 2], &[0]).unwrap();
        src.set_sector(0, vec![1e-9, 0.0]).unwrap();
        let mut dest = SectorVector::zeroed(vec![0, 2], &[0]).unwrap();

        let err = factory.transform_vector(&mut dest, &src, &lrs, &[1]);
        assert!(matches!(
            err,
            Err(WftError::NormTooSmall {
                context: "source vector",
                ..
            })
        ));
    }

    #[test]
    fn skip_restart_load_requires_restart() {
        let err = WaveFunctionTransformation::<f64>::new(
            WftParams::default().with_skip_restart_load(true),
        );
        assert!(matches!(err, Err(WftError::Config(_))));
    }

    #[test]
    fn no_load_lifts_after_interior_sites_are_seen() {
        // four sites, interior sites 1 and 2
        let lrs = LeftRightSuper::new(
            SectorBasis::natural(2, vec![0, 1]),
            SectorBasis::natural(2, vec![2, 3]),
            SectorBasis::natural(4, vec![0, 1, 2, 3]),
        )
        .unwrap();
        let params = WftParams::default()
            .with_restart("unused.h5".into())
            .with_skip_restart_load(true);
        let mut factory = WaveFunctionTransformation::<f64>::new(params).unwrap();

        factory.set_stage(SweepPhase::ExpandSystem);
        factory.trigger_on().unwrap();
        assert!(!factory.is_window_open());

        // growing the system touches site 1, growing the environment
        // touches site 2; both together cover the interior
        factory
            .push(identity_snapshot(&[2]), SweepPhase::ExpandSystem, &lrs)
            .unwrap();
        factory.trigger_on().unwrap();
        assert!(!factory.is_window_open());

        factory.set_stage(SweepPhase::ExpandEnviron);
        factory
            .push(identity_snapshot(&[2]), SweepPhase::ExpandEnviron, &lrs)
            .unwrap();

        factory.trigger_on().unwrap();
        assert!(factory.is_window_open());
    }
}
