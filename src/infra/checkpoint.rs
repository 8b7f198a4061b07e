// ============================================================
// Layer 6: Checkpoint Manager
// ============================================================
// Saves and restores training state with Burn's CompactRecorder.
//
// Two checkpoint slots exist per model number n:
//
//   data/
//     task_test_checkpoint_{n}/     ← written every epoch
//     task_test_model_best_{n}/     ← written when the score improves
//       state.json                  ← epoch, best_acc, amp, flags
//       model.mpk.gz                ← model weights
//       optimizer.mpk.gz            ← optimizer state (optional)
//       scheduler.mpk.gz            ← LR scheduler state (optional)
//     model_config_{n}.json         ← classifier hyper-parameters
//
// A slot only counts as present when its state.json is a file.
// Saving removes the old state.json first and renames the new one
// into place last, so a save that died halfway is ignored rather
// than half-loaded, even when it overwrote an older checkpoint.
//
// Lookup order when resuming:
//   1. best slot, if asked for and present
//   2. latest slot, if present
//   3. nothing → epoch 0, best 0.0, weights untouched
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{bail, Context, Result};
use burn::{
    lr_scheduler::LrScheduler,
    module::{AutodiffModule, Module},
    optim::Optimizer,
    record::{HalfPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::{AutodiffBackend, Backend},
};

// burn 0.16's CompactRecorder (gzipped named MessagePack, `.mpk.gz`);
// from burn 0.17 on the alias points at the uncompressed `.mpk` recorder.
type CompactRecorder = NamedMpkGzFileRecorder<HalfPrecisionSettings>;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fs, path::PathBuf};

use crate::ml::model::RelationClassifierConfig;

const STATE_FILE:     &str = "state.json";
const MODEL_FILE:     &str = "model";
const OPTIMIZER_FILE: &str = "optimizer";
const SCHEDULER_FILE: &str = "scheduler";

/// Which checkpoint slot to read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointKind {
    /// Most recent epoch
    Latest,
    /// Best score so far
    Best,
}

impl CheckpointKind {
    fn dir_name(self, model_no: usize) -> String {
        match self {
            CheckpointKind::Latest => format!("task_test_checkpoint_{model_no}"),
            CheckpointKind::Best   => format!("task_test_model_best_{model_no}"),
        }
    }
}

/// Bookkeeping stored next to the tensor records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub epoch:         usize,
    pub best_acc:      f64,
    /// Mixed-precision scaler state, passed through untouched
    pub amp:           Option<Value>,
    pub has_optimizer: bool,
    pub has_scheduler: bool,
}

/// Where training should pick up from
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResumeState {
    pub start_epoch: usize,
    pub best_pred:   f64,
    pub amp:         Option<Value>,
    /// None when no checkpoint was found
    pub source:      Option<CheckpointKind>,
}

/// Model, optimizer and scheduler after a resume attempt
pub struct Restored<M, O, S> {
    pub model:     M,
    pub optimizer: Option<O>,
    pub scheduler: Option<S>,
    pub state:     ResumeState,
}

/// Manages the checkpoint slots of one model number.
pub struct CheckpointManager {
    /// Base data directory, e.g. ./data/
    dir:      PathBuf,
    model_no: usize,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>, model_no: usize) -> Self {
        Self { dir: dir.into(), model_no }
    }

    fn slot_dir(&self, kind: CheckpointKind) -> PathBuf {
        self.dir.join(kind.dir_name(self.model_no))
    }

    /// True if the slot holds a complete checkpoint
    pub fn exists(&self, kind: CheckpointKind) -> bool {
        self.slot_dir(kind).join(STATE_FILE).is_file()
    }

    fn select(&self, load_best: bool) -> Option<CheckpointKind> {
        if load_best && self.exists(CheckpointKind::Best) {
            Some(CheckpointKind::Best)
        } else if self.exists(CheckpointKind::Latest) {
            Some(CheckpointKind::Latest)
        } else {
            None
        }
    }

    fn read_state(&self, kind: CheckpointKind) -> Result<CheckpointState> {
        let path = self.slot_dir(kind).join(STATE_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read checkpoint state '{}'", path.display()))?;
        let state = serde_json::from_str(&json)
            .with_context(|| format!("Corrupt checkpoint state '{}'", path.display()))?;

        match kind {
            CheckpointKind::Best   => tracing::info!("Loaded best model."),
            CheckpointKind::Latest => tracing::info!("Loaded checkpoint model."),
        }
        Ok(state)
    }

    fn load_weights<B: Backend, M: Module<B>>(
        &self,
        kind:   CheckpointKind,
        model:  M,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.slot_dir(kind).join(MODEL_FILE);
        model
            .load_file(path.clone(), &CompactRecorder::new(), device)
            .with_context(|| format!("Cannot load model weights from '{}'", path.display()))
    }

    /// Restore model weights only, for evaluation backends.
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        model:     M,
        load_best: bool,
        device:    &B::Device,
    ) -> Result<(M, ResumeState)> {
        let Some(kind) = self.select(load_best) else {
            tracing::debug!("No checkpoint found in '{}'", self.dir.display());
            return Ok((model, ResumeState::default()));
        };

        let state = self.read_state(kind)?;
        let model = self.load_weights::<B, M>(kind, model, device)?;
        tracing::info!("Loaded model weights (epoch {})", state.epoch);

        Ok((model, resume_from(state, kind)))
    }

    /// Restore model, optimizer and scheduler state for resuming training.
    ///
    /// Optimizer and scheduler are only touched when passed in. Asking for
    /// one the checkpoint does not hold is an error.
    pub fn load_state<B, M, O, S>(
        &self,
        model:     M,
        optimizer: Option<O>,
        scheduler: Option<S>,
        load_best: bool,
        device:    &B::Device,
    ) -> Result<Restored<M, O, S>>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
        S: LrScheduler,
    {
        let Some(kind) = self.select(load_best) else {
            tracing::debug!("No checkpoint found in '{}'", self.dir.display());
            return Ok(Restored { model, optimizer, scheduler, state: ResumeState::default() });
        };

        let state = self.read_state(kind)?;
        let slot = self.slot_dir(kind);
        let recorder = CompactRecorder::new();

        let model = self.load_weights::<B, M>(kind, model, device)?;

        let optimizer = match optimizer {
            Some(optim) => {
                if !state.has_optimizer {
                    bail!("Checkpoint '{}' holds no optimizer state", slot.display());
                }
                let path = slot.join(OPTIMIZER_FILE);
                let record: O::Record = Recorder::<B>::load(&recorder, path.clone(), device)
                    .with_context(|| format!("Cannot load optimizer from '{}'", path.display()))?;
                Some(optim.load_record(record))
            }
            None => None,
        };

        let scheduler = match scheduler {
            Some(sched) => {
                if !state.has_scheduler {
                    bail!("Checkpoint '{}' holds no scheduler state", slot.display());
                }
                let path = slot.join(SCHEDULER_FILE);
                let record: S::Record<B> = Recorder::<B>::load(&recorder, path.clone(), device)
                    .with_context(|| format!("Cannot load scheduler from '{}'", path.display()))?;
                Some(sched.load_record::<B>(record))
            }
            None => None,
        };

        tracing::info!("Loaded model and optimizer.");
        Ok(Restored { model, optimizer, scheduler, state: resume_from(state, kind) })
    }

    /// Write a checkpoint into the given slot.
    #[allow(clippy::too_many_arguments)]
    pub fn save_state<B, M, O, S>(
        &self,
        kind:      CheckpointKind,
        model:     &M,
        optimizer: Option<&O>,
        scheduler: Option<&S>,
        epoch:     usize,
        best_acc:  f64,
        amp:       Option<Value>,
    ) -> Result<()>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
        S: LrScheduler,
    {
        let slot = self.slot_dir(kind);
        fs::create_dir_all(&slot)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", slot.display()))?;

        // The slot stays invisible until state.json is written again below
        let state_path = slot.join(STATE_FILE);
        if state_path.is_file() {
            fs::remove_file(&state_path)
                .with_context(|| format!("Cannot clear '{}'", state_path.display()))?;
        }
        let recorder = CompactRecorder::new();

        let path = slot.join(MODEL_FILE);
        model
            .clone()
            .save_file(path.clone(), &recorder)
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;

        if let Some(optim) = optimizer {
            let path = slot.join(OPTIMIZER_FILE);
            Recorder::<B>::record(&recorder, optim.to_record(), path.clone())
                .with_context(|| format!("Failed to save optimizer to '{}'", path.display()))?;
        }

        if let Some(sched) = scheduler {
            let path = slot.join(SCHEDULER_FILE);
            Recorder::<B>::record(&recorder, sched.to_record::<B>(), path.clone())
                .with_context(|| format!("Failed to save scheduler to '{}'", path.display()))?;
        }

        let state = CheckpointState {
            epoch,
            best_acc,
            amp,
            has_optimizer: optimizer.is_some(),
            has_scheduler: scheduler.is_some(),
        };
        let tmp = slot.join(format!("{STATE_FILE}.tmp"));
        fs::write(&tmp, serde_json::to_string_pretty(&state)?)
            .with_context(|| format!("Cannot write '{}'", tmp.display()))?;
        fs::rename(&tmp, &state_path)
            .with_context(|| format!("Cannot move '{}' into place", tmp.display()))?;

        tracing::debug!("Saved {:?} checkpoint: epoch {}", kind, epoch);
        Ok(())
    }

    fn config_path(&self) -> PathBuf {
        self.dir.join(format!("model_config_{}.json", self.model_no))
    }

    /// Save the classifier configuration so evaluation can rebuild the model.
    pub fn save_config(&self, cfg: &RelationClassifierConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create data dir '{}'", self.dir.display()))?;
        let path = self.config_path();
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<RelationClassifierConfig> {
        let path = self.config_path();
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read model config from '{}'. Was this model number ever trained?",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

fn resume_from(state: CheckpointState, kind: CheckpointKind) -> ResumeState {
    ResumeState {
        start_epoch: state.epoch,
        best_pred:   state.best_acc,
        amp:         state.amp,
        source:      Some(kind),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{Autodiff, NdArray},
        optim::{AdamConfig, GradientsParams, LearningRate},
        tensor::{Int, Tensor},
    };
    use std::collections::HashSet;

    use crate::ml::model::{EntityMarkerClassifier, RelationClassifier};

    type InnerBackend = NdArray;
    type TrainBackend = Autodiff<NdArray>;
    type Model = EntityMarkerClassifier<TrainBackend>;

    fn config() -> RelationClassifierConfig {
        RelationClassifierConfig::new(40, 3).with_d_model(8)
    }

    fn new_model() -> Model {
        config().init(&Default::default())
    }

    fn head_weights<B: Backend>(model: &EntityMarkerClassifier<B>) -> Vec<f32> {
        model.head.weight.val().into_data().iter::<f32>().collect()
    }

    /// Records are stored in half precision, so compare loosely
    fn roughly_equal(a: &[f32], b: &[f32]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-2)
    }

    /// Scheduler whose only state is the number of steps taken
    #[derive(Clone, Debug)]
    struct StepCounter {
        steps: usize,
    }

    impl LrScheduler for StepCounter {
        type Record<B: Backend> = usize;

        fn step(&mut self) -> LearningRate {
            self.steps += 1;
            1e-2
        }

        fn to_record<B: Backend>(&self) -> Self::Record<B> {
            self.steps
        }

        fn load_record<B: Backend>(mut self, record: Self::Record<B>) -> Self {
            self.steps = record;
            self
        }
    }

    /// One Adam step on a tiny batch, so the optimizer holds moment state
    fn train_one_step<O: Optimizer<Model, TrainBackend>>(model: Model, optim: &mut O) -> Model {
        let device = Default::default();
        let ids    = Tensor::<TrainBackend, 2, Int>::from_ints([[3, 4, 5]], &device);
        let types  = Tensor::<TrainBackend, 2, Int>::zeros([1, 3], &device);
        let mask   = Tensor::<TrainBackend, 2>::ones([1, 3], &device);
        let starts = Tensor::<TrainBackend, 2, Int>::from_ints([[0, 2]], &device);

        let loss  = model.classify(ids, types, mask, starts).sum();
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        optim.step(1e-2, model, grads)
    }

    /// `None`, typed after `value`
    fn absent<T>(_value: &T) -> Option<&T> {
        None
    }

    fn absent_owned<T>(_value: &T) -> Option<T> {
        None
    }

    fn save(mgr: &CheckpointManager, kind: CheckpointKind, model: &Model, epoch: usize, best: f64) {
        mgr.save_state::<TrainBackend, _, _, StepCounter>(
            kind,
            model,
            Some(&AdamConfig::new().init::<TrainBackend, Model>()),
            None,
            epoch,
            best,
            None,
        )
        .unwrap();
    }

    #[test]
    fn test_no_checkpoint_gives_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path(), 0);
        let model = new_model();
        let before = head_weights(&model);

        let restored = mgr
            .load_state::<TrainBackend, _, _, _>(
                model,
                Some(AdamConfig::new().init::<TrainBackend, Model>()),
                None::<StepCounter>,
                true,
                &Default::default(),
            )
            .unwrap();

        assert_eq!(restored.state, ResumeState::default());
        assert!(restored.optimizer.is_some());
        assert_eq!(head_weights(&restored.model), before);
    }

    #[test]
    fn test_save_then_resume_latest() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path(), 2);
        let trained = new_model();

        mgr.save_state::<TrainBackend, _, _, StepCounter>(
            CheckpointKind::Latest,
            &trained,
            Some(&AdamConfig::new().init::<TrainBackend, Model>()),
            None,
            7,
            0.61,
            Some(serde_json::json!({ "loss_scale": 1024.0 })),
        )
        .unwrap();
        assert!(dir.path().join("task_test_checkpoint_2").join("state.json").is_file());

        let restored = mgr
            .load_state::<TrainBackend, _, _, _>(
                new_model(),
                Some(AdamConfig::new().init::<TrainBackend, Model>()),
                None::<StepCounter>,
                false,
                &Default::default(),
            )
            .unwrap();

        assert_eq!(restored.state.start_epoch, 7);
        assert!((restored.state.best_pred - 0.61).abs() < 1e-12);
        assert_eq!(restored.state.source, Some(CheckpointKind::Latest));
        assert_eq!(restored.state.amp, Some(serde_json::json!({ "loss_scale": 1024.0 })));
        assert!(roughly_equal(&head_weights(&restored.model), &head_weights(&trained)));
    }

    #[test]
    fn test_best_preferred_only_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path(), 0);
        save(&mgr, CheckpointKind::Latest, &new_model(), 5, 0.70);
        save(&mgr, CheckpointKind::Best, &new_model(), 4, 0.75);

        let (_, best) = mgr.load_model::<TrainBackend, _>(new_model(), true, &Default::default()).unwrap();
        assert_eq!(best.start_epoch, 4);
        assert_eq!(best.source, Some(CheckpointKind::Best));

        let (_, latest) = mgr.load_model::<TrainBackend, _>(new_model(), false, &Default::default()).unwrap();
        assert_eq!(latest.start_epoch, 5);
    }

    #[test]
    fn test_best_falls_back_to_latest() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path(), 0);
        save(&mgr, CheckpointKind::Latest, &new_model(), 3, 0.5);

        let (_, state) = mgr.load_model::<TrainBackend, _>(new_model(), true, &Default::default()).unwrap();
        assert_eq!(state.source, Some(CheckpointKind::Latest));
        assert_eq!(state.start_epoch, 3);
    }

    #[test]
    fn test_weights_load_on_inference_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path(), 1);
        let trained = new_model();
        save(&mgr, CheckpointKind::Best, &trained, 9, 0.8);

        let fresh: EntityMarkerClassifier<InnerBackend> = config().init(&Default::default());
        let (loaded, _) = mgr.load_model::<InnerBackend, _>(fresh, true, &Default::default()).unwrap();
        assert!(roughly_equal(&head_weights(&loaded), &head_weights(&trained)));
    }

    #[test]
    fn test_missing_optimizer_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path(), 0);
        let adam = AdamConfig::new().init::<TrainBackend, Model>();
        mgr.save_state::<TrainBackend, _, _, StepCounter>(
            CheckpointKind::Latest,
            &new_model(),
            absent(&adam),
            None,
            1,
            0.1,
            None,
        )
        .unwrap();

        let result = mgr.load_state::<TrainBackend, _, _, _>(
            new_model(),
            Some(AdamConfig::new().init::<TrainBackend, Model>()),
            None::<StepCounter>,
            false,
            &Default::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_optimizer_state_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path(), 0);
        let mut adam = AdamConfig::new().init::<TrainBackend, Model>();
        let trained = train_one_step(new_model(), &mut adam);

        let saved: HashSet<_> = adam.to_record().into_keys().collect();
        assert!(!saved.is_empty());

        mgr.save_state::<TrainBackend, _, _, StepCounter>(
            CheckpointKind::Latest, &trained, Some(&adam), None, 1, 0.2, None,
        )
        .unwrap();

        let restored = mgr
            .load_state::<TrainBackend, _, _, _>(
                new_model(),
                Some(AdamConfig::new().init::<TrainBackend, Model>()),
                None::<StepCounter>,
                false,
                &Default::default(),
            )
            .unwrap();

        let loaded: HashSet<_> = restored.optimizer.unwrap().to_record().into_keys().collect();
        assert_eq!(loaded, saved);
        assert!(roughly_equal(&head_weights(&restored.model), &head_weights(&trained)));
    }

    #[test]
    fn test_scheduler_state_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path(), 0);
        let adam = AdamConfig::new().init::<TrainBackend, Model>();
        mgr.save_state::<TrainBackend, _, _, _>(
            CheckpointKind::Best,
            &new_model(),
            absent(&adam),
            Some(&StepCounter { steps: 5 }),
            3,
            0.4,
            None,
        )
        .unwrap();

        let restored = mgr
            .load_state::<TrainBackend, _, _, _>(
                new_model(),
                absent_owned(&adam),
                Some(StepCounter { steps: 0 }),
                true,
                &Default::default(),
            )
            .unwrap();
        assert_eq!(restored.scheduler.map(|s| s.steps), Some(5));
        assert!(restored.optimizer.is_none());

        // not passed in, so not restored
        let skipped = mgr
            .load_state::<TrainBackend, _, _, _>(
                new_model(),
                absent_owned(&adam),
                None::<StepCounter>,
                true,
                &Default::default(),
            )
            .unwrap();
        assert!(skipped.scheduler.is_none());
        assert_eq!(skipped.state.start_epoch, 3);
    }

    #[test]
    fn test_missing_scheduler_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path(), 0);
        save(&mgr, CheckpointKind::Latest, &new_model(), 1, 0.1);

        let result = mgr.load_state::<TrainBackend, _, _, _>(
            new_model(),
            Some(AdamConfig::new().init::<TrainBackend, Model>()),
            Some(StepCounter { steps: 0 }),
            false,
            &Default::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_failed_overwrite_hides_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path(), 0);
        save(&mgr, CheckpointKind::Latest, &new_model(), 1, 0.4);
        assert!(mgr.exists(CheckpointKind::Latest));

        // A directory where the optimizer record goes makes the next save fail
        // after the model weights were already overwritten.
        let slot = dir.path().join("task_test_checkpoint_0");
        let optim_file = slot.join("optimizer.mpk.gz");
        assert!(optim_file.is_file());
        fs::remove_file(&optim_file).unwrap();
        fs::create_dir(&optim_file).unwrap();

        let result = mgr.save_state::<TrainBackend, _, _, StepCounter>(
            CheckpointKind::Latest,
            &new_model(),
            Some(&AdamConfig::new().init::<TrainBackend, Model>()),
            None,
            2,
            0.5,
            None,
        );
        assert!(result.is_err());
        assert!(!mgr.exists(CheckpointKind::Latest));

        let (_, state) = mgr.load_model::<TrainBackend, _>(new_model(), false, &Default::default()).unwrap();
        assert_eq!(state.source, None);
    }

    #[test]
    fn test_half_written_slot_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path(), 0);
        fs::create_dir_all(dir.path().join("task_test_checkpoint_0")).unwrap();

        assert!(!mgr.exists(CheckpointKind::Latest));
        let (_, state) = mgr.load_model::<TrainBackend, _>(new_model(), false, &Default::default()).unwrap();
        assert_eq!(state.source, None);
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path().join("data"), 4);
        mgr.save_config(&config()).unwrap();
        assert!(dir.path().join("data").join("model_config_4.json").is_file());

        let loaded = mgr.load_config().unwrap();
        assert_eq!(loaded.vocab_size, 40);
        assert_eq!(loaded.d_model, 8);
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CheckpointManager::new(dir.path(), 0).load_config().is_err());
    }
}
