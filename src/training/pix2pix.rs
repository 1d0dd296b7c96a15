//! Sparse WGAN-GP pix2pix model
//!
//! Owns the networks, optimizers, schedulers, criterion and image pool, and
//! drives one training step in a fixed order:
//!
//! 1. generator forward
//! 2. critic `zero_grad`, critic backward (losses + gradient penalty), critic `step`
//! 3. generator `zero_grad`, generator backward, generator `step`

use rand::rngs::StdRng;
use rand::SeedableRng;
use tch::{Device, Kind, Tensor};
use tracing::{debug, info};

use super::image_pool::ImagePool;
use super::latent::{label_frames, noise_frames, shadow};
use super::losses::WganLoss;
use super::optimizer::StepOptimizer;
use super::scheduler::LrScheduler;
use super::state::{CurrentErrors, Phase, StepInputs, TrainingState};
use super::steps::{self, LossWeights};
use crate::data::{Direction, RawBatch};
use crate::error::{Error, Result};
use crate::model::{CriticArch, GeneratorArch, Networks};
use crate::utils::config::Config;
use crate::utils::visuals::{tensor_to_image, Visuals};

/// Generator and critic optimizers
pub struct Optimizers {
    pub generator: Box<dyn StepOptimizer>,
    pub critic: Box<dyn StepOptimizer>,
}

/// Conditional pix2pix over sparse, masked inputs with a WGAN-GP critic
pub struct SparseWganGpPix2Pix {
    config: Config,
    direction: Direction,
    weights: LossWeights,
    networks: Networks,
    optimizers: Option<Optimizers>,
    schedulers: Option<(LrScheduler, LrScheduler)>,
    criterion: WganLoss,
    pool: ImagePool,
    state: TrainingState,
    /// Endpoints of the noise interpolation, shape (2, nz)
    test_noise: Option<Tensor>,
}

impl SparseWganGpPix2Pix {
    /// Build the model from a configuration
    ///
    /// In training mode this creates the critic and Adam optimizers; weights
    /// are loaded from `which_epoch` for inference or when resuming.
    pub fn new(config: &Config, device: Device) -> Result<Self> {
        let gen_arch: GeneratorArch = config.model.which_model_net_g.parse()?;
        let critic_arch = if config.model.is_train {
            Some(config.model.which_model_net_d.parse::<CriticArch>()?)
        } else {
            None
        };

        let mut networks = Networks::new(&config.network_config(), gen_arch, critic_arch, device);
        if !config.model.is_train || config.model.continue_train {
            networks.load(&config.experiment_dir(), &config.model.which_epoch)?;
        }

        let optimizers = if config.model.is_train {
            let t = &config.training;
            let generator = networks.gen_optimizer(t.lr_g, t.beta1)?;
            let critic = networks
                .disc_optimizer(t.lr_d, t.beta1)?
                .ok_or(Error::InferenceOnly)?;
            Some(Optimizers {
                generator: Box::new(generator),
                critic: Box::new(critic),
            })
        } else {
            None
        };

        Self::assemble(config.clone(), networks, optimizers)
    }

    /// Build a training model around existing networks and optimizers
    pub fn with_optimizers(config: &Config, networks: Networks, optimizers: Optimizers) -> Result<Self> {
        Self::assemble(config.clone(), networks, Some(optimizers))
    }

    fn assemble(config: Config, networks: Networks, mut optimizers: Option<Optimizers>) -> Result<Self> {
        let direction: Direction = config.data.which_direction.parse()?;

        let schedulers = match optimizers.as_mut() {
            Some(opts) => {
                let t = &config.training;
                let gen = LrScheduler::new(&t.lr_policy, t.lr_g, t.epoch_count, t.niter, t.niter_decay)?;
                let disc = LrScheduler::new(&t.lr_policy, t.lr_d, t.epoch_count, t.niter, t.niter_decay)?;
                opts.generator.set_lr(gen.current_lr());
                opts.critic.set_lr(disc.current_lr());
                Some((gen, disc))
            }
            None => None,
        };

        let m = &config.model;
        let weights = LossWeights {
            lambda_a: m.lambda_a,
            lambda_gan: m.lambda_gan,
            wgan_gp_lambda: m.wgan_gp_lambda,
            wgan_gp_center: m.wgan_gp_center,
            img_conditional_d: m.img_conditional_d,
        };
        let test_noise = (m.nz > 0)
            .then(|| Tensor::randn([2, m.nz], (Kind::Float, networks.device)) * m.test_std);

        info!(
            "Model [{}] initialized: direction {}, pool {}, training {}",
            m.name,
            direction,
            m.pool_size,
            optimizers.is_some()
        );

        Ok(Self {
            pool: ImagePool::with_rng(m.pool_size, StdRng::seed_from_u64(config.training.seed)),
            config,
            direction,
            weights,
            networks,
            optimizers,
            schedulers,
            criterion: WganLoss::new(),
            state: TrainingState::default(),
            test_noise,
        })
    }

    /// Stage a batch, oriented by the configured direction
    ///
    /// Samples fresh latent noise when nz > 0. Clears the previous output.
    pub fn set_input(&mut self, batch: &RawBatch) -> Result<()> {
        let (source, target) = batch.oriented(self.direction);
        validate_batch(source, target, &batch.a_mask, &batch.label, self.config.model.n_classes)?;

        let device = self.networks.device;
        let real_a = source.to_device(device);
        let nz = self.config.model.nz;
        let noise = (nz > 0).then(|| Tensor::randn([batch.batch_size(), nz], (Kind::Float, device)));
        let sparse_real_a = match &batch.a_sparse {
            Some(sparse) => sparse.to_device(device),
            None => real_a.shallow_clone(),
        };

        self.state.inputs = Some(StepInputs {
            real_a,
            real_b: target.to_device(device),
            mask: batch.a_mask.to_device(device),
            label: batch.label.to_device(device),
            noise,
            sparse_real_a,
        });
        self.state.fake_b = None;
        self.state.phase = Phase::Idle;
        Ok(())
    }

    /// Run the generator on the staged batch
    pub fn forward(&mut self) -> Result<()> {
        steps::forward(&mut self.state, self.networks.generator.as_ref())
    }

    /// Inference pass: no gradient tracking, zero noise
    pub fn test(&mut self) -> Result<()> {
        let inputs = self.state.inputs()?;
        let noise = inputs.noise.as_ref().map(|n| n.zeros_like());
        let generator = self.networks.generator.as_ref();
        let fake_b = tch::no_grad(|| generator.generate(&inputs.real_a, &inputs.label, noise.as_ref()));
        self.state.fake_b = Some(fake_b);
        Ok(())
    }

    /// One full training step on the staged batch
    pub fn optimize_parameters(&mut self) -> Result<()> {
        let (critic, optimizers) = match (&self.networks.critic, self.optimizers.as_mut()) {
            (Some(critic), Some(optimizers)) => (critic.as_ref(), optimizers),
            _ => return Err(Error::InferenceOnly),
        };

        steps::forward(&mut self.state, self.networks.generator.as_ref())?;

        optimizers.critic.zero_grad();
        steps::backward_d(
            &mut self.state,
            critic,
            &mut self.criterion,
            &mut self.pool,
            &self.weights,
        )?;
        optimizers.critic.step();
        self.state.phase = Phase::DiscriminatorUpdated;

        optimizers.generator.zero_grad();
        steps::backward_g(&mut self.state, critic, &mut self.criterion, &self.weights)?;
        optimizers.generator.step();
        self.state.phase = Phase::GeneratorUpdated;

        Ok(())
    }

    /// Losses of the last step
    pub fn current_errors(&self) -> CurrentErrors {
        self.state.errors
    }

    /// Weighted gradient penalty of the last critic update
    pub fn current_penalty(&self) -> f64 {
        self.state.penalty
    }

    /// Rendered images of the last step: input, sparse input, mask, output and target
    pub fn current_visuals(&self) -> Result<Visuals> {
        let inputs = self.state.inputs()?;
        let fake_b = self.state.fake_b()?;

        let mut visuals = Visuals::new();
        visuals.push("real_A", tensor_to_image(&inputs.real_a, false)?);
        visuals.push("sparse_real_A", tensor_to_image(&inputs.sparse_real_a, false)?);
        // Mask is in [0, 1]; shift to the image range so 0 renders black
        visuals.push("mask_real_A", tensor_to_image(&(&inputs.mask * 2.0 - 1.0), false)?);
        visuals.push("fake_B", tensor_to_image(fake_b, false)?);
        visuals.push("real_B", tensor_to_image(&inputs.real_b, false)?);
        Ok(visuals)
    }

    /// Save both networks under `label` in the experiment directory
    pub fn save(&self, label: &str) -> Result<()> {
        self.networks.save(&self.config.experiment_dir(), label)
    }

    /// Advance both schedulers by one epoch; returns the generator rate
    pub fn update_learning_rate(&mut self) -> Result<f64> {
        let (optimizers, (gen, disc)) = match (self.optimizers.as_mut(), self.schedulers.as_mut()) {
            (Some(optimizers), Some(schedulers)) => (optimizers, schedulers),
            _ => return Err(Error::InferenceOnly),
        };

        let lr_g = gen.step(optimizers.generator.as_mut());
        let lr_d = disc.step(optimizers.critic.as_mut());
        info!("learning rate = {:.7} (critic {:.7})", lr_g, lr_d);
        Ok(lr_g)
    }

    /// Current generator learning rate, if training
    pub fn current_lr(&self) -> Option<f64> {
        self.schedulers.as_ref().map(|(gen, _)| gen.current_lr())
    }

    /// Generator gate signal for a single label
    pub fn gate_activations_g(&self, label: i64) -> Result<Vec<f32>> {
        let gated = self
            .networks
            .generator
            .gated()
            .ok_or(Error::GateUnavailable("generator"))?;
        let label = self.label_tensor(label, 1)?;
        let gate = tch::no_grad(|| gated.forward_gate(&label));
        Ok(Vec::<f32>::try_from(&gate.flatten(0, -1).to_kind(Kind::Float))?)
    }

    /// Critic gate signal for a single label
    pub fn gate_activations_d(&self, label: i64) -> Result<Vec<f32>> {
        let critic = self.networks.critic.as_ref().ok_or(Error::InferenceOnly)?;
        let label = self.label_tensor(label, 1)?;
        let gate = tch::no_grad(|| critic.forward_gate(&label)).ok_or(Error::GateUnavailable("critic"))?;
        Ok(Vec::<f32>::try_from(&gate.flatten(0, -1).to_kind(Kind::Float))?)
    }

    /// Redraw the noise interpolation endpoints with std `test_std`
    pub fn randomize_noise(&mut self) -> Result<()> {
        let nz = self.config.model.nz;
        if nz == 0 {
            return Err(Error::NoiseDisabled);
        }
        let noise = Tensor::randn([2, nz], (Kind::Float, self.networks.device)) * self.config.model.test_std;
        self.test_noise = Some(noise);
        Ok(())
    }

    /// Outputs for the generator gate swept between two labels
    ///
    /// `label_1` defaults to the first label of the staged batch and
    /// `label_2` to `target_label`. Noise is held at zero.
    pub fn latent_space_visualization(&self, label_1: Option<i64>, label_2: Option<i64>) -> Result<Visuals> {
        let inputs = self.state.inputs()?;
        let gated = self
            .networks
            .generator
            .gated()
            .ok_or(Error::GateUnavailable("generator"))?;

        let n = inputs.batch_size();
        let label_1 = match label_1 {
            Some(l) => l,
            None => inputs.label.int64_value(&[0]),
        };
        let label_2 = label_2.unwrap_or(self.config.model.target_label);
        debug!("Latent space sweep from label {} to {}", label_2, label_1);

        let noise = inputs.noise.as_ref().map(|n| n.zeros_like());
        let frames = label_frames(
            gated,
            &inputs.real_a,
            &self.label_tensor(label_1, n)?,
            &self.label_tensor(label_2, n)?,
            self.config.model.num_interpolate,
            noise.as_ref(),
        );
        self.sweep_visuals(inputs, &frames)
    }

    /// Outputs for the latent noise swept between the two test endpoints
    pub fn latent_noise_visualization(&self) -> Result<Visuals> {
        let test_noise = self.test_noise.as_ref().ok_or(Error::NoiseDisabled)?;
        let inputs = self.state.inputs()?;

        let frames = noise_frames(
            self.networks.generator.as_ref(),
            &inputs.real_a,
            &inputs.label,
            &test_noise.get(0),
            &test_noise.get(1),
            self.config.model.num_interpolate,
        );
        self.sweep_visuals(inputs, &frames)
    }

    fn sweep_visuals(&self, inputs: &StepInputs, frames: &[Tensor]) -> Result<Visuals> {
        let mut visuals = Visuals::new();
        visuals.push("latent_real_A", tensor_to_image(&inputs.real_a, false)?);
        for (i, frame) in frames.iter().enumerate() {
            visuals.push(format!("{}_L_fake_B_inter", i), tensor_to_image(frame, false)?);
        }
        if let Some(total) = shadow(frames) {
            visuals.push("fake_B_shadow", tensor_to_image(&total, true)?);
        }
        visuals.push("latent_real_B", tensor_to_image(&inputs.real_b, false)?);
        Ok(visuals)
    }

    /// `n` copies of `label`, which must be a known class
    fn label_tensor(&self, label: i64, n: i64) -> Result<Tensor> {
        check_label_range(label, label, self.config.model.n_classes)?;
        Ok(Tensor::full([n], label, (Kind::Int64, self.networks.device)))
    }

    /// Configuration the model was built from
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Networks and their variable stores
    pub fn networks(&self) -> &Networks {
        &self.networks
    }

    /// Last phase of `optimize_parameters`
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Generator output of the last forward or test pass
    pub fn fake_b(&self) -> Option<&Tensor> {
        self.state.fake_b.as_ref()
    }

    /// Whether the model can train
    pub fn is_train(&self) -> bool {
        self.optimizers.is_some()
    }
}

/// Check a batch against the batch schema
fn validate_batch(
    source: &Tensor,
    target: &Tensor,
    mask: &Tensor,
    label: &Tensor,
    n_classes: i64,
) -> Result<()> {
    if source.dim() != 4 || target.dim() != 4 || mask.dim() != 4 {
        return Err(Error::InvalidBatch(format!(
            "expected 4-d images, got source {:?}, target {:?}, mask {:?}",
            source.size(),
            target.size(),
            mask.size()
        )));
    }

    let (s, t, m) = (source.size(), target.size(), mask.size());
    let n = s[0];
    if n == 0 {
        return Err(Error::InvalidBatch("empty batch".to_string()));
    }
    if t[0] != n || m[0] != n || label.size() != [n] {
        return Err(Error::InvalidBatch(format!(
            "batch sizes differ: source {}, target {}, mask {}, label {:?}",
            n,
            t[0],
            m[0],
            label.size()
        )));
    }
    if m[1] != 1 {
        return Err(Error::InvalidBatch(format!("mask must have 1 channel, got {}", m[1])));
    }
    if s[2..] != t[2..] || s[2..] != m[2..] {
        return Err(Error::InvalidBatch(format!(
            "spatial sizes differ: source {:?}, target {:?}, mask {:?}",
            &s[2..],
            &t[2..],
            &m[2..]
        )));
    }
    if label.kind() != Kind::Int64 {
        return Err(Error::InvalidBatch(format!("labels must be int64, got {:?}", label.kind())));
    }

    let (lo, hi) = (mask.min().double_value(&[]), mask.max().double_value(&[]));
    if lo < 0.0 || hi > 1.0 {
        return Err(Error::InvalidBatch(format!("mask values outside [0, 1]: [{}, {}]", lo, hi)));
    }
    check_label_range(label.min().int64_value(&[]), label.max().int64_value(&[]), n_classes)
}

/// Labels index the gate embeddings, so they must lie in `0..n_classes`
fn check_label_range(lo: i64, hi: i64, n_classes: i64) -> Result<()> {
    if lo < 0 || hi >= n_classes {
        return Err(Error::InvalidBatch(format!(
            "labels must be in 0..{}, got [{}, {}]",
            n_classes, lo, hi
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;

    type CallLog = Rc<RefCell<Vec<String>>>;

    struct RecordingOptimizer {
        name: &'static str,
        log: CallLog,
    }

    impl StepOptimizer for RecordingOptimizer {
        fn zero_grad(&mut self) {
            self.log.borrow_mut().push(format!("{}.zero_grad", self.name));
        }
        fn step(&mut self) {
            self.log.borrow_mut().push(format!("{}.step", self.name));
        }
        fn set_lr(&mut self, _lr: f64) {}
    }

    fn small_config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.model.checkpoints_dir = dir.to_string_lossy().into_owned();
        config.model.input_nc = 1;
        config.model.output_nc = 1;
        config.model.ngf = 4;
        config.model.ndf = 4;
        config.model.n_classes = 3;
        config.model.nz = 0;
        config.model.which_model_net_g = "plain".to_string();
        config.model.which_model_net_d = "plain".to_string();
        config.model.img_conditional_d = false;
        config.model.num_interpolate = 3;
        config
    }

    fn batch(n: i64) -> RawBatch {
        let opts = (Kind::Float, Device::Cpu);
        RawBatch {
            a: Tensor::rand([n, 1, 4, 4], opts) * 2.0 - 1.0,
            b: Tensor::rand([n, 1, 4, 4], opts) * 2.0 - 1.0,
            a_mask: Tensor::rand([n, 1, 4, 4], opts).round(),
            label: Tensor::arange(n, (Kind::Int64, Device::Cpu)).remainder(3),
            a_sparse: None,
        }
    }

    #[test]
    fn test_step_order_is_critic_then_generator() {
        let dir = tempdir().unwrap();
        let config = small_config(dir.path());
        let networks = Networks::new(
            &config.network_config(),
            GeneratorArch::Plain,
            Some(CriticArch::Plain),
            Device::Cpu,
        );
        let log = CallLog::default();
        let optimizers = Optimizers {
            generator: Box::new(RecordingOptimizer { name: "G", log: log.clone() }),
            critic: Box::new(RecordingOptimizer { name: "D", log: log.clone() }),
        };

        let mut model = SparseWganGpPix2Pix::with_optimizers(&config, networks, optimizers).unwrap();
        model.set_input(&batch(2)).unwrap();
        model.optimize_parameters().unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["D.zero_grad", "D.step", "G.zero_grad", "G.step"]
        );
        assert_eq!(model.phase(), Phase::GeneratorUpdated);
    }

    #[test]
    fn test_training_step_end_to_end() {
        let dir = tempdir().unwrap();
        let config = small_config(dir.path());
        let mut model = SparseWganGpPix2Pix::new(&config, Device::Cpu).unwrap();

        for _ in 0..2 {
            model.set_input(&batch(2)).unwrap();
            model.optimize_parameters().unwrap();
        }

        let errors = model.current_errors();
        assert!(errors.is_finite());
        assert!(model.current_penalty() >= 0.0);
        assert_eq!(model.fake_b().unwrap().size(), vec![2, 1, 4, 4]);

        let visuals = model.current_visuals().unwrap();
        assert_eq!(
            visuals.names(),
            vec!["real_A", "sparse_real_A", "mask_real_A", "fake_B", "real_B"]
        );
    }

    #[test]
    fn test_gated_conditional_model_with_noise_and_pool() {
        let dir = tempdir().unwrap();
        let mut config = small_config(dir.path());
        config.model.which_model_net_g = "gated".to_string();
        config.model.which_model_net_d = "gated".to_string();
        config.model.img_conditional_d = true;
        config.model.nz = 2;
        config.model.pool_size = 2;
        config.data.which_direction = "BtoA".to_string();

        let mut model = SparseWganGpPix2Pix::new(&config, Device::Cpu).unwrap();
        for _ in 0..3 {
            model.set_input(&batch(2)).unwrap();
            model.optimize_parameters().unwrap();
            assert!(model.current_errors().is_finite());
        }

        assert_eq!(model.gate_activations_g(1).unwrap().len(), 4);
        assert_eq!(model.gate_activations_d(1).unwrap().len(), 8);

        let space = model.latent_space_visualization(None, Some(2)).unwrap();
        assert_eq!(space.len(), 3 + 3);
        assert!(space.get("2_L_fake_B_inter").is_some());
        assert!(space.get("fake_B_shadow").is_some());

        model.randomize_noise().unwrap();
        let noise = model.latent_noise_visualization().unwrap();
        assert_eq!(noise.len(), 6);
    }

    #[test]
    fn test_plain_generator_has_no_diagnostics() {
        let dir = tempdir().unwrap();
        let mut model = SparseWganGpPix2Pix::new(&small_config(dir.path()), Device::Cpu).unwrap();
        model.set_input(&batch(1)).unwrap();

        assert!(matches!(model.gate_activations_g(0), Err(Error::GateUnavailable("generator"))));
        assert!(matches!(model.gate_activations_d(0), Err(Error::GateUnavailable("critic"))));
        assert!(matches!(model.randomize_noise(), Err(Error::NoiseDisabled)));
        assert!(matches!(model.latent_noise_visualization(), Err(Error::NoiseDisabled)));
    }

    #[test]
    fn test_optimize_requires_input() {
        let dir = tempdir().unwrap();
        let mut model = SparseWganGpPix2Pix::new(&small_config(dir.path()), Device::Cpu).unwrap();
        assert!(matches!(model.optimize_parameters(), Err(Error::MissingInput)));
        assert!(matches!(model.current_visuals(), Err(Error::MissingInput)));
    }

    #[test]
    fn test_set_input_rejects_malformed_batches() {
        let dir = tempdir().unwrap();
        let mut model = SparseWganGpPix2Pix::new(&small_config(dir.path()), Device::Cpu).unwrap();

        let mut bad_label = batch(2);
        bad_label.label = Tensor::from_slice(&[0i64, 1, 2]);
        assert!(matches!(model.set_input(&bad_label), Err(Error::InvalidBatch(_))));

        let mut bad_mask = batch(2);
        bad_mask.a_mask = Tensor::ones([2, 2, 4, 4], (Kind::Float, Device::Cpu));
        assert!(matches!(model.set_input(&bad_mask), Err(Error::InvalidBatch(_))));

        let mut out_of_range = batch(2);
        out_of_range.a_mask = Tensor::full([2, 1, 4, 4], 2.0, (Kind::Float, Device::Cpu));
        assert!(matches!(model.set_input(&out_of_range), Err(Error::InvalidBatch(_))));

        // n_classes is 3
        let mut unknown_class = batch(2);
        unknown_class.label = Tensor::from_slice(&[0i64, 3]);
        assert!(matches!(model.set_input(&unknown_class), Err(Error::InvalidBatch(_))));

        let mut negative_class = batch(2);
        negative_class.label = Tensor::from_slice(&[-1i64, 0]);
        assert!(matches!(model.set_input(&negative_class), Err(Error::InvalidBatch(_))));
    }

    #[test]
    fn test_diagnostics_reject_unknown_labels() {
        let dir = tempdir().unwrap();
        let mut config = small_config(dir.path());
        config.model.which_model_net_g = "gated".to_string();
        config.model.which_model_net_d = "gated".to_string();

        let mut model = SparseWganGpPix2Pix::new(&config, Device::Cpu).unwrap();
        model.set_input(&batch(2)).unwrap();

        assert!(matches!(model.gate_activations_g(42), Err(Error::InvalidBatch(_))));
        assert!(matches!(model.gate_activations_d(-1), Err(Error::InvalidBatch(_))));
        assert!(matches!(
            model.latent_space_visualization(Some(3), None),
            Err(Error::InvalidBatch(_))
        ));
        assert!(matches!(
            model.latent_space_visualization(None, Some(7)),
            Err(Error::InvalidBatch(_))
        ));
        assert_eq!(model.gate_activations_g(2).unwrap().len(), 4);
    }

    #[test]
    fn test_inference_pass_tracks_no_gradient() {
        let dir = tempdir().unwrap();
        let mut model = SparseWganGpPix2Pix::new(&small_config(dir.path()), Device::Cpu).unwrap();
        model.set_input(&batch(2)).unwrap();
        model.test().unwrap();

        let fake_b = model.fake_b().unwrap();
        assert_eq!(fake_b.size(), vec![2, 1, 4, 4]);
        assert!(!fake_b.requires_grad());
    }

    #[test]
    fn test_learning_rate_update_and_resume() {
        let dir = tempdir().unwrap();
        let mut config = small_config(dir.path());
        config.training.niter = 1;
        config.training.niter_decay = 1;

        let mut model = SparseWganGpPix2Pix::new(&config, Device::Cpu).unwrap();
        assert_relative_eq!(model.update_learning_rate().unwrap(), 0.0);
        model.save("latest").unwrap();
        assert!(config.experiment_dir().join("latest_net_G.pt").exists());

        config.model.is_train = false;
        let mut inference = SparseWganGpPix2Pix::new(&config, Device::Cpu).unwrap();
        assert!(!inference.is_train());
        assert!(matches!(inference.update_learning_rate(), Err(Error::InferenceOnly)));
        inference.set_input(&batch(1)).unwrap();
        assert!(matches!(inference.optimize_parameters(), Err(Error::InferenceOnly)));
        inference.test().unwrap();
    }
}
