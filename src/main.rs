//! Sparse WGAN-GP pix2pix
//!
//! Main entry point providing CLI interface for:
//! - Writing a default configuration
//! - Training on a folder of aligned A|B images
//! - Running inference and saving translated images
//! - Rendering latent interpolations of a trained model

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use sparse_wgangp_pix2pix::{
    data::{load_aligned_folder, DataLoader, FolderOptions},
    training::{SparseWganGpPix2Pix, Trainer},
    utils::Config,
    Error,
};

/// Conditional image translation from sparse inputs with a WGAN-GP critic
#[derive(Parser)]
#[command(name = "sparse_pix2pix")]
#[command(version = "0.1.0")]
#[command(about = "Train and run a sparse-input pix2pix model with a WGAN-GP critic")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize default configuration file
    Init {
        /// Output configuration file path
        #[arg(short, long, default_value = "config.json")]
        output: String,
    },

    /// Train the model
    Train {
        /// Dataset directory, overrides the configuration
        #[arg(short, long)]
        data: Option<String>,

        /// Resume from the checkpoint named by `which_epoch`
        #[arg(long)]
        continue_train: bool,
    },

    /// Translate a dataset with a trained generator
    Test {
        /// Dataset directory, overrides the configuration
        #[arg(short, long)]
        data: Option<String>,

        /// Checkpoint label to load
        #[arg(long, default_value = "latest")]
        which_epoch: String,

        /// Maximum number of samples to translate
        #[arg(long, default_value = "50")]
        how_many: usize,

        /// Output directory
        #[arg(short, long, default_value = "results")]
        output: String,
    },

    /// Render label-gate and noise interpolations
    Latent {
        /// Dataset directory, overrides the configuration
        #[arg(short, long)]
        data: Option<String>,

        /// Checkpoint label to load
        #[arg(long, default_value = "latest")]
        which_epoch: String,

        /// End label of the sweep (defaults to the sample's label)
        #[arg(long)]
        label_1: Option<i64>,

        /// Start label of the sweep (defaults to target_label)
        #[arg(long)]
        label_2: Option<i64>,

        /// Output directory
        #[arg(short, long, default_value = "results")]
        output: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { output } => {
            init_config(&output)?;
        }
        Commands::Train {
            data,
            continue_train,
        } => {
            train_model(&cli.config, data, continue_train)?;
        }
        Commands::Test {
            data,
            which_epoch,
            how_many,
            output,
        } => {
            test_model(&cli.config, data, &which_epoch, how_many, &output)?;
        }
        Commands::Latent {
            data,
            which_epoch,
            label_1,
            label_2,
            output,
        } => {
            render_latent(&cli.config, data, &which_epoch, label_1, label_2, &output)?;
        }
    }

    Ok(())
}

/// Load configuration, falling back to defaults, with overrides applied
fn load_config(config_path: &str, data: Option<String>) -> Result<Config> {
    let mut config = if Path::new(config_path).exists() {
        Config::load(config_path)?
    } else {
        info!("Config file not found, using defaults");
        Config::default()
    };

    if let Some(data_root) = data {
        config.data.data_root = data_root;
    }
    config.validate()?;
    tch::manual_seed(config.training.seed as i64);
    Ok(config)
}

/// Build a data loader over the configured image folder
fn build_loader(config: &Config, shuffle: bool) -> Result<DataLoader> {
    let options = FolderOptions {
        fine_size: config.data.fine_size,
        input_nc: config.model.input_nc,
        output_nc: config.model.output_nc,
        mask_keep: config.data.mask_keep,
        seed: config.training.seed,
    };

    info!("Loading images from {}", config.data.data_root);
    let dataset = load_aligned_folder(Path::new(&config.data.data_root), &options)?;
    info!("Loaded {} image pairs", dataset.len());

    Ok(DataLoader::new(
        dataset,
        config.data.batch_size,
        shuffle,
        false,
        config.training.seed,
    )
    .with_device(config.get_device()))
}

/// Train the model
fn train_model(config_path: &str, data: Option<String>, continue_train: bool) -> Result<()> {
    let mut config = load_config(config_path, data)?;
    config.model.is_train = true;
    config.model.continue_train |= continue_train;

    let device = config.get_device();
    info!("Using device: {:?}", device);

    let mut loader = build_loader(&config, config.data.shuffle)?;
    let mut model = SparseWganGpPix2Pix::new(&config, device)?;

    let mut trainer = Trainer::new(config);
    let metrics = trainer.train(&mut model, &mut loader)?;

    if let Some(last) = metrics.latest() {
        info!(
            "Training complete. Final G_GAN: {:.4}, G_L1: {:.4}, D_real: {:.4}, D_fake: {:.4}",
            last.g_gan, last.g_l1, last.d_real, last.d_fake
        );
    }

    Ok(())
}

/// Validated configuration switched to inference
fn inference_config(config_path: &str, data: Option<String>, which_epoch: &str) -> Result<Config> {
    Ok(load_config(config_path, data)?.for_inference(which_epoch))
}

fn results_dir(output: &str, config: &Config) -> PathBuf {
    Path::new(output)
        .join(&config.model.name)
        .join(&config.model.which_epoch)
}

/// Translate up to `how_many` samples and save their visuals
fn test_model(
    config_path: &str,
    data: Option<String>,
    which_epoch: &str,
    how_many: usize,
    output: &str,
) -> Result<()> {
    let config = inference_config(config_path, data, which_epoch)?;
    let device = config.get_device();

    let mut loader = build_loader(&config, false)?;
    let mut model = SparseWganGpPix2Pix::new(&config, device)?;
    let image_dir = results_dir(output, &config).join("images");

    let mut saved = 0;
    for (i, batch) in loader.iter().enumerate().take(how_many) {
        model.set_input(&batch)?;
        model.test()?;
        model
            .current_visuals()?
            .save_png(&image_dir, &format!("{:04}_", i))?;
        saved += 1;
    }

    info!("Saved {} results to {}", saved, image_dir.display());
    Ok(())
}

/// Render latent interpolations for the first batch
fn render_latent(
    config_path: &str,
    data: Option<String>,
    which_epoch: &str,
    label_1: Option<i64>,
    label_2: Option<i64>,
    output: &str,
) -> Result<()> {
    let config = inference_config(config_path, data, which_epoch)?;
    let device = config.get_device();

    let mut loader = build_loader(&config, false)?;
    let mut model = SparseWganGpPix2Pix::new(&config, device)?;
    let out_dir = results_dir(output, &config).join("latent");

    let batch = loader
        .next_batch()
        .ok_or_else(|| anyhow::anyhow!("dataset produced no batch"))?;
    model.set_input(&batch)?;

    match model.gate_activations_g(label_1.unwrap_or(0)) {
        Ok(gate) => info!("Generator gate activations: {:?}", gate),
        Err(e) => warn!("{}", e),
    }

    match model.latent_space_visualization(label_1, label_2) {
        Ok(visuals) => {
            visuals.save_png(&out_dir, "space_")?;
            info!("Saved label sweep to {}", out_dir.display());
        }
        Err(Error::GateUnavailable(net)) => warn!("Skipping label sweep: {} is not gated", net),
        Err(e) => return Err(e.into()),
    }

    match model.randomize_noise() {
        Ok(()) => {
            model
                .latent_noise_visualization()?
                .save_png(&out_dir, "noise_")?;
            info!("Saved noise sweep to {}", out_dir.display());
        }
        Err(Error::NoiseDisabled) => info!("Noise disabled, skipping noise sweep"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Initialize default configuration file
fn init_config(output_path: &str) -> Result<()> {
    let config = Config::default();

    if output_path.ends_with(".toml") {
        config.save_toml(output_path)?;
    } else {
        config.save_json(output_path)?;
    }

    info!("Created default configuration at {}", output_path);
    Ok(())
}
