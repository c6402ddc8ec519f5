mod app_config;

use app_config::AppConfig;
use clap::{Parser, Subcommand};
use flownet::{
  inference::OnnxModel,
  training::{ConsoleProgress, EpochObserver, Silent},
  utils, DEFAULT_MODEL_NAME,
};
use std::{error::Error, path::PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Train the flow network on a CSV file and export it to ONNX
  Train {
    /// CSV with a header row; columns 0, 1, 4 are inputs, 2 and 3 targets
    #[arg(short, long, value_name = "PATH")]
    data: PathBuf,
    /// Output is written to <NAME>.onnx
    #[arg(short, long, default_value = DEFAULT_MODEL_NAME)]
    name: String,
    /// YAML file with training settings
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(short, long, value_name = "INT")]
    epochs: Option<usize>,
    #[arg(long, value_name = "INT")]
    batch_size: Option<usize>,
    #[arg(long, value_name = "INT")]
    seed: Option<u64>,
    /// Write per-epoch losses as JSON
    #[arg(long, value_name = "PATH")]
    history: Option<PathBuf>,
    /// Do not print epoch progress
    #[arg(short, long)]
    quiet: bool,
  },
  /// Predict flow rates with an exported model
  Predict {
    #[arg(short, long, value_name = "PATH")]
    model: PathBuf,
    /// First dimension, second dimension and frequency
    #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true)]
    input: Vec<f32>,
  },
  /// Print the resolved network topology
  Topology {
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
  },
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig, flownet::Error> {
  match path {
    Some(path) => AppConfig::from_file(path),
    None => Ok(AppConfig::default()),
  }
}

fn main() -> Result<(), Box<dyn Error>> {
  utils::init_logging()?;
  let args = Cli::parse();

  match args.command {
    Command::Train {
      data,
      name,
      config,
      epochs,
      batch_size,
      seed,
      history,
      quiet,
    } => {
      let cli = AppConfig {
        epochs,
        batch_size,
        seed,
        ..AppConfig::default()
      };
      let params = load_config(config.as_ref())?.merge(cli).into_params();

      let mut console = ConsoleProgress::stdout();
      let mut silent = Silent;
      let observer: &mut dyn EpochObserver = if quiet { &mut silent } else { &mut console };
      let (path, trained) = flownet::create_model_with(&data, &name, &params, observer)?;
      if let Some(history_path) = history {
        utils::serialize_to_file(&history_path, &trained.history)?;
        info!("Wrote training history to {:?}", history_path);
      }
      println!("{}", path.display());
    }
    Command::Predict { model, input } => {
      let input: [f32; 3] = input
        .try_into()
        .map_err(|v: Vec<f32>| format!("expected 3 inputs, got {}", v.len()))?;
      let model = OnnxModel::load(&model)?;
      let [pbs, fluo_surf] = model.predict(&input)?;
      println!("Flow rate PBS (µL/min)      : {pbs:>8.2}");
      println!("Flow rate FluoSurf (µL/min) : {fluo_surf:>8.2}");
    }
    Command::Topology { config } => {
      let params = load_config(config.as_ref())?.into_params();
      params.topology.validate()?;
      print!("{}", serde_yaml::to_string(&params.topology)?);
      println!("# {} parameters", params.topology.parameter_count());
    }
  }
  Ok(())
}
