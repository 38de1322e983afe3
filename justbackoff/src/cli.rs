use crate::backoff::Backoff;
use crate::config::BackoffConfig;
use crate::jitter::{JitterSource, SeededSource, ThreadRandom};
use crate::output::{emit_data, wrap_ok, OutputFormat};
use crate::util::{to_ms, to_seconds};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Value as JsonValue};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "justbackoff",
    about = "Print exponential backoff delays",
    disable_help_subcommand = true,
    after_help = r#"Examples:
  justbackoff schedule --attempts 8
  justbackoff --factor 1.5 --jitter --seed 42 schedule --json
  justbackoff attempt 3
  JUSTBACKOFF_MIN_MS=250 justbackoff config show
  justbackoff convert to-seconds 1500"#
)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Config file (defaults to the per-user config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Minimum delay in milliseconds
    #[arg(long = "min-ms", global = true, allow_negative_numbers = true)]
    pub min_ms: Option<f64>,
    /// Maximum delay in milliseconds
    #[arg(long = "max-ms", global = true, allow_negative_numbers = true)]
    pub max_ms: Option<f64>,
    /// Growth factor per attempt
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub factor: Option<f64>,
    /// Randomize delays between min-ms and the unjittered delay
    #[arg(long, global = true, conflicts_with = "no_jitter")]
    pub jitter: bool,
    /// Disable jitter even when the config file or environment enables it
    #[arg(long = "no-jitter", global = true)]
    pub no_jitter: bool,
    /// Seed for reproducible jitter
    #[arg(long, global = true)]
    pub seed: Option<u64>,
    /// JSON output
    #[arg(long, global = true)]
    pub json: bool,
    /// Verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,
    /// Debug logging
    #[arg(long, global = true)]
    pub debug: bool,
    /// Color control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ColorChoice {
    Always,
    Auto,
    Never,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Delays produced by consecutive calls
    Schedule(ScheduleArgs),
    /// Delay for a single attempt number
    Attempt {
        #[arg(allow_negative_numbers = true)]
        attempt: f64,
    },
    Convert(ConvertCmd),
    Config(ConfigCmd),
}

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Number of delays to print
    #[arg(long, default_value_t = 5)]
    pub attempts: u32,
    /// Reset the counter after this many delays
    #[arg(long = "reset-after")]
    pub reset_after: Option<u32>,
}

#[derive(Args, Debug)]
pub struct ConvertCmd {
    #[command(subcommand)]
    sub: ConvertSub,
}
#[derive(Subcommand, Debug)]
pub enum ConvertSub {
    ToSeconds {
        #[arg(allow_negative_numbers = true)]
        milliseconds: f64,
    },
    ToMs {
        #[arg(allow_negative_numbers = true)]
        seconds: f64,
    },
}

#[derive(Args, Debug)]
pub struct ConfigCmd {
    #[command(subcommand)]
    sub: ConfigSub,
}
#[derive(Subcommand, Debug)]
pub enum ConfigSub {
    Show,
    Path,
    /// Write the effective settings to the config file
    Init {
        #[arg(long)]
        force: bool,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    let mut cfg = load_config(&cli)?;
    cfg.apply_env().context("apply environment")?;
    apply_overrides(&cli, &mut cfg);
    for w in cfg.check() {
        warn!("{}", w);
    }

    match &cli.command {
        Commands::Schedule(args) => run_schedule(args, &cfg, &cli),
        Commands::Attempt { attempt } => run_attempt(*attempt, &cfg, &cli),
        Commands::Convert(cmd) => run_convert(cmd, &cli),
        Commands::Config(cmd) => run_config(cmd, &cfg, &cli),
    }
}

/// Flag values win over the file and the environment.
pub fn apply_overrides(cli: &Cli, cfg: &mut BackoffConfig) {
    if let Some(v) = cli.min_ms {
        cfg.min_ms = v;
    }
    if let Some(v) = cli.max_ms {
        cfg.max_ms = v;
    }
    if let Some(v) = cli.factor {
        cfg.factor = v;
    }
    if cli.jitter {
        cfg.jitter = true;
    } else if cli.no_jitter {
        cfg.jitter = false;
    }
}

// `config path` and `config init` may name a file that does not exist yet
fn load_config(cli: &Cli) -> Result<BackoffConfig> {
    let targets_file = matches!(
        &cli.command,
        Commands::Config(ConfigCmd {
            sub: ConfigSub::Path | ConfigSub::Init { .. }
        })
    );
    match cli.config.as_deref() {
        Some(p) if targets_file && !p.exists() => Ok(BackoffConfig::default()),
        path => BackoffConfig::load(path).context("load config"),
    }
}

fn fmt_from_cli(cli: &Cli) -> OutputFormat {
    if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Yaml
    }
}

fn backoff_from(cfg: &BackoffConfig, cli: &Cli) -> Backoff<Box<dyn JitterSource>> {
    let source: Box<dyn JitterSource> = match cli.seed {
        Some(seed) => Box::new(SeededSource::new(seed)),
        None => Box::new(ThreadRandom),
    };
    cfg.build_with_source(source)
}

fn settings(cfg: &BackoffConfig) -> JsonValue {
    json!({
        "min_ms": cfg.min_ms,
        "max_ms": cfg.max_ms,
        "factor": cfg.factor,
        "jitter": cfg.jitter,
    })
}

fn delay_row(attempt: f64, seconds: f64) -> JsonValue {
    json!({
        "attempt": attempt,
        "seconds": seconds,
        "ms": to_ms(seconds),
    })
}

/// Simulates `attempts` calls to `duration()`, resetting after `reset_after`
/// of them when asked.
pub fn schedule<R: JitterSource>(b: &mut Backoff<R>, attempts: u32, reset_after: Option<u32>) -> Vec<JsonValue> {
    let mut rows = Vec::with_capacity(attempts as usize);
    for i in 0..attempts {
        if reset_after == Some(i) {
            b.reset();
        }
        let attempt = b.attempt();
        let seconds = b.duration();
        rows.push(delay_row(attempt, seconds));
    }
    rows
}

fn run_schedule(args: &ScheduleArgs, cfg: &BackoffConfig, cli: &Cli) -> Result<()> {
    let mut b = backoff_from(cfg, cli);
    let rows = schedule(&mut b, args.attempts, args.reset_after);
    info!(count = rows.len(), "computed schedule");

    let mut meta = settings(cfg);
    if let Some(obj) = meta.as_object_mut() {
        obj.insert("next_attempt".into(), json!(b.attempt()));
        if let Some(k) = args.reset_after {
            obj.insert("reset_after".into(), json!(k));
        }
    }
    emit_data(&fmt_from_cli(cli), &wrap_ok(&JsonValue::Array(rows), Some(meta)))
}

fn run_attempt(attempt: f64, cfg: &BackoffConfig, cli: &Cli) -> Result<()> {
    let b = backoff_from(cfg, cli);
    let row = delay_row(attempt, b.for_attempt(attempt));
    emit_data(&fmt_from_cli(cli), &wrap_ok(&row, Some(settings(cfg))))
}

fn run_convert(cmd: &ConvertCmd, cli: &Cli) -> Result<()> {
    let data = match &cmd.sub {
        ConvertSub::ToSeconds { milliseconds } => json!({ "seconds": to_seconds(*milliseconds) }),
        ConvertSub::ToMs { seconds } => json!({ "ms": to_ms(*seconds) }),
    };
    emit_data(&fmt_from_cli(cli), &wrap_ok(&data, None))
}

fn config_target(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(p) => Ok(p.clone()),
        None => BackoffConfig::config_path().context("resolve config path"),
    }
}

fn run_config(cmd: &ConfigCmd, cfg: &BackoffConfig, cli: &Cli) -> Result<()> {
    match &cmd.sub {
        ConfigSub::Show => {
            let warnings: Vec<JsonValue> = cfg
                .check()
                .iter()
                .map(|w| JsonValue::String(w.to_string()))
                .collect();
            let meta = json!({ "warnings": warnings });
            emit_data(&fmt_from_cli(cli), &wrap_ok(&settings(cfg), Some(meta)))
        }
        ConfigSub::Path => {
            let path = config_target(cli)?;
            emit_data(&OutputFormat::Raw, &JsonValue::String(path.display().to_string()))
        }
        ConfigSub::Init { force } => {
            let path = config_target(cli)?;
            if path.exists() && !force {
                anyhow::bail!("{} already exists; pass --force to overwrite", path.display());
            }
            cfg.save(&path).context("save config")?;
            emit_data(
                &fmt_from_cli(cli),
                &json!({ "status": "ok", "path": path.display().to_string() }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jitter::FixedSource;

    #[test]
    fn schedule_resets_midway() {
        let mut b = Backoff::with_source(100.0, 10_000.0, 2.0, false, FixedSource(0.0));
        let rows = schedule(&mut b, 4, Some(3));
        let secs: Vec<f64> = rows.iter().map(|r| r["seconds"].as_f64().unwrap()).collect();
        assert_eq!(secs, vec![0.1, 0.2, 0.4, 0.1]);
        assert_eq!(rows[3]["attempt"].as_f64(), Some(0.0));
        assert_eq!(b.attempt(), 1.0);
    }

    #[test]
    fn flags_override_jitter_both_ways() {
        let mut cfg = BackoffConfig {
            jitter: true,
            ..Default::default()
        };
        let cli = Cli::try_parse_from(["justbackoff", "--no-jitter", "--factor", "3", "attempt", "1"]).unwrap();
        apply_overrides(&cli, &mut cfg);
        assert!(!cfg.jitter);
        assert_eq!(cfg.factor, 3.0);

        let cli = Cli::try_parse_from(["justbackoff", "--jitter", "attempt", "1"]).unwrap();
        apply_overrides(&cli, &mut cfg);
        assert!(cfg.jitter);

        assert!(Cli::try_parse_from(["justbackoff", "--jitter", "--no-jitter", "attempt", "1"]).is_err());
    }

    #[test]
    fn cli_parses_negative_settings() {
        let cli = Cli::try_parse_from(["justbackoff", "--min-ms", "-5", "attempt", "2"]).unwrap();
        assert_eq!(cli.min_ms, Some(-5.0));
        assert!(matches!(cli.command, Commands::Attempt { attempt } if attempt == 2.0));
    }
}
