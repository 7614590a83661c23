//! bitgate-train - Train a bit-gate classifier on a 32x32 halfspace image
//!
//! # Usage
//!
//! ```bash
//! # Defaults: stats policy, 100 epochs of 100 samples, seed 10
//! bitgate-train
//!
//! # Pick a policy and training length
//! bitgate-train --policy randmut --epochs 50 --cycles 200
//!
//! # Load settings from a TOML file, override the seed
//! bitgate-train --config bitgate.toml --seed 3
//!
//! # Per-epoch progress
//! RUST_LOG=info bitgate-train
//! ```
//!
//! The network reads a pixel's (row, column) as two bytes, passes them
//! through two hidden layers of 20 gates and emits one bit. Each sample is
//! rewarded when the bit matches the image and penalized otherwise.
//!
//! # Exit Codes
//!
//! - 0: Training completed
//! - 2: Invalid arguments, configuration or model

use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bitgate::{
    BasicPolicy, BitGateConfig, BitGateMemory, FeedbackSignal, FullConnectBinder, GatePolicy,
    LayerId, Model, RandMutationPolicy, Shape, StatsPolicy,
};

const IMAGE_SIZE: u8 = 32;

/// Target image: true below the line `2i - j = 8`
fn halfspace_image(i: u8, j: u8) -> bool {
    (2 * i as i32 - j as i32) < 8
}

struct Options {
    config: BitGateConfig,
    policy: String,
}

fn main() -> ExitCode {
    env_logger::init();

    let options = match parse_args() {
        Ok(Some(options)) => options,
        Ok(None) => return ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}\n", err);
            print_help();
            return ExitCode::from(2);
        }
    };

    let result = match options.policy.as_str() {
        "stats" => train(StatsPolicy::default(), &options.config),
        "randmut" => train(RandMutationPolicy::default(), &options.config),
        "basic" => train(BasicPolicy::default(), &options.config),
        other => Err(anyhow!("unknown policy '{}'", other)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

fn parse_args() -> Result<Option<Options>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // The config file goes first so explicit flags override it
    let mut config = match args.iter().position(|a| a == "--config" || a == "-c") {
        Some(index) => {
            let path = args
                .get(index + 1)
                .ok_or_else(|| anyhow!("--config needs a path"))?;
            BitGateConfig::load_from_file(path)
                .with_context(|| format!("loading config from {}", path))?
        }
        None => BitGateConfig::default(),
    };
    let mut policy = String::from("stats");

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{} needs a value", name))
        };
        match arg.as_str() {
            "-c" | "--config" => {
                value(arg.as_str())?;
            }
            "-e" | "--epochs" => {
                config.training.epochs = value(arg.as_str())?.parse().context("parsing --epochs")?;
            }
            "-n" | "--cycles" => {
                config.training.cycles = value(arg.as_str())?.parse().context("parsing --cycles")?;
            }
            "-s" | "--seed" => {
                config.seed = value(arg.as_str())?.parse().context("parsing --seed")?;
            }
            "-p" | "--policy" => policy = value(arg.as_str())?,
            "-h" | "--help" => {
                print_help();
                return Ok(None);
            }
            other => bail!("unknown option: {}", other),
        }
    }

    Ok(Some(Options { config, policy }))
}

fn print_help() {
    eprintln!(
        "bitgate-train - Train a bit-gate classifier on a halfspace image

USAGE:
    bitgate-train [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Load settings from a TOML file
    -p, --policy <NAME>    stats | randmut | basic (default: stats)
    -e, --epochs <N>       Training epochs
    -n, --cycles <N>       Samples per epoch
    -s, --seed <N>         Random seed
    -h, --help             Show this help"
    );
}

struct Network {
    model: Model,
    input: LayerId,
    output: LayerId,
}

impl Network {
    /// 2x8 → 20 → 20 → 1
    fn build(config: &BitGateConfig) -> Result<Self> {
        let mut model = Model::new(config.memory);
        let input = model.lay(Shape::new(&[2, 8]));
        let first = model.lay(Shape::new(&[20]));
        let second = model.lay(Shape::new(&[20]));
        let output = model.lay(Shape::new(&[1]));
        model.on(first, input, FullConnectBinder)?;
        model.on(second, first, FullConnectBinder)?;
        model.on(output, second, FullConnectBinder)?;
        Ok(Self {
            model,
            input,
            output,
        })
    }

    fn estimate<P: GatePolicy>(&self, memory: &mut BitGateMemory<P>, i: u8, j: u8) -> Result<bool> {
        self.model.write_vec8(memory, self.input, &[i, j])?;
        memory.compute_forward();
        let states = self.model.read_vec1(memory, self.output)?;
        states
            .first()
            .copied()
            .ok_or_else(|| anyhow!("output layer is empty"))
    }
}

fn train<P: GatePolicy>(policy: P, config: &BitGateConfig) -> Result<()> {
    let mut network = Network::build(config).context("building network")?;
    let mut memory = network
        .model
        .materialize(policy, config.seed)
        .context("materializing network")?;

    let stats = memory.stats();
    println!(
        "{} policy: {} pages, {} gates, {} links, {} bytes",
        P::NAME,
        memory.pages_count(),
        stats.gates_count,
        stats.links_count,
        stats.used_memory
    );

    let reward = P::Signal::from_i32(config.training.reward);
    let penalty = P::Signal::from_i32(config.training.reward.saturating_neg());
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));

    for epoch in 0..config.training.epochs {
        let mut hits = 0;
        for _ in 0..config.training.cycles {
            let i = rng.gen_range(0..IMAGE_SIZE);
            let j = rng.gen_range(0..IMAGE_SIZE);
            let expected = halfspace_image(i, j);

            let hit = network.estimate(&mut memory, i, j)? == expected;
            if hit {
                hits += 1;
            }
            let feedback = if hit { reward } else { penalty };
            network
                .model
                .emit_feedback_vec(&mut memory, network.output, &[feedback])?;
            memory.compute_backward();
            memory.mutate_forward();
            memory.mutate_backward();
        }
        log::info!(
            "epoch {}/{}: {}/{} hits",
            epoch + 1,
            config.training.epochs,
            hits,
            config.training.cycles
        );
    }

    let mut correct = 0usize;
    for i in 0..IMAGE_SIZE {
        let mut line = String::with_capacity(IMAGE_SIZE as usize * 2);
        for j in 0..IMAGE_SIZE {
            let estimate = network.estimate(&mut memory, i, j)?;
            if estimate == halfspace_image(i, j) {
                correct += 1;
            }
            line.push_str(if estimate { "##" } else { ".." });
        }
        println!("{}", line);
    }

    let total = IMAGE_SIZE as usize * IMAGE_SIZE as usize;
    println!(
        "accuracy: {}/{} ({:.1}%)",
        correct,
        total,
        100.0 * correct as f64 / total as f64
    );
    Ok(())
}
