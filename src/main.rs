mod demo;

use std::{env, process};

use anyhow::Context;
use log::{error, info};
use rand::{SeedableRng, rngs::StdRng};
use xvector::{NnetComputeProbOptions, NnetXvectorComputeProb, XvecErr};

const DEFAULT_MINIBATCHES: usize = 10;
const DEFAULT_SEED: u64 = 0;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match env::var("XVECTOR_CONFIG") {
        Ok(path) => NnetComputeProbOptions::from_file(&path)
            .with_context(|| format!("reading config from {path}"))?,
        Err(_) => NnetComputeProbOptions::default(),
    };
    let minibatches = env_or("XVECTOR_MINIBATCHES", DEFAULT_MINIBATCHES)?;
    let seed = env_or("XVECTOR_SEED", DEFAULT_SEED)?;
    info!("running {minibatches} minibatches, compute_deriv = {}", config.compute_deriv);

    let mut rng = StdRng::seed_from_u64(seed);
    let nnet = demo::xvector_nnet(&mut rng)?;
    let mut prob = NnetXvectorComputeProb::new(config, &nnet).unwrap_or_else(|e| die(e));

    for _ in 0..minibatches {
        let eg = demo::random_example(&mut rng);
        if let Err(e) = prob.compute(&eg) {
            die(e);
        }
    }

    if !prob.print_total_stats() {
        anyhow::bail!("no frames were processed");
    }

    if config.compute_deriv {
        let deriv = prob.deriv()?;
        info!(
            "gradient has {} parameters, squared norm {}",
            deriv.num_parameters(),
            deriv.dot_product(deriv)?
        );
    }

    Ok(())
}

/// Logs the error and stops the process. Fatal errors mean the network and the
/// options do not fit together, which no further minibatch can fix.
fn die(e: XvecErr) -> ! {
    if e.is_fatal() {
        error!("fatal configuration error: {e}");
    } else {
        error!("{e}");
    }
    process::exit(1)
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value.parse().with_context(|| format!("parsing {key}")),
        Err(_) => Ok(default),
    }
}
