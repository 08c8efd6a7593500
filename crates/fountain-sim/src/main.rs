//! fountain-sim — pushes a payload through simulated lossy channels and
//! checks that it comes out intact.
//!
//! Usage: fountain-sim [PAYLOAD_FILE]
//!
//! Without a file, a random payload of `sim.payload_len` bytes is generated.

use anyhow::{ensure, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use fountain_core::{Decoder, Encoder, FountainConfig};

mod scenario;

use scenario::Report;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = FountainConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        FountainConfig::default()
    });
    ensure!(
        (0.0..1.0).contains(&config.sim.loss_rate),
        "sim.loss_rate must lie in [0, 1), got {}",
        config.sim.loss_rate
    );

    let seed = config.sim.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);

    let payload = match std::env::args().nth(1) {
        Some(path) => std::fs::read(&path).with_context(|| format!("failed to read {path}"))?,
        None => {
            let mut data = vec![0u8; config.sim.payload_len];
            rng.fill_bytes(&mut data);
            data
        }
    };
    let digest = blake3::hash(&payload);
    tracing::info!(
        bytes = payload.len(),
        frame_size = config.coding.frame_size,
        loss_rate = config.sim.loss_rate,
        seed,
        blake3 = %hex::encode(digest.as_bytes()),
        "fountain-sim starting"
    );

    let soliton = config.coding.soliton();
    let nonce: u64 = rng.gen();

    let mut encoder = Encoder::with_soliton(&payload, config.coding.frame_size, nonce, &soliton)
        .context("failed to build encoder")?;
    let mut decoder = Decoder::with_options(config.decoder_options());
    let report = scenario::sequential(
        &mut encoder,
        &mut decoder,
        &mut rng,
        config.sim.loss_rate,
        config.sim.max_frames,
    )
    .context("sequential scenario")?;
    verify("sequential", &decoder, &digest, report)?;

    let mut encoder =
        Encoder::with_soliton(&payload, config.coding.frame_size, nonce.wrapping_add(1), &soliton)
            .context("failed to build encoder")?;
    let mut decoder = Decoder::with_options(config.decoder_options());
    let report = scenario::reordered(
        &mut encoder,
        &mut decoder,
        &mut rng,
        config.sim.loss_rate,
        config.sim.reorder_window,
        config.sim.max_frames,
    )
    .context("out-of-order scenario")?;
    verify("out-of-order", &decoder, &digest, report)?;

    Ok(())
}

fn verify(name: &str, decoder: &Decoder, expected: &blake3::Hash, report: Report) -> Result<()> {
    let decoded = decoder.decoded().context("decoder finished without output")?;
    let got = blake3::hash(&decoded);
    let stats = decoder.stats();
    tracing::info!(
        scenario = name,
        sent = report.sent,
        delivered = report.delivered,
        blocks = report.blocks,
        overhead = format_args!("{:.3}", report.overhead()),
        redundant = stats.redundant,
        cascaded = stats.cascaded,
        blake3 = %hex::encode(got.as_bytes()),
        "scenario complete"
    );
    ensure!(got == *expected, "{name}: decoded payload hash mismatch");
    Ok(())
}
