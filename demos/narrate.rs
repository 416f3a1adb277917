use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use narrate_rs::{
    engines::voicevox::{style_table, VoicevoxEngine},
    narrate_directory, BatchOptions, Narrator, NarratorConfig, SynthesisEngine,
};

/// Usage:
///   narrate <input.txt> <output.mp3> [bgm.mp3]
///   narrate <input_dir> <output_dir> [bgm.mp3]
///
/// Set NARRATE_CONFIG to a TOML file to override defaults.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("usage: narrate <input.txt|input_dir> <output|output_dir> [bgm]");
        std::process::exit(2);
    }
    let input = PathBuf::from(&args[0]);
    let output = PathBuf::from(&args[1]);
    let bgm = args.get(2).map(PathBuf::from);

    let config = match std::env::var_os("NARRATE_CONFIG") {
        Some(path) => NarratorConfig::from_toml_file(&PathBuf::from(path))?,
        None => NarratorConfig::default(),
    };

    let engine = VoicevoxEngine::new(&config.engine_url)?;
    let version = engine.version().await?;
    println!("VOICEVOX engine {version} at {}", engine.base_url());

    let speakers = engine.speakers().await?;
    for (speaker, style, id) in style_table(&speakers).into_iter().take(10) {
        println!("  {id:>3}  {speaker} ({style})");
    }

    let narrator = Narrator::new(Arc::new(engine), config)?;
    if bgm.is_some() && !narrator.mixer().is_available().await {
        eprintln!("warning: ffmpeg/ffprobe not found, background mixing will fail");
    }

    let start = Instant::now();
    if input.is_dir() {
        let options = BatchOptions {
            bgm,
            ..BatchOptions::new(&input, &output)
        };
        let report = narrate_directory(&narrator, &options).await?;
        println!(
            "Batch done in {:.2?}: {} succeeded, {} skipped, {} failed",
            start.elapsed(),
            report.succeeded.len(),
            report.skipped.len(),
            report.failed.len()
        );
        for (document, error) in &report.failed {
            println!("  {}: {error}", document.display());
        }
    } else {
        let outcome = narrator
            .narrate_file(&input, &output, bgm.as_deref())
            .await?;
        let elapsed = start.elapsed();
        println!(
            "Narrated {:.2}s of speech from {} units in {:.2?} ({:.1}x real-time)",
            outcome.voice_duration_secs,
            outcome.units,
            elapsed,
            outcome.voice_duration_secs / elapsed.as_secs_f64()
        );
        if let Some(plan) = outcome.mix_plan {
            println!(
                "Background looped x{} at volume {}",
                plan.loop_count, plan.volume_ratio
            );
        }
        println!("Saved to {}", outcome.output.display());
    }

    Ok(())
}
