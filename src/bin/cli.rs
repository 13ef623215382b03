use anyhow::{bail, Context};
use crabfocus::autofocus::AutofocusRoutine;
use crabfocus::config::CrabFocusConfig;
use crabfocus::quality::{score_with, ScoringMethod};
use crabfocus::testing::SimulatedMicroscope;
use crabfocus::types::Frame;
use std::env;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    crabfocus::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: crabfocus-cli <score|simulate|show-config|properties> [args]");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "score" => cmd_score(&args),
        "simulate" => cmd_simulate(&args),
        "show-config" => cmd_show_config(&args),
        "properties" => cmd_properties(&args),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

/// Value following `flag`, if present
fn flag_value<'a>(args: &'a [String], flag: &str) -> anyhow::Result<Option<&'a str>> {
    match args.iter().position(|a| a == flag) {
        Some(i) => match args.get(i + 1) {
            Some(value) => Ok(Some(value.as_str())),
            None => bail!("{} requires a value", flag),
        },
        None => Ok(None),
    }
}

fn load_config(args: &[String]) -> anyhow::Result<CrabFocusConfig> {
    let path = match flag_value(args, "--config")? {
        Some(p) => PathBuf::from(p),
        None => CrabFocusConfig::default_path(),
    };
    let config = CrabFocusConfig::load_layered(&path)
        .with_context(|| format!("loading configuration from {:?}", path))?;
    config.validate()?;
    Ok(config)
}

fn cmd_score(args: &[String]) -> anyhow::Result<()> {
    // score <image> [--crop <fraction>] [--method edges|stdev] [--json]
    let path = match args.get(2) {
        Some(p) if !p.starts_with("--") => p,
        _ => bail!("Usage: crabfocus-cli score <image> [--crop f] [--method edges|stdev] [--json]"),
    };

    let crop: f64 = match flag_value(args, "--crop")? {
        Some(v) => v.parse().with_context(|| format!("invalid crop fraction '{}'", v))?,
        None => 0.2,
    };
    let method = match flag_value(args, "--method")? {
        Some(v) => ScoringMethod::from_label(v).with_context(|| format!("unknown method '{}'", v))?,
        None => ScoringMethod::Edges,
    };

    let frame = Frame::open(path).with_context(|| format!("reading {}", path))?;
    let score = score_with(&frame, crop, method)?;

    if args.iter().any(|a| a == "--json") {
        let out = serde_json::json!({
            "path": path,
            "width": frame.width(),
            "height": frame.height(),
            "bit_depth": frame.bit_depth(),
            "crop_fraction": crop,
            "method": method,
            "score": score,
        });
        println!("{}", serde_json::to_string(&out)?);
    } else {
        println!(
            "{}: {}x{} {}-bit, {} score {:.6e}",
            path,
            frame.width(),
            frame.height(),
            frame.bit_depth(),
            method.label(),
            score
        );
    }
    Ok(())
}

fn cmd_simulate(args: &[String]) -> anyhow::Result<()> {
    // simulate [--focus z] [--start z] [--config path] [--json]
    let mut config = load_config(args)?;
    if let Some(v) = flag_value(args, "--focus")? {
        config.simulation.focal_plane =
            v.parse().with_context(|| format!("invalid focus '{}'", v))?;
    }
    if let Some(v) = flag_value(args, "--start")? {
        config.simulation.start_position =
            v.parse().with_context(|| format!("invalid start '{}'", v))?;
    }
    config.validate()?;

    let scope = SimulatedMicroscope::new(config.simulation.clone());
    let routine = AutofocusRoutine::new(scope.stage(), scope.camera(), config.autofocus.clone());
    let report = routine.full_focus_with_report()?;

    if args.iter().any(|a| a == "--json") {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        for sample in &report.samples {
            println!(
                "{:>6} {:>10.4} {:>14.6e}",
                sample.phase, sample.position, sample.score
            );
        }
        println!(
            "Best focus {:.4} (true focal plane {:.4}) after {} frames in {}ms",
            report.best_position,
            scope.focal_plane(),
            report.frames_captured,
            report.elapsed_ms
        );
    }
    Ok(())
}

fn cmd_show_config(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args)?;
    print!("{}", config.to_toml()?);
    Ok(())
}

fn cmd_properties(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let items = config.autofocus.properties(&config.simulation.channels);

    if args.iter().any(|a| a == "--json") {
        println!("{}", serde_json::to_string(&items)?);
    } else {
        for item in items {
            if item.allowed.is_empty() {
                println!("{} = '{}'", item.name, item.value);
            } else {
                println!("{} = '{}' {:?}", item.name, item.value, item.allowed);
            }
        }
    }
    Ok(())
}
