use std::{collections::BTreeSet, fs, path::Path};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use viewreg_pipeline::{
    run_global_registration, Dataset, IdMatcher, PairwiseMatcher, PrecomputedMatcher,
    RegistrationConfig, RegistrationError, RegistrationOutput,
};

/// Global registration of overlapping views.
#[derive(Debug, Parser)]
#[command(author, version, about = "Global multi-view registration")]
struct Args {
    /// Path to the JSON dataset (views, groups, optional correspondences).
    #[arg(long)]
    input: String,

    /// Optional path to a JSON RegistrationConfig. Defaults are used if omitted.
    #[arg(long)]
    config: Option<String>,

    /// Write the result here instead of stdout.
    #[arg(long)]
    output: Option<String>,
}

fn register_from_files(input_path: &str, config_path: Option<&str>) -> Result<RegistrationOutput> {
    let dataset = Dataset::from_json_file(input_path)?;
    let config = match config_path {
        Some(path) => RegistrationConfig::from_json_file(path)?,
        None => RegistrationConfig::default(),
    };

    // A correspondence table replaces id matching.
    let matcher: Box<dyn PairwiseMatcher> = if dataset.correspondences.is_empty() {
        Box::new(IdMatcher::new(config.matcher.clone()))
    } else {
        info!(
            "using {} precomputed pair tables",
            dataset.correspondences.len()
        );
        let table = PrecomputedMatcher::new(&dataset.correspondences, config.matcher.clone());
        let known: BTreeSet<_> = dataset.views.iter().map(|v| v.id).collect();
        if let Some(view) = table.views().find(|v| !known.contains(v)) {
            return Err(RegistrationError::UnknownCorrespondenceView(view).into());
        }
        Box::new(table)
    };

    let output = run_global_registration(
        &dataset.views,
        &dataset.groups,
        matcher.as_ref(),
        &config,
        None,
    )?;
    Ok(output)
}

fn write_output(output: &RegistrationOutput, path: Option<&str>) -> Result<()> {
    let json = serde_json::to_string_pretty(output)?;
    match path {
        Some(p) => fs::write(Path::new(p), json).with_context(|| format!("writing {p}"))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let output = register_from_files(&args.input, args.config.as_deref())?;
    write_output(&output, args.output.as_deref())
}
