//! # Street Grid CLI
//!
//! Extracts the street centerlines around an address and paints them onto a
//! cell grid document.
//!
//! ## Usage
//!
//! ```bash
//! # Prompt for address and radius, everything else from the config
//! street-grid --config street-grid.toml
//!
//! # Fully specified run
//! street-grid --dataset data/centerline.shp \
//!     --address "350 5th Ave, New York, NY" --radius 500
//!
//! # Alternate config and output directory
//! street-grid --config nyc.toml --output-dir out/
//! ```
//!
//! ## Configuration (street-grid.toml)
//!
//! ```toml
//! [dataset]
//! path = "data/centerline.shp"
//!
//! [grid]
//! scale = 100.0
//! out_of_bounds = "skip"
//!
//! [geocoder]
//! provider = "nominatim"
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use street_grid_geo::{Outcome, Pipeline, StreetGridConfig};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "street-grid")]
#[command(about = "Extract street centerlines around an address onto a cell grid")]
#[command(version)]
struct Args {
    /// Address to center the search on (prompted when omitted)
    #[arg(short, long)]
    address: Option<String>,

    /// Search radius in meters (prompted when omitted)
    #[arg(short, long)]
    radius: Option<f64>,

    /// Configuration file
    #[arg(short, long, env = "STREET_GRID_CONFIG")]
    config: Option<PathBuf>,

    /// Street centerline dataset (.shp or .geojson); overrides [dataset] path
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Directory for the written artifacts; overrides [output] directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

// ============================================================================
// Input
// ============================================================================

fn load_config(args: &Args) -> anyhow::Result<StreetGridConfig> {
    let mut config = match &args.config {
        Some(path) => StreetGridConfig::load(path)?,
        None => StreetGridConfig::default(),
    };

    if let Some(dataset) = &args.dataset {
        config.dataset.path = Some(dataset.clone());
    }
    if let Some(dir) = &args.output_dir {
        config.output.directory = dir.clone();
    }
    Ok(config)
}

fn prompt(input: &mut impl BufRead, message: &str) -> anyhow::Result<String> {
    print!("{}", message);
    std::io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("input closed before a value was entered");
    }
    Ok(line.trim().to_string())
}

fn ask_address(input: &mut impl BufRead) -> anyhow::Result<String> {
    loop {
        let address = prompt(input, "Enter address: ")?;
        if !address.is_empty() {
            return Ok(address);
        }
    }
}

fn ask_radius(input: &mut impl BufRead) -> anyhow::Result<f64> {
    loop {
        let answer = prompt(input, "Enter search radius (meters): ")?;
        match answer.parse::<f64>() {
            Ok(radius) if radius.is_finite() && radius > 0.0 => return Ok(radius),
            _ => println!("Please enter a positive number."),
        }
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&args).context("Failed to load configuration")?;
    let pipeline = Pipeline::from_config(&config)?;

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let address = match args.address.clone() {
        Some(address) => address,
        None => ask_address(&mut input)?,
    };
    let radius = match args.radius {
        Some(radius) => radius,
        None => ask_radius(&mut input)?,
    };

    let extraction = match pipeline.run(&address, radius)? {
        Outcome::NoResults { .. } => {
            println!("No streets found within the specified radius.");
            return Ok(());
        }
        Outcome::Extracted(extraction) => extraction,
    };

    let report = pipeline
        .render(&extraction, &config.output.directory)
        .context("Failed to write artifacts")?;

    println!("Found {} streets within {} m of {}", extraction.features.len(), radius, address);
    println!(
        "Painted {} cells ({} outside the grid skipped, {} clipped)",
        report.paint.painted, report.paint.skipped, report.paint.clipped
    );
    println!("  Grid:    {}", report.artifacts.grid_text.display());
    println!("  Plan:    {}", report.artifacts.plan_json.display());
    println!("  GeoJSON: {}", report.artifacts.geojson.display());
    Ok(())
}
