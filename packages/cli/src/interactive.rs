//! Prompt-driven pipeline runs.
//!
//! Asks for a pipeline file, shows its steps, and confirms before any
//! routing requests are made (they are billed per request).

use std::path::PathBuf;

use dialoguer::{Confirm, Input};
use rental_proximity::pipeline::{PipelineConfig, StepSource};
use rental_proximity_cli_utils::MultiProgress;

/// Runs a pipeline file chosen at the prompt.
///
/// # Errors
///
/// Returns an error if a prompt fails, the file is invalid, or the run
/// fails.
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("Rental Proximity");
    println!();

    let path: String = Input::new()
        .with_prompt("Pipeline file")
        .default("pipeline.toml".to_string())
        .interact_text()?;
    let path = PathBuf::from(path);

    let config = PipelineConfig::load(&path)?;
    let steps = config.resolve_steps()?;

    println!();
    println!("Rentals: {}", config.rentals.display());
    for (i, step) in steps.iter().enumerate() {
        let source = match &step.source {
            StepSource::Dataset { path, .. } => path.display().to_string(),
            StepSource::Destination(coordinate) => coordinate.to_string(),
        };
        let routed = if step.route { " + route" } else { "" };
        println!("  {}. {} <- {source}{routed}", i + 1, step.name);
    }
    println!("Output: {}", config.final_output_path().display());
    println!();

    if config.needs_routing() {
        let proceed = Confirm::new()
            .with_prompt("Routed steps make one request per rental. Continue?")
            .default(true)
            .interact()?;
        if !proceed {
            log::info!("Cancelled");
            return Ok(());
        }
    }

    crate::run_pipeline_file(&path, multi).await
}
