use anyhow::{Context, Result};
use frame_blueprints::cli::{usage, HarnessArgs};
use frame_blueprints::config::BlueprintConfig;
use frame_blueprints::harness::{compare_golden, load_fixture, run_fixture, write_output};
use frame_blueprints::logging;
use log::{error, info};

fn main() {
    logging::init();
    if let Err(err) = run_cli() {
        error!("blueprint harness failed: {err:#}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = HarnessArgs::parse_from_env()?;
    if args.help {
        println!("{}", usage());
        return Ok(());
    }

    let mut fixture = load_fixture(&args.fixture)?;
    if let Some(path) = &args.config {
        fixture.config = BlueprintConfig::load(path)?;
    }
    args.apply(&mut fixture);
    let output = run_fixture(&fixture)
        .with_context(|| format!("running fixture '{}'", args.fixture.display()))?;
    info!("ran {} steps of {}s from {}", output.steps, output.dt, args.fixture.display());

    if let Some(path) = &args.write_output {
        write_output(path, &output)?;
        info!("output written to {}", path.display());
    }
    match &args.golden {
        Some(path) => {
            compare_golden(path, &output).context("refresh the golden with --write-output if the change is intended")?;
            info!("output matches {}", path.display());
        }
        None if args.write_output.is_none() => println!("{}", serde_json::to_string_pretty(&output)?),
        None => {}
    }
    Ok(())
}
