use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

use crate::harness::HarnessFixture;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HarnessArgs {
    pub fixture: PathBuf,
    pub golden: Option<PathBuf>,
    pub write_output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub steps: Option<usize>,
    pub dt: Option<f64>,
    pub help: bool,
}

impl HarnessArgs {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = HarnessArgs::default();
        let mut fixture = None;
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            if matches!(flag, "--help" | "-h") {
                parsed.help = true;
                continue;
            }
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match flag {
                "--fixture" | "-f" => fixture = Some(PathBuf::from(value)),
                "--golden" | "-g" => parsed.golden = Some(PathBuf::from(value)),
                "--write-output" | "-o" => parsed.write_output = Some(PathBuf::from(value)),
                "--config" | "-c" => parsed.config = Some(PathBuf::from(value)),
                "--steps" => {
                    parsed.steps =
                        Some(value.parse::<usize>().with_context(|| format!("Invalid steps '{value}'"))?);
                }
                "--dt" => {
                    let dt = value.parse::<f64>().with_context(|| format!("Invalid dt '{value}'"))?;
                    if !dt.is_finite() || dt < 0.0 {
                        bail!("Invalid dt '{value}': expected a finite, non-negative number");
                    }
                    parsed.dt = Some(dt);
                }
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --fixture, --golden, --write-output, --config, --steps, --dt."
                ),
            }
        }
        match fixture {
            Some(path) => parsed.fixture = path,
            None if parsed.help => {}
            None => bail!("--fixture <path> is required"),
        }
        Ok(parsed)
    }

    pub fn apply(&self, fixture: &mut HarnessFixture) {
        if let Some(steps) = self.steps {
            fixture.steps = steps;
        }
        if let Some(dt) = self.dt {
            fixture.dt = dt;
        }
    }
}

pub fn usage() -> &'static str {
    "Usage: blueprint_harness --fixture <path> [--golden <path>] [--write-output <path>] [--config <path>] [--steps N] [--dt SECONDS]
  -f, --fixture        Path to a harness fixture JSON file
  -g, --golden         Optional golden output file to compare against
  -o, --write-output   Optional path to write the actual output JSON
  -c, --config         Optional config JSON replacing the fixture's config section
      --steps          Override the number of ticks
      --dt             Override the per-tick delta time"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixture_and_overrides() {
        let args = ["harness", "--fixture", "scene.json", "--steps", "120", "--dt", "0.5", "-o", "out.json"];
        let parsed = HarnessArgs::parse(args).expect("parse args");
        assert_eq!(parsed.fixture, PathBuf::from("scene.json"));
        assert_eq!(parsed.steps, Some(120));
        assert_eq!(parsed.dt, Some(0.5));
        assert_eq!(parsed.write_output, Some(PathBuf::from("out.json")));
        assert!(parsed.golden.is_none());
    }

    #[test]
    fn latest_flag_wins() {
        let args = ["harness", "-f", "a.json", "--steps", "1", "--steps", "9"];
        let parsed = HarnessArgs::parse(args).expect("parse args");
        assert_eq!(parsed.steps, Some(9));
    }

    #[test]
    fn fixture_is_required() {
        let err = HarnessArgs::parse(["harness", "--steps", "3"]).unwrap_err();
        assert!(err.to_string().contains("--fixture"));
    }

    #[test]
    fn help_does_not_require_fixture() {
        let parsed = HarnessArgs::parse(["harness", "--help"]).expect("parse help");
        assert!(parsed.help);
    }

    #[test]
    fn rejects_negative_dt_and_unknown_flags() {
        let err = HarnessArgs::parse(["harness", "-f", "a.json", "--dt", "-1"]).unwrap_err();
        assert!(err.to_string().contains("Invalid dt"));
        let err = HarnessArgs::parse(["harness", "--foo", "bar"]).unwrap_err();
        assert!(err.to_string().contains("Unknown flag"));
    }

    #[test]
    fn missing_value_errors() {
        let err = HarnessArgs::parse(["harness", "--fixture"]).unwrap_err();
        assert!(err.to_string().contains("Expected a value"));
    }
}
