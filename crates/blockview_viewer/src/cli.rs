use anyhow::{anyhow, bail, Context, Result};
use blockview_host::ConfigOverrides;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOverrides {
    pub workspace: Option<PathBuf>,
    pub config: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
    models: Vec<String>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            if !flag.starts_with("--") {
                bail!("Unexpected argument '{flag}'. Use --model <file> to open a model.");
            }
            let key = &flag[2..];
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?
                .as_ref()
                .to_string();
            match key {
                "workspace" => overrides.workspace = Some(PathBuf::from(value)),
                "config" => overrides.config = Some(PathBuf::from(value)),
                "width" => {
                    let width = value
                        .parse::<u32>()
                        .with_context(|| format!("Invalid width '{value}'"))?;
                    overrides.width = Some(width);
                }
                "height" => {
                    let height = value
                        .parse::<u32>()
                        .with_context(|| format!("Invalid height '{value}'"))?;
                    overrides.height = Some(height);
                }
                "model" => overrides.models.push(value),
                _ => bail!(
                    "Unknown flag '{flag}'. \
                     Supported flags: --workspace, --config, --width, --height, --model."
                ),
            }
        }
        Ok(overrides)
    }

    pub fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            width: self.width,
            height: self.height,
            documents: self.models.clone(),
        }
    }
}
