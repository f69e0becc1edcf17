//! `treesync init`: write a starter configuration file.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::arguments::InitArgs;
use crate::config::{ConfigError, ConfigFile, DEFAULT_CONFIG_FILE};
use crate::error::CliError;
use crate::render::Renderer;

const STDOUT_PATH: &str = "-";

pub(crate) fn execute<Out>(
    args: &InitArgs,
    cwd: &Path,
    renderer: &Renderer,
    out: &mut Out,
) -> Result<(), CliError>
where
    Out: Write,
{
    let mut contents = serde_json::to_string_pretty(&ConfigFile::template())
        .map_err(|error| CliError::Output(error.into()))?;
    contents.push('\n');

    if args.path.as_deref() == Some(Path::new(STDOUT_PATH)) {
        out.write_all(contents.as_bytes())?;
        return Ok(());
    }

    let path = cwd.join(args.path.as_deref().unwrap_or(Path::new(DEFAULT_CONFIG_FILE)));
    if path.exists() && !args.force {
        return Err(ConfigError::AlreadyExists { path }.into());
    }
    fs::write(&path, contents).map_err(|source| ConfigError::Write {
        path: path.clone(),
        source,
    })?;
    info!(target: "treesync::cli", path = %path.display(), "wrote configuration");

    renderer.init_result(&mut *out, &path)?;
    Ok(())
}
