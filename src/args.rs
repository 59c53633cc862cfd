use ttl::Result;

use std::{env, fs, path::PathBuf};

use anyhow::Context;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputArgsError {
    #[error("Couldn't parse input arguments: {0}")]
    Parse(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

#[derive(Debug)]
pub struct InputArgs {
    pub script: PathBuf,
    pub config: Option<PathBuf>,
}

/// Parses the input arguments: the command script, then an optional TOML config file
pub fn parse_input_args() -> Result<InputArgs> {
    let mut args = env::args().skip(1);

    let script = args.next().ok_or_else(|| {
        InputArgsError::Parse("First argument must be the command script.".to_string())
    })?;

    let script = canonicalize(script)?;
    let config = args.next().map(canonicalize).transpose()?;

    if args.next().is_some() {
        Err(InputArgsError::Parse(
            "Expected at most two arguments: <script.csv> [config.toml]".to_string(),
        ))?
    }

    Ok(InputArgs { script, config })
}

fn canonicalize(filename: String) -> Result<PathBuf> {
    let path = fs::canonicalize(&filename).with_context(|| InputArgsError::FileNotFound(filename))?;

    Ok(path)
}
