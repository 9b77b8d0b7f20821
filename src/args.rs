//! Command-line argument parsing

use crate::error::{AppError, Result};
use std::path::PathBuf;

pub const USAGE: &str = "\
Usage: writingway [--config PATH] <command>

Commands:
  providers                                 List provider kinds and configured providers
  models <name> [--refresh]                 List models offered by a provider
  test <name>                               Test the connection to a provider
  ask <prompt> [--provider N] [--model M]   Send a prompt and print the reply
  stream <prompt> [--provider N] [--model M]
                                            Stream a reply (Ctrl+C to stop)";

/// What to run
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Providers,
    Models {
        name: String,
        refresh: bool,
    },
    Test {
        name: String,
    },
    Ask {
        prompt: String,
        provider: Option<String>,
        model: Option<String>,
    },
    Stream {
        prompt: String,
        provider: Option<String>,
        model: Option<String>,
    },
    Help,
}

/// Command-line arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    /// Explicit config file instead of the project/user lookup
    pub config: Option<PathBuf>,
    pub command: Command,
}

impl Args {
    /// Parse the process arguments
    pub fn parse() -> Result<Self> {
        Self::parse_from(std::env::args().skip(1))
    }

    /// Parse arguments, excluding the program name
    pub fn parse_from<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let mut config = None;
        let mut positional: Vec<String> = Vec::new();
        let mut provider = None;
        let mut model = None;
        let mut refresh = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => config = Some(PathBuf::from(required(&mut args, &arg)?)),
                "--provider" | "-p" => provider = Some(required(&mut args, &arg)?),
                "--model" | "-m" => model = Some(required(&mut args, &arg)?),
                "--refresh" | "-r" => refresh = true,
                "--help" | "-h" => {
                    return Ok(Self {
                        config,
                        command: Command::Help,
                    })
                }
                _ if arg.starts_with('-') => {
                    return Err(AppError::Usage(format!("Unknown flag: {}", arg)));
                }
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let command = match positional.next().as_deref() {
            None | Some("help") => Command::Help,
            Some("providers") => Command::Providers,
            Some("models") => Command::Models {
                name: operand(&mut positional, "models", "<name>")?,
                refresh,
            },
            Some("test") => Command::Test {
                name: operand(&mut positional, "test", "<name>")?,
            },
            Some("ask") => Command::Ask {
                prompt: prompt(positional, "ask")?,
                provider,
                model,
            },
            Some("stream") => Command::Stream {
                prompt: prompt(positional, "stream")?,
                provider,
                model,
            },
            Some(other) => return Err(AppError::Usage(format!("Unknown command: {}", other))),
        };

        Ok(Self { config, command })
    }
}

fn required(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| AppError::Usage(format!("{} needs a value", flag)))
}

fn operand(
    positional: &mut impl Iterator<Item = String>,
    command: &str,
    name: &str,
) -> Result<String> {
    positional
        .next()
        .ok_or_else(|| AppError::Usage(format!("{} needs {}", command, name)))
}

/// Remaining words joined, so unquoted prompts work too
fn prompt(positional: impl Iterator<Item = String>, command: &str) -> Result<String> {
    let words: Vec<String> = positional.collect();
    if words.is_empty() {
        return Err(AppError::Usage(format!("{} needs <prompt>", command)));
    }
    Ok(words.join(" "))
}
