//! External Interfaces (spec section 6): the command-line surface,
//! `clap`-driven like the teacher's own `config.rs` (`Args`/`Command`).
//!
//! The positional input file's extension dispatch is domain logic, not a
//! `clap` value parser's job, so it's validated after parsing rather than
//! via a custom `ValueParser`.

use std::path::PathBuf;

use clap::Parser;

use crate::error::{CrucibleError, Result};

#[derive(Debug, Parser)]
#[command(name = "crucible", about = "Two-phase C/C++ build orchestrator")]
pub struct Args {
    /// A `.c`/`.cpp` build description, or a cached `.build_info` file.
    /// Not required when `--nuke` is given on its own.
    pub input_file: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,

    /// Build only the named config (and its dependency closure) instead
    /// of every config the description exports.
    #[arg(long, value_name = "name")]
    pub config: Option<String>,

    /// Recursively deletes the contents of `folder` and exits without
    /// touching the input file.
    #[arg(long, value_name = "folder")]
    pub nuke: Option<PathBuf>,

    /// Advisory flag a Visual Studio project passes back when it invokes
    /// the orchestrator as its custom build step (spec section 6).
    #[arg(long = "visual-studio-build")]
    pub visual_studio_build: bool,
}

impl Args {
    /// Parses `argv` and checks the invariants `clap` itself can't express:
    /// an input file is required unless `--nuke` stands alone.
    pub fn parse_and_validate() -> Result<Self> {
        let args = Args::parse();
        validate(&args)?;
        Ok(args)
    }
}

fn validate(args: &Args) -> Result<()> {
    if args.nuke.is_none() && args.input_file.is_none() {
        return Err(CrucibleError::Usage(
            "an input file (.c, .cpp or .build_info) is required".to_string(),
        ));
    }

    if let Some(input) = &args.input_file {
        let recognised = matches!(
            input.extension().and_then(|e| e.to_str()),
            Some("c" | "cpp" | "cc" | "cxx" | "build_info")
        );
        if !recognised {
            return Err(CrucibleError::Usage(format!(
                "unrecognised input \"{}\": expected a .c, .cpp or .build_info file",
                input.display()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_input_without_nuke() {
        let args = Args {
            input_file: None,
            verbose: false,
            config: None,
            nuke: None,
            visual_studio_build: false,
        };
        assert!(matches!(
            validate(&args),
            Err(CrucibleError::Usage(_))
        ));
    }

    #[test]
    fn nuke_alone_is_valid() {
        let args = Args {
            input_file: None,
            verbose: false,
            config: None,
            nuke: Some(PathBuf::from("build")),
            visual_studio_build: false,
        };
        assert!(validate(&args).is_ok());
    }

    #[test]
    fn rejects_unrecognised_extension() {
        let args = Args {
            input_file: Some(PathBuf::from("notes.txt")),
            verbose: false,
            config: None,
            nuke: None,
            visual_studio_build: false,
        };
        assert!(validate(&args).is_err());
    }
}
