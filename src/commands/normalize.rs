//! # Normalize Command Implementation
//!
//! Runs the placeholder normalizer on `--text` or standard input and prints
//! the result. Useful to preview how an import will store a string.

use std::io::{self, Read};

use anyhow::Result;
use clap::Args;

use langrepo::syntax::{self, Dialect};

/// Normalize text between placeholder dialects
#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Text to normalize; read from stdin when omitted
    #[arg(long)]
    pub text: Option<String>,

    /// Dialect of the input (legacy or modern)
    #[arg(long, default_value = "legacy")]
    pub from: Dialect,

    /// Dialect of the output (legacy or modern)
    #[arg(long, default_value = "modern")]
    pub to: Dialect,
}

/// Execute the `normalize` command.
pub fn execute(args: NormalizeArgs) -> Result<()> {
    let text = match args.text {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    println!("{}", syntax::normalize(&text, args.to, args.from)?);
    Ok(())
}
