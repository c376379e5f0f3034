//! # Versions Command Implementation
//!
//! Lists the release lines known to the registry, newest first.

use anyhow::Result;
use clap::Args;

use langrepo::version::Version;

/// List known versions
#[derive(Args, Debug)]
pub struct VersionsArgs {
    /// Only list versions open for translation
    #[arg(long)]
    pub translatable: bool,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the `versions` command.
pub fn execute(args: VersionsArgs) -> Result<()> {
    let versions: Vec<&Version> = if args.translatable {
        Version::list_translatable().into_values().rev().collect()
    } else {
        Version::all().iter().collect()
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&versions)?);
    } else {
        print!("{}", render_table(&versions));
    }
    Ok(())
}

fn render_table(versions: &[&Version]) -> String {
    let mut out = format!(
        "{:<6} {:<6} {:<18} {:<8} {}\n",
        "CODE", "LABEL", "BRANCH", "DIALECT", "FLAGS"
    );
    for v in versions {
        let mut flags = Vec::new();
        if v.translatable {
            flags.push("translatable");
        }
        if v.current {
            flags.push("current");
        }
        out.push_str(&format!(
            "{:<6} {:<6} {:<18} {:<8} {}\n",
            v.code,
            v.label,
            v.branch,
            v.dialect().to_string(),
            flags.join(",")
        ));
    }
    out
}
