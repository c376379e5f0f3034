//! # Error Suggestions
//!
//! Helpers for command errors that say what went wrong and how to fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crate::suggestions;
//!
//! // Instead of:
//! anyhow::bail!("Unknown version: {}", value);
//!
//! // Use:
//! return Err(suggestions::unknown_version(value));
//! ```

use std::path::Path;

use crate::version::Version;

/// Generate an error for when an explicitly given settings file is missing.
pub fn config_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Settings file not found: {path}\n\n\
         hint: Create a .langrepo.yaml file in the current directory\n\
         hint: Use -c/--config to specify a different path\n\
         hint: Set the LANGREPO_CONFIG environment variable",
        path = path.display()
    )
}

/// Generate an error for a version that is not in the registry.
///
/// Suggests the closest code, branch or label.
pub fn unknown_version(value: &str) -> anyhow::Error {
    let mut candidates: Vec<String> = Vec::new();
    for version in Version::all() {
        candidates.push(version.code.to_string());
        candidates.push(version.branch.to_string());
        candidates.push(version.label.to_string());
    }
    let candidates: Vec<&str> = candidates.iter().map(String::as_str).collect();
    let did_you_mean = find_similar(value, &candidates)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "Unknown version: {value}{did_you_mean}\n\n\
         hint: Use a version code (2000), branch (MOODLE_20_STABLE) or label (2.0)\n\
         hint: Run 'langrepo versions' to list known versions"
    )
}

/// Generate an error for a command that needs a language and got none.
pub fn missing_language() -> anyhow::Error {
    anyhow::anyhow!(
        "No language given\n\n\
         hint: Pass --lang <CODE>\n\
         hint: Set default_language in .langrepo.yaml"
    )
}

/// Generate an error for a command that needs a version and got none.
pub fn missing_version() -> anyhow::Error {
    anyhow::anyhow!(
        "No version given\n\n\
         hint: Pass --version <CODE|BRANCH|LABEL>\n\
         hint: Set default_version in .langrepo.yaml"
    )
}

/// Generate an error for an invalid glob pattern.
pub fn invalid_glob(pattern: &str, error: &glob::PatternError) -> anyhow::Error {
    anyhow::anyhow!(
        "Invalid glob pattern: {pattern}\n\
         error: {error}\n\n\
         hint: Use * to match any part of a component name, e.g. 'block_*'\n\
         hint: Use [abc] for character classes, [!abc] to negate"
    )
}

/// Generate an error for a `--name` given together with several sources.
pub fn name_needs_single_file() -> anyhow::Error {
    anyhow::anyhow!(
        "--name can only be used when importing a single file\n\n\
         hint: Import files one at a time, or let each file name decide the component"
    )
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(&input.to_lowercase(), &candidate.to_lowercase());
            (distance <= 2 && distance < input.len()).then_some((candidate, distance))
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
