//! # Tree Command Implementation
//!
//! Displays the components recorded in the repository as a tree of
//! version, language and component name.
//!
//! ## Functionality
//!
//! - **Version and language filters**: `--version` and `--lang` narrow the tree
//! - **Component glob**: `--component 'block_*'` keeps matching names only
//!
//! This command is a safe, read-only operation.

use std::borrow::Cow;
use std::io::Write;

use anyhow::Result;
use clap::Args;
use glob::Pattern;
use ptree::{TreeItem, print_tree};

use langrepo::repository::{ComponentFilter, ComponentsTree, components_tree};
use langrepo::suggestions;
use langrepo::version::Version;

use super::{Context, resolve_version};

/// Display the components held in the repository
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Only show this version (code, branch or label)
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,

    /// Only show this language
    #[arg(short, long, value_name = "CODE")]
    pub lang: Option<String>,

    /// Only show components matching this glob pattern
    #[arg(long, value_name = "PATTERN")]
    pub component: Option<String>,
}

/// Execute the `tree` command.
pub fn execute(ctx: &Context, args: TreeArgs) -> Result<()> {
    let filter = ComponentFilter {
        branch: args
            .version
            .as_deref()
            .map(resolve_version)
            .transpose()?
            .map(|v| v.code),
        language: args.lang.clone(),
        component: None,
    };
    let pattern = args
        .component
        .as_deref()
        .map(|p| Pattern::new(p).map_err(|e| suggestions::invalid_glob(p, &e)))
        .transpose()?;

    let log = ctx.open_log();
    let tree = components_tree(log.as_ref(), &filter)?;
    let root = build_tree(&ctx.repository.display().to_string(), &tree, pattern.as_ref());
    if root.children.is_empty() {
        println!("No components in {}", ctx.repository.display());
        return Ok(());
    }
    print_tree(&root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    Ok(())
}

/// Build the display tree, dropping branches left empty by the glob.
fn build_tree(label: &str, tree: &ComponentsTree, pattern: Option<&Pattern>) -> TreeNode {
    let mut versions = Vec::new();
    for (code, languages) in tree.iter().rev() {
        let mut language_nodes = Vec::new();
        for (language, components) in languages {
            let leaves: Vec<TreeNode> = components
                .iter()
                .filter(|name| pattern.is_none_or(|p| p.matches(name)))
                .map(|name| TreeNode::leaf(name.clone()))
                .collect();
            if !leaves.is_empty() {
                language_nodes.push(TreeNode {
                    label: format!("{} ({})", language, leaves.len()),
                    children: leaves,
                });
            }
        }
        if !language_nodes.is_empty() {
            let version_label = Version::by_code(*code).map_or_else(|| code.to_string(), |v| v.to_string());
            versions.push(TreeNode {
                label: version_label,
                children: language_nodes,
            });
        }
    }
    TreeNode {
        label: label.to_string(),
        children: versions,
    }
}

/// Tree node structure for ptree visualization
#[derive(Clone, Debug)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(label: String) -> Self {
        Self {
            label,
            children: Vec::new(),
        }
    }
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: Write>(&self, f: &mut W, _style: &ptree::Style) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}
