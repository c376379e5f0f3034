//! Canonical on-disk locations of exported language files
//!
//! Legacy release lines keep every component of a language in one shared
//! `lang/<lang>_utf8/` directory. Modern release lines store each plugin's
//! strings inside the plugin itself, while core subsystems share the
//! top-level `lang/<lang>/` directory.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::version::Version;

/// Plugin type prefixes and the directory their plugins live in.
const PLUGIN_TYPE_DIRS: &[(&str, &str)] = &[
    ("auth", "auth"),
    ("block", "blocks"),
    ("coursereport", "course/report"),
    ("datafield", "mod/data/field"),
    ("datapreset", "mod/data/preset"),
    ("editor", "lib/editor"),
    ("enrol", "enrol"),
    ("filter", "filter"),
    ("format", "course/format"),
    ("gradeexport", "grade/export"),
    ("gradeimport", "grade/import"),
    ("gradereport", "grade/report"),
    ("local", "local"),
    ("message", "message/output"),
    ("mnetservice", "mnet/service"),
    ("mod", "mod"),
    ("plagiarism", "plagiarism"),
    ("portfolio", "portfolio"),
    ("qbehaviour", "question/behaviour"),
    ("qformat", "question/format"),
    ("qtype", "question/type"),
    ("quiz", "mod/quiz/report"),
    ("report", "admin/report"),
    ("repository", "repository"),
    ("theme", "theme"),
    ("tool", "admin/tool"),
    ("webservice", "webservice"),
    ("workshopallocation", "mod/workshop/allocation"),
    ("workshopeval", "mod/workshop/eval"),
    ("workshopform", "mod/workshop/form"),
];

/// Single-word component names that belong to core rather than to an
/// activity module.
const CORE_SUBSYSTEMS: &[&str] = &[
    "access", "admin", "auth", "backup", "block", "blog", "bulkusers", "calendar", "cohort",
    "completion", "countries", "course", "currencies", "dbtransfer", "debug", "dock", "editor",
    "error", "filepicker", "files", "filters", "form", "grades", "group", "help", "hub", "imscc",
    "install", "iso6392", "langconfig", "license", "message", "mimetypes", "mnet", "moodle",
    "my", "notes", "pagetype", "pix", "plagiarism", "plugin", "portfolio", "publish", "question",
    "rating", "register", "repository", "role", "search", "table", "tag", "timezones", "user",
    "userkey", "webservice",
];

/// Split a component name into its plugin type and plugin name.
///
/// `core` and `core_<subsystem>` belong to core, as do the single-word
/// subsystem names. Any other single-word name is an activity module.
pub fn normalize_component(name: &str) -> (&str, &str) {
    if name == "core" {
        return ("core", "");
    }
    match name.split_once('_') {
        Some(("core", subsystem)) => ("core", subsystem),
        Some((plugin_type, plugin)) => (plugin_type, plugin),
        None if CORE_SUBSYSTEMS.contains(&name) => ("core", name),
        None => ("mod", name),
    }
}

/// Directory holding plugins of `plugin_type`, relative to the code root.
pub fn plugin_type_dir(plugin_type: &str) -> Option<&'static str> {
    PLUGIN_TYPE_DIRS
        .iter()
        .find(|(t, _)| *t == plugin_type)
        .map(|(_, dir)| *dir)
}

/// Relative path of the file holding `name`'s strings in `lang` on `version`.
pub fn storage_path(name: &str, lang: &str, version: &Version) -> Result<PathBuf> {
    let file = format!("{}.php", name);
    if version.is_legacy() {
        return Ok(PathBuf::from("lang").join(format!("{}_utf8", lang)).join(file));
    }
    let (plugin_type, plugin) = normalize_component(name);
    if plugin_type == "core" {
        return Ok(PathBuf::from("lang").join(lang).join(file));
    }
    let dir = plugin_type_dir(plugin_type).ok_or_else(|| Error::UnknownPluginType {
        plugin_type: plugin_type.to_string(),
    })?;
    Ok(PathBuf::from(dir).join(plugin).join("lang").join(lang).join(file))
}
