//! Selection rules: which committed paths count as deployable models.
//!
//! The defaults reproduce the permissive substring checks the pipeline has
//! always used. `PathMatching::Segment` and `MaterializationDetection::ConfigBlock`
//! are stricter opt-ins; switching to them can change which models deploy.

use std::ffi::OsStr;
use std::path::{Component, Path};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default script extension.
pub const DEFAULT_SCRIPT_EXTENSION: &str = ".sql";

/// Default models directory marker.
pub const DEFAULT_MODELS_DIR: &str = "models/";

/// Default materialization marker.
pub const DEFAULT_MARKER: &str = "persistent_table";

/// How path predicates (`.sql`, `models/`) are evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathMatching {
    /// Plain substring test. `mymodels/x.sql` matches `models/`.
    #[default]
    Substring,

    /// Extension must be the file's extension and the models directory must
    /// be a whole directory component.
    Segment,
}

/// How the materialization marker is detected in model content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterializationDetection {
    /// Marker appears anywhere in the file.
    #[default]
    Substring,

    /// Marker is the `materialized` argument of a `config(...)` block.
    ConfigBlock,
}

/// What the filter does with a candidate that is missing on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingModelPolicy {
    /// Abort with `NotFound`.
    #[default]
    Fail,

    /// Log a warning and leave the path out.
    Skip,
}

/// Predicates applied by the loader and the filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRules {
    pub script_extension: String,
    pub models_dir: String,
    pub marker: String,
    pub path_matching: PathMatching,
    pub detection: MaterializationDetection,
    pub missing: MissingModelPolicy,
}

impl Default for SelectionRules {
    fn default() -> Self {
        Self {
            script_extension: DEFAULT_SCRIPT_EXTENSION.to_string(),
            models_dir: DEFAULT_MODELS_DIR.to_string(),
            marker: DEFAULT_MARKER.to_string(),
            path_matching: PathMatching::default(),
            detection: MaterializationDetection::default(),
            missing: MissingModelPolicy::default(),
        }
    }
}

impl SelectionRules {
    /// Whether `path` looks like a script file.
    pub fn is_script(&self, path: &str) -> bool {
        match self.path_matching {
            PathMatching::Substring => path.contains(&self.script_extension),
            PathMatching::Segment => {
                let wanted = self.script_extension.trim_start_matches('.');
                Path::new(path)
                    .extension()
                    .map(|ext| ext == wanted)
                    .unwrap_or(false)
            }
        }
    }

    /// Whether `path` lies under the models directory.
    pub fn is_model_path(&self, path: &str) -> bool {
        match self.path_matching {
            PathMatching::Substring => path.contains(&self.models_dir),
            PathMatching::Segment => {
                let wanted = normal_components(Path::new(&self.models_dir));
                // The last component is the file itself, never a directory.
                let Some(parent) = Path::new(path).parent() else {
                    return false;
                };
                if wanted.is_empty() {
                    return false;
                }
                normal_components(parent)
                    .windows(wanted.len())
                    .any(|run| run == wanted.as_slice())
            }
        }
    }

    /// Whether model `content` declares the marked materialization.
    pub fn is_marked(&self, content: &str) -> bool {
        match self.detection {
            MaterializationDetection::Substring => content.contains(&self.marker),
            MaterializationDetection::ConfigBlock => config_materializations(content)
                .any(|materialized| materialized == self.marker),
        }
    }
}

/// Named directory components of `path`, ignoring `.` and the root.
fn normal_components(path: &Path) -> Vec<&OsStr> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name),
            _ => None,
        })
        .collect()
}

fn config_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bconfig\s*\(").expect("valid config call regex"))
}

fn materialized_arg_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\bmaterialized\s*=\s*['"]([^'"]*)['"]"#).expect("valid materialized regex")
    })
}

/// Argument text of every `config(...)` call in `content`, up to the
/// matching `)`. An unterminated call ends the scan.
fn config_blocks(content: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut from = 0;
    while let Some(call) = config_call_re().find_at(content, from) {
        let args = &content[call.end()..];
        let Some(len) = closing_paren(args) else {
            break;
        };
        blocks.push(&args[..len]);
        from = call.end() + len + 1;
    }
    blocks
}

/// Byte offset of the `)` closing an argument list, skipping nested calls
/// and quoted strings.
fn closing_paren(args: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (idx, ch) in args.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') if depth == 0 => return Some(idx),
            (None, ')') => depth -= 1,
            _ => {}
        }
    }
    None
}

/// `materialized` values declared in every `config(...)` block of `content`.
fn config_materializations(content: &str) -> impl Iterator<Item = &str> {
    config_blocks(content).into_iter().flat_map(|args| {
        materialized_arg_re()
            .captures_iter(args)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
    })
}
