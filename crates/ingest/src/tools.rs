use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::events::ToolPart;

// Tool metadata is loosely typed: a null or mistyped field falls back on its
// own instead of failing the whole payload.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// Per-file diff reported by editing tools.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FileDiff {
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub file: String,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub additions: f64,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub deletions: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditMetadata {
    #[serde(default, deserialize_with = "lenient")]
    pub filediff: Option<FileDiff>,
    #[serde(default, deserialize_with = "lenient")]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WriteMetadata {
    #[serde(default, deserialize_with = "lenient")]
    pub filepath: Option<String>,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub exists: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PatchMetadata {
    #[serde(default, deserialize_with = "lenient")]
    pub diff: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MultiEditResult {
    #[serde(default, deserialize_with = "lenient")]
    pub filediff: Option<FileDiff>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MultiEditMetadata {
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub results: Vec<MultiEditResult>,
}

/// Completed tool call, keyed by tool name.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolPayload {
    Edit(EditMetadata),
    Write(WriteMetadata),
    /// Net line delta across the files listed in the tool output.
    Patch { diff: f64, files: Vec<String> },
    MultiEdit(MultiEditMetadata),
    Read { title: Option<String> },
    Unknown(String),
}

fn metadata_as<T: DeserializeOwned + Default>(metadata: &Value) -> T {
    serde_json::from_value(metadata.clone()).unwrap_or_default()
}

impl ToolPayload {
    /// Returns `None` when the call carried no metadata at all.
    pub fn from_part(part: &ToolPart) -> Option<Self> {
        let metadata = part.state.metadata.as_ref()?;
        let payload = match part.tool.as_str() {
            "edit" => ToolPayload::Edit(metadata_as(metadata)),
            "write" => ToolPayload::Write(metadata_as(metadata)),
            "patch" => {
                let PatchMetadata { diff } = metadata_as(metadata);
                ToolPayload::Patch {
                    diff: diff.unwrap_or(0.0),
                    files: patched_files(&part.state.output),
                }
            }
            "multiedit" => ToolPayload::MultiEdit(metadata_as(metadata)),
            "read" => ToolPayload::Read {
                title: part.state.title.clone(),
            },
            other => ToolPayload::Unknown(other.to_string()),
        };
        Some(payload)
    }

    pub fn file_changes(&self) -> Vec<FileChange> {
        match self {
            ToolPayload::Edit(metadata) => {
                if let Some(diff) = metadata.filediff.as_ref().filter(|diff| !diff.file.is_empty()) {
                    vec![FileChange::from_diff(diff)]
                } else {
                    non_empty(metadata.file_path.as_deref())
                        .map(FileChange::touched)
                        .into_iter()
                        .collect()
                }
            }
            ToolPayload::Write(metadata) => non_empty(metadata.filepath.as_deref())
                .map(|file| FileChange {
                    is_write: !metadata.exists,
                    ..FileChange::touched(file)
                })
                .into_iter()
                .collect(),
            ToolPayload::Patch { diff, files } => {
                if files.is_empty() {
                    return Vec::new();
                }
                let per_file = round_half_up(diff / files.len() as f64);
                files
                    .iter()
                    .map(|file| FileChange {
                        additions: per_file.max(0.0),
                        deletions: (-per_file).max(0.0),
                        ..FileChange::touched(file)
                    })
                    .collect()
            }
            ToolPayload::MultiEdit(metadata) => metadata
                .results
                .iter()
                .filter_map(|result| result.filediff.as_ref())
                .filter(|diff| !diff.file.is_empty())
                .map(FileChange::from_diff)
                .collect(),
            ToolPayload::Read { title } => non_empty(title.as_deref())
                .map(FileChange::touched)
                .into_iter()
                .collect(),
            ToolPayload::Unknown(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileChange {
    pub file: String,
    pub additions: f64,
    pub deletions: f64,
    pub is_write: bool,
}

impl FileChange {
    fn touched(file: &str) -> Self {
        Self {
            file: file.to_string(),
            additions: 0.0,
            deletions: 0.0,
            is_write: false,
        }
    }

    fn from_diff(diff: &FileDiff) -> Self {
        Self {
            additions: diff.additions,
            deletions: diff.deletions,
            ..Self::touched(&diff.file)
        }
    }
}

pub fn extract_file_changes(part: &ToolPart) -> Vec<FileChange> {
    ToolPayload::from_part(part)
        .map(|payload| payload.file_changes())
        .unwrap_or_default()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Files are listed one per line, indented by exactly two spaces.
fn patched_files(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.starts_with("  ") && !line.starts_with("   "))
        .map(str::trim)
        .filter(|file| !file.is_empty() && !file.contains(' '))
        .map(str::to_string)
        .collect()
}

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
