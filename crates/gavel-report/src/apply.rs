use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::fixplan::{ActionableFix, FixType, JudgePlan};

#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("Document I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse document: {0}")]
    Parse(String),

    #[error("Path '{path}' could not be navigated: {reason}")]
    PathNavigation { path: String, reason: String },
}

/// Read/write access to a structured document.
///
/// Backends round-trip values; the YAML backend does not preserve comments
/// (the pre-apply backup keeps the original text recoverable).
pub trait DocumentStore {
    fn load(&self, path: &Path) -> Result<Value, ApplyError>;
    fn save(&self, path: &Path, document: &Value) -> Result<(), ApplyError>;
}

pub struct JsonDocumentStore;

impl DocumentStore for JsonDocumentStore {
    fn load(&self, path: &Path) -> Result<Value, ApplyError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| ApplyError::Parse(e.to_string()))
    }

    fn save(&self, path: &Path, document: &Value) -> Result<(), ApplyError> {
        let content =
            serde_json::to_string_pretty(document).map_err(|e| ApplyError::Parse(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

pub struct YamlDocumentStore;

impl DocumentStore for YamlDocumentStore {
    fn load(&self, path: &Path) -> Result<Value, ApplyError> {
        let content = std::fs::read_to_string(path)?;
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| ApplyError::Parse(e.to_string()))?;
        serde_json::to_value(yaml).map_err(|e| ApplyError::Parse(e.to_string()))
    }

    fn save(&self, path: &Path, document: &Value) -> Result<(), ApplyError> {
        let content =
            serde_yaml::to_string(document).map_err(|e| ApplyError::Parse(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Outcome of one fix within an apply run.
#[derive(Debug, Clone)]
pub struct FixApplyResult {
    pub fix_id: String,
    pub target_path: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Outcome of applying a whole plan.
#[derive(Debug)]
pub struct PlanApplyReport {
    /// Timestamped copy of the document taken before any write
    pub backup_path: PathBuf,
    pub results: Vec<FixApplyResult>,
}

impl PlanApplyReport {
    pub fn applied(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.applied()
    }
}

/// Apply every fix in the plan to its target document.
///
/// The document is backed up to a timestamped sibling first. Each fix
/// succeeds or fails independently; a failure does not roll back fixes
/// already applied, and the backup stays available for manual rollback.
/// Callers must ensure no concurrent writer touches the same document.
pub fn apply_plan(plan: &JudgePlan, store: &dyn DocumentStore) -> Result<PlanApplyReport, ApplyError> {
    let document_path = plan.target_document.as_path();
    let mut document = store.load(document_path)?;
    let backup_path = backup_document(document_path)?;

    let mut results: Vec<FixApplyResult> = Vec::with_capacity(plan.fixes.len());

    for fix in &plan.fixes {
        match apply_fix(&mut document, fix) {
            Ok(()) => {
                results.push(FixApplyResult {
                    fix_id: fix.id.clone(),
                    target_path: fix.target_path.clone(),
                    success: true,
                    error: None,
                });
            }
            Err(e) => {
                warn!(fix_id = %fix.id, path = %fix.target_path, error = %e, "Fix failed to apply");
                results.push(FixApplyResult {
                    fix_id: fix.id.clone(),
                    target_path: fix.target_path.clone(),
                    success: false,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    store.save(document_path, &document)?;

    let report = PlanApplyReport {
        backup_path,
        results,
    };
    info!(
        applied = report.applied(),
        failed = report.failed(),
        backup = %report.backup_path.display(),
        "Applied fix plan"
    );

    Ok(report)
}

fn backup_document(path: &Path) -> Result<PathBuf, ApplyError> {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    let backup_path = path.with_file_name(format!("{}.{}.bak", file_name, timestamp));
    std::fs::copy(path, &backup_path)?;
    Ok(backup_path)
}

/// Navigate the fix's dotted path and edit the leaf.
///
/// Intermediate maps are created as needed; numeric segments index into
/// sequences and must resolve to an existing element. `AppendInstruction`
/// concatenates at the leaf, every other fix type replaces it.
fn apply_fix(document: &mut Value, fix: &ActionableFix) -> Result<(), ApplyError> {
    let segments: Vec<&str> = fix.target_path.split('.').collect();
    let Some((&leaf, parents)) = segments.split_last() else {
        return Err(ApplyError::PathNavigation {
            path: fix.target_path.clone(),
            reason: "empty path".to_string(),
        });
    };

    let mut current = document;
    for &segment in parents {
        current = descend(current, segment, &fix.target_path)?;
    }

    let slot = descend(current, leaf, &fix.target_path)?;

    match fix.fix_type {
        FixType::AppendInstruction => match slot {
            Value::String(existing) => {
                let appended = format!("{}\n\n{}", existing, fix.suggested_value);
                *slot = Value::String(appended);
            }
            Value::Null => *slot = Value::String(fix.suggested_value.clone()),
            other => {
                return Err(ApplyError::PathNavigation {
                    path: fix.target_path.clone(),
                    reason: format!("cannot append to a {}", kind_name(other)),
                })
            }
        },
        FixType::RewriteInstruction | FixType::AddContextSource => {
            *slot = Value::String(fix.suggested_value.clone());
        }
    }

    Ok(())
}

fn descend<'a>(
    current: &'a mut Value,
    segment: &str,
    full_path: &str,
) -> Result<&'a mut Value, ApplyError> {
    if let Ok(index) = segment.parse::<usize>() {
        let kind = kind_name(current);
        let array = current
            .as_array_mut()
            .ok_or_else(|| ApplyError::PathNavigation {
                path: full_path.to_string(),
                reason: format!("segment '{}' indexes into a {}", segment, kind),
            })?;
        let len = array.len();
        return array.get_mut(index).ok_or_else(|| ApplyError::PathNavigation {
            path: full_path.to_string(),
            reason: format!("index {} out of bounds (sequence has {} elements)", index, len),
        });
    }

    if current.is_null() {
        *current = Value::Object(Map::new());
    }

    let kind = kind_name(current);
    let object = current
        .as_object_mut()
        .ok_or_else(|| ApplyError::PathNavigation {
            path: full_path.to_string(),
            reason: format!("segment '{}' descends into a {}", segment, kind),
        })?;

    Ok(object.entry(segment.to_string()).or_insert(Value::Null))
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "map",
    }
}
