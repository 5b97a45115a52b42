use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DataError;

/// A participant directory under the input root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub dir: PathBuf,
}

/// The two condition recordings of a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionFiles {
    pub congruent: PathBuf,
    pub incongruent: PathBuf,
}

/// List participant directories in name order, skipping plain files and excluded names.
pub fn list_participants(root: &Path, exclude: &[String]) -> Result<Vec<Participant>> {
    let entries =
        fs::read_dir(root).with_context(|| format!("listing participants in {}", root.display()))?;
    let mut participants = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("reading entry in {}", root.display()))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let id = entry.file_name().to_string_lossy().to_string();
        if exclude.iter().any(|name| *name == id) {
            log::info!("skipping excluded participant {}", id);
            continue;
        }
        participants.push(Participant { id, dir: path });
    }
    participants.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(participants)
}

/// Find exactly one file per condition suffix in `dir`.
pub fn locate_condition_files(
    dir: &Path,
    congruent_suffix: &str,
    incongruent_suffix: &str,
) -> Result<ConditionFiles> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry.with_context(|| format!("reading entry in {}", dir.display()))?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();
    let congruent = single_match(dir, &names, congruent_suffix)?;
    let incongruent = single_match(dir, &names, incongruent_suffix)?;
    Ok(ConditionFiles {
        congruent,
        incongruent,
    })
}

fn single_match(dir: &Path, names: &[String], suffix: &str) -> Result<PathBuf, DataError> {
    let matches: Vec<&String> = names.iter().filter(|name| name.ends_with(suffix)).collect();
    match matches.as_slice() {
        [only] => Ok(dir.join(only.as_str())),
        [] => Err(DataError::MissingConditionFile {
            dir: dir.to_path_buf(),
            suffix: suffix.to_string(),
        }),
        many => Err(DataError::DuplicateConditionFile {
            dir: dir.to_path_buf(),
            suffix: suffix.to_string(),
            count: many.len(),
        }),
    }
}
