//! Process discovery below the proc root.
//!
//! This module lists numeric pid directories and decides, by name, which
//! processes a `ProcessTable` should track.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Name filters and limits applied while scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessFilter {
    pub include_names: Option<Vec<String>>,
    pub exclude_names: Option<Vec<String>>,
    pub max_processes: Option<usize>,
}

impl ProcessFilter {
    /// Exclusion wins over inclusion; an empty include list includes all.
    pub fn should_include(&self, name: &str) -> bool {
        if let Some(ex) = &self.exclude_names {
            if ex.iter().any(|s| name.contains(s.as_str())) {
                return false;
            }
        }
        if let Some(inc) = &self.include_names {
            if !inc.is_empty() {
                return inc.iter().any(|s| name.contains(s.as_str()));
            }
        }
        true
    }
}

/// Scans `root` for directories with numeric names that carry a stat record.
pub fn collect_pids(root: &Path, max: Option<usize>) -> Vec<i32> {
    let mut out = Vec::new();
    if let Ok(entries) = fs::read_dir(root) {
        for entry in entries.flatten() {
            let p = entry.path();
            let name = match p.file_name().and_then(|s| s.to_str()) {
                Some(v) => v,
                None => continue,
            };
            if !name.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if !p.join("stat").exists() {
                continue;
            }
            let pid: i32 = match name.parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            out.push(pid);
            if let Some(maxp) = max {
                if out.len() >= maxp {
                    break;
                }
            }
        }
    }
    out.sort_unstable();
    out
}
