//! Startup requirement validation for herakles-proc-sampler.
//!
//! This module validates that the sampler has the permissions and /proc
//! layout it needs before the first cycle.

use nix::unistd::geteuid;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// Validate all runtime requirements
pub fn validate_requirements(proc_root: &Path) -> Result<(), ValidationError> {
    info!("🔍 Validating runtime requirements...");

    check_user_privileges();
    check_proc_root(proc_root)?;
    check_self_stat(proc_root)?;
    check_init_stat(proc_root)?;

    info!("✅ All runtime requirements validated");
    Ok(())
}

/// Check if running with sufficient privileges
fn check_user_privileges() {
    if !geteuid().is_root() {
        warn!("⚠️  Not running as root - processes of other users may not be terminable");
        warn!("   Recommendation: Run as root or allow 'sudo kill' for the sampling user");
    } else {
        info!("✅ Running as root (uid=0)");
    }
}

fn check_proc_root(proc_root: &Path) -> Result<(), ValidationError> {
    if !proc_root.is_dir() {
        error!("❌ {} is not a directory - proc filesystem not mounted?", proc_root.display());
        return Err(ValidationError::ProcNotMounted(proc_root.display().to_string()));
    }
    Ok(())
}

/// The sampler's own stat record must always be readable.
fn check_self_stat(proc_root: &Path) -> Result<(), ValidationError> {
    let test_file = proc_root.join("self").join("stat");
    match fs::read_to_string(&test_file) {
        Ok(_) => {
            info!("✅ {} readable", test_file.display());
            Ok(())
        }
        Err(e) => {
            error!("❌ Cannot read {}: {}", test_file.display(), e);
            Err(ValidationError::Unreadable {
                path: test_file.display().to_string(),
                reason: e.to_string(),
            })
        }
    }
}

/// Check stat access for a process owned by someone else (init).
fn check_init_stat(proc_root: &Path) -> Result<(), ValidationError> {
    let test_file = proc_root.join("1").join("stat");
    match fs::read_to_string(&test_file) {
        Ok(_) => {
            info!("✅ /proc access: Can read foreign processes");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            error!("❌ Cannot read {} - insufficient permissions", test_file.display());
            error!("   This usually means /proc is mounted with hidepid.");
            error!("   Only user-owned processes will be sampled!");
            Err(ValidationError::InsufficientPermissions(e.to_string()))
        }
        Err(e) => {
            warn!("⚠️  Could not test /proc access: {}", e);
            Ok(())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("proc filesystem not found at {0}")]
    ProcNotMounted(String),

    #[error("Cannot read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_proc_root() {
        let err = validate_requirements(Path::new("/nonexistent/herakles/proc")).unwrap_err();
        assert!(matches!(err, ValidationError::ProcNotMounted(_)));
    }

    #[test]
    fn test_missing_self_stat() {
        let dir = tempdir().expect("Failed to create temp dir");
        let err = validate_requirements(dir.path()).unwrap_err();
        assert!(matches!(err, ValidationError::Unreadable { .. }));
    }

    #[test]
    fn test_fake_proc_tree_passes() {
        let dir = tempdir().expect("Failed to create temp dir");
        for pid in ["self", "1"] {
            let p = dir.path().join(pid);
            fs::create_dir(&p).expect("Failed to create pid dir");
            fs::write(p.join("stat"), "1 (init) S 0\n").expect("Failed to write stat");
        }
        assert!(validate_requirements(dir.path()).is_ok());
    }

    #[test]
    fn test_missing_init_is_not_fatal() {
        let dir = tempdir().expect("Failed to create temp dir");
        let p = dir.path().join("self");
        fs::create_dir(&p).expect("Failed to create pid dir");
        fs::write(p.join("stat"), "7 (sampler) R 1\n").expect("Failed to write stat");
        assert!(validate_requirements(dir.path()).is_ok());
    }
}
