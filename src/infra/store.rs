// ============================================================
// Layer 6 — Tracking Store
// ============================================================
// Shared filesystem plumbing for the registry and the tracker.
//
// Tracking URI:
//   ./mlruns              → relative path
//   /srv/mlruns           → absolute path
//   file:///srv/mlruns    → same, URI form
//   http://host:5000      → rejected, no remote backend exists
//
// Layout under the resolved root:
//
//   mlruns/
//     experiments/<experiment>/
//       metrics.csv                  ← one row per finished run
//       runs/<run_id>/run.json       ← params, metrics, status
//       runs/<run_id>/model.json     ← pipeline logged by the run
//     models/<name>/<version>/
//       model.json                   ← registered pipeline
//       version.json                 ← stage + provenance
//
// JSON documents are written to a sibling temp file and renamed
// into place, so a reader never sees a half-written file.

use anyhow::{bail, Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::error::ModelUnavailableError;

/// Turn a tracking URI into the local directory it names.
pub fn resolve_tracking_uri(uri: &str) -> Result<PathBuf, ModelUnavailableError> {
    let trimmed = uri.trim();
    let unsupported = || ModelUnavailableError::UnsupportedTrackingUri(uri.to_string());

    let path = if let Some(rest) = trimmed.strip_prefix("file://") {
        // file://localhost/srv/mlruns and file:///srv/mlruns are the same place
        rest.strip_prefix("localhost").unwrap_or(rest)
    } else if let Some(rest) = trimmed.strip_prefix("file:") {
        rest
    } else if trimmed.contains("://") {
        return Err(unsupported());
    } else {
        trimmed
    };

    if path.is_empty() {
        return Err(unsupported());
    }
    Ok(PathBuf::from(path))
}

/// Reject names that would escape their directory when used as a path component.
pub fn check_component(kind: &str, name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        bail!("Invalid {kind} name '{name}'");
    }
    Ok(())
}

/// Serialize `value` as pretty JSON and move it into place atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(value)?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("Cannot write '{}'", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Cannot move '{}' into place", path.display()))?;

    tracing::debug!("Wrote '{}'", path.display());
    Ok(())
}

/// Read a JSON document, mapping failures onto the model-loading taxonomy:
/// a missing or unparsable file is `Corrupt`, any other I/O error is `Io`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelUnavailableError> {
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => ModelUnavailableError::Corrupt {
            path:   path.to_path_buf(),
            reason: "file is missing".to_string(),
        },
        _ => ModelUnavailableError::Io { path: path.to_path_buf(), source },
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ModelUnavailableError::Corrupt {
        path:   path.to_path_buf(),
        reason: e.to_string(),
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_plain_paths_and_file_uris() {
        assert_eq!(resolve_tracking_uri("./mlruns").unwrap(), PathBuf::from("./mlruns"));
        assert_eq!(resolve_tracking_uri("file:///srv/mlruns").unwrap(), PathBuf::from("/srv/mlruns"));
        assert_eq!(
            resolve_tracking_uri("file://localhost/srv/mlruns").unwrap(),
            PathBuf::from("/srv/mlruns")
        );
        assert_eq!(resolve_tracking_uri("file:mlruns").unwrap(), PathBuf::from("mlruns"));
    }

    #[test]
    fn test_remote_uris_are_unsupported() {
        for uri in ["http://localhost:5000", "https://mlflow.internal", "s3://bucket/path", ""] {
            assert!(matches!(
                resolve_tracking_uri(uri),
                Err(ModelUnavailableError::UnsupportedTrackingUri(_))
            ));
        }
    }

    #[test]
    fn test_path_components() {
        assert!(check_component("model", "StudentPerformanceModel").is_ok());
        assert!(check_component("model", "..").is_err());
        assert!(check_component("model", "a/b").is_err());
        assert!(check_component("model", "").is_err());
    }

    #[test]
    fn test_json_round_trip_leaves_no_temp_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");
        let doc: BTreeMap<String, u32> = [("a".to_string(), 1)].into();

        write_json(&path, &doc).unwrap();
        let back: BTreeMap<String, u32> = read_json(&path).unwrap();
        assert_eq!(back, doc);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_read_json_failures() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            read_json::<u32>(&missing),
            Err(ModelUnavailableError::Corrupt { .. })
        ));

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "{not json").unwrap();
        assert!(matches!(
            read_json::<u32>(&garbage),
            Err(ModelUnavailableError::Corrupt { .. })
        ));
    }
}
