// ============================================================
// Layer 6 — Local Model Registry
// ============================================================
// File-backed ModelRegistry rooted at the tracking directory.
//
// Versions of a model are directories models/<name>/1, 2, 3, …
// A version exists once its version.json is written; model.json is
// written first, so a crash between the two leaves an ignored
// directory rather than a version without an artifact. Its number
// stays taken: the next registration counts past every numbered
// directory, complete or not.
//
// Stages:
//   - a new version starts in None
//   - Staging and Production hold at most one version each; moving
//     a version in archives the previous holder
//   - Archived and None may hold any number of versions
//
// Selector resolution (highest version wins where several match):
//   latest     → highest version number
//   <stage>    → highest version currently in that stage
//   <number>   → that exact version

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::error::ModelUnavailableError;
use crate::domain::model_version::{ModelSelector, ModelVersion, RunRef, Stage};
use crate::domain::traits::ModelRegistry;
use crate::infra::store::{check_component, read_json, resolve_tracking_uri, write_json};
use crate::ml::pipeline::{ModelArtifact, Pipeline};

const MODEL_FILE:   &str = "model.json";
const VERSION_FILE: &str = "version.json";

pub struct LocalRegistry {
    root: PathBuf,
}

impl LocalRegistry {
    /// Open the registry named by a tracking URI. The directory is
    /// created lazily on first write.
    pub fn open(tracking_uri: &str) -> Result<Self, ModelUnavailableError> {
        let root = resolve_tracking_uri(tracking_uri)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn model_dir(&self, name: &str) -> PathBuf {
        self.root.join("models").join(name)
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.model_dir(name).join(version.to_string())
    }

    /// Numbered directories under the model, complete or not.
    fn version_dirs(&self, name: &str) -> Result<Vec<(u32, PathBuf)>, ModelUnavailableError> {
        let dir = self.model_dir(name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(ModelUnavailableError::Io { path: dir, source }),
        };

        let mut numbered = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ModelUnavailableError::Io {
                path: dir.clone(),
                source,
            })?;
            if let Some(number) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) {
                numbered.push((number, entry.path()));
            }
        }
        Ok(numbered)
    }

    /// Every complete version of `name`, ascending.
    fn read_versions(&self, name: &str) -> Result<Vec<ModelVersion>, ModelUnavailableError> {
        let mut versions = Vec::new();
        for (number, path) in self.version_dirs(name)? {
            let meta_path = path.join(VERSION_FILE);
            if !meta_path.exists() {
                tracing::warn!("Ignoring incomplete version directory '{}'", path.display());
                continue;
            }
            let meta: ModelVersion = read_json(&meta_path)?;
            if meta.name != name || meta.version != number {
                return Err(ModelUnavailableError::Corrupt {
                    path:   meta_path,
                    reason: format!(
                        "describes {} version {}, expected {name} version {number}",
                        meta.name, meta.version
                    ),
                });
            }
            versions.push(meta);
        }
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    fn resolve(
        &self,
        name:     &str,
        selector: &ModelSelector,
    ) -> Result<ModelVersion, ModelUnavailableError> {
        let not_found = || ModelUnavailableError::NotFound {
            name:     name.to_string(),
            selector: selector.to_string(),
        };
        if check_component("model", name).is_err() {
            return Err(not_found());
        }

        let versions = self.read_versions(name)?;
        let chosen = match selector {
            ModelSelector::Latest    => versions.into_iter().last(),
            ModelSelector::Stage(s)  => versions.into_iter().rev().find(|v| v.stage == *s),
            ModelSelector::Version(n) => versions.into_iter().find(|v| v.version == *n),
        };
        chosen.ok_or_else(not_found)
    }
}

impl ModelRegistry for LocalRegistry {
    fn load(
        &self,
        name:     &str,
        selector: &ModelSelector,
    ) -> Result<ModelArtifact, ModelUnavailableError> {
        let version = self.resolve(name, selector)?;
        let path    = self.version_dir(name, version.version).join(MODEL_FILE);

        let pipeline: Pipeline = read_json(&path)?;
        pipeline
            .verify()
            .map_err(|reason| ModelUnavailableError::Corrupt { path: path.clone(), reason })?;

        tracing::info!(
            "Loaded model '{}' version {} ({}, stage {})",
            name,
            version.version,
            pipeline.model,
            version.stage,
        );
        Ok(ModelArtifact { version, pipeline })
    }

    fn register_model(
        &self,
        name:     &str,
        pipeline: &Pipeline,
        run:      Option<&RunRef>,
    ) -> Result<ModelVersion> {
        check_component("model", name)?;
        pipeline
            .verify()
            .map_err(|reason| anyhow!("Refusing to register an inconsistent pipeline: {reason}"))?;

        let next = self
            .version_dirs(name)?
            .iter()
            .map(|(number, _)| number + 1)
            .max()
            .unwrap_or(1);

        let model_dir = self.model_dir(name);
        fs::create_dir_all(&model_dir)
            .with_context(|| format!("Cannot create '{}'", model_dir.display()))?;
        // create_dir (not _all) fails if a concurrent registration took this number
        let dir = self.version_dir(name, next);
        fs::create_dir(&dir)
            .with_context(|| format!("Version directory '{}' already exists", dir.display()))?;

        write_json(&dir.join(MODEL_FILE), pipeline)?;

        let now = Utc::now();
        let version = ModelVersion {
            name:       name.to_string(),
            version:    next,
            stage:      Stage::None,
            model_kind: pipeline.model.clone(),
            run:        run.cloned(),
            created_at: now,
            updated_at: now,
        };
        write_json(&dir.join(VERSION_FILE), &version)?;

        tracing::info!("Registered '{}' version {} ({})", name, next, pipeline.model);
        Ok(version)
    }

    fn transition_stage(&self, name: &str, version: u32, stage: Stage) -> Result<ModelVersion> {
        check_component("model", name)?;
        let versions = self.read_versions(name)?;

        let Some(mut target) = versions.iter().find(|v| v.version == version).cloned() else {
            bail!("Model '{name}' has no version {version}");
        };
        let now = Utc::now();

        if stage.is_exclusive() {
            for previous in versions.iter().filter(|v| v.stage == stage && v.version != version) {
                let mut archived = previous.clone();
                archived.stage      = Stage::Archived;
                archived.updated_at = now;
                write_json(&self.version_dir(name, archived.version).join(VERSION_FILE), &archived)?;
                tracing::info!("Archived '{}' version {} (was {})", name, archived.version, stage);
            }
        }

        target.stage      = stage;
        target.updated_at = now;
        write_json(&self.version_dir(name, version).join(VERSION_FILE), &target)?;

        tracing::info!("Moved '{}' version {} to {}", name, version, stage);
        Ok(target)
    }

    fn versions(&self, name: &str) -> Result<Vec<ModelVersion>> {
        check_component("model", name)?;
        Ok(self.read_versions(name)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::ModelSpec;
    use crate::testing::{example_record, synthetic_dataset};

    const NAME: &str = "StudentPerformanceModel";

    fn pipeline() -> Pipeline {
        let (records, targets) = synthetic_dataset(120, 4);
        Pipeline::fit(&ModelSpec::LinearRegression, &records, &targets).unwrap()
    }

    fn registry(dir: &tempfile::TempDir) -> LocalRegistry {
        LocalRegistry::open(dir.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_versions_are_numbered_from_one() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        let p   = pipeline();

        let v1 = reg.register_model(NAME, &p, None).unwrap();
        let v2 = reg.register_model(NAME, &p, None).unwrap();
        assert_eq!((v1.version, v2.version), (1, 2));
        assert_eq!(v2.stage, Stage::None);
        assert_eq!(v2.model_kind, "LinearRegression");
        assert_eq!(reg.versions(NAME).unwrap().len(), 2);
        assert!(reg.versions("Unknown").unwrap().is_empty());
    }

    #[test]
    fn test_exclusive_stage_archives_previous_holder() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        let p   = pipeline();
        reg.register_model(NAME, &p, None).unwrap();
        reg.register_model(NAME, &p, None).unwrap();

        reg.transition_stage(NAME, 1, Stage::Staging).unwrap();
        reg.transition_stage(NAME, 2, Stage::Staging).unwrap();

        let stages: Vec<Stage> = reg.versions(NAME).unwrap().iter().map(|v| v.stage).collect();
        assert_eq!(stages, vec![Stage::Archived, Stage::Staging]);
    }

    #[test]
    fn test_archived_stage_is_not_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        let p   = pipeline();
        reg.register_model(NAME, &p, None).unwrap();
        reg.register_model(NAME, &p, None).unwrap();

        reg.transition_stage(NAME, 1, Stage::Archived).unwrap();
        reg.transition_stage(NAME, 2, Stage::Archived).unwrap();
        assert!(reg.versions(NAME).unwrap().iter().all(|v| v.stage == Stage::Archived));
    }

    #[test]
    fn test_unknown_version_cannot_be_promoted() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        reg.register_model(NAME, &pipeline(), None).unwrap();
        assert!(reg.transition_stage(NAME, 7, Stage::Production).is_err());
    }

    #[test]
    fn test_load_by_selector() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        let p   = pipeline();
        let run = RunRef { experiment: "exp".into(), run_id: "abc".into() };
        reg.register_model(NAME, &p, Some(&run)).unwrap();
        reg.register_model(NAME, &p, None).unwrap();
        reg.transition_stage(NAME, 1, Stage::Production).unwrap();

        let latest = reg.load(NAME, &ModelSelector::Latest).unwrap();
        assert_eq!(latest.version.version, 2);

        let prod = reg.load(NAME, &ModelSelector::Stage(Stage::Production)).unwrap();
        assert_eq!(prod.version.version, 1);
        assert_eq!(prod.version.run, Some(run));
        assert_eq!(
            prod.pipeline.predict(&example_record()).unwrap(),
            p.predict(&example_record()).unwrap()
        );

        let exact = reg.load(NAME, &ModelSelector::Version(2)).unwrap();
        assert_eq!(exact.version.stage, Stage::None);
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        for selector in [ModelSelector::Latest, ModelSelector::Stage(Stage::Staging)] {
            assert!(matches!(
                reg.load(NAME, &selector),
                Err(ModelUnavailableError::NotFound { .. })
            ));
        }
        reg.register_model(NAME, &pipeline(), None).unwrap();
        assert!(matches!(
            reg.load(NAME, &ModelSelector::Stage(Stage::Staging)),
            Err(ModelUnavailableError::NotFound { .. })
        ));
        assert!(matches!(
            reg.load("../etc", &ModelSelector::Latest),
            Err(ModelUnavailableError::NotFound { .. })
        ));
    }

    #[test]
    fn test_corrupt_artifact_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        reg.register_model(NAME, &pipeline(), None).unwrap();

        let model_path = reg.version_dir(NAME, 1).join(MODEL_FILE);
        fs::write(&model_path, r#"{"format_version":1}"#).unwrap();
        assert!(matches!(
            reg.load(NAME, &ModelSelector::Latest),
            Err(ModelUnavailableError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_schema_mismatch_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        reg.register_model(NAME, &pipeline(), None).unwrap();

        let model_path = reg.version_dir(NAME, 1).join(MODEL_FILE);
        let mut doc: serde_json::Value = serde_json::from_slice(&fs::read(&model_path).unwrap()).unwrap();
        doc["preprocessor"]["scaler"]["columns"][0] = serde_json::json!("years");
        fs::write(&model_path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let err = reg.load(NAME, &ModelSelector::Latest).unwrap_err();
        assert!(err.to_string().contains("do not match"), "{err}");
    }

    #[test]
    fn test_incomplete_version_directory_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        reg.register_model(NAME, &pipeline(), None).unwrap();
        fs::create_dir_all(reg.version_dir(NAME, 2)).unwrap();

        assert_eq!(reg.versions(NAME).unwrap().len(), 1);
        assert_eq!(reg.load(NAME, &ModelSelector::Latest).unwrap().version.version, 1);
    }

    #[test]
    fn test_registration_continues_after_interrupted_version() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        let p   = pipeline();
        reg.register_model(NAME, &p, None).unwrap();

        // model.json written, version.json never was
        let orphan = reg.version_dir(NAME, 2);
        fs::create_dir_all(&orphan).unwrap();
        fs::write(orphan.join(MODEL_FILE), b"{}").unwrap();

        let next = reg.register_model(NAME, &p, None).unwrap();
        assert_eq!(next.version, 3);

        let numbers: Vec<u32> = reg.versions(NAME).unwrap().iter().map(|v| v.version).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(reg.load(NAME, &ModelSelector::Latest).unwrap().version.version, 3);
    }

    #[test]
    fn test_http_tracking_uri_is_unsupported() {
        assert!(matches!(
            LocalRegistry::open("http://localhost:5000"),
            Err(ModelUnavailableError::UnsupportedTrackingUri(_))
        ));
    }
}
