//! Voice registry: discovers GPT/SoVITS weight pairs on disk and switches the
//! synthesis server between them.
//!
//! # Discovery
//!
//! For the configured [`ModelVersion`], every `*.ckpt` in the GPT weights
//! directory is a candidate, visited in file-name order. The voice name is the
//! file stem up to its last `-` (`alice-e10.ckpt` -> `alice`). A candidate is
//! kept when a `{name}*.pth` exists in the SoVITS directory (the last match in
//! name order wins) and a `.wav` exists anywhere under
//! `ref_audio_root/{name}` (the first in walk order wins). Later candidates
//! with the same name replace earlier ones in place.
//!
//! # Switching
//!
//! A switch loads the GPT weights, then the SoVITS weights. The active-voice
//! write lock is held across both calls, so synthesis never runs against a
//! half-switched server. A failed phase leaves the previous voice active; a
//! GPT load that already succeeded is not rolled back.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{RwLock as AsyncRwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use danmu_core::{
    ActiveVoice, AppEvent, AppEventEmitter, ModelVersion, SovitsSettings, VoicePair, WeightKind,
};

use crate::api::SovitsApi;
use crate::error::{SwitchError, VoiceScanError};

/// Where weights and reference clips live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightsLayout {
    /// GPT-SoVITS install root holding the versioned weight directories.
    pub gpt_sovits_root: PathBuf,
    /// Root of the per-voice reference clip folders.
    pub ref_audio_root: PathBuf,
}

impl WeightsLayout {
    pub fn new(gpt_sovits_root: impl Into<PathBuf>, ref_audio_root: impl Into<PathBuf>) -> Self {
        Self {
            gpt_sovits_root: gpt_sovits_root.into(),
            ref_audio_root: ref_audio_root.into(),
        }
    }

    pub fn from_settings(settings: &SovitsSettings) -> Self {
        Self::new(&settings.gpt_sovits_root, &settings.ref_audio_root)
    }

    /// Directory holding `kind` weights for `version`.
    pub fn weights_dir(&self, version: ModelVersion, kind: WeightKind) -> PathBuf {
        self.gpt_sovits_root.join(version.weights_dir(kind))
    }

    pub fn reference_dir(&self, name: &str) -> PathBuf {
        self.ref_audio_root.join(name)
    }
}

/// Result of a successful scan.
#[derive(Debug)]
pub struct ScanSummary {
    /// Discovered voice names in discovery order.
    pub voices: Vec<String>,
    /// Outcome of activating the first discovered voice.
    pub activation: Result<ActiveVoice, SwitchError>,
}

/// Discovered voices plus the one currently active on the server.
pub struct VoiceRegistry {
    layout: WeightsLayout,
    api: Arc<dyn SovitsApi>,
    emitter: Arc<dyn AppEventEmitter>,
    version: RwLock<ModelVersion>,
    voices: RwLock<Vec<VoicePair>>,
    active: AsyncRwLock<Option<ActiveVoice>>,
}

impl VoiceRegistry {
    pub fn new(
        layout: WeightsLayout,
        version: ModelVersion,
        api: Arc<dyn SovitsApi>,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        Self {
            layout,
            api,
            emitter,
            version: RwLock::new(version),
            voices: RwLock::new(Vec::new()),
            active: AsyncRwLock::new(None),
        }
    }

    pub fn layout(&self) -> &WeightsLayout {
        &self.layout
    }

    pub fn version(&self) -> ModelVersion {
        *self.version.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the architecture version used by the next [`scan`](Self::scan).
    pub fn set_version(&self, version: ModelVersion) {
        *self.version.write().unwrap_or_else(PoisonError::into_inner) = version;
    }

    /// Discovered voices in discovery order.
    pub fn voices(&self) -> Vec<VoicePair> {
        self.voices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.voices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|v| v.name.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<VoicePair> {
        self.voices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|v| v.name == name)
            .cloned()
    }

    pub async fn active(&self) -> Option<ActiveVoice> {
        self.active.read().await.clone()
    }

    /// Read access to the active voice.
    ///
    /// Switches wait until the guard is dropped, so holding it across a
    /// synthesis call pins the voice for that call.
    pub async fn read_active(&self) -> RwLockReadGuard<'_, Option<ActiveVoice>> {
        self.active.read().await
    }

    /// Rebuild the registry from disk and activate the first voice found.
    ///
    /// The registry is emptied first, so a failed scan leaves it empty.
    /// Activation failure is reported in [`ScanSummary::activation`], not as
    /// an error.
    pub async fn scan(&self) -> Result<ScanSummary, VoiceScanError> {
        self.voices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let version = self.version();
        let gpt_dir = self.layout.weights_dir(version, WeightKind::Gpt);
        let sovits_dir = self.layout.weights_dir(version, WeightKind::Sovits);
        info!(%version, gpt_dir = %gpt_dir.display(), sovits_dir = %sovits_dir.display(), "Scanning voices");

        let gpt_files = list_files(&gpt_dir, WeightKind::Gpt.extension()).await;
        let sovits_files = list_files(&sovits_dir, WeightKind::Sovits.extension()).await;

        let mut found: Vec<VoicePair> = Vec::new();
        for gpt in gpt_files {
            match self.resolve_candidate(gpt.clone(), &sovits_files).await {
                Ok(pair) => {
                    debug!(name = %pair.name, gpt = %pair.gpt_weight_path.display(), "Found voice");
                    match found.iter_mut().find(|p| p.name == pair.name) {
                        Some(existing) => *existing = pair,
                        None => found.push(pair),
                    }
                }
                Err(e) => warn!(file = %gpt.display(), error = %e, "Skipping GPT weights"),
            }
        }

        if found.is_empty() {
            warn!(gpt_dir = %gpt_dir.display(), "No voices found");
            return Err(VoiceScanError::NoVoices { gpt_dir });
        }

        let names: Vec<String> = found.iter().map(|p| p.name.clone()).collect();
        let first = names[0].clone();
        *self.voices.write().unwrap_or_else(PoisonError::into_inner) = found;

        info!(count = names.len(), voices = ?names, "Voice scan complete");
        self.emitter.emit(AppEvent::VoicesScanned {
            names: names.clone(),
        });

        let activation = self.switch_weights(&first).await;
        if let Err(e) = &activation {
            warn!(name = %first, error = %e, "Failed to activate first voice");
        }

        Ok(ScanSummary {
            voices: names,
            activation,
        })
    }

    /// Load `name`'s GPT then SoVITS weights on the server and make it active.
    ///
    /// Stops at the first failed phase; the previous voice stays active.
    pub async fn switch_weights(&self, name: &str) -> Result<ActiveVoice, SwitchError> {
        let Some(pair) = self.get(name) else {
            let err = SwitchError::UnknownVoice(name.to_string());
            self.emit_switch_failed(name, &err);
            return Err(err);
        };

        let mut active = self.active.write().await;

        for kind in [WeightKind::Gpt, WeightKind::Sovits] {
            let path = pair.weight_path(kind);
            info!(name, %kind, path = %path.display(), "Loading weights");
            if let Err(e) = self.api.set_weights(kind, path).await {
                warn!(name, %kind, error = %e, "Weight switch failed");
                self.emit_switch_failed(name, &e);
                return Err(e);
            }
        }

        let voice = ActiveVoice::from_pair(&pair, self.version());
        *active = Some(voice.clone());
        drop(active);

        info!(name, version = %voice.version, "Voice activated");
        self.emitter.emit(AppEvent::VoiceActivated {
            name: voice.name.clone(),
            version: voice.version,
        });
        Ok(voice)
    }

    fn emit_switch_failed(&self, name: &str, error: &SwitchError) {
        self.emitter.emit(AppEvent::VoiceSwitchFailed {
            name: name.to_string(),
            error: error.to_string(),
        });
    }

    async fn resolve_candidate(
        &self,
        gpt_weight_path: PathBuf,
        sovits_files: &[PathBuf],
    ) -> Result<VoicePair, VoiceScanError> {
        let name = gpt_weight_path
            .file_stem()
            .map(|stem| stem.to_string_lossy())
            .as_deref()
            .and_then(voice_name)
            .map(str::to_string)
            .ok_or_else(|| VoiceScanError::InvalidWeightName(file_name(&gpt_weight_path)))?;

        let sovits_weight_path = sovits_files
            .iter()
            .rfind(|p| file_name(p).starts_with(&name))
            .cloned()
            .ok_or_else(|| VoiceScanError::MissingSovits { name: name.clone() })?;

        let reference_dir = self.layout.reference_dir(&name);
        let reference_audio_path = find_reference_audio(&reference_dir).await.ok_or_else(|| {
            VoiceScanError::MissingReferenceAudio {
                name: name.clone(),
                dir: reference_dir,
            }
        })?;

        Ok(VoicePair {
            name,
            gpt_weight_path,
            sovits_weight_path,
            reference_audio_path,
        })
    }
}

/// Voice name for a GPT weight file stem: everything before the last `-`.
pub fn voice_name(stem: &str) -> Option<&str> {
    stem.rfind('-')
        .map(|idx| &stem[..idx])
        .filter(|name| !name.is_empty())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Files and subdirectories of `dir`, each sorted by path.
async fn read_dir_sorted(dir: &Path) -> std::io::Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => dirs.push(path),
            Ok(meta) if meta.is_file() => files.push(path),
            _ => {}
        }
    }
    files.sort();
    dirs.sort();
    Ok((files, dirs))
}

/// Files in `dir` with `extension`, sorted. A missing directory is empty.
async fn list_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    match read_dir_sorted(dir).await {
        Ok((files, _)) => files
            .into_iter()
            .filter(|p| has_extension(p, extension))
            .collect(),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot read weights directory");
            Vec::new()
        }
    }
}

/// First `.wav` under `dir`, walking depth-first with files before
/// subdirectories, both in name order.
async fn find_reference_audio(dir: &Path) -> Option<PathBuf> {
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let Ok((files, dirs)) = read_dir_sorted(&current).await else {
            continue;
        };
        if let Some(wav) = files.into_iter().find(|p| has_extension(p, "wav")) {
            return Some(wav);
        }
        pending.extend(dirs.into_iter().rev());
    }
    None
}
