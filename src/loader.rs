use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::classifier::{Classifier, ModelArtifact};
use crate::errors::{AppError, ArtifactSearch};

/// Turns the bytes of an artifact file into a classifier.
///
/// Implemented for closures so callers can plug in other serialization formats.
pub trait ArtifactDecoder: Send + Sync {
    fn decode(&self, path: &Path, bytes: &[u8]) -> anyhow::Result<Arc<dyn Classifier>>;
}

impl<F> ArtifactDecoder for F
where
    F: Fn(&Path, &[u8]) -> anyhow::Result<Arc<dyn Classifier>> + Send + Sync,
{
    fn decode(&self, path: &Path, bytes: &[u8]) -> anyhow::Result<Arc<dyn Classifier>> {
        self(path, bytes)
    }
}

/// Decodes the JSON [`ModelArtifact`] format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonArtifactDecoder;

impl ArtifactDecoder for JsonArtifactDecoder {
    fn decode(&self, _path: &Path, bytes: &[u8]) -> anyhow::Result<Arc<dyn Classifier>> {
        Ok(Arc::new(ModelArtifact::from_json(bytes)?))
    }
}

/// A classifier together with where it came from.
#[derive(Clone)]
pub struct LoadedArtifact {
    pub classifier: Arc<dyn Classifier>,
    pub path: PathBuf,
    /// Hex SHA-256 of the artifact file.
    pub fingerprint: String,
}

impl std::fmt::Debug for LoadedArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedArtifact")
            .field("kind", &self.classifier.kind())
            .field("path", &self.path)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Loads the JSON artifact from the first usable candidate path.
pub fn load(candidates: &[PathBuf]) -> Result<LoadedArtifact, AppError> {
    load_with(candidates, &JsonArtifactDecoder)
}

/// Resolves a classifier from an ordered list of candidate paths.
///
/// Paths that do not exist are skipped. A path that exists but cannot be read
/// or decoded is recorded and the search moves on, since an intact copy may
/// exist further down the list. The first successful decode wins and no later
/// path is touched.
pub fn load_with<D: ArtifactDecoder + ?Sized>(
    candidates: &[PathBuf],
    decoder: &D,
) -> Result<LoadedArtifact, AppError> {
    let mut search = ArtifactSearch::default();

    for path in candidates {
        search.searched.push(path.clone());

        if !path.exists() {
            tracing::debug!("Model artifact not present at {}", path.display());
            continue;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to read model artifact {}: {}", path.display(), e);
                search.corrupt.push((path.clone(), e.to_string()));
                continue;
            }
        };

        match decoder.decode(path, &bytes) {
            Ok(classifier) => {
                let fingerprint = fingerprint(&bytes);
                tracing::info!(
                    "✓ Model loaded from {} ({}, sha256 {})",
                    path.display(),
                    classifier.kind(),
                    &fingerprint[..12]
                );
                return Ok(LoadedArtifact {
                    classifier,
                    path: path.clone(),
                    fingerprint,
                });
            }
            Err(e) => {
                tracing::warn!("Failed to decode model artifact {}: {:#}", path.display(), e);
                search.corrupt.push((path.clone(), format!("{:#}", e)));
            }
        }
    }

    tracing::error!("No usable model artifact: {}", search);
    Err(AppError::ArtifactNotFound(search))
}

/// Load-once, many-readers holder for the serving classifier.
///
/// Concurrent first callers wait on a single load instead of each
/// deserializing the artifact. A failed load is not cached, so a later call
/// retries the search.
pub struct ClassifierCell<D = JsonArtifactDecoder> {
    candidates: Vec<PathBuf>,
    decoder: D,
    cell: OnceCell<LoadedArtifact>,
}

impl ClassifierCell<JsonArtifactDecoder> {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self::with_decoder(candidates, JsonArtifactDecoder)
    }

    /// A cell that already holds a classifier, for callers that load it themselves.
    pub fn preloaded(artifact: LoadedArtifact) -> Self {
        Self {
            candidates: vec![artifact.path.clone()],
            decoder: JsonArtifactDecoder,
            cell: OnceCell::new_with(Some(artifact)),
        }
    }
}

impl<D: ArtifactDecoder> ClassifierCell<D> {
    pub fn with_decoder(candidates: Vec<PathBuf>, decoder: D) -> Self {
        Self {
            candidates,
            decoder,
            cell: OnceCell::new(),
        }
    }

    /// Returns the classifier, loading it on first use.
    pub async fn get(&self) -> Result<&LoadedArtifact, AppError> {
        self.cell
            .get_or_try_init(|| async { load_with(&self.candidates, &self.decoder) })
            .await
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}
