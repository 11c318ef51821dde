//! On-disk store for flushed generations
//!
//! Write discipline per generation:
//! 1. Write gen-{seq}.idx.tmp -> fsync
//! 2. Atomic rename to gen-{seq}.idx
//! 3. Write manifest.json.tmp -> fsync -> atomic rename to manifest.json
//!
//! A crash between steps leaves either the previous manifest (pointing at an
//! intact older generation) or the new one; never a manifest pointing at a
//! partial file.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::facets::TaxonomyState;
use super::writer::CommittedDocs;
use crate::models::LanguageCode;

const MANIFEST_FILE: &str = "manifest.json";
const TAXONOMY_DIR: &str = "taxonomy";
const LANG_DIR_PREFIX: &str = "lang-";

/// Per-directory manifest naming the latest durable generation
#[derive(Debug, Serialize, Deserialize)]
struct GenerationManifest {
    version: u32,
    latest_seq: u64,
    updated_at: u64,
}

impl GenerationManifest {
    const VERSION: u32 = 1;
}

/// Persistent store for index generations, one subdirectory per language
/// plus one for the shared taxonomy
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn open(root: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn lang_dir(&self, code: &LanguageCode) -> PathBuf {
        self.root.join(format!("{}{}", LANG_DIR_PREFIX, code))
    }

    fn taxonomy_dir(&self) -> PathBuf {
        self.root.join(TAXONOMY_DIR)
    }

    pub(crate) fn persist_language(
        &self,
        code: &LanguageCode,
        seq: u64,
        docs: &CommittedDocs,
    ) -> io::Result<()> {
        self.persist(&self.lang_dir(code), seq, docs)
    }

    pub(crate) fn load_language(
        &self,
        code: &LanguageCode,
    ) -> io::Result<Option<(u64, CommittedDocs)>> {
        self.load_latest(&self.lang_dir(code))
    }

    pub(crate) fn prune_language(&self, code: &LanguageCode, keep_seq: u64) -> io::Result<()> {
        self.prune(&self.lang_dir(code), keep_seq)
    }

    /// Remove a retired language's persisted state entirely
    pub(crate) fn remove_language(&self, code: &LanguageCode) -> io::Result<()> {
        let dir = self.lang_dir(code);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    pub(crate) fn persist_taxonomy(&self, seq: u64, state: &TaxonomyState) -> io::Result<()> {
        self.persist(&self.taxonomy_dir(), seq, state)
    }

    pub(crate) fn load_taxonomy(&self) -> io::Result<Option<(u64, TaxonomyState)>> {
        self.load_latest(&self.taxonomy_dir())
    }

    pub(crate) fn prune_taxonomy(&self, keep_seq: u64) -> io::Result<()> {
        self.prune(&self.taxonomy_dir(), keep_seq)
    }

    /// Languages with persisted state, discovered from directory names
    pub fn list_languages(&self) -> io::Result<Vec<LanguageCode>> {
        let mut codes = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(code) = name.strip_prefix(LANG_DIR_PREFIX) {
                if let Ok(code) = LanguageCode::new(code) {
                    codes.push(code);
                }
            }
        }
        codes.sort();
        Ok(codes)
    }

    fn persist<T: Serialize>(&self, dir: &Path, seq: u64, payload: &T) -> io::Result<()> {
        fs::create_dir_all(dir)?;

        let bytes = bincode::serialize(payload).map_err(invalid_data)?;
        let path = dir.join(format!("gen-{seq}.idx"));
        let tmp = dir.join(format!("gen-{seq}.idx.tmp"));
        write_atomic(&tmp, &path, &bytes)?;

        let manifest = GenerationManifest {
            version: GenerationManifest::VERSION,
            latest_seq: seq,
            updated_at: current_timestamp(),
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest).map_err(invalid_data)?;
        let manifest_tmp = dir.join(format!("{MANIFEST_FILE}.tmp"));
        write_atomic(&manifest_tmp, &dir.join(MANIFEST_FILE), &manifest_bytes)?;

        Ok(())
    }

    fn load_latest<T: DeserializeOwned>(&self, dir: &Path) -> io::Result<Option<(u64, T)>> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Ok(None);
        }

        let manifest: GenerationManifest =
            serde_json::from_slice(&fs::read(&manifest_path)?).map_err(invalid_data)?;
        if manifest.version > GenerationManifest::VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported manifest version {}", manifest.version),
            ));
        }

        let bytes = fs::read(dir.join(format!("gen-{}.idx", manifest.latest_seq)))?;
        let payload = bincode::deserialize(&bytes).map_err(invalid_data)?;
        Ok(Some((manifest.latest_seq, payload)))
    }

    /// Remove generation files older than `keep_seq`. Best effort; a leftover
    /// file is garbage, not corruption.
    fn prune(&self, dir: &Path, keep_seq: u64) -> io::Result<()> {
        if !dir.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(seq) = parse_generation_file(&name) {
                if seq < keep_seq {
                    let _ = fs::remove_file(entry.path());
                }
            }
        }
        Ok(())
    }
}

fn parse_generation_file(name: &str) -> Option<u64> {
    name.strip_prefix("gen-")?
        .strip_suffix(".idx")?
        .parse()
        .ok()
}

fn write_atomic(tmp: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    {
        let mut file = fs::File::create(tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(tmp, path)
}

fn invalid_data<E: Into<Box<dyn std::error::Error + Send + Sync>>>(err: E) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}

/// Get current Unix timestamp in seconds
fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
