use ethers::types::H256;
use ethers::utils::keccak256;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{CreatorError, Result};

/// Extension of compiled AVM program files.
pub const PROGRAM_EXTENSION: &str = "ao";

/// Produces the `vmHash` for a program. Deployments whose loader expects the AVM machine hash
/// need a hasher implementing that algorithm; `Keccak256Hasher` does not.
pub trait ContractHasher {
    fn machine_hash(&self, code: &[u8]) -> Result<H256>;
}

/// Plain keccak256 over the program bytes, not the AVM machine hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct Keccak256Hasher;

impl ContractHasher for Keccak256Hasher {
    fn machine_hash(&self, code: &[u8]) -> Result<H256> {
        if code.is_empty() {
            return Err(CreatorError::Hash("Program file is empty".to_string()));
        }
        Ok(H256::from(keccak256(code)))
    }
}

/// Hashes the first of the uploaded program files and formats it as a `vmHash`.
pub fn contract_hash_from_files<H: ContractHasher>(paths: &[PathBuf], hasher: &H) -> Result<String> {
    let path = paths
        .first()
        .ok_or_else(|| CreatorError::Hash("No files".to_string()))?;

    check_extension(path)?;

    let code = std::fs::read(path)
        .map_err(|e| CreatorError::Hash(format!("Failed to read {}: {}", path.display(), e)))?;
    let hash = hasher.machine_hash(&code)?;

    info!(file = %path.display(), bytes = code.len(), hash = ?hash, "hashed program file");
    Ok(format!("{:#x}", hash))
}

fn check_extension(path: &Path) -> Result<()> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(PROGRAM_EXTENSION) => Ok(()),
        _ => Err(CreatorError::Hash(format!(
            "{} is not a .{} program file",
            path.display(),
            PROGRAM_EXTENSION
        ))),
    }
}
