//! Content fingerprint over a ruleset and a document set.

use crate::types::Fingerprint;
use sha2::{Digest, Sha256};
use specgate_core::{DocumentSet, Error, Result};
use std::path::Path;

async fn read_input(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| Error::TaskFailed {
        task: "checksum".into(),
        message: format!("cannot read {}: {}", path.display(), e),
    })
}

/// Feed `bytes` prefixed with their length, so content cannot shift
/// between neighbouring inputs without changing the hash.
fn update_framed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Hash the ruleset bytes followed by every document's name and bytes, in
/// document set order.
///
/// Paths are not hashed, so byte-identical inputs at different paths or
/// with different timestamps produce the same fingerprint.
pub async fn compute_fingerprint(ruleset: &Path, documents: &DocumentSet) -> Result<Fingerprint> {
    let mut hasher = Sha256::new();
    update_framed(&mut hasher, &read_input(ruleset).await?);

    for (name, path) in documents.iter() {
        update_framed(&mut hasher, name.as_bytes());
        update_framed(&mut hasher, &read_input(path).await?);
    }

    Ok(Fingerprint(hex::encode(hasher.finalize())))
}
