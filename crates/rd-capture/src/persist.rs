//! Writing a capture to the artifact store.

use rd_store::{ArtifactStore, CaptureMetadata, Stage, sha256_hex, to_hex};
use tracing::{info, warn};

use crate::context::{Capture, CaptureContext, CaptureError};

/// Which captured values must be present for a capture to be usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturePolicy {
    pub required: Vec<Stage>,
    pub require_parts: bool,
}

impl Default for CapturePolicy {
    /// Compression is optional: its absence means the producer skipped it.
    fn default() -> Self {
        Self {
            required: vec![Stage::Original, Stage::WithRandomPrefix, Stage::Encrypted],
            require_parts: true,
        }
    }
}

impl CapturePolicy {
    pub fn check(&self, capture: &Capture) -> Result<(), CaptureError> {
        for &stage in &self.required {
            capture.require(stage)?;
        }
        if self.require_parts && capture.parts.is_empty() {
            return Err(CaptureError::InstrumentationGap {
                stage: Stage::SegmentedParts,
            });
        }
        Ok(())
    }
}

impl Capture {
    /// Build the metadata record for this capture.
    pub fn metadata(&self) -> Result<CaptureMetadata, CaptureError> {
        let original = self.require(Stage::Original)?;
        let original_sha256 = sha256_hex(original);
        let compressed = self.stage(Stage::Compressed);
        let encrypted = self.stage(Stage::Encrypted);
        let head = &original[..original.len().min(CaptureMetadata::HEAD_BYTES)];

        Ok(CaptureMetadata {
            test_id: self.session,
            timestamp: chrono::Utc::now().to_rfc3339(),
            original_size: original.len(),
            original_sha256: original_sha256.clone(),
            original_head: to_hex(head),
            compressed_size: compressed.map_or(original.len(), <[u8]>::len),
            compressed_sha256: compressed.map_or(original_sha256, sha256_hex),
            encrypted_size: encrypted.map(<[u8]>::len),
            encrypted_sha256: encrypted.map(sha256_hex),
            random_hash: self.facts.random_hash.as_deref().map(to_hex),
            resource_hash: self.facts.resource_hash.as_deref().map(to_hex),
            total_parts: self.parts.len(),
            sdu: self.facts.sdu,
            part_sizes: self.parts.iter().map(Vec::len).collect(),
            part_sha256: self.parts.iter().map(|p| sha256_hex(p)).collect(),
            is_compressed: self.facts.compressed,
            is_encrypted: self.facts.encrypted,
        })
    }

    /// Write every captured stage, the parts and the metadata record.
    ///
    /// The policy is checked before anything is written, so an
    /// instrumentation gap leaves the store untouched.
    pub fn persist(
        &self,
        store: &ArtifactStore,
        policy: &CapturePolicy,
    ) -> Result<CaptureMetadata, CaptureError> {
        policy.check(self)?;
        let metadata = self.metadata()?;

        for (&stage, data) in &self.stages {
            store.write_blob(stage, self.session, data)?;
        }
        if self.stage(Stage::Compressed).is_none() {
            info!(session = %self.session, "no compression applied");
        }
        store.write_parts(self.session, &self.parts)?;
        store.write_metadata(&metadata)?;

        info!(
            session = %self.session,
            root = %store.root().display(),
            "all intermediate stages saved"
        );
        Ok(metadata)
    }
}

impl CaptureContext {
    /// Take the pending capture and persist it.
    ///
    /// Failures are logged and swallowed: a broken capture must not take the
    /// producing process down with it.
    pub fn finish(&mut self, store: &ArtifactStore, policy: &CapturePolicy) -> Option<CaptureMetadata> {
        let result = self.take().and_then(|capture| capture.persist(store, policy));
        match result {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!(session = %self.session(), error = %e, "failed to save diagnostic stages");
                None
            }
        }
    }
}
