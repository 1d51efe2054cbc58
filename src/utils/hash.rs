use sha2::{Digest, Sha256};

use crate::compute::Matrix;

/// SHA-256 over the row-major cells serialized as big-endian i64.
pub fn matrix_checksum(m: &Matrix) -> String {
    let mut hasher = Sha256::new();
    for v in m.as_slice() {
        hasher.update(v.to_be_bytes());
    }
    format!("{:x}", hasher.finalize())
}
