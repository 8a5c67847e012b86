//! Stable fingerprint of a field set, used to index open groups.

use crate::types::{Fields, Fingerprint};

/// Compute a stable fingerprint from a field set.
///
/// Key components: every `key=value` pair in sorted key order. Level is left
/// out on purpose: an ERROR event may still merge into a CRITICAL group, so
/// the index must bucket by fields alone.
pub fn of_fields(fields: &Fields) -> Fingerprint {
  let mut hasher = blake3::Hasher::new();
  for (i, (key, value)) in fields.iter().enumerate() {
    if i > 0 {
      hasher.update(b"|");
    }
    hasher.update(key.as_bytes());
    hasher.update(b"=");
    hasher.update(value.as_bytes());
  }

  // First 16 bytes (32 hex chars) are plenty; equality is re-checked on lookup.
  let hex = hasher.finalize().to_hex();
  Fingerprint(hex[..32].to_string())
}
