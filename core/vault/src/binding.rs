//! Associated-data strings binding ciphertexts to their records.
//!
//! The exact bytes are a compatibility contract: every sealed record in
//! every existing vault was authenticated against them.

/// Associated data for an entry payload: `schema=<n>|id=<id>|type=<type>`.
pub fn entry_aad(schema_version: u32, id: &str, entry_type: &str) -> String {
    format!("schema={}|id={}|type={}", schema_version, id, entry_type)
}

/// Associated data for the profile verifier: `schema=<n>|type=profile`.
pub fn profile_aad(schema_version: u32) -> String {
    format!("schema={}|type=profile", schema_version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use logwayss_common::EntryType;

    #[test]
    fn test_entry_aad_format() {
        assert_eq!(
            entry_aad(
                1,
                "0190c2a4-7f3e-7c1a-9d1e-3b5f4a6c7d8e",
                EntryType::MediaRef.as_str()
            ),
            "schema=1|id=0190c2a4-7f3e-7c1a-9d1e-3b5f4a6c7d8e|type=media_ref"
        );
    }

    #[test]
    fn test_profile_aad_format() {
        assert_eq!(profile_aad(1), "schema=1|type=profile");
    }
}
