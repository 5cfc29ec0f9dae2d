//! Storage Module Tests
//!
//! Covers the local key-value map (tombstone semantics, snapshots) and the
//! causal version chain (token validation, tag allocation, head resolution).

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::storage::chain::{bracketed, Extension, VersionChain};
    use crate::storage::store::{Entry, LocalStore};

    // ============================================================
    // LOCAL STORE
    // ============================================================

    #[test]
    fn test_put_and_get_entry() {
        let store = LocalStore::new();

        assert!(!store.put("x", "1", "V1"), "first write creates");
        let entry = store.get("x").unwrap();
        assert_eq!(entry.value.as_deref(), Some("1"));
        assert_eq!(entry.version, "V1");
        assert!(!entry.is_tombstone());

        assert!(store.put("x", "2", "V2"), "second write updates");
        assert_eq!(store.get("x").unwrap().value.as_deref(), Some("2"));
    }

    #[test]
    fn test_delete_leaves_tombstone() {
        let store = LocalStore::new();
        store.put("x", "1", "V1");

        assert!(store.delete("x", "V2"));
        let entry = store.get("x").unwrap();
        assert!(entry.is_tombstone());
        assert_eq!(entry.version, "V2");
    }

    #[test]
    fn test_count_includes_tombstones() {
        let store = LocalStore::new();
        store.put("x", "1", "V1");
        store.delete("x", "V2");
        store.delete("y", "V3");

        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_replace_swaps_whole_map() {
        let store = LocalStore::new();
        store.put("old", "1", "V1");

        let mut incoming = HashMap::new();
        incoming.insert(
            "new".to_string(),
            Entry {
                value: Some("2".to_string()),
                version: "V2".to_string(),
            },
        );
        store.replace(incoming);

        assert!(store.get("old").is_none());
        assert_eq!(store.get("new").unwrap().value.as_deref(), Some("2"));
        assert_eq!(store.count(), 1);
    }

    // ============================================================
    // VERSION CHAIN
    // ============================================================

    #[test]
    fn test_first_dependency_free_write_starts_chain() {
        let chain = VersionChain::new();

        let outcome = chain.validate_and_extend("");
        assert_eq!(
            outcome,
            Extension::Extended {
                token: "V1".to_string()
            }
        );
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.resolve("V0"), "V1");
    }

    #[test]
    fn test_dependency_free_write_on_nonempty_chain_skips_numbers() {
        let chain = VersionChain::new();
        chain.validate_and_extend("");

        // Starts a fresh segment past the current length instead of
        // extending the existing head.
        let outcome = chain.validate_and_extend("");
        assert_eq!(
            outcome,
            Extension::Extended {
                token: "V3".to_string()
            }
        );
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.resolve("V2"), "V3");
    }

    #[test]
    fn test_token_extends_recorded_head() {
        let chain = VersionChain::new();
        chain.validate_and_extend("");

        let outcome = chain.validate_and_extend("<V1>");
        assert_eq!(
            outcome,
            Extension::Extended {
                token: "V2".to_string()
            }
        );
        assert_eq!(chain.resolve("V1"), "V2");
    }

    #[test]
    fn test_stale_token_resolves_to_current_head() {
        let chain = VersionChain::new();
        chain.validate_and_extend("");
        chain.validate_and_extend("<V1>");

        // A client still holding <V1> builds on the head V1 has since
        // advanced to, not on V1 itself.
        let outcome = chain.validate_and_extend("<V1>");
        assert_eq!(
            outcome,
            Extension::Extended {
                token: "V3".to_string()
            }
        );
        assert_eq!(chain.resolve("V1"), "V3");
    }

    #[test]
    fn test_unrecognized_token_is_unknown() {
        let chain = VersionChain::new();
        chain.validate_and_extend("");

        assert_eq!(chain.validate_and_extend("<V99>"), Extension::Unknown);
        assert_eq!(chain.len(), 1, "rejected tokens leave the chain alone");
    }

    #[test]
    fn test_any_token_validates_on_empty_chain() {
        let chain = VersionChain::new();

        let outcome = chain.validate_and_extend("<T7>");
        assert_eq!(
            outcome,
            Extension::Extended {
                token: "V1".to_string()
            }
        );
        assert_eq!(chain.resolve("T7"), "V1");
    }

    #[test]
    fn test_accepted_write_adds_exactly_one_edge() {
        let chain = VersionChain::new();
        let mut token = String::new();

        for expected_len in 1..=5 {
            match chain.validate_and_extend(&token) {
                Extension::Extended { token: tag } => token = bracketed(&tag),
                Extension::Unknown => panic!("chained token must validate"),
            }
            assert_eq!(chain.len(), expected_len);
        }
    }

    #[test]
    fn test_is_known_head() {
        let chain = VersionChain::new();
        assert!(chain.is_known_head(""), "empty token on empty chain");
        assert!(!chain.is_known_head("V1"));

        chain.validate_and_extend("");
        assert!(chain.is_known_head("V1"));
        assert!(!chain.is_known_head(""), "dependency now required to match");
        assert!(!chain.is_known_head("V0"), "parents are not heads");
    }

    #[test]
    fn test_record_is_idempotent() {
        let chain = VersionChain::new();
        chain.record("V1", "V2");
        chain.record("V1", "V2");

        assert_eq!(chain.len(), 1);
        assert_eq!(chain.resolve("V1"), "V2");
    }

    #[test]
    fn test_replace_adopts_peer_history() {
        let chain = VersionChain::new();
        chain.validate_and_extend("");

        let mut peer = HashMap::new();
        peer.insert("V0".to_string(), "V1".to_string());
        peer.insert("V1".to_string(), "V2".to_string());
        chain.replace(peer);

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.resolve("V0"), "V2");
    }

    #[test]
    fn test_bracketed_wraps_tag() {
        assert_eq!(bracketed("V3"), "<V3>");
    }
}
