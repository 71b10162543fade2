//! Integration tests for the ledger identifier types
//!
//! Tests cover creation, prefixed parsing, conversion, and serialization.

use core_kernel::{
    AccountId, AccountingPeriodId, JournalEntryId, JournalLineId,
    PostingBatchId, LedgerRowId,
};
use uuid::Uuid;

mod prefixes {
    use super::*;

    #[test]
    fn test_each_identifier_has_distinct_prefix() {
        let prefixes = [
            AccountId::prefix(),
            AccountingPeriodId::prefix(),
            JournalEntryId::prefix(),
            JournalLineId::prefix(),
            PostingBatchId::prefix(),
            LedgerRowId::prefix(),
        ];
        let mut unique = prefixes.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), prefixes.len());
    }

    #[test]
    fn test_display_format() {
        assert!(AccountId::new().to_string().starts_with("ACC-"));
        assert!(AccountingPeriodId::new().to_string().starts_with("PER-"));
        assert!(LedgerRowId::new().to_string().starts_with("GLR-"));
    }
}

mod parsing {
    use super::*;

    #[test]
    fn test_from_str_with_prefix() {
        let original = PostingBatchId::new();
        let parsed: PostingBatchId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_from_str_without_prefix() {
        let uuid = Uuid::new_v4();
        let parsed: JournalEntryId = uuid.to_string().parse().unwrap();
        assert_eq!(*parsed.as_uuid(), uuid);
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("ACC-not-a-uuid".parse::<AccountId>().is_err());
    }
}

mod conversion {
    use super::*;

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = JournalEntryId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = JournalEntryId::new_v7();
        let uuid1: Uuid = id1.into();
        let uuid2: Uuid = id2.into();
        assert!(uuid1 < uuid2);
    }

    #[test]
    fn test_json_serialization_is_transparent() {
        let uuid = Uuid::new_v4();
        let id = AccountId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
