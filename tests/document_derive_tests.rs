/// Document derive tests
///
/// Run with: cargo test --test document_derive_tests
use docsession::{CollectionProvider, Document, Filter, FindOptions, MemoryStore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
#[document(collection = "sku_catalog")]
struct Sku {
    #[serde(rename = "_id")]
    #[document(key, field = "_id")]
    code: String,
    price_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
struct AuditRecord {
    #[document(key)]
    seq: i64,
    payload: Vec<u8>,
}

#[test]
fn test_attributes_drive_constants() {
    assert_eq!(Sku::COLLECTION, "sku_catalog");
    assert_eq!(Sku::KEY_FIELD, "_id");
    assert_eq!(AuditRecord::COLLECTION, "audit_record");
    assert_eq!(AuditRecord::KEY_FIELD, "seq");
}

#[test]
fn test_key_reads_the_marked_field() {
    let sku = Sku {
        code: "A-100".into(),
        price_cents: 999,
    };
    assert_eq!(sku.key(), "A-100");

    let record = AuditRecord {
        seq: 12,
        payload: vec![1u8, 2, 3],
    };
    assert_eq!(record.key(), 12);
}

#[tokio::test]
async fn test_renamed_key_is_enforced_by_store() {
    let store = MemoryStore::new();
    let skus = CollectionProvider::new(store.collection::<Sku>());
    let sku = Sku {
        code: "B-200".into(),
        price_cents: 1500,
    };

    skus.insert(sku.clone(), None).await.unwrap();
    assert!(skus.insert(sku.clone(), None).await.is_err());

    let found = skus
        .find(&[Filter::key::<Sku>(&sku.code)], FindOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(found, vec![sku]);
}
