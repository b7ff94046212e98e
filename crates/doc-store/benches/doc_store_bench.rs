use criterion::{Criterion, criterion_group, criterion_main};
use doc_store::{
    Document, DocumentId, DocumentQuery, DocumentStore, DocumentStoreExt, InMemoryDocumentStore,
    UniqueIndex, Version,
};
use serde_json::json;

const CARTS_BY_USER: UniqueIndex = UniqueIndex::new("carts", &["userId"]);

fn make_cart(user: usize) -> Document {
    Document::new(
        "carts",
        DocumentId::new(),
        json!({"userId": format!("user-{user}"), "items": []}),
    )
}

fn bench_insert_with_unique_index(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("doc_store/insert_with_unique_index", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryDocumentStore::new();
                store.ensure_unique_index(CARTS_BY_USER).await.unwrap();
                for user in 0..10 {
                    store.insert(make_cart(user)).await.unwrap();
                }
            });
        });
    });
}

fn bench_versioned_update(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryDocumentStore::new();
    let mut doc = rt.block_on(store.insert(make_cart(0))).unwrap();

    c.bench_function("doc_store/versioned_update", |b| {
        b.iter(|| {
            rt.block_on(async {
                let expected: Version = doc.version;
                doc = store.update(doc.clone(), expected).await.unwrap();
            });
        });
    });
}

fn bench_find_by_field(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryDocumentStore::new();
    rt.block_on(async {
        for user in 0..1_000 {
            store.insert(make_cart(user)).await.unwrap();
        }
    });

    c.bench_function("doc_store/find_by_field_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .find(DocumentQuery::collection("carts").filter("userId", "user-500"))
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_insert_with_unique_index,
    bench_versioned_update,
    bench_find_by_field
);
criterion_main!(benches);
