//! 인메모리 저장소 구현.
//!
//! 외부 데이터베이스 없이 [`SeriesStore`] 계약을 그대로 구현합니다.
//! 파이프라인 테스트와 로컬 실행에서 실제 저장소를 대신합니다.
//! 컬렉션별 유일 인덱스를 선언하면 중복 키 의미론까지 재현됩니다.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{DataError, Result};
use crate::store::{doc_timestamp, Document, SeriesFilter, SeriesStore, SortOrder};

#[derive(Default)]
struct Collection {
    docs: Vec<Document>,
    /// 유일 인덱스를 구성하는 필드 이름들. 비어 있으면 인덱스 없음.
    index_fields: Vec<String>,
    /// 인덱스 필드 값 튜플의 집합
    index_keys: HashSet<String>,
}

impl Collection {
    /// 문서의 인덱스 키를 만듭니다. 인덱스가 없으면 `None`.
    fn index_key(&self, doc: &Document) -> Option<String> {
        if self.index_fields.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .index_fields
            .iter()
            .map(|field| match doc.get(field) {
                Some(Value::String(s)) => s.clone(),
                Some(v) => v.to_string(),
                None => String::new(),
            })
            .collect();
        Some(parts.join("\u{1f}"))
    }

    fn insert(&mut self, doc: Document) -> Result<()> {
        if let Some(key) = self.index_key(&doc) {
            if !self.index_keys.insert(key.clone()) {
                return Err(DataError::DuplicateKey(key));
            }
        }
        self.docs.push(doc);
        Ok(())
    }
}

/// 인메모리 [`SeriesStore`].
///
/// 핸들은 값 복제가 가능하며 모든 복제본이 같은 상태를 공유합니다.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 컬렉션에 유일 인덱스를 선언합니다.
    ///
    /// 이미 문서가 있는 컬렉션에는 소급 적용하지 않으므로 쓰기 전에
    /// 선언해야 합니다.
    pub async fn with_unique_index(self, collection: &str, fields: &[&str]) -> Self {
        {
            let mut collections = self.collections.write().await;
            let coll = collections.entry(collection.to_string()).or_default();
            coll.index_fields = fields.iter().map(|f| f.to_string()).collect();
        }
        self
    }

    /// 컬렉션의 문서 수를 반환합니다.
    pub async fn count(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map_or(0, |c| c.docs.len())
    }
}

#[async_trait]
impl SeriesStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: &SeriesFilter,
        sort: SortOrder,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<Document> = coll
            .docs
            .iter()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect();

        // 시간 필드가 없는 문서는 맨 앞에 둔다. 정렬은 안정적이므로
        // 같은 시각의 행은 저장 순서를 유지한다.
        matched.sort_by_key(|doc| doc_timestamp(doc));
        if sort == SortOrder::Descending {
            matched.reverse();
        }

        if let Some(limit) = limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn insert_one(&self, collection: &str, doc: Document) -> Result<()> {
        let mut collections = self.collections.write().await;
        let coll = collections.entry(collection.to_string()).or_default();
        coll.insert(doc)
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<usize> {
        let mut collections = self.collections.write().await;
        let coll = collections.entry(collection.to_string()).or_default();

        // 비순서 배치: 실패한 행을 건너뛰고 나머지는 모두 적용한다.
        let mut inserted = 0usize;
        let mut details = Vec::new();
        for doc in docs {
            match coll.insert(doc) {
                Ok(()) => inserted += 1,
                Err(err) => details.push(err.to_string()),
            }
        }

        if details.is_empty() {
            Ok(inserted)
        } else {
            debug!(collection, inserted, failed = details.len(), "partial bulk insert");
            Err(DataError::BulkWrite { inserted, details })
        }
    }

    async fn delete_many(&self, collection: &str, filter: &SeriesFilter) -> Result<u64> {
        let mut collections = self.collections.write().await;
        let Some(coll) = collections.get(collection) else {
            return Ok(0);
        };

        let remaining: Vec<Document> = coll
            .docs
            .iter()
            .filter(|doc| !filter.matches(doc))
            .cloned()
            .collect();
        let deleted = (coll.docs.len() - remaining.len()) as u64;

        let index_fields = coll.index_fields.clone();
        let mut rebuilt = Collection {
            docs: Vec::with_capacity(remaining.len()),
            index_fields,
            index_keys: HashSet::new(),
        };
        for doc in remaining {
            if let Some(key) = rebuilt.index_key(&doc) {
                rebuilt.index_keys.insert(key);
            }
            rebuilt.docs.push(doc);
        }
        collections.insert(collection.to_string(), rebuilt);

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::set_doc_timestamp;
    use chrono::{TimeZone, Utc};

    fn doc(strat: &str, day: u32) -> Document {
        let mut doc = Document::new();
        doc.insert("strat".to_string(), Value::String(strat.to_string()));
        set_doc_timestamp(&mut doc, Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap());
        doc
    }

    #[tokio::test]
    async fn test_find_sorted_ascending_and_descending() {
        let store = MemoryStore::new();
        store.insert_one("nav", doc("ma_bo", 3)).await.unwrap();
        store.insert_one("nav", doc("ma_bo", 1)).await.unwrap();
        store.insert_one("nav", doc("ma_bo", 2)).await.unwrap();

        let asc = store
            .find("nav", &SeriesFilter::all(), SortOrder::Ascending, None)
            .await
            .unwrap();
        let days: Vec<u32> = asc
            .iter()
            .map(|d| doc_timestamp(d).unwrap().format("%d").to_string().parse().unwrap())
            .collect();
        assert_eq!(days, vec![1, 2, 3]);

        let desc = store
            .find("nav", &SeriesFilter::all(), SortOrder::Descending, Some(1))
            .await
            .unwrap();
        assert_eq!(desc.len(), 1);
        assert_eq!(
            doc_timestamp(&desc[0]),
            Some(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicate() {
        let store = MemoryStore::new()
            .with_unique_index("nav", &["strat", "dateTime"])
            .await;

        store.insert_one("nav", doc("ma_bo", 1)).await.unwrap();
        let err = store.insert_one("nav", doc("ma_bo", 1)).await.unwrap_err();
        assert!(matches!(err, DataError::DuplicateKey(_)));

        // 다른 키는 통과
        store.insert_one("nav", doc("ma_bo", 2)).await.unwrap();
        store.insert_one("nax_trend_nav", doc("nax_trend", 1)).await.unwrap();
        assert_eq!(store.count("nav").await, 2);
    }

    #[tokio::test]
    async fn test_bulk_insert_partial_failure_keeps_applied_rows() {
        let store = MemoryStore::new()
            .with_unique_index("nav", &["strat", "dateTime"])
            .await;
        store.insert_one("nav", doc("ma_bo", 2)).await.unwrap();

        let batch = vec![doc("ma_bo", 1), doc("ma_bo", 2), doc("ma_bo", 3)];
        let err = store.insert_many("nav", batch).await.unwrap_err();
        match err {
            DataError::BulkWrite { inserted, details } => {
                assert_eq!(inserted, 2);
                assert_eq!(details.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }

        // 실패 행을 제외한 나머지는 적용되어 있어야 한다
        assert_eq!(store.count("nav").await, 3);
    }

    #[tokio::test]
    async fn test_delete_many_by_filter() {
        let store = MemoryStore::new();
        store.insert_one("nav", doc("ma_bo", 1)).await.unwrap();
        store.insert_one("nav", doc("ma_bo", 2)).await.unwrap();
        store.insert_one("nav", doc("nax_trend", 1)).await.unwrap();

        let deleted = store
            .delete_many("nav", &SeriesFilter::key("strat", "ma_bo"))
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count("nav").await, 1);
    }
}
