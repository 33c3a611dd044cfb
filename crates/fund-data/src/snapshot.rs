//! 증분 스냅샷 쓰기 정책.
//!
//! 분석 결과 시리즈를 저장소에 반영하는 공통 정책입니다. 컬렉션과
//! 키 필드만 달리하여 모델 성과, 펀드 성과, 펀딩 등 모든 시리즈가
//! 같은 경로를 탑니다.
//!
//! 쓰기 실패는 파이프라인을 중단시키지 않습니다. 중복 키는 행 단위로
//! 건너뛰고, 배치 부분 실패는 상세와 함께 로깅한 뒤 적용된 행 수를
//! 반환합니다. 읽기 실패는 그대로 전파됩니다.

use chrono::{DateTime, Datelike, Utc};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::error::{DataError, Result};
use crate::store::{doc_timestamp, Document, SeriesFilter, SeriesStore, SortOrder};

/// 저장 모드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// 전체 저장: 행 단위 삽입, 중복 키는 건너뜀. 느리지만 누락 복구용.
    Full,
    /// 증분 저장: 마지막 저장 시각 이후의 행만 배치 삽입.
    #[default]
    Delta,
}

/// 문서 목록에서 가장 늦은 `dateTime`을 찾습니다.
pub fn latest_timestamp(docs: &[Document]) -> Option<DateTime<Utc>> {
    docs.iter().filter_map(doc_timestamp).max()
}

/// 단일 시리즈에 대한 스냅샷 쓰기 핸들.
///
/// (컬렉션, 키 필드, 키 값) 한 벌로 파라미터화되며 비교 필드는 항상
/// `dateTime`입니다.
pub struct SnapshotWriter<'a, S: SeriesStore + ?Sized> {
    store: &'a S,
    collection: String,
    key_field: String,
    key_value: String,
}

impl<'a, S: SeriesStore + ?Sized> SnapshotWriter<'a, S> {
    /// 쓰기 핸들을 생성합니다.
    pub fn new(
        store: &'a S,
        collection: impl Into<String>,
        key_field: impl Into<String>,
        key_value: impl Into<String>,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            key_field: key_field.into(),
            key_value: key_value.into(),
        }
    }

    fn key_filter(&self) -> SeriesFilter {
        SeriesFilter::key(self.key_field.clone(), self.key_value.clone())
    }

    /// 문서에 키 필드가 없으면 채워 넣습니다.
    fn stamp_key(&self, doc: &mut Document) {
        if !doc.contains_key(&self.key_field) {
            doc.insert(
                self.key_field.clone(),
                Value::String(self.key_value.clone()),
            );
        }
    }

    /// 모드에 따라 저장합니다. 삽입된 행 수를 반환합니다.
    pub async fn save(&self, docs: Vec<Document>, mode: SaveMode) -> Result<usize> {
        match mode {
            SaveMode::Full => self.full_save(docs).await,
            SaveMode::Delta => self.delta_save(docs).await,
        }
    }

    /// 전체 저장: 행 단위로 삽입하며 중복 키는 로깅 후 건너뜁니다.
    #[instrument(skip(self, docs), fields(collection = %self.collection, key = %self.key_value, count = docs.len()))]
    pub async fn full_save(&self, docs: Vec<Document>) -> Result<usize> {
        let mut inserted = 0usize;
        for mut doc in docs {
            self.stamp_key(&mut doc);
            match self.store.insert_one(&self.collection, doc).await {
                Ok(()) => inserted += 1,
                Err(DataError::DuplicateKey(key)) => {
                    error!(%key, "duplicate key, row skipped");
                }
                Err(err) => return Err(err),
            }
        }

        info!(inserted, "full save complete");
        Ok(inserted)
    }

    /// 증분 저장: 마지막 저장 시각(`T_last`) 이후의 행만 삽입합니다.
    ///
    /// 시리즈가 비어 있으면 모든 행을 삽입합니다. 삽입할 행이 없으면
    /// 저장소에 쓰지 않습니다. 배치 부분 실패는 상세를 로깅하고
    /// 적용된 행 수를 반환합니다.
    #[instrument(skip(self, docs), fields(collection = %self.collection, key = %self.key_value, count = docs.len()))]
    pub async fn delta_save(&self, docs: Vec<Document>) -> Result<usize> {
        let persisted = self
            .store
            .find(&self.collection, &self.key_filter(), SortOrder::Descending, Some(1))
            .await?;
        let last = latest_timestamp(&persisted);

        let mut fresh: Vec<Document> = docs
            .into_iter()
            .filter(|doc| match (last, doc_timestamp(doc)) {
                (Some(last), Some(ts)) => ts > last,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .collect();
        for doc in &mut fresh {
            self.stamp_key(doc);
        }

        if fresh.is_empty() {
            debug!(?last, "no rows newer than last persisted timestamp");
            return Ok(0);
        }

        match self.store.insert_many(&self.collection, fresh).await {
            Ok(inserted) => {
                info!(inserted, "delta save complete");
                Ok(inserted)
            }
            Err(DataError::BulkWrite { inserted, details }) => {
                error!(inserted, ?details, "partial bulk write during delta save");
                Ok(inserted)
            }
            Err(err) => Err(err),
        }
    }

    /// 시리즈 전체를 교체합니다: 키에 해당하는 행을 모두 지우고 다시
    /// 삽입합니다. 매 실행마다 시리즈를 처음부터 재구성하는 쓰기
    /// 경로에서 사용합니다.
    #[instrument(skip(self, docs), fields(collection = %self.collection, key = %self.key_value, count = docs.len()))]
    pub async fn replace_series(&self, mut docs: Vec<Document>) -> Result<usize> {
        self.store
            .delete_many(&self.collection, &self.key_filter())
            .await?;

        if let Some(last) = docs.last() {
            debug!(last = %serde_json::Value::Object(last.clone()), "last document to be recorded");
        }
        for doc in &mut docs {
            self.stamp_key(doc);
        }
        if docs.is_empty() {
            return Ok(0);
        }

        match self.store.insert_many(&self.collection, docs).await {
            Ok(inserted) => {
                info!(inserted, "series replaced");
                Ok(inserted)
            }
            Err(DataError::BulkWrite { inserted, details }) => {
                error!(inserted, ?details, "partial bulk write during replace");
                Ok(inserted)
            }
            Err(err) => Err(err),
        }
    }

    /// [start, end] 범위의 행을 삭제합니다 (양끝 포함).
    pub async fn delete_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64> {
        self.store
            .delete_many(&self.collection, &self.key_filter().between(start, end))
            .await
    }

    /// 시리즈의 마지막 저장 시각을 반환합니다.
    pub async fn last_persisted(&self) -> Result<Option<DateTime<Utc>>> {
        let persisted = self
            .store
            .find(&self.collection, &self.key_filter(), SortOrder::Descending, Some(1))
            .await?;
        Ok(latest_timestamp(&persisted))
    }
}

/// 일 단위 버킷 키.
type DayKey = (i32, u32, u32, Option<String>);

fn day_key(doc: &Document, group_by_instrument: bool) -> Option<DayKey> {
    let ts = doc_timestamp(doc)?;
    let instrument = if group_by_instrument {
        Some(doc.get("coin").and_then(Value::as_str)?.to_string())
    } else {
        None
    };
    Some((ts.year(), ts.month(), ts.day(), instrument))
}

/// 일중 행들을 일 단위로 축약합니다.
///
/// (연, 월, 일)[, 기기]별로 묶어 `dateTime`이 가장 늦은 행만 남기고,
/// 결과를 시각 오름차순으로 반환합니다. 같은 시각이면 나중에 저장된
/// 행이 이깁니다. `dateTime`이 없는 행은 버립니다.
pub fn collapse_end_of_day(docs: Vec<Document>, group_by_instrument: bool) -> Vec<Document> {
    let mut buckets: Vec<(DayKey, DateTime<Utc>, Document)> = Vec::new();

    for doc in docs {
        let Some(key) = day_key(&doc, group_by_instrument) else {
            continue;
        };
        // dateTime 존재는 day_key가 이미 보장한다
        let Some(ts) = doc_timestamp(&doc) else { continue };

        match buckets.iter_mut().find(|(k, _, _)| *k == key) {
            Some((_, best, slot)) if ts >= *best => {
                *best = ts;
                *slot = doc;
            }
            Some(_) => {}
            None => buckets.push((key, ts, doc)),
        }
    }

    buckets.sort_by_key(|(_, ts, _)| *ts);
    buckets.into_iter().map(|(_, _, doc)| doc).collect()
}

/// 필터와 일치하는 행을 읽어 일 단위로 축약합니다.
pub async fn eod_snapshot<S: SeriesStore + ?Sized>(
    store: &S,
    collection: &str,
    filter: &SeriesFilter,
    group_by_instrument: bool,
) -> Result<Vec<Document>> {
    let docs = store
        .find(collection, filter, SortOrder::Ascending, None)
        .await?;
    Ok(collapse_end_of_day(docs, group_by_instrument))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::set_doc_timestamp;
    use chrono::TimeZone;

    fn doc_at(strat: &str, day: u32, hour: u32, value: f64) -> Document {
        let mut doc = Document::new();
        doc.insert("strat".to_string(), Value::String(strat.to_string()));
        doc.insert("rets".to_string(), Value::from(value));
        set_doc_timestamp(
            &mut doc,
            Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap(),
        );
        doc
    }

    fn price_doc(coin: &str, day: u32, hour: u32, close: f64) -> Document {
        let mut doc = Document::new();
        doc.insert("coin".to_string(), Value::String(coin.to_string()));
        doc.insert("close".to_string(), Value::from(close));
        set_doc_timestamp(
            &mut doc,
            Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap(),
        );
        doc
    }

    #[tokio::test]
    async fn test_delta_save_only_inserts_after_last_timestamp() {
        let store = MemoryStore::new();
        let writer = SnapshotWriter::new(&store, "modelperf", "strat", "ma_bo");

        // 5일까지 저장된 상태
        writer
            .full_save(vec![doc_at("ma_bo", 4, 0, 0.01), doc_at("ma_bo", 5, 0, 0.02)])
            .await
            .unwrap();

        // 4~7일 배치를 증분 저장하면 6, 7일만 삽입되어야 한다
        let batch = vec![
            doc_at("ma_bo", 4, 0, 0.01),
            doc_at("ma_bo", 5, 0, 0.02),
            doc_at("ma_bo", 6, 0, 0.03),
            doc_at("ma_bo", 7, 0, 0.04),
        ];
        let inserted = writer.delta_save(batch.clone()).await.unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.count("modelperf").await, 4);

        // 같은 배치를 다시 저장하면 아무것도 삽입되지 않는다
        let inserted = writer.delta_save(batch).await.unwrap();
        assert_eq!(inserted, 0);
        assert_eq!(store.count("modelperf").await, 4);
    }

    #[tokio::test]
    async fn test_delta_save_empty_series_inserts_everything() {
        let store = MemoryStore::new();
        let writer = SnapshotWriter::new(&store, "modelperf", "strat", "ma_bo");

        let inserted = writer
            .delta_save(vec![doc_at("ma_bo", 1, 0, 0.01), doc_at("ma_bo", 2, 0, 0.02)])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
    }

    #[tokio::test]
    async fn test_delta_save_ignores_other_series() {
        let store = MemoryStore::new();

        // 다른 전략의 최신 행이 T_last 계산에 끼어들면 안 된다
        SnapshotWriter::new(&store, "modelperf", "strat", "nax_trend")
            .full_save(vec![doc_at("nax_trend", 9, 0, 0.05)])
            .await
            .unwrap();

        let writer = SnapshotWriter::new(&store, "modelperf", "strat", "ma_bo");
        let inserted = writer
            .delta_save(vec![doc_at("ma_bo", 1, 0, 0.01)])
            .await
            .unwrap();
        assert_eq!(inserted, 1);
    }

    #[tokio::test]
    async fn test_full_save_skips_duplicates_and_continues() {
        let store = MemoryStore::new()
            .with_unique_index("modelperf", &["strat", "dateTime"])
            .await;
        let writer = SnapshotWriter::new(&store, "modelperf", "strat", "ma_bo");

        writer.full_save(vec![doc_at("ma_bo", 2, 0, 0.02)]).await.unwrap();

        let inserted = writer
            .full_save(vec![
                doc_at("ma_bo", 1, 0, 0.01),
                doc_at("ma_bo", 2, 0, 0.02), // 중복
                doc_at("ma_bo", 3, 0, 0.03),
            ])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.count("modelperf").await, 3);
    }

    #[tokio::test]
    async fn test_delta_save_partial_bulk_failure_keeps_applied_rows() {
        let store = MemoryStore::new()
            .with_unique_index("modelperf", &["strat", "dateTime"])
            .await;
        let writer = SnapshotWriter::new(&store, "modelperf", "strat", "ma_bo");

        store.insert_one("modelperf", doc_at("ma_bo", 2, 0, 0.02)).await.unwrap();

        // T_last = 1월 2일. 같은 시각의 행이 배치에 두 번 섞이면
        // 두 번째 행이 유일 인덱스에 걸려 부분 실패가 된다.
        let inserted = writer
            .delta_save(vec![doc_at("ma_bo", 4, 0, 0.04), doc_at("ma_bo", 4, 0, 0.05)])
            .await
            .unwrap();

        // 첫 행은 적용되고 두 번째는 중복으로 실패하지만 에러가 아니다
        assert_eq!(inserted, 1);
        assert_eq!(store.count("modelperf").await, 2);
    }

    #[tokio::test]
    async fn test_replace_series_rebuilds_from_scratch() {
        let store = MemoryStore::new();
        let writer = SnapshotWriter::new(&store, "fundperf", "fund", "alpha");

        writer
            .replace_series(vec![doc_at("alpha", 1, 0, 0.01), doc_at("alpha", 2, 0, 0.02)])
            .await
            .unwrap();
        assert_eq!(store.count("fundperf").await, 2);

        // 재실행은 이전 시리즈를 대체한다
        let inserted = writer
            .replace_series(vec![
                doc_at("alpha", 1, 0, 0.015),
                doc_at("alpha", 2, 0, 0.02),
                doc_at("alpha", 3, 0, 0.03),
            ])
            .await
            .unwrap();
        assert_eq!(inserted, 3);
        assert_eq!(store.count("fundperf").await, 3);
    }

    #[tokio::test]
    async fn test_delete_range_inclusive() {
        let store = MemoryStore::new();
        let writer = SnapshotWriter::new(&store, "trades", "strat", "ma_bo");
        writer
            .full_save(vec![
                doc_at("ma_bo", 1, 0, 0.01),
                doc_at("ma_bo", 2, 0, 0.02),
                doc_at("ma_bo", 3, 0, 0.03),
            ])
            .await
            .unwrap();

        let deleted = writer
            .delete_range(
                Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count("trades").await, 1);
    }

    #[test]
    fn test_collapse_end_of_day_keeps_latest_row_per_day() {
        let docs = vec![
            doc_at("ma_bo", 1, 8, 100.0),
            doc_at("ma_bo", 1, 23, 101.0),
            doc_at("ma_bo", 2, 12, 102.0),
        ];
        let collapsed = collapse_end_of_day(docs, false);
        assert_eq!(collapsed.len(), 2);
        assert_eq!(collapsed[0]["rets"], Value::from(101.0));
        assert_eq!(collapsed[1]["rets"], Value::from(102.0));
    }

    #[test]
    fn test_collapse_end_of_day_groups_by_instrument() {
        let docs = vec![
            price_doc("BTC", 1, 8, 100.0),
            price_doc("BTC", 1, 23, 101.0),
            price_doc("ETH", 1, 23, 50.0),
            price_doc("ETH", 2, 23, 51.0),
        ];
        let collapsed = collapse_end_of_day(docs, true);
        assert_eq!(collapsed.len(), 3);

        // 기기별로 하루에 한 행씩, 시각 오름차순
        assert_eq!(collapsed[0]["close"], Value::from(101.0));
        assert_eq!(collapsed[1]["close"], Value::from(50.0));
        assert_eq!(collapsed[2]["close"], Value::from(51.0));
    }

    #[test]
    fn test_collapse_tie_prefers_later_storage_order() {
        let mut first = doc_at("ma_bo", 1, 23, 100.0);
        first.insert("source".to_string(), Value::String("first".to_string()));
        let mut second = doc_at("ma_bo", 1, 23, 100.0);
        second.insert("source".to_string(), Value::String("second".to_string()));

        let collapsed = collapse_end_of_day(vec![first, second], false);
        assert_eq!(collapsed.len(), 1);
        assert_eq!(collapsed[0]["source"], Value::String("second".to_string()));
    }

    #[tokio::test]
    async fn test_eod_snapshot_fetches_then_collapses() {
        let store = MemoryStore::new();
        store.insert_one("prices", price_doc("BTC", 1, 8, 100.0)).await.unwrap();
        store.insert_one("prices", price_doc("BTC", 1, 23, 101.0)).await.unwrap();
        store.insert_one("prices", price_doc("BTC", 2, 23, 102.0)).await.unwrap();

        let collapsed = eod_snapshot(&store, "prices", &SeriesFilter::all(), true)
            .await
            .unwrap();
        assert_eq!(collapsed.len(), 2);
        assert_eq!(collapsed[0]["close"], Value::from(101.0));
    }

    #[test]
    fn test_latest_timestamp() {
        assert_eq!(latest_timestamp(&[]), None);
        let docs = vec![doc_at("ma_bo", 2, 0, 0.0), doc_at("ma_bo", 5, 0, 0.0)];
        assert_eq!(
            latest_timestamp(&docs),
            Some(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap())
        );
    }
}
