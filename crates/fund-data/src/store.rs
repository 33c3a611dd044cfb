//! 문서 저장소 경계.
//!
//! 저장소 자체는 외부 협력자입니다. 이 모듈은 코어가 필요로 하는
//! 인터페이스만 정의합니다: 정렬된 조회, 단건/배치 삽입, 조건 삭제.
//!
//! 문서는 스키마 없는 JSON 객체이며, 시계열 행은 `dateTime` 필드
//! (RFC 3339 문자열)로 시간이 식별됩니다. 논리 시리즈는 이름 필드
//! (`strat`, `fund`, `coin` 등)와 `dateTime`의 조합으로 키가
//! 결정됩니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;

/// 저장소 문서. JSON 객체 한 건입니다.
pub type Document = serde_json::Map<String, Value>;

/// 시계열 행의 시간 필드 이름.
pub const TIMESTAMP_FIELD: &str = "dateTime";

/// 문서의 `dateTime` 필드를 파싱합니다.
pub fn doc_timestamp(doc: &Document) -> Option<DateTime<Utc>> {
    doc.get(TIMESTAMP_FIELD)?
        .as_str()?
        .parse::<DateTime<Utc>>()
        .ok()
}

/// 문서에 `dateTime` 필드를 기록합니다.
pub fn set_doc_timestamp(doc: &mut Document, ts: DateTime<Utc>) {
    doc.insert(
        TIMESTAMP_FIELD.to_string(),
        Value::String(ts.to_rfc3339()),
    );
}

/// 조회 정렬 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// 시리즈 조회 필터.
///
/// 이름 필드 일치와 시간 범위(포함)를 조합합니다.
#[derive(Debug, Clone, Default)]
pub struct SeriesFilter {
    key: Option<(String, String)>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl SeriesFilter {
    /// 모든 문서와 일치하는 필터.
    pub fn all() -> Self {
        Self::default()
    }

    /// 이름 필드가 일치하는 문서만 선택합니다.
    pub fn key(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some((field.into(), value.into())),
            ..Self::default()
        }
    }

    /// [start, end] 시간 범위를 추가합니다 (양끝 포함).
    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// 시작 시각만 제한합니다.
    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// 문서가 필터와 일치하는지 확인합니다.
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some((field, value)) = &self.key {
            let matched = doc
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|v| v == value);
            if !matched {
                return false;
            }
        }

        if self.start.is_some() || self.end.is_some() {
            let Some(ts) = doc_timestamp(doc) else {
                return false;
            };
            if self.start.is_some_and(|start| ts < start) {
                return false;
            }
            if self.end.is_some_and(|end| ts > end) {
                return false;
            }
        }

        true
    }
}

/// 문서 저장소 인터페이스.
///
/// 재시도는 하지 않습니다. 동시 쓰기 경합의 중복 키 실패는 호출측
/// 쓰기 정책([`crate::snapshot`])이 비치명 오류로 처리합니다.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// 필터와 일치하는 문서를 `dateTime` 기준으로 정렬해 반환합니다.
    async fn find(
        &self,
        collection: &str,
        filter: &SeriesFilter,
        sort: SortOrder,
        limit: Option<usize>,
    ) -> Result<Vec<Document>>;

    /// 문서 한 건을 삽입합니다.
    ///
    /// 유일 키가 이미 존재하면 [`DataError::DuplicateKey`]를
    /// 반환합니다.
    ///
    /// [`DataError::DuplicateKey`]: crate::error::DataError::DuplicateKey
    async fn insert_one(&self, collection: &str, doc: Document) -> Result<()>;

    /// 문서 배치를 삽입하고 적용된 행 수를 반환합니다.
    ///
    /// 일부 행이 실패하면 [`DataError::BulkWrite`]를 반환하며,
    /// 성공한 행은 적용된 상태로 남습니다.
    ///
    /// [`DataError::BulkWrite`]: crate::error::DataError::BulkWrite
    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<usize>;

    /// 필터와 일치하는 문서를 삭제하고 삭제된 수를 반환합니다.
    async fn delete_many(&self, collection: &str, filter: &SeriesFilter) -> Result<u64>;
}
