//! 저장소와 캐시 경계.
//!
//! 이 crate는 다음을 제공합니다:
//! - 시계열 문서 저장소 인터페이스와 인메모리 구현
//! - Redis 캐싱 (AUM, 목표 비중, 가격 블롭 조회)
//! - 증분 스냅샷 쓰기 정책 (델타 저장, 전체 저장, 시리즈 교체)
//! - 일 단위(EOD) 축약

pub mod cache;
pub mod error;
pub mod memory;
pub mod snapshot;
pub mod store;

pub use error::{DataError, Result};

pub use cache::{PriceQuery, RedisCache};
pub use memory::MemoryStore;
pub use snapshot::{
    collapse_end_of_day, eod_snapshot, latest_timestamp, SaveMode, SnapshotWriter,
};
pub use store::{
    doc_timestamp, set_doc_timestamp, Document, SeriesFilter, SeriesStore, SortOrder,
    TIMESTAMP_FIELD,
};
