//! 데이터 모듈 오류 타입.

use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 키가 이미 존재하는 행을 쓰려고 함.
    ///
    /// 예상되는 상황이며 치명적이지 않습니다. 쓰기 경계에서 로깅 후
    /// 해당 행만 건너뜁니다.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// 배치 쓰기의 부분 실패.
    ///
    /// 실패 이전/이후에 적용된 행은 그대로 유지됩니다.
    #[error("Bulk write error: {inserted} inserted, {} failed", details.len())]
    BulkWrite {
        /// 성공적으로 적용된 행 수
        inserted: usize,
        /// 행별 실패 상세
        details: Vec<String>,
    },

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    Query(String),

    /// 캐시 오류
    #[error("Cache error: {0}")]
    Cache(String),

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 설정 오류
    #[error("Configuration error: {0}")]
    Config(String),
}

/// 데이터 작업을 위한 Result 타입.
pub type Result<T> = std::result::Result<T, DataError>;

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for DataError {
    fn from(err: redis::RedisError) -> Self {
        Self::Cache(err.to_string())
    }
}

impl From<DataError> for fund_core::FundError {
    fn from(err: DataError) -> Self {
        fund_core::FundError::Data(err.to_string())
    }
}
