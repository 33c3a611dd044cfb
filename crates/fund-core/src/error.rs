//! 파이프라인의 에러 타입.
//!
//! 이 모듈은 파이프라인 전반에서 사용되는 에러 타입을 정의합니다.

use thiserror::Error;

/// 핵심 파이프라인 에러.
#[derive(Debug, Error)]
pub enum FundError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 데이터 에러 (저장소, 캐시)
    #[error("데이터 에러: {0}")]
    Data(String),

    /// 분석 에러 (정렬, 추정)
    #[error("분석 에러: {0}")]
    Analytics(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),
}

/// 핵심 작업을 위한 Result 타입.
pub type Result<T> = std::result::Result<T, FundError>;

impl From<serde_json::Error> for FundError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for FundError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
