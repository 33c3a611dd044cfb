//! # Fund Core
//!
//! 펀드 데이터 파이프라인의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 파이프라인 전반에서 사용되는 기본 타입을 제공합니다:
//! - 시장 관측 데이터 구조체 (Observation)
//! - 타임프레임 및 연율화 계수
//! - AUM / 목표 비중 스냅샷
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;
