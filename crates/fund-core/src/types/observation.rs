//! 시장 관측 데이터 구조체.
//!
//! 수집기가 만들어낸 원시 관측 레코드와, Redis에 보관되는
//! AUM / 목표 비중 스냅샷을 정의합니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Timeframe;

/// 가격 필드 선택자.
///
/// 정렬기가 관측 배치에서 추출할 필드를 지정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

/// 단일 기기(instrument) 관측 레코드.
///
/// 수집 단계에서 생성되며, 정렬기 호출마다 한 번 소비되고
/// 이후에는 절대 변경되지 않습니다. (instrument, timestamp, timeframe)
/// 조합은 유일합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// 기기 식별자 (예: "BTC", "ETH")
    #[serde(rename = "coin")]
    pub instrument: String,
    /// 관측 시각 (UTC)
    #[serde(rename = "dateTime")]
    pub timestamp: DateTime<Utc>,
    /// 샘플링 간격
    pub timeframe: Timeframe,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Observation {
    /// 지정한 가격 필드 값을 반환합니다.
    pub fn field(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
            PriceField::Volume => self.volume,
        }
    }
}

/// 펀드 또는 전략의 최신 AUM 스냅샷.
///
/// Redis 해시(`{name}_aum`)에 보관되는 단일 행 조회 값입니다.
/// 금액이므로 Decimal을 사용합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AumSnapshot {
    /// 펀드 또는 전략 이름
    pub name: String,
    /// 달러 기준 AUM
    pub aum: Decimal,
    /// 스냅샷 기록 시각 (UTC)
    #[serde(rename = "dateTime")]
    pub timestamp: DateTime<Utc>,
}

/// 전략의 최신 목표 비중 스냅샷.
///
/// Redis 해시(`{strat}_tgt_wgt`)에 보관됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetWeight {
    /// 전략 이름
    pub strat: String,
    /// 목표 비중 (1.0 = 100%)
    pub weight: f64,
    /// 스냅샷 기록 시각 (UTC)
    #[serde(rename = "dateTime")]
    pub timestamp: DateTime<Utc>,
}
