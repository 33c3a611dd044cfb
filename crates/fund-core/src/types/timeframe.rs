//! 시계열 샘플링 간격 정의.
//!
//! 이 모듈은 파이프라인이 다루는 타임프레임과
//! 변동성 연율화에 사용하는 계수를 정의합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 시계열 타임프레임.
///
/// 연율화 계수가 정의된 세 가지 간격만 표현합니다.
/// 계수가 없는 간격은 타입 수준에서 존재할 수 없습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    /// 1시간봉
    #[serde(rename = "1H", alias = "1h")]
    H1,
    /// 4시간봉
    #[serde(rename = "4H", alias = "4h")]
    H4,
    /// 일봉
    #[serde(rename = "1D", alias = "1d")]
    D1,
}

impl Timeframe {
    /// 이 타임프레임의 기간을 반환합니다.
    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::H1 => Duration::from_secs(60 * 60),
            Timeframe::H4 => Duration::from_secs(4 * 60 * 60),
            Timeframe::D1 => Duration::from_secs(24 * 60 * 60),
        }
    }

    /// 연율화 계수를 반환합니다.
    ///
    /// 연간 복리 기간 수의 단순 근사입니다 (실제 거래일 수가 아님).
    /// 기존 시스템과의 수치 동등성을 위해 값을 그대로 유지해야 합니다:
    /// 1D → 365, 4H → 365×6, 1H → 365×24.
    pub fn annualisation_factor(&self) -> f64 {
        match self {
            Timeframe::D1 => 365.0,
            Timeframe::H4 => 365.0 * 6.0,
            Timeframe::H1 => 365.0 * 24.0,
        }
    }

    /// 변동성 연율화용 제곱근 계수를 반환합니다.
    pub fn annualisation_sqrt(&self) -> f64 {
        self.annualisation_factor().sqrt()
    }

    /// 하루에 포함된 이 타임프레임 기간의 수.
    pub fn periods_per_day(&self) -> u32 {
        match self {
            Timeframe::H1 => 24,
            Timeframe::H4 => 6,
            Timeframe::D1 => 1,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Timeframe::H1 => "1H",
            Timeframe::H4 => "4H",
            Timeframe::D1 => "1D",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // 원천 피드는 소문자("1h"), 설정은 대문자("1H")를 사용한다
        match s {
            "1H" | "1h" => Ok(Timeframe::H1),
            "4H" | "4h" => Ok(Timeframe::H4),
            "1D" | "1d" => Ok(Timeframe::D1),
            _ => Err(format!("Unknown timeframe: {}", s)),
        }
    }
}
