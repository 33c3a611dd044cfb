//! 가격 처리 파이프라인 façade.
//!
//! 관측 배치 하나를 받아 필드별 정렬 테이블과 수익률, 변동성
//! 테이블을 한 번에 구성합니다. 한 처리 패스 동안만 유지되는 파생
//! 데이터이며, 저장되거나 분석기로 넘겨진 뒤 폐기됩니다.

use tracing::debug;

use fund_core::{Observation, PriceField, Timeframe};

use crate::align::AlignedTable;
use crate::volatility::{returns, rolling_expo_std, rolling_std};

/// 관측 배치에서 유도한 전체 테이블 묶음.
#[derive(Debug, Clone)]
pub struct PriceProcessor {
    /// 샘플링 간격
    pub timeframe: Timeframe,
    /// 변동성 윈도우 길이
    pub vol_window: usize,
    /// 시가 테이블
    pub open: AlignedTable,
    /// 고가 테이블
    pub high: AlignedTable,
    /// 저가 테이블
    pub low: AlignedTable,
    /// 종가 테이블
    pub close: AlignedTable,
    /// 기간 수익률 테이블 (종가 기준)
    pub returns: AlignedTable,
    /// 일반 롤링 변동성 (연율화)
    pub std: AlignedTable,
    /// 지수 가중 롤링 변동성 (연율화)
    pub expo_std: AlignedTable,
}

impl PriceProcessor {
    /// 관측 배치를 표준 테이블 묶음으로 처리합니다.
    ///
    /// 빈 배치는 빈 테이블 묶음을 만듭니다 (에러가 아님).
    pub fn new(
        instruments: &[String],
        observations: &[Observation],
        vol_window: usize,
        timeframe: Timeframe,
    ) -> Self {
        let open = AlignedTable::from_observations(instruments, observations, PriceField::Open);
        let high = AlignedTable::from_observations(instruments, observations, PriceField::High);
        let low = AlignedTable::from_observations(instruments, observations, PriceField::Low);
        let close = AlignedTable::from_observations(instruments, observations, PriceField::Close);

        let rets = returns(&close);
        let std = rolling_std(&rets, vol_window, timeframe);
        let expo_std = rolling_expo_std(&rets, vol_window, timeframe);

        debug!(
            instruments = instruments.len(),
            observations = observations.len(),
            rows = close.len(),
            vol_window,
            %timeframe,
            "observation batch processed"
        );

        Self {
            timeframe,
            vol_window,
            open,
            high,
            low,
            close,
            returns: rets,
            std,
            expo_std,
        }
    }
}
