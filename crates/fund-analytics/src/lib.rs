//! 시계열 정렬 및 통계 추정.
//!
//! 이 crate는 다음을 제공합니다:
//! - 기기별 관측 배치를 공통 시간축 테이블로 재구성하는 정렬기
//! - 수익률 및 (일반/지수 가중) 롤링 변동성 추정기
//! - NAV 시리즈 기반 성과 분석 (HWM, 낙폭, 샤프, 월별/일별 통계)
//!
//! 모든 계산은 동기적이고 순수합니다. 입출력 경계는 `fund-data`가
//! 담당합니다.

pub mod align;
pub mod performance;
pub mod processor;
pub mod volatility;

pub use align::AlignedTable;
pub use performance::{
    annualised_return, annualised_vol, sharpe_ratio, DailyStats, NavSeries,
};
pub use processor::PriceProcessor;
pub use volatility::{expo_weights, returns, rolling_expo_std, rolling_std, weighted_expo_std};
