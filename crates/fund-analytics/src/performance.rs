//! NAV 시리즈 성과 분석.
//!
//! 단일 NAV 시리즈에서 고점(HWM), 낙폭, 연율화 수익률/변동성, 샤프
//! 비율, 월별/일별 성과 요약을 계산합니다.
//!
//! 0으로 나누는 통계(변동성 0의 샤프, 하락일 0의 상승/하락 비율)는
//! IEEE 무한대/NaN으로 그대로 전파됩니다. 조용히 0으로 대체하지
//! 않으며, 가드는 호출자의 책임입니다.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use fund_core::Timeframe;

use crate::volatility::sample_std;

/// 시간 인덱스가 붙은 NAV 시리즈.
///
/// 타임스탬프당 값은 정확히 하나이며 오름차순을 유지합니다.
/// 생성 시 중복 타임스탬프는 마지막 관측 값만 남습니다.
#[derive(Debug, Clone, PartialEq)]
pub struct NavSeries {
    index: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

/// 일별 성과 요약.
///
/// 정의되지 않는 통계(상승일 또는 하락일이 없는 경우)는 NaN 또는
/// 무한대로 전파됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    /// NAV가 오른 날의 수
    pub up_days: usize,
    /// NAV가 내린 날의 수
    pub down_days: usize,
    /// 상승일 / 하락일 비율
    pub up_down_ratio: f64,
    /// 상승일 평균 변화량
    pub avg_up: f64,
    /// 하락일 평균 변화량
    pub avg_down: f64,
    /// 최대 단일 상승량
    pub max_up: f64,
    /// 최대 단일 하락량 (가장 큰 음수)
    pub max_down: f64,
}

impl NavSeries {
    /// (시각, NAV) 쌍에서 시리즈를 만듭니다.
    ///
    /// 시각 기준으로 안정 정렬하고, 중복 시각은 마지막 관측이
    /// 남습니다.
    pub fn new(mut points: Vec<(DateTime<Utc>, f64)>) -> Self {
        points.sort_by_key(|(ts, _)| *ts);

        let mut index: Vec<DateTime<Utc>> = Vec::with_capacity(points.len());
        let mut values: Vec<f64> = Vec::with_capacity(points.len());
        for (ts, nav) in points {
            if index.last() == Some(&ts) {
                *values.last_mut().unwrap() = nav;
            } else {
                index.push(ts);
                values.push(nav);
            }
        }

        Self { index, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 기간 수익률을 반환합니다. 첫 행은 정의되지 않아 제외됩니다.
    pub fn returns(&self) -> Vec<f64> {
        self.values
            .windows(2)
            .map(|w| w[1] / w[0] - 1.0)
            .collect()
    }

    /// 누적 고점(running maximum) 시리즈를 반환합니다.
    pub fn high_water_marks(&self) -> Vec<f64> {
        let mut hwm = Vec::with_capacity(self.values.len());
        let mut peak = f64::NEG_INFINITY;
        for &nav in &self.values {
            peak = peak.max(nav);
            hwm.push(peak);
        }
        hwm
    }

    /// 관측된 최대 NAV를 반환합니다.
    pub fn high_water_mark(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    /// 낙폭 시리즈를 반환합니다. `nav/hwm - 1`, 항상 0 이하입니다.
    pub fn drawdowns(&self) -> Vec<f64> {
        self.values
            .iter()
            .zip(self.high_water_marks())
            .map(|(nav, hwm)| nav / hwm - 1.0)
            .collect()
    }

    /// 최대 낙폭을 반환합니다. 항상 0 이하이며, NAV가 단조 증가하면
    /// 0입니다.
    pub fn max_drawdown(&self) -> Option<f64> {
        self.drawdowns().into_iter().reduce(f64::min)
    }

    /// 하루에 하나, 그 날의 마지막 관측만 남긴 시리즈를 반환합니다.
    pub fn collapse_daily(&self) -> NavSeries {
        let mut index: Vec<DateTime<Utc>> = Vec::new();
        let mut values: Vec<f64> = Vec::new();

        for (&ts, &nav) in self.index.iter().zip(&self.values) {
            let same_day = index
                .last()
                .is_some_and(|last| last.date_naive() == ts.date_naive());
            if same_day {
                *index.last_mut().unwrap() = ts;
                *values.last_mut().unwrap() = nav;
            } else {
                index.push(ts);
                values.push(nav);
            }
        }

        NavSeries { index, values }
    }

    /// 월별 수익률을 계산합니다.
    ///
    /// 각 달력 월에서 마지막 NAV 관측만 남기고, 연속한 월 사이의
    /// 수익률을 계산합니다. 첫 월은 이전 값이 없어 제외됩니다.
    pub fn monthly_returns(&self) -> Vec<(DateTime<Utc>, f64)> {
        // 월별 마지막 관측 (시리즈가 오름차순이므로 나중 값이 덮어쓴다)
        let mut buckets: Vec<(DateTime<Utc>, f64)> = Vec::new();
        for (&ts, &nav) in self.index.iter().zip(&self.values) {
            let same_month = buckets
                .last()
                .is_some_and(|(last, _)| last.year() == ts.year() && last.month() == ts.month());
            if same_month {
                *buckets.last_mut().unwrap() = (ts, nav);
            } else {
                buckets.push((ts, nav));
            }
        }

        buckets
            .windows(2)
            .map(|w| (w[1].0, w[1].1 / w[0].1 - 1.0))
            .collect()
    }

    /// 일별 성과 요약을 계산합니다.
    ///
    /// 하루의 마지막 관측으로 축약한 뒤 일간 NAV 변화량으로 상승/하락
    /// 통계를 만듭니다.
    pub fn daily_stats(&self) -> DailyStats {
        let daily = self.collapse_daily();
        let deltas: Vec<f64> = daily.values.windows(2).map(|w| w[1] - w[0]).collect();

        let ups: Vec<f64> = deltas.iter().copied().filter(|d| *d > 0.0).collect();
        let downs: Vec<f64> = deltas.iter().copied().filter(|d| *d < 0.0).collect();

        DailyStats {
            up_days: ups.len(),
            down_days: downs.len(),
            up_down_ratio: ups.len() as f64 / downs.len() as f64,
            avg_up: ups.iter().sum::<f64>() / ups.len() as f64,
            avg_down: downs.iter().sum::<f64>() / downs.len() as f64,
            max_up: ups.iter().copied().fold(f64::NAN, f64::max),
            max_down: downs.iter().copied().fold(f64::NAN, f64::min),
        }
    }
}

/// 총수익률을 연율화합니다.
///
/// `(1 + r)^(연율화계수 / n) - 1`. `n`은 총수익률이 걸친 기간 수입니다.
pub fn annualised_return(total_ret: f64, periods: u32, timeframe: Timeframe) -> f64 {
    (1.0 + total_ret).powf(timeframe.annualisation_factor() / periods as f64) - 1.0
}

/// 기간 수익률의 연율화 변동성을 계산합니다.
///
/// 표본 표준편차에 연율화 제곱근 계수를 곱합니다. 수익률이 2개
/// 미만이면 정의되지 않습니다.
pub fn annualised_vol(rets: &[f64], timeframe: Timeframe) -> Option<f64> {
    sample_std(rets).map(|s| s * timeframe.annualisation_sqrt())
}

/// 샤프 비율. 무위험 이자율 조정은 하지 않습니다.
///
/// 변동성이 0이면 무한대/NaN이 그대로 반환됩니다. 가드는 호출자의
/// 책임입니다.
pub fn sharpe_ratio(ann_ret: f64, ann_vol: f64) -> f64 {
    ann_ret / ann_vol
}
