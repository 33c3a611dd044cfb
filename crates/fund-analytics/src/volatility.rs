//! 수익률 및 롤링 변동성 추정기.
//!
//! 정렬된 종가 테이블에서 기간 수익률을 유도하고, 일반 롤링 표준편차와
//! 지수 가중 표준편차를 계산합니다.
//!
//! 지수 가중치 곡선은 [-3, +3] 구간을 윈도우 길이만큼 등분한 뒤
//! 0을 기준으로 두 곡선을 이어 붙인 고유한 형태입니다. 표준 EWMA가
//! 아니며, 기존 시스템과의 수치 동등성을 위해 곡선 모양과 (W-1)
//! 분모를 그대로 유지해야 합니다.

use fund_core::Timeframe;

use crate::align::AlignedTable;

/// 종가 테이블에서 기간 수익률 테이블을 유도합니다.
///
/// `r[t] = close[t] / close[t-1] - 1`. 첫 행은 이전 기간이 없어
/// 정의되지 않으므로 결과에서 제외됩니다. 결과 행 수는 입력보다
/// 정확히 하나 적습니다. 결측이 낀 구간의 수익률은 정의되지 않습니다.
pub fn returns(close: &AlignedTable) -> AlignedTable {
    if close.len() < 2 {
        return AlignedTable::empty();
    }

    let index = close.index()[1..].to_vec();
    let columns = close.columns().to_vec();
    let mut values = Vec::with_capacity(columns.len());

    for col in 0..columns.len() {
        let mut rets = Vec::with_capacity(index.len());
        for row in 1..close.len() {
            let ret = match (close.value(row, col), close.value(row - 1, col)) {
                (Some(curr), Some(prev)) => Some(curr / prev - 1.0),
                _ => None,
            };
            rets.push(ret);
        }
        values.push(rets);
    }

    AlignedTable::from_parts(index, columns, values)
}

/// 트레일링 윈도우의 일반 롤링 변동성을 계산합니다.
///
/// 표본 표준편차(분모 W-1)에 타임프레임 연율화 제곱근 계수를
/// 곱합니다. W번째 관측 이전의 행과 결측이 포함된 윈도우는 정의되지
/// 않습니다.
pub fn rolling_std(rets: &AlignedTable, window: usize, timeframe: Timeframe) -> AlignedTable {
    let mult = timeframe.annualisation_sqrt();
    rolling_apply(rets, window, |w| sample_std(w).map(|s| s * mult))
}

/// 지수 가중치 곡선을 생성합니다.
///
/// [-3, +3]을 `window`개의 점으로 등분하고,
/// t < 0 에서는 `e^t/2 + 0.5`, t ≥ 0 에서는 `1 - e^(-t)/2 + 0.5`를
/// 적용합니다. 오래된 관측이 -3 쪽, 최신 관측이 +3 쪽에 놓입니다.
pub fn expo_weights(window: usize) -> Vec<f64> {
    linspace(-3.0, 3.0, window)
        .into_iter()
        .map(|t| {
            if t < 0.0 {
                t.exp() / 2.0 + 0.5
            } else {
                1.0 - (-t).exp() / 2.0 + 0.5
            }
        })
        .collect()
}

/// 한 윈도우의 지수 가중 표준편차를 계산합니다.
///
/// 가중 평균 `Σ(r·w)/Σw`, 가중 분산 `Σ(w·(r-평균)²)/(W-1)`,
/// 표준편차는 분산에 연율화 계수를 곱한 값의 제곱근입니다.
pub fn weighted_expo_std(window_rets: &[f64], weights: &[f64], timeframe: Timeframe) -> f64 {
    debug_assert_eq!(window_rets.len(), weights.len());
    let window = window_rets.len();

    let weight_sum: f64 = weights.iter().sum();
    let weighted_mean: f64 = window_rets
        .iter()
        .zip(weights)
        .map(|(r, w)| r * w)
        .sum::<f64>()
        / weight_sum;

    let weighted_sq_sum: f64 = window_rets
        .iter()
        .zip(weights)
        .map(|(r, w)| w * (r - weighted_mean).powi(2))
        .sum();

    let variance = weighted_sq_sum / (window as f64 - 1.0);
    (variance * timeframe.annualisation_factor()).sqrt()
}

/// 트레일링 윈도우의 지수 가중 롤링 변동성을 계산합니다.
pub fn rolling_expo_std(rets: &AlignedTable, window: usize, timeframe: Timeframe) -> AlignedTable {
    let weights = expo_weights(window);
    rolling_apply(rets, window, |w| {
        Some(weighted_expo_std(w, &weights, timeframe))
    })
}

/// 열별 트레일링 윈도우에 통계 함수를 적용합니다.
///
/// 행 t의 값은 [t-W+1, t] 윈도우에서 계산되며, 윈도우가 덜 찼거나
/// 결측을 포함하면 정의되지 않습니다.
fn rolling_apply<F>(rets: &AlignedTable, window: usize, stat: F) -> AlignedTable
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let index = rets.index().to_vec();
    let columns = rets.columns().to_vec();

    if window == 0 || window > index.len() {
        let values = vec![vec![None; index.len()]; columns.len()];
        return AlignedTable::from_parts(index, columns, values);
    }

    let mut values = Vec::with_capacity(columns.len());
    for col in 0..columns.len() {
        let mut out = vec![None; index.len()];
        let mut buf = Vec::with_capacity(window);

        for row in (window - 1)..index.len() {
            buf.clear();
            for r in (row + 1 - window)..=row {
                match rets.value(r, col) {
                    Some(v) => buf.push(v),
                    None => break,
                }
            }
            if buf.len() == window {
                out[row] = stat(&buf);
            }
        }
        values.push(out);
    }

    AlignedTable::from_parts(index, columns, values)
}

/// 표본 표준편차 (분모 n-1).
pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
    Some(variance.sqrt())
}

/// 시작과 끝을 포함해 `n`개의 점으로 구간을 등분합니다.
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n as f64 - 1.0);
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}
