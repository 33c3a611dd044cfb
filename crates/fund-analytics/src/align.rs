//! 시간축 정렬기.
//!
//! 기기별 관측 배치를 하나의 필드에 대한 공통 시간축 테이블로
//! 재구성합니다. 모든 기기의 타임스탬프 축을 외부 조인으로 합치고,
//! 조인이 만들어낸 내부 결측은 해당 기기 자신의 인접 관측 사이에서만
//! 선형 보간으로 채웁니다.
//!
//! # 불변식
//!
//! - 시간축은 엄격히 증가하며 중복이 없습니다.
//! - 보간은 기기 자신의 첫 관측 이전이나 마지막 관측 이후로
//!   외삽하지 않습니다.
//! - 관측이 2개 미만인 기기는 결측을 채우지 않은 채 유지됩니다.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use fund_core::{Observation, PriceField};

/// 단일 필드에 대한 정렬 테이블.
///
/// 행은 타임스탬프 오름차순, 열은 최초 삽입 순서를 유지합니다.
/// 셀 값 `None`은 해당 (시각, 기기)에 값이 정의되지 않았음을
/// 의미합니다.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    index: Vec<DateTime<Utc>>,
    columns: Vec<String>,
    /// 열 우선 저장. `values[c].len() == index.len()`
    values: Vec<Vec<Option<f64>>>,
}

impl AlignedTable {
    /// 빈 테이블을 생성합니다.
    pub fn empty() -> Self {
        Self {
            index: Vec::new(),
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// 관측 배치에서 정렬 테이블을 만듭니다.
    ///
    /// `instruments`에 나열된 기기만 포함하며 열 순서는 나열 순서를
    /// 따릅니다. 빈 배치는 빈 테이블을 반환합니다 (에러가 아님).
    pub fn from_observations(
        instruments: &[String],
        observations: &[Observation],
        field: PriceField,
    ) -> Self {
        if instruments.is_empty() || observations.is_empty() {
            return Self::empty();
        }

        // 기기별 (timestamp -> value). 동일 시각 중복은 마지막 관측이 남는다.
        let mut per_inst: BTreeMap<&str, BTreeMap<DateTime<Utc>, f64>> = BTreeMap::new();
        for inst in instruments {
            per_inst.insert(inst.as_str(), BTreeMap::new());
        }
        for obs in observations {
            if let Some(series) = per_inst.get_mut(obs.instrument.as_str()) {
                series.insert(obs.timestamp, obs.field(field));
            }
        }

        // 외부 조인: 전체 타임스탬프 축의 합집합
        let axis: BTreeSet<DateTime<Utc>> = per_inst
            .values()
            .flat_map(|series| series.keys().copied())
            .collect();
        let index: Vec<DateTime<Utc>> = axis.into_iter().collect();

        let mut values = Vec::with_capacity(instruments.len());
        for inst in instruments {
            let series = &per_inst[inst.as_str()];
            let mut column: Vec<Option<f64>> =
                index.iter().map(|ts| series.get(ts).copied()).collect();
            interpolate_interior(&mut column);
            values.push(column);
        }

        Self {
            index,
            columns: instruments.to_vec(),
            values,
        }
    }

    /// 내부 구성자. 축과 열이 이미 정렬 불변식을 만족해야 합니다.
    pub(crate) fn from_parts(
        index: Vec<DateTime<Utc>>,
        columns: Vec<String>,
        values: Vec<Vec<Option<f64>>>,
    ) -> Self {
        debug_assert!(values.iter().all(|c| c.len() == index.len()));
        debug_assert!(index.windows(2).all(|w| w[0] < w[1]));
        Self {
            index,
            columns,
            values,
        }
    }

    /// 행 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// 테이블이 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// 타임스탬프 축을 반환합니다.
    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    /// 열 이름을 최초 삽입 순서로 반환합니다.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 열 전체 값을 반환합니다.
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        let pos = self.columns.iter().position(|c| c == name)?;
        Some(&self.values[pos])
    }

    /// (행, 열) 위치의 값을 반환합니다.
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(col)?.get(row).copied().flatten()
    }

    /// 특정 시각, 특정 기기의 값을 반환합니다.
    pub fn get(&self, ts: DateTime<Utc>, instrument: &str) -> Option<f64> {
        let row = self.index.binary_search(&ts).ok()?;
        let col = self.columns.iter().position(|c| c == instrument)?;
        self.value(row, col)
    }
}

/// 내부 결측을 행 위치 기준 선형 보간으로 채웁니다.
///
/// 첫 관측 이전과 마지막 관측 이후의 결측은 그대로 둡니다.
/// 관측이 2개 미만이면 아무것도 채우지 않습니다.
fn interpolate_interior(column: &mut [Option<f64>]) {
    let mut prev_known: Option<usize> = None;

    for j in 0..column.len() {
        let Some(right) = column[j] else { continue };

        if let Some(i) = prev_known {
            if j > i + 1 {
                let left = column[i].unwrap();
                let span = (j - i) as f64;
                for (offset, cell) in column[i + 1..j].iter_mut().enumerate() {
                    let frac = (offset + 1) as f64 / span;
                    *cell = Some(left + (right - left) * frac);
                }
            }
        }
        prev_known = Some(j);
    }
}
