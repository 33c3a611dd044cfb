//! Redis cache 구현.
//!
//! 수집기가 Redis에 적재한 최신 상태(AUM, 목표 비중, 가격 블롭)를
//! 읽는 레이어입니다. 일반 get/set 외에 도메인 조회를 제공합니다.
//!
//! 해시의 `dateTime` 필드는 `%Y-%m-%d %H:%M:%S` 형식의 UTC 문자열,
//! 가격 블롭의 `dateTime`은 밀리초 epoch 정수입니다.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use fund_core::{AumSnapshot, Observation, RedisConfig, TargetWeight, Timeframe};

use crate::error::{DataError, Result};

/// 해시 타임스탬프 형식.
const HASH_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 가격 블롭 조회 조건.
///
/// 블롭은 통째로 읽은 뒤 프로세스 안에서 거릅니다.
#[derive(Debug, Clone)]
pub struct PriceQuery {
    /// 포함할 기기 목록. 비어 있으면 전체.
    pub instruments: Vec<String>,
    /// 리밸런스 시각(UTC hour) 필터. 비어 있으면 전체.
    pub rebal_hours: Vec<u32>,
    /// true면 샘플 블롭, false면 전체 이력 블롭.
    pub sample: bool,
    /// 블롭 타임프레임
    pub timeframe: Timeframe,
}

impl PriceQuery {
    /// 샘플 블롭에 대한 기본 조회를 만듭니다.
    pub fn sample(instruments: Vec<String>, timeframe: Timeframe) -> Self {
        Self {
            instruments,
            rebal_hours: Vec::new(),
            sample: true,
            timeframe,
        }
    }

    /// 전체 이력 블롭에 대한 조회를 만듭니다.
    pub fn full_history(instruments: Vec<String>, timeframe: Timeframe) -> Self {
        Self {
            instruments,
            rebal_hours: Vec::new(),
            sample: false,
            timeframe,
        }
    }

    /// 리밸런스 시각 필터를 추가합니다.
    pub fn at_hours(mut self, hours: Vec<u32>) -> Self {
        self.rebal_hours = hours;
        self
    }

    /// 블롭 키 이름.
    fn blob_key(&self) -> String {
        let prefix = if self.sample { "prices-sample" } else { "prices-all" };
        format!("{}_{}", prefix, self.timeframe.to_string().to_lowercase())
    }

    /// 관측이 조회 조건과 일치하는지 확인합니다.
    fn matches(&self, obs: &Observation) -> bool {
        if !self.instruments.is_empty() && !self.instruments.contains(&obs.instrument) {
            return false;
        }
        if !self.rebal_hours.is_empty() && !self.rebal_hours.contains(&obs.timestamp.hour()) {
            return false;
        }
        true
    }
}

/// 가격 블롭의 원시 행.
#[derive(Debug, Deserialize)]
struct RawPriceRow {
    coin: String,
    /// 밀리초 epoch
    #[serde(rename = "dateTime")]
    date_time: i64,
    timeframe: Timeframe,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// 가격 블롭 JSON을 관측 목록으로 파싱합니다.
fn parse_price_blob(json: &str) -> Result<Vec<Observation>> {
    let rows: Vec<RawPriceRow> = serde_json::from_str(json)?;
    rows.into_iter()
        .map(|row| {
            let timestamp = DateTime::from_timestamp_millis(row.date_time).ok_or_else(|| {
                DataError::Serialization(format!("Invalid epoch millis: {}", row.date_time))
            })?;
            Ok(Observation {
                instrument: row.coin,
                timestamp,
                timeframe: row.timeframe,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            })
        })
        .collect()
}

/// 해시에서 필수 필드를 꺼냅니다.
fn hash_field<'a>(key: &str, hash: &'a HashMap<String, String>, field: &str) -> Result<&'a str> {
    hash.get(field)
        .map(String::as_str)
        .ok_or_else(|| DataError::Cache(format!("Hash {} missing field {}", key, field)))
}

/// 해시의 `dateTime` 필드를 파싱합니다.
fn hash_timestamp(key: &str, hash: &HashMap<String, String>) -> Result<DateTime<Utc>> {
    let raw = hash_field(key, hash, "dateTime")?;
    let naive = NaiveDateTime::parse_from_str(raw, HASH_TIMESTAMP_FORMAT)
        .map_err(|e| DataError::Serialization(format!("Invalid hash timestamp {}: {}", raw, e)))?;
    Ok(naive.and_utc())
}

/// Redis 연결 래퍼.
#[derive(Clone)]
pub struct RedisCache {
    connection: Arc<RwLock<MultiplexedConnection>>,
    config: RedisConfig,
}

impl RedisCache {
    /// 새로운 Redis cache 연결을 생성합니다.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        info!("Connecting to Redis...");

        let client = Client::open(config.url.as_str())?;
        let connection = client.get_multiplexed_async_connection().await?;

        info!("Redis connection established");

        Ok(Self {
            connection: Arc::new(RwLock::new(connection)),
            config: config.clone(),
        })
    }

    /// Redis 상태를 확인합니다.
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection.write().await;
        let result: String = redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(result == "PONG")
    }

    // =========================================================================
    // 일반 Cache 작업
    // =========================================================================

    /// cache에서 값을 가져옵니다.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.connection.write().await;
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// 기본 TTL로 cache에 값을 설정합니다.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_with_ttl(key, value, self.config.default_ttl_secs)
            .await
    }

    /// 사용자 정의 TTL로 cache에 값을 설정합니다.
    pub async fn set_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<()> {
        let json = serde_json::to_string(value)?;

        let mut conn = self.connection.write().await;
        let _: () = conn.set_ex(key, json, ttl_secs).await?;
        Ok(())
    }

    /// cache에서 키를 삭제합니다.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection.write().await;
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    // =========================================================================
    // AUM / 목표 비중 조회
    // =========================================================================

    /// AUM 스냅샷을 읽습니다. 해시 `{name}_aum`.
    async fn aum(&self, name: &str) -> Result<AumSnapshot> {
        let key = format!("{}_aum", name);
        let hash: HashMap<String, String> = {
            let mut conn = self.connection.write().await;
            conn.hgetall(&key).await?
        };
        if hash.is_empty() {
            return Err(DataError::Cache(format!("Hash {} not found", key)));
        }

        let aum = hash_field(&key, &hash, "aum")?
            .parse()
            .map_err(|e| DataError::Serialization(format!("Invalid aum in {}: {}", key, e)))?;
        Ok(AumSnapshot {
            name: name.to_string(),
            aum,
            timestamp: hash_timestamp(&key, &hash)?,
        })
    }

    /// 전략의 최신 AUM을 읽습니다.
    pub async fn strat_aum(&self, strat: &str) -> Result<AumSnapshot> {
        self.aum(strat).await
    }

    /// 펀드의 최신 AUM을 읽습니다.
    pub async fn fund_aum(&self, fund: &str) -> Result<AumSnapshot> {
        self.aum(fund).await
    }

    /// 전략의 최신 목표 비중을 읽습니다. 해시 `{strat}_tgt_wgt`.
    pub async fn target_weight(&self, strat: &str) -> Result<TargetWeight> {
        let key = format!("{}_tgt_wgt", strat);
        let hash: HashMap<String, String> = {
            let mut conn = self.connection.write().await;
            conn.hgetall(&key).await?
        };
        if hash.is_empty() {
            return Err(DataError::Cache(format!("Hash {} not found", key)));
        }

        let weight = hash_field(&key, &hash, "weight")?
            .parse()
            .map_err(|e| DataError::Serialization(format!("Invalid weight in {}: {}", key, e)))?;
        Ok(TargetWeight {
            strat: strat.to_string(),
            weight,
            timestamp: hash_timestamp(&key, &hash)?,
        })
    }

    // =========================================================================
    // 가격 블롭
    // =========================================================================

    /// 가격 블롭을 읽고 조회 조건으로 거른 관측 목록을 반환합니다.
    #[instrument(skip(self), fields(key = %query.blob_key()))]
    pub async fn price_history(&self, query: &PriceQuery) -> Result<Vec<Observation>> {
        let key = query.blob_key();
        let json: Option<String> = {
            let mut conn = self.connection.write().await;
            conn.get(&key).await?
        };
        let Some(json) = json else {
            return Err(DataError::Cache(format!("Price blob {} not found", key)));
        };

        let observations: Vec<Observation> = parse_price_blob(&json)?
            .into_iter()
            .filter(|obs| query.matches(obs))
            .collect();

        debug!(count = observations.len(), "price blob loaded");
        Ok(observations)
    }
}
