//! 바(bar) 데이터.
//!
//! 런타임은 바 데이터를 해석하지 않고 `handle_bar` 콜백에 그대로 전달합니다.
//! 한 번의 호출 동안 `Arc<BarDict>`로 공유됩니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 단일 종목의 OHLCV 바.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// 종목 코드
    pub order_book_id: String,
    /// 바 시각
    pub datetime: DateTime<Utc>,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: Decimal,
}

impl Bar {
    /// 새 바를 생성합니다.
    pub fn new(
        order_book_id: impl Into<String>,
        datetime: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            order_book_id: order_book_id.into(),
            datetime,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 양봉(종가 > 시가)인지 확인합니다.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// 한 시점의 종목별 바 묶음.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarDict {
    datetime: DateTime<Utc>,
    bars: BTreeMap<String, Bar>,
}

impl BarDict {
    /// 빈 바 묶음을 생성합니다.
    pub fn new(datetime: DateTime<Utc>) -> Self {
        Self {
            datetime,
            bars: BTreeMap::new(),
        }
    }

    /// 바를 추가한 묶음을 반환합니다.
    pub fn with_bar(mut self, bar: Bar) -> Self {
        self.insert(bar);
        self
    }

    /// 바를 추가합니다. 같은 종목의 기존 바는 교체됩니다.
    pub fn insert(&mut self, bar: Bar) -> Option<Bar> {
        self.bars.insert(bar.order_book_id.clone(), bar)
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.datetime
    }

    pub fn get(&self, order_book_id: &str) -> Option<&Bar> {
        self.bars.get(order_book_id)
    }

    pub fn contains(&self, order_book_id: &str) -> bool {
        self.bars.contains_key(order_book_id)
    }

    /// 종목 코드 (정렬 순서).
    pub fn order_book_ids(&self) -> impl Iterator<Item = &str> {
        self.bars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
