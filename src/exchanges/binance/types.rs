use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceServerTime {
    pub server_time: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceFilter {
    #[serde(rename = "filterType")]
    pub filter_type: String,
    #[serde(rename = "minPrice")]
    pub min_price: Option<String>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<String>,
    #[serde(rename = "minQty")]
    pub min_qty: Option<String>,
    #[serde(rename = "maxQty")]
    pub max_qty: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceSymbolInfo {
    pub symbol: String,
    pub status: String,
    #[serde(rename = "baseAsset")]
    pub base_asset: String,
    #[serde(rename = "quoteAsset")]
    pub quote_asset: String,
    #[serde(rename = "baseAssetPrecision", default)]
    pub base_asset_precision: i32,
    #[serde(rename = "quotePrecision", default)]
    pub quote_precision: i32,
    #[serde(default)]
    pub filters: Vec<BinanceFilter>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceExchangeInfo {
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub server_time: i64,
    #[serde(default)]
    pub rate_limits: Vec<Value>,
    pub symbols: Vec<BinanceSymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceTickerPrice {
    pub symbol: String,
    pub price: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceOrderBook {
    pub last_update_id: i64,
    pub bids: Vec<[String; 2]>,
    pub asks: Vec<[String; 2]>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceTrade {
    pub id: i64,
    pub price: String,
    pub qty: String,
    pub quote_qty: String,
    pub time: i64,
    pub is_buyer_maker: bool,
    pub is_best_match: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceBalance {
    pub asset: String,
    pub free: String,
    pub locked: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceAccountInfo {
    #[serde(default)]
    pub can_trade: bool,
    #[serde(default)]
    pub can_withdraw: bool,
    #[serde(default)]
    pub can_deposit: bool,
    #[serde(default)]
    pub account_type: String,
    pub balances: Vec<BinanceBalance>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenKeyResponse {
    pub listen_key: String,
}

/// One REST kline row. Binance sends it as a positional array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleRow {
    pub open_time: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub close_time: i64,
    pub quote_asset_volume: String,
    pub number_of_trades: i64,
    pub taker_buy_base_asset_volume: String,
    pub taker_buy_quote_asset_volume: String,
    pub ignore: String,
}

impl CandleRow {
    /// A flat row at `price` with no traded volume, spanning `open_time..=close_time`
    pub fn flat(open_time: i64, close_time: i64, price: &str) -> Self {
        Self {
            open_time,
            open: price.to_string(),
            high: price.to_string(),
            low: price.to_string(),
            close: price.to_string(),
            volume: "0".to_string(),
            close_time,
            quote_asset_volume: "0".to_string(),
            number_of_trades: 0,
            taker_buy_base_asset_volume: "0".to_string(),
            taker_buy_quote_asset_volume: "0".to_string(),
            ignore: "0".to_string(),
        }
    }
}

/// Klines for one pair, keyed by the caller's identifier (e.g. `BTC-USDT`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSeries {
    pub pair: String,
    pub rows: Vec<CandleRow>,
}

impl PairSeries {
    pub fn new(pair: impl Into<String>, rows: Vec<CandleRow>) -> Self {
        Self {
            pair: pair.into(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn open_times(&self) -> Vec<i64> {
        self.rows.iter().map(|r| r.open_time).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_row_from_wire_array() {
        let raw = r#"[1499040000000,"0.01634790","0.80000000","0.01575800","0.01577100","148976.11427815",1499644799999,"2434.19055334",308,"1756.87402397","28.46694368","0"]"#;
        let row: CandleRow = serde_json::from_str(raw).unwrap();
        assert_eq!(row.open_time, 1_499_040_000_000);
        assert_eq!(row.close, "0.01577100");
        assert_eq!(row.close_time, 1_499_644_799_999);
        assert_eq!(row.number_of_trades, 308);
    }

    #[test]
    fn test_order_book_levels() {
        let raw = r#"{"lastUpdateId":1027024,"bids":[["4.00000000","431.00000000"]],"asks":[["4.00000200","12.00000000"]]}"#;
        let book: BinanceOrderBook = serde_json::from_str(raw).unwrap();
        assert_eq!(book.last_update_id, 1_027_024);
        assert_eq!(book.bids[0][1], "431.00000000");
    }
}
