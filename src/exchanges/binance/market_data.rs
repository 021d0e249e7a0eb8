use crate::core::errors::ExchangeError;
use crate::core::kernel::{RequestSpec, Transport};
use crate::core::types::KlineInterval;
use crate::exchanges::binance::client::BinanceRestClient;
use crate::exchanges::binance::types::{
    BinanceExchangeInfo, BinanceOrderBook, BinanceServerTime, BinanceSymbolInfo,
    BinanceTickerPrice, BinanceTrade, CandleRow,
};
use serde_json::Value;
use tracing::{debug, instrument};

/// Public market data endpoints
impl<T: Transport> BinanceRestClient<T> {
    /// Test connectivity to the REST API
    pub async fn ping(&self) -> Result<bool, ExchangeError> {
        let res = self.request(RequestSpec::get("ping")).await?;
        Ok(res.as_object().is_some_and(|o| o.is_empty()))
    }

    /// Current server time in epoch milliseconds
    pub async fn get_server_time(&self) -> Result<i64, ExchangeError> {
        let res: BinanceServerTime = self.request_json(RequestSpec::get("time")).await?;
        Ok(res.server_time)
    }

    /// Align signed request timestamps with the server clock.
    ///
    /// Returns the offset (server minus local, in milliseconds) now in use.
    #[instrument(skip(self), fields(exchange = %self.exchange()))]
    pub async fn sync_time_offset(&self) -> Result<i64, ExchangeError> {
        let server_time = self.get_server_time().await?;
        let offset = server_time - chrono::Utc::now().timestamp_millis();
        self.executor().set_time_offset_ms(offset);
        debug!(offset, "synchronised request timestamp offset");
        Ok(offset)
    }

    /// Current exchange trading rules and symbol information
    pub async fn get_exchange_info(&self) -> Result<BinanceExchangeInfo, ExchangeError> {
        self.request_json(RequestSpec::get("exchangeInfo")).await
    }

    /// Trading rules of one symbol, `None` when the exchange does not list it
    pub async fn get_symbol_info(
        &self,
        symbol: &str,
    ) -> Result<Option<BinanceSymbolInfo>, ExchangeError> {
        let wanted = symbol.to_uppercase();
        let info = self.get_exchange_info().await?;
        Ok(info.symbols.into_iter().find(|s| s.symbol == wanted))
    }

    /// Latest price for a symbol, or for every symbol when `symbol` is `None`
    pub async fn get_ticker(&self, symbol: Option<&str>) -> Result<Value, ExchangeError> {
        self.request(RequestSpec::get("ticker/price").param_opt("symbol", symbol))
            .await
    }

    /// Latest price for all symbols
    pub async fn get_all_tickers(&self) -> Result<Vec<BinanceTickerPrice>, ExchangeError> {
        self.request_json(RequestSpec::get("ticker/price")).await
    }

    /// 24 hour price change statistics
    pub async fn get_24hr_ticker(&self, symbol: Option<&str>) -> Result<Value, ExchangeError> {
        self.request(RequestSpec::get("ticker/24hr").param_opt("symbol", symbol))
            .await
    }

    /// Best price/qty on the order book for all symbols
    pub async fn get_orderbook_tickers(&self) -> Result<Value, ExchangeError> {
        self.request(RequestSpec::get("ticker/bookTicker")).await
    }

    /// Rolling window price change statistics
    pub async fn get_rolling_window_ticker(
        &self,
        symbol: &str,
        window_size: Option<&str>,
    ) -> Result<Value, ExchangeError> {
        self.request(
            RequestSpec::get("ticker")
                .param("symbol", symbol)
                .param_opt("windowSize", window_size),
        )
        .await
    }

    pub async fn get_order_book(
        &self,
        symbol: &str,
        limit: Option<u32>,
    ) -> Result<BinanceOrderBook, ExchangeError> {
        self.request_json(
            RequestSpec::get("depth")
                .param("symbol", symbol)
                .param_opt("limit", limit),
        )
        .await
    }

    pub async fn get_recent_trades(
        &self,
        symbol: &str,
        limit: Option<u32>,
    ) -> Result<Vec<BinanceTrade>, ExchangeError> {
        self.request_json(
            RequestSpec::get("trades")
                .param("symbol", symbol)
                .param_opt("limit", limit),
        )
        .await
    }

    /// Older market trades. Binance requires the API-key header here.
    pub async fn get_historical_trades(
        &self,
        symbol: &str,
        limit: Option<u32>,
        from_id: Option<i64>,
    ) -> Result<Vec<BinanceTrade>, ExchangeError> {
        self.request_json(
            RequestSpec::get("historicalTrades")
                .param("symbol", symbol)
                .param_opt("limit", limit)
                .param_opt("fromId", from_id),
        )
        .await
    }

    /// Kline/candlestick bars, uniquely identified by their open time
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: KlineInterval,
        limit: Option<u32>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Result<Vec<CandleRow>, ExchangeError> {
        self.request_json(
            RequestSpec::get("klines")
                .param("symbol", symbol)
                .param("interval", interval.as_str())
                .param_opt("limit", limit)
                .param_opt("startTime", start_time)
                .param_opt("endTime", end_time),
        )
        .await
    }

    /// Open time of the first kline the exchange has for `symbol`
    pub async fn get_earliest_valid_timestamp(
        &self,
        symbol: &str,
        interval: KlineInterval,
    ) -> Result<i64, ExchangeError> {
        let klines = self
            .get_klines(symbol, interval, Some(1), Some(0), None)
            .await?;
        klines.first().map(|k| k.open_time).ok_or_else(|| {
            ExchangeError::InvalidParameters(format!("No klines available for {}", symbol))
        })
    }
}
