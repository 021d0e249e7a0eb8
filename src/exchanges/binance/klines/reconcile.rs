use crate::exchanges::binance::types::{CandleRow, PairSeries};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Align every series in `series` to the open-time axis of `reference`.
///
/// Returns `false` and leaves the map untouched when the reference pair is
/// missing or has no rows. Series that came back empty stay empty: no pair is
/// derived from other pairs' prices.
pub fn fill_missing_pairs(series: &mut BTreeMap<String, PairSeries>, reference: &str) -> bool {
    let Some(reference_rows) = series
        .get(reference)
        .filter(|s| !s.is_empty())
        .map(|s| s.rows.clone())
    else {
        warn!(reference, "Reference pair is missing, skipping reconciliation");
        return false;
    };

    for (pair, pair_series) in series.iter_mut() {
        if pair == reference {
            continue;
        }
        if pair_series.is_empty() {
            warn!(%pair, "No klines returned, leaving series empty");
            continue;
        }

        let before = pair_series.len();
        pair_series.rows = align_to_reference(&pair_series.rows, &reference_rows);
        debug!(%pair, before, after = pair_series.len(), "aligned series to reference axis");
    }
    true
}

/// Rebuild `rows` on the open times of `reference`.
///
/// An open time without a row becomes a flat row at the close of the latest
/// row opened at or before it, whether or not that row sits on the axis. Slots
/// before the first row are filled flat at its open. Rows off the axis are
/// dropped from the output.
pub fn align_to_reference(rows: &[CandleRow], reference: &[CandleRow]) -> Vec<CandleRow> {
    let mut known: Vec<&CandleRow> = rows.iter().collect();
    known.sort_by_key(|r| r.open_time);

    let Some(first) = known.first() else {
        return Vec::new();
    };

    let mut last_close = first.open.clone();
    let mut next = 0;

    reference
        .iter()
        .map(|slot| {
            let mut exact = None;
            while let Some(row) = known.get(next).filter(|r| r.open_time <= slot.open_time) {
                last_close.clone_from(&row.close);
                if row.open_time == slot.open_time {
                    exact = Some(*row);
                }
                next += 1;
            }
            exact.map_or_else(
                || CandleRow::flat(slot.open_time, slot.close_time, &last_close),
                |row| row.clone(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(open_time: i64, open: &str, close: &str) -> CandleRow {
        CandleRow {
            open_time,
            open: open.to_string(),
            high: close.to_string(),
            low: open.to_string(),
            close: close.to_string(),
            volume: "10".to_string(),
            close_time: open_time + 59,
            quote_asset_volume: "100".to_string(),
            number_of_trades: 3,
            taker_buy_base_asset_volume: "5".to_string(),
            taker_buy_quote_asset_volume: "50".to_string(),
            ignore: "0".to_string(),
        }
    }

    fn batch(entries: Vec<(&str, Vec<CandleRow>)>) -> BTreeMap<String, PairSeries> {
        entries
            .into_iter()
            .map(|(pair, rows)| (pair.to_string(), PairSeries::new(pair, rows)))
            .collect()
    }

    #[test]
    fn test_gap_carries_previous_close() {
        let mut series = batch(vec![
            (
                "BTC-USDT",
                vec![row(0, "1", "2"), row(60, "2", "3"), row(120, "3", "4")],
            ),
            ("ETH-USDT", vec![row(0, "10", "11"), row(120, "12", "13")]),
        ]);

        assert!(fill_missing_pairs(&mut series, "BTC-USDT"));

        let eth = &series["ETH-USDT"];
        assert_eq!(eth.open_times(), vec![0, 60, 120]);
        let filled = &eth.rows[1];
        assert_eq!(filled.open, "11");
        assert_eq!(filled.close, "11");
        assert_eq!(filled.high, "11");
        assert_eq!(filled.volume, "0");
        assert_eq!(filled.number_of_trades, 0);
        assert_eq!(filled.close_time, 119);
        assert_eq!(eth.rows[2].close, "13");
    }

    #[test]
    fn test_leading_gap_uses_first_open_and_extra_rows_dropped() {
        let mut series = batch(vec![
            ("REF", vec![row(0, "1", "1"), row(60, "1", "1")]),
            ("X", vec![row(60, "5", "6"), row(180, "7", "8")]),
        ]);

        assert!(fill_missing_pairs(&mut series, "REF"));

        let x = &series["X"];
        assert_eq!(x.open_times(), vec![0, 60]);
        assert_eq!(x.rows[0].close, "5");
        assert_eq!(x.rows[1].close, "6");
    }

    #[test]
    fn test_rows_off_the_axis_still_set_the_carried_close() {
        let mut series = batch(vec![
            (
                "BTC-USDT",
                vec![row(60_000, "1", "1"), row(120_000, "1", "1"), row(180_000, "1", "1")],
            ),
            ("ETH-USDT", vec![row(0, "10", "11"), row(180_000, "12", "13")]),
        ]);

        assert!(fill_missing_pairs(&mut series, "BTC-USDT"));

        let eth = &series["ETH-USDT"];
        assert_eq!(eth.open_times(), vec![60_000, 120_000, 180_000]);
        let closes: Vec<&str> = eth.rows.iter().map(|r| r.close.as_str()).collect();
        assert_eq!(closes, vec!["11", "11", "13"]);
        assert_eq!(eth.rows[0].open, "11");
        assert_eq!(eth.rows[0].volume, "0");
    }

    #[test]
    fn test_unsorted_rows_are_aligned() {
        let reference = vec![row(0, "1", "1"), row(60, "1", "1"), row(120, "1", "1")];
        let rows = vec![row(120, "4", "5"), row(0, "2", "3")];

        let aligned = align_to_reference(&rows, &reference);

        let closes: Vec<&str> = aligned.iter().map(|r| r.close.as_str()).collect();
        assert_eq!(closes, vec!["3", "3", "5"]);
    }

    #[test]
    fn test_missing_reference_skips() {
        let mut series = batch(vec![("X", vec![row(0, "1", "2")])]);
        let before = series.clone();

        assert!(!fill_missing_pairs(&mut series, "ETH-USDT"));
        assert_eq!(series, before);
    }

    #[test]
    fn test_empty_series_stays_empty() {
        let mut series = batch(vec![
            ("ETH-USDT", vec![row(0, "1", "2")]),
            ("X", Vec::new()),
        ]);

        assert!(fill_missing_pairs(&mut series, "ETH-USDT"));
        assert!(series["X"].is_empty());
    }
}
