//! Daily bar (OHLCV) data structures.

use serde::{Deserialize, Serialize};

use crate::types::{Price, Symbol, TradeDate};

use super::DataValidationError;

/// One day of OHLCV data for a ticker.
///
/// # Examples
///
/// ```
/// use sirocco_core::data::DailyBar;
/// use sirocco_core::types::{Price, Symbol, TradeDate};
/// use rust_decimal_macros::dec;
///
/// let bar = DailyBar::builder()
///     .symbol(Symbol::new("SPY").unwrap())
///     .date(TradeDate::from_ymd(2024, 1, 15).unwrap())
///     .open(Price::new(dec!(468.0)).unwrap())
///     .high(Price::new(dec!(471.5)).unwrap())
///     .low(Price::new(dec!(466.2)).unwrap())
///     .close(Price::new(dec!(470.1)).unwrap())
///     .volume(75_000_000)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBar {
    /// Ticker symbol
    pub symbol: Symbol,
    /// Trading date
    pub date: TradeDate,
    /// Opening price
    pub open: Price,
    /// Highest price
    pub high: Price,
    /// Lowest price
    pub low: Price,
    /// Closing price
    pub close: Price,
    /// Share volume
    pub volume: u64,
}

impl DailyBar {
    /// Creates a new builder for `DailyBar`.
    #[must_use]
    pub fn builder() -> DailyBarBuilder {
        DailyBarBuilder::default()
    }

    /// Validates the bar data.
    ///
    /// # Errors
    ///
    /// Returns an error if the high is below the low, or the open or close
    /// fall outside the high-low range.
    pub fn validate(&self) -> Result<(), DataValidationError> {
        if self.high < self.low {
            return Err(DataValidationError::InvalidPriceRelation(format!(
                "high ({}) < low ({})",
                self.high, self.low
            )));
        }
        if self.open > self.high || self.open < self.low {
            return Err(DataValidationError::InvalidPriceRelation(format!(
                "open ({}) outside high-low range ({}-{})",
                self.open, self.low, self.high
            )));
        }
        if self.close > self.high || self.close < self.low {
            return Err(DataValidationError::InvalidPriceRelation(format!(
                "close ({}) outside high-low range ({}-{})",
                self.close, self.low, self.high
            )));
        }
        Ok(())
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> rust_decimal::Decimal {
        self.high - self.low
    }
}

/// Builder for `DailyBar`.
#[derive(Debug, Default)]
pub struct DailyBarBuilder {
    symbol: Option<Symbol>,
    date: Option<TradeDate>,
    open: Option<Price>,
    high: Option<Price>,
    low: Option<Price>,
    close: Option<Price>,
    volume: Option<u64>,
}

impl DailyBarBuilder {
    /// Sets the symbol.
    #[must_use]
    pub fn symbol(mut self, symbol: Symbol) -> Self {
        self.symbol = Some(symbol);
        self
    }

    /// Sets the date.
    #[must_use]
    pub fn date(mut self, date: TradeDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the open price.
    #[must_use]
    pub fn open(mut self, open: Price) -> Self {
        self.open = Some(open);
        self
    }

    /// Sets the high price.
    #[must_use]
    pub fn high(mut self, high: Price) -> Self {
        self.high = Some(high);
        self
    }

    /// Sets the low price.
    #[must_use]
    pub fn low(mut self, low: Price) -> Self {
        self.low = Some(low);
        self
    }

    /// Sets the close price.
    #[must_use]
    pub fn close(mut self, close: Price) -> Self {
        self.close = Some(close);
        self
    }

    /// Sets the volume.
    #[must_use]
    pub fn volume(mut self, volume: u64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Builds the `DailyBar`.
    ///
    /// # Errors
    ///
    /// Returns an error if any required field is missing or validation fails.
    pub fn build(self) -> Result<DailyBar, DataValidationError> {
        let bar = DailyBar {
            symbol: self
                .symbol
                .ok_or(DataValidationError::MissingField("symbol"))?,
            date: self.date.ok_or(DataValidationError::MissingField("date"))?,
            open: self.open.ok_or(DataValidationError::MissingField("open"))?,
            high: self.high.ok_or(DataValidationError::MissingField("high"))?,
            low: self.low.ok_or(DataValidationError::MissingField("low"))?,
            close: self
                .close
                .ok_or(DataValidationError::MissingField("close"))?,
            volume: self
                .volume
                .ok_or(DataValidationError::MissingField("volume"))?,
        };
        bar.validate()?;
        Ok(bar)
    }
}
