//! # Domain Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated instrument identifier |
//! | [`TradingDate`] | Calendar date rendered as `YYYY-MM-DD` |
//! | [`Bar`] | Daily OHLCV row |
//! | [`PriceSeries`] | Date-ordered bars of one instrument |

mod date;
mod models;
mod symbol;

pub use date::TradingDate;
pub use models::{Bar, PriceSeries};
pub use symbol::Symbol;
