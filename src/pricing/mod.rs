//! Fee estimation for certification batches.
//!
//! # Data Flow
//! ```text
//! PriceRequest (operation counts)
//!     → types.rs (byte model)
//!     → engine.rs (rammarket ratio × bytes → EOS, × feed rate → fiat)
//!     → feed.rs (exchange-rate lookup)
//! ```

pub mod engine;
pub mod feed;
pub mod types;

pub use engine::PriceEstimator;
pub use feed::{CoinGeckoFeed, ExchangeRateFeed};
pub use types::{OperationBytes, PriceEstimate, PriceRequest, PricingError, PricingResult};
