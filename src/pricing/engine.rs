//! Fee estimation: byte model × RAM market price × exchange rate.

use std::sync::Arc;

use serde_json::Value;

use crate::chain::client::SharedChainRpc;
use crate::chain::types::TableRowsRequest;
use crate::pricing::feed::ExchangeRateFeed;
use crate::pricing::types::{
    EosBreakdown, FiatBreakdown, OperationBytes, PriceEstimate, PriceRequest, PricingError,
    PricingResult,
};

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Balances look like `"68719476736 RAM"` or `"1000000.0000 EOS"`.
fn strip_symbol(balance: &str) -> PricingResult<f64> {
    balance
        .len()
        .checked_sub(4)
        .and_then(|end| balance.get(..end))
        .and_then(|amount| amount.trim().parse().ok())
        .ok_or_else(|| PricingError::Market(format!("bad balance '{}'", balance)))
}

/// Weights come back as decimal strings; accept numbers too.
fn number(value: Option<&Value>, field: &str) -> PricingResult<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| PricingError::Market(format!("missing {}", field)))
}

/// EOS per byte from a `rammarket` row: `quote.balance / (base.balance × quote.weight)`.
pub fn ram_price_from_market(row: &Value) -> PricingResult<f64> {
    let balance = |side: &str| {
        row.get(side)
            .and_then(|s| s.get("balance"))
            .and_then(Value::as_str)
            .ok_or_else(|| PricingError::Market(format!("missing {}.balance", side)))
            .and_then(strip_symbol)
    };
    let quote_balance = balance("quote")?;
    let base_balance = balance("base")?;
    let quote_weight = number(row.get("quote").and_then(|q| q.get("weight")), "quote.weight")?;

    let denominator = base_balance * quote_weight;
    if denominator <= 0.0 || !denominator.is_finite() {
        return Err(PricingError::Market("empty RAM pool".to_string()));
    }
    Ok(quote_balance / denominator)
}

pub struct PriceEstimator {
    chain: SharedChainRpc,
    feed: Arc<dyn ExchangeRateFeed>,
    fiat_currency: String,
    fiat_symbol: String,
}

impl PriceEstimator {
    pub fn new(
        chain: SharedChainRpc,
        feed: Arc<dyn ExchangeRateFeed>,
        fiat_currency: impl Into<String>,
        fiat_symbol: impl Into<String>,
    ) -> Self {
        Self {
            chain,
            feed,
            fiat_currency: fiat_currency.into(),
            fiat_symbol: fiat_symbol.into(),
        }
    }

    /// Current EOS price of one byte of RAM.
    pub async fn ram_price(&self) -> PricingResult<f64> {
        let request = TableRowsRequest {
            json: true,
            code: "eosio".to_string(),
            scope: "eosio".to_string(),
            table: "rammarket".to_string(),
            lower_bound: None,
            upper_bound: None,
            limit: 1,
            reverse: false,
            show_payer: false,
        };
        let rows = self.chain.get_table_rows(&request).await?;
        let row = rows
            .rows
            .first()
            .ok_or_else(|| PricingError::Market("no rammarket row".to_string()))?;
        ram_price_from_market(row)
    }

    /// Validate, fetch both prices concurrently, then compute.
    pub async fn estimate(&self, request: &PriceRequest) -> PricingResult<PriceEstimate> {
        let bytes = OperationBytes::from_request(request)?;
        let (ram_price, rate) = tokio::try_join!(self.ram_price(), self.feed.rate())?;
        tracing::debug!(ram_price, rate, total_bytes = bytes.total(), "Computing fee estimate");
        Ok(compute(&bytes, ram_price, rate, &self.fiat_currency))
    }

    /// Human-readable summary of an estimate.
    pub fn message(&self, estimate: &PriceEstimate) -> String {
        format!(
            "Estimated fee for creation is {}{}",
            self.fiat_symbol, estimate.fiat_price.total_estimate
        )
    }
}

/// Pure fee arithmetic.
///
/// Fiat figures convert the already-rounded EOS figures, and the fiat total is
/// the sum of the rounded per-operation figures.
pub fn compute(bytes: &OperationBytes, ram_price: f64, rate: f64, fiat_currency: &str) -> PriceEstimate {
    let eos = |b: u64| format!("{:.4}", ram_price * b as f64);
    let eos_price = EosBreakdown {
        total_estimate: eos(bytes.total()),
        certificate: eos(bytes.certificate),
        create_signer: eos(bytes.signer_create),
        create_institution: eos(bytes.institution_create),
        add_signer: eos(bytes.signer_add),
        add_participant: eos(bytes.participant_add),
    };

    let fiat = |eos_figure: &str| round4(eos_figure.parse::<f64>().unwrap_or_default() * rate);
    let certificate = fiat(&eos_price.certificate);
    let create_signer = fiat(&eos_price.create_signer);
    let create_institution = fiat(&eos_price.create_institution);
    let add_signer = fiat(&eos_price.add_signer);
    let add_participant = fiat(&eos_price.add_participant);

    PriceEstimate {
        total_bytes: bytes.total(),
        eos_price,
        fiat_currency: fiat_currency.to_string(),
        fiat_price: FiatBreakdown {
            total_estimate: round4(certificate + create_signer + create_institution + add_signer + add_participant),
            certificate,
            create_signer,
            create_institution,
            add_signer,
            add_participant,
        },
    }
}
