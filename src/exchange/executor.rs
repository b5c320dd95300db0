//! # exchange::executor
//!
//! **Order Executor** — ส่ง Market Order ไปที่ Exchange หรือจำลอง Fill
//!
//! ## Binance API Contract
//! `POST /api/v3/order` (or `/api/v3/order/test`) with a signed form body:
//! ```text
//! symbol=BTCUSDT&side=BUY&type=MARKET&quantity=0.001&newOrderRespType=FULL
//!   &recvWindow=5000&timestamp=<ms>&signature=<hex hmac-sha256(query, secret)>
//! ```
//! Success returns `orderId`, `transactTime`, `executedQty`,
//! `cummulativeQuoteQty` and per-trade `fills`; the average fill price is
//! quote / executed.  A BUY commission charged in the base asset is taken out
//! of the bought quantity, so the recorded quantity is what the account holds.
//! Failures return `{ "code": -2010, "msg": "..." }`.
//!
//! Free balances come from the signed `GET /api/v3/account`.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{error, info, warn};

use crate::config::ExchangeCredentials;
use crate::error::{BotError, OrderErrorKind};
use crate::exchange::{Fill, OrderExecutor, OrderRequest, Side};

type HmacSha256 = Hmac<Sha256>;

const RECV_WINDOW_MS: u64 = 5000;

/// Binance: "Account has insufficient balance for requested action."
const CODE_INSUFFICIENT_BALANCE: i64 = -2010;

// ─── Pre-flight ───────────────────────────────────────────────────────────────

/// Exchange minimum order value.  Entries below it are refused locally; exits
/// always go out so a position that lost value can still be closed.
pub fn check_min_notional(order: &OrderRequest, min_notional: f64) -> Result<(), BotError> {
    let notional = order.notional();
    if !(order.quantity > 0.0) {
        return Err(BotError::order(
            OrderErrorKind::Rejected,
            format!("quantity must be positive (got {})", order.quantity),
        ));
    }
    if order.side == Side::Buy && notional < min_notional {
        return Err(BotError::order(
            OrderErrorKind::BelowMinNotional,
            format!("Order size too small: {notional:.2} < minimum {min_notional:.2}"),
        ));
    }
    Ok(())
}

// ─── Paper ────────────────────────────────────────────────────────────────────

/// Fills every order instantly at its reference price against a virtual
/// quote balance.
pub struct PaperExecutor {
    min_notional: f64,
    balance:      Mutex<f64>,
}

impl PaperExecutor {
    pub fn new(min_notional: f64, starting_balance: f64) -> Self {
        Self {
            min_notional,
            balance: Mutex::new(starting_balance),
        }
    }
}

#[async_trait]
impl OrderExecutor for PaperExecutor {
    async fn submit_market_order(&self, order: &OrderRequest) -> Result<Fill, BotError> {
        check_min_notional(order, self.min_notional)?;

        {
            let mut balance = self.balance.lock().unwrap_or_else(|e| e.into_inner());
            match order.side {
                Side::Buy if order.notional() > *balance => {
                    return Err(BotError::order(
                        OrderErrorKind::InsufficientFunds,
                        format!("paper balance {:.2} < order value {:.2}", *balance, order.notional()),
                    ));
                }
                Side::Buy  => *balance -= order.notional(),
                Side::Sell => *balance += order.notional(),
            }
        }

        let order_id = format!("PAPER-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
        info!(
            order_id = %order_id,
            side     = %order.side,
            quantity = order.quantity,
            price    = order.reference_price,
            "🎭 [EXECUTOR] Paper fill recorded"
        );

        Ok(Fill {
            order_id,
            fill_price: order.reference_price,
            quantity:   order.quantity,
            filled_at:  Utc::now(),
            simulated:  true,
        })
    }

    async fn quote_balance(&self) -> Result<f64, BotError> {
        Ok(*self.balance.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn is_paper(&self) -> bool {
        true
    }
}

// ─── Binance ──────────────────────────────────────────────────────────────────

pub struct BinanceExecutor {
    client:        reqwest::Client,
    base_url:      String,
    credentials:   ExchangeCredentials,
    min_notional:  f64,
    /// Asset whose free balance funds entries, e.g. `USDT`.
    quote_asset:   String,
    /// Post to `/api/v3/order/test`: validated by the exchange, never executed.
    test_endpoint: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id:              Option<u64>,
    transact_time:         Option<i64>,
    executed_qty:          Option<String>,
    cummulative_quote_qty: Option<String>,
    status:                Option<String>,
    #[serde(default)]
    fills:                 Vec<TradeFill>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeFill {
    commission:       String,
    commission_asset: String,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
struct AssetBalance {
    asset: String,
    free:  String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: i64,
    msg:  String,
}

impl BinanceExecutor {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        credentials: ExchangeCredentials,
        min_notional: f64,
        quote_asset: impl Into<String>,
        test_endpoint: bool,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            min_notional,
            quote_asset: quote_asset.into().to_uppercase(),
            test_endpoint,
        }
    }

    fn signed_query(&self, order: &OrderRequest, timestamp_ms: i64) -> Result<String, BotError> {
        self.sign_params(&format!(
            "symbol={}&side={}&type=MARKET&quantity={}&newOrderRespType=FULL",
            order.symbol, order.side, order.quantity
        ), timestamp_ms)
    }

    /// Appends `recvWindow`, `timestamp` and the signature to `params`.
    fn sign_params(&self, params: &str, timestamp_ms: i64) -> Result<String, BotError> {
        let query = format!("{params}&recvWindow={RECV_WINDOW_MS}&timestamp={timestamp_ms}");
        let signature = sign(&self.credentials.api_secret, &query)?;
        Ok(format!("{query}&signature={signature}"))
    }
}

/// Hex HMAC-SHA256 of `payload`.
pub fn sign(secret: &str, payload: &str) -> Result<String, BotError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| BotError::order(OrderErrorKind::Rejected, format!("invalid API secret: {e}")))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Exchange error body → error kind.
fn classify_rejection(status: reqwest::StatusCode, body: &str) -> BotError {
    if status.is_server_error() {
        return BotError::order(OrderErrorKind::Transient, format!("HTTP {status}: {body}"));
    }

    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) if err.code == CODE_INSUFFICIENT_BALANCE
            && err.msg.to_lowercase().contains("insufficient balance") =>
        {
            BotError::order(OrderErrorKind::InsufficientFunds, err.msg)
        }
        Ok(err) => BotError::order(OrderErrorKind::Rejected, format!("code={} {}", err.code, err.msg)),
        Err(_)  => BotError::order(OrderErrorKind::Rejected, format!("HTTP {status}: {body}")),
    }
}

#[async_trait]
impl OrderExecutor for BinanceExecutor {
    async fn submit_market_order(&self, order: &OrderRequest) -> Result<Fill, BotError> {
        check_min_notional(order, self.min_notional)?;

        let path = if self.test_endpoint { "/api/v3/order/test" } else { "/api/v3/order" };
        let query = self.signed_query(order, Utc::now().timestamp_millis())?;

        info!(
            symbol   = %order.symbol,
            side     = %order.side,
            quantity = order.quantity,
            price    = order.reference_price,
            test     = self.test_endpoint,
            "🚀 [EXECUTOR] Sending market order"
        );

        // ── HTTP POST ─────────────────────────────────────────────────────────
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("X-MBX-APIKEY", &self.credentials.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(query)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, path, "Exchange unreachable");
                BotError::order(OrderErrorKind::Transient, format!("exchange unreachable: {e}"))
            })?;

        // ── HTTP Status ───────────────────────────────────────────────────────
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let err = classify_rejection(status, &body);
            error!(http_status = %status, error = %err, "Order rejected");
            return Err(err);
        }

        if self.test_endpoint {
            warn!("Test endpoint accepted order — recording simulated fill");
            return Ok(Fill {
                order_id:   "TEST".to_string(),
                fill_price: order.reference_price,
                quantity:   order.quantity,
                filled_at:  Utc::now(),
                simulated:  true,
            });
        }

        // ── Parse Response ────────────────────────────────────────────────────
        let resp: OrderResponse = serde_json::from_str(&body).map_err(|e| {
            BotError::order(OrderErrorKind::Transient, format!("order response parse error: {e}"))
        })?;

        let fill = fill_from_response(&resp, order)?;
        info!(
            order_id = %fill.order_id,
            price    = fill.fill_price,
            quantity = fill.quantity,
            "✅ [EXECUTOR] Order filled"
        );
        Ok(fill)
    }

    async fn quote_balance(&self) -> Result<f64, BotError> {
        let query = self.sign_params("omitZeroBalances=true", Utc::now().timestamp_millis())?;

        let response = self
            .client
            .get(format!("{}/api/v3/account?{query}", self.base_url))
            .header("X-MBX-APIKEY", &self.credentials.api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| BotError::DataFetch(format!("account unreachable: {}", e.without_url())))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(BotError::DataFetch(format!("account HTTP {status}: {body}")));
        }

        let account: AccountResponse = serde_json::from_str(&body)
            .map_err(|e| BotError::DataFetch(format!("account parse error: {e}")))?;
        free_balance(&account, &self.quote_asset)
    }
}

/// Free amount of `asset`; an asset missing from the list holds nothing.
fn free_balance(account: &AccountResponse, asset: &str) -> Result<f64, BotError> {
    match account.balances.iter().find(|b| b.asset.eq_ignore_ascii_case(asset)) {
        Some(b) => b
            .free
            .parse::<f64>()
            .map_err(|e| BotError::DataFetch(format!("bad {asset} balance '{}': {e}", b.free))),
        None => Ok(0.0),
    }
}

fn fill_from_response(resp: &OrderResponse, order: &OrderRequest) -> Result<Fill, BotError> {
    if let Some(status) = resp.status.as_deref() {
        if status != "FILLED" {
            return Err(BotError::order(
                OrderErrorKind::Rejected,
                format!("order not filled: status={status}"),
            ));
        }
    }

    let executed: f64 = resp
        .executed_qty
        .as_deref()
        .and_then(|q| q.parse().ok())
        .unwrap_or(0.0);
    let quote: f64 = resp
        .cummulative_quote_qty
        .as_deref()
        .and_then(|q| q.parse().ok())
        .unwrap_or(0.0);

    if executed <= 0.0 {
        return Err(BotError::order(OrderErrorKind::Rejected, "order executed zero quantity"));
    }

    // ค่าธรรมเนียมฝั่ง BUY ถูกหักจากเหรียญที่ได้ (ยกเว้นจ่ายด้วย BNB)
    let base_commission: f64 = match order.side {
        Side::Buy => resp
            .fills
            .iter()
            .filter(|f| !f.commission_asset.is_empty() && order.symbol.starts_with(f.commission_asset.as_str()))
            .filter_map(|f| f.commission.parse::<f64>().ok())
            .sum(),
        Side::Sell => 0.0,
    };
    let quantity = ((executed - base_commission) * 1e8).round() / 1e8;
    if quantity <= 0.0 {
        return Err(BotError::order(
            OrderErrorKind::Rejected,
            format!("commission {base_commission} consumed the executed quantity {executed}"),
        ));
    }

    let filled_at = resp
        .transact_time
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now);

    Ok(Fill {
        order_id:   resp.order_id.map(|id| id.to_string()).unwrap_or_default(),
        fill_price: if quote > 0.0 { quote / executed } else { order.reference_price },
        quantity,
        filled_at,
        simulated:  false,
    })
}
