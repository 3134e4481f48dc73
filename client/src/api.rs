use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::auth::TokenManager;
use crate::error::ApiError;
use crate::models::*;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

const GATEWAY: &str = "/userapigateway";

/// Authorized access to the brokerage REST surface.
///
/// Every call carries the current bearer token. A 401 triggers one token
/// refresh and exactly one replay of the same request.
#[derive(Clone)]
pub struct BrokerApi {
    transport: Arc<dyn HttpTransport>,
    tokens: Arc<TokenManager>,
}

impl BrokerApi {
    pub fn new(transport: Arc<dyn HttpTransport>, tokens: Arc<TokenManager>) -> Self {
        Self { transport, tokens }
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let token = self.tokens.current_token().await?;
        let first = self.transport.execute(&request, Some(&token)).await?;
        if first.status != 401 {
            return Ok(first);
        }

        log::info!(target: "api", "401 on {}, refreshing token and retrying once", request.path);
        let retry_token = match self.tokens.force_refresh(&token).await {
            Ok(fresh) => fresh,
            Err(e) => {
                log::warn!(target: "api", "token refresh failed, retrying with old token: {e}");
                token
            }
        };
        self.transport.execute(&request, Some(&retry_token)).await
    }

    async fn call<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, ApiError> {
        let resp = self.send(request).await?;
        decode(resp)
    }

    pub async fn accounts(&self) -> Result<Vec<Account>, ApiError> {
        let resp: AccountsResponse = self
            .call(HttpRequest::get(format!("{GATEWAY}/trading/account")))
            .await?;
        Ok(resp.accounts)
    }

    pub async fn portfolio(&self, account: &AccountId) -> Result<Portfolio, ApiError> {
        self.call(HttpRequest::get(format!("{GATEWAY}/trading/{account}/portfolio/v2")))
            .await
    }

    pub async fn quotes(
        &self,
        account: &AccountId,
        instruments: Vec<Instrument>,
    ) -> Result<Vec<Quote>, ApiError> {
        if instruments.is_empty() {
            return Ok(Vec::new());
        }
        let req = HttpRequest::post(
            format!("{GATEWAY}/marketdata/{account}/quotes"),
            &QuotesRequest { instruments },
        )?;
        let resp: QuotesResponse = self.call(req).await?;
        Ok(resp.quotes)
    }

    pub async fn instrument(
        &self,
        symbol: &str,
        kind: InstrumentType,
    ) -> Result<InstrumentDetails, ApiError> {
        self.call(HttpRequest::get(format!(
            "{GATEWAY}/trading/instruments/{symbol}/{kind}"
        )))
        .await
    }

    pub async fn option_expirations(
        &self,
        account: &AccountId,
        instrument: Instrument,
    ) -> Result<Vec<NaiveDate>, ApiError> {
        let req = HttpRequest::post(
            format!("{GATEWAY}/marketdata/{account}/option-expirations"),
            &OptionExpirationsRequest { instrument },
        )?;
        let resp: OptionExpirationsResponse = self.call(req).await?;
        Ok(resp.expirations)
    }

    pub async fn option_chain(
        &self,
        account: &AccountId,
        instrument: Instrument,
        expiration_date: NaiveDate,
    ) -> Result<OptionChain, ApiError> {
        let req = HttpRequest::post(
            format!("{GATEWAY}/marketdata/{account}/option-chain"),
            &OptionChainRequest {
                instrument,
                expiration_date,
            },
        )?;
        self.call(req).await
    }

    pub async fn greeks(
        &self,
        account: &AccountId,
        osi_symbols: &[String],
    ) -> Result<Vec<OptionGreeks>, ApiError> {
        if osi_symbols.is_empty() {
            return Ok(Vec::new());
        }
        let req = osi_symbols.iter().fold(
            HttpRequest::get(format!("{GATEWAY}/option-details/{account}/greeks")),
            |req, s| req.query("osiSymbols", s.as_str()),
        );
        let resp: GreeksResponse = self.call(req).await?;
        Ok(resp.greeks)
    }

    pub async fn place_order(
        &self,
        account: &AccountId,
        order: &PlaceOrderRequest,
    ) -> Result<PlaceOrderResponse, ApiError> {
        let req = HttpRequest::post(format!("{GATEWAY}/trading/{account}/order"), order)?;
        self.call(req).await
    }

    pub async fn cancel_order(&self, account: &AccountId, order_id: &str) -> Result<(), ApiError> {
        let resp = self
            .send(HttpRequest::delete(format!(
                "{GATEWAY}/trading/{account}/order/{order_id}"
            )))
            .await?;
        if resp.is_success() {
            Ok(())
        } else {
            Err(ApiError::from_status(resp.status, &resp.bytes))
        }
    }

    pub async fn history(
        &self,
        account: &AccountId,
        page_size: u32,
        next_token: Option<&str>,
    ) -> Result<HistoryPage, ApiError> {
        let mut req = HttpRequest::get(format!("{GATEWAY}/trading/{account}/history"))
            .query("pageSize", page_size.to_string());
        if let Some(token) = next_token {
            req = req.query("nextToken", token);
        }
        self.call(req).await
    }
}

fn decode<T: DeserializeOwned>(resp: HttpResponse) -> Result<T, ApiError> {
    if !resp.is_success() {
        return Err(ApiError::from_status(resp.status, &resp.bytes));
    }
    serde_json::from_slice(&resp.bytes).map_err(|e| ApiError::Decode(e.to_string()))
}
