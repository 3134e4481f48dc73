use broker_client::models::{AccountId, Instrument, PlaceOrderRequest};
use broker_client::BrokerApi;
use chrono::NaiveDate;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use super::event::{ApiEvent, AppEvent, QuoteTarget, SelectorOwner, TimerEvent};
use crate::persist::{Persistence, UiState};
use crate::settings::{self, ConfigPaths};

/// One deferred operation. Carries everything needed to run it so that the
/// orchestrator never reads UI state.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchAccounts,
    FetchPortfolio {
        account: AccountId,
        tag: u64,
    },
    FetchOrders {
        account: AccountId,
        tag: u64,
    },
    FetchQuotes {
        account: AccountId,
        instruments: Vec<Instrument>,
        target: QuoteTarget,
        tag: u64,
    },
    LookupInstrument {
        symbol: String,
        owner: SelectorOwner,
        tag: u64,
    },
    FetchExpirations {
        account: AccountId,
        instrument: Instrument,
        tag: u64,
    },
    FetchChain {
        account: AccountId,
        instrument: Instrument,
        expiration: NaiveDate,
        tag: u64,
    },
    FetchGreeks {
        account: AccountId,
        symbols: Vec<String>,
        chain_tag: u64,
    },
    PlaceOrder {
        account: AccountId,
        order: PlaceOrderRequest,
        tag: u64,
    },
    CancelOrder {
        account: AccountId,
        order_id: String,
    },
    FetchHistory {
        account: AccountId,
        page_size: u32,
        next_token: Option<String>,
        tag: u64,
    },
    SaveWatchlist(Vec<String>),
    SaveConfig {
        account: Option<AccountId>,
    },
    ScheduleRefresh(Duration),
    Batch(Vec<Command>),
}

impl Command {
    /// Flattens nested batches, preserving order.
    pub fn flatten(self) -> Vec<Command> {
        match self {
            Command::Batch(cmds) => cmds.into_iter().flat_map(Command::flatten).collect(),
            other => vec![other],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::FetchAccounts => "fetch_accounts",
            Command::FetchPortfolio { .. } => "fetch_portfolio",
            Command::FetchOrders { .. } => "fetch_orders",
            Command::FetchQuotes { .. } => "fetch_quotes",
            Command::LookupInstrument { .. } => "lookup_instrument",
            Command::FetchExpirations { .. } => "fetch_expirations",
            Command::FetchChain { .. } => "fetch_chain",
            Command::FetchGreeks { .. } => "fetch_greeks",
            Command::PlaceOrder { .. } => "place_order",
            Command::CancelOrder { .. } => "cancel_order",
            Command::FetchHistory { .. } => "fetch_history",
            Command::SaveWatchlist(_) => "save_watchlist",
            Command::SaveConfig { .. } => "save_config",
            Command::ScheduleRefresh(_) => "schedule_refresh",
            Command::Batch(_) => "batch",
        }
    }
}

/// Runs commands off the main loop; each reports back exactly once on `tx`.
#[derive(Clone)]
pub struct Orchestrator {
    api: BrokerApi,
    tx: UnboundedSender<AppEvent>,
    paths: ConfigPaths,
    ui_store: Persistence,
}

impl Orchestrator {
    pub fn new(
        api: BrokerApi,
        tx: UnboundedSender<AppEvent>,
        paths: ConfigPaths,
        ui_store: Persistence,
    ) -> Self {
        Self {
            api,
            tx,
            paths,
            ui_store,
        }
    }

    pub fn run(&self, cmd: Command) {
        tracing::debug!(target: "orchestrator", command = cmd.name(), "dispatch");
        match cmd {
            Command::Batch(cmds) => {
                for c in cmds {
                    self.run(c);
                }
            }
            Command::ScheduleRefresh(after) => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(AppEvent::Timer(TimerEvent::Refresh));
                });
            }
            Command::SaveWatchlist(symbols) => {
                let store = self.ui_store.clone();
                let ticket = store.ticket();
                let tx = self.tx.clone();
                tokio::task::spawn_blocking(move || {
                    let result = store
                        .save_ordered(ticket, &UiState::with_watchlist(symbols))
                        .map_err(|e| format!("{e:#}"));
                    if let Err(e) = &result {
                        tracing::warn!(target: "persist", error = %e, "saving watchlist failed");
                    }
                    let _ = tx.send(AppEvent::Api(ApiEvent::Saved {
                        what: "watchlist",
                        result,
                    }));
                });
            }
            Command::SaveConfig { account } => {
                let paths = self.paths.clone();
                let tx = self.tx.clone();
                tokio::task::spawn_blocking(move || {
                    let result = settings::save_account(&paths, account.map(|a| a.0))
                        .map_err(|e| format!("{e:#}"));
                    if let Err(e) = &result {
                        tracing::warn!(target: "persist", error = %e, "saving config failed");
                    }
                    let _ = tx.send(AppEvent::Api(ApiEvent::Saved {
                        what: "config",
                        result,
                    }));
                });
            }
            remote => {
                let api = self.api.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    if let Some(ev) = execute(&api, remote).await {
                        let _ = tx.send(AppEvent::Api(ev));
                    }
                });
            }
        }
    }
}

/// Performs one network command. Local commands (persistence, timers,
/// batches) are not handled here and yield `None`.
pub async fn execute(api: &BrokerApi, cmd: Command) -> Option<ApiEvent> {
    let ev = match cmd {
        Command::FetchAccounts => ApiEvent::Accounts(api.accounts().await),
        Command::FetchPortfolio { account, tag } => ApiEvent::Portfolio {
            tag,
            result: api.portfolio(&account).await,
        },
        Command::FetchOrders { account, tag } => ApiEvent::Orders {
            tag,
            result: api.portfolio(&account).await,
        },
        Command::FetchQuotes {
            account,
            instruments,
            target,
            tag,
        } => ApiEvent::Quotes {
            target,
            tag,
            result: api.quotes(&account, instruments).await,
        },
        Command::LookupInstrument { symbol, owner, tag } => {
            let kind = if symbol.parse::<broker_client::osi::OsiSymbol>().is_ok() {
                broker_client::models::InstrumentType::Option
            } else {
                broker_client::models::InstrumentType::Equity
            };
            let result = api.instrument(&symbol, kind).await;
            ApiEvent::Instrument {
                owner,
                tag,
                symbol,
                result,
            }
        }
        Command::FetchExpirations {
            account,
            instrument,
            tag,
        } => ApiEvent::Expirations {
            tag,
            result: api.option_expirations(&account, instrument).await,
        },
        Command::FetchChain {
            account,
            instrument,
            expiration,
            tag,
        } => ApiEvent::Chain {
            tag,
            result: api.option_chain(&account, instrument, expiration).await,
        },
        Command::FetchGreeks {
            account,
            symbols,
            chain_tag,
        } => {
            let result = api.greeks(&account, &symbols).await;
            ApiEvent::Greeks {
                chain_tag,
                symbols,
                result,
            }
        }
        Command::PlaceOrder {
            account,
            order,
            tag,
        } => {
            tracing::info!(
                target: "orchestrator",
                symbol = %order.instrument.symbol,
                side = %order.order_side,
                order_type = %order.order_type,
                "placing order"
            );
            ApiEvent::OrderPlaced {
                tag,
                result: api.place_order(&account, &order).await,
            }
        }
        Command::CancelOrder { account, order_id } => {
            tracing::info!(target: "orchestrator", order_id = %order_id, "cancelling order");
            let result = api.cancel_order(&account, &order_id).await;
            ApiEvent::OrderCancelled { order_id, result }
        }
        Command::FetchHistory {
            account,
            page_size,
            next_token,
            tag,
        } => {
            let append = next_token.is_some();
            ApiEvent::History {
                tag,
                append,
                result: api.history(&account, page_size, next_token.as_deref()).await,
            }
        }
        Command::SaveWatchlist(_)
        | Command::SaveConfig { .. }
        | Command::ScheduleRefresh(_)
        | Command::Batch(_) => return None,
    };
    if let Some(err) = failure(&ev) {
        tracing::warn!(target: "orchestrator", error = %err, "command failed");
    }
    Some(ev)
}

fn failure(ev: &ApiEvent) -> Option<&broker_client::ApiError> {
    match ev {
        ApiEvent::Accounts(r) => r.as_ref().err(),
        ApiEvent::Portfolio { result, .. } | ApiEvent::Orders { result, .. } => result.as_ref().err(),
        ApiEvent::Quotes { result, .. } => result.as_ref().err(),
        ApiEvent::Instrument { result, .. } => result.as_ref().err(),
        ApiEvent::Expirations { result, .. } => result.as_ref().err(),
        ApiEvent::Chain { result, .. } => result.as_ref().err(),
        ApiEvent::Greeks { result, .. } => result.as_ref().err(),
        ApiEvent::OrderPlaced { result, .. } => result.as_ref().err(),
        ApiEvent::OrderCancelled { result, .. } => result.as_ref().err(),
        ApiEvent::History { result, .. } => result.as_ref().err(),
        ApiEvent::Saved { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_flatten_in_order() {
        let cmd = Command::Batch(vec![
            Command::SaveWatchlist(vec!["A".into()]),
            Command::Batch(vec![Command::FetchAccounts, Command::ScheduleRefresh(Duration::from_secs(1))]),
        ]);
        assert_eq!(
            cmd.flatten(),
            vec![
                Command::SaveWatchlist(vec!["A".into()]),
                Command::FetchAccounts,
                Command::ScheduleRefresh(Duration::from_secs(1)),
            ]
        );
    }
}
