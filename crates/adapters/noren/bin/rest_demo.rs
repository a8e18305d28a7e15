// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Walks through the Noren REST API with a session login, then streams one touchline.
//!
//! Credentials come from `NOREN_*` variables (see [`NorenCredential::from_env`]). The second
//! login uses `NOREN_SECOND_*` when set.

use std::{fmt::Debug, sync::Arc, time::Duration};

use chrono::{Local, Utc};
use nautilus_adapters_noren::{
    common::{
        epoch_seconds_utc, format_noren_datetime, last_business_day, NorenPriceType,
        NorenProductType, NorenTransactionType,
    },
    http::{
        BasketItemBuilder, BasketMarginParams, LimitsParams, PlaceOrderParamsBuilder,
        QuoteParamsBuilder, SearchScripParamsBuilder, TimePriceSeriesParamsBuilder,
    },
    websocket::{NorenWsError, NorenWsMessage},
    NorenConfig, NorenCredential, NorenHttpClient, NorenWebSocketClient, NorenWsCallback,
};

const SUBSCRIPTION_KEY: &str = "NSE|22";

struct ExampleCallback;

impl NorenWsCallback for ExampleCallback {
    fn handle_open(&self) {
        println!("Feed open");
    }

    fn handle_message(&self, message: NorenWsMessage) {
        println!("{message:?}");
    }

    fn handle_error(&self, error: &NorenWsError) {
        println!("Feed error: {error}");
    }
}

fn report<T: Debug, E: std::fmt::Display>(label: &str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => {
            println!("{label}: {value:?}");
            Some(value)
        }
        Err(e) => {
            eprintln!("{label} failed: {e}");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    println!("Hello and Welcome to Noren!");

    let config = NorenConfig::from_env()?;
    config.validate()?;
    let credential = NorenCredential::from_env("NOREN")?;
    let api = NorenHttpClient::new(&config)?;

    report("login", api.login(&credential).await);

    let search = SearchScripParamsBuilder::default()
        .exchange("NSE")
        .search_text("TCS")
        .build()?;
    report("search", api.search_scrip(&search).await);

    report(
        "forgot password OTP",
        api.forgot_password_otp(credential.user_id.clone(), "AAAAA1234A")
            .await,
    );

    let quote = QuoteParamsBuilder::default()
        .exchange("NSE")
        .token("22")
        .build()?;
    report("quotes", api.get_quotes(&quote).await);

    report("limits", api.get_limits(&LimitsParams::default()).await);

    let order = PlaceOrderParamsBuilder::default()
        .transaction_type(NorenTransactionType::Buy)
        .product_type(NorenProductType::Mis)
        .exchange("NSE")
        .trading_symbol("CANBK-EQ")
        .qty(1u64)
        .price_type(NorenPriceType::Limit)
        .price(220.0)
        .remarks("rust")
        .build()?;
    report("place order", api.place_order(&order).await);

    let basket = vec![
        BasketItemBuilder::default()
            .exchange("NSE")
            .trading_symbol("CANBK-EQ")
            .qty(1u64)
            .price(220.0)
            .product_type(NorenProductType::Mis)
            .transaction_type(NorenTransactionType::Buy)
            .price_type(NorenPriceType::Limit)
            .build()?,
        BasketItemBuilder::default()
            .exchange("NSE")
            .trading_symbol("ACC-EQ")
            .qty(1u64)
            .price(2200.0)
            .product_type(NorenProductType::Mis)
            .transaction_type(NorenTransactionType::Sell)
            .price_type(NorenPriceType::Limit)
            .build()?,
    ];
    if let Some(params) = BasketMarginParams::new(basket) {
        report("basket margin", api.get_basket_margin(&params).await);
    }

    for (label, book) in [
        ("order book", api.get_order_book().await),
        ("trade book", api.get_trade_book().await),
        ("position book", api.get_position_book().await),
    ] {
        if let Some(Some(rows)) = report(label, book) {
            println!("{label}: {} rows", rows.len());
        }
    }

    let second = NorenCredential::from_env("NOREN_SECOND").unwrap_or(credential);
    if report("second login", api.login(&second).await).is_none() {
        return Ok(());
    }

    let business_day = last_business_day(Local::now().date_naive());
    println!("{}", format_noren_datetime(&business_day.and_time(chrono::NaiveTime::MIN)));

    let started = Utc::now();
    println!("The start time is: {}", started.timestamp_millis());
    let series = TimePriceSeriesParamsBuilder::default()
        .exchange("NSE")
        .token("10794")
        .start_time(epoch_seconds_utc(business_day - chrono::Days::new(2)))
        .end_time(started.timestamp())
        .build()?;
    let bars = api.get_time_price_series(&series).await;
    println!(
        "The time difference is: {} ms",
        (Utc::now() - started).num_milliseconds()
    );
    if let Some(Some(bars)) = report("time price series", bars) {
        println!("{} bars", bars.len());
    }

    let mut ws = NorenWebSocketClient::new(config, api.session());
    ws.start(Arc::new(ExampleCallback)).await?;
    ws.subscribe(&[SUBSCRIPTION_KEY])?;
    tokio::time::sleep(Duration::from_secs(10)).await;
    ws.unsubscribe(&[SUBSCRIPTION_KEY])?;

    let mut idle = tokio::time::interval(Duration::from_secs(2));
    loop {
        tokio::select! {
            _ = idle.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    ws.close().await;
    Ok(())
}
