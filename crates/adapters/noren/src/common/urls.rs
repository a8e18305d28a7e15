//! Route table and URL helpers for the Noren REST API.

use std::fmt;

/// Paths of the Noren REST endpoints, relative to the configured base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NorenRoute {
    QuickAuth,
    Logout,
    ForgotPasswordOtp,
    GenerateAccessToken,
    SearchScrip,
    GetQuotes,
    Limits,
    PlaceOrder,
    ModifyOrder,
    CancelOrder,
    BasketMargin,
    OrderBook,
    TradeBook,
    PositionBook,
    Holdings,
    SingleOrderHistory,
    TimePriceSeries,
}

impl NorenRoute {
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            NorenRoute::QuickAuth => "/QuickAuth",
            NorenRoute::Logout => "/Logout",
            NorenRoute::ForgotPasswordOtp => "/FgtPwdOTP",
            NorenRoute::GenerateAccessToken => "/GenAcsTok",
            NorenRoute::SearchScrip => "/SearchScrip",
            NorenRoute::GetQuotes => "/GetQuotes",
            NorenRoute::Limits => "/Limits",
            NorenRoute::PlaceOrder => "/PlaceOrder",
            NorenRoute::ModifyOrder => "/ModifyOrder",
            NorenRoute::CancelOrder => "/CancelOrder",
            NorenRoute::BasketMargin => "/GetBasketMargin",
            NorenRoute::OrderBook => "/OrderBook",
            NorenRoute::TradeBook => "/TradeBook",
            NorenRoute::PositionBook => "/PositionBook",
            NorenRoute::Holdings => "/Holdings",
            NorenRoute::SingleOrderHistory => "/SingleOrdHist",
            NorenRoute::TimePriceSeries => "/TPSeries",
        }
    }

    /// Whether the endpoint can be called before a session exists.
    #[must_use]
    pub const fn is_public(&self) -> bool {
        matches!(
            self,
            NorenRoute::QuickAuth | NorenRoute::ForgotPasswordOtp | NorenRoute::GenerateAccessToken
        )
    }
}

impl fmt::Display for NorenRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone)]
pub struct NorenUrl {
    base_url: String,
}

impl NorenUrl {
    /// Creates a new URL builder. A trailing slash on `base_url` is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn route_url(&self, route: NorenRoute) -> String {
        format!("{}{}", self.base_url, route.path())
    }
}

impl fmt::Display for NorenUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}
