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

//! Enumerations for the Noren adapter.
//!
//! Order enums serialize to the short codes the OMS expects on the wire (`B`, `LMT`, `DAY`...).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Connecting,
    Reconnecting,
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "CONNECTED"),
            ConnectionStatus::Disconnected => write!(f, "DISCONNECTED"),
            ConnectionStatus::Connecting => write!(f, "CONNECTING"),
            ConnectionStatus::Reconnecting => write!(f, "RECONNECTING"),
            ConnectionStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NorenTransactionType {
    #[serde(rename = "B")]
    Buy,
    #[serde(rename = "S")]
    Sell,
}

/// Product under which an order is booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NorenProductType {
    /// Cash and carry (delivery).
    #[serde(rename = "C")]
    Cnc,
    /// Normal margin (carry forward derivatives).
    #[serde(rename = "M")]
    Nrml,
    /// Intraday margin.
    #[serde(rename = "I")]
    Mis,
    /// Bracket order.
    #[serde(rename = "B")]
    Bracket,
    /// Cover order.
    #[serde(rename = "H")]
    Cover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NorenPriceType {
    #[serde(rename = "LMT")]
    Limit,
    #[serde(rename = "MKT")]
    Market,
    #[serde(rename = "SL-LMT")]
    StopLossLimit,
    #[serde(rename = "SL-MKT")]
    StopLossMarket,
}

/// Order validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NorenRetention {
    #[default]
    #[serde(rename = "DAY")]
    Day,
    #[serde(rename = "EOS")]
    Eos,
    #[serde(rename = "IOC")]
    Ioc,
}

macro_rules! impl_wire_code {
    ($ty:ty { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $ty {
            /// Returns the code used on the wire.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $code,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($code => Ok(Self::$variant),)+
                    other => Err(format!(
                        "invalid {} code '{other}'",
                        stringify!($ty)
                    )),
                }
            }
        }
    };
}

impl_wire_code!(NorenTransactionType { Buy => "B", Sell => "S" });
impl_wire_code!(NorenProductType {
    Cnc => "C",
    Nrml => "M",
    Mis => "I",
    Bracket => "B",
    Cover => "H",
});
impl_wire_code!(NorenPriceType {
    Limit => "LMT",
    Market => "MKT",
    StopLossLimit => "SL-LMT",
    StopLossMarket => "SL-MKT",
});
impl_wire_code!(NorenRetention { Day => "DAY", Eos => "EOS", Ioc => "IOC" });

impl NorenPriceType {
    /// Whether orders of this type need a trigger price.
    #[must_use]
    pub const fn requires_trigger(&self) -> bool {
        matches!(self, Self::StopLossLimit | Self::StopLossMarket)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(NorenPriceType::Limit, "\"LMT\"")]
    #[case(NorenPriceType::StopLossMarket, "\"SL-MKT\"")]
    fn test_price_type_serialization(#[case] price_type: NorenPriceType, #[case] expected: &str) {
        assert_eq!(serde_json::to_string(&price_type).unwrap(), expected);
        assert_eq!(price_type.to_string(), expected.trim_matches('"'));
    }

    #[rstest]
    #[case("B", NorenTransactionType::Buy)]
    #[case("S", NorenTransactionType::Sell)]
    fn test_transaction_type_from_str(#[case] code: &str, #[case] expected: NorenTransactionType) {
        assert_eq!(code.parse::<NorenTransactionType>().unwrap(), expected);
    }

    #[rstest]
    fn test_product_type_invalid_code() {
        let err = "X".parse::<NorenProductType>().unwrap_err();
        assert!(err.contains("NorenProductType"));
    }

    #[rstest]
    fn test_requires_trigger() {
        assert!(NorenPriceType::StopLossLimit.requires_trigger());
        assert!(!NorenPriceType::Limit.requires_trigger());
    }

    #[rstest]
    fn test_connection_status_display() {
        assert_eq!(ConnectionStatus::Reconnecting.to_string(), "RECONNECTING");
    }
}
