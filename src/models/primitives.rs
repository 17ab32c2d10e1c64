//! Primitive types and newtypes for type-safe API interactions.
//!
//! Strongly-typed wrappers around string identifiers so a customer
//! number can never be passed where a channel code is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A strongly-typed customer number.
///
/// Customer numbers key the per-customer session registry.
///
/// # Example
///
/// ```
/// use gtn_rs::CustomerNumber;
///
/// let customer = CustomerNumber::new("100234");
/// println!("Customer: {}", customer);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerNumber(String);

impl CustomerNumber {
    /// Create a new customer number from a string.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the customer number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CustomerNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for CustomerNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CustomerNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A named API variant selecting which token endpoint table applies.
///
/// Channel codes are upper-cased on construction, so `"trade"` and
/// `"TRADE"` name the same channel.
///
/// # Example
///
/// ```
/// use gtn_rs::Channel;
///
/// let channel = Channel::new("dwm");
/// assert_eq!(channel.as_str(), "DWM");
/// assert_eq!(Channel::default(), Channel::trade());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct Channel(String);

impl Channel {
    /// Channel code of the trading API.
    pub const TRADE: &'static str = "TRADE";
    /// Channel code of the micro-invest (DWM) API.
    pub const DWM: &'static str = "DWM";

    /// Create a channel from a code.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// The trading channel.
    pub fn trade() -> Self {
        Self(Self::TRADE.to_string())
    }

    /// The micro-invest channel.
    pub fn dwm() -> Self {
        Self(Self::DWM.to_string())
    }

    /// Get the channel code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::trade()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Channel {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Channel {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
