//! Enumeration types for the Monzo API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Kind of Monzo account, derived from the provider's `type` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Sole current account (`uk_retail`)
    #[default]
    Personal,
    /// Joint current account (`uk_retail_joint`)
    Joint,
    /// Legacy prepaid card (`uk_prepaid`)
    Prepaid,
}

impl AccountType {
    /// All account types, in the order the API documents them.
    pub const ALL: [AccountType; 3] = [AccountType::Personal, AccountType::Joint, AccountType::Prepaid];

    /// Map a provider `type` code onto an account type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAccountType`] for any code outside the fixed table.
    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "uk_retail" => Ok(AccountType::Personal),
            "uk_retail_joint" => Ok(AccountType::Joint),
            "uk_prepaid" => Ok(AccountType::Prepaid),
            other => Err(Error::UnknownAccountType(other.to_string())),
        }
    }

    /// The provider code for this account type.
    pub fn code(&self) -> &'static str {
        match self {
            AccountType::Personal => "uk_retail",
            AccountType::Joint => "uk_retail_joint",
            AccountType::Prepaid => "uk_prepaid",
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Personal => "personal",
            AccountType::Joint => "joint",
            AccountType::Prepaid => "prepaid",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AccountType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "account must be one of personal, joint or prepaid (got {:?})",
                    s
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_table() {
        assert_eq!(AccountType::from_code("uk_retail").unwrap(), AccountType::Personal);
        assert_eq!(AccountType::from_code("uk_retail_joint").unwrap(), AccountType::Joint);
        assert_eq!(AccountType::from_code("uk_prepaid").unwrap(), AccountType::Prepaid);
    }

    #[test]
    fn test_unknown_code() {
        match AccountType::from_code("uk_business") {
            Err(Error::UnknownAccountType(code)) => assert_eq!(code, "uk_business"),
            other => panic!("expected UnknownAccountType, got {:?}", other),
        }
    }

    #[test]
    fn test_code_round_trip() {
        for kind in AccountType::ALL {
            assert_eq!(AccountType::from_code(kind.code()).unwrap(), kind);
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("joint".parse::<AccountType>().unwrap(), AccountType::Joint);
        assert_eq!("Personal".parse::<AccountType>().unwrap(), AccountType::Personal);
        assert!("savings".parse::<AccountType>().is_err());
    }
}
