//! One-time password codes for password resets.

use core::fmt;

use serde::{Deserialize, Serialize};

/// How long an issued code stays valid.
pub const OTP_TTL_MINUTES: i64 = 5;

/// Errors that can occur when parsing an [`OtpCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpCodeError {
    #[error("code must be exactly {expected} digits")]
    WrongLength { expected: usize },
    #[error("code must contain only digits")]
    NonDigit,
}

/// A six digit, zero padded one-time code such as `004217`.
///
/// ```
/// use stockroom_core::OtpCode;
///
/// assert_eq!(OtpCode::from_number(4217).as_str(), "004217");
/// assert!(OtpCode::parse("12345").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OtpCode(String);

impl OtpCode {
    pub const LENGTH: usize = 6;

    /// Upper bound (exclusive) for the numeric value of a code.
    pub const MODULUS: u32 = 1_000_000;

    /// Format `n` as a code. Values above six digits wrap.
    #[must_use]
    pub fn from_number(n: u32) -> Self {
        Self(format!("{:06}", n % Self::MODULUS))
    }

    /// Parse a user-supplied code, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error unless the input is exactly six ASCII digits.
    pub fn parse(s: &str) -> Result<Self, OtpCodeError> {
        let s = s.trim();
        if s.len() != Self::LENGTH {
            return Err(OtpCodeError::WrongLength {
                expected: Self::LENGTH,
            });
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OtpCodeError::NonDigit);
        }
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OtpCode {
    type Error = OtpCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OtpCode> for String {
    fn from(code: OtpCode) -> Self {
        code.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OtpCode {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OtpCode {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_number_pads() {
        assert_eq!(OtpCode::from_number(0).as_str(), "000000");
        assert_eq!(OtpCode::from_number(42).as_str(), "000042");
        assert_eq!(OtpCode::from_number(999_999).as_str(), "999999");
    }

    #[test]
    fn test_from_number_wraps() {
        assert_eq!(OtpCode::from_number(1_000_001).as_str(), "000001");
    }

    #[test]
    fn test_parse() {
        assert_eq!(OtpCode::parse(" 123456 ").unwrap().as_str(), "123456");
        assert_eq!(
            OtpCode::parse("12345"),
            Err(OtpCodeError::WrongLength { expected: 6 })
        );
        assert_eq!(OtpCode::parse("12a456"), Err(OtpCodeError::NonDigit));
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<OtpCode>("\"000777\"").is_ok());
        assert!(serde_json::from_str::<OtpCode>("\"77\"").is_err());
    }
}
