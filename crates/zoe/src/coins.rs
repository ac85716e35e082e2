//! Coin types and amount helpers.

use thiserror::Error;

/// The native coin type.
pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

/// Decimals of the native coin.
pub const SUI_DECIMALS: u8 = 9;

/// Number of MIST in one SUI.
pub const MIST_PER_SUI: u64 = 1_000_000_000;

/// Coins that can be traded through the Aftermath router.
pub const SUPPORTED_COINS: [&str; 21] = [
    "0x2::sui::SUI",
    "0xa8816d3a6e3136e86bc2873b1f94a15cadc8af2703c075f2d546c2ae367f4df9::ocean::OCEAN",
    "0x5d4b302506645c37ff133b98c4b50a5ae14841659738d6d733d59d0d217a93bf::coin::COIN",
    "0xc060006111016b8a020ad5b33834984a437aaa7d3c74c18e09a95d48aceab08c::coin::COIN",
    "0xbff8dc60d3f714f678cd4490ff08cabbea95d308c6de47a150c79cc875e0c7c6::sbox::SBOX",
    "0x361dd589b98e8fcda9a7ee53b85efabef3569d00416640d2faa516e3801d7ffc::TOKEN::TOKEN",
    "0xea65bb5a79ff34ca83e2995f9ff6edd0887b08da9b45bf2e31f930d3efb82866::s::S",
    "0x506a6fc25f1c7d52ceb06ea44a3114c9380f8e2029b4356019822f248b49e411::memefi::MEMEFI",
    "0x5145494a5f5100e645e4b0aa950fa6b68f614e8c59e17bc5ded3495123a79178::ns::NS",
    "0x06864a6f921804860930db6ddbe2e16acdf8504495ea7481637a1c8b9a8fe54b::cetus::CETUS",
    "0xce7ff77a83ea0cb6fd39bd8748e2ec89a3f41e8efdc3f4eb123e0ca37b184db2::buck::BUCK",
    "0xdba34672e30cb065b1f93e3ab55318768fd6fef66c15942c9f7cb846e2f900e7::usdc::USDC",
    "0x7016aae72cfc67f2fadf55769c0a7dd54291a583b63051a5ed71081cce836ac6::sca::SCA",
    "0x5d1f47ea69bb0de31c313d7acf89b890dbb8991ea8e03c6c355171f84bb1ba4a::turbos::TURBOS",
    "0xfa7ac3951fdca92c5200d468d31a365eb03b2be9936fde615e69f0c1274ad3a0::BLUB::BLUB",
    "0x76cb819b01abed502bee8a702b4c2d547532c12f25001c9dea795a5e631c26f1::fud::FUD",
    "0xa340e3db1332c21f20f5c08bef0fa459e733575f9a7e2f5faca64f72cd5a54f2::fomo::FOMO",
    "0xb779486cfd6c19e9218cc7dc17c453014d2d9ba12d2ee4dbb0ec4e1e02ae1cca::spt::SPT",
    "0xdeeb7a4662eec9f2f3def03fb937a663dddaa2e215b8078a284d026b7946c270::deep::DEEP",
    "0xe1b45a0e641b9955a20aa0ad1c1f4ad86aad8afb07296d4085e349a50e90bdca::blue::BLUE",
    "0x83556891f4a0f233ce7b05cfe7f957d4020492a34f5405b2cb9377d060bef4bf::spring_sui::SPRING_SUI",
];

/// An amount or identifier that cannot be used.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AmountError {
    /// The amount is blank.
    #[error("empty amount")]
    Empty,
    /// The amount is not a non-negative integer.
    #[error("`{0}` is not an amount in base units")]
    Malformed(String),
    /// The amount does not fit.
    #[error("amount `{0}` is too large")]
    Overflow(String),
    /// The amount is zero.
    #[error("amount must be greater than zero")]
    Zero,
}

/// Parses a positive amount given in base units.
pub fn parse_base_amount(s: &str) -> Result<u64, AmountError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(AmountError::Empty);
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::Malformed(s.to_owned()));
    }
    let amount: u64 =
        s.parse().map_err(|_| AmountError::Overflow(s.to_owned()))?;
    if amount == 0 {
        return Err(AmountError::Zero);
    }
    Ok(amount)
}

/// Formats a base-unit amount as a decimal string without using floats.
///
/// `1_500_000` with 6 decimals gives `"1.5"`.
pub fn format_base_amount(base: u128, decimals: u8) -> String {
    if decimals == 0 {
        return base.to_string();
    }
    let Some(scale) = 10_u128.checked_pow(decimals.into()) else {
        return base.to_string();
    };
    let whole = base / scale;
    let frac = base % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0width$}", width = decimals as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Scales a base-unit amount by the coin decimals.
#[inline]
pub fn normalize(base: u128, decimals: u8) -> f64 {
    base as f64 / 10_f64.powi(decimals.into())
}

/// Converts MIST to SUI.
#[inline]
pub fn mist_to_sui(mist: u128) -> f64 {
    normalize(mist, SUI_DECIMALS)
}

/// Returns `true` for a `0x`-prefixed hex address of at most 32 bytes.
pub fn is_valid_address(s: &str) -> bool {
    let Some(hex) = s.strip_prefix("0x") else {
        return false;
    };
    !hex.is_empty() && hex.len() <= 64 && hex.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Rewrites a coin type with its address in the short form, so that
/// `0x000…02::sui::SUI` and `0x2::sui::SUI` compare equal.
///
/// Returns `None` if the string is not a `address::module::name` triple.
pub fn normalize_coin_type(coin_type: &str) -> Option<String> {
    let mut parts = coin_type.trim().splitn(3, "::");
    let (address, module, name) = (parts.next()?, parts.next()?, parts.next()?);
    if !is_valid_address(address) || module.is_empty() || name.is_empty() {
        return None;
    }
    let digits = address[2..].trim_start_matches('0').to_ascii_lowercase();
    let digits = if digits.is_empty() { "0" } else { &digits };
    Some(format!("0x{digits}::{module}::{name}"))
}

/// Returns `true` if the coin can be traded through the router.
pub fn is_supported(coin_type: &str) -> bool {
    let Some(normalized) = normalize_coin_type(coin_type) else {
        return false;
    };
    SUPPORTED_COINS
        .iter()
        .filter_map(|c| normalize_coin_type(c))
        .any(|c| c == normalized)
}
