//! Price math of concentrated liquidity pools, shared by the Cetus and
//! Bluefin tools.
//!
//! Estimates only use the current pool price. Fees and tick crossings are
//! left to the slippage bound.

use serde_json::Value;
use zoe_core::tool::Error as ToolError;

use crate::chain::ObjectData;

/// Lowest sqrt price a swap may push a pool to.
pub const MIN_SQRT_PRICE_X64: u128 = 4_295_048_016;
/// Highest sqrt price a swap may push a pool to.
pub const MAX_SQRT_PRICE_X64: u128 = 79_226_673_515_401_279_992_447_579_055;

const Q64: f64 = 18_446_744_073_709_551_616.0;

/// The parts of a pool object the tools need.
#[derive(Clone, Debug, PartialEq)]
pub struct PoolState {
    /// The pool object id.
    pub id: String,
    /// Type of the first coin.
    pub coin_type_a: String,
    /// Type of the second coin.
    pub coin_type_b: String,
    /// Square root of the price of A in B, as a Q64.64 number.
    pub sqrt_price_x64: u128,
    /// Tick spacing, when the pool stores it at the top level.
    pub tick_spacing: Option<u32>,
}

impl PoolState {
    /// Reads a pool from its object.
    pub fn from_object(object: &ObjectData) -> Result<Self, ToolError> {
        let invalid = |what: &str| {
            ToolError::external_service()
                .with_reason(format!("object {} is not a pool: {what}", object.object_id))
        };
        let object_type = object
            .object_type
            .as_deref()
            .ok_or_else(|| invalid("missing type"))?;
        let (coin_type_a, coin_type_b) =
            type_params(object_type).ok_or_else(|| invalid("no coin types"))?;
        let sqrt_price_x64 = object
            .field("current_sqrt_price")
            .and_then(u128_value)
            .ok_or_else(|| invalid("no current_sqrt_price"))?;
        let tick_spacing = object
            .field("tick_spacing")
            .and_then(u128_value)
            .and_then(|spacing| u32::try_from(spacing).ok());
        Ok(Self {
            id: object.object_id.clone(),
            coin_type_a,
            coin_type_b,
            sqrt_price_x64,
            tick_spacing,
        })
    }

    /// Returns the square root of the price.
    #[inline]
    pub fn sqrt_price(&self) -> f64 {
        self.sqrt_price_x64 as f64 / Q64
    }

    /// Returns the price of one base unit of A in base units of B.
    #[inline]
    pub fn price(&self) -> f64 {
        self.sqrt_price().powi(2)
    }

    /// Returns the tick the current price lies in.
    #[inline]
    pub fn current_tick(&self) -> i32 {
        tick_at(self.sqrt_price())
    }
}

/// Reads an unsigned integer that the node may print as a string.
pub fn u128_value(value: &Value) -> Option<u128> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().map(u128::from),
        _ => None,
    }
}

/// Reads a Move `I32`, stored as `{ bits }` of its two's complement.
pub fn tick_value(value: &Value) -> Option<i32> {
    let bits = value
        .get("fields")
        .and_then(|fields| fields.get("bits"))
        .or_else(|| value.get("bits"))
        .unwrap_or(value);
    let bits = u32::try_from(u128_value(bits)?).ok()?;
    Some(bits as i32)
}

/// Formats a tick as the `u32` Move entry functions take.
#[inline]
pub fn tick_arg(tick: i32) -> String {
    format!("{}u32", tick as u32)
}

/// Splits `pkg::pool::Pool<A, B>` into `A` and `B`.
pub fn type_params(struct_type: &str) -> Option<(String, String)> {
    let start = struct_type.find('<')?;
    let inner = struct_type[start + 1..].strip_suffix('>')?;
    let mut depth = 0_usize;
    for (idx, ch) in inner.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                let (a, b) = (inner[..idx].trim(), inner[idx + 1..].trim());
                if a.is_empty() || b.is_empty() {
                    return None;
                }
                return Some((a.to_owned(), b.to_owned()));
            }
            _ => {}
        }
    }
    None
}

/// Returns the tick a sqrt price lies in.
pub fn tick_at(sqrt_price: f64) -> i32 {
    (2.0 * sqrt_price.ln() / 1.0001_f64.ln()).floor() as i32
}

/// Returns the sqrt price at a tick.
pub fn sqrt_price_at(tick: i32) -> f64 {
    1.0001_f64.powf(f64::from(tick) / 2.0)
}

/// Returns the initializable ticks around `tick`, `lower <= tick < upper`.
pub fn tick_range(tick: i32, spacing: u32) -> (i32, i32) {
    let spacing = i32::try_from(spacing.max(1)).unwrap_or(i32::MAX);
    let lower = tick.div_euclid(spacing) * spacing;
    (lower, lower.saturating_add(spacing))
}

/// Returns the sqrt price limit of a swap in the given direction.
#[inline]
pub fn sqrt_price_limit(a_to_b: bool) -> u128 {
    if a_to_b {
        MIN_SQRT_PRICE_X64
    } else {
        MAX_SQRT_PRICE_X64
    }
}

/// Estimates what a swap of `amount_in` pays out.
pub fn estimate_out(pool: &PoolState, a_to_b: bool, amount_in: u64) -> u64 {
    let amount = amount_in as f64;
    let out = if a_to_b {
        amount * pool.price()
    } else {
        amount / pool.price()
    };
    out.floor() as u64
}

/// Estimates what a swap paying out `amount_out` costs.
pub fn estimate_in(pool: &PoolState, a_to_b: bool, amount_out: u64) -> u64 {
    let amount = amount_out as f64;
    let cost = if a_to_b {
        amount / pool.price()
    } else {
        amount * pool.price()
    };
    cost.ceil() as u64
}

/// Bounds the estimated side of a trade by the slippage. `lower` gives a
/// minimum to receive, otherwise a maximum to pay.
pub fn amount_limit(estimate: u64, slippage: f64, lower: bool) -> u64 {
    let estimate = estimate as f64;
    if lower {
        (estimate * (1.0 - slippage)).floor() as u64
    } else {
        (estimate * (1.0 + slippage)).ceil() as u64
    }
}

/// Returns the amounts of A and B that `liquidity` holds between two ticks.
pub fn amounts_for_liquidity(
    liquidity: u128,
    sqrt_price: f64,
    lower: i32,
    upper: i32,
) -> (u64, u64) {
    let (sqrt_lower, sqrt_upper) = (sqrt_price_at(lower), sqrt_price_at(upper));
    let sqrt_price = sqrt_price.clamp(sqrt_lower, sqrt_upper);
    let liquidity = liquidity as f64;
    let a = liquidity * (sqrt_upper - sqrt_price) / (sqrt_price * sqrt_upper);
    let b = liquidity * (sqrt_price - sqrt_lower);
    (a.floor() as u64, b.floor() as u64)
}

/// Returns the amount of B that pairs with `amount_a` in a new position.
pub fn amount_b_for_a(amount_a: u64, sqrt_price: f64, lower: i32, upper: i32) -> u64 {
    let (sqrt_lower, sqrt_upper) = (sqrt_price_at(lower), sqrt_price_at(upper));
    let sqrt_price = sqrt_price.clamp(sqrt_lower, sqrt_upper);
    if sqrt_price >= sqrt_upper {
        return 0;
    }
    let liquidity =
        amount_a as f64 * sqrt_price * sqrt_upper / (sqrt_upper - sqrt_price);
    (liquidity * (sqrt_price - sqrt_lower)).ceil() as u64
}

/// Returns the Q64.64 sqrt price of a price, if a pool can start there.
pub fn sqrt_price_x64_of(price: f64) -> Option<u128> {
    if !price.is_finite() || price <= 0.0 {
        return None;
    }
    let sqrt_price_x64 = price.sqrt() * Q64;
    let range = MIN_SQRT_PRICE_X64 as f64..=MAX_SQRT_PRICE_X64 as f64;
    range.contains(&sqrt_price_x64).then_some(sqrt_price_x64 as u128)
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;

    use super::*;

    /// A SUI/USDC pool at the given sqrt price.
    pub(crate) fn pool(sqrt_price_x64: u128) -> PoolState {
        PoolState {
            id: "0xp001".to_owned(),
            coin_type_a: "0x2::sui::SUI".to_owned(),
            coin_type_b: "0xdba3::usdc::USDC".to_owned(),
            sqrt_price_x64,
            tick_spacing: Some(60),
        }
    }

    #[test]
    fn test_pool_from_object() {
        let object = ObjectData {
            object_id: "0xp001".to_owned(),
            object_type: Some(
                "0xc1mm::pool::Pool<0x2::sui::SUI, 0xdba3::usdc::USDC>".to_owned(),
            ),
            content: Some(json!({
                "dataType": "moveObject",
                "fields": { "current_sqrt_price": "36893488147419103232", "tick_spacing": 60 }
            })),
        };
        let state = PoolState::from_object(&object).unwrap();
        assert_eq!(state, pool(1 << 65));
        assert_eq!(state.price(), 4.0);
        assert_eq!(state.current_tick(), 13863);

        let object = ObjectData {
            content: None,
            ..object
        };
        let err = PoolState::from_object(&object).unwrap_err();
        assert!(err.reason().contains("current_sqrt_price"));
    }

    #[test]
    fn test_type_params() {
        assert_eq!(
            type_params("0x1::pool::Pool<0x2::sui::SUI, 0x3::lp::LP<0x2::sui::SUI>>"),
            Some(("0x2::sui::SUI".to_owned(), "0x3::lp::LP<0x2::sui::SUI>".to_owned()))
        );
        assert_eq!(type_params("0x2::coin::TreasuryCap"), None);
        assert_eq!(type_params("0x1::pool::Pool<0x2::sui::SUI>"), None);
    }

    #[test]
    fn test_ticks() {
        assert_eq!(tick_at(1.0), 0);
        assert_eq!(tick_range(0, 60), (0, 60));
        assert_eq!(tick_range(-1, 60), (-60, 0));
        assert_eq!(tick_range(125, 60), (120, 180));
        assert_eq!(tick_arg(-60), "4294967236u32");
        assert_eq!(tick_value(&json!({ "fields": { "bits": 4294967236_u64 } })), Some(-60));
        assert_eq!(tick_value(&json!({ "bits": 120 })), Some(120));
    }

    #[test]
    fn test_swap_estimates() {
        // One A is worth four B.
        let pool = pool(1 << 65);
        assert_eq!(estimate_out(&pool, true, 1000), 4000);
        assert_eq!(estimate_out(&pool, false, 1000), 250);
        assert_eq!(estimate_in(&pool, true, 4000), 1000);
        assert_eq!(amount_limit(4000, 0.01, true), 3960);
        assert_eq!(amount_limit(1000, 0.01, false), 1010);
        assert_eq!(sqrt_price_limit(true), MIN_SQRT_PRICE_X64);
    }

    #[test]
    fn test_liquidity_amounts() {
        // Below the range a position holds only A, above it only B.
        let (a, b) = amounts_for_liquidity(1_000_000, sqrt_price_at(-120), -60, 60);
        assert!(a > 0);
        assert_eq!(b, 0);
        let (a, b) = amounts_for_liquidity(1_000_000, sqrt_price_at(120), -60, 60);
        assert_eq!(a, 0);
        assert!(b > 0);

        let b = amount_b_for_a(1_000_000, 1.0, -60, 60);
        assert!((999_000..=1_001_000).contains(&b), "{b}");
        assert_eq!(amount_b_for_a(1_000_000, sqrt_price_at(60), -60, 60), 0);
    }

    #[test]
    fn test_initial_sqrt_price() {
        assert_eq!(sqrt_price_x64_of(1.0), Some(1 << 64));
        assert_eq!(sqrt_price_x64_of(4.0), Some(1 << 65));
        assert_eq!(sqrt_price_x64_of(0.0), None);
        assert_eq!(sqrt_price_x64_of(f64::NAN), None);
    }
}
