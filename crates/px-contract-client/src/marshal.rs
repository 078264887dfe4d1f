//! Plain JSON arguments to contract values.
//!
//! Rules are applied in order and every input maps to exactly one value:
//! null → `none`, boolean → `bool`, non-negative integral value (number,
//! float with no fraction, or numeric string) → `uint`, address-shaped string
//! → `principal`, any other string → `string-utf8`. Whatever is left (negative or fractional numbers, arrays,
//! objects) becomes `string-utf8` of its JSON text.

use px_api_types::TypedValue;
use serde_json::Value;

const ADDRESS_PREFIXES: [&str; 2] = ["ST", "SP"];
const MIN_ADDRESS_LEN: usize = 39;

pub fn marshal_args(args: &[Value]) -> Vec<TypedValue> {
    args.iter().map(marshal_arg).collect()
}

pub fn marshal_arg(arg: &Value) -> TypedValue {
    match arg {
        Value::Null => TypedValue::none(),
        Value::Bool(flag) => TypedValue::bool(*flag),
        Value::Number(number) => match number.as_u64().or_else(|| integral_f64(number)) {
            Some(value) => TypedValue::uint(value),
            None => TypedValue::string_utf8(number.to_string()),
        },
        Value::String(text) => marshal_str(text),
        other => TypedValue::string_utf8(other.to_string()),
    }
}

// `u64::MAX as f64` rounds up to 2^64, so the bound is exclusive.
fn integral_f64(number: &serde_json::Number) -> Option<u64> {
    let value = number.as_f64()?;
    let integral = value.is_finite() && value >= 0.0 && value.fract() == 0.0;
    (integral && value < u64::MAX as f64).then(|| value as u64)
}

fn marshal_str(text: &str) -> TypedValue {
    if let Some(value) = parse_uint(text) {
        return TypedValue::uint(value);
    }
    if is_stacks_address(text) {
        return TypedValue::principal(text);
    }
    TypedValue::string_utf8(text)
}

fn parse_uint(text: &str) -> Option<u64> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

/// Standard principal in c32 form: `ST` (testnet) or `SP` (mainnet) prefix.
pub fn is_stacks_address(text: &str) -> bool {
    ADDRESS_PREFIXES.iter().any(|prefix| text.starts_with(prefix))
        && text.len() >= MIN_ADDRESS_LEN
        && text.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TESTNET_ADDR: &str = "ST1VZ3YGJKKC8JSSWMS4EZDXXJM7QWRBEZ0ZWM64E";

    #[test]
    fn numbers_and_numeric_strings_become_uint() {
        assert_eq!(marshal_arg(&json!(42)), TypedValue::uint(42));
        assert_eq!(marshal_arg(&json!("42")), TypedValue::uint(42));
        assert_eq!(marshal_arg(&json!(" 7 ")), TypedValue::uint(7));
        assert_eq!(marshal_arg(&json!(0)), TypedValue::uint(0));
        assert_eq!(marshal_arg(&json!(3.0)), TypedValue::uint(3));
        assert_eq!(marshal_arg(&json!(1e3)), TypedValue::uint(1000));
    }

    #[test]
    fn address_shaped_strings_become_principal() {
        assert_eq!(
            marshal_arg(&json!(TESTNET_ADDR)),
            TypedValue::principal(TESTNET_ADDR)
        );
        assert!(is_stacks_address("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7"));
    }

    #[test]
    fn near_miss_addresses_stay_strings() {
        // too short
        assert_eq!(marshal_arg(&json!("ST123")), TypedValue::string_utf8("ST123"));
        // contract-qualified principal
        let qualified = format!("{TESTNET_ADDR}.rws");
        assert_eq!(
            marshal_arg(&json!(qualified.as_str())),
            TypedValue::string_utf8(qualified.clone())
        );
        // wrong prefix
        assert!(!is_stacks_address("SX1VZ3YGJKKC8JSSWMS4EZDXXJM7QWRBEZ0ZWM64E"));
    }

    #[test]
    fn address_length_has_a_floor_only() {
        let shaped = |len: usize| format!("ST{}", "A".repeat(len - 2));

        assert_eq!(
            marshal_arg(&json!(shaped(38))),
            TypedValue::string_utf8(shaped(38))
        );
        for len in [39, 41, 42] {
            assert_eq!(
                marshal_arg(&json!(shaped(len))),
                TypedValue::principal(shaped(len)),
                "length {len}"
            );
        }
    }

    #[test]
    fn remaining_scalars_map_by_kind() {
        assert_eq!(marshal_arg(&json!(null)), TypedValue::none());
        assert_eq!(marshal_arg(&json!(true)), TypedValue::bool(true));
        assert_eq!(
            marshal_arg(&json!("ft-contract")),
            TypedValue::string_utf8("ft-contract")
        );
        assert_eq!(marshal_arg(&json!("")), TypedValue::string_utf8(""));
    }

    #[test]
    fn out_of_range_values_fall_back_to_text() {
        assert_eq!(marshal_arg(&json!(-3)), TypedValue::string_utf8("-3"));
        assert_eq!(marshal_arg(&json!(1.5)), TypedValue::string_utf8("1.5"));
        assert_eq!(marshal_arg(&json!(-2.0)), TypedValue::string_utf8("-2.0"));
        assert!(matches!(
            marshal_arg(&json!(1e20)),
            TypedValue::StringUtf8 { .. }
        ));
        assert_eq!(
            marshal_arg(&json!([1, 2])),
            TypedValue::string_utf8("[1,2]")
        );
        assert_eq!(
            marshal_arg(&json!("99999999999999999999999")),
            TypedValue::string_utf8("99999999999999999999999")
        );
    }

    #[test]
    fn listing_arguments_marshal_in_order() {
        let args = vec![
            json!(TESTNET_ADDR),
            json!("nft"),
            json!(4),
            json!("1440"),
            json!(250),
            json!(null),
            json!("QmNR2n4zywCV61MeMLB6JwPueAPqhbtqMfCMKDRQftUSa4"),
        ];

        let first = marshal_args(&args);
        assert_eq!(first, marshal_args(&args));
        assert_eq!(
            first,
            vec![
                TypedValue::principal(TESTNET_ADDR),
                TypedValue::string_utf8("nft"),
                TypedValue::uint(4),
                TypedValue::uint(1440),
                TypedValue::uint(250),
                TypedValue::none(),
                TypedValue::string_utf8("QmNR2n4zywCV61MeMLB6JwPueAPqhbtqMfCMKDRQftUSa4"),
            ]
        );
    }
}
