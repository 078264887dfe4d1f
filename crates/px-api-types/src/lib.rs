use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Token balances keyed by symbol, in the token's base units.
pub type Balances = BTreeMap<String, u64>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contract value in the node's JSON encoding.
///
/// Arguments only ever use the first six variants; `tuple`, `ok` and `err`
/// appear in results returned by read-only functions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TypedValue {
    Uint { value: u64 },
    Principal { address: String },
    #[serde(rename = "string-utf8")]
    StringUtf8 { data: String },
    Bool { value: bool },
    None,
    Some { value: Box<TypedValue> },
    Tuple { data: BTreeMap<String, TypedValue> },
    Ok { value: Box<TypedValue> },
    Err { value: Box<TypedValue> },
}

impl TypedValue {
    pub fn uint(value: u64) -> Self {
        Self::Uint { value }
    }

    pub fn principal(address: impl Into<String>) -> Self {
        Self::Principal {
            address: address.into(),
        }
    }

    pub fn string_utf8(data: impl Into<String>) -> Self {
        Self::StringUtf8 { data: data.into() }
    }

    pub fn bool(value: bool) -> Self {
        Self::Bool { value }
    }

    pub fn none() -> Self {
        Self::None
    }

    pub fn some(inner: TypedValue) -> Self {
        Self::Some {
            value: Box::new(inner),
        }
    }

    pub fn tuple<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, TypedValue)>,
    {
        Self::Tuple {
            data: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn ok(inner: TypedValue) -> Self {
        Self::Ok {
            value: Box::new(inner),
        }
    }

    pub fn err(inner: TypedValue) -> Self {
        Self::Err {
            value: Box::new(inner),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Uint { .. } => "uint",
            Self::Principal { .. } => "principal",
            Self::StringUtf8 { .. } => "string-utf8",
            Self::Bool { .. } => "bool",
            Self::None => "none",
            Self::Some { .. } => "some",
            Self::Tuple { .. } => "tuple",
            Self::Ok { .. } => "ok",
            Self::Err { .. } => "err",
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Self::Uint { value } => Some(*value),
            _ => None,
        }
    }

    pub fn as_principal(&self) -> Option<&str> {
        match self {
            Self::Principal { address } => Some(address.as_str()),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::StringUtf8 { data } => Some(data.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool { value } => Some(*value),
            _ => None,
        }
    }

    /// Inner value of `some`, or `None` for any other variant.
    pub fn as_some(&self) -> Option<&TypedValue> {
        match self {
            Self::Some { value } => Some(value.as_ref()),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&TypedValue> {
        match self {
            Self::Tuple { data } => data.get(name),
            _ => None,
        }
    }

    /// Strips an `ok` wrapper; every other variant is returned as is.
    pub fn unwrap_ok(&self) -> &TypedValue {
        match self {
            Self::Ok { value } => value.as_ref(),
            other => other,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint { value } => write!(f, "{value}"),
            Self::Principal { address } => f.write_str(address),
            Self::StringUtf8 { data } => f.write_str(data),
            Self::Bool { value } => write!(f, "{value}"),
            Self::None => f.write_str("none"),
            Self::Some { value } => write!(f, "some {value}"),
            Self::Ok { value } => write!(f, "(ok {value})"),
            Self::Err { value } => write!(f, "(err {value})"),
            Self::Tuple { data } => {
                f.write_str("(tuple")?;
                for (name, value) in data {
                    write!(f, " ({name} {value})")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContractCallRequest {
    pub contract_address: String,
    pub contract_name: String,
    pub function_name: String,
    #[serde(default)]
    pub function_args: Vec<TypedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_address: Option<String>,
}

impl ContractCallRequest {
    pub fn new(
        contract_address: impl Into<String>,
        contract_name: impl Into<String>,
        function_name: impl Into<String>,
        function_args: Vec<TypedValue>,
    ) -> Self {
        Self {
            contract_address: contract_address.into(),
            contract_name: contract_name.into(),
            function_name: function_name.into(),
            function_args,
            sender_address: None,
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender_address = Some(sender.into());
        self
    }

    pub fn arg(&self, index: usize) -> Option<&TypedValue> {
        self.function_args.get(index)
    }

    /// `address.name::function`, used in log lines.
    pub fn qualified_name(&self) -> String {
        format!(
            "{}.{}::{}",
            self.contract_address, self.contract_name, self.function_name
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractCallResult {
    pub value: TypedValue,
    #[serde(rename = "txId", default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
}

impl ContractCallResult {
    pub fn read(value: TypedValue) -> Self {
        Self { value, tx_id: None }
    }

    pub fn write(value: TypedValue, tx_id: impl Into<String>) -> Self {
        Self {
            value,
            tx_id: Some(tx_id.into()),
        }
    }
}

/// Contract call as issued by the view layer, with plain JSON arguments that
/// still have to be marshalled into [`TypedValue`]s.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlainContractCall {
    pub contract_address: String,
    pub contract_name: String,
    pub function_name: String,
    #[serde(default)]
    pub function_args: Vec<serde_json::Value>,
}

/// Wallet entry as written to session storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedWallet {
    pub address: String,
    #[serde(default)]
    pub balance: Balances,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NftOwnership {
    pub token_id: u64,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub id: u64,
    pub owner: String,
    pub name: String,
    pub description: String,
    pub asset_type: String,
    pub value: u64,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceListing {
    pub id: u64,
    pub token_id: u64,
    pub name: String,
    pub description: String,
    pub asset_type: String,
    pub owner: String,
    pub price: u64,
    pub currency: String,
    pub metadata_cid: String,
    pub expiry: u64,
    pub is_cancelled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_values_use_node_wire_shape() {
        let args = vec![
            TypedValue::uint(42),
            TypedValue::principal("ST1VZ3YGJKKC8JSSWMS4EZDXXJM7QWRBEZ0ZWM64E"),
            TypedValue::string_utf8("hello"),
            TypedValue::bool(false),
            TypedValue::none(),
            TypedValue::some(TypedValue::uint(7)),
        ];

        let encoded = serde_json::to_value(&args).expect("encode args");
        assert_eq!(
            encoded,
            json!([
                { "type": "uint", "value": 42 },
                { "type": "principal", "address": "ST1VZ3YGJKKC8JSSWMS4EZDXXJM7QWRBEZ0ZWM64E" },
                { "type": "string-utf8", "data": "hello" },
                { "type": "bool", "value": false },
                { "type": "none" },
                { "type": "some", "value": { "type": "uint", "value": 7 } },
            ])
        );
    }

    #[test]
    fn decodes_tuple_and_response_results() {
        let raw = json!({
            "value": {
                "type": "ok",
                "value": {
                    "type": "tuple",
                    "data": {
                        "id": { "type": "uint", "value": 3 },
                        "name": { "type": "string-utf8", "data": "Property Asset 3" }
                    }
                }
            }
        });

        let result: ContractCallResult = serde_json::from_value(raw).expect("decode result");
        assert_eq!(result.tx_id, None);

        let tuple = result.value.unwrap_ok();
        assert_eq!(tuple.field("id").and_then(TypedValue::as_uint), Some(3));
        assert_eq!(
            tuple.field("name").and_then(TypedValue::as_string),
            Some("Property Asset 3")
        );
    }

    #[test]
    fn request_uses_camel_case_and_omits_missing_sender() {
        let request = ContractCallRequest::new("ST1", "rws", "get-balance", vec![]);
        let encoded = serde_json::to_value(&request).expect("encode request");
        assert_eq!(
            encoded,
            json!({
                "contractAddress": "ST1",
                "contractName": "rws",
                "functionName": "get-balance",
                "functionArgs": []
            })
        );

        let with_sender = request.with_sender("ST2");
        assert_eq!(with_sender.qualified_name(), "ST1.rws::get-balance");
        let encoded = serde_json::to_value(&with_sender).expect("encode request");
        assert_eq!(encoded["senderAddress"], "ST2");
    }

    #[test]
    fn write_result_carries_tx_id() {
        let result = ContractCallResult::write(TypedValue::bool(true), "0xabc");
        let encoded = serde_json::to_value(&result).expect("encode result");
        assert_eq!(
            encoded,
            json!({ "value": { "type": "bool", "value": true }, "txId": "0xabc" })
        );
    }

    #[test]
    fn display_matches_readable_form() {
        assert_eq!(TypedValue::uint(5).to_string(), "5");
        assert_eq!(TypedValue::none().to_string(), "none");
        assert_eq!(
            TypedValue::some(TypedValue::principal("ST9")).to_string(),
            "some ST9"
        );
        assert_eq!(
            TypedValue::ok(TypedValue::bool(true)).to_string(),
            "(ok true)"
        );
        assert_eq!(
            TypedValue::tuple([("a", TypedValue::uint(1)), ("b", TypedValue::string_utf8("x"))])
                .to_string(),
            "(tuple (a 1) (b x))"
        );
    }

    #[test]
    fn persisted_wallet_tolerates_missing_balance() {
        let wallet: PersistedWallet =
            serde_json::from_str(r#"{"address":"ST1"}"#).expect("decode wallet");
        assert_eq!(wallet.address, "ST1");
        assert!(wallet.balance.is_empty());
    }
}
