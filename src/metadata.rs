//! Token name lookups. Best-effort: a failed lookup yields an empty name.

/// Resolves a token address to its on-chain name.
pub trait NameResolver {
    /// Empty string when the name cannot be resolved.
    fn resolve_name(&self, address: &str) -> String;
}

impl<F> NameResolver for F
where
    F: Fn(&str) -> String,
{
    fn resolve_name(&self, address: &str) -> String {
        self(address)
    }
}

#[cfg(feature = "rpc")]
pub use rpc::{RpcNameResolver, decode_abi_string};

#[cfg(feature = "rpc")]
mod rpc {
    use super::NameResolver;
    use crate::RouteError;
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;
    use tracing::warn;

    /// `name()` selector.
    const NAME_SELECTOR: &str = "0x06fdde03";

    #[derive(Debug, Deserialize)]
    struct RpcErrorBody {
        code: i64,
        message: String,
    }

    #[derive(Debug, Deserialize)]
    struct RpcResponse {
        result: Option<String>,
        error: Option<RpcErrorBody>,
    }

    /// Calls ERC-20 `name()` over JSON-RPC `eth_call`.
    pub struct RpcNameResolver {
        client: reqwest::blocking::Client,
        url: String,
    }

    impl RpcNameResolver {
        pub fn new(url: &str, timeout: Duration) -> Result<Self, RouteError> {
            let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
            Ok(Self {
                client,
                url: url.to_string(),
            })
        }

        pub fn call_name(&self, address: &str) -> Result<String, RouteError> {
            let body = json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "eth_call",
                "params": [{"to": address, "data": NAME_SELECTOR}, "latest"],
            });
            let response: RpcResponse = self
                .client
                .post(&self.url)
                .json(&body)
                .send()?
                .error_for_status()?
                .json()?;
            if let Some(err) = response.error {
                return Err(RouteError::Rpc(format!("{} (code {})", err.message, err.code)));
            }
            let result = response
                .result
                .ok_or_else(|| RouteError::Rpc("empty eth_call result".to_string()))?;
            decode_abi_string(&result)
        }
    }

    impl NameResolver for RpcNameResolver {
        fn resolve_name(&self, address: &str) -> String {
            match self.call_name(address) {
                Ok(name) => name,
                Err(e) => {
                    warn!(addr = address, error = %e, "get token name failed");
                    String::new()
                }
            }
        }
    }

    fn word_to_usize(word: &[u8]) -> Result<usize, RouteError> {
        // Offsets and lengths that do not fit in the low 8 bytes are garbage.
        if word[..24].iter().any(|b| *b != 0) {
            return Err(RouteError::Rpc("ABI length out of range".to_string()));
        }
        let mut low = [0u8; 8];
        low.copy_from_slice(&word[24..32]);
        Ok(u64::from_be_bytes(low) as usize)
    }

    /// Decode an `eth_call` return value holding an ABI `string`. A bare
    /// 32-byte word is read as a NUL-padded `bytes32` name, which some older
    /// tokens return.
    pub fn decode_abi_string(hex_data: &str) -> Result<String, RouteError> {
        let raw = hex_data.strip_prefix("0x").unwrap_or(hex_data);
        let bytes = hex::decode(raw).map_err(|e| RouteError::Rpc(format!("bad hex: {}", e)))?;

        if bytes.len() == 32 {
            let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
            return Ok(String::from_utf8_lossy(&bytes[..end]).into_owned());
        }
        if bytes.len() < 64 {
            return Err(RouteError::Rpc(format!("short ABI string ({} bytes)", bytes.len())));
        }

        let offset = word_to_usize(&bytes[0..32])?;
        let len_end = offset
            .checked_add(32)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| RouteError::Rpc("ABI offset out of range".to_string()))?;
        let len = word_to_usize(&bytes[offset..len_end])?;
        let data_end = len_end
            .checked_add(len)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| RouteError::Rpc("ABI string overruns data".to_string()))?;
        Ok(String::from_utf8_lossy(&bytes[len_end..data_end]).into_owned())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_decode_dynamic_string() {
            // abi.encode("Wrapped BNB")
            let data = concat!(
                "0x",
                "0000000000000000000000000000000000000000000000000000000000000020",
                "000000000000000000000000000000000000000000000000000000000000000b",
                "5772617070656420424e42000000000000000000000000000000000000000000",
            );
            assert_eq!(decode_abi_string(data).unwrap(), "Wrapped BNB");
        }

        #[test]
        fn test_decode_bytes32_name() {
            let data = "0x4d616b6572000000000000000000000000000000000000000000000000000000";
            assert_eq!(decode_abi_string(data).unwrap(), "Maker");
        }

        #[test]
        fn test_decode_rejects_truncated_data() {
            let data = concat!(
                "0x",
                "0000000000000000000000000000000000000000000000000000000000000020",
                "00000000000000000000000000000000000000000000000000000000000000ff",
            );
            assert!(decode_abi_string(data).is_err());
            assert!(decode_abi_string("0xzz").is_err());
        }

        #[test]
        fn test_unreachable_endpoint_yields_empty_name() {
            let resolver =
                RpcNameResolver::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
            assert_eq!(resolver.resolve_name("0xA"), "");
        }
    }
}
