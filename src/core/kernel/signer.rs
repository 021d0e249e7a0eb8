use crate::core::errors::ExchangeError;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use std::collections::{BTreeMap, HashMap};

type HmacSha256 = Hmac<Sha256>;

pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Result type for signing operations: (headers, `query_params`)
pub type SignatureResult = Result<(HashMap<String, String>, Vec<(String, String)>), ExchangeError>;

/// Compute the hex encoded HMAC-SHA256 of `canonical` keyed by `secret`.
///
/// Pure function: the same inputs always produce the same signature.
pub fn sign(secret: &str, canonical: &str) -> Result<String, ExchangeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Other(format!("Failed to create HMAC: {}", e)))?;
    mac.update(canonical.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Order request parameters the way they go on the wire: sorted by key with
/// `signature` moved to the end.
pub fn order_params(params: &BTreeMap<String, String>) -> Vec<(&str, &str)> {
    let mut ordered: Vec<(&str, &str)> = params
        .iter()
        .filter(|(k, _)| k.as_str() != "signature")
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    if let Some(signature) = params.get("signature") {
        ordered.push(("signature", signature.as_str()));
    }
    ordered
}

/// Join ordered parameters into `k=v&k=v`
#[must_use]
pub fn canonical_query<K: AsRef<str>, V: AsRef<str>>(params: &[(K, V)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
        .collect::<Vec<_>>()
        .join("&")
}

/// Signer trait for request authentication
pub trait Signer: Send + Sync {
    /// Sign a parameter set stamped with `timestamp` (epoch milliseconds).
    ///
    /// # Returns
    /// Tuple of (headers, signed query params in wire order)
    fn sign_request(&self, params: &BTreeMap<String, String>, timestamp: i64) -> SignatureResult;
}

/// HMAC-SHA256 signer for the `timestamp` + `signature` query scheme
pub struct HmacSigner {
    api_key: Secret<String>,
    secret_key: Secret<String>,
    allow_empty_secret: bool,
}

impl HmacSigner {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            allow_empty_secret: false,
        }
    }

    /// Permit signing with an empty secret. Only useful against test servers.
    #[must_use]
    pub fn allow_empty_secret(mut self) -> Self {
        self.allow_empty_secret = true;
        self
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner")
            .field("allow_empty_secret", &self.allow_empty_secret)
            .finish_non_exhaustive()
    }
}

impl Signer for HmacSigner {
    fn sign_request(&self, params: &BTreeMap<String, String>, timestamp: i64) -> SignatureResult {
        let secret = self.secret_key.expose_secret();
        if secret.is_empty() && !self.allow_empty_secret {
            return Err(ExchangeError::MissingCredentials(
                "API secret not configured".to_string(),
            ));
        }

        let mut stamped = params.clone();
        stamped.remove("signature");
        stamped.insert("timestamp".to_string(), timestamp.to_string());

        let ordered = order_params(&stamped);
        let signature = sign(secret, &canonical_query(&ordered))?;

        let mut signed_params: Vec<(String, String)> = ordered
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        signed_params.push(("signature".to_string(), signature));

        let mut headers = HashMap::new();
        headers.insert(
            API_KEY_HEADER.to_string(),
            self.api_key.expose_secret().clone(),
        );

        Ok((headers, signed_params))
    }
}
