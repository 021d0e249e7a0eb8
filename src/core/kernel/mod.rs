/// Transport kernel for the Binance REST API
///
/// The kernel contains only transport concerns: building, signing and sending
/// a single request, and classifying the response. Endpoint semantics live in
/// `exchanges::binance`.
///
/// # Components
///
/// - `Transport`: async HTTP seam, `ReqwestTransport` in production
/// - `RequestExecutor`: credential precondition, timestamp + signature,
///   API-key header, timeout merge, response classification, weight snapshot
/// - `Signer` / `HmacSigner`: HMAC-SHA256 over the canonical query
///
/// # Example
/// ```rust,no_run
/// use binance_rest::core::config::Credentials;
/// use binance_rest::core::kernel::*;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RestClientConfig::new(
///     "https://api.binance.com/api".to_string(),
///     "binance.com".to_string(),
/// );
/// let executor = RequestExecutor::new(ReqwestTransport::new()?, config);
///
/// let spec = RequestSpec::get("depth").param("symbol", "BTCUSDT").param("limit", 5);
/// let book = executor.execute(&spec, &Credentials::default()).await?;
/// println!("{book}");
/// println!("{:?}", executor.weight_snapshot().await);
/// # Ok(())
/// # }
/// ```
pub mod rest;
pub mod signer;
pub mod transport;

// Re-export key types for convenience
pub use rest::{handle_response, RequestExecutor, RequestSpec, RestClientConfig};
pub use signer::{canonical_query, order_params, sign, HmacSigner, SignatureResult, Signer};
pub use transport::{
    ReqwestTransport, Transport, TransportOptions, TransportRequest, TransportResponse,
};
