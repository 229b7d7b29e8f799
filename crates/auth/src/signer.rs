//! HMAC-SHA256 signing for `SIGNED` futures endpoints.

use crate::credentials::ApiCredentials;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub struct RequestSigner<'a> {
    credentials: &'a ApiCredentials,
}

impl<'a> RequestSigner<'a> {
    pub fn new(credentials: &'a ApiCredentials) -> Self {
        Self { credentials }
    }

    /// Lowercase hex HMAC-SHA256 of `message` keyed by the API secret.
    pub fn sign(&self, message: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.credentials.expose_secret().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Build `k=v&...&recvWindow=..&timestamp=..&signature=..`.
    ///
    /// Parameter order is preserved; the signature covers exactly the string sent.
    pub fn signed_query(
        &self,
        params: &[(&str, String)],
        timestamp_ms: i64,
        recv_window_ms: u64,
    ) -> String {
        let mut query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>();
        query.push(format!("recvWindow={}", recv_window_ms));
        query.push(format!("timestamp={}", timestamp_ms));

        let query = query.join("&");
        let signature = self.sign(&query);
        format!("{}&signature={}", query, signature)
    }
}
