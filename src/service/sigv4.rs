//! AWS Signature Version 4 request signing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::credentials::Credentials;
use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

#[derive(Debug, Clone)]
pub struct SigV4Signer {
    credentials: Credentials,
    region: String,
    service: String,
}

impl SigV4Signer {
    pub fn new<R: Into<String>, S: Into<String>>(
        credentials: Credentials,
        region: R,
        service: S,
    ) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: service.into(),
        }
    }

    /// Returns `headers` extended with `host`, `x-amz-date`, the optional
    /// security token and `authorization`.
    pub fn sign_request(
        &self,
        method: &str,
        url: &url::Url,
        headers: &BTreeMap<String, String>,
        body: &[u8],
        timestamp: DateTime<Utc>,
    ) -> Result<BTreeMap<String, String>> {
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(Error::transport("request signing", "missing host in URL")),
        };

        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = timestamp.format("%Y%m%d").to_string();

        let mut canonical: BTreeMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.trim().to_string()))
            .collect();
        canonical.insert("host".into(), host);
        canonical.insert("x-amz-date".into(), amz_date.clone());
        if let Some(token) = self.credentials.session_token() {
            canonical.insert("x-amz-security-token".into(), token.to_string());
        }

        let canonical_headers = canonical
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect::<String>();
        let signed_headers = canonical.keys().cloned().collect::<Vec<_>>().join(";");

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method.to_uppercase(),
            url.path(),
            url.query().unwrap_or(""),
            canonical_headers,
            signed_headers,
            hex::encode(Sha256::digest(body)),
        );

        let scope = format!(
            "{}/{}/{}/aws4_request",
            date_stamp, self.region, self.service
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signature = hex::encode(self.signing_key(&date_stamp)?.chain(&string_to_sign)?);

        canonical.insert(
            "authorization".into(),
            format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                ALGORITHM,
                self.credentials.access_key_id(),
                scope,
                signed_headers,
                signature
            ),
        );
        Ok(canonical)
    }

    fn signing_key(&self, date_stamp: &str) -> Result<Key> {
        Key(format!("AWS4{}", self.credentials.secret_access_key()).into_bytes())
            .derive(date_stamp)?
            .derive(&self.region)?
            .derive(&self.service)?
            .derive("aws4_request")
    }
}

struct Key(Vec<u8>);

impl Key {
    fn derive(self, data: &str) -> Result<Key> {
        hmac_sha256(&self.0, data.as_bytes()).map(Key)
    }

    fn chain(self, data: &str) -> Result<Vec<u8>> {
        hmac_sha256(&self.0, data.as_bytes())
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::transport("request signing", format!("HMAC key error: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
