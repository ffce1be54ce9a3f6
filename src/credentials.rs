use std::env;
use std::fmt;
use std::io::BufRead;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl Credentials {
    pub fn new<K: Into<String>, S: Into<String>>(
        access_key_id: K,
        secret_access_key: S,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    /// Credentials already present in the process environment.
    pub fn from_env() -> Option<Self> {
        let key = env::var("AWS_ACCESS_KEY_ID").ok().filter(|v| !v.is_empty())?;
        let secret = env::var("AWS_SECRET_ACCESS_KEY")
            .ok()
            .filter(|v| !v.is_empty())?;
        let token = env::var("AWS_SESSION_TOKEN").ok().filter(|v| !v.is_empty());
        Some(Self::new(key, secret, token))
    }

    #[inline]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    #[inline]
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    #[inline]
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Reads the session key splunkd writes as the first line of stdin.
pub fn read_session_key<R: BufRead>(mut reader: R) -> Result<String> {
    let mut line = String::new();
    reader.read_line(&mut line).map_err(|e| Error::Credential {
        message: format!("could not read session key: {}", e),
        source: Some(Box::new(e)),
    })?;

    let key = line.trim();
    if key.is_empty() {
        return Err(Error::MissingSessionKey);
    }
    Ok(key.to_string())
}

pub trait CredentialProvider {
    fn credentials(&self, session_key: &str) -> Result<Credentials>;
}

/// Looks the AWS key pair up in the app's splunkd password store.
pub struct SplunkPasswords {
    client: Client,
    base_uri: String,
    app: String,
}

impl SplunkPasswords {
    pub fn new<U: Into<String>, A: Into<String>>(base_uri: U, app: A, verify_tls: bool) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;
        Ok(Self {
            client,
            base_uri: base_uri.into(),
            app: app.into(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/servicesNS/nobody/{}/storage/passwords",
            self.base_uri.trim_end_matches('/'),
            self.app
        )
    }

    fn fetch(&self, session_key: &str) -> std::result::Result<PasswordList, reqwest::Error> {
        self.client
            .get(&self.url())
            .query(&[("output_mode", "json"), ("count", "0")])
            .header("Authorization", format!("Splunk {}", session_key))
            .send()?
            .error_for_status()?
            .json()
    }
}

impl CredentialProvider for SplunkPasswords {
    fn credentials(&self, session_key: &str) -> Result<Credentials> {
        debug!(app = %self.app, "fetching credentials from splunkd");

        let list = self.fetch(session_key).map_err(|e| Error::Credential {
            message: format!(
                "Could not get {} credentials from splunk. Error: {}",
                self.app, e
            ),
            source: Some(Box::new(e)),
        })?;

        let credentials = first_entry(list.entry)?;
        info!(access_key_id = %credentials.access_key_id(), "using stored credentials");
        Ok(credentials)
    }
}

#[derive(Debug, Deserialize)]
struct PasswordList {
    #[serde(default)]
    entry: Vec<PasswordEntry>,
}

#[derive(Debug, Deserialize)]
struct PasswordEntry {
    content: PasswordContent,
}

#[derive(Debug, Deserialize)]
struct PasswordContent {
    username: String,
    clear_password: String,
}

// Only the first stored pair is ever used.
fn first_entry(entries: Vec<PasswordEntry>) -> Result<Credentials> {
    entries
        .into_iter()
        .next()
        .map(|e| Credentials::new(e.content.username, e.content.clear_password, None))
        .ok_or_else(|| Error::credential("No credentials have been found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_session_key() {
        #[rustfmt::skip]
        let tests = [
            ("abc123\n",            Some("abc123")),
            ("  abc123  \nrest\n",  Some("abc123")),
            ("abc123",              Some("abc123")),
            ("\n",                  None),
            ("   \nabc\n",          None),
            ("",                    None),
        ];

        for (input, expected) in &tests {
            match (read_session_key(input.as_bytes()), expected) {
                (Ok(key), Some(expected)) => assert_eq!(*expected, key),
                (Err(Error::MissingSessionKey), None) => (),
                (actual, _) => panic!("unexpected result for {:?}: {:?}", input, actual),
            }
        }
    }

    #[test]
    fn test_first_entry_wins() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let list: PasswordList = serde_json::from_str(
            r#"{"entry": [
                {"name": "a", "content": {"username": "AKIAFIRST", "clear_password": "s1"}},
                {"name": "b", "content": {"username": "AKIASECOND", "clear_password": "s2"}}
            ]}"#,
        )?;

        let creds = first_entry(list.entry)?;
        assert_eq!("AKIAFIRST", creds.access_key_id());
        assert_eq!("s1", creds.secret_access_key());
        assert_eq!(None, creds.session_token());
        Ok(())
    }

    #[test]
    fn test_no_entries() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let list: PasswordList = serde_json::from_str(r#"{"entry": []}"#)?;
        let err = first_entry(list.entry).unwrap_err();
        assert_eq!("No credentials have been found", err.to_string());
        Ok(())
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("AKIATEST", "hunter2", Some("tok".into()));
        let out = format!("{:?}", creds);
        assert!(out.contains("AKIATEST"));
        assert!(!out.contains("hunter2"));
        assert!(!out.contains("tok\""));
    }
}
