//! Configuration for the certification pipeline.

use crate::error::{Error, Result};
use crate::signatures::{KeyStore, SignOptions, SigningSession};
use crate::writer::{default_stamp, ImageData};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroizing;

/// Key store type used when none is configured.
pub const DEFAULT_KEYSTORE_TYPE: &str = "PKCS12";

/// Authority name printed when none is configured.
pub const DEFAULT_AUTHORITY_NAME: &str = "Registrar of Companies";

/// Environment variable names.
pub mod env {
    /// Declared key store type (`PKCS12`/`PFX`)
    pub const KEYSTORE_TYPE: &str = "CERTIFIER_KEYSTORE_TYPE";
    /// Key store file
    pub const KEYSTORE_PATH: &str = "CERTIFIER_KEYSTORE_PATH";
    /// Key store password
    pub const KEYSTORE_PASSWORD: &str = "CERTIFIER_KEYSTORE_PASSWORD";
    /// Friendly name of the signing entry
    pub const CERTIFICATE_ALIAS: &str = "CERTIFIER_CERTIFICATE_ALIAS";
    /// Authority printed on the cover page and panel
    pub const AUTHORITY_NAME: &str = "CERTIFIER_AUTHORITY_NAME";
    /// Target of the panel's status link
    pub const STATUS_URL: &str = "CERTIFIER_STATUS_URL";
    /// PNG or JPEG stamp image
    pub const STAMP_IMAGE: &str = "CERTIFIER_STAMP_IMAGE";
    /// `/Reason` of the signature
    pub const SIGNATURE_REASON: &str = "CERTIFIER_SIGNATURE_REASON";
    /// `/Location` of the signature
    pub const SIGNATURE_LOCATION: &str = "CERTIFIER_SIGNATURE_LOCATION";
    /// `/ContactInfo` of the signature
    pub const CONTACT_INFO: &str = "CERTIFIER_CONTACT_INFO";
    /// Root directory of the file system document store
    pub const STORE_ROOT: &str = "CERTIFIER_STORE_ROOT";
}

/// Certification configuration.
#[derive(Clone)]
pub struct CertifierConfig {
    /// Declared key store type.
    pub keystore_type: String,

    /// Key store file.
    pub keystore_path: Option<PathBuf>,

    /// Key store password.
    pub keystore_password: Zeroizing<String>,

    /// Alias of the signing entry.
    pub certificate_alias: Option<String>,

    /// Issuing authority.
    pub authority_name: String,

    /// Signature status page linked from the panel.
    pub status_url: Option<String>,

    /// Stamp image file; the built-in stamp when absent.
    pub stamp_image: Option<PathBuf>,

    /// Descriptive signature dictionary entries.
    pub sign_options: SignOptions,

    /// Root of the file system document store.
    pub store_root: PathBuf,
}

impl fmt::Debug for CertifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertifierConfig")
            .field("keystore_type", &self.keystore_type)
            .field("keystore_path", &self.keystore_path)
            .field("keystore_password", &"<redacted>")
            .field("certificate_alias", &self.certificate_alias)
            .field("authority_name", &self.authority_name)
            .field("status_url", &self.status_url)
            .field("stamp_image", &self.stamp_image)
            .field("sign_options", &self.sign_options)
            .field("store_root", &self.store_root)
            .finish()
    }
}

impl Default for CertifierConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CertifierConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            keystore_type: DEFAULT_KEYSTORE_TYPE.to_string(),
            keystore_path: None,
            keystore_password: Zeroizing::new(String::new()),
            certificate_alias: None,
            authority_name: DEFAULT_AUTHORITY_NAME.to_string(),
            status_url: None,
            stamp_image: None,
            sign_options: SignOptions::default(),
            store_root: PathBuf::from("."),
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`; blank values count as
    /// unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &str| {
            get(name).ok_or_else(|| Error::SigningConfiguration(format!("{} is not set", name)))
        };

        let mut config = Self::new()
            .with_keystore(
                required(env::KEYSTORE_TYPE)?,
                required(env::KEYSTORE_PATH)?,
                &required(env::KEYSTORE_PASSWORD)?,
            )
            .with_certificate_alias(required(env::CERTIFICATE_ALIAS)?);

        if let Some(name) = get(env::AUTHORITY_NAME) {
            config = config.with_authority_name(name);
        }
        if let Some(url) = get(env::STATUS_URL) {
            config = config.with_status_url(url);
        }
        if let Some(path) = get(env::STAMP_IMAGE) {
            config = config.with_stamp_image(path);
        }
        if let Some(root) = get(env::STORE_ROOT) {
            config = config.with_store_root(root);
        }
        config.sign_options = SignOptions {
            reason: get(env::SIGNATURE_REASON),
            location: get(env::SIGNATURE_LOCATION),
            contact_info: get(env::CONTACT_INFO),
        };
        Ok(config)
    }

    /// Set the key store.
    pub fn with_keystore(
        mut self,
        keystore_type: impl Into<String>,
        path: impl Into<PathBuf>,
        password: &str,
    ) -> Self {
        self.keystore_type = keystore_type.into();
        self.keystore_path = Some(path.into());
        self.keystore_password = Zeroizing::new(password.to_string());
        self
    }

    /// Set the signing entry's alias.
    pub fn with_certificate_alias(mut self, alias: impl Into<String>) -> Self {
        self.certificate_alias = Some(alias.into());
        self
    }

    /// Set the issuing authority.
    pub fn with_authority_name(mut self, name: impl Into<String>) -> Self {
        self.authority_name = name.into();
        self
    }

    /// Set the status page link.
    pub fn with_status_url(mut self, url: impl Into<String>) -> Self {
        self.status_url = Some(url.into());
        self
    }

    /// Use a stamp image file.
    pub fn with_stamp_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.stamp_image = Some(path.into());
        self
    }

    /// Set the signature dictionary options.
    pub fn with_sign_options(mut self, options: SignOptions) -> Self {
        self.sign_options = options;
        self
    }

    /// Set the document store root.
    pub fn with_store_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.store_root = root.into();
        self
    }

    /// Open the configured key store.
    pub fn open_key_store(&self) -> Result<KeyStore> {
        let path = self
            .keystore_path
            .as_ref()
            .ok_or_else(|| Error::SigningConfiguration("No key store configured".to_string()))?;
        KeyStore::open(&self.keystore_type, path, &self.keystore_password)
    }

    /// Load the signing entry and check its certificate at `now`.
    pub fn signing_session(&self, now: DateTime<Utc>) -> Result<SigningSession> {
        let alias = self
            .certificate_alias
            .as_deref()
            .ok_or_else(|| Error::SigningConfiguration("No certificate alias configured".to_string()))?;
        self.open_key_store()?.load(alias)?.validate(now)
    }

    /// The configured stamp, or the built-in one.
    pub fn stamp(&self) -> Result<ImageData> {
        match &self.stamp_image {
            Some(path) => ImageData::from_file(path),
            None => ImageData::from_rgba(&default_stamp()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn mandatory() -> Vec<(&'static str, &'static str)> {
        vec![
            (env::KEYSTORE_TYPE, "PKCS12"),
            (env::KEYSTORE_PATH, "/etc/certifier/keystore.p12"),
            (env::KEYSTORE_PASSWORD, "changeit"),
            (env::CERTIFICATE_ALIAS, "certifier"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = CertifierConfig::default();
        assert_eq!(config.keystore_type, DEFAULT_KEYSTORE_TYPE);
        assert_eq!(config.authority_name, DEFAULT_AUTHORITY_NAME);
        assert!(config.status_url.is_none());
    }

    #[test]
    fn test_from_lookup() {
        let mut pairs = mandatory();
        pairs.push((env::STATUS_URL, "https://status.example/check"));
        pairs.push((env::SIGNATURE_REASON, "Certified copy"));
        pairs.push((env::AUTHORITY_NAME, "  "));
        let map = vars(&pairs);
        let config = CertifierConfig::from_lookup(|k| map.get(k).cloned()).unwrap();
        assert_eq!(config.certificate_alias.as_deref(), Some("certifier"));
        assert_eq!(config.status_url.as_deref(), Some("https://status.example/check"));
        assert_eq!(config.sign_options.reason.as_deref(), Some("Certified copy"));
        assert_eq!(config.authority_name, DEFAULT_AUTHORITY_NAME);
    }

    #[test]
    fn test_missing_mandatory_variable() {
        for skipped in 0..4 {
            let pairs: Vec<_> = mandatory().into_iter().enumerate().filter(|(i, _)| *i != skipped).map(|(_, p)| p).collect();
            let map = vars(&pairs);
            let err = CertifierConfig::from_lookup(|k| map.get(k).cloned()).unwrap_err();
            assert!(matches!(err, Error::SigningConfiguration(ref m) if m.contains(mandatory()[skipped].0)));
        }
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = CertifierConfig::new().with_keystore("PKCS12", "/tmp/ks.p12", "hunter2");
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_unconfigured_key_store() {
        let err = CertifierConfig::new().signing_session(Utc::now()).unwrap_err();
        assert!(matches!(err, Error::SigningConfiguration(_)));
    }

    #[test]
    fn test_default_stamp() {
        let stamp = CertifierConfig::new().stamp().unwrap();
        assert_eq!((stamp.width, stamp.height), (96, 96));
    }
}
