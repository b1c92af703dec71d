//! Certificate and key material.
//!
//! Loading runs through three types: a [`KeyStore`] holds the encrypted
//! container, [`KeyStore::load`] yields [`LoadedKey`] for one alias, and
//! [`LoadedKey::validate`] checks the leaf certificate's validity window
//! and yields the [`SigningSession`] the signer consumes. Private key
//! material is scrubbed when each of these is dropped.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use der::Decode;
use openssl::pkcs12::Pkcs12;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use x509_cert::Certificate;
use zeroize::Zeroizing;

/// Container formats that can be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStoreType {
    /// PKCS#12, also declared as `PFX`
    Pkcs12,
}

impl FromStr for KeyStoreType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PKCS12" | "PKCS#12" | "PFX" | "P12" => Ok(KeyStoreType::Pkcs12),
            other => Err(Error::SigningConfiguration(format!("Unsupported key store type '{}'", other))),
        }
    }
}

/// Password-protected key store contents.
pub struct KeyStore {
    store_type: KeyStoreType,
    data: Zeroizing<Vec<u8>>,
    password: Zeroizing<String>,
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("store_type", &self.store_type)
            .field("len", &self.data.len())
            .field("password", &"<redacted>")
            .finish()
    }
}

impl KeyStore {
    /// Read a key store file of the declared type.
    pub fn open(store_type: &str, path: impl AsRef<Path>, password: &str) -> Result<Self> {
        let path = path.as_ref();
        let store_type = store_type.parse()?;
        let data = std::fs::read(path).map_err(|e| {
            Error::SigningConfiguration(format!("Cannot read key store {}: {}", path.display(), e))
        })?;
        log::debug!("Read {:?} key store from {}", store_type, path.display());
        Ok(Self {
            store_type,
            data: Zeroizing::new(data),
            password: Zeroizing::new(password.to_string()),
        })
    }

    /// Key store held in memory.
    pub fn from_bytes(store_type: &str, data: Vec<u8>, password: &str) -> Result<Self> {
        Ok(Self {
            store_type: store_type.parse()?,
            data: Zeroizing::new(data),
            password: Zeroizing::new(password.to_string()),
        })
    }

    /// Declared container format.
    pub fn store_type(&self) -> KeyStoreType {
        self.store_type
    }

    /// Decrypt the container and extract the key and chain stored under
    /// `alias` (the PKCS#12 friendly name).
    pub fn load(&self, alias: &str) -> Result<LoadedKey> {
        match self.store_type {
            KeyStoreType::Pkcs12 => self.load_pkcs12(alias),
        }
    }

    fn load_pkcs12(&self, alias: &str) -> Result<LoadedKey> {
        let parsed = Pkcs12::from_der(&self.data)
            .and_then(|p12| p12.parse2(&self.password))
            .map_err(|e| Error::SigningConfiguration(format!("Cannot open PKCS#12 key store: {}", e)))?;

        let leaf = parsed
            .cert
            .ok_or_else(|| Error::SigningConfiguration("Key store holds no certificate".to_string()))?;
        if leaf.alias() != Some(alias.as_bytes()) {
            return Err(Error::SigningConfiguration(format!("No key store entry for alias '{}'", alias)));
        }
        let pkey = parsed.pkey.ok_or_else(|| {
            Error::SigningConfiguration(format!("Entry '{}' holds no private key", alias))
        })?;

        let pkcs8 = Zeroizing::new(
            pkey.private_key_to_pkcs8()
                .map_err(|e| Error::SigningConfiguration(format!("Cannot export private key: {}", e)))?,
        );
        let private_key = RsaPrivateKey::from_pkcs8_der(&pkcs8)
            .map_err(|e| Error::SigningConfiguration(format!("Private key is not an RSA key: {}", e)))?;

        let mut chain_der = vec![leaf
            .to_der()
            .map_err(|e| Error::SigningConfiguration(format!("Cannot export certificate: {}", e)))?];
        if let Some(ca) = parsed.ca {
            for cert in &ca {
                chain_der.push(
                    cert.to_der()
                        .map_err(|e| Error::SigningConfiguration(format!("Cannot export certificate: {}", e)))?,
                );
            }
        }

        let chain = CertificateChain::from_der(chain_der)?;
        log::info!("Loaded key store entry '{}' with {} certificate(s)", alias, chain.len());
        Ok(LoadedKey { private_key, chain })
    }
}

/// Ordered certificates, leaf first.
#[derive(Debug, Clone)]
pub struct CertificateChain {
    certificates: Vec<Certificate>,
    der: Vec<Vec<u8>>,
}

impl CertificateChain {
    /// Decode a chain of DER certificates, leaf first.
    pub fn from_der(der: Vec<Vec<u8>>) -> Result<Self> {
        if der.is_empty() {
            return Err(Error::SigningConfiguration("Certificate chain is empty".to_string()));
        }
        let certificates = der
            .iter()
            .map(|bytes| Certificate::from_der(bytes))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::SigningConfiguration(format!("Malformed certificate: {}", e)))?;
        Ok(Self { certificates, der })
    }

    /// Signing certificate.
    pub fn leaf(&self) -> &Certificate {
        &self.certificates[0]
    }

    /// DER of the signing certificate.
    pub fn leaf_der(&self) -> &[u8] {
        &self.der[0]
    }

    /// All certificates, leaf first.
    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    /// Number of certificates.
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Always false; a chain holds at least the leaf.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Combined DER length of every certificate.
    pub fn der_len(&self) -> usize {
        self.der.iter().map(Vec::len).sum()
    }
}

/// Key and chain extracted for one alias, not yet checked.
pub struct LoadedKey {
    private_key: RsaPrivateKey,
    chain: CertificateChain,
}

impl fmt::Debug for LoadedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedKey")
            .field("chain", &self.chain.len())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl LoadedKey {
    /// Pair a key with its chain directly.
    pub fn new(private_key: RsaPrivateKey, chain: CertificateChain) -> Self {
        Self { private_key, chain }
    }

    /// The extracted chain.
    pub fn chain(&self) -> &CertificateChain {
        &self.chain
    }

    /// Check that `now` falls inside the leaf certificate's validity
    /// window.
    pub fn validate(self, now: DateTime<Utc>) -> Result<SigningSession> {
        let (_, leaf) = x509_parser::parse_x509_certificate(self.chain.leaf_der())
            .map_err(|e| Error::SigningConfiguration(format!("Malformed leaf certificate: {}", e)))?;

        let validity = leaf.validity();
        let not_before = validity.not_before.timestamp();
        let not_after = validity.not_after.timestamp();
        let timestamp = now.timestamp();
        if timestamp < not_before {
            return Err(Error::Signing(format!(
                "Signing certificate is not valid until {}",
                validity.not_before
            )));
        }
        if timestamp > not_after {
            return Err(Error::Signing(format!("Signing certificate expired on {}", validity.not_after)));
        }

        let signer_name = leaf
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| leaf.subject().to_string());

        log::debug!("Signing certificate for '{}' valid until {}", signer_name, validity.not_after);
        Ok(SigningSession {
            private_key: self.private_key,
            chain: self.chain,
            signer_name,
        })
    }
}

/// Validated key material for one signing operation.
pub struct SigningSession {
    private_key: RsaPrivateKey,
    chain: CertificateChain,
    signer_name: String,
}

impl fmt::Debug for SigningSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSession")
            .field("signer_name", &self.signer_name)
            .field("chain", &self.chain.len())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl SigningSession {
    /// Signer's private key.
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// Certificate chain, leaf first.
    pub fn chain(&self) -> &CertificateChain {
        &self.chain
    }

    /// Leaf subject common name.
    pub fn signer_name(&self) -> &str {
        &self.signer_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_type_names() {
        assert_eq!("PKCS12".parse::<KeyStoreType>().unwrap(), KeyStoreType::Pkcs12);
        assert_eq!("pfx".parse::<KeyStoreType>().unwrap(), KeyStoreType::Pkcs12);
        assert!(matches!("JKS".parse::<KeyStoreType>(), Err(Error::SigningConfiguration(_))));
    }

    #[test]
    fn test_empty_chain_rejected() {
        assert!(matches!(CertificateChain::from_der(vec![]), Err(Error::SigningConfiguration(_))));
    }

    #[test]
    fn test_garbage_key_store_is_configuration_error() {
        let store = KeyStore::from_bytes("PKCS12", b"not a key store".to_vec(), "secret").unwrap();
        assert!(matches!(store.load("certifier"), Err(Error::SigningConfiguration(_))));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = KeyStore::open("PKCS12", "/nonexistent/keystore.p12", "secret").unwrap_err();
        assert!(matches!(err, Error::SigningConfiguration(_)));
    }

    #[test]
    fn test_debug_redacts_password() {
        let store = KeyStore::from_bytes("PFX", vec![1, 2, 3], "hunter2").unwrap();
        let shown = format!("{:?}", store);
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("redacted"));
    }
}
