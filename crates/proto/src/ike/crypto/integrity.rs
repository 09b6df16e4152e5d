//! Negotiated integrity transforms
//!
//! Implements the MAC half of the IKE transform layer: each negotiated
//! integrity algorithm (RFC 7296 transform type 3) becomes an
//! [`IkeMacIntegrity`] with fixed key and truncated-checksum lengths. The
//! full MAC is computed, then truncated to the algorithm's checksum length
//! as the RFC 4868/2404 "-96"/"-128" suffixes require.

use super::xcbc::AesXcbc;
use crate::ike::offload::{
    OffloadAlgorithm, OFFLOAD_AUTH_AES_CMAC, OFFLOAD_AUTH_AES_XCBC, OFFLOAD_AUTH_HMAC_SHA1,
    OFFLOAD_AUTH_HMAC_SHA256, OFFLOAD_AUTH_HMAC_SHA384, OFFLOAD_AUTH_HMAC_SHA512,
};
use crate::ike::{Error, Result};
use aes::Aes128;
use cmac::Cmac;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

/// Integrity transform identifiers (RFC 7296 transform type 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum IntegrityId {
    /// AUTH_HMAC_SHA1_96 (2)
    HmacSha1_96 = 2,
    /// AUTH_AES_XCBC_96 (5)
    AesXcbc96 = 5,
    /// AUTH_AES_CMAC_96 (8)
    AesCmac96 = 8,
    /// AUTH_HMAC_SHA2_256_128 (12)
    HmacSha256_128 = 12,
    /// AUTH_HMAC_SHA2_384_192 (13)
    HmacSha384_192 = 13,
    /// AUTH_HMAC_SHA2_512_256 (14)
    HmacSha512_256 = 14,
}

impl IntegrityId {
    /// Convert from the wire transform ID
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            2 => Some(IntegrityId::HmacSha1_96),
            5 => Some(IntegrityId::AesXcbc96),
            8 => Some(IntegrityId::AesCmac96),
            12 => Some(IntegrityId::HmacSha256_128),
            13 => Some(IntegrityId::HmacSha384_192),
            14 => Some(IntegrityId::HmacSha512_256),
            _ => None,
        }
    }

    /// Convert to the wire transform ID
    pub fn to_u16(self) -> u16 {
        self as u16
    }
}

/// One negotiated integrity transform for an SA's lifetime.
///
/// Immutable once constructed; a pure function object over
/// caller-supplied key and data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IkeMacIntegrity {
    id: IntegrityId,
    key_len: usize,
    checksum_len: usize,
}

impl IkeMacIntegrity {
    /// Build the transform for a negotiated integrity algorithm.
    ///
    /// Key and checksum lengths are fixed per algorithm; there is no
    /// negotiated key-length attribute for integrity transforms.
    pub fn new(id: IntegrityId) -> Self {
        let (key_len, checksum_len) = match id {
            IntegrityId::HmacSha1_96 => (20, 12),
            IntegrityId::AesXcbc96 => (16, 12),
            IntegrityId::AesCmac96 => (16, 12),
            IntegrityId::HmacSha256_128 => (32, 16),
            IntegrityId::HmacSha384_192 => (48, 24),
            IntegrityId::HmacSha512_256 => (64, 32),
        };

        IkeMacIntegrity {
            id,
            key_len,
            checksum_len,
        }
    }

    /// Negotiated transform ID
    pub fn id(&self) -> IntegrityId {
        self.id
    }

    /// Required key length in bytes
    pub fn key_len(&self) -> usize {
        self.key_len
    }

    /// Truncated checksum length in bytes
    pub fn checksum_len(&self) -> usize {
        self.checksum_len
    }

    /// Compute the truncated checksum over `data`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyLength`] before any cryptographic
    /// operation if `key` does not match the algorithm's key length.
    pub fn generate_checksum(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        if key.len() != self.key_len {
            return Err(Error::InvalidKeyLength {
                expected: self.key_len,
                actual: key.len(),
            });
        }

        let mut full = match self.id {
            IntegrityId::HmacSha1_96 => {
                let mut mac =
                    Hmac::<Sha1>::new_from_slice(key).expect("HMAC can take key of any size");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            IntegrityId::HmacSha256_128 => {
                let mut mac =
                    Hmac::<Sha256>::new_from_slice(key).expect("HMAC can take key of any size");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            IntegrityId::HmacSha384_192 => {
                let mut mac =
                    Hmac::<Sha384>::new_from_slice(key).expect("HMAC can take key of any size");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            IntegrityId::HmacSha512_256 => {
                let mut mac =
                    Hmac::<Sha512>::new_from_slice(key).expect("HMAC can take key of any size");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            IntegrityId::AesXcbc96 => AesXcbc::new(key)?.mac(data).to_vec(),
            IntegrityId::AesCmac96 => {
                let mut mac = Cmac::<Aes128>::new_from_slice(key)
                    .map_err(|_| Error::CryptoError("failed to initialize AES-CMAC".to_string()))?;
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        };

        full.truncate(self.checksum_len);
        Ok(full)
    }

    /// Verify a received checksum in constant time.
    ///
    /// Returns `Ok(false)` on mismatch; the caller decides whether that
    /// means dropping the datagram. Only argument-validation failures are
    /// errors.
    pub fn verify_checksum(&self, key: &[u8], data: &[u8], checksum: &[u8]) -> Result<bool> {
        let computed = self.generate_checksum(key, data)?;
        if checksum.len() != self.checksum_len {
            return Ok(false);
        }
        Ok(computed.as_slice().ct_eq(checksum).into())
    }

    /// Translate this transform plus its key into a kernel IPsec offload
    /// descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyLength`] for mismatched key material.
    pub fn to_offload(&self, key: &[u8]) -> Result<OffloadAlgorithm> {
        if key.len() != self.key_len {
            return Err(Error::InvalidKeyLength {
                expected: self.key_len,
                actual: key.len(),
            });
        }

        let name = match self.id {
            IntegrityId::HmacSha1_96 => OFFLOAD_AUTH_HMAC_SHA1,
            IntegrityId::AesXcbc96 => OFFLOAD_AUTH_AES_XCBC,
            IntegrityId::AesCmac96 => OFFLOAD_AUTH_AES_CMAC,
            IntegrityId::HmacSha256_128 => OFFLOAD_AUTH_HMAC_SHA256,
            IntegrityId::HmacSha384_192 => OFFLOAD_AUTH_HMAC_SHA384,
            IntegrityId::HmacSha512_256 => OFFLOAD_AUTH_HMAC_SHA512,
        };

        Ok(OffloadAlgorithm::new(
            name,
            key.to_vec(),
            (self.checksum_len * 8) as u32,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_id_conversion() {
        assert_eq!(IntegrityId::from_u16(2), Some(IntegrityId::HmacSha1_96));
        assert_eq!(IntegrityId::from_u16(5), Some(IntegrityId::AesXcbc96));
        assert_eq!(IntegrityId::from_u16(14), Some(IntegrityId::HmacSha512_256));
        assert_eq!(IntegrityId::from_u16(99), None);

        assert_eq!(IntegrityId::HmacSha256_128.to_u16(), 12);
        assert_eq!(IntegrityId::AesCmac96.to_u16(), 8);
    }

    #[test]
    fn test_key_and_checksum_lengths() {
        let cases = [
            (IntegrityId::HmacSha1_96, 20, 12),
            (IntegrityId::AesXcbc96, 16, 12),
            (IntegrityId::AesCmac96, 16, 12),
            (IntegrityId::HmacSha256_128, 32, 16),
            (IntegrityId::HmacSha384_192, 48, 24),
            (IntegrityId::HmacSha512_256, 64, 32),
        ];

        for (id, key_len, checksum_len) in cases {
            let transform = IkeMacIntegrity::new(id);
            assert_eq!(transform.key_len(), key_len, "{:?}", id);
            assert_eq!(transform.checksum_len(), checksum_len, "{:?}", id);
        }
    }

    #[test]
    fn test_checksum_length_and_determinism() {
        for id in [
            IntegrityId::HmacSha1_96,
            IntegrityId::AesXcbc96,
            IntegrityId::AesCmac96,
            IntegrityId::HmacSha256_128,
            IntegrityId::HmacSha384_192,
            IntegrityId::HmacSha512_256,
        ] {
            let transform = IkeMacIntegrity::new(id);
            let key = vec![0x42; transform.key_len()];
            let data = b"authenticate me";

            let first = transform.generate_checksum(&key, data).unwrap();
            let second = transform.generate_checksum(&key, data).unwrap();

            assert_eq!(first.len(), transform.checksum_len(), "{:?}", id);
            assert_eq!(first, second, "{:?}", id);
        }
    }

    #[test]
    fn test_different_keys_differ() {
        let transform = IkeMacIntegrity::new(IntegrityId::HmacSha256_128);
        let data = b"payload";

        let a = transform.generate_checksum(&[0x01; 32], data).unwrap();
        let b = transform.generate_checksum(&[0x02; 32], data).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_length_validated_first() {
        for id in [
            IntegrityId::HmacSha1_96,
            IntegrityId::AesXcbc96,
            IntegrityId::HmacSha512_256,
        ] {
            let transform = IkeMacIntegrity::new(id);
            let short_key = vec![0x42; transform.key_len() - 1];

            let result = transform.generate_checksum(&short_key, b"data");
            assert!(
                matches!(result, Err(Error::InvalidKeyLength { .. })),
                "{:?}",
                id
            );

            let result = transform.to_offload(&short_key);
            assert!(matches!(result, Err(Error::InvalidKeyLength { .. })));
        }
    }

    #[test]
    fn test_verify_checksum() {
        let transform = IkeMacIntegrity::new(IntegrityId::HmacSha1_96);
        let key = vec![0x42; 20];
        let data = b"datagram bytes";

        let checksum = transform.generate_checksum(&key, data).unwrap();
        assert!(transform.verify_checksum(&key, data, &checksum).unwrap());

        let mut tampered = checksum.clone();
        tampered[0] ^= 0x01;
        assert!(!transform.verify_checksum(&key, data, &tampered).unwrap());

        // Wrong length never matches.
        assert!(!transform
            .verify_checksum(&key, data, &checksum[..8])
            .unwrap());
    }

    #[test]
    fn test_xcbc_and_cmac_truncate_to_96_bits() {
        let data = b"same input, different primitives";
        let key = vec![0x42; 16];

        let xcbc = IkeMacIntegrity::new(IntegrityId::AesXcbc96)
            .generate_checksum(&key, data)
            .unwrap();
        let cmac = IkeMacIntegrity::new(IntegrityId::AesCmac96)
            .generate_checksum(&key, data)
            .unwrap();

        assert_eq!(xcbc.len(), 12);
        assert_eq!(cmac.len(), 12);
        assert_ne!(xcbc, cmac);
    }

    #[test]
    fn test_offload_mapping() {
        let transform = IkeMacIntegrity::new(IntegrityId::HmacSha256_128);
        let offload = transform.to_offload(&vec![0x42; 32]).unwrap();
        assert_eq!(offload.name(), "hmac(sha256)");
        assert_eq!(offload.truncation_bits(), 128);

        let transform = IkeMacIntegrity::new(IntegrityId::HmacSha1_96);
        let offload = transform.to_offload(&vec![0x42; 20]).unwrap();
        assert_eq!(offload.name(), "hmac(sha1)");
        assert_eq!(offload.truncation_bits(), 96);

        let transform = IkeMacIntegrity::new(IntegrityId::AesXcbc96);
        let offload = transform.to_offload(&vec![0x42; 16]).unwrap();
        assert_eq!(offload.name(), "xcbc(aes)");
        assert_eq!(offload.truncation_bits(), 96);

        let transform = IkeMacIntegrity::new(IntegrityId::HmacSha512_256);
        let offload = transform.to_offload(&vec![0x42; 64]).unwrap();
        assert_eq!(offload.name(), "hmac(sha512)");
        assert_eq!(offload.truncation_bits(), 256);
    }
}
