//! Self-contained AES-XCBC-MAC (RFC 3566)
//!
//! General-purpose crypto libraries rarely carry AES-XCBC, so the
//! primitive is implemented here directly over the AES block cipher
//! rather than looked up from a provider. Output is the full 128-bit MAC
//! (the AES-XCBC-PRF-128 value); AES-XCBC-96 truncation is applied by the
//! integrity transform.

use crate::ike::{Error, Result};
use aes::Aes128;
use cipher::{array::Array, BlockCipherEncrypt, KeyInit};

/// AES-XCBC key length in bytes
pub(crate) const XCBC_KEY_LEN: usize = 16;

const BLOCK_LEN: usize = 16;

/// Keyed AES-XCBC-MAC instance.
///
/// Derives the three subkeys of RFC 3566 Section 4 at construction:
/// K1 = E_K(0x01^16), K2 = E_K(0x02^16), K3 = E_K(0x03^16).
pub(crate) struct AesXcbc {
    k1: Aes128,
    k2: [u8; BLOCK_LEN],
    k3: [u8; BLOCK_LEN],
}

impl AesXcbc {
    /// Create an instance keyed with a 128-bit key.
    pub(crate) fn new(key: &[u8]) -> Result<Self> {
        if key.len() != XCBC_KEY_LEN {
            return Err(Error::InvalidKeyLength {
                expected: XCBC_KEY_LEN,
                actual: key.len(),
            });
        }

        let cipher = Aes128::new_from_slice(key)
            .map_err(|_| Error::CryptoError("failed to initialize AES for XCBC".to_string()))?;

        let k1_bytes = derive_subkey(&cipher, 0x01);
        let k2 = derive_subkey(&cipher, 0x02);
        let k3 = derive_subkey(&cipher, 0x03);

        // K1 is itself an AES key; 16 derived bytes always fit.
        let k1 = Aes128::new_from_slice(&k1_bytes)
            .map_err(|_| Error::CryptoError("failed to initialize AES-XCBC subkey".to_string()))?;

        Ok(AesXcbc { k1, k2, k3 })
    }

    /// Compute the full 128-bit MAC over `data`.
    pub(crate) fn mac(&self, data: &[u8]) -> [u8; BLOCK_LEN] {
        let mut e = [0u8; BLOCK_LEN];

        // Every complete block except a complete final one goes through
        // the plain CBC phase.
        let rem = data.len() % BLOCK_LEN;
        let head_blocks = if data.is_empty() {
            0
        } else if rem == 0 {
            data.len() / BLOCK_LEN - 1
        } else {
            data.len() / BLOCK_LEN
        };

        for block in data[..head_blocks * BLOCK_LEN].chunks_exact(BLOCK_LEN) {
            xor_in_place(&mut e, block);
            self.k1.encrypt_block(Array::from_mut_slice(&mut e));
        }

        // Final block: complete blocks mix with K2, padded blocks with K3
        // (RFC 3566 pads with a single 0x80 then zeros).
        let mut last = [0u8; BLOCK_LEN];
        if !data.is_empty() && rem == 0 {
            last.copy_from_slice(&data[head_blocks * BLOCK_LEN..]);
            xor_in_place(&mut last, &self.k2);
        } else {
            let tail = &data[head_blocks * BLOCK_LEN..];
            last[..tail.len()].copy_from_slice(tail);
            last[tail.len()] = 0x80;
            xor_in_place(&mut last, &self.k3);
        }

        xor_in_place(&mut last, &e);
        self.k1.encrypt_block(Array::from_mut_slice(&mut last));
        last
    }
}

fn derive_subkey(cipher: &Aes128, fill: u8) -> [u8; BLOCK_LEN] {
    let mut block = [fill; BLOCK_LEN];
    cipher.encrypt_block(Array::from_mut_slice(&mut block));
    block
}

fn xor_in_place(acc: &mut [u8; BLOCK_LEN], other: &[u8]) {
    for (a, b) in acc.iter_mut().zip(other) {
        *a ^= b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 3566 Section 4 test vectors, all keyed with
    // 000102030405060708090a0b0c0d0e0f.
    const KEY: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
        0x0e, 0x0f,
    ];

    fn ascending(len: usize) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }

    fn check(message: &[u8], expected_hex: &str) {
        let mac = AesXcbc::new(&KEY).unwrap().mac(message);
        assert_eq!(hex::encode(mac), expected_hex);
    }

    #[test]
    fn test_rfc3566_empty_message() {
        check(&[], "75f0251d528ac01c4573dfd584d79f29");
    }

    #[test]
    fn test_rfc3566_3_bytes() {
        check(&ascending(3), "5b376580ae2f19afe7219ceef172756f");
    }

    #[test]
    fn test_rfc3566_16_bytes() {
        check(&ascending(16), "d2a246fa349b68a79998a4394ff7a263");
    }

    #[test]
    fn test_rfc3566_20_bytes() {
        check(&ascending(20), "47f51b4564966215b8985c63055ed308");
    }

    #[test]
    fn test_rfc3566_32_bytes() {
        check(&ascending(32), "f54f0ec8d2b9f3d36807734bd5283fd4");
    }

    #[test]
    fn test_rfc3566_34_bytes() {
        check(&ascending(34), "becbb3bccdb518a30677d5481fb6b4d8");
    }

    #[test]
    fn test_rfc3566_1000_zero_bytes() {
        check(&[0u8; 1000], "f0dafee895db30253761103b5d84528f");
    }

    #[test]
    fn test_wrong_key_length_rejected() {
        let result = AesXcbc::new(&[0u8; 20]);
        assert!(matches!(result, Err(Error::InvalidKeyLength { .. })));
    }
}
