//! Negotiated encryption transforms
//!
//! Implements the cipher half of the IKE transform layer: each negotiated
//! encryption algorithm (RFC 7296 transform type 1) becomes an
//! [`IkeCipher`] with fixed key/IV/salt/tag geometry and
//! encrypt/decrypt/IV-generation operations over caller-supplied byte
//! arrays. AEAD handling follows RFC 5282: the salt carried at the tail of
//! the keying material concatenates with the per-message IV to form the
//! nonce, and the tag rides at the end of the ciphertext.

use crate::ike::offload::{
    OffloadAlgorithm, OFFLOAD_AEAD_AES_GCM, OFFLOAD_AEAD_CHACHA20_POLY1305, OFFLOAD_CRYPT_AES_CBC,
    OFFLOAD_CRYPT_AES_CTR,
};
use crate::ike::{Error, Result};
use aes::{Aes128, Aes192, Aes256};
use aes_gcm::{
    aead::{
        consts::{U12, U16, U8},
        Aead, KeyInit, Nonce, Payload,
    },
    AesGcm,
};
use chacha20poly1305::ChaCha20Poly1305;
use cipher::{block_padding::NoPadding, BlockModeDecrypt, BlockModeEncrypt, KeyIvInit, StreamCipher};
use des::TdesEde3;
use rand::RngCore;

type TdesCbcEnc = cbc::Encryptor<TdesEde3>;
type TdesCbcDec = cbc::Decryptor<TdesEde3>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes192CbcEnc = cbc::Encryptor<Aes192>;
type Aes192CbcDec = cbc::Decryptor<Aes192>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

// RFC 3686 counter mode: 32-bit big-endian block counter starting at 1.
type Aes128Ctr = ctr::Ctr32BE<Aes128>;
type Aes192Ctr = ctr::Ctr32BE<Aes192>;
type Aes256Ctr = ctr::Ctr32BE<Aes256>;

// RFC 4106 AES-GCM with 8-byte explicit IV and 8/12/16-byte tags.
type Aes128Gcm8 = AesGcm<Aes128, U12, U8>;
type Aes192Gcm8 = AesGcm<Aes192, U12, U8>;
type Aes256Gcm8 = AesGcm<Aes256, U12, U8>;
type Aes128Gcm12 = AesGcm<Aes128, U12, U12>;
type Aes192Gcm12 = AesGcm<Aes192, U12, U12>;
type Aes256Gcm12 = AesGcm<Aes256, U12, U12>;
type Aes128Gcm16 = AesGcm<Aes128, U12, U16>;
type Aes192Gcm16 = AesGcm<Aes192, U12, U16>;
type Aes256Gcm16 = AesGcm<Aes256, U12, U16>;

/// Encryption transform identifiers (RFC 7296 transform type 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CipherId {
    /// ENCR_3DES (3)
    TripleDesCbc = 3,
    /// ENCR_AES_CBC (12)
    AesCbc = 12,
    /// ENCR_AES_CTR (13)
    AesCtr = 13,
    /// ENCR_AES_GCM_8 (18)
    AesGcm8 = 18,
    /// ENCR_AES_GCM_12 (19)
    AesGcm12 = 19,
    /// ENCR_AES_GCM_16 (20)
    AesGcm16 = 20,
    /// ENCR_CHACHA20_POLY1305 (28)
    ChaCha20Poly1305 = 28,
}

impl CipherId {
    /// Convert from the wire transform ID
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            3 => Some(CipherId::TripleDesCbc),
            12 => Some(CipherId::AesCbc),
            13 => Some(CipherId::AesCtr),
            18 => Some(CipherId::AesGcm8),
            19 => Some(CipherId::AesGcm12),
            20 => Some(CipherId::AesGcm16),
            28 => Some(CipherId::ChaCha20Poly1305),
            _ => None,
        }
    }

    /// Convert to the wire transform ID
    pub fn to_u16(self) -> u16 {
        self as u16
    }
}

/// One negotiated encryption transform for an SA's lifetime.
///
/// Immutable once constructed. The transform is a pure function object
/// over caller-supplied key/IV/data; it holds no key material itself.
///
/// For salted algorithms (AES-CTR, AES-GCM, ChaCha20-Poly1305) the
/// negotiated keying material carries the salt at its tail, so
/// [`key_len`](Self::key_len) includes the salt bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IkeCipher {
    id: CipherId,
    key_len: usize,
    iv_len: usize,
    salt_len: usize,
    tag_len: usize,
}

impl IkeCipher {
    /// Build the transform for a negotiated encryption algorithm.
    ///
    /// # Arguments
    ///
    /// * `id` - Negotiated transform ID
    /// * `key_len_bits` - Negotiated key-length attribute in bits; pass 0
    ///   for algorithms whose key length is fixed (3DES-CBC,
    ///   ChaCha20-Poly1305)
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for a key length the algorithm
    /// does not define. This is a caller bug, not a runtime condition.
    pub fn new(id: CipherId, key_len_bits: usize) -> Result<Self> {
        let (secret_len, iv_len, salt_len, tag_len) = match id {
            CipherId::TripleDesCbc => {
                if key_len_bits != 0 && key_len_bits != 192 {
                    return Err(Error::InvalidParameter(format!(
                        "3DES-CBC key length is fixed at 192 bits, got {}",
                        key_len_bits
                    )));
                }
                (24, 8, 0, 0)
            }
            CipherId::AesCbc => (aes_key_len(id, key_len_bits)?, 16, 0, 0),
            CipherId::AesCtr => (aes_key_len(id, key_len_bits)?, 8, 4, 0),
            CipherId::AesGcm8 => (aes_key_len(id, key_len_bits)?, 8, 4, 8),
            CipherId::AesGcm12 => (aes_key_len(id, key_len_bits)?, 8, 4, 12),
            CipherId::AesGcm16 => (aes_key_len(id, key_len_bits)?, 8, 4, 16),
            CipherId::ChaCha20Poly1305 => {
                if key_len_bits != 0 && key_len_bits != 256 {
                    return Err(Error::InvalidParameter(format!(
                        "ChaCha20-Poly1305 key length is fixed at 256 bits, got {}",
                        key_len_bits
                    )));
                }
                (32, 8, 4, 16)
            }
        };

        Ok(IkeCipher {
            id,
            key_len: secret_len + salt_len,
            iv_len,
            salt_len,
            tag_len,
        })
    }

    /// Negotiated transform ID
    pub fn id(&self) -> CipherId {
        self.id
    }

    /// Required keying-material length in bytes, salt included
    pub fn key_len(&self) -> usize {
        self.key_len
    }

    /// Per-message IV length in bytes
    pub fn iv_len(&self) -> usize {
        self.iv_len
    }

    /// Salt length in bytes folded into the keying material
    pub fn salt_len(&self) -> usize {
        self.salt_len
    }

    /// Authentication tag length in bytes; 0 for non-AEAD algorithms
    pub fn tag_len(&self) -> usize {
        self.tag_len
    }

    /// Whether this is an AEAD algorithm
    pub fn is_aead(&self) -> bool {
        self.tag_len > 0
    }

    /// Generate a fresh random IV of the right length for this transform.
    pub fn generate_iv(&self) -> Vec<u8> {
        let mut iv = vec![0u8; self.iv_len];
        rand::thread_rng().fill_bytes(&mut iv);
        iv
    }

    /// Encrypt `plaintext`.
    ///
    /// For AEAD algorithms the result is ciphertext with the tag appended
    /// and `aad` is authenticated; for block/counter ciphers `aad` is
    /// unused and block ciphers require block-aligned input (padding is
    /// the message layer's job).
    ///
    /// # Errors
    ///
    /// Key/IV length mismatches and unaligned block input are
    /// argument-validation failures, surfaced before any cryptographic
    /// operation runs.
    pub fn encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let (secret, salt) = self.split_key(key)?;
        self.check_iv(iv)?;

        match self.id {
            CipherId::TripleDesCbc => {
                check_block_aligned(plaintext, 8)?;
                cbc_encrypt::<TdesCbcEnc>(secret, iv, plaintext)
            }
            CipherId::AesCbc => {
                check_block_aligned(plaintext, 16)?;
                match secret.len() {
                    16 => cbc_encrypt::<Aes128CbcEnc>(secret, iv, plaintext),
                    24 => cbc_encrypt::<Aes192CbcEnc>(secret, iv, plaintext),
                    _ => cbc_encrypt::<Aes256CbcEnc>(secret, iv, plaintext),
                }
            }
            CipherId::AesCtr => {
                let block = ctr_counter_block(salt, iv);
                match secret.len() {
                    16 => ctr_apply::<Aes128Ctr>(secret, &block, plaintext),
                    24 => ctr_apply::<Aes192Ctr>(secret, &block, plaintext),
                    _ => ctr_apply::<Aes256Ctr>(secret, &block, plaintext),
                }
            }
            CipherId::AesGcm8 => {
                let nonce = aead_nonce(salt, iv);
                match secret.len() {
                    16 => aead_seal::<Aes128Gcm8>(secret, &nonce, plaintext, aad),
                    24 => aead_seal::<Aes192Gcm8>(secret, &nonce, plaintext, aad),
                    _ => aead_seal::<Aes256Gcm8>(secret, &nonce, plaintext, aad),
                }
            }
            CipherId::AesGcm12 => {
                let nonce = aead_nonce(salt, iv);
                match secret.len() {
                    16 => aead_seal::<Aes128Gcm12>(secret, &nonce, plaintext, aad),
                    24 => aead_seal::<Aes192Gcm12>(secret, &nonce, plaintext, aad),
                    _ => aead_seal::<Aes256Gcm12>(secret, &nonce, plaintext, aad),
                }
            }
            CipherId::AesGcm16 => {
                let nonce = aead_nonce(salt, iv);
                match secret.len() {
                    16 => aead_seal::<Aes128Gcm16>(secret, &nonce, plaintext, aad),
                    24 => aead_seal::<Aes192Gcm16>(secret, &nonce, plaintext, aad),
                    _ => aead_seal::<Aes256Gcm16>(secret, &nonce, plaintext, aad),
                }
            }
            CipherId::ChaCha20Poly1305 => {
                let nonce = aead_nonce(salt, iv);
                aead_seal::<ChaCha20Poly1305>(secret, &nonce, plaintext, aad)
            }
        }
    }

    /// Decrypt `ciphertext` (tag included for AEAD algorithms).
    ///
    /// # Errors
    ///
    /// A bad AEAD tag surfaces as [`Error::AuthenticationFailed`],
    /// distinct from every other failure: callers treat it as a
    /// protocol-level rejection of the datagram, not a local fault.
    pub fn decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let (secret, salt) = self.split_key(key)?;
        self.check_iv(iv)?;

        if self.is_aead() && ciphertext.len() < self.tag_len {
            return Err(Error::BufferTooShort {
                required: self.tag_len,
                available: ciphertext.len(),
            });
        }

        match self.id {
            CipherId::TripleDesCbc => {
                check_block_aligned(ciphertext, 8)?;
                cbc_decrypt::<TdesCbcDec>(secret, iv, ciphertext)
            }
            CipherId::AesCbc => {
                check_block_aligned(ciphertext, 16)?;
                match secret.len() {
                    16 => cbc_decrypt::<Aes128CbcDec>(secret, iv, ciphertext),
                    24 => cbc_decrypt::<Aes192CbcDec>(secret, iv, ciphertext),
                    _ => cbc_decrypt::<Aes256CbcDec>(secret, iv, ciphertext),
                }
            }
            CipherId::AesCtr => {
                let block = ctr_counter_block(salt, iv);
                match secret.len() {
                    16 => ctr_apply::<Aes128Ctr>(secret, &block, ciphertext),
                    24 => ctr_apply::<Aes192Ctr>(secret, &block, ciphertext),
                    _ => ctr_apply::<Aes256Ctr>(secret, &block, ciphertext),
                }
            }
            CipherId::AesGcm8 => {
                let nonce = aead_nonce(salt, iv);
                match secret.len() {
                    16 => aead_open::<Aes128Gcm8>(secret, &nonce, ciphertext, aad),
                    24 => aead_open::<Aes192Gcm8>(secret, &nonce, ciphertext, aad),
                    _ => aead_open::<Aes256Gcm8>(secret, &nonce, ciphertext, aad),
                }
            }
            CipherId::AesGcm12 => {
                let nonce = aead_nonce(salt, iv);
                match secret.len() {
                    16 => aead_open::<Aes128Gcm12>(secret, &nonce, ciphertext, aad),
                    24 => aead_open::<Aes192Gcm12>(secret, &nonce, ciphertext, aad),
                    _ => aead_open::<Aes256Gcm12>(secret, &nonce, ciphertext, aad),
                }
            }
            CipherId::AesGcm16 => {
                let nonce = aead_nonce(salt, iv);
                match secret.len() {
                    16 => aead_open::<Aes128Gcm16>(secret, &nonce, ciphertext, aad),
                    24 => aead_open::<Aes192Gcm16>(secret, &nonce, ciphertext, aad),
                    _ => aead_open::<Aes256Gcm16>(secret, &nonce, ciphertext, aad),
                }
            }
            CipherId::ChaCha20Poly1305 => {
                let nonce = aead_nonce(salt, iv);
                aead_open::<ChaCha20Poly1305>(secret, &nonce, ciphertext, aad)
            }
        }
    }

    /// Translate this transform plus its keying material into a kernel
    /// IPsec offload descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyLength`] for mismatched keying material
    /// and [`Error::UnsupportedAlgorithm`] where the kernel datapath has
    /// no equivalent (3DES-CBC).
    pub fn to_offload(&self, key: &[u8]) -> Result<OffloadAlgorithm> {
        if key.len() != self.key_len {
            return Err(Error::InvalidKeyLength {
                expected: self.key_len,
                actual: key.len(),
            });
        }

        let (name, truncation_bits) = match self.id {
            CipherId::TripleDesCbc => {
                return Err(Error::UnsupportedAlgorithm(
                    "3DES-CBC has no kernel offload equivalent".to_string(),
                ))
            }
            CipherId::AesCbc => (OFFLOAD_CRYPT_AES_CBC, 0),
            CipherId::AesCtr => (OFFLOAD_CRYPT_AES_CTR, 0),
            CipherId::AesGcm8 | CipherId::AesGcm12 | CipherId::AesGcm16 => {
                (OFFLOAD_AEAD_AES_GCM, (self.tag_len * 8) as u32)
            }
            CipherId::ChaCha20Poly1305 => (OFFLOAD_AEAD_CHACHA20_POLY1305, 128),
        };

        Ok(OffloadAlgorithm::new(name, key.to_vec(), truncation_bits))
    }

    fn split_key<'a>(&self, key: &'a [u8]) -> Result<(&'a [u8], &'a [u8])> {
        if key.len() != self.key_len {
            return Err(Error::InvalidKeyLength {
                expected: self.key_len,
                actual: key.len(),
            });
        }
        Ok(key.split_at(self.key_len - self.salt_len))
    }

    fn check_iv(&self, iv: &[u8]) -> Result<()> {
        if iv.len() != self.iv_len {
            return Err(Error::InvalidIvLength {
                expected: self.iv_len,
                actual: iv.len(),
            });
        }
        Ok(())
    }
}

fn aes_key_len(id: CipherId, key_len_bits: usize) -> Result<usize> {
    match key_len_bits {
        128 => Ok(16),
        192 => Ok(24),
        256 => Ok(32),
        _ => Err(Error::InvalidParameter(format!(
            "{:?} does not define a {}-bit key",
            id, key_len_bits
        ))),
    }
}

fn check_block_aligned(data: &[u8], block_len: usize) -> Result<()> {
    if data.len() % block_len != 0 {
        return Err(Error::InvalidParameter(format!(
            "input length {} is not a multiple of the {}-byte block size",
            data.len(),
            block_len
        )));
    }
    Ok(())
}

/// AEAD nonce per RFC 5282/4106: keying-material salt, then the
/// per-message IV.
fn aead_nonce(salt: &[u8], iv: &[u8]) -> Vec<u8> {
    let mut nonce = Vec::with_capacity(salt.len() + iv.len());
    nonce.extend_from_slice(salt);
    nonce.extend_from_slice(iv);
    nonce
}

/// Initial CTR counter block per RFC 3686: salt, IV, then a 32-bit
/// big-endian block counter starting at 1.
fn ctr_counter_block(salt: &[u8], iv: &[u8]) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[..4].copy_from_slice(salt);
    block[4..12].copy_from_slice(iv);
    block[15] = 1;
    block
}

fn aead_seal<A>(key: &[u8], nonce: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>>
where
    A: Aead + KeyInit,
{
    let sealer = A::new_from_slice(key)
        .map_err(|_| Error::CryptoError("failed to initialize AEAD cipher".to_string()))?;
    sealer
        .encrypt(
            Nonce::<A>::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| Error::CryptoError("AEAD encryption failed".to_string()))
}

fn aead_open<A>(key: &[u8], nonce: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>>
where
    A: Aead + KeyInit,
{
    let opener = A::new_from_slice(key)
        .map_err(|_| Error::CryptoError("failed to initialize AEAD cipher".to_string()))?;
    opener
        .decrypt(
            Nonce::<A>::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| Error::AuthenticationFailed)
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockModeEncrypt + KeyIvInit,
{
    let enc = C::new_from_slices(key, iv)
        .map_err(|_| Error::CryptoError("failed to initialize CBC cipher".to_string()))?;
    Ok(enc.encrypt_padded_vec::<NoPadding>(plaintext))
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockModeDecrypt + KeyIvInit,
{
    let dec = C::new_from_slices(key, iv)
        .map_err(|_| Error::CryptoError("failed to initialize CBC cipher".to_string()))?;
    dec.decrypt_padded_vec::<NoPadding>(ciphertext)
        .map_err(|_| Error::CryptoError("CBC decryption failed".to_string()))
}

fn ctr_apply<C>(key: &[u8], counter_block: &[u8], data: &[u8]) -> Result<Vec<u8>>
where
    C: StreamCipher + KeyIvInit,
{
    let mut ctr = C::new_from_slices(key, counter_block)
        .map_err(|_| Error::CryptoError("failed to initialize CTR cipher".to_string()))?;
    let mut buf = data.to_vec();
    ctr.apply_keystream(&mut buf);
    Ok(buf)
}
