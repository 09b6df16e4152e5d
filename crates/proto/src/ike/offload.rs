//! Kernel IPsec offload descriptors
//!
//! A negotiated IKE transform maps to a kernel datapath algorithm so the
//! ESP data plane can run without per-packet software involvement. The
//! descriptor is the bridge: an algorithm name the kernel understands, the
//! raw key material, and the truncated tag/ICV length in bits. Building
//! the descriptor happens here; installing it is the job of an external
//! [`SaInstaller`](ikemux_platform::SaInstaller).

use ikemux_platform::{PlatformResult, SaInstaller};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Kernel name for AES-CBC encryption
pub const OFFLOAD_CRYPT_AES_CBC: &str = "cbc(aes)";

/// Kernel name for AES-CTR encryption (RFC 3686 keying)
pub const OFFLOAD_CRYPT_AES_CTR: &str = "rfc3686(ctr(aes))";

/// Kernel name for AES-GCM combined-mode encryption (RFC 4106 keying)
pub const OFFLOAD_AEAD_AES_GCM: &str = "rfc4106(gcm(aes))";

/// Kernel name for ChaCha20-Poly1305 combined-mode encryption (RFC 7634 keying)
pub const OFFLOAD_AEAD_CHACHA20_POLY1305: &str = "rfc7539esp(chacha20,poly1305)";

/// Kernel name for HMAC-SHA1 authentication
pub const OFFLOAD_AUTH_HMAC_SHA1: &str = "hmac(sha1)";

/// Kernel name for HMAC-SHA2-256 authentication
pub const OFFLOAD_AUTH_HMAC_SHA256: &str = "hmac(sha256)";

/// Kernel name for HMAC-SHA2-384 authentication
pub const OFFLOAD_AUTH_HMAC_SHA384: &str = "hmac(sha384)";

/// Kernel name for HMAC-SHA2-512 authentication
pub const OFFLOAD_AUTH_HMAC_SHA512: &str = "hmac(sha512)";

/// Kernel name for AES-XCBC authentication
pub const OFFLOAD_AUTH_AES_XCBC: &str = "xcbc(aes)";

/// Kernel name for AES-CMAC authentication
pub const OFFLOAD_AUTH_AES_CMAC: &str = "cmac(aes)";

/// One kernel SA algorithm: name, key material, truncated tag length.
///
/// Key material is zeroized on drop. For salted algorithms the salt stays
/// folded into the key, which is how the kernel keying formats (RFC
/// 3686/4106/7634) expect it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct OffloadAlgorithm {
    #[zeroize(skip)]
    name: &'static str,
    key: Vec<u8>,
    #[zeroize(skip)]
    truncation_bits: u32,
}

impl OffloadAlgorithm {
    pub(crate) fn new(name: &'static str, key: Vec<u8>, truncation_bits: u32) -> Self {
        OffloadAlgorithm {
            name,
            key,
            truncation_bits,
        }
    }

    /// Kernel algorithm name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Raw key material, salt included where the keying format folds one in
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Truncated ICV/tag length in bits; 0 for pure encryption algorithms
    pub fn truncation_bits(&self) -> u32 {
        self.truncation_bits
    }

    /// Hand this descriptor to an SA installer.
    ///
    /// # Errors
    ///
    /// Propagates the installer's error unchanged.
    pub async fn install_with(&self, installer: &dyn SaInstaller) -> PlatformResult<()> {
        installer
            .install(self.name, &self.key, self.truncation_bits)
            .await
    }
}

impl std::fmt::Debug for OffloadAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of debug output.
        f.debug_struct("OffloadAlgorithm")
            .field("name", &self.name)
            .field("key_len", &self.key.len())
            .field("truncation_bits", &self.truncation_bits)
            .finish()
    }
}
