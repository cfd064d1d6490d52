///! Decryption of storage service payloads
///!
///! Every payload (manifest or sticker) is `IV(16) || AES-256-CBC ciphertext || HMAC-SHA256(32)`.
///! Both keys are derived from the pack key with HKDF-SHA256.
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

const HKDF_INFO: &[u8] = b"Sticker Pack";
const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;
const MAC_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecryptError {
    #[error("pack key is not valid hex")]
    InvalidKeyEncoding,
    #[error("pack key must be {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("payload too short ({0} bytes)")]
    TooShort(usize),
    #[error("payload authentication failed")]
    BadMac,
    #[error("invalid padding")]
    BadPadding,
}

/// AES and HMAC keys of one pack
pub struct PackKeys {
    aes_key: [u8; KEY_LEN],
    mac_key: [u8; KEY_LEN],
}

impl PackKeys {
    /// Derive both keys from the hex-encoded pack key
    pub fn derive(pack_key: &str) -> Result<Self, DecryptError> {
        let ikm = hex::decode(pack_key.trim()).map_err(|_| DecryptError::InvalidKeyEncoding)?;
        if ikm.len() != KEY_LEN {
            return Err(DecryptError::InvalidKeyLength(ikm.len()));
        }

        let hkdf = Hkdf::<Sha256>::new(Some(&[0u8; 32][..]), &ikm);
        let mut okm = [0u8; KEY_LEN * 2];
        hkdf.expand(HKDF_INFO, &mut okm)
            .map_err(|_| DecryptError::InvalidKeyLength(ikm.len()))?;

        let mut aes_key = [0u8; KEY_LEN];
        let mut mac_key = [0u8; KEY_LEN];
        aes_key.copy_from_slice(&okm[..KEY_LEN]);
        mac_key.copy_from_slice(&okm[KEY_LEN..]);

        Ok(Self { aes_key, mac_key })
    }

    /// Verify the MAC, then decrypt
    pub fn decrypt(&self, payload: &[u8]) -> Result<Vec<u8>, DecryptError> {
        if payload.len() < IV_LEN + MAC_LEN {
            return Err(DecryptError::TooShort(payload.len()));
        }

        let (body, their_mac) = payload.split_at(payload.len() - MAC_LEN);
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.mac_key).map_err(|_| DecryptError::BadMac)?;
        mac.update(body);
        mac.verify_slice(their_mac).map_err(|_| DecryptError::BadMac)?;

        let (iv, ciphertext) = body.split_at(IV_LEN);
        Aes256CbcDec::new_from_slices(&self.aes_key, iv)
            .map_err(|_| DecryptError::BadPadding)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| DecryptError::BadPadding)
    }
}
