use rand::Rng;

use crate::crypto::aka::MSK_LEN;

pub const MPPE_KEY_LEN: usize = 32;
pub const SALT_LEN: usize = 2;
const BLOCK_LEN: usize = 16;

/// MS-MPPE-Recv-Key and MS-MPPE-Send-Key material taken from the MSK
/// (RFC 3748 section 7.10).
pub fn mppe_keys_from_msk(msk: &[u8; MSK_LEN]) -> ([u8; MPPE_KEY_LEN], [u8; MPPE_KEY_LEN]) {
    let mut recv = [0u8; MPPE_KEY_LEN];
    let mut send = [0u8; MPPE_KEY_LEN];
    recv.copy_from_slice(&msk[..MPPE_KEY_LEN]);
    send.copy_from_slice(&msk[MPPE_KEY_LEN..]);
    (recv, send)
}

/// Salt with the most significant bit set, as RFC 2548 requires.
pub fn random_salt() -> [u8; SALT_LEN] {
    let mut salt: [u8; SALT_LEN] = rand::thread_rng().gen();
    salt[0] |= 0x80;
    salt
}

/// Encrypts a key for an MS-MPPE-Send/Recv-Key attribute (RFC 2548 section
/// 2.4.2). The plaintext is `len(key) | key` zero-padded to 16 bytes, each
/// block XORed with MD5(secret | previous), where the first "previous" is
/// `authenticator | salt`. Returns `salt | ciphertext`.
pub fn encrypt_mppe_key(
    key: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
    salt: [u8; SALT_LEN],
) -> Vec<u8> {
    let mut plain = Vec::with_capacity(1 + key.len() + BLOCK_LEN);
    plain.push(key.len() as u8);
    plain.extend_from_slice(key);
    plain.resize(plain.len().div_ceil(BLOCK_LEN) * BLOCK_LEN, 0);

    let mut out = Vec::with_capacity(SALT_LEN + plain.len());
    out.extend_from_slice(&salt);

    let mut chain = Vec::with_capacity(BLOCK_LEN + SALT_LEN);
    chain.extend_from_slice(authenticator);
    chain.extend_from_slice(&salt);

    for block in plain.chunks_exact(BLOCK_LEN) {
        let mut input = Vec::with_capacity(secret.len() + chain.len());
        input.extend_from_slice(secret);
        input.extend_from_slice(&chain);
        let mask = md5::compute(&input);

        let cipher: Vec<u8> = block.iter().zip(mask.iter()).map(|(p, m)| p ^ m).collect();
        out.extend_from_slice(&cipher);
        chain = cipher;
    }

    out
}
