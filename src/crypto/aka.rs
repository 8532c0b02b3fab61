use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};

use crate::types::aka::MAC_LEN;

type HmacSha1 = Hmac<Sha1>;

pub const MK_LEN: usize = 20;
pub const K_ENCR_LEN: usize = 16;
pub const K_AUT_LEN: usize = 16;
pub const MSK_LEN: usize = 64;
pub const EMSK_LEN: usize = 64;
pub const KEYSTREAM_LEN: usize = K_ENCR_LEN + K_AUT_LEN + MSK_LEN + EMSK_LEN;

const SHA1_BLOCK_LEN: usize = 64;
const SHA1_INIT: [u32; 5] = [0x67452301, 0xEFCDAB89, 0x98BADCFE, 0x10325476, 0xC3D2E1F0];

/// MK = SHA1(Identity | IK | CK), RFC 4187 section 7.
pub fn derive_master_key(identity: &[u8], ik: &[u8], ck: &[u8]) -> [u8; MK_LEN] {
    let mut hasher = Sha1::new();
    hasher.update(identity);
    hasher.update(ik);
    hasher.update(ck);
    hasher.finalize().into()
}

/// FIPS 186-2 (change notice 1) pseudo-random function with XSEED = 0, as
/// profiled by RFC 4186 appendix B. Produces four rounds of two 20-byte blocks.
pub fn expand(master_key: &[u8; MK_LEN]) -> [u8; KEYSTREAM_LEN] {
    let mut xkey = *master_key;
    let mut out = [0u8; KEYSTREAM_LEN];

    for chunk in out.chunks_exact_mut(MK_LEN) {
        let w = g_function(&xkey);
        chunk.copy_from_slice(&w);
        xkey = add_one_mod_2_160(&xkey, &w);
    }

    out
}

/// G(t, c): the SHA-1 compression function applied to `c` zero-padded to one
/// block, without the usual length padding.
fn g_function(xval: &[u8; MK_LEN]) -> [u8; MK_LEN] {
    let mut block = [0u8; SHA1_BLOCK_LEN];
    block[..MK_LEN].copy_from_slice(xval);

    let mut state = SHA1_INIT;
    sha1::compress(&mut state, &[block.into()]);

    let mut out = [0u8; MK_LEN];
    for (dst, word) in out.chunks_exact_mut(4).zip(state.iter()) {
        dst.copy_from_slice(&word.to_be_bytes());
    }
    out
}

/// (1 + a + b) mod 2^160 over big-endian byte strings.
fn add_one_mod_2_160(a: &[u8; MK_LEN], b: &[u8; MK_LEN]) -> [u8; MK_LEN] {
    let mut out = [0u8; MK_LEN];
    let mut carry: u16 = 1;
    for i in (0..MK_LEN).rev() {
        let sum = a[i] as u16 + b[i] as u16 + carry;
        out[i] = sum as u8;
        carry = sum >> 8;
    }
    out
}

#[derive(Clone, PartialEq, Eq)]
pub struct AkaKeys {
    pub k_encr: [u8; K_ENCR_LEN],
    pub k_aut: [u8; K_AUT_LEN],
    pub msk: [u8; MSK_LEN],
    pub emsk: [u8; EMSK_LEN],
}

impl AkaKeys {
    pub fn derive(identity: &[u8], ik: &[u8], ck: &[u8]) -> Self {
        let mk = derive_master_key(identity, ik, ck);
        Self::from_keystream(&expand(&mk))
    }

    fn from_keystream(stream: &[u8; KEYSTREAM_LEN]) -> Self {
        let mut keys = Self {
            k_encr: [0; K_ENCR_LEN],
            k_aut: [0; K_AUT_LEN],
            msk: [0; MSK_LEN],
            emsk: [0; EMSK_LEN],
        };

        let (k_encr, rest) = stream.split_at(K_ENCR_LEN);
        let (k_aut, rest) = rest.split_at(K_AUT_LEN);
        let (msk, emsk) = rest.split_at(MSK_LEN);
        keys.k_encr.copy_from_slice(k_encr);
        keys.k_aut.copy_from_slice(k_aut);
        keys.msk.copy_from_slice(msk);
        keys.emsk.copy_from_slice(emsk);
        keys
    }
}

impl std::fmt::Debug for AkaKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AkaKeys").finish_non_exhaustive()
    }
}

/// AT_MAC value: HMAC-SHA1-128 keyed with K_aut.
pub fn gen_mac(data: &[u8], k_aut: &[u8]) -> [u8; MAC_LEN] {
    let mut mac = HmacSha1::new_from_slice(k_aut).expect("HMAC can take key of any size");
    mac.update(data);
    let digest = mac.finalize().into_bytes();

    let mut out = [0u8; MAC_LEN];
    out.copy_from_slice(&digest[..MAC_LEN]);
    out
}

/// Writes the MAC of `packet` (whose AT_MAC value at `mac_offset` must be
/// zeroed) into place.
pub fn sign_packet(packet: &mut [u8], mac_offset: usize, k_aut: &[u8]) {
    let mac = gen_mac(packet, k_aut);
    packet[mac_offset..mac_offset + MAC_LEN].copy_from_slice(&mac);
}

/// Recomputes the MAC over a copy of `packet` with the AT_MAC value zeroed and
/// compares it with the received value in constant time.
pub fn verify_packet_mac(packet: &[u8], mac_offset: usize, k_aut: &[u8]) -> bool {
    let Some(received) = packet.get(mac_offset..mac_offset + MAC_LEN) else {
        return false;
    };

    let mut zeroed = packet.to_vec();
    zeroed[mac_offset..mac_offset + MAC_LEN].fill(0);

    let mut mac = HmacSha1::new_from_slice(k_aut).expect("HMAC can take key of any size");
    mac.update(&zeroed);
    mac.verify_truncated_left(received).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: &[u8] = b"0001010000000055@wlan.mnc001.mcc001.3gppnetwork.org";

    fn ik() -> Vec<u8> {
        hex::decode("d5370f13796f2f615cbe15ef9f420a98").unwrap()
    }

    fn ck() -> Vec<u8> {
        hex::decode("a835cf22b0f43e1519d6fd234c00d793").unwrap()
    }

    #[test]
    fn test_prf_fips_186_2_change_notice_example() {
        let xkey: [u8; MK_LEN] = hex::decode("bd029bbe7f51960bcf9edb2b61f06f0feb5a38b6")
            .unwrap()
            .try_into()
            .unwrap();

        let stream = expand(&xkey);
        assert_eq!(
            hex::encode(&stream[..40]),
            "2070b3223dba372fde1c0ffc7b2e3b498b2606143c6c18bacb0f6c55babb13788e20d737a3275116"
        );
    }

    #[test]
    fn test_g_function_is_bare_compression() {
        assert_eq!(
            hex::encode(g_function(&[0u8; MK_LEN])),
            "92b404e556588ced6c1acd4ebf053f6809f73a93"
        );
    }

    #[test]
    fn test_derive_master_key() {
        let mk = derive_master_key(IDENTITY, &ik(), &ck());
        assert_eq!(hex::encode(mk), "42efa5f9608f587a536362412b4352704398598e");
    }

    #[test]
    fn test_aka_keys_known_vector() {
        let keys = AkaKeys::derive(IDENTITY, &ik(), &ck());

        assert_eq!(hex::encode(keys.k_encr), "bcacab96dbf78dc168486776ea183d8a");
        assert_eq!(hex::encode(keys.k_aut), "c343c03e4b78b4034fa188c731558fcd");
        assert_eq!(
            hex::encode(keys.msk),
            "c1ea86870a60c923fdea4a86396d243053359c9751c871ef5372dc5ed78ca642\
             9716adc52d475229c7ab0397d79a58819746c7ac0a516e6eee45176fdae7f722"
        );
        assert_eq!(
            hex::encode(keys.emsk),
            "a512744af69690b2f9c2c490711bd90f04b9f1b0f73d45d1021bdb2e041c9fea\
             56e9022c3a8f16a1bd77b9ed7f651ec729e69fbc5fe73289fa2eece0372a2493"
        );
    }

    #[test]
    fn test_add_wraps_at_160_bits() {
        let all_ones = [0xFFu8; MK_LEN];
        let zero = [0u8; MK_LEN];
        assert_eq!(add_one_mod_2_160(&all_ones, &zero), [0u8; MK_LEN]);

        let mut expected = [0u8; MK_LEN];
        expected[MK_LEN - 1] = 3;
        let mut two = [0u8; MK_LEN];
        two[MK_LEN - 1] = 2;
        assert_eq!(add_one_mod_2_160(&zero, &two), expected);
    }

    #[test]
    fn test_challenge_mac_known_vector() {
        let keys = AkaKeys::derive(IDENTITY, &ik(), &ck());
        let mut packet = hex::decode(
            "01020044170100000105000000112233445566778899aabbccddeeff02050000\
             5c2b1e4a8f1e80002f9d1bc7e56a00110b05000000000000000000000000000000000000",
        )
        .unwrap();

        sign_packet(&mut packet, 52, &keys.k_aut);
        assert_eq!(hex::encode(&packet[52..]), "a5c357328a18b53037317c0bb9419bf1");
        assert!(verify_packet_mac(&packet, 52, &keys.k_aut));
    }

    #[test]
    fn test_verify_rejects_tampered_packet() {
        let keys = AkaKeys::derive(IDENTITY, &ik(), &ck());
        let mut packet = vec![2, 2, 0, 28, 23, 1, 0, 0, 11, 5, 0, 0];
        packet.extend_from_slice(&[0u8; 16]);
        sign_packet(&mut packet, 12, &keys.k_aut);
        assert!(verify_packet_mac(&packet, 12, &keys.k_aut));

        packet[1] = 3;
        assert!(!verify_packet_mac(&packet, 12, &keys.k_aut));
        assert!(!verify_packet_mac(&packet, 20, &keys.k_aut));
    }

    #[test]
    fn test_gen_mac_length() {
        assert_eq!(gen_mac(b"test message", &[0x42u8; 16]).len(), MAC_LEN);
    }
}
