// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! GF(2^128) arithmetic for the GCM datapath model
//!
//! Blocks are big-endian `u128`, so bit 0 of the field element is the most
//! significant bit of the integer.

/// GCM reduction constant, x^128 + x^7 + x^2 + x + 1 in reflected form
const R: u128 = 0xE1 << 120;

/// Multiply two field elements
pub(crate) fn gf_mul(x: u128, y: u128) -> u128 {
    let mut z = 0u128;
    let mut v = y;
    for i in 0..128 {
        if (x >> (127 - i)) & 1 == 1 {
            z ^= v;
        }
        let lsb = v & 1;
        v >>= 1;
        if lsb == 1 {
            v ^= R;
        }
    }
    z
}

/// Fold one block into a running GHASH accumulator
pub(crate) fn fold(acc: u128, h: u128, block: u128) -> u128 {
    gf_mul(acc ^ block, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The multiplicative identity is the element with only bit 0 set
    const ONE: u128 = 1 << 127;

    #[test]
    fn test_identity() {
        let a = 0x66e9_4bd4_ef8a_2c3b_884c_fa59_ca34_2b2e;
        assert_eq!(gf_mul(a, ONE), a);
        assert_eq!(gf_mul(ONE, a), a);
        assert_eq!(gf_mul(a, 0), 0);
    }

    #[test]
    fn test_commutes() {
        let a = 0x0388_dace_60b6_a392_f328_c2b9_71b2_fe78;
        let b = 0x66e9_4bd4_ef8a_2c3b_884c_fa59_ca34_2b2e;
        assert_eq!(gf_mul(a, b), gf_mul(b, a));
    }

    #[test]
    fn test_gcm_zero_vector_hash() {
        // H = AES_0(0), C = AES-GCM of one zero block under the zero key/nonce
        let h = 0x66e9_4bd4_ef8a_2c3b_884c_fa59_ca34_2b2e;
        let c = 0x0388_dace_60b6_a392_f328_c2b9_71b2_fe78;
        let len = 128u128;
        let ghash = fold(fold(0, h, c), h, len);
        let ek_y0 = 0x58e2_fcce_fa7e_3061_367f_1d57_a4e7_455a;
        assert_eq!(ghash ^ ek_y0, 0xab6e_47d4_2cec_13bd_f53a_67b2_1257_bddf);
    }
}
