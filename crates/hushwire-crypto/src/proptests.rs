#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::envelope::{open, seal};
    use crate::error::CryptoError;
    use crate::keys::Keypair;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        // open(seal(p, a_sk, b_pk), a_pk, b_sk) == p
        #[test]
        fn test_seal_open_round_trip(
            plaintext in prop::collection::vec(any::<u8>(), 0..2048),
            a_seed in any::<[u8; 32]>(),
            b_seed in any::<[u8; 32]>(),
        ) {
            let alice = Keypair::from_secret_bytes(a_seed);
            let bob = Keypair::from_secret_bytes(b_seed);

            let sealed = seal(&plaintext, alice.secret_key(), &bob.public_key()).unwrap();
            let opened = open(&sealed.ciphertext, &sealed.nonce, &alice.public_key(), bob.secret_key()).unwrap();
            prop_assert_eq!(opened, plaintext);
        }

        // Flipping any single bit of the ciphertext is detected.
        #[test]
        fn test_ciphertext_bit_flip_detected(
            plaintext in prop::collection::vec(any::<u8>(), 1..512),
            bit in any::<prop::sample::Index>(),
        ) {
            let alice = Keypair::generate().unwrap();
            let bob = Keypair::generate().unwrap();
            let mut sealed = alice.seal_for(&bob.public_key(), &plaintext).unwrap();

            let idx = bit.index(sealed.ciphertext.len() * 8);
            sealed.ciphertext[idx / 8] ^= 1 << (idx % 8);

            let result = bob.open_from(&alice.public_key(), &sealed.ciphertext, &sealed.nonce);
            prop_assert_eq!(result, Err(CryptoError::AuthenticationFailed));
        }

        // Flipping any single bit of the nonce is detected.
        #[test]
        fn test_nonce_bit_flip_detected(
            plaintext in prop::collection::vec(any::<u8>(), 0..512),
            bit in 0usize..(24 * 8),
        ) {
            let alice = Keypair::generate().unwrap();
            let bob = Keypair::generate().unwrap();
            let mut sealed = alice.seal_for(&bob.public_key(), &plaintext).unwrap();

            sealed.nonce[bit / 8] ^= 1 << (bit % 8);

            let result = bob.open_from(&alice.public_key(), &sealed.ciphertext, &sealed.nonce);
            prop_assert_eq!(result, Err(CryptoError::AuthenticationFailed));
        }
    }
}
