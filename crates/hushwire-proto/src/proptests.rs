use proptest::prelude::*;

use crate::models::Envelope;

fn arb_envelope() -> impl Strategy<Value = Envelope> {
    (
        ".{0,16}",
        ".{0,16}",
        prop::collection::vec(any::<u8>(), 0..256),
        ".{0,32}",
        prop::array::uniform24(any::<u8>()),
    )
        .prop_map(|(sender, recipient, body, ts, nonce)| {
            Envelope::new(sender, recipient, body, ts, nonce)
        })
}

proptest! {
    // The relay forwards frames verbatim, so decoding what it re-encodes
    // must give back the same envelope.
    #[test]
    fn envelope_json_is_lossless(env in arb_envelope()) {
        let json = env.to_json().unwrap();
        prop_assert_eq!(Envelope::from_json(&json).unwrap(), env);
    }

    #[test]
    fn validity_matches_field_emptiness(env in arb_envelope()) {
        let expected = !env.sender_id.is_empty()
            && !env.recipient_id.is_empty()
            && !env.body.is_empty();
        prop_assert_eq!(env.is_valid(), expected);
    }
}
