use proptest::prelude::*;

use hushwire_proto::constants::bearer;

use crate::token::{AuthError, TokenIssuer};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn token_carries_any_identifier(user in "\\PC{1,40}") {
        let issuer = TokenIssuer::new(b"prop-secret");
        let token = issuer.create_token(&user).unwrap();
        let profile = issuer.parse_token(&bearer(&token)).unwrap();
        prop_assert_eq!(profile.user_id, user);
    }

    #[test]
    fn single_field_headers_are_malformed(field in "[^\\s]{0,64}") {
        let issuer = TokenIssuer::new(b"prop-secret");
        prop_assert_eq!(issuer.parse_token(&field), Err(AuthError::MalformedHeader));
    }

    #[test]
    fn arbitrary_headers_never_authenticate(header in "\\PC{0,200}") {
        let issuer = TokenIssuer::new(b"prop-secret");
        prop_assert!(issuer.parse_token(&header).is_err());
    }
}
