use proptest::prelude::*;

use nftvote_pinning::ContentHash;

proptest! {
    /// Every well-formed v0 CID validates and survives the ipfs:// prefix.
    #[test]
    fn v0_cids_validate(body in "[1-9A-HJ-NP-Za-km-z]{44}") {
        let cid = format!("Qm{body}");
        prop_assert!(ContentHash::is_valid(&cid));
        let parsed: ContentHash = format!("ipfs://{cid}").parse().unwrap();
        prop_assert_eq!(parsed.as_str(), cid.as_str());
    }

    /// Every well-formed base32 v1 CID validates.
    #[test]
    fn v1_cids_validate(body in "[a-z2-7]{58}") {
        let cid = format!("b{body}");
        prop_assert!(ContentHash::is_valid(&cid));
    }

    /// Validation never panics on arbitrary text.
    #[test]
    fn arbitrary_text_never_panics(s in "\\PC{0,80}") {
        let _ = ContentHash::is_valid(&s);
        let _ = s.parse::<ContentHash>();
    }
}
