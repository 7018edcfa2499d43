//! Property-based tests over the envelope wire format and agent sealing.

use proptest::prelude::*;

use peervault::{Envelope, EnvelopeId, IndividualAgent, Lockable};
use peervault_testkit::generators::{class_tag, passphrase, payload, reader_count, text_content};
use peervault_testkit::individuals;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_text_survives_wire_for_every_reader(
        content in text_content(),
        count in reader_count(),
    ) {
        let agents = individuals(count);
        let refs: Vec<_> = agents.iter().collect();

        let mut builder = Envelope::builder().text(&content);
        for agent in &refs {
            builder = builder.reader(agent);
        }
        let envelope = builder.seal().unwrap();
        let bytes = envelope.to_bytes().unwrap();

        for agent in &refs {
            let mut decoded = Envelope::from_bytes(&bytes).unwrap();
            decoded.open(agent).unwrap();
            prop_assert_eq!(decoded.content_text().unwrap(), content.clone());
        }
    }

    #[test]
    fn test_binary_survives_wire(data in payload(512)) {
        let agents = individuals(1);

        let envelope = Envelope::builder()
            .binary(data.clone())
            .reader(&agents[0])
            .seal()
            .unwrap();

        let mut decoded = Envelope::from_bytes(&envelope.to_bytes().unwrap()).unwrap();
        decoded.open(&agents[0]).unwrap();
        prop_assert_eq!(decoded.content_binary().unwrap(), &data[..]);
    }

    #[test]
    fn test_non_reader_never_opens(data in payload(64)) {
        let agents = individuals(2);

        let envelope = Envelope::builder()
            .binary(data)
            .reader(&agents[0])
            .seal()
            .unwrap();

        let mut decoded = Envelope::from_bytes(&envelope.to_bytes().unwrap()).unwrap();
        prop_assert!(decoded.open(&agents[1]).is_err());
    }

    #[test]
    fn test_class_id_deterministic(tag in class_tag(), identifier in text_content()) {
        let a = EnvelopeId::for_class(&tag, &identifier);
        let b = EnvelopeId::for_class(&tag, &identifier);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn test_class_id_separates_tags(identifier in text_content()) {
        let a = EnvelopeId::for_class("left", &identifier);
        let b = EnvelopeId::for_class("right", &identifier);
        prop_assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_passphrase_rejected(good in passphrase(), bad in passphrase()) {
        prop_assume!(good != bad);

        let mut agent = IndividualAgent::create(&good).unwrap();
        agent.lock();

        prop_assert!(agent.unlock(&bad).is_err());
        prop_assert!(agent.is_locked());
        agent.unlock(&good).unwrap();
        prop_assert!(!agent.is_locked());
    }
}
