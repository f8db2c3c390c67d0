use parcel_desk::domain::identifier::Identifier;
use parcel_desk::domain::package::{Disposition, NewPackage, Submitter};
use parcel_desk::domain::ports::{DecoderBox, LedgerBox};
use parcel_desk::infrastructure::decoder::TextPayloadDecoder;
use parcel_desk::infrastructure::in_memory::InMemoryLedger;
use parcel_desk::infrastructure::sqlite::SqliteLedger;

#[tokio::test]
async fn test_ports_as_trait_objects() {
    let ledgers: Vec<LedgerBox> = vec![
        Box::new(InMemoryLedger::new()),
        Box::new(SqliteLedger::open_in_memory().unwrap()),
    ];
    let decoder: DecoderBox = Box::new(TextPayloadDecoder);

    for ledger in ledgers {
        let package = NewPackage::new(
            Identifier::parse("AB1234567").unwrap(),
            Disposition::Delivered,
            None,
            Submitter::new(1),
        );

        // Verify Send + Sync by spawning tasks
        let handle = tokio::spawn(async move {
            ledger.commit(package).await.unwrap();
            ledger
                .exists(&Identifier::parse("AB1234567").unwrap())
                .await
                .unwrap()
        });
        assert!(handle.await.unwrap());
    }

    let decoded = tokio::spawn(async move { decoder.decode(b"AB1234567").await });
    assert_eq!(decoded.await.unwrap().as_deref(), Some("AB1234567"));
}
