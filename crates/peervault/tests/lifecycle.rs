//! End-to-end lifecycle tests: seal, persist, fetch, open, mutate,
//! re-seal and replace, across the memory and SQLite nodes.

use std::sync::Arc;

use peervault::{
    Agent, Context, ContextError, Envelope, EnvelopeError, GroupAgent, Lockable, Node, SqliteNode,
};
use peervault_testkit::{individuals, NoteBook, TestFixture};

#[tokio::test]
async fn test_full_roundtrip_through_node() {
    let fixture = TestFixture::new();
    let envelope = fixture.text_envelope("round and round", &[&fixture.alice, &fixture.bob]);
    let id = envelope.id();

    fixture.node.store_artifact(&envelope).await.unwrap();

    for reader in [&fixture.alice, &fixture.bob] {
        let mut ctx = fixture.context_for(reader);
        let mut fetched = fixture.node.fetch_artifact(id).await.unwrap();
        ctx.open_envelope(&mut fetched).await.unwrap();
        assert_eq!(fetched.content_text().unwrap(), "round and round");
    }
}

#[tokio::test]
async fn test_non_reader_denied() {
    let fixture = TestFixture::new();
    let outsiders = individuals(1);

    let envelope = fixture.text_envelope("private", &[&fixture.alice]);
    fixture.node.store_artifact(&envelope).await.unwrap();

    let mut ctx = fixture.context_for(&outsiders[0]);
    let mut fetched = fixture.node.fetch_artifact(envelope.id()).await.unwrap();
    assert!(matches!(
        ctx.open_envelope(&mut fetched).await,
        Err(ContextError::Envelope(EnvelopeError::AccessDenied(_)))
    ));
}

#[tokio::test]
async fn test_group_fallback_end_to_end() {
    let fixture = TestFixture::new();
    let group_agent = Agent::Group(fixture.group.clone());

    // bob is not a direct reader, only a member of the entitled group
    let envelope = fixture.text_envelope("for members", &[&group_agent]);
    fixture.node.store_artifact(&envelope).await.unwrap();

    let mut ctx = fixture.context_for(&fixture.bob);
    let mut fetched = fixture.node.fetch_artifact(envelope.id()).await.unwrap();
    ctx.open_envelope(&mut fetched).await.unwrap();
    assert_eq!(fetched.content_text().unwrap(), "for members");
    assert!(ctx.has_cached_group(fixture.group.id()));
}

#[tokio::test]
async fn test_fetch_mutate_replace() {
    let fixture = TestFixture::new();
    let envelope = fixture.text_envelope("v1", &[&fixture.alice]);
    let id = envelope.id();
    fixture.node.store_artifact(&envelope).await.unwrap();

    // the sanctioned write path: fetch, open, mutate, close, store
    let mut ctx = fixture.context_for(&fixture.alice);
    let mut current = fixture.node.fetch_artifact(id).await.unwrap();
    ctx.open_envelope(&mut current).await.unwrap();
    current.update_text("v2").unwrap();
    current.close().unwrap();
    fixture.node.store_artifact(&current).await.unwrap();

    // a writer that skipped the fetch has no referral and is rejected
    let rogue = Envelope::builder()
        .id(id)
        .text("rogue")
        .reader(&fixture.alice)
        .seal()
        .unwrap();
    assert!(fixture.node.store_artifact(&rogue).await.is_err());

    let mut fetched = fixture.node.fetch_artifact(id).await.unwrap();
    fetched.open(&fixture.alice).unwrap();
    assert_eq!(fetched.content_text().unwrap(), "v2");
}

#[tokio::test]
async fn test_cosigner_replacement_through_node() {
    let fixture = TestFixture::new();

    // two co-signers signing the same version
    let mut envelope = fixture.text_envelope("policy", &[&fixture.alice, &fixture.bob]);
    envelope.open(&fixture.alice).unwrap();
    envelope.add_signature(&fixture.alice).unwrap();
    envelope.close().unwrap();
    envelope.open(&fixture.bob).unwrap();
    envelope.add_signature(&fixture.bob).unwrap();
    envelope.close().unwrap();
    let id = envelope.id();
    fixture.node.store_artifact(&envelope).await.unwrap();

    // bob alone authorizes the follow-up write
    let mut next = fixture.node.fetch_artifact(id).await.unwrap();
    next.open(&fixture.bob).unwrap();
    next.update_text("amended policy").unwrap();
    next.add_signature(&fixture.bob).unwrap();
    next.close().unwrap();
    fixture.node.store_artifact(&next).await.unwrap();

    // an unsigned replacement of the signed artifact is rejected even with
    // a matching referral
    let mut unsigned = fixture.node.fetch_artifact(id).await.unwrap();
    unsigned.open(&fixture.alice).unwrap();
    unsigned.update_text("silent edit").unwrap();
    unsigned.close().unwrap();
    assert!(fixture.node.store_artifact(&unsigned).await.is_err());
}

#[tokio::test]
async fn test_typed_content_through_storage() {
    let fixture = TestFixture::new();
    let book = NoteBook {
        notes: vec!["first".into()],
    };

    let envelope = Envelope::builder()
        .serialized(&book)
        .unwrap()
        .reader(&fixture.alice)
        .seal()
        .unwrap();
    let id = envelope.id();
    fixture.node.store_artifact(&envelope).await.unwrap();

    let mut fetched = fixture.node.fetch_artifact(id).await.unwrap();
    fetched.open(&fixture.alice).unwrap();
    fetched
        .content_mut::<NoteBook>()
        .unwrap()
        .notes
        .push("second".into());
    fetched.close().unwrap();
    fixture.node.store_artifact(&fetched).await.unwrap();

    let mut reread = fixture.node.fetch_artifact(id).await.unwrap();
    reread.open(&fixture.alice).unwrap();
    let book: NoteBook = reread.content_serialized().unwrap();
    assert_eq!(book.notes, vec!["first".to_string(), "second".to_string()]);
}

#[tokio::test]
async fn test_locked_context_cannot_open() {
    use peervault::AgentStorage;

    let fixture = TestFixture::new();
    let envelope = fixture.text_envelope("locked out", &[&fixture.alice]);

    // the context acts as alice freshly loaded from storage, still locked
    let locked = fixture.node.get_agent(fixture.alice.id()).await.unwrap();
    assert!(locked.is_locked());
    let mut ctx = Context::new(locked, fixture.node.clone());

    let mut copy = Envelope::from_bytes(&envelope.to_bytes().unwrap()).unwrap();
    assert!(ctx.open_envelope(&mut copy).await.is_err());

    ctx.unlock_main_agent(peervault_testkit::ALICE_PASSPHRASE)
        .unwrap();
    ctx.open_envelope(&mut copy).await.unwrap();
    assert_eq!(copy.content_text().unwrap(), "locked out");
}

#[tokio::test]
async fn test_sqlite_node_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let node = Arc::new(SqliteNode::open(dir.path().join("vault.db")).unwrap());

    let fixture = TestFixture::new();
    let group_agent = Agent::Group(fixture.group.clone());
    node.store_agent(&group_agent).await.unwrap();

    let envelope = fixture.text_envelope("durable and shared", &[&group_agent]);
    node.store_artifact(&envelope).await.unwrap();

    let mut ctx = Context::new(fixture.bob.clone(), node.clone());
    let mut fetched = node.fetch_artifact(envelope.id()).await.unwrap();
    ctx.open_envelope(&mut fetched).await.unwrap();
    assert_eq!(fetched.content_text().unwrap(), "durable and shared");
}

#[tokio::test]
async fn test_group_membership_change_round_trip() {
    let fixture = TestFixture::new();
    let outsiders = individuals(1);
    let carol = &outsiders[0];

    let mut group = GroupAgent::create(&[&fixture.alice]).unwrap();
    group.add_member(carol).unwrap();
    let group_agent = Agent::Group(group.clone());
    fixture.node.store_agent(&group_agent).unwrap();

    let envelope = fixture.text_envelope("membership", &[&group_agent]);
    fixture.node.store_artifact(&envelope).await.unwrap();

    let mut ctx = fixture.context_for(carol);
    let mut fetched = fixture.node.fetch_artifact(envelope.id()).await.unwrap();
    ctx.open_envelope(&mut fetched).await.unwrap();
    assert_eq!(fetched.content_text().unwrap(), "membership");
}
