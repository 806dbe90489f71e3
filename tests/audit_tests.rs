//! Administrative modification flow and audit scoping.

use std::sync::Arc;

use rust_decimal_macros::dec;

use margindesk::audit::{ModificationService, ProposedValues};
use margindesk::domain::{
    ActorId, Direction, DurationUnit, HoldDuration, InstrumentCatalog, NewPosition, OwnerId,
    PositionField, PositionStatus, Symbol,
};
use margindesk::engine::LifecycleManager;
use margindesk::error::{Error, StoreError, ValidationError};
use margindesk::store::{MemoryStore, Scope};

fn params(owner: &str) -> NewPosition {
    NewPosition {
        owner: OwnerId::new(owner),
        symbol: Symbol::new("BTCUSD"),
        direction: Direction::Long,
        open_price: dec!(43250),
        stake: dec!(1000),
        leverage: 100,
        capital_fraction: dec!(0.5),
        lot_size: dec!(0.001),
        duration: HoldDuration::new(1, DurationUnit::Day),
        stop_loss: None,
        take_profit: None,
    }
}

fn setup() -> (Arc<LifecycleManager<MemoryStore>>, ModificationService<MemoryStore>) {
    let engine = Arc::new(LifecycleManager::new(
        Arc::new(MemoryStore::new()),
        InstrumentCatalog::new(),
    ));
    let service = ModificationService::new(Arc::clone(&engine));
    (engine, service)
}

#[tokio::test]
async fn full_modification_flow_writes_history_once_per_field() {
    let (engine, service) = setup();
    let id = engine.open(params("alice")).await.unwrap();

    let proposed = ProposedValues {
        open_price: Some(dec!(43000)),
        stake: Some(dec!(1200)),
        // Present but unchanged: must not produce a record.
        leverage: Some(100),
        ..Default::default()
    };
    let records = service
        .propose(
            &Scope::Admin,
            ActorId::new("admin-1"),
            "Admin One",
            id,
            &proposed,
            "correcting entry",
        )
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    let fields: Vec<PositionField> = records.iter().map(|r| r.field()).collect();
    assert!(fields.contains(&PositionField::OpenPrice));
    assert!(fields.contains(&PositionField::Stake));

    let history = service.history(&Scope::Admin, Some(id)).await.unwrap();
    assert_eq!(history.len(), 2);

    // The position reflects the new values, with profit recomputed against
    // the corrected open price.
    let position = engine.position(id).unwrap();
    assert_eq!(position.open_price(), dec!(43000));
    assert_eq!(position.stake(), dec!(1200));
    assert!(position.profit() > dec!(0));
}

#[tokio::test]
async fn mentor_sees_only_assigned_clients() {
    let (engine, service) = setup();
    let alice_pos = engine.open(params("alice")).await.unwrap();
    let bob_pos = engine.open(params("bob")).await.unwrap();

    for (id, owner) in [(alice_pos, "alice"), (bob_pos, "bob")] {
        let proposed = ProposedValues {
            stake: Some(dec!(1111)),
            ..Default::default()
        };
        service
            .propose(
                &Scope::Admin,
                ActorId::new("admin-1"),
                "Admin",
                id,
                &proposed,
                format!("adjust {owner}").as_str(),
            )
            .await
            .unwrap();
    }

    let mentor = Scope::Mentor(vec![OwnerId::new("alice")]);
    let mentor_view = service.history(&mentor, None).await.unwrap();
    assert_eq!(mentor_view.len(), 1);
    assert_eq!(mentor_view[0].position_id(), alice_pos);

    let admin_view = service.history(&Scope::Admin, None).await.unwrap();
    assert_eq!(admin_view.len(), 2);
}

#[tokio::test]
async fn mentor_cannot_modify_outside_scope() {
    let (engine, service) = setup();
    let id = engine.open(params("alice")).await.unwrap();

    let mentor = Scope::Mentor(vec![OwnerId::new("bob")]);
    let proposed = ProposedValues {
        stake: Some(dec!(1)),
        ..Default::default()
    };
    let err = service
        .propose(&mentor, ActorId::new("mentor-1"), "Mentor", id, &proposed, "tweak")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Store(StoreError::NotFound(_))));
    assert!(service.history(&Scope::Admin, Some(id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn modifying_a_terminal_position_is_a_conflict() {
    let (engine, service) = setup();
    let id = engine.open(params("alice")).await.unwrap();
    engine.close(id).await.unwrap();

    let proposed = ProposedValues {
        stake: Some(dec!(5000)),
        ..Default::default()
    };
    let err = service
        .propose(&Scope::Admin, ActorId::new("admin-1"), "Admin", id, &proposed, "late edit")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::Conflict(_))));
}

#[tokio::test]
async fn operator_liquidation_through_status_field() {
    let (engine, service) = setup();
    let id = engine.open(params("alice")).await.unwrap();

    let proposed = ProposedValues {
        status: Some(PositionStatus::Liquidated),
        ..Default::default()
    };
    let records = service
        .propose(
            &Scope::Admin,
            ActorId::new("admin-1"),
            "Admin",
            id,
            &proposed,
            "margin breach",
        )
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].field(), PositionField::Status);
    // Terminal positions leave the local book.
    assert!(engine.position(id).is_none());
}

#[tokio::test]
async fn reason_is_required_even_with_a_real_diff() {
    let (engine, service) = setup();
    let id = engine.open(params("alice")).await.unwrap();

    let proposed = ProposedValues {
        stake: Some(dec!(9999)),
        ..Default::default()
    };
    let err = service
        .propose(&Scope::Admin, ActorId::new("admin-1"), "Admin", id, &proposed, "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(ValidationError::EmptyReason)));
}
