mod common;

use campusmart_core::{
    error::{AppError, ErrorKind},
    models::{
        Destination, ItemStatus, ItemType, NotificationType, Plan, PurchaseContext,
        TransactionType,
    },
    services::{
        catalog_service, notification_service, payment_service, session_service,
        transaction_service,
    },
};
use common::{add_card, current, list_item, register_member, setup_store, sign_in, visa};

#[tokio::test]
async fn cart_checkout_settles_every_item_at_once() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    let seller = register_member(&mut store, "Ada", "a@x.com").await?;
    let lamp = list_item(&mut store, "Desk Lamp", 100, ItemType::Sale).await?;
    let monitor = list_item(&mut store, "Monitor", 250, ItemType::Sale).await?;

    register_member(&mut store, "Bea", "b@x.com").await?;
    catalog_service::add_to_cart(&mut store, lamp.id).await?;
    catalog_service::add_to_cart(&mut store, monitor.id).await?;
    let card = add_card(&mut store).await?;

    let cart = catalog_service::cart_summary(&store)?.items;
    transaction_service::begin_purchase(&mut store, PurchaseContext::Cart(cart))?;
    let context = transaction_service::cancel_purchase(&mut store);
    assert!(transaction_service::pending_purchase(&store).is_none());

    let outcome = transaction_service::confirm_purchase(&mut store, context, &card).await?;
    assert_eq!(outcome.data.martcoins_earned, 35);
    assert_eq!(
        outcome.message,
        "Successfully purchased 2 items! You earned 35 Martcoins."
    );

    let buyer = current(&store);
    assert_eq!(buyer.martcoin_balance, 35);
    assert!(buyer.cart.is_empty());
    assert!(buyer.has_purchased(lamp.id) && buyer.has_purchased(monitor.id));
    assert_eq!(buyer.transaction_history.len(), 1);
    let receipt = &buyer.transaction_history[0];
    assert_eq!(receipt.amount, 350);
    assert_eq!(receipt.item_title, "2 items purchased");
    assert_eq!(receipt.transaction_type, TransactionType::Purchase);

    for id in [lamp.id, monitor.id] {
        let item = store.snapshot().item(id).expect("item kept");
        assert_eq!(item.status, ItemStatus::Sold);
    }
    let inbox = notification_service::list_for_user(&store, seller.id);
    assert_eq!(inbox.len(), 2);
    assert!(inbox.iter().all(|n| n.kind == NotificationType::ItemSold));
    Ok(())
}

#[tokio::test]
async fn single_purchase_earns_a_tenth_of_the_price() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    register_member(&mut store, "Ada", "a@x.com").await?;
    let notes = list_item(&mut store, "Lecture Notes", 55, ItemType::Sale).await?;

    register_member(&mut store, "Bea", "b@x.com").await?;
    let card = add_card(&mut store).await?;
    let outcome = transaction_service::confirm_purchase(
        &mut store,
        Some(PurchaseContext::Item(notes.clone())),
        &card,
    )
    .await?;

    assert_eq!(outcome.data.martcoins_earned, 5);
    assert_eq!(outcome.message, "Purchase successful! You earned 5 Martcoins.");
    assert_eq!(outcome.data.transaction.item_title, "Lecture Notes");
    assert_eq!(current(&store).martcoin_balance, 5);
    assert_eq!(current(&store).purchased_item_ids, vec![notes.id]);
    Ok(())
}

#[tokio::test]
async fn plan_purchase_switches_the_plan() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    register_member(&mut store, "Ada", "a@x.com").await?;
    let card = add_card(&mut store).await?;

    assert_eq!(
        transaction_service::select_plan(&mut store, Plan::Pro, 199)?,
        Destination::Payment
    );
    let context = transaction_service::pending_purchase(&store).cloned();
    let outcome = transaction_service::confirm_purchase(&mut store, context, &card).await?;

    assert_eq!(outcome.message, "Successfully subscribed to the Pro plan!");
    assert_eq!(outcome.data.martcoins_earned, 0);
    let user = current(&store);
    assert_eq!(user.plan, Plan::Pro);
    assert_eq!(user.martcoin_balance, 0);
    assert_eq!(user.transaction_history[0].item_title, "Pro Plan Subscription");
    assert_eq!(user.transaction_history[0].amount, 199);
    assert!(transaction_service::pending_purchase(&store).is_none());
    Ok(())
}

#[tokio::test]
async fn confirming_without_context_or_user_expires_the_session() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    register_member(&mut store, "Ada", "a@x.com").await?;
    let book = list_item(&mut store, "Textbook", 300, ItemType::Sale).await?;
    let card = add_card(&mut store).await?;
    let before = current(&store);

    let err = transaction_service::confirm_purchase(&mut store, None, &card)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SessionExpired));
    assert_eq!(current(&store), before);

    transaction_service::begin_purchase(&mut store, PurchaseContext::Item(book.clone()))?;
    session_service::logout(&mut store).await?;
    let err = transaction_service::confirm_purchase(
        &mut store,
        Some(PurchaseContext::Item(book.clone())),
        &card,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::SessionExpired));
    assert!(transaction_service::pending_purchase(&store).is_none());
    assert_eq!(
        store.snapshot().item(book.id).map(|i| i.status),
        Some(ItemStatus::Available)
    );
    Ok(())
}

#[tokio::test]
async fn sold_items_cannot_be_bought_again() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    register_member(&mut store, "Ada", "a@x.com").await?;
    let bike = list_item(&mut store, "Bike", 1200, ItemType::Sale).await?;

    register_member(&mut store, "Bea", "b@x.com").await?;
    let card = add_card(&mut store).await?;
    transaction_service::confirm_purchase(
        &mut store,
        Some(PurchaseContext::Item(bike.clone())),
        &card,
    )
    .await?;

    register_member(&mut store, "Cy", "c@x.com").await?;
    let card = add_card(&mut store).await?;
    let err = transaction_service::confirm_purchase(
        &mut store,
        Some(PurchaseContext::Cart(vec![bike.clone()])),
        &card,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unavailable(ref title) if title == "Bike"));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let cy = current(&store);
    assert_eq!(cy.martcoin_balance, 0);
    assert!(cy.transaction_history.is_empty());
    Ok(())
}

#[tokio::test]
async fn payment_method_must_belong_to_the_buyer() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    register_member(&mut store, "Ada", "a@x.com").await?;
    let theirs = add_card(&mut store).await?;
    let poster = list_item(&mut store, "Poster", 30, ItemType::Sale).await?;

    register_member(&mut store, "Bea", "b@x.com").await?;
    payment_service::add_payment_method(&mut store, visa("1111", false)).await?;
    let err = transaction_service::confirm_purchase(
        &mut store,
        Some(PurchaseContext::Item(poster)),
        &theirs,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.to_string(), "Please select a valid payment method.");
    Ok(())
}

#[tokio::test]
async fn anonymous_checkout_resumes_at_payment_after_login() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    register_member(&mut store, "Ada", "a@x.com").await?;
    let desk = list_item(&mut store, "Standing Desk", 800, ItemType::Sale).await?;
    session_service::logout(&mut store).await?;

    let err = transaction_service::begin_purchase(&mut store, PurchaseContext::Item(desk.clone()))
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::LoginRequired {
            resume: Destination::Payment,
            ..
        }
    ));
    assert_eq!(
        transaction_service::pending_purchase(&store),
        Some(&PurchaseContext::Item(desk))
    );

    register_member(&mut store, "Bea", "b@x.com").await?;
    sign_in(&mut store, "b@x.com").await?;
    assert!(transaction_service::pending_purchase(&store).is_some());

    let err = transaction_service::begin_purchase(&mut store, PurchaseContext::Cart(Vec::new()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}

#[tokio::test]
async fn rentals_charge_per_hour_and_leave_the_item_listed() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    register_member(&mut store, "Ada", "a@x.com").await?;
    let camera = list_item(&mut store, "Camera", 40, ItemType::Rent).await?;
    let tripod = list_item(&mut store, "Tripod", 90, ItemType::Sale).await?;

    register_member(&mut store, "Bea", "b@x.com").await?;
    let outcome = transaction_service::confirm_rental(&mut store, camera.id, 3).await?;
    assert_eq!(outcome.data.amount, 120);
    assert_eq!(outcome.data.transaction_type, TransactionType::Rental);
    assert_eq!(outcome.data.rental_duration_hours, Some(3));

    let renter = current(&store);
    assert_eq!(renter.martcoin_balance, 0);
    assert_eq!(renter.transaction_history[0].id, outcome.data.id);
    assert_eq!(
        store.snapshot().item(camera.id).map(|i| i.status),
        Some(ItemStatus::Available)
    );
    assert_eq!(transaction_service::transaction_history(&store)?.len(), 1);

    let err = transaction_service::confirm_rental(&mut store, tripod.id, 2)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = transaction_service::confirm_rental(&mut store, camera.id, 0)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    session_service::enter_guest_mode(&mut store).await?;
    let err = transaction_service::confirm_rental(&mut store, camera.id, 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    Ok(())
}

#[tokio::test]
async fn relisted_item_bought_twice_is_recorded_twice() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    register_member(&mut store, "Ada", "a@x.com").await?;
    let kettle = list_item(&mut store, "Kettle", 80, ItemType::Sale).await?;

    register_member(&mut store, "Bea", "b@x.com").await?;
    let card = add_card(&mut store).await?;
    transaction_service::confirm_purchase(
        &mut store,
        Some(PurchaseContext::Item(kettle.clone())),
        &card,
    )
    .await?;

    catalog_service::update_item(&mut store, kettle.clone()).await?;
    assert_eq!(
        store.snapshot().item(kettle.id).map(|i| i.status),
        Some(ItemStatus::Available)
    );
    transaction_service::confirm_purchase(
        &mut store,
        Some(PurchaseContext::Item(kettle.clone())),
        &card,
    )
    .await?;

    let buyer = current(&store);
    assert_eq!(buyer.purchased_item_ids, vec![kettle.id, kettle.id]);
    assert_eq!(buyer.transaction_history.len(), 2);
    assert_eq!(buyer.martcoin_balance, 16);
    Ok(())
}

#[tokio::test]
async fn cart_checkout_does_not_repeat_already_purchased_ids() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    register_member(&mut store, "Ada", "a@x.com").await?;
    let kettle = list_item(&mut store, "Kettle", 80, ItemType::Sale).await?;
    let mug = list_item(&mut store, "Mug", 20, ItemType::Sale).await?;

    register_member(&mut store, "Bea", "b@x.com").await?;
    let card = add_card(&mut store).await?;
    transaction_service::confirm_purchase(
        &mut store,
        Some(PurchaseContext::Item(kettle.clone())),
        &card,
    )
    .await?;
    catalog_service::update_item(&mut store, kettle.clone()).await?;

    catalog_service::add_to_cart(&mut store, kettle.id).await?;
    catalog_service::add_to_cart(&mut store, mug.id).await?;
    catalog_service::add_to_cart(&mut store, kettle.id).await?;
    let cart = catalog_service::cart_summary(&store)?.items;
    let outcome =
        transaction_service::confirm_purchase(&mut store, Some(PurchaseContext::Cart(cart)), &card)
            .await?;

    assert_eq!(outcome.data.transaction.amount, 180);
    assert_eq!(current(&store).purchased_item_ids, vec![kettle.id, mug.id]);
    Ok(())
}

#[tokio::test]
async fn totals_that_overflow_are_rejected() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    register_member(&mut store, "Ada", "a@x.com").await?;
    let crane = list_item(&mut store, "Crane", i64::MAX / 2, ItemType::Rent).await?;
    let yacht = list_item(&mut store, "Yacht", i64::MAX, ItemType::Sale).await?;
    let pencil = list_item(&mut store, "Pencil", 10, ItemType::Sale).await?;

    register_member(&mut store, "Bea", "b@x.com").await?;
    let err = transaction_service::confirm_rental(&mut store, crane.id, 3)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Total is too large.");
    assert!(current(&store).transaction_history.is_empty());

    catalog_service::add_to_cart(&mut store, yacht.id).await?;
    catalog_service::add_to_cart(&mut store, pencil.id).await?;
    let err = catalog_service::cart_summary(&store).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let card = add_card(&mut store).await?;
    let err = transaction_service::confirm_purchase(
        &mut store,
        Some(PurchaseContext::Cart(vec![yacht.clone(), pencil.clone()])),
        &card,
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Total is too large.");
    let buyer = current(&store);
    assert_eq!(buyer.cart, vec![yacht.id, pencil.id]);
    assert!(buyer.purchased_item_ids.is_empty());
    assert_eq!(
        store.snapshot().item(yacht.id).map(|i| i.status),
        Some(ItemStatus::Available)
    );
    Ok(())
}
