use campusmart_core::{
    config::AppConfig,
    db::connect,
    dto::{auth::RegisterRequest, items::CreateItemRequest, notifications::NewNotification},
    models::{ItemCondition, ItemType, NotificationType},
    services::{catalog_service, notification_service, session_service},
    store::Store,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,campusmart_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let state = connect(&config.database_url, config.max_connections).await?;
    let mut store = Store::load(state).await?;

    if !store.users().is_empty() {
        tracing::info!(users = store.users().len(), "store already seeded, nothing to do");
        return Ok(());
    }

    let alex = ensure_user(&mut store, "Alex Chen", "alex@example.com", "College", "Junior").await?;
    seed_items(&mut store).await?;
    let sam = ensure_user(&mut store, "Sam Rivera", "sam@example.com", "High School", "11th Grade (Junior)").await?;
    seed_notifications(&mut store, alex, sam).await?;
    session_service::logout(&mut store).await?;

    tracing::info!(
        users = store.users().len(),
        items = store.items().len(),
        "seed completed"
    );
    Ok(())
}

async fn ensure_user(
    store: &mut Store,
    name: &str,
    email: &str,
    school_level: &str,
    grade: &str,
) -> anyhow::Result<uuid::Uuid> {
    let outcome = session_service::register(
        store,
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            school_level: school_level.to_string(),
            grade: grade.to_string(),
        },
    )
    .await?;
    tracing::info!(%email, "ensured user");
    Ok(outcome.data.user.id)
}

async fn seed_items(store: &mut Store) -> anyhow::Result<()> {
    let items = vec![
        ("Neon Skyline Wallpaper Pack", "4K synthwave wallpapers", 450, ItemType::Sale, "Digital Art", ItemCondition::New),
        ("Glassmorphism UI Kit", "120 components for dashboards", 1200, ItemType::Sale, "UI Kits", ItemCondition::New),
        ("VR Headset", "Lightly used, includes controllers", 300, ItemType::Rent, "VR/AR Assets", ItemCondition::UsedLikeNew),
        ("Low-poly Campus Model", "Blender source files", 800, ItemType::Sale, "3D Models", ItemCondition::UsedGood),
    ];

    for (title, description, price, item_type, category, condition) in items {
        catalog_service::add_item(
            store,
            CreateItemRequest {
                title: title.to_string(),
                description: description.to_string(),
                price,
                is_negotiable: price > 500,
                category: vec![category.to_string()],
                item_type,
                image_url: format!("https://picsum.photos/seed/{}/400/300", title.len()),
                condition,
            },
        )
        .await?;
    }

    tracing::info!("seeded items");
    Ok(())
}

async fn seed_notifications(store: &mut Store, seller: uuid::Uuid, buyer: uuid::Uuid) -> anyhow::Result<()> {
    let first_item = store.items().first().map(|item| item.id);
    notification_service::notify(
        store,
        NewNotification {
            recipient_id: seller,
            kind: NotificationType::NewMessage,
            message: "Sam Rivera sent you a message about your listing.".to_string(),
            related_item_id: first_item,
            related_user_id: Some(buyer),
        },
    )
    .await?;
    Ok(())
}
