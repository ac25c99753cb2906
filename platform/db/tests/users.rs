mod common;

use common::{seed_user, setup_db};
use entity::constants::{Sex, Status};
use platform_db::{
    DbError,
    users::{
        NewUser, ProfileUpdate, activate, authenticate, check_name_available, create_user,
        get_by_id, get_by_login, issue_activation_key, list, search, set_password, update_profile,
    },
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, QueryFilter};

#[tokio::test]
async fn created_users_get_the_documented_defaults() {
    let db = setup_db().await.unwrap();
    let ann = seed_user(&db, "ann").await;

    assert_eq!(ann.role(), "user");
    assert_eq!(ann.status_code, Status::Inactive);
    assert_eq!(ann.sex(), "Male");
    assert_eq!(ann.phone, "");
    assert_eq!(ann.deposit, Decimal::ZERO);
    assert!(ann.followers.is_empty());
    assert!(ann.following.is_empty());
    assert!(ann.update_at.is_none());
    assert_ne!(ann.password.as_ref().unwrap().as_str(), "ann-password");
}

#[tokio::test]
async fn duplicate_names_and_emails_conflict() {
    let db = setup_db().await.unwrap();
    seed_user(&db, "ann").await;

    let same_name = create_user(
        &db,
        NewUser {
            name: "ann".into(),
            email: "other@example.com".into(),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(same_name, Err(DbError::Conflict(_))));

    let same_email = create_user(
        &db,
        NewUser {
            name: "annie".into(),
            email: "ann@example.com".into(),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(same_email, Err(DbError::Conflict(_))));
}

#[tokio::test]
async fn unique_index_violations_map_to_conflict() {
    let db = setup_db().await.unwrap();
    seed_user(&db, "ann").await;

    // Same name written past the pre-insert checks, as a racing create would.
    let err = entity::users::ActiveModel {
        name: Set("ann".into()),
        email: Set("second-ann@example.com".into()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap_err();

    assert!(matches!(DbError::from(err), DbError::Conflict(_)));
}

#[tokio::test]
async fn blank_or_oversized_names_are_rejected() {
    let db = setup_db().await.unwrap();
    let blank = create_user(
        &db,
        NewUser {
            name: "  ".into(),
            email: "x@example.com".into(),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(blank, Err(DbError::InvalidInput(_))));

    let long = create_user(
        &db,
        NewUser {
            name: "n".repeat(65),
            email: "y@example.com".into(),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(long, Err(DbError::InvalidInput(_))));
}

#[tokio::test]
async fn authenticate_accepts_name_or_email() {
    let db = setup_db().await.unwrap();
    let ann = seed_user(&db, "ann").await;

    let (user, ok) = authenticate(&db, "ann", "ann-password").await.unwrap();
    assert!(ok);
    assert_eq!(user.unwrap().id, ann.id);

    let (user, ok) = authenticate(&db, "ann@example.com", "ann-password")
        .await
        .unwrap();
    assert!(ok);
    assert_eq!(user.unwrap().id, ann.id);
}

#[tokio::test]
async fn authenticate_reports_failures_as_false() {
    let db = setup_db().await.unwrap();
    seed_user(&db, "ann").await;

    let (user, ok) = authenticate(&db, "ann", "wrong").await.unwrap();
    assert!(!ok);
    assert!(user.is_some());

    let (user, ok) = authenticate(&db, "nobody", "ann-password").await.unwrap();
    assert!(!ok);
    assert!(user.is_none());
}

#[tokio::test]
async fn users_without_a_password_never_authenticate() {
    let db = setup_db().await.unwrap();
    create_user(
        &db,
        NewUser {
            name: "ghost".into(),
            email: "ghost@example.com".into(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let (user, ok) = authenticate(&db, "ghost", "").await.unwrap();
    assert!(user.is_some());
    assert!(!ok);
}

#[tokio::test]
async fn set_password_replaces_the_hash() {
    let db = setup_db().await.unwrap();
    let ann = seed_user(&db, "ann").await;

    set_password(&db, ann.id, "fresh").await.unwrap();

    assert!(!authenticate(&db, "ann", "ann-password").await.unwrap().1);
    assert!(authenticate(&db, "ann", "fresh").await.unwrap().1);
}

#[tokio::test]
async fn search_requires_every_keyword_case_insensitively() {
    let db = setup_db().await.unwrap();
    for (name, email) in [
        ("ann_smith", "ann@example.com"),
        ("Ann", "a.SMITH@example.com"),
        ("annabel", "annabel@example.com"),
        ("bob", "smith@example.com"),
    ] {
        create_user(
            &db,
            NewUser {
                name: name.into(),
                email: email.into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    let names: Vec<_> = search(&db, "ann smith")
        .await
        .unwrap()
        .into_iter()
        .map(|user| user.name)
        .collect();
    assert_eq!(names, ["ann_smith", "Ann"]);

    assert_eq!(search(&db, "ANN").await.unwrap().len(), 3);
    assert!(search(&db, "   ").await.unwrap().is_empty());
}

#[tokio::test]
async fn search_wildcards_are_literal() {
    let db = setup_db().await.unwrap();
    seed_user(&db, "ann").await;
    seed_user(&db, "bob").await;

    assert!(search(&db, "%").await.unwrap().is_empty());
    assert!(search(&db, "_").await.unwrap().is_empty());
}

#[tokio::test]
async fn queries_stay_lazy_until_listed() {
    let db = setup_db().await.unwrap();
    seed_user(&db, "ann").await;
    seed_user(&db, "annie").await;

    let query = entity::users::Entity::search("ann")
        .filter(entity::users::Column::Name.ne("annie"));
    let users = list(&db, query).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "ann");
}

#[tokio::test]
async fn name_availability_ignores_the_user_itself() {
    let db = setup_db().await.unwrap();
    let ann = seed_user(&db, "ann").await;
    let bob = seed_user(&db, "bob").await;

    assert!(check_name_available(&db, &ann, "ann").await.unwrap());
    assert!(!check_name_available(&db, &bob, "ann").await.unwrap());
    assert!(check_name_available(&db, &bob, "cat").await.unwrap());
}

#[tokio::test]
async fn lookups_fail_with_not_found() {
    let db = setup_db().await.unwrap();
    assert!(matches!(
        get_by_id(&db, 42).await,
        Err(DbError::NotFound { entity: "user", .. })
    ));
    assert!(matches!(
        get_by_login(&db, "nobody").await,
        Err(DbError::NotFound { .. })
    ));
}

#[tokio::test]
async fn profile_updates_touch_only_given_fields() {
    let db = setup_db().await.unwrap();
    let ann = seed_user(&db, "ann").await;

    let updated = update_profile(
        &db,
        ann.id,
        ProfileUpdate {
            location: Some("Lisbon".into()),
            sex: Some(Sex::Female),
            deposit: Some(Decimal::new(1250, 2)),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.location, "Lisbon");
    assert_eq!(updated.sex(), "Female");
    assert_eq!(updated.deposit, Decimal::new(1250, 2));
    assert_eq!(updated.phone, ann.phone);
    assert_eq!(updated.email, ann.email);
    assert!(updated.update_at.is_some());
}

#[tokio::test]
async fn activation_consumes_the_key() {
    let db = setup_db().await.unwrap();
    let ann = seed_user(&db, "ann").await;

    let key = issue_activation_key(&db, ann.id).await.unwrap();
    let activated = activate(&db, &key).await.unwrap();
    assert_eq!(activated.id, ann.id);
    assert_eq!(activated.status(), "active");
    assert!(activated.activation_key.is_none());

    assert!(matches!(
        activate(&db, &key).await,
        Err(DbError::NotFound { .. })
    ));
}
