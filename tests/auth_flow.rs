mod common;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use storefront_api::{
    dto::auth::{LoginRequest, RegisterRequest},
    entity::users::{Column as UserCol, Entity as Users},
    error::{AppError, INVALID_CREDENTIALS},
    services::auth_service::{EMAIL_TAKEN, login_user, register_user},
};

fn register(email: &str, password: &str, confirm: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.into(),
        password: password.into(),
        confirm_password: confirm.into(),
    }
}

fn login(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn second_registration_with_same_email_is_rejected() -> anyhow::Result<()> {
    let state = common::setup_state().await?;

    register_user(&state, register("a@x.com", "secret1", "secret1")).await?;
    let err = register_user(&state, register("a@x.com", "other12", "other12"))
        .await
        .unwrap_err();
    assert!(matches!(&err, AppError::BadRequest(msg) if msg == EMAIL_TAKEN));

    let rows = Users::find()
        .filter(UserCol::Email.eq("a@x.com"))
        .count(&state.orm)
        .await?;
    assert_eq!(rows, 1);
    Ok(())
}

#[tokio::test]
async fn stores_a_hash_and_server_timestamp() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let before = chrono::Utc::now();
    register_user(&state, register("a@x.com", "secret1", "secret1")).await?;

    let user = Users::find()
        .filter(UserCol::Email.eq("a@x.com"))
        .one(&state.orm)
        .await?
        .expect("user row");
    assert!(!user.password_hash.is_empty());
    assert_ne!(user.password_hash, "secret1");
    assert!(user.password_hash.starts_with("$argon2"));
    assert!(user.registered_at >= before - chrono::Duration::seconds(1));
    Ok(())
}

#[tokio::test]
async fn invalid_registration_input_is_rejected_without_a_row() -> anyhow::Result<()> {
    let state = common::setup_state().await?;

    for request in [
        register("not-an-email", "secret1", "secret1"),
        register("b@x.com", "short", "short"),
        register("c@x.com", "secret1", "secret2"),
    ] {
        let err = register_user(&state, request).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    assert_eq!(Users::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn login_returns_a_token_for_valid_credentials() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let registered = register_user(&state, register("a@x.com", "secret1", "secret1"))
        .await?
        .data
        .expect("user");

    let resp = login_user(&state, login("a@x.com", "secret1")).await?;
    let data = resp.data.expect("login data");
    assert_eq!(data.token_type, "Bearer");

    let claims = state.tokens.validate(&data.token)?;
    assert_eq!(claims.sub, registered.id.to_string());
    assert_eq!(claims.email, "a@x.com");
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_indistinguishable() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    register_user(&state, register("a@x.com", "secret1", "secret1")).await?;

    let wrong_password = login_user(&state, login("a@x.com", "nope123"))
        .await
        .unwrap_err();
    let unknown_email = login_user(&state, login("ghost@x.com", "secret1"))
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, AppError::Unauthorized(INVALID_CREDENTIALS)));
    assert!(matches!(unknown_email, AppError::Unauthorized(INVALID_CREDENTIALS)));
    assert_eq!(wrong_password.status(), unknown_email.status());
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    Ok(())
}
