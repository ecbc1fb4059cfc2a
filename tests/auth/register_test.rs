use casa_del_sol::modules::auth::schema::MAX_PHOTO_BYTES;
use casa_del_sol::modules::auth::{AuthError, AuthorizationStatus, IdentificationPhoto, RegisterForm, Role};

use crate::common::{TestContext, PNG_BYTES};

fn form() -> RegisterForm {
    RegisterForm {
        email: "nuevo@example.com".into(),
        password: "secreto1".into(),
        password_confirm: "secreto1".into(),
        name: "Nuevo".into(),
        surname: "Usuario".into(),
        address: "Calle 2".into(),
        age: 25,
        phone: "55 1234 5678".into(),
        role: Some(Role::Visitor),
        photo: Some(IdentificationPhoto::new("id.png", "image/png", PNG_BYTES.to_vec())),
    }
}

#[tokio::test]
async fn register_returns_pending_user() {
    let ctx = TestContext::new().await;

    let outcome = ctx
        .app
        .session
        .register(&form())
        .await
        .expect("registration should succeed");

    assert_eq!(ctx.hits("register"), 1);
    let user = outcome.user.expect("backend returns the created user");
    assert_eq!(user.authorization, AuthorizationStatus::Pending);
    assert!(outcome.message.contains("Pendiente"));
    ctx.cleanup();
}

#[tokio::test]
async fn oversized_photo_never_reaches_backend() {
    let ctx = TestContext::new().await;
    let mut form = form();
    form.photo = Some(IdentificationPhoto::new(
        "id.jpg",
        "image/jpeg",
        vec![0u8; MAX_PHOTO_BYTES + 1024 * 1024],
    ));

    let err = ctx.app.session.register(&form).await.unwrap_err();

    match err {
        AuthError::InvalidRegistration(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field, "photo");
            assert_eq!(errors[0].message, "The image must be smaller than 5MB");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(ctx.hits("register"), 0);
    ctx.cleanup();
}

#[tokio::test]
async fn admin_role_cannot_self_register() {
    let ctx = TestContext::new().await;
    let mut form = form();
    form.role = Some(Role::Admin);
    form.password_confirm = "different".into();

    let err = ctx.app.session.register(&form).await.unwrap_err();

    let AuthError::InvalidRegistration(errors) = err else {
        panic!("expected validation errors");
    };
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["password_confirm", "role"]);
    assert_eq!(ctx.total_hits(), 0);
    ctx.cleanup();
}
