//! Registration, login and session checks of the [`Service`].

mod support;

use service::{
    command::{
        authorize_user_session, create_user, create_user_session,
        update_user_password, AuthorizeUserSession, CreateUser,
        CreateUserSession, DeleteUser, UpdateUserPassword,
        ValidateUserCredentials,
    },
    domain::user::{session, Email, Username},
    Command as _, Service,
};

use self::support::{password, service, Memory};

async fn register(
    service: &Service<Memory>,
    username: &str,
    email: &str,
) -> Result<service::read::User, tracerr::Traced<create_user::ExecutionError>>
{
    service
        .execute(CreateUser {
            username: Username::new(username).unwrap(),
            email: Email::new(email).unwrap(),
            password: password("secret123"),
        })
        .await
}

async fn login(
    service: &Service<Memory>,
    username: &str,
    pass: &str,
) -> Result<
    create_user_session::Output,
    tracerr::Traced<create_user_session::ExecutionError>,
> {
    service
        .execute(CreateUserSession::ByCredentials {
            username: Username::new(username).unwrap(),
            password: password(pass),
        })
        .await
}

#[tokio::test]
async fn registers_user_without_exposing_password() {
    let service = service();

    let user = register(&service, "alice", "alice@example.com").await.unwrap();

    assert_eq!(user.username.to_string(), "alice");
    assert_eq!(user.email.to_string(), "alice@example.com");

    let stored = service.database().users();
    assert_eq!(stored.len(), 1);
    assert_ne!(stored[0].password_hash.as_ref(), "secret123");
    assert!(!stored[0].password_hash.as_ref().contains("secret123"));
}

#[tokio::test]
async fn rejects_duplicate_username_and_email() {
    let service = service();
    _ = register(&service, "alice", "alice@example.com").await.unwrap();

    let err = register(&service, "alice", "other@example.com")
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        create_user::ExecutionError::DuplicateUser,
    ));

    let err = register(&service, "alicia", "alice@example.com")
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        create_user::ExecutionError::DuplicateUser,
    ));

    assert_eq!(service.database().users().len(), 1);
}

#[tokio::test]
async fn maps_storage_uniqueness_to_duplicate_user() {
    let service = service();
    _ = register(&service, "alice", "alice@example.com").await.unwrap();
    service.database().read_stale();

    for (username, email) in [
        ("alice", "other@example.com"),
        ("alicia", "alice@example.com"),
    ] {
        let err = register(&service, username, email).await.unwrap_err();
        assert!(
            matches!(err.as_ref(), create_user::ExecutionError::DuplicateUser),
            "{username} <{email}>: {err}",
        );
    }

    assert_eq!(service.database().users().len(), 1);
}

#[tokio::test]
async fn validates_credentials() {
    let service = service();
    let user = register(&service, "alice", "alice@example.com").await.unwrap();

    let valid = service
        .execute(ValidateUserCredentials {
            username: Username::new("alice").unwrap(),
            password: password("secret123"),
        })
        .await
        .unwrap();
    assert_eq!(valid.map(|u| u.id), Some(user.id));

    let wrong = service
        .execute(ValidateUserCredentials {
            username: Username::new("alice").unwrap(),
            password: password("secret124"),
        })
        .await
        .unwrap();
    assert!(wrong.is_none());

    let unknown = service
        .execute(ValidateUserCredentials {
            username: Username::new("bob").unwrap(),
            password: password("secret123"),
        })
        .await
        .unwrap();
    assert!(unknown.is_none());
}

#[tokio::test]
async fn login_issues_verifiable_token() {
    let service = service();
    let user = register(&service, "alice", "alice@example.com").await.unwrap();

    let out = login(&service, "alice", "secret123").await.unwrap();
    assert_eq!(out.user.id, user.id);
    assert_eq!(out.session.user_id, user.id);
    assert_eq!(out.session.username, user.username);
    assert!(
        out.session.expires_at.unix_timestamp()
            > out.session.issued_at.unix_timestamp(),
    );

    let authorized = service
        .execute(AuthorizeUserSession {
            token: out.token.clone(),
        })
        .await
        .unwrap();
    assert_eq!(authorized.user.id, user.id);
    assert_eq!(authorized.session.user_id, user.id);
}

#[tokio::test]
async fn login_does_not_tell_which_credential_is_wrong() {
    let service = service();
    _ = register(&service, "alice", "alice@example.com").await.unwrap();

    for (username, pass) in [("alice", "wrongpass"), ("nobody", "secret123")] {
        let err = login(&service, username, pass).await.unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                create_user_session::ExecutionError::InvalidCredentials,
            ),
            "unexpected error for `{username}`: {err}",
        );
    }
}

#[tokio::test]
async fn rejects_garbage_token() {
    let service = service();

    for token in ["", "garbage", "a.b.c"] {
        let err = service
            .execute(AuthorizeUserSession {
                token: token.parse::<session::Token>().unwrap(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            authorize_user_session::ExecutionError::InvalidSession,
        ));
    }
}

#[tokio::test]
async fn token_of_deleted_user_is_invalid() {
    let service = service();
    let user = register(&service, "alice", "alice@example.com").await.unwrap();
    let out = login(&service, "alice", "secret123").await.unwrap();

    service
        .execute(DeleteUser { user_id: user.id })
        .await
        .unwrap();

    let err = service
        .execute(AuthorizeUserSession { token: out.token })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        authorize_user_session::ExecutionError::InvalidSession,
    ));
}

#[tokio::test]
async fn changes_password() {
    let service = service();
    let user = register(&service, "alice", "alice@example.com").await.unwrap();

    let err = service
        .execute(UpdateUserPassword {
            user_id: user.id,
            old_password: password("not-my-password"),
            new_password: password("brand-new"),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        update_user_password::ExecutionError::WrongPassword,
    ));

    let updated = service
        .execute(UpdateUserPassword {
            user_id: user.id,
            old_password: password("secret123"),
            new_password: password("brand-new"),
        })
        .await
        .unwrap();
    assert!(updated.updated_at >= user.updated_at);

    assert!(login(&service, "alice", "secret123").await.is_err());
    assert!(login(&service, "alice", "brand-new").await.is_ok());
}
