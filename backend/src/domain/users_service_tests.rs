//! Tests for account management.

use super::*;
use crate::domain::{ErrorCode, LoginRequest, ServiceConfig};
use crate::test_support::{PASSWORD, TestWorld};

fn token_in(body: &str) -> String {
    body.rsplit(' ')
        .next()
        .map(|word| word.trim_end_matches('.').to_owned())
        .expect("token in mail body")
}

async fn can_login(world: &TestWorld, username: &str, password: &str) -> bool {
    world
        .services
        .auth
        .login(LoginRequest {
            kind: "normal".to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
        })
        .await
        .is_ok()
}

#[tokio::test]
async fn project_users_are_visible_to_members_only() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let member = world.user("member").await;
    let outsider = world.user("outsider").await;
    let project = world.project(&owner, "Board", false).await;
    world
        .member(&project, &member, &[ProjectPermission::ViewProject])
        .await;

    let users = world
        .services
        .users
        .list(&TestWorld::requester(&member), Some(project.id))
        .await
        .expect("members list");
    let mut ids: Vec<UserId> = users.iter().map(|user| user.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, [owner.id, member.id]);

    let error = world
        .services
        .users
        .list(&TestWorld::requester(&outsider), Some(project.id))
        .await
        .expect_err("outsider");
    assert_eq!(error.code(), ErrorCode::Forbidden);
    assert_eq!(
        error.message(),
        "You don't have permisions to see this project users."
    );

    let error = world
        .services
        .users
        .list(&TestWorld::requester(&member), Some(ProjectId::new(9999)))
        .await
        .expect_err("unknown project");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn unscoped_user_lists_are_for_superusers() {
    let world = TestWorld::new();
    let ada = world.user("ada").await;
    let admin = world.superuser("admin").await;

    let everyone = world
        .services
        .users
        .list(&TestWorld::requester(&admin), None)
        .await
        .expect("superuser list");
    assert_eq!(everyone.len(), 2);

    let nobody = world
        .services
        .users
        .list(&TestWorld::requester(&ada), None)
        .await
        .expect("regular list");
    assert!(nobody.is_empty());
}

#[tokio::test]
async fn me_requires_authentication() {
    let world = TestWorld::new();
    let ada = world.user("ada").await;

    let me = world
        .services
        .users
        .me(&TestWorld::requester(&ada))
        .expect("me");
    assert_eq!(me.id, ada.id);

    let error = world
        .services
        .users
        .me(&Requester::Anonymous)
        .expect_err("anonymous");
    assert_eq!(error.code(), ErrorCode::Unauthorized);
}

#[tokio::test]
async fn users_may_only_edit_themselves() {
    let world = TestWorld::new();
    let ada = world.user("ada").await;
    let grace = world.user("grace").await;
    let changes = UserChanges {
        full_name: Some("  Ada King ".to_owned()),
        bio: Some("Analyst".to_owned()),
        ..UserChanges::default()
    };

    let error = world
        .services
        .users
        .partial_update(&TestWorld::requester(&grace), ada.id, changes.clone())
        .await
        .expect_err("other user");
    assert_eq!(error.code(), ErrorCode::Forbidden);

    let updated = world
        .services
        .users
        .partial_update(&TestWorld::requester(&ada), ada.id, changes)
        .await
        .expect("self update");
    assert_eq!(updated.full_name, "Ada King");
    assert_eq!(updated.bio, "Analyst");
}

#[tokio::test]
async fn usernames_must_stay_unique() {
    let world = TestWorld::new();
    let ada = world.user("ada").await;
    world.user("grace").await;

    let error = world
        .services
        .users
        .partial_update(
            &TestWorld::requester(&ada),
            ada.id,
            UserChanges {
                username: Some("grace".to_owned()),
                ..UserChanges::default()
            },
        )
        .await
        .expect_err("taken username");

    assert_eq!(error.details().expect("details")["code"], "duplicated_username");
}

#[tokio::test]
async fn email_changes_wait_for_confirmation() {
    let world = TestWorld::new();
    let ada = world.user("ada").await;
    let requester = TestWorld::requester(&ada);

    let pending = world
        .services
        .users
        .partial_update(
            &requester,
            ada.id,
            UserChanges {
                email: Some("ada@lovelace.dev".to_owned()),
                ..UserChanges::default()
            },
        )
        .await
        .expect("request change");
    assert_eq!(pending.email.as_str(), "ada@example.com");
    assert_eq!(
        pending.new_email.as_ref().map(Email::as_str),
        Some("ada@lovelace.dev")
    );

    let mails = world.mailer.sent_of("change_email");
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].to, "ada@lovelace.dev");
    let token = token_in(&mails[0].body);

    world
        .services
        .users
        .change_email(&requester, &token)
        .await
        .expect("confirm");
    let stored = world.repos.user(ada.id).await.expect("user");
    assert_eq!(stored.email.as_str(), "ada@lovelace.dev");
    assert!(stored.email_token.is_none());

    let error = world
        .services
        .users
        .change_email(&requester, &token)
        .await
        .expect_err("token reused");
    assert_eq!(error.message(), INVALID_EMAIL_TOKEN);
}

#[tokio::test]
async fn email_changes_reject_taken_and_malformed_addresses() {
    let world = TestWorld::new();
    let ada = world.user("ada").await;
    world.user("grace").await;
    let requester = TestWorld::requester(&ada);

    for (email, message) in [
        ("GRACE@example.com", "Duplicated email"),
        ("not-an-email", "Not valid email"),
    ] {
        let error = world
            .services
            .users
            .partial_update(
                &requester,
                ada.id,
                UserChanges {
                    email: Some(email.to_owned()),
                    ..UserChanges::default()
                },
            )
            .await
            .expect_err("rejected email");
        assert_eq!(error.message(), message);
    }
}

#[tokio::test]
async fn cancelled_accounts_are_anonymised_with_unique_names() {
    let world = TestWorld::new();
    let ada = world.user("ada").await;
    let grace = world.user("grace").await;

    for user in [&ada, &grace] {
        world
            .services
            .users
            .destroy(&TestWorld::requester(user), user.id)
            .await
            .expect("cancel");
    }

    let ada = world.repos.user(ada.id).await.expect("ada");
    let grace = world.repos.user(grace.id).await.expect("grace");
    assert_eq!(ada.username.as_str(), "deleted-user");
    assert_eq!(grace.username.as_str(), "deleted-user-1");
    assert!(!ada.is_active);
    assert!(!can_login(&world, "ada", PASSWORD).await);
}

#[tokio::test]
async fn cancel_tokens_expire() {
    let world = TestWorld::new();
    let ada = world.user("ada").await;
    let token = world
        .signer
        .sign(TokenScope::CancelAccount, ada.id, world.clock.utc())
        .expect("sign");
    let max_age = ServiceConfig::default().cancel_account_max_age;
    world.clock.advance_seconds(max_age.num_seconds() + 1);

    let error = world
        .services
        .users
        .cancel(&token)
        .await
        .expect_err("expired");

    assert_eq!(error.message(), INVALID_CANCEL_TOKEN);
}

#[tokio::test]
async fn cancel_tokens_work_once() {
    let world = TestWorld::new();
    let ada = world.user("ada").await;
    let token = world
        .signer
        .sign(TokenScope::CancelAccount, ada.id, world.clock.utc())
        .expect("sign");

    world.services.users.cancel(&token).await.expect("cancel");
    let error = world
        .services
        .users
        .cancel(&token)
        .await
        .expect_err("already cancelled");
    assert_eq!(error.message(), INVALID_CANCEL_TOKEN);

    let auth_token = world.auth_token(&ada);
    let error = world
        .services
        .users
        .cancel(&auth_token)
        .await
        .expect_err("wrong scope");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn password_recovery_round_trip() {
    let world = TestWorld::new();
    world.user("ada").await;

    let email = world
        .services
        .users
        .password_recovery("ada@example.com")
        .await
        .expect("recovery");
    assert_eq!(email.as_str(), "ada@example.com");
    let mails = world.mailer.sent_of("password_recovery");
    assert_eq!(mails.len(), 1);
    let token = token_in(&mails[0].body);

    let error = world
        .services
        .users
        .change_password_from_recovery(&token, "123")
        .await
        .expect_err("short password");
    assert_eq!(error.details().expect("details")["field"], "password");

    world
        .services
        .users
        .change_password_from_recovery(&token, "new-password")
        .await
        .expect("reset");
    assert!(can_login(&world, "ada", "new-password").await);
    assert!(!can_login(&world, "ada", PASSWORD).await);

    let error = world
        .services
        .users
        .change_password_from_recovery(&token, "another-password")
        .await
        .expect_err("token spent");
    assert_eq!(error.message(), "Token is invalid");
}

#[tokio::test]
async fn password_recovery_rejects_unknown_accounts() {
    let world = TestWorld::new();

    let error = world
        .services
        .users
        .password_recovery("ghost")
        .await
        .expect_err("unknown");

    assert_eq!(error.message(), "Invalid username or email");
    assert!(world.mailer.sent().is_empty());
}

#[tokio::test]
async fn change_password_checks_the_current_one() {
    let world = TestWorld::new();
    let ada = world.user("ada").await;
    let requester = TestWorld::requester(&ada);
    let service = &world.services.users;

    for (current, new, message) in [
        ("", "new-password", "Current password parameter needed"),
        (PASSWORD, "", "New password parameter needed"),
        (
            PASSWORD,
            "123",
            "Invalid password length at least 6 charaters needed",
        ),
        ("wrong-password", "new-password", "Invalid current password"),
    ] {
        let error = service
            .change_password(&requester, current, new)
            .await
            .expect_err("rejected");
        assert_eq!(error.message(), message);
    }

    service
        .change_password(&requester, PASSWORD, "new-password")
        .await
        .expect("changed");
    assert!(can_login(&world, "ada", "new-password").await);
}

#[tokio::test]
async fn starred_lists_only_visible_projects() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let ada = world.user("ada").await;
    let outsider = world.user("outsider").await;
    let public = world.project(&owner, "Open", false).await;
    let private = world.private_project(&owner, "Secret").await;
    world
        .member(&private, &ada, &[ProjectPermission::ViewProject])
        .await;
    let requester = TestWorld::requester(&ada);
    for project in [&public, &private] {
        world
            .services
            .projects
            .star(&requester, project.id)
            .await
            .expect("star");
    }

    let own = world
        .services
        .users
        .starred(&requester, ada.id)
        .await
        .expect("own stars");
    assert_eq!(own.len(), 2);

    let seen = world
        .services
        .users
        .starred(&TestWorld::requester(&outsider), ada.id)
        .await
        .expect("other stars");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id, public.id);
}
