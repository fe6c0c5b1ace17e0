//! Tests for memberships and invitations.

use super::*;
use crate::domain::{ErrorCode, ServiceConfig};
use crate::test_support::{RecordingMailer, TestWorld};

async fn role(world: &TestWorld, project: ProjectId, slug: &str) -> Role {
    world
        .repos
        .roles
        .list_by_project(project)
        .await
        .expect("roles")
        .into_iter()
        .find(|role| role.slug == slug)
        .expect("role by slug")
}

async fn invite(
    world: &TestWorld,
    owner: &User,
    project: &Project,
    email: &str,
) -> Result<MembershipView, Error> {
    let back = role(world, project.id, "back").await;
    world
        .services
        .memberships
        .create(
            &TestWorld::requester(owner),
            CreateMembership {
                project: project.id,
                role: back.id,
                email: email.to_owned(),
            },
        )
        .await
}

#[tokio::test]
async fn inviting_an_unknown_email_creates_a_pending_invitation() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;

    let view = invite(&world, &owner, &project, "new@example.com")
        .await
        .expect("invite");

    assert!(view.membership.is_pending());
    assert_eq!(view.role_name, "Back");
    assert_eq!(view.membership.invited_by, Some(owner.id));
    let token = view.membership.token.clone().expect("invitation token");
    let mails = world.mailer.sent_of("membership_invitation");
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].to, "new@example.com");
    assert!(mails[0].body.contains(&token));
}

#[tokio::test]
async fn inviting_a_registered_user_links_the_account() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let dev = world.user("dev").await;
    let project = world.project(&owner, "Board", false).await;

    let view = invite(&world, &owner, &project, "DEV@example.com")
        .await
        .expect("invite");

    assert_eq!(view.membership.user, Some(dev.id));
    assert!(view.membership.token.is_none());
    assert_eq!(view.user.map(|user| user.id), Some(dev.id));
}

#[tokio::test]
async fn duplicate_members_and_invitations_are_rejected() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    world.user("dev").await;
    let project = world.project(&owner, "Board", false).await;
    invite(&world, &owner, &project, "dev@example.com")
        .await
        .expect("member");
    invite(&world, &owner, &project, "new@example.com")
        .await
        .expect("invitation");

    for (email, code) in [
        ("dev@example.com", "already_member"),
        ("owner@example.com", "already_member"),
        ("New@Example.com", "already_invited"),
    ] {
        let error = invite(&world, &owner, &project, email)
            .await
            .expect_err("duplicate");
        assert_eq!(error.details().expect("details")["code"], code);
    }
}

#[tokio::test]
async fn invitations_need_a_role_of_the_project_and_a_valid_email() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let other = world.project(&owner, "Other", false).await;
    let foreign = role(&world, other.id, "back").await;
    let requester = TestWorld::requester(&owner);

    let error = world
        .services
        .memberships
        .create(
            &requester,
            CreateMembership {
                project: project.id,
                role: foreign.id,
                email: "new@example.com".to_owned(),
            },
        )
        .await
        .expect_err("foreign role");
    assert_eq!(error.details().expect("details")["field"], "role");

    let error = invite(&world, &owner, &project, "not-an-email")
        .await
        .expect_err("bad email");
    assert_eq!(error.details().expect("details")["field"], "email");
}

#[tokio::test]
async fn only_project_owners_invite() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let member = world.user("member").await;
    let project = world.project(&owner, "Board", false).await;
    world
        .member(&project, &member, &[ProjectPermission::ViewProject])
        .await;

    let error = invite(&world, &member, &project, "new@example.com")
        .await
        .expect_err("member invites");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn mail_failures_do_not_fail_the_invitation() {
    let world = TestWorld::with_mailer(ServiceConfig::default(), RecordingMailer::failing());
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;

    let view = invite(&world, &owner, &project, "new@example.com")
        .await
        .expect("invite despite mail failure");

    assert!(view.membership.is_pending());
    assert_eq!(world.mailer.sent().len(), 1);
}

#[tokio::test]
async fn bulk_create_validates_every_role_first() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let other = world.project(&owner, "Other", false).await;
    let back = role(&world, project.id, "back").await;
    let foreign = role(&world, other.id, "back").await;
    let requester = TestWorld::requester(&owner);

    let error = world
        .services
        .memberships
        .bulk_create(
            &requester,
            project.id,
            vec![
                BulkMembershipEntry {
                    role: back.id,
                    email: "first@example.com".to_owned(),
                },
                BulkMembershipEntry {
                    role: foreign.id,
                    email: "second@example.com".to_owned(),
                },
            ],
        )
        .await
        .expect_err("foreign role");
    assert_eq!(error.details().expect("details")["field"], "role");
    assert_eq!(
        world
            .repos
            .memberships
            .list_by_project(project.id)
            .await
            .expect("memberships")
            .len(),
        1
    );

    let created = world
        .services
        .memberships
        .bulk_create(
            &requester,
            project.id,
            ["first@example.com", "second@example.com"]
                .into_iter()
                .map(|email| BulkMembershipEntry {
                    role: back.id,
                    email: email.to_owned(),
                })
                .collect(),
        )
        .await
        .expect("bulk invite");
    assert_eq!(created.len(), 2);
    assert_eq!(world.mailer.sent_of("membership_invitation").len(), 2);
}

#[tokio::test]
async fn the_owner_membership_is_protected() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let requester = TestWorld::requester(&owner);
    let membership = world
        .repos
        .memberships
        .find_for_user(project.id, owner.id)
        .await
        .expect("lookup")
        .expect("owner membership");

    let error = world
        .services
        .memberships
        .update(
            &requester,
            membership.id,
            MembershipChanges {
                is_owner: Some(false),
                ..MembershipChanges::default()
            },
        )
        .await
        .expect_err("demote owner");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);

    let error = world
        .services
        .memberships
        .destroy(&requester, membership.id)
        .await
        .expect_err("remove owner");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn members_can_change_role_and_be_removed() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    world.user("dev").await;
    let project = world.project(&owner, "Board", false).await;
    let requester = TestWorld::requester(&owner);
    let membership = invite(&world, &owner, &project, "dev@example.com")
        .await
        .expect("invite")
        .membership;
    let front = role(&world, project.id, "front").await;

    let view = world
        .services
        .memberships
        .update(
            &requester,
            membership.id,
            MembershipChanges {
                role: Some(front.id),
                is_owner: Some(true),
            },
        )
        .await
        .expect("update");
    assert_eq!(view.role_name, "Front");
    assert!(view.membership.is_owner);

    world
        .services
        .memberships
        .destroy(&requester, membership.id)
        .await
        .expect("destroy");
    let error = world
        .services
        .memberships
        .retrieve(&requester, membership.id)
        .await
        .expect_err("gone");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn resending_only_applies_to_pending_invitations() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    world.user("dev").await;
    let project = world.project(&owner, "Board", false).await;
    let requester = TestWorld::requester(&owner);
    let pending = invite(&world, &owner, &project, "new@example.com")
        .await
        .expect("invite")
        .membership;
    let accepted = invite(&world, &owner, &project, "dev@example.com")
        .await
        .expect("member")
        .membership;

    world
        .services
        .memberships
        .resend_invitation(&requester, pending.id)
        .await
        .expect("resend");
    assert_eq!(world.mailer.sent_of("membership_invitation").len(), 3);

    let error = world
        .services
        .memberships
        .resend_invitation(&requester, accepted.id)
        .await
        .expect_err("already accepted");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn invitations_are_found_by_token_only() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let project = world.project(&owner, "Board", false).await;
    let token = invite(&world, &owner, &project, "new@example.com")
        .await
        .expect("invite")
        .membership
        .token
        .expect("token");

    let view = world
        .services
        .memberships
        .invitation(&Requester::Anonymous, &token)
        .await
        .expect("invitation");
    assert_eq!(view.project_slug, project.slug);
    assert_eq!(view.role_name, "Back");
    assert_eq!(view.invited_by.map(|user| user.id), Some(owner.id));

    let error = world
        .services
        .memberships
        .invitation(&Requester::Anonymous, "unknown")
        .await
        .expect_err("unknown token");
    assert_eq!(error.code(), ErrorCode::NotFound);

    let error = world
        .services
        .memberships
        .list_invitations(&Requester::Anonymous)
        .expect_err("listing is denied");
    assert_eq!(error.code(), ErrorCode::Forbidden);
    let error = world
        .services
        .memberships
        .list_invitations(&TestWorld::requester(&owner))
        .expect_err("listing is denied");
    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn list_skips_memberships_of_invisible_projects() {
    let world = TestWorld::new();
    let owner = world.user("owner").await;
    let outsider = world.user("outsider").await;
    let public = world.project(&owner, "Open", false).await;
    let private = world.private_project(&owner, "Secret").await;

    let seen = world
        .services
        .memberships
        .list(&TestWorld::requester(&outsider), None)
        .await
        .expect("list");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].membership.project, public.id);

    let scoped = world
        .services
        .memberships
        .list(&TestWorld::requester(&outsider), Some(private.id))
        .await
        .expect("list");
    assert!(scoped.is_empty());
}
