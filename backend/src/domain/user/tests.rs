//! Tests for user field validation and account cancellation.

use super::*;
use rstest::{fixture, rstest};

#[fixture]
fn user() -> User {
    User::from_new(
        UserId::new(7),
        NewUser {
            username: Username::new("grace").expect("username"),
            email: Email::new("grace@example.com").expect("email"),
            full_name: "Grace Hopper".to_owned(),
            password_hash: Some("$argon2id$hash".to_owned()),
            is_superuser: false,
            date_joined: Utc::now(),
        },
    )
}

#[rstest]
#[case("ada", true)]
#[case("ada.lovelace-1_x", true)]
#[case("ada lovelace", false)]
#[case("ada@home", false)]
#[case("", false)]
fn username_accepts_word_dot_and_hyphen(#[case] raw: &str, #[case] valid: bool) {
    assert_eq!(Username::new(raw).is_ok(), valid);
}

#[rstest]
fn username_rejects_overlong_values() {
    let raw = "a".repeat(USERNAME_MAX + 1);
    assert_eq!(
        Username::new(raw),
        Err(UserValidationError::UsernameTooLong { max: USERNAME_MAX })
    );
}

#[rstest]
#[case("ada@example.com", true)]
#[case("  ada@example.com ", true)]
#[case("ada@localhost", false)]
#[case("@example.com", false)]
#[case("ada@@example.com", false)]
#[case("not-an-email", false)]
fn email_requires_local_part_and_dotted_domain(#[case] raw: &str, #[case] valid: bool) {
    assert_eq!(Email::new(raw).is_ok(), valid);
}

#[rstest]
fn email_matches_ignore_case() {
    let email = Email::new("Ada@Example.com").expect("email");
    assert!(email.matches("ada@example.COM"));
}

#[rstest]
fn short_passwords_are_rejected() {
    assert!(validate_password("12345").is_err());
    assert!(validate_password("123456").is_ok());
}

#[rstest]
fn cancel_anonymises_the_account(mut user: User) {
    user.recovery_token = Some("token".to_owned());
    user.cancel(Username::new("deleted-user").expect("username"));

    assert_eq!(user.username.as_str(), "deleted-user");
    assert_eq!(user.email.as_str(), "deleted-user@deleted.invalid");
    assert_eq!(user.full_name, "Deleted user");
    assert!(!user.is_active);
    assert!(user.password_hash.is_none());
    assert!(user.recovery_token.is_none());
}

#[rstest]
fn display_name_prefers_full_name(user: User) {
    assert_eq!(user.display_name(), "Grace Hopper");
}

#[rstest]
fn validation_errors_convert_to_field_errors() {
    let error: crate::domain::Error = UserValidationError::InvalidEmail.into();
    let details = error.details().expect("details");
    assert_eq!(details["field"], "email");
    assert_eq!(details["code"], "invalid_email");
}
