//! Login and password change forms.

use std::fmt;

use super::{Cleaner, FieldKind, FieldSpec, FormErrors, RawForm, Widget};

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const USERNAME: FieldSpec = FieldSpec {
    name: "username",
    label: "Username",
    help_text: "",
    required: true,
    kind: FieldKind::Char {
        max_length: Some(150),
    },
    widget: Widget::Input {
        input_type: "text",
    },
};

pub const PASSWORD: FieldSpec = FieldSpec {
    name: "password",
    label: "Password",
    help_text: "",
    required: true,
    kind: FieldKind::Password,
    widget: Widget::Input {
        input_type: "password",
    },
};

pub const LOGIN_FIELDS: &[FieldSpec] = &[USERNAME, PASSWORD];

pub const OLD_PASSWORD: FieldSpec = FieldSpec {
    name: "old_password",
    label: "Old password",
    ..PASSWORD
};

pub const NEW_PASSWORD1: FieldSpec = FieldSpec {
    name: "new_password1",
    label: "New password",
    help_text: "Your password must contain at least 8 characters.",
    ..PASSWORD
};

pub const NEW_PASSWORD2: FieldSpec = FieldSpec {
    name: "new_password2",
    label: "New password confirmation",
    help_text: "Enter the same password as before, for verification.",
    ..PASSWORD
};

pub const PASSWORD_CHANGE_FIELDS: &[FieldSpec] = &[OLD_PASSWORD, NEW_PASSWORD1, NEW_PASSWORD2];

pub const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
pub const INCORRECT_OLD_PASSWORD: &str =
    "Your old password was entered incorrectly. Please enter it again.";

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

pub fn clean_login(raw: &RawForm) -> Result<Credentials, FormErrors> {
    let mut cleaner = Cleaner::new(raw);
    let username = cleaner.char(&USERNAME);
    let password = cleaner.password(&PASSWORD);
    match (username, password) {
        (Some(username), Some(password)) if cleaner.is_valid() => Ok(Credentials { username, password }),
        _ => Err(cleaner.into_errors()),
    }
}

#[derive(Clone)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

impl fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordChange").finish_non_exhaustive()
    }
}

pub fn clean_password_change(raw: &RawForm) -> Result<PasswordChange, FormErrors> {
    let mut cleaner = Cleaner::new(raw);
    let old_password = cleaner.password(&OLD_PASSWORD);
    let new_password1 = cleaner.password(&NEW_PASSWORD1);
    let new_password2 = cleaner.password(&NEW_PASSWORD2);
    if let (Some(first), Some(second)) = (&new_password1, &new_password2) {
        if first != second {
            cleaner.add_error(NEW_PASSWORD2.name, "The two password fields didn’t match.");
        } else if first.chars().count() < MIN_PASSWORD_LENGTH {
            cleaner.add_error(
                NEW_PASSWORD2.name,
                format!(
                    "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
                ),
            );
        }
    }
    match (old_password, new_password1) {
        (Some(old_password), Some(new_password)) if cleaner.is_valid() => Ok(PasswordChange {
            old_password,
            new_password,
        }),
        _ => Err(cleaner.into_errors()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_needs_both_fields() {
        let errors = clean_login(&RawForm::from_pairs([("username", "ada")])).unwrap_err();
        assert_eq!(errors.field("password"), [super::super::REQUIRED]);
        let creds = clean_login(&RawForm::from_pairs([("username", "ada"), ("password", " pw ")])).unwrap();
        assert_eq!(creds.password, " pw ");
        assert!(!format!("{creds:?}").contains("pw"));
    }

    #[test]
    fn new_passwords_must_match_and_be_long_enough() {
        let change = |a: &str, b: &str| {
            clean_password_change(&RawForm::from_pairs([
                ("old_password", "old-secret"),
                ("new_password1", a),
                ("new_password2", b),
            ]))
        };
        assert_eq!(
            change("longenough", "different!").unwrap_err().field("new_password2"),
            ["The two password fields didn’t match."]
        );
        assert_eq!(change("short", "short").unwrap_err().field("new_password2").len(), 1);
        assert_eq!(change("longenough", "longenough").unwrap().new_password, "longenough");
    }
}
