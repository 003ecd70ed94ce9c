//! The demo form: collects a name and an email, stores nothing.

use serde::Serialize;

use super::{Cleaner, FieldKind, FieldSpec, FormErrors, RawForm, Widget};

pub const FIRST_NAME: FieldSpec = FieldSpec {
    name: "first_name",
    label: "First name",
    help_text: "",
    required: true,
    kind: FieldKind::Char {
        max_length: Some(100),
    },
    widget: Widget::Input {
        input_type: "text",
    },
};

pub const LAST_NAME: FieldSpec = FieldSpec {
    name: "last_name",
    label: "Last name",
    help_text: "",
    required: false,
    kind: FieldKind::Char {
        max_length: Some(100),
    },
    widget: Widget::Input {
        input_type: "text",
    },
};

pub const EMAIL: FieldSpec = FieldSpec {
    name: "email",
    label: "Email",
    help_text: "",
    required: false,
    kind: FieldKind::Email {
        max_length: Some(320),
    },
    widget: Widget::Input {
        input_type: "email",
    },
};

pub const FIELDS: &[FieldSpec] = &[FIRST_NAME, LAST_NAME, EMAIL];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

pub fn clean(raw: &RawForm) -> Result<UserDetails, FormErrors> {
    let mut cleaner = Cleaner::new(raw);
    let first_name = cleaner.char(&FIRST_NAME);
    let last_name = cleaner.char(&LAST_NAME);
    let email = cleaner.email(&EMAIL);
    match (first_name, last_name, email) {
        (Some(first_name), Some(last_name), Some(email)) if cleaner.is_valid() => {
            Ok(UserDetails {
                first_name,
                last_name,
                email,
            })
        }
        _ => Err(cleaner.into_errors()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_name_is_required() {
        let details = clean(&RawForm::from_pairs([("first_name", "Ada")])).unwrap();
        assert_eq!(details.last_name, "");
        assert_eq!(details.email, "");
    }

    #[test]
    fn bad_email_is_flagged() {
        let raw = RawForm::from_pairs([("first_name", "Ada"), ("email", "ada-at-home")]);
        let errors = clean(&raw).unwrap_err();
        assert_eq!(errors.field("email"), ["Enter a valid email address."]);
    }
}
