//! Declarative HTML forms.
//!
//! Each form is a static list of [`FieldSpec`]s. A [`Cleaner`] walks the
//! submitted [`RawForm`] field by field, collecting [`FormErrors`] instead of
//! stopping at the first problem, and a [`BoundForm`] carries values, choices
//! and errors into the templates.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::basic_models::{CookingTime, UploadedFile};

pub mod auth;
pub mod ingredient;
pub mod recipe;
pub mod user;

pub const REQUIRED: &str = "This field is required.";
const MAX_POSITIVE_INTEGER: i64 = 2_147_483_647;

/// Submitted form data, keeping repeated keys (multi-selects send one pair per option).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawForm {
    pairs: Vec<(String, String)>,
}

impl RawForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// The last value submitted under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// How a field is drawn. Serialized with a `kind` tag for the form macros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Widget {
    Input { input_type: &'static str },
    Textarea { rows: u32 },
    File { accept: &'static str },
    Select,
    SelectMultiple { class: &'static str },
}

/// What a field accepts, which decides how it is cleaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Char { max_length: Option<usize> },
    PositiveInteger,
    Decimal { max_digits: u32, decimal_places: u32 },
    Duration,
    Email { max_length: Option<usize> },
    Password,
    Image,
    ModelChoice,
    ModelMultipleChoice,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub help_text: &'static str,
    pub required: bool,
    pub kind: FieldKind,
    pub widget: Widget,
}

impl FieldSpec {
    pub fn max_length(&self) -> Option<usize> {
        match self.kind {
            FieldKind::Char { max_length } | FieldKind::Email { max_length } => max_length,
            _ => None,
        }
    }
}

/// Validation messages, per field plus form-wide ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("form failed validation")]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn field(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    /// Build the error set for a single form-wide message.
    pub fn single(message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add_non_field(message);
        errors
    }
}

/// An option of a select widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl ToString, label: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            label: label.into(),
        }
    }
}

/// Field-by-field validation of a [`RawForm`].
///
/// Every method records its own errors and returns `None` when the field is
/// unusable, so a form can clean all of its fields before reporting.
pub struct Cleaner<'a> {
    raw: &'a RawForm,
    errors: FormErrors,
}

impl<'a> Cleaner<'a> {
    pub fn new(raw: &'a RawForm) -> Self {
        Self {
            raw,
            errors: FormErrors::default(),
        }
    }

    /// The trimmed value, or `None` if blank. Blank required fields are flagged.
    fn value(&mut self, spec: &FieldSpec) -> Option<&'a str> {
        match self.raw.get(spec.name).map(str::trim) {
            Some(value) if !value.is_empty() => Some(value),
            _ => {
                if spec.required {
                    self.errors.add(spec.name, REQUIRED);
                }
                None
            }
        }
    }

    fn check_length(&mut self, spec: &FieldSpec, value: &str) -> bool {
        match spec.max_length() {
            Some(max) if value.chars().count() > max => {
                self.errors.add(
                    spec.name,
                    format!(
                        "Ensure this value has at most {} characters (it has {}).",
                        max,
                        value.chars().count()
                    ),
                );
                false
            }
            _ => true,
        }
    }

    /// Free text. Optional fields come back as an empty string when blank.
    pub fn char(&mut self, spec: &FieldSpec) -> Option<String> {
        match self.value(spec) {
            Some(value) => self.check_length(spec, value).then(|| value.to_string()),
            None if spec.required => None,
            None => Some(String::new()),
        }
    }

    /// Passwords are taken verbatim, surrounding whitespace included.
    pub fn password(&mut self, spec: &FieldSpec) -> Option<String> {
        match self.raw.get(spec.name) {
            Some(value) if !value.is_empty() => Some(value.to_string()),
            _ => {
                self.errors.add(spec.name, REQUIRED);
                None
            }
        }
    }

    pub fn email(&mut self, spec: &FieldSpec) -> Option<String> {
        let value = self.char(spec)?;
        if value.is_empty() || is_valid_email(&value) {
            Some(value)
        } else {
            self.errors.add(spec.name, "Enter a valid email address.");
            None
        }
    }

    pub fn positive_integer(&mut self, spec: &FieldSpec) -> Option<u32> {
        let value = self.value(spec)?;
        let message = match value.parse::<i64>() {
            Ok(number) if number < 0 => "Ensure this value is greater than or equal to 0.",
            Ok(number) if number > MAX_POSITIVE_INTEGER => {
                "Ensure this value is less than or equal to 2147483647."
            }
            Ok(number) => return u32::try_from(number).ok(),
            Err(_) => "Enter a whole number.",
        };
        self.errors.add(spec.name, message);
        None
    }

    pub fn decimal(&mut self, spec: &FieldSpec) -> Option<Decimal> {
        let FieldKind::Decimal {
            max_digits,
            decimal_places,
        } = spec.kind
        else {
            return None;
        };
        let value = self.value(spec)?;
        let Ok(number) = value.parse::<Decimal>() else {
            self.errors.add(spec.name, "Enter a number.");
            return None;
        };
        let (digits, decimals) = digit_counts(&number);
        if digits > max_digits {
            self.errors.add(
                spec.name,
                format!("Ensure that there are no more than {max_digits} digits in total."),
            );
        } else if decimals > decimal_places {
            self.errors.add(
                spec.name,
                format!("Ensure that there are no more than {decimal_places} decimal places."),
            );
        } else if digits - decimals > max_digits - decimal_places {
            self.errors.add(
                spec.name,
                format!(
                    "Ensure that there are no more than {} digits before the decimal point.",
                    max_digits - decimal_places
                ),
            );
        } else {
            return Some(number);
        }
        None
    }

    pub fn duration(&mut self, spec: &FieldSpec) -> Option<CookingTime> {
        let value = self.value(spec)?;
        match value.parse() {
            Ok(duration) => Some(duration),
            Err(err) => {
                self.errors.add(spec.name, err.to_string());
                None
            }
        }
    }

    /// A single optional reference to one of `available`.
    pub fn model_choice(&mut self, spec: &FieldSpec, available: &[i64]) -> Option<Option<i64>> {
        let Some(value) = self.value(spec) else {
            return (!spec.required).then_some(None);
        };
        match value.parse::<i64>() {
            Ok(id) if available.contains(&id) => Some(Some(id)),
            _ => {
                self.errors.add(
                    spec.name,
                    "Select a valid choice. That choice is not one of the available choices.",
                );
                None
            }
        }
    }

    /// Several references to `available`, deduplicated in submission order.
    pub fn model_multiple_choice(&mut self, spec: &FieldSpec, available: &[i64]) -> Option<Vec<i64>> {
        let values = self
            .raw
            .get_all(spec.name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>();
        if values.is_empty() {
            if spec.required {
                self.errors.add(spec.name, REQUIRED);
                return None;
            }
            return Some(vec![]);
        }
        let mut ids = Vec::with_capacity(values.len());
        for value in values {
            match value.parse::<i64>() {
                Ok(id) if available.contains(&id) => {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                _ => {
                    self.errors.add(
                        spec.name,
                        format!(
                            "Select a valid choice. {value} is not one of the available choices."
                        ),
                    );
                    return None;
                }
            }
        }
        Some(ids)
    }

    /// An optional image upload; it must decode as an image.
    pub fn image<'f>(
        &mut self,
        spec: &FieldSpec,
        files: &'f [UploadedFile],
    ) -> Option<Option<&'f UploadedFile>> {
        let Some(file) = files.iter().find(|f| f.field_name == spec.name) else {
            if spec.required {
                self.errors.add(spec.name, REQUIRED);
                return None;
            }
            return Some(None);
        };
        match image::load_from_memory(&file.content_bytes) {
            Ok(_) => Some(Some(file)),
            Err(_) => {
                self.errors.add(
                    spec.name,
                    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
                );
                None
            }
        }
    }

    pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> FormErrors {
        self.errors
    }
}

/// Count (total digits, fractional digits) the way the stored column sees them.
fn digit_counts(number: &Decimal) -> (u32, u32) {
    let scale = number.scale();
    let mantissa = number.mantissa().unsigned_abs();
    let len = if mantissa == 0 {
        1
    } else {
        mantissa.to_string().len() as u32
    };
    if scale > len {
        (scale, scale)
    } else {
        (len, scale)
    }
}

fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.chars().any(char::is_whitespace) {
        return false;
    }
    let labels = domain.split('.').collect::<Vec<_>>();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

/// One field ready for the form macros.
#[derive(Debug, Clone, Serialize)]
pub struct BoundField {
    pub name: &'static str,
    pub label: &'static str,
    pub help_text: &'static str,
    pub required: bool,
    pub max_length: Option<usize>,
    pub widget: Widget,
    pub value: String,
    pub selected: Vec<String>,
    pub choices: Vec<Choice>,
    pub errors: Vec<String>,
}

/// A form as the templates see it: every field with its current value and errors.
#[derive(Debug, Clone, Serialize)]
pub struct BoundForm {
    pub fields: Vec<BoundField>,
    pub non_field_errors: Vec<String>,
}

impl BoundForm {
    pub fn new(specs: &[FieldSpec], data: &RawForm) -> Self {
        let fields = specs
            .iter()
            .map(|spec| {
                let value = match spec.kind {
                    FieldKind::Password | FieldKind::Image => String::new(),
                    _ => data.get(spec.name).unwrap_or_default().to_string(),
                };
                BoundField {
                    name: spec.name,
                    label: spec.label,
                    help_text: spec.help_text,
                    required: spec.required,
                    max_length: spec.max_length(),
                    widget: spec.widget,
                    value,
                    selected: data.get_all(spec.name).map(str::to_string).collect(),
                    choices: vec![],
                    errors: vec![],
                }
            })
            .collect();
        Self {
            fields,
            non_field_errors: vec![],
        }
    }

    pub fn with_errors(mut self, errors: &FormErrors) -> Self {
        for field in &mut self.fields {
            field.errors = errors.field(field.name).to_vec();
        }
        self.non_field_errors = errors.non_field().to_vec();
        self
    }

    pub fn with_choices(mut self, name: &str, choices: Vec<Choice>) -> Self {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.choices = choices;
        }
        self
    }

    pub fn field(&self, name: &str) -> Option<&BoundField> {
        self.fields.iter().find(|f| f.name == name)
    }
}
