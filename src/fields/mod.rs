use include_dir::{include_dir, Dir};
use serde::Deserialize;
use serde_json::from_str;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use strum_macros::Display;

use crate::condition::{Condition, Motion};

static FIELD_DIR: Dir = include_dir!("src/fields");

/// The 8 signup form fields, in on-screen order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Field {
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "email")]
    Email,
    #[strum(serialize = "password")]
    Password,
    #[strum(serialize = "password_confirm")]
    PasswordConfirm,
    #[strum(serialize = "phone")]
    Phone,
    #[strum(serialize = "birthdate")]
    Birthdate,
    #[strum(serialize = "gender")]
    Gender,
    #[strum(serialize = "region")]
    Region,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Name,
        Field::Email,
        Field::Password,
        Field::PasswordConfirm,
        Field::Phone,
        Field::Birthdate,
        Field::Gender,
        Field::Region,
    ];

    pub fn from_id(id: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.to_string() == id)
    }

    pub fn is_select(&self) -> bool {
        matches!(self, Field::Gender | Field::Region)
    }
}

/// Reveal groups for the grouped motion: account fields first, profile after.
pub const GROUPS: [&[Field]; 2] = [
    &[
        Field::Name,
        Field::Email,
        Field::Password,
        Field::PasswordConfirm,
    ],
    &[Field::Phone, Field::Birthdate, Field::Gender, Field::Region],
];

/// Mutable key-value form state for the active run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    values: HashMap<Field, String>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, field: Field, value: String) {
        self.values.insert(field, value);
    }

    pub fn push_char(&mut self, field: Field, c: char) {
        let mut value = self.get(field).to_string();
        value.push(c);
        self.set(field, value);
    }

    pub fn pop_char(&mut self, field: Field) {
        let mut value = self.get(field).to_string();
        value.pop();
        self.set(field, value);
    }
}

/// Completion predicate: the field holds enough input to count as filled.
/// Never blocks anything on its own, it only drives reveal and the complete
/// affordance.
pub fn is_complete(field: Field, value: &str) -> bool {
    match field {
        Field::Birthdate => value.chars().count() == 6,
        Field::Gender | Field::Region => !value.is_empty(),
        _ => !value.trim().is_empty(),
    }
}

/// Validity predicate for the fields that have one. `None` means the field
/// carries no validity marker at all.
pub fn validity(field: Field, form: &FormData) -> Option<bool> {
    match field {
        Field::Email => Some(form.get(Field::Email).contains('@')),
        Field::Password | Field::PasswordConfirm => {
            let pw = form.get(Field::Password);
            let confirm = form.get(Field::PasswordConfirm);
            Some(!pw.is_empty() && pw == confirm)
        }
        _ => None,
    }
}

/// Gate used for group reveal: validity where the field has one, plain
/// completion otherwise.
pub fn gate_satisfied(field: Field, form: &FormData) -> bool {
    validity(field, form).unwrap_or_else(|| is_complete(field, form.get(field)))
}

/// Which fields are on screen under `condition` given the current form state.
/// All-at-once shows everything; grouped reveals group g only once every
/// field of group g-1 satisfies its gate.
pub fn visible_fields(condition: &Condition, form: &FormData) -> Vec<Field> {
    match condition.motion {
        Motion::AllAtOnce => Field::ALL.to_vec(),
        Motion::Grouped => {
            let mut visible = Vec::new();
            for (i, group) in GROUPS.iter().enumerate() {
                if i > 0 && !GROUPS[i - 1].iter().all(|f| gate_satisfied(*f, form)) {
                    break;
                }
                visible.extend_from_slice(group);
            }
            visible
        }
    }
}

/// Whether the validity marker for `field` should currently be drawn.
/// Validation level 1 shows it as soon as the field has input; level 0 waits
/// until the field has lost focus at least once.
pub fn validity_visible(
    condition: &Condition,
    field: Field,
    form: &FormData,
    blurred: &HashSet<Field>,
) -> bool {
    if validity(field, form).is_none() {
        return false;
    }
    if condition.validation == 1 {
        !form.get(field).is_empty()
    } else {
        blurred.contains(&field)
    }
}

/// Whole-form completion: every field satisfies its completion predicate.
pub fn form_complete(form: &FormData) -> bool {
    Field::ALL.iter().all(|f| is_complete(*f, form.get(*f)))
}

#[allow(dead_code)]
#[derive(Deserialize, Clone, Debug)]
pub struct FieldSpec {
    pub id: String,
    pub label: String,
    pub example: String,
    pub kind: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Embedded field catalog: labels, example hints and select options.
#[allow(dead_code)]
#[derive(Deserialize, Clone, Debug)]
pub struct Catalog {
    pub name: String,
    pub size: u32,
    pub fields: Vec<FieldSpec>,
}

impl Catalog {
    pub fn new() -> Self {
        read_catalog_from_file("signup.json".to_string()).unwrap()
    }

    pub fn spec(&self, field: Field) -> &FieldSpec {
        let id = field.to_string();
        self.fields
            .iter()
            .find(|s| s.id == id)
            .expect("field missing from catalog")
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

fn read_catalog_from_file(file_name: String) -> Result<Catalog, Box<dyn Error>> {
    let file = FIELD_DIR
        .get_file(file_name)
        .expect("Field catalog file not found");

    let file_as_str = file
        .contents_utf8()
        .expect("Unable to interpret file as a string");

    let catalog = from_str(file_as_str).expect("Unable to deserialize field catalog json");

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::CONDITIONS;

    fn filled_group_one() -> FormData {
        let mut form = FormData::new();
        form.set(Field::Name, "Jane Doe".to_string());
        form.set(Field::Email, "jane@example.com".to_string());
        form.set(Field::Password, "hunter2".to_string());
        form.set(Field::PasswordConfirm, "hunter2".to_string());
        form
    }

    #[test]
    fn test_catalog_loads() {
        let catalog = Catalog::new();
        assert_eq!(catalog.name, "signup");
        assert_eq!(catalog.size, 8);
        assert_eq!(catalog.fields.len(), 8);
    }

    #[test]
    fn test_catalog_covers_every_field() {
        let catalog = Catalog::new();
        for field in Field::ALL {
            let spec = catalog.spec(field);
            assert!(!spec.label.is_empty());
            assert!(!spec.example.is_empty());
        }
    }

    #[test]
    fn test_select_fields_have_options() {
        let catalog = Catalog::new();
        assert!(!catalog.spec(Field::Gender).options.is_empty());
        assert!(!catalog.spec(Field::Region).options.is_empty());
        assert!(catalog.spec(Field::Name).options.is_empty());
    }

    #[test]
    fn test_field_from_id_roundtrip() {
        for field in Field::ALL {
            assert_eq!(Field::from_id(&field.to_string()), Some(field));
        }
        assert_eq!(Field::from_id("nope"), None);
    }

    #[test]
    fn test_completion_text_fields() {
        assert!(!is_complete(Field::Name, ""));
        assert!(!is_complete(Field::Name, "   "));
        assert!(is_complete(Field::Name, "Jane"));
    }

    #[test]
    fn test_completion_birthdate_exact_length() {
        assert!(!is_complete(Field::Birthdate, "9901"));
        assert!(is_complete(Field::Birthdate, "990101"));
        assert!(!is_complete(Field::Birthdate, "1990-01-01"));
    }

    #[test]
    fn test_completion_selects() {
        assert!(!is_complete(Field::Gender, ""));
        assert!(is_complete(Field::Gender, "male"));
        assert!(is_complete(Field::Region, "Seoul"));
    }

    #[test]
    fn test_email_validity_is_substring_check() {
        let mut form = FormData::new();
        form.set(Field::Email, "not-an-email".to_string());
        assert_eq!(validity(Field::Email, &form), Some(false));
        form.set(Field::Email, "a@b".to_string());
        assert_eq!(validity(Field::Email, &form), Some(true));
    }

    #[test]
    fn test_password_validity_requires_nonempty_match() {
        let mut form = FormData::new();
        assert_eq!(validity(Field::Password, &form), Some(false));

        form.set(Field::Password, "secret".to_string());
        assert_eq!(validity(Field::PasswordConfirm, &form), Some(false));

        form.set(Field::PasswordConfirm, "secret".to_string());
        assert_eq!(validity(Field::Password, &form), Some(true));
        assert_eq!(validity(Field::PasswordConfirm, &form), Some(true));
    }

    #[test]
    fn test_no_validity_for_plain_fields() {
        let form = FormData::new();
        assert_eq!(validity(Field::Name, &form), None);
        assert_eq!(validity(Field::Birthdate, &form), None);
    }

    #[test]
    fn test_all_at_once_shows_everything_from_start() {
        let form = FormData::new();
        for cond in CONDITIONS.iter().filter(|c| c.motion == Motion::AllAtOnce) {
            assert_eq!(visible_fields(cond, &form), Field::ALL.to_vec());
        }
    }

    #[test]
    fn test_grouped_starts_with_first_group_only() {
        let form = FormData::new();
        let cond = CONDITIONS[4]; // grouped, validation 0, hints 0
        assert_eq!(visible_fields(&cond, &form), GROUPS[0].to_vec());
    }

    #[test]
    fn test_grouped_second_group_gated_on_validity() {
        let cond = CONDITIONS[4];

        // name filled, email invalid, passwords mismatched: still one group
        let mut form = FormData::new();
        form.set(Field::Name, "Jane".to_string());
        form.set(Field::Email, "janeexample.com".to_string());
        form.set(Field::Password, "a".to_string());
        form.set(Field::PasswordConfirm, "b".to_string());
        assert_eq!(visible_fields(&cond, &form).len(), 4);

        // valid email and matching passwords reveal the profile group
        let form = filled_group_one();
        assert_eq!(visible_fields(&cond, &form), Field::ALL.to_vec());
    }

    #[test]
    fn test_validity_marker_immediate_at_level_one() {
        let cond = CONDITIONS[2]; // all-at-once, validation 1
        let blurred = HashSet::new();
        let mut form = FormData::new();

        assert!(!validity_visible(&cond, Field::Email, &form, &blurred));
        form.set(Field::Email, "x".to_string());
        assert!(validity_visible(&cond, Field::Email, &form, &blurred));
    }

    #[test]
    fn test_validity_marker_deferred_until_blur_at_level_zero() {
        let cond = CONDITIONS[0]; // all-at-once, validation 0
        let mut blurred = HashSet::new();
        let mut form = FormData::new();
        form.set(Field::Email, "x@y".to_string());

        assert!(!validity_visible(&cond, Field::Email, &form, &blurred));
        blurred.insert(Field::Email);
        assert!(validity_visible(&cond, Field::Email, &form, &blurred));
    }

    #[test]
    fn test_no_marker_for_fields_without_validity() {
        let cond = CONDITIONS[2];
        let mut blurred = HashSet::new();
        blurred.insert(Field::Name);
        let mut form = FormData::new();
        form.set(Field::Name, "Jane".to_string());
        assert!(!validity_visible(&cond, Field::Name, &form, &blurred));
    }

    #[test]
    fn test_form_complete() {
        let mut form = filled_group_one();
        assert!(!form_complete(&form));

        form.set(Field::Phone, "010-1234-5678".to_string());
        form.set(Field::Birthdate, "990101".to_string());
        form.set(Field::Gender, "female".to_string());
        form.set(Field::Region, "Seoul".to_string());
        assert!(form_complete(&form));
    }

    #[test]
    fn test_push_and_pop_char() {
        let mut form = FormData::new();
        form.push_char(Field::Name, 'J');
        form.push_char(Field::Name, 'o');
        assert_eq!(form.get(Field::Name), "Jo");
        form.pop_char(Field::Name);
        assert_eq!(form.get(Field::Name), "J");
        form.pop_char(Field::Name);
        form.pop_char(Field::Name);
        assert_eq!(form.get(Field::Name), "");
    }
}
