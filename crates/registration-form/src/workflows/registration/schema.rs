use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::domain::{Address, AddressKind, AddressLine, RegistrationForm, TextField};
use super::fields::{DocumentField, FieldPath, ValidationErrorMap, Violation};

pub const MINIMUM_DOCUMENTS: usize = 2;
pub const MINIMUM_AGE_YEARS: u32 = 18;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const MINIMUM_DOCUMENTS_MESSAGE: &str = "Minimum 2 documents are required";
pub const REQUIRED_FIELDS_MESSAGE: &str = "Please fill in all required fields";

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// Required-ness and 3..=20 character bounds for a single text input.
#[derive(Debug, Clone, Copy)]
struct TextRule {
    required: Option<&'static str>,
    too_short: &'static str,
    too_long: &'static str,
}

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 20;

impl TextRule {
    const fn required(
        required: &'static str,
        too_short: &'static str,
        too_long: &'static str,
    ) -> Self {
        Self {
            required: Some(required),
            too_short,
            too_long,
        }
    }

    const fn optional(too_short: &'static str, too_long: &'static str) -> Self {
        Self {
            required: None,
            too_short,
            too_long,
        }
    }

    /// Every failing rule, in declaration order: required, then minimum, then maximum
    /// length. An empty optional value passes outright.
    fn check(&self, value: &str) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if value.is_empty() {
            match self.required {
                Some(message) => failed.push(message),
                None => return failed,
            }
        }

        let len = value.chars().count();
        if len < MIN_LEN {
            failed.push(self.too_short);
        }
        if len > MAX_LEN {
            failed.push(self.too_long);
        }
        failed
    }
}

const STREET_TOO_SHORT: &str = "Street must be at least 3 characters";
const STREET_TOO_LONG: &str = "Street cannot be more than 20 characters";

const FIRST_NAME: TextRule = TextRule::required(
    "First name is required",
    "First name must be at least 3 characters",
    "First name cannot be more than 20 characters",
);
const LAST_NAME: TextRule = TextRule::required(
    "Last name is required",
    "Last name must be at least 3 characters",
    "Last name cannot be more than 20 characters",
);
const RESIDENTIAL_STREET1: TextRule = TextRule::required(
    "Residential address street 1 is required",
    STREET_TOO_SHORT,
    STREET_TOO_LONG,
);
const PERMANENT_STREET1: TextRule = TextRule::required(
    "Permanent address street 1 is required",
    STREET_TOO_SHORT,
    STREET_TOO_LONG,
);
const STREET2: TextRule = TextRule::optional(STREET_TOO_SHORT, STREET_TOO_LONG);
const FILE_NAME: TextRule = TextRule::required(
    "File name is required",
    "File name must be at least 3 characters",
    "File name cannot be more than 20 characters",
);

/// The two schema variants, picked per submission attempt from the address toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationSchema {
    /// Permanent address is entered separately and carries its own rules.
    SeparatePermanentAddress,
    /// Permanent address mirrors the residential one and is exempt from rules.
    MirroredPermanentAddress,
}

impl RegistrationSchema {
    pub fn for_toggle(same_as_residential: bool) -> Self {
        if same_as_residential {
            Self::MirroredPermanentAddress
        } else {
            Self::SeparatePermanentAddress
        }
    }

    /// Mirror the residential address into the draft when the toggle is on, then pick
    /// the matching schema so validation and payload see the same permanent address.
    /// The date of birth is trimmed here too, so the value validated is the value sent.
    pub fn prepare(draft: &mut RegistrationForm) -> Self {
        draft.mirror_permanent_address();
        let trimmed = draft.dob.trim();
        if trimmed.len() != draft.dob.len() {
            draft.dob = trimmed.to_string();
        }
        Self::for_toggle(draft.same_as_residential())
    }

    /// Check the whole draft, collecting every failing rule of every field.
    pub fn validate(
        &self,
        draft: &RegistrationForm,
        today: NaiveDate,
    ) -> Result<(), ValidationFailure> {
        let mut violations = Vec::new();

        check_text(
            &mut violations,
            TextField::FirstName.into(),
            &FIRST_NAME,
            &draft.first_name,
        );
        check_text(
            &mut violations,
            TextField::LastName.into(),
            &LAST_NAME,
            &draft.last_name,
        );
        for message in email_violations(&draft.email) {
            violations.push(Violation::new(TextField::Email.into(), message));
        }
        for message in date_of_birth_violations(&draft.dob, today) {
            violations.push(Violation::new(TextField::DateOfBirth.into(), message));
        }

        check_address(
            &mut violations,
            AddressKind::Residential,
            &RESIDENTIAL_STREET1,
            &draft.residential_address,
        );
        if matches!(self, Self::SeparatePermanentAddress) {
            check_address(
                &mut violations,
                AddressKind::Permanent,
                &PERMANENT_STREET1,
                &draft.permanent_address,
            );
        }

        if draft.documents().len() < MINIMUM_DOCUMENTS {
            violations.push(Violation::new(
                FieldPath::Documents,
                MINIMUM_DOCUMENTS_MESSAGE,
            ));
        }
        for (index, doc) in draft.documents().iter().enumerate() {
            check_text(
                &mut violations,
                FieldPath::document(index, DocumentField::FileName),
                &FILE_NAME,
                &doc.file_name,
            );
            if doc.file_kind.is_none() {
                violations.push(Violation::new(
                    FieldPath::document(index, DocumentField::FileKind),
                    "File type is required",
                ));
            }
            match (&doc.file, doc.file_kind) {
                (None, _) => violations.push(Violation::new(
                    FieldPath::document(index, DocumentField::File),
                    "File is required",
                )),
                (Some(file), Some(kind)) if !kind.accepts(&file.content_type) => {
                    violations.push(Violation::new(
                        FieldPath::document(index, DocumentField::File),
                        format!("Please select a valid {} file", kind.label()),
                    ))
                }
                _ => {}
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure { violations })
        }
    }
}

fn check_text(violations: &mut Vec<Violation>, path: FieldPath, rule: &TextRule, value: &str) {
    for message in rule.check(value) {
        violations.push(Violation::new(path, message));
    }
}

fn check_address(
    violations: &mut Vec<Violation>,
    kind: AddressKind,
    street1: &TextRule,
    address: &Address,
) {
    check_text(
        violations,
        FieldPath::address(kind, AddressLine::Street1),
        street1,
        address.line(AddressLine::Street1),
    );
    check_text(
        violations,
        FieldPath::address(kind, AddressLine::Street2),
        &STREET2,
        address.line(AddressLine::Street2),
    );
}

/// Format before presence; the format rule ignores an empty value.
fn email_violations(email: &str) -> Vec<&'static str> {
    let mut failed = Vec::new();
    if !email.is_empty() && !EMAIL_REGEX.is_match(email) {
        failed.push("Invalid email address");
    }
    if email.is_empty() {
        failed.push("Email is required");
    }
    failed
}

/// Presence, then a parseable date, then the minimum age. A value that fails an
/// earlier rule fails every later one too.
fn date_of_birth_violations(raw: &str, today: NaiveDate) -> Vec<&'static str> {
    let mut failed = Vec::new();
    if raw.is_empty() {
        failed.push("Date of birth is required");
    }
    let birth = NaiveDate::parse_from_str(raw, DATE_FORMAT).ok();
    if birth.is_none() {
        failed.push("Please enter a valid date");
    }
    let old_enough = birth
        .and_then(|birth| age_in_years(birth, today))
        .is_some_and(|age| age >= MINIMUM_AGE_YEARS);
    if !old_enough {
        failed.push("You must be at least 18 years old");
    }
    failed
}

/// Whole calendar years between `birth` and `today` (year, then month, then day);
/// `None` for a birth date in the future.
pub fn age_in_years(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    today.years_since(birth)
}

/// Every violation found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("registration draft failed validation with {} violation(s)", .violations.len())]
pub struct ValidationFailure {
    violations: Vec<Violation>,
}

impl ValidationFailure {
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn error_map(&self) -> ValidationErrorMap {
        ValidationErrorMap::from_violations(&self.violations)
    }

    /// The minimum-document rule outranks every other violation.
    pub fn summary(&self) -> &'static str {
        if self
            .violations
            .iter()
            .any(|violation| violation.path == FieldPath::Documents)
        {
            MINIMUM_DOCUMENTS_MESSAGE
        } else {
            REQUIRED_FIELDS_MESSAGE
        }
    }
}
