use async_graphql::{ComplexObject, Enum, InputObject, SimpleObject};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::cmp::Ordering;
use uuid::Uuid;

use crate::{
    models::{DocumentRefs, DocumentType},
    ValidationError,
};

const REGISTRATION_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, SimpleObject, sqlx::FromRow)]
#[graphql(complex)]
pub struct CustomerRecord {
    pub id: Uuid,
    pub name: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub pan_number: String,
    pub aadhaar_number: String,
    pub mobile_number: String,
    pub debit_card_number: Option<String>,
    pub registration_date: NaiveDate,
    pub pan_document_ref: Option<String>,
    pub aadhaar_document_ref: Option<String>,
    pub debit_card_document_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    #[graphql(skip)]
    pub idempotency_key: Option<Uuid>,
}

/// Graphql Resolver
#[ComplexObject]
impl CustomerRecord {
    /// How many of the three identity documents are on file
    async fn document_count(&self) -> i32 {
        self.document_refs().count() as i32
    }
}

impl CustomerRecord {
    pub fn from_new(new: NewCustomerRecord, created_at: DateTime<Utc>) -> Self {
        let NewCustomerRecord {
            id,
            fields,
            documents,
            idempotency_key,
        } = new;
        Self {
            id,
            name: fields.name,
            account_number: fields.account_number,
            ifsc_code: fields.ifsc_code,
            pan_number: fields.pan_number,
            aadhaar_number: fields.aadhaar_number,
            mobile_number: fields.mobile_number,
            debit_card_number: fields.debit_card_number,
            registration_date: fields.registration_date,
            pan_document_ref: documents.pan,
            aadhaar_document_ref: documents.aadhaar,
            debit_card_document_ref: documents.debit_card,
            created_at,
            idempotency_key,
        }
    }

    /// Case-insensitive substring match over the searchable columns.
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        [&self.name, &self.account_number, &self.pan_number]
            .iter()
            .any(|value| value.to_lowercase().contains(needle))
    }

    pub fn document_ref(&self, document_type: DocumentType) -> Option<&str> {
        match document_type {
            DocumentType::Pan => self.pan_document_ref.as_deref(),
            DocumentType::Aadhaar => self.aadhaar_document_ref.as_deref(),
            DocumentType::DebitCard => self.debit_card_document_ref.as_deref(),
        }
    }

    pub fn document_refs(&self) -> impl Iterator<Item = &str> {
        [
            self.pan_document_ref.as_deref(),
            self.aadhaar_document_ref.as_deref(),
            self.debit_card_document_ref.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Raw field values as they arrive from the record-entry form
#[derive(Debug, Clone, Default, InputObject, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFields {
    pub name: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub pan_number: String,
    pub aadhaar_number: String,
    pub mobile_number: String,
    pub debit_card_number: Option<String>,
    /// `YYYY-MM-DD`
    pub registration_date: String,
}

/// Field values that passed validation. Only constructable through
/// `RecordFields::validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFields {
    pub name: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub pan_number: String,
    pub aadhaar_number: String,
    pub mobile_number: String,
    pub debit_card_number: Option<String>,
    pub registration_date: NaiveDate,
    _private: (),
}

impl RecordFields {
    /// Every required field is checked before anything is reported, so the
    /// error names all of the offending fields at once.
    pub fn validate(self) -> Result<ValidatedFields, ValidationError> {
        let required = [
            ("name", &self.name),
            ("accountNumber", &self.account_number),
            ("ifscCode", &self.ifsc_code),
            ("panNumber", &self.pan_number),
            ("aadhaarNumber", &self.aadhaar_number),
            ("mobileNumber", &self.mobile_number),
            ("registrationDate", &self.registration_date),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| *field)
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let registration_date = parse_registration_date(&self.registration_date)?;

        Ok(ValidatedFields {
            name: self.name.trim().to_owned(),
            account_number: self.account_number.trim().to_owned(),
            ifsc_code: self.ifsc_code.trim().to_owned(),
            pan_number: self.pan_number.trim().to_owned(),
            aadhaar_number: self.aadhaar_number.trim().to_owned(),
            mobile_number: self.mobile_number.trim().to_owned(),
            debit_card_number: non_empty(self.debit_card_number),
            registration_date,
            _private: (),
        })
    }
}

/// Everything needed for a single atomic insert
#[derive(Debug, Clone)]
pub struct NewCustomerRecord {
    pub id: Uuid,
    pub fields: ValidatedFields,
    pub documents: DocumentRefs,
    pub idempotency_key: Option<Uuid>,
}

impl NewCustomerRecord {
    pub fn new(
        fields: ValidatedFields,
        documents: DocumentRefs,
        idempotency_key: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            fields,
            documents,
            idempotency_key,
        }
    }
}

/// An edit to an existing record. `None` leaves the column untouched, an
/// empty `debitCardNumber` clears it.
#[derive(Debug, Clone, Default, InputObject, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    pub name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub pan_number: Option<String>,
    pub aadhaar_number: Option<String>,
    pub mobile_number: Option<String>,
    pub debit_card_number: Option<String>,
    pub registration_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedPatch {
    pub name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub pan_number: Option<String>,
    pub aadhaar_number: Option<String>,
    pub mobile_number: Option<String>,
    pub debit_card_number: Option<Option<String>>,
    pub registration_date: Option<NaiveDate>,
}

impl RecordPatch {
    pub fn validate(self) -> Result<ValidatedPatch, ValidationError> {
        let required = [
            ("name", &self.name),
            ("accountNumber", &self.account_number),
            ("ifscCode", &self.ifsc_code),
            ("panNumber", &self.pan_number),
            ("aadhaarNumber", &self.aadhaar_number),
            ("mobileNumber", &self.mobile_number),
            ("registrationDate", &self.registration_date),
        ];
        let emptied: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| matches!(value, Some(v) if v.trim().is_empty()))
            .map(|(field, _)| *field)
            .collect();
        if !emptied.is_empty() {
            return Err(ValidationError::MissingFields(emptied));
        }

        let registration_date = self
            .registration_date
            .as_deref()
            .map(parse_registration_date)
            .transpose()?;

        let trimmed = |value: Option<String>| value.map(|v| v.trim().to_owned());
        Ok(ValidatedPatch {
            name: trimmed(self.name),
            account_number: trimmed(self.account_number),
            ifsc_code: trimmed(self.ifsc_code),
            pan_number: trimmed(self.pan_number),
            aadhaar_number: trimmed(self.aadhaar_number),
            mobile_number: trimmed(self.mobile_number),
            debit_card_number: self.debit_card_number.map(|v| non_empty(Some(v))),
            registration_date,
        })
    }
}

impl ValidatedPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, record: &mut CustomerRecord) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
        set(&mut record.name, &self.name);
        set(&mut record.account_number, &self.account_number);
        set(&mut record.ifsc_code, &self.ifsc_code);
        set(&mut record.pan_number, &self.pan_number);
        set(&mut record.aadhaar_number, &self.aadhaar_number);
        set(&mut record.mobile_number, &self.mobile_number);
        set(&mut record.debit_card_number, &self.debit_card_number);
        set(&mut record.registration_date, &self.registration_date);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub search: Option<String>,
    pub limit: Option<u32>,
}

impl RecordFilter {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            limit: None,
        }
    }

    /// The lowercased search term, `None` when there is nothing to filter on
    pub fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }
}

#[derive(Debug, Enum, Copy, Clone, Eq, PartialEq)]
pub enum RecordSortField {
    CreatedAt,
    Name,
    RegistrationDate,
}

impl Default for RecordSortField {
    fn default() -> Self {
        Self::CreatedAt
    }
}

#[derive(Debug, Enum, Copy, Clone, Eq, PartialEq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl Default for SortDirection {
    fn default() -> Self {
        Self::Descending
    }
}

/// Newest first unless asked otherwise
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordOrder {
    pub field: RecordSortField,
    pub direction: SortDirection,
}

impl RecordOrder {
    pub fn compare(&self, a: &CustomerRecord, b: &CustomerRecord) -> Ordering {
        let ordering = match self.field {
            RecordSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            RecordSortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            RecordSortField::RegistrationDate => a.registration_date.cmp(&b.registration_date),
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    /// Only ever built from the enums above, never from caller input
    pub fn as_sql(&self) -> &'static str {
        match (self.field, self.direction) {
            (RecordSortField::CreatedAt, SortDirection::Ascending) => "created_at ASC",
            (RecordSortField::CreatedAt, SortDirection::Descending) => "created_at DESC",
            (RecordSortField::Name, SortDirection::Ascending) => "lower(name) ASC",
            (RecordSortField::Name, SortDirection::Descending) => "lower(name) DESC",
            (RecordSortField::RegistrationDate, SortDirection::Ascending) => {
                "registration_date ASC"
            }
            (RecordSortField::RegistrationDate, SortDirection::Descending) => {
                "registration_date DESC"
            }
        }
    }
}

fn parse_registration_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), REGISTRATION_DATE_FORMAT).map_err(|_| {
        ValidationError::Malformed {
            field: "registrationDate",
            reason: format!("expected YYYY-MM-DD, got '{}'", value.trim()),
        }
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
