use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};
use tokio::sync::Barrier;
use uuid::Uuid;

use crate::{
    auth::PasswordHasher,
    configuration::AuthSettings,
    database::RecordStore,
    documents::DocumentUploadService,
    models::{
        Attachment, CustomerRecord, DocumentRefs, DocumentType, NewCustomerRecord, RecordFields,
        RecordFilter, RecordOrder, ValidatedPatch,
    },
    StoreError, UploadError,
};

/// The walk-in customer used throughout the tests, without documents
pub fn john_smith() -> RecordFields {
    RecordFields {
        name: "John Smith".to_owned(),
        account_number: "ACC001234567".to_owned(),
        ifsc_code: "HDFC0001234".to_owned(),
        pan_number: "ABCDE1234F".to_owned(),
        aadhaar_number: "1234-5678-9012".to_owned(),
        mobile_number: "+91 9876543210".to_owned(),
        debit_card_number: None,
        registration_date: "2024-01-15".to_owned(),
    }
}

pub fn record_named(name: &str) -> CustomerRecord {
    let fields = RecordFields {
        name: name.to_owned(),
        ..john_smith()
    };
    let new = NewCustomerRecord::new(fields.validate().unwrap(), DocumentRefs::default(), None);
    CustomerRecord::from_new(new, Utc::now())
}

pub fn png(document_type: DocumentType) -> Attachment {
    Attachment::new(document_type, "image/png", vec![0x89, b'P', b'N', b'G'])
}

// Argon2's minimum costs, hashing in tests should be quick
pub fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(&AuthSettings {
        secret_key: "unit test secret".to_owned(),
        hash_memory_cost: 1024,
        hash_time_cost: 1,
        hash_lanes: 1,
        bootstrap_admin: None,
    })
}

/// Upload service that keeps nothing but the references it hands out
#[derive(Default)]
pub struct FakeUploadService {
    failures: HashMap<DocumentType, UploadError>,
    rendezvous: Option<Barrier>,
    calls: AtomicUsize,
    stored: Mutex<Vec<String>>,
}

impl FakeUploadService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, document_type: DocumentType, error: UploadError) -> Self {
        self.failures.insert(document_type, error);
        self
    }

    /// Every upload blocks until `uploads` of them are in flight at once
    pub fn rendezvous(mut self, uploads: usize) -> Self {
        self.rendezvous = Some(Barrier::new(uploads));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Vec<String> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentUploadService for FakeUploadService {
    async fn upload(&self, attachment: &Attachment) -> Result<String, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }
        if let Some(error) = self.failures.get(&attachment.document_type) {
            return Err(error.clone());
        }
        let path = format!("{}/{}.png", attachment.document_type, Uuid::new_v4());
        self.stored.lock().unwrap().push(path.clone());
        Ok(path)
    }
}

/// A store whose backend is down
pub struct UnavailableRecordStore;

fn unavailable<T>() -> Result<T, StoreError> {
    Err(StoreError::Transient("connection refused".to_owned()))
}

#[async_trait]
impl RecordStore for UnavailableRecordStore {
    async fn insert(&self, _record: NewCustomerRecord) -> Result<Uuid, StoreError> {
        unavailable()
    }

    async fn list(
        &self,
        _filter: &RecordFilter,
        _order: RecordOrder,
    ) -> Result<Vec<CustomerRecord>, StoreError> {
        unavailable()
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<CustomerRecord, StoreError> {
        unavailable()
    }

    async fn find_by_idempotency_key(&self, _key: Uuid) -> Result<Option<Uuid>, StoreError> {
        unavailable()
    }

    async fn update(&self, _id: Uuid, _patch: &ValidatedPatch) -> Result<(), StoreError> {
        unavailable()
    }

    async fn delete(&self, _id: Uuid) -> Result<(), StoreError> {
        unavailable()
    }
}
