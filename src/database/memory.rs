use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::{
    database::{OperatorRepository, RecordStore},
    models::{
        CustomerRecord, NewCustomerRecord, NewOperator, Operator, RecordFilter, RecordOrder,
        ValidatedPatch,
    },
    StoreError,
};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|e| StoreError::Transient(format!("store lock poisoned: {}", e)))
}

/// Process-local record store for local runs and tests. Every operation
/// holds the lock for its whole duration, so each one is atomic.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Vec<CustomerRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    #[tracing::instrument(skip(self, record), fields(repository = "memory_record", id = %record.id))]
    async fn insert(&self, record: NewCustomerRecord) -> Result<Uuid, StoreError> {
        let mut records = lock(&self.records)?;
        if let Some(key) = record.idempotency_key {
            if let Some(existing) = records.iter().find(|r| r.idempotency_key == Some(key)) {
                return Ok(existing.id);
            }
        }
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Conflict(format!(
                "record {} already exists",
                record.id
            )));
        }
        let id = record.id;
        records.push(CustomerRecord::from_new(record, Utc::now()));
        Ok(id)
    }

    #[tracing::instrument(skip(self), fields(repository = "memory_record"))]
    async fn list(
        &self,
        filter: &RecordFilter,
        order: RecordOrder,
    ) -> Result<Vec<CustomerRecord>, StoreError> {
        let needle = filter.needle();
        let mut matching: Vec<CustomerRecord> = lock(&self.records)?
            .iter()
            .filter(|record| match &needle {
                Some(needle) => record.matches(needle),
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| order.compare(a, b).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = filter.limit {
            matching.truncate(limit as usize);
        }
        Ok(matching)
    }

    #[tracing::instrument(skip(self), fields(repository = "memory_record"))]
    async fn find_by_id(&self, id: Uuid) -> Result<CustomerRecord, StoreError> {
        lock(&self.records)?
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    #[tracing::instrument(skip(self), fields(repository = "memory_record"))]
    async fn find_by_idempotency_key(&self, key: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(lock(&self.records)?
            .iter()
            .find(|record| record.idempotency_key == Some(key))
            .map(|record| record.id))
    }

    #[tracing::instrument(skip(self), fields(repository = "memory_record"))]
    async fn update(&self, id: Uuid, patch: &ValidatedPatch) -> Result<(), StoreError> {
        let mut records = lock(&self.records)?;
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(StoreError::NotFound)?;
        patch.apply(record);
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(repository = "memory_record"))]
    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut records = lock(&self.records)?;
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOperatorRepository {
    operators: Mutex<Vec<Operator>>,
}

impl InMemoryOperatorRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OperatorRepository for InMemoryOperatorRepository {
    #[tracing::instrument(skip(self), fields(repository = "memory_operator"))]
    async fn find_by_email(&self, email: &str) -> Result<Option<Operator>, StoreError> {
        Ok(lock(&self.operators)?
            .iter()
            .find(|operator| operator.email == email)
            .cloned())
    }

    #[tracing::instrument(skip(self), fields(repository = "memory_operator"))]
    async fn list(&self) -> Result<Vec<Operator>, StoreError> {
        let mut operators = lock(&self.operators)?.clone();
        operators.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(operators)
    }

    #[tracing::instrument(skip(self, operator), fields(repository = "memory_operator", email = %operator.email))]
    async fn create(&self, operator: NewOperator) -> Result<Operator, StoreError> {
        let mut operators = lock(&self.operators)?;
        if operators.iter().any(|o| o.email == operator.email) {
            return Err(StoreError::Conflict(format!(
                "an operator with email {} already exists",
                operator.email
            )));
        }
        let operator = Operator {
            id: operator.id,
            email: operator.email,
            role: operator.role,
            password_hash: operator.password_hash,
            created_at: Utc::now(),
        };
        operators.push(operator.clone());
        Ok(operator)
    }

    #[tracing::instrument(skip(self), fields(repository = "memory_operator"))]
    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut operators = lock(&self.operators)?;
        let before = operators.len();
        operators.retain(|operator| operator.id != id);
        if operators.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{DocumentRefs, RecordFields, RecordPatch, Role},
        test_helpers::john_smith,
    };
    use claims::{assert_err, assert_none, assert_ok, assert_some_eq};

    fn new_record(fields: RecordFields, key: Option<Uuid>) -> NewCustomerRecord {
        NewCustomerRecord::new(fields.validate().unwrap(), DocumentRefs::default(), key)
    }

    #[tokio::test]
    async fn inserted_records_are_immediately_visible() {
        let store = InMemoryRecordStore::new();
        let id = assert_ok!(store.insert(new_record(john_smith(), None)).await);

        let record = assert_ok!(store.find_by_id(id).await);
        assert_eq!(record.name, "John Smith");
        let all = store
            .list(&RecordFilter::default(), RecordOrder::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn insert_is_idempotent_on_the_key() {
        let store = InMemoryRecordStore::new();
        let key = Uuid::new_v4();
        let first = store.insert(new_record(john_smith(), Some(key))).await.unwrap();
        let second = store.insert(new_record(john_smith(), Some(key))).await.unwrap();
        assert_eq!(first, second);
        assert_some_eq!(store.find_by_idempotency_key(key).await.unwrap(), first);
        assert_none!(store.find_by_idempotency_key(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_ids_conflict() {
        let store = InMemoryRecordStore::new();
        let record = new_record(john_smith(), None);
        store.insert(record.clone()).await.unwrap();
        assert_eq!(
            store.insert(record.clone()).await,
            Err(StoreError::Conflict(format!(
                "record {} already exists",
                record.id
            )))
        );
    }

    #[tokio::test]
    async fn list_filters_and_limits() {
        let store = InMemoryRecordStore::new();
        for name in ["John Smith", "Sarah Johnson", "Mike Davis"] {
            let fields = RecordFields {
                name: name.to_owned(),
                ..john_smith()
            };
            store.insert(new_record(fields, None)).await.unwrap();
        }

        let johns = store
            .list(&RecordFilter::search("JOHN"), RecordOrder::default())
            .await
            .unwrap();
        assert_eq!(johns.len(), 2);

        let limited = RecordFilter {
            search: None,
            limit: Some(1),
        };
        assert_eq!(
            store
                .list(&limited, RecordOrder::default())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_records() {
        let store = InMemoryRecordStore::new();
        let patch = RecordPatch {
            name: Some("Jane".to_owned()),
            ..RecordPatch::default()
        }
        .validate()
        .unwrap();
        assert_eq!(
            store.update(Uuid::new_v4(), &patch).await,
            Err(StoreError::NotFound)
        );
        assert_eq!(store.delete(Uuid::new_v4()).await, Err(StoreError::NotFound));

        let id = store.insert(new_record(john_smith(), None)).await.unwrap();
        assert_ok!(store.update(id, &patch).await);
        assert_eq!(store.find_by_id(id).await.unwrap().name, "Jane");
        assert_ok!(store.delete(id).await);
        assert_err!(store.find_by_id(id).await);
    }

    #[tokio::test]
    async fn operator_emails_are_unique() {
        let repo = InMemoryOperatorRepository::new();
        let created = repo
            .create(NewOperator::new("Admin@Test.com", Role::Admin, "hash".into()))
            .await
            .unwrap();
        assert_eq!(created.email, "admin@test.com");
        assert_err!(
            repo.create(NewOperator::new("admin@test.com", Role::Staff, "hash".into()))
                .await
        );
        assert_some_eq!(
            repo.find_by_email("admin@test.com").await.unwrap(),
            created.clone()
        );
        assert_ok!(repo.delete(created.id).await);
        assert_eq!(repo.delete(created.id).await, Err(StoreError::NotFound));
    }
}
