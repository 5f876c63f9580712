mod customer_record;
mod memory;
mod operator;

pub use customer_record::{CustomerRecordDatabase, RecordStore};
pub use memory::{InMemoryOperatorRepository, InMemoryRecordStore};
pub use operator::{OperatorDatabase, OperatorRepository};
