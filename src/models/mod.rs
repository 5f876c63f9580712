mod claim;
pub mod customer_record;
mod document;
mod operator;

pub use claim::{Claim, Role};
pub use customer_record::{
    CustomerRecord, NewCustomerRecord, RecordFields, RecordFilter, RecordOrder, RecordPatch,
    RecordSortField, SortDirection, ValidatedFields, ValidatedPatch,
};
pub use document::{Attachment, DocumentRefs, DocumentType, UploadResult};
pub use operator::{normalise_email, NewOperator, Operator};
