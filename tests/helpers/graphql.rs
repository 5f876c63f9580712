use anyhow::Result;
use claims::{assert_none, assert_some};
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde_json::{json, to_string_pretty, Value};

pub const RECORD_GRAPHQL_FIELDS: &str = "
id
name
accountNumber
ifscCode
panNumber
aadhaarNumber
mobileNumber
debitCardNumber
registrationDate
panDocumentRef
aadhaarDocumentRef
debitCardDocumentRef
documentCount
createdAt
";

/// Asserts the response carried no errors and returns its `data`
pub fn parse_graphql_response(response: Value) -> Value {
    if let Some(errors) = response.get("errors") {
        eprintln!("Found Errors: {:?}", to_string_pretty(errors));
        assert_none!(errors.get(0));
    }

    let data = response.get("data");
    assert_some!(data);
    data.unwrap().clone()
}

pub fn john_smith() -> Value {
    json!({
        "name": "John Smith",
        "accountNumber": "ACC001234567",
        "ifscCode": "HDFC0001234",
        "panNumber": "ABCDE1234F",
        "aadhaarNumber": "1234-5678-9012",
        "mobileNumber": "+91 9876543210",
        "registrationDate": "2024-01-15"
    })
}

pub fn submit_record_mutation() -> String {
    format!(
        r#"
        mutation submitRecord($fields: RecordFields!, $documents: [DocumentUpload!], $idempotencyKey: UUID) {{
            submitRecord(fields: $fields, documents: $documents, idempotencyKey: $idempotencyKey) {{
                {}
            }}
        }}
    "#,
        RECORD_GRAPHQL_FIELDS
    )
}

pub struct TestDocument {
    pub document_type: &'static str,
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl TestDocument {
    pub fn png(document_type: &'static str) -> Self {
        Self {
            document_type,
            file_name: "document.png",
            content_type: "image/png",
            bytes: vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a],
        }
    }
}

/// Sends `submitRecord` as a GraphQL multipart request, one file part per
/// document
pub async fn submit_record_with_documents(
    client: &Client,
    address: &str,
    fields: Value,
    documents: Vec<TestDocument>,
) -> Result<Value> {
    let uploads: Vec<Value> = documents
        .iter()
        .map(|document| json!({ "documentType": document.document_type, "file": null }))
        .collect();
    let operations = json!({
        "query": submit_record_mutation(),
        "variables": {
            "fields": fields,
            "documents": uploads,
        }
    });
    let map: serde_json::Map<String, Value> = (0..documents.len())
        .map(|i| {
            (
                i.to_string(),
                json!([format!("variables.documents.{}.file", i)]),
            )
        })
        .collect();

    let mut form = Form::new()
        .text("operations", operations.to_string())
        .text("map", Value::Object(map).to_string());
    for (i, document) in documents.into_iter().enumerate() {
        let part = Part::bytes(document.bytes)
            .file_name(document.file_name)
            .mime_str(document.content_type)?;
        form = form.part(i.to_string(), part);
    }

    let response = client.post(address).multipart(form).send().await?;
    Ok(response.json::<Value>().await?)
}
