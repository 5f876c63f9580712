use actix_cors::Cors;
use actix_web::{
    dev::Server,
    guard,
    http::header::{ACCEPT, CONTENT_TYPE, COOKIE},
    web, App, HttpServer,
};
use async_graphql::{http::MultipartOptions, EmptySubscription, Schema};
use chrono::Duration;
use sqlx::PgPool;
use std::{net::TcpListener, sync::Arc};
use tracing_actix_web::TracingLogger;

use crate::{
    auth::PasswordHasher,
    configuration::Settings,
    database::{
        CustomerRecordDatabase, InMemoryOperatorRepository, InMemoryRecordStore, OperatorDatabase,
        OperatorRepository, RecordStore,
    },
    documents::{
        DocumentInventory, DocumentUploadService, FileSystemDocumentStore, UploadConstraints,
    },
    graphql::{BranchDeskSchema, MutationRoot, QueryRoot},
    ingestion::IngestionPipeline,
    routes::*,
};

const MAX_DOCUMENTS_PER_REQUEST: usize = 3;
/// Files up to this multiple of the configured limit reach the resolver,
/// which rejects them against the limit itself and names the document
const MULTIPART_HEADROOM: usize = 4;
const MULTIPART_FRAMING_BYTES: usize = 1024;

/// Everything a request handler or resolver needs, wired once at startup
#[derive(Clone)]
pub struct Services {
    pub records: Arc<dyn RecordStore>,
    pub operators: Arc<dyn OperatorRepository>,
    pub uploads: Arc<dyn DocumentUploadService>,
    pub inventory: Arc<dyn DocumentInventory>,
    pub pipeline: Arc<IngestionPipeline>,
    pub hasher: PasswordHasher,
    pub constraints: UploadConstraints,
    pub orphan_grace: Duration,
}

impl Services {
    pub fn new(
        records: Arc<dyn RecordStore>,
        operators: Arc<dyn OperatorRepository>,
        settings: &Settings,
    ) -> Self {
        let constraints = UploadConstraints::from_settings(&settings.uploads);
        let documents = Arc::new(FileSystemDocumentStore::new(
            settings.uploads.root_dir.clone(),
            constraints.clone(),
        ));
        let pipeline = IngestionPipeline::new(
            documents.clone(),
            Arc::clone(&records),
            constraints.clone(),
        );
        Self {
            records,
            operators,
            uploads: documents.clone(),
            inventory: documents,
            pipeline: Arc::new(pipeline),
            hasher: PasswordHasher::new(&settings.auth),
            constraints,
            orphan_grace: Duration::seconds(
                i64::try_from(settings.uploads.orphan_grace_seconds).unwrap_or(i64::MAX),
            ),
        }
    }

    pub fn in_memory(settings: &Settings) -> Self {
        Self::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryOperatorRepository::new()),
            settings,
        )
    }

    pub fn postgres(pool: PgPool, settings: &Settings) -> Self {
        Self::new(
            Arc::new(CustomerRecordDatabase::new(pool.clone())),
            Arc::new(OperatorDatabase::new(pool)),
            settings,
        )
    }
}

pub fn generate_schema(
    services: Option<Services>,
    settings: Option<Arc<Settings>>,
) -> BranchDeskSchema {
    let mut builder = Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .extension(async_graphql::extensions::Tracing);
    if let Some(services) = services {
        builder = builder.data(services);
    }
    if let Some(settings) = settings {
        builder = builder.data(settings);
    }
    builder.finish()
}

pub fn build_app(
    listener: TcpListener,
    services: Services,
    settings: Arc<Settings>,
) -> Result<Server, std::io::Error> {
    let schema = generate_schema(Some(services.clone()), Some(Arc::clone(&settings)));
    let transport_limit = (services.constraints.max_size_bytes() as usize)
        .saturating_mul(MULTIPART_HEADROOM)
        .saturating_add(MULTIPART_FRAMING_BYTES);
    let multipart = MultipartOptions::default()
        .max_file_size(transport_limit)
        .max_num_files(MAX_DOCUMENTS_PER_REQUEST);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(
                Cors::default()
                    .allowed_origin_fn(|origin, _req_head| {
                        origin.as_bytes().starts_with(b"http://localhost")
                            || origin.as_bytes().starts_with(b"http://127.0.0.1")
                    })
                    .allowed_methods(vec!["GET", "POST"])
                    .allowed_headers(vec![ACCEPT, CONTENT_TYPE, COOKIE])
                    .supports_credentials()
                    .max_age(3600),
            )
            .app_data(web::Data::new(schema.clone()))
            .app_data(web::Data::new(services.clone()))
            .app_data(multipart.clone())
            .service(web::resource("/").guard(guard::Post()).to(graphql_index))
            .service(
                web::resource("/")
                    .guard(guard::Get())
                    .to(graphql_playground),
            )
            .route("/health_check", web::get().to(health_check))
            .route("/admin/login", web::get().to(admin_login))
            .route("/staff/login", web::get().to(staff_login))
            .route("/admin/dashboard", web::get().to(admin_dashboard))
            .route("/admin/customers", web::get().to(admin_customers))
            .route("/admin/staff", web::get().to(admin_staff))
            .route(
                "/admin/documents/{document_type}/{file_name}",
                web::get().to(admin_document),
            )
            .route("/staff/dashboard", web::get().to(staff_dashboard))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
