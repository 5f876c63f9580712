use anyhow::Result;
use reqwest::{redirect::Policy, Client, ClientBuilder};
use serde_json::{json, Value};
use std::time::Duration;

use branchdesk::models::Role;

use crate::helpers::{ADMIN_EMAIL, PASSWORD, STAFF_EMAIL};

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Keeps cookies between requests and never follows redirects, so the
/// guard's `303`s can be asserted on
pub fn build_http_client() -> Result<Client> {
    let client = ClientBuilder::new()
        .cookie_store(true)
        .redirect(Policy::none())
        .user_agent(APP_USER_AGENT)
        .timeout(Duration::from_secs(10))
        .build()?;
    Ok(client)
}

pub async fn send_request(client: &Client, address: &str, body: &Value) -> Result<Value> {
    let response = client.post(address).json(body).send().await?;
    let data = response.json::<serde_json::Value>().await?;
    Ok(data)
}

pub async fn log_in(client: &Client, address: &str, email: &str, role: Role) -> Result<Value> {
    let graphql_mutation = r#"
        mutation login($email: String!, $password: String!, $role: Role!) {
            login(email: $email, password: $password, role: $role) {
                role
                subjectId
            }
        }
    "#;

    let body = json!({
        "query": graphql_mutation,
        "variables": {
            "email": email,
            "password": PASSWORD,
            "role": role.to_string().to_uppercase(),
        }
    });

    send_request(client, address, &body).await
}

/// A client already signed in as the seeded operator for `role`
pub async fn signed_in_client(address: &str, role: Role) -> Result<Client> {
    let client = build_http_client()?;
    let email = match role {
        Role::Admin => ADMIN_EMAIL,
        Role::Staff => STAFF_EMAIL,
    };
    let response = log_in(&client, address, email, role).await?;
    anyhow::ensure!(
        response.get("errors").is_none(),
        "login failed: {}",
        response
    );
    Ok(client)
}
