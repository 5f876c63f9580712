use branchdesk::generate_schema;
use std::{env, fs};

/// Writes the GraphQL SDL to the path given as the first argument, or
/// `schema.graphql` in the working directory
fn main() -> std::io::Result<()> {
    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("schema.graphql"));
    fs::write(&path, generate_schema(None, None).sdl())?;
    println!("schema written to {}", path);
    Ok(())
}
