//! services/api/src/bin/openapi.rs
//!
//! Dumps the Audiopintar REST contract as an OpenAPI 3.0 document, for
//! clients that want the schema without standing up the server.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

const OUTPUT_PATH: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let spec = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(OUTPUT_PATH, spec)?;
    println!("OpenAPI document written to {OUTPUT_PATH}");
    Ok(())
}
