//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document for the SAT prep API.
//!
//! Usage: `openapi [OUTPUT]` (defaults to `openapi.json`).

use api_lib::web::rest::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("openapi.json"));

    let doc = ApiDoc::openapi();
    let operations: usize = doc
        .paths
        .paths
        .values()
        .map(|item| {
            [&item.get, &item.post, &item.put, &item.delete]
                .iter()
                .filter(|op| op.is_some())
                .count()
        })
        .sum();

    std::fs::write(&output, doc.to_pretty_json()?)?;
    println!(
        "Wrote {} operations across {} paths to {}",
        operations,
        doc.paths.paths.len(),
        output.display()
    );
    Ok(())
}
