//! services/api/src/bin/openapi.rs
//!
//! Exports the progress API's OpenAPI document.
//!
//! Usage: `openapi [OUTPUT]`. `OUTPUT` defaults to `openapi.json`; missing
//! parent directories are created.

use fitness_api::web::rest::ApiDoc;
use std::path::{Path, PathBuf};
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn output_path(arg: Option<String>) -> PathBuf {
    arg.filter(|a| !a.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
}

/// Writes the document and returns how many routes it describes.
fn export(api_doc: &utoipa::openapi::OpenApi, path: &Path) -> Result<usize, Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, api_doc.to_pretty_json()?)?;
    Ok(api_doc.paths.paths.len())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = output_path(std::env::args().nth(1));
    let routes = export(&ApiDoc::openapi(), &path)?;
    println!("Wrote {} routes to {}", routes, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_defaults_to_openapi_json() {
        assert_eq!(output_path(None), PathBuf::from("openapi.json"));
        assert_eq!(output_path(Some("  ".into())), PathBuf::from("openapi.json"));
        assert_eq!(output_path(Some("docs/api.json".into())), PathBuf::from("docs/api.json"));
    }

    #[test]
    fn export_creates_missing_directories() {
        let dir = std::env::temp_dir().join(format!("fitness-openapi-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("api.json");

        let routes = export(&ApiDoc::openapi(), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(routes, 6);
        assert!(written.contains("/api/{kind}/{item_id}/complete"));
        assert!(written.contains("/api/goals/today/{goal_id}"));
    }
}
