use crate::config::CliConfig;
use chrono::Local;
use vellum_core::context_keywords;
use vellum_graph::surface::{surface, SurfacePayload};

/// Emit the session-start surfacing payload on stdout.
///
/// This runs as a session hook: it must always succeed and always print a
/// valid payload, empty when there is nothing to say.
pub fn execute(config: &CliConfig, project: Option<String>) {
    let payload = build_payload(config, project);
    match serde_json::to_string(&payload) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{{}}"),
    }
}

fn build_payload(config: &CliConfig, project: Option<String>) -> SurfacePayload {
    let vault_root = match config.resolve_vault() {
        Some(root) => root,
        None => return SurfacePayload::default(),
    };

    let project_name = project.or_else(|| {
        std::env::current_dir().ok().and_then(|cwd| {
            cwd.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
    });
    let keywords = project_name
        .map(|name| context_keywords(&name))
        .unwrap_or_default();

    let today = Local::now().date_naive();
    surface(&vault_root, today, &keywords)
}
