//! JSON API handlers for the configurator.

use serde::Deserialize;
use serde_json::json;
use tiny_http::{Header, Request, Response};
use tracing::{error, info};

use super::{ServerContext, header_value, respond_json};
use crate::package;
use crate::sites::{self, CustomSite, PRESET_SITES};
use crate::store::CredentialStore;

#[derive(Debug, Deserialize)]
struct ProfileRequest {
    nome: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct SelectRequest {
    sites: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CustomSiteRequest {
    nome: String,
    url: String,
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    senha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CredentialsRequest {
    sites: Vec<SiteCredentials>,
}

/// Login/senha for one preset site, addressed by display name or key.
#[derive(Debug, Deserialize)]
struct SiteCredentials {
    site: String,
    #[serde(default)]
    login: String,
    #[serde(default)]
    senha: String,
}

#[derive(Debug, Deserialize)]
struct ImageActionRequest {
    site: String,
    image: String,
    acao: String,
}

/// Handle GET /api/state: session snapshot plus the preset catalogue.
pub fn state_snapshot(ctx: &ServerContext, request: Request) {
    let Ok(session) = ctx.session.lock() else {
        respond_json(request, 500, json!({ "error": "session_lock" }));
        return;
    };

    let presets: Vec<_> = PRESET_SITES
        .iter()
        .map(|preset| json!({ "key": preset.key, "name": preset.name, "url": preset.url }))
        .collect();
    // Custom sites are echoed without their credentials.
    let custom: Vec<_> = session
        .custom
        .iter()
        .map(|site| json!({ "nome": site.nome, "url": site.url }))
        .collect();

    respond_json(
        request,
        200,
        json!({
            "profile": session.profile,
            "selected": session.selected,
            "custom": custom,
            "image_actions": session.image_actions,
            "presets": presets,
        }),
    );
}

/// Handle POST /api/profile: set the user and create the per-user directory.
pub fn set_profile(ctx: &ServerContext, body: &[u8], request: Request) {
    let req: ProfileRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => {
            respond_json(request, 400, json!({ "error": "invalid_json", "details": e.to_string() }));
            return;
        }
    };
    if req.nome.trim().is_empty() || req.email.trim().is_empty() {
        respond_json(request, 400, json!({ "error": "missing_profile_fields" }));
        return;
    }

    let Ok(mut session) = ctx.session.lock() else {
        respond_json(request, 500, json!({ "error": "session_lock" }));
        return;
    };
    match session.set_profile(&ctx.work_dir, &req.nome, &req.email) {
        Ok(()) => {
            info!(user = %req.nome, "profile configured");
            respond_json(request, 200, json!({ "status": "ok" }));
        }
        Err(e) => respond_json(
            request,
            400,
            json!({ "error": "profile_failed", "details": format!("{e:#}") }),
        ),
    }
}

/// Handle POST /api/sites/select: replace the preset selection.
pub fn select_sites(ctx: &ServerContext, body: &[u8], request: Request) {
    let req: SelectRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => {
            respond_json(request, 400, json!({ "error": "invalid_json", "details": e.to_string() }));
            return;
        }
    };

    let Ok(mut session) = ctx.session.lock() else {
        respond_json(request, 500, json!({ "error": "session_lock" }));
        return;
    };
    match session.select_presets(&req.sites) {
        Ok(()) => respond_json(request, 200, json!({ "status": "ok", "selected": session.selected })),
        Err(e) => respond_json(
            request,
            400,
            json!({ "error": "unknown_site", "details": format!("{e:#}") }),
        ),
    }
}

/// Handle POST /api/sites/custom: append a custom site.
pub fn add_custom_site(ctx: &ServerContext, body: &[u8], request: Request) {
    let req: CustomSiteRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => {
            respond_json(request, 400, json!({ "error": "invalid_json", "details": e.to_string() }));
            return;
        }
    };

    let Ok(mut session) = ctx.session.lock() else {
        respond_json(request, 500, json!({ "error": "session_lock" }));
        return;
    };
    let site = CustomSite {
        nome: req.nome,
        url: req.url,
        login: req.login.filter(|login| !login.is_empty()),
        senha: req.senha.filter(|senha| !senha.is_empty()),
    };
    match session.add_custom(site) {
        Ok(index) => respond_json(request, 200, json!({ "status": "ok", "index": index })),
        Err(e) => respond_json(
            request,
            400,
            json!({ "error": "invalid_custom_site", "details": format!("{e:#}") }),
        ),
    }
}

/// Handle DELETE /api/sites/custom/<idx>: remove a custom site by index.
pub fn remove_custom_site(ctx: &ServerContext, path: &str, request: Request) {
    let index: usize = match path.rsplit('/').next().and_then(|raw| raw.parse().ok()) {
        Some(index) => index,
        None => {
            respond_json(request, 400, json!({ "error": "invalid_index" }));
            return;
        }
    };

    let Ok(mut session) = ctx.session.lock() else {
        respond_json(request, 500, json!({ "error": "session_lock" }));
        return;
    };
    match session.remove_custom(index) {
        Ok(removed) => respond_json(request, 200, json!({ "status": "ok", "removed": removed.nome })),
        Err(e) => respond_json(
            request,
            404,
            json!({ "error": "no_such_custom_site", "details": format!("{e:#}") }),
        ),
    }
}

/// Handle POST /api/credentials: batch write into the credential store.
///
/// Preset credentials come from the request; custom-site entries are
/// re-derived from the session list so the indices stay dense. The write
/// is all-or-nothing at the file level.
pub fn save_credentials(ctx: &ServerContext, body: &[u8], request: Request) {
    let req: CredentialsRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => {
            respond_json(request, 400, json!({ "error": "invalid_json", "details": e.to_string() }));
            return;
        }
    };

    let Ok(session) = ctx.session.lock() else {
        respond_json(request, 500, json!({ "error": "session_lock" }));
        return;
    };

    let mut entries: Vec<(String, String)> = Vec::new();
    for creds in &req.sites {
        let Some(preset) = sites::preset_by_name(&creds.site) else {
            respond_json(request, 400, json!({ "error": "unknown_site", "site": creds.site }));
            return;
        };
        entries.push((sites::login_key(preset.key), creds.login.clone()));
        entries.push((sites::senha_key(preset.key), creds.senha.clone()));
    }
    for (index, custom) in session.custom.iter().enumerate() {
        entries.push((sites::custom_url_key(index), custom.url.clone()));
        entries.push((
            sites::custom_login_key(index),
            custom.login.clone().unwrap_or_default(),
        ));
        entries.push((
            sites::custom_senha_key(index),
            custom.senha.clone().unwrap_or_default(),
        ));
    }

    let mut store = match CredentialStore::open(&ctx.store_path) {
        Ok(store) => store,
        Err(e) => {
            error!("failed to open credential store: {e:#}");
            respond_json(request, 500, json!({ "error": "store_open_failed" }));
            return;
        }
    };
    match store.write_batch(&entries) {
        Ok(()) => {
            info!(keys = entries.len(), "credentials saved");
            respond_json(request, 200, json!({ "status": "ok", "keys": entries.len() }));
        }
        Err(e) => {
            error!("credential batch write failed: {e:#}");
            respond_json(
                request,
                500,
                json!({ "error": "credentials_write_failed", "details": format!("{e:#}") }),
            );
        }
    }
}

/// Handle POST /api/images: raw PNG body; site and file name come from the
/// `X-Rotina-Site` / `X-Rotina-Image` headers.
pub fn upload_image(ctx: &ServerContext, body: Vec<u8>, request: Request) {
    let site = header_value(&request, "X-Rotina-Site");
    let name = header_value(&request, "X-Rotina-Image");
    let (Some(site), Some(name)) = (site, name) else {
        respond_json(request, 400, json!({ "error": "missing_image_metadata" }));
        return;
    };

    let safe_name = sites::sanitize_name(&name);
    if safe_name.trim().is_empty() {
        respond_json(request, 400, json!({ "error": "invalid_image_name" }));
        return;
    }
    // The content is sniffed, not trusted from the file name.
    if !matches!(image::guess_format(&body), Ok(image::ImageFormat::Png)) {
        respond_json(request, 400, json!({ "error": "png_required" }));
        return;
    }

    let Ok(session) = ctx.session.lock() else {
        respond_json(request, 500, json!({ "error": "session_lock" }));
        return;
    };
    let Some(images_dir) = session.images_dir() else {
        respond_json(request, 409, json!({ "error": "profile_not_set" }));
        return;
    };

    match std::fs::write(images_dir.join(&safe_name), &body) {
        Ok(()) => {
            info!(site = %site, image = %safe_name, "reference image stored");
            respond_json(request, 200, json!({ "status": "ok", "image": safe_name }));
        }
        Err(e) => {
            error!("failed to store image: {e}");
            respond_json(request, 500, json!({ "error": "image_write_failed" }));
        }
    }
}

/// Handle POST /api/images/action: attach a follow-up note to an image.
pub fn set_image_action(ctx: &ServerContext, body: &[u8], request: Request) {
    let req: ImageActionRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => {
            respond_json(request, 400, json!({ "error": "invalid_json", "details": e.to_string() }));
            return;
        }
    };

    let Ok(mut session) = ctx.session.lock() else {
        respond_json(request, 500, json!({ "error": "session_lock" }));
        return;
    };
    session.record_image_action(super::ImageAction {
        site: req.site,
        image: sites::sanitize_name(&req.image),
        acao: req.acao,
    });
    respond_json(request, 200, json!({ "status": "ok" }));
}

/// Handle POST /api/package: build the package and stream the zip back.
pub fn build_package(ctx: &ServerContext, request: Request) {
    let Ok(session) = ctx.session.lock() else {
        respond_json(request, 500, json!({ "error": "session_lock" }));
        return;
    };
    let store = match CredentialStore::open(&ctx.store_path) {
        Ok(store) => store,
        Err(e) => {
            error!("failed to open credential store: {e:#}");
            respond_json(request, 500, json!({ "error": "store_open_failed" }));
            return;
        }
    };

    match package::build(&ctx.work_dir, &session, &store) {
        Ok(archive_path) => match std::fs::read(&archive_path) {
            Ok(bytes) => {
                let header =
                    Header::from_bytes(&b"Content-Type"[..], &b"application/zip"[..])
                        .unwrap_or_else(|()| unreachable!("static header"));
                let response = Response::from_data(bytes).with_header(header);
                let _ = request.respond(response);
            }
            Err(e) => {
                error!("failed to read generated archive: {e}");
                respond_json(request, 500, json!({ "error": "archive_read_failed" }));
            }
        },
        Err(e) => {
            error!("package build failed: {e:#}");
            respond_json(
                request,
                500,
                json!({ "error": "package_failed", "details": format!("{e:#}") }),
            );
        }
    }
}
