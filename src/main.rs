use std::env;
use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{rt::task, web, App, HttpResponse, HttpServer, Responder};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use sitesmith::archive;
use sitesmith::config::ServerConfig;
use sitesmith::generate::GenerationClient;
use sitesmith::splitter;

const DEFAULT_EXPORT_NAME: &str = "website";

struct AppContext {
    client: Option<GenerationClient>,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    html: String,
}

#[derive(Debug, Deserialize)]
struct DownloadRequest {
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ErrorResponse {
    fn new(error: &str) -> Self {
        Self {
            error: error.to_string(),
            details: None,
        }
    }

    fn with_details(error: &str, details: String) -> Self {
        Self {
            error: error.to_string(),
            details: Some(details),
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    let raw_args: Vec<String> = env::args().skip(1).collect();
    print_banner();

    let config_path = match parse_args(&raw_args) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            std::process::exit(1);
        }
    };

    let config = ServerConfig::load(config_path.as_deref());
    if let Err(err) = run_server(config).await {
        eprintln!("{err}");
        std::process::exit(1);
    }

    Ok(())
}

fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("Sitesmith v{version}");
    eprintln!();
}

fn parse_args(args: &[String]) -> Result<Option<PathBuf>> {
    let mut iter = args.iter();
    let mut config_path: Option<PathBuf> = None;

    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "-c" | "--config" => {
                let Some(path) = iter.next() else {
                    bail!("Missing value for --config");
                };
                config_path = Some(PathBuf::from(path));
            }
            other => bail!("Unexpected argument: {other}"),
        }
    }

    Ok(config_path)
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  sitesmith [-c <config-file>]");
}

async fn run_server(config: ServerConfig) -> Result<()> {
    let client = match config.api_key.as_deref() {
        Some(key) => match GenerationClient::new(key, &config.model) {
            Ok(client) => Some(client),
            Err(err) => {
                eprintln!("Warning: failed to build generation client: {err}");
                None
            }
        },
        None => {
            eprintln!("Warning: OPENAI_API_KEY missing. Generation requests will fail.");
            None
        }
    };

    let context = web::Data::new(AppContext { client });
    let port = config.port;
    let allowed_origin = config.allowed_origin.clone();

    println!("Sitesmith backend running on http://localhost:{port}");
    println!("POST /generate to create HTML from a prompt");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&allowed_origin)
            .allowed_methods(vec!["GET", "POST"])
            .allow_any_header()
            .supports_credentials();

        App::new()
            .app_data(context.clone())
            .wrap(cors)
            .route("/", web::get().to(info))
            .route("/generate", web::post().to(generate))
            .route("/download-zip", web::post().to(download_zip))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    Ok(())
}

async fn info() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "ok": true,
        "message": "Sitesmith backend running"
    }))
}

async fn generate(
    context: web::Data<AppContext>,
    body: web::Json<GenerateRequest>,
) -> impl Responder {
    let prompt = body.prompt.as_deref().unwrap_or("").trim().to_string();
    if prompt.is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse::new("Prompt is required"));
    }

    let Some(client) = context.client.clone() else {
        return HttpResponse::InternalServerError().json(ErrorResponse::with_details(
            "Generation failed",
            "OPENAI_API_KEY is not configured".to_string(),
        ));
    };

    match task::spawn_blocking(move || client.generate(&prompt)).await {
        Ok(Ok(html)) => HttpResponse::Ok().json(GenerateResponse { html }),
        Ok(Err(err)) => {
            eprintln!("Generation error: {err}");
            HttpResponse::InternalServerError()
                .json(ErrorResponse::with_details("Generation failed", err.to_string()))
        }
        Err(err) => {
            eprintln!("Generation task failed: {err}");
            HttpResponse::InternalServerError()
                .json(ErrorResponse::with_details("Generation failed", err.to_string()))
        }
    }
}

async fn download_zip(body: web::Json<DownloadRequest>) -> impl Responder {
    let Some(html) = body.html.clone().filter(|html| !html.is_empty()) else {
        return HttpResponse::BadRequest().json(ErrorResponse::new("HTML content is required"));
    };

    let filename = normalize_filename(body.filename.as_deref());
    let bundle = splitter::split(&html, &filename);

    match archive::package(&bundle) {
        Ok(bytes) => HttpResponse::Ok()
            .content_type("application/zip")
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename=\"{filename}.zip\""),
            ))
            .body(bytes),
        Err(err) => {
            eprintln!("ZIP generation error: {err}");
            HttpResponse::InternalServerError().json(ErrorResponse::with_details(
                "ZIP generation failed",
                err.to_string(),
            ))
        }
    }
}

/// Reduce a requested filename to a safe token for the disposition header
/// and the README title.
fn normalize_filename(raw: Option<&str>) -> String {
    let cleaned: String = raw
        .unwrap_or(DEFAULT_EXPORT_NAME)
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(['-', '.']).to_string();

    if cleaned.is_empty() {
        DEFAULT_EXPORT_NAME.to_string()
    } else {
        cleaned
    }
}
