use anyhow::{Context, Result};
use clap::{Arg, ArgAction};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use layoutd::i18n::YamlCatalog;
use layoutd::{RenderSettings, Renderer};

const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("layoutd=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let matches = clap::Command::new("layoutd")
        .about("Renders page templates inside layouts")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("CONFIG")
                .help("Path to a YAML settings file"),
        )
        .arg(
            Arg::new("templates")
                .short('t')
                .long("templates")
                .value_name("DIR")
                .action(ArgAction::Append)
                .help("Template directory; repeat to search several, first wins"),
        )
        .arg(
            Arg::new("layout")
                .short('l')
                .long("layout")
                .value_name("LAYOUT")
                .help("Default layout name"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .value_parser(clap::value_parser!(u16))
                .help("Port to listen on"),
        )
        .arg(
            Arg::new("debug_files")
                .long("debug-files")
                .action(ArgAction::SetTrue)
                .help("Log the path of every compiled template"),
        )
        .get_matches();

    let mut settings = match matches.get_one::<String>("config") {
        Some(path) => RenderSettings::from_yaml_file(Path::new(path))
            .with_context(|| format!("loading settings from {}", path))?,
        None => RenderSettings::default(),
    };

    if let Some(dirs) = matches.get_many::<String>("templates") {
        settings.template_paths = dirs.map(PathBuf::from).collect();
    }
    if let Some(layout) = matches.get_one::<String>("layout") {
        settings.default_layout = Some(layout.clone());
    }
    if matches.get_flag("debug_files") {
        settings.debug_files = true;
    }
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .unwrap_or(DEFAULT_PORT);

    let mut builder = Renderer::builder(settings.clone());
    if let Some(path) = &settings.translations {
        let catalog = YamlCatalog::from_file(path, settings.default_locale.clone())
            .with_context(|| format!("loading translations from {}", path.display()))?;
        builder = builder.localizer(Arc::new(catalog));
    }
    let renderer = builder.build();

    let app = layoutd::create_router(renderer);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(
        %addr,
        templates = ?settings.template_paths,
        layout = ?settings.default_layout,
        "Starting layoutd"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
