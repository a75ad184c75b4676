use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, dev::ServerHandle, web::Data};
use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use log::{debug, error, info};
use rustls::crypto::{CryptoProvider, ring::default_provider};
use satellite_netconfig::{api::Api, config::AppConfig, nmcli_client::NmcliClient};
use std::io::Write;
use tokio::signal::unix::{SignalKind, signal};

type UiApi = Api<NmcliClient>;

#[actix_web::main]
async fn main() {
    if let Err(e) = run().await {
        error!("application error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    initialize()?;

    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    let (server_handle, server_task) = run_server()?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            debug!("ctrl-c received");
        },
        _ = sigterm.recv() => {
            debug!("SIGTERM received");
        },
        result = server_task => {
            match result {
                Ok(Ok(())) => debug!("server stopped normally"),
                Ok(Err(e)) => error!("server stopped with error: {e}"),
                Err(e) => error!("server task panicked: {e}"),
            }
        },
    }

    info!("shutting down");
    server_handle.stop(true).await;
    info!("shutdown complete");

    Ok(())
}

fn initialize() -> Result<()> {
    log_panics::init();

    let mut builder = if cfg!(debug_assertions) {
        Builder::from_env(Env::default().default_filter_or("debug"))
    } else {
        Builder::from_env(Env::default().default_filter_or("info"))
    };

    builder.format(|f, record| match record.level() {
        log::Level::Error => {
            eprintln!("{}", record.args());
            Ok(())
        }
        _ => {
            writeln!(f, "{}", record.args())
        }
    });

    builder.target(Target::Stdout).init();

    info!("module version: {}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().context("failed to load configuration")?;
    info!("configuration: {config:?}");

    if config.certificate.is_some() {
        CryptoProvider::install_default(default_provider())
            .map_err(|_| anyhow::anyhow!("crypto provider already installed"))?;
    }

    Ok(())
}

fn run_server() -> Result<(
    ServerHandle,
    tokio::task::JoinHandle<Result<(), std::io::Error>>,
)> {
    let config = AppConfig::get();
    let api = Data::new(UiApi::new(NmcliClient::new(), &config.network));
    let web_root = config.ui.web_root.clone();

    let server = HttpServer::new(move || {
        let app = App::new()
            .wrap(cors())
            .app_data(api.clone())
            .configure(UiApi::routes);

        match &web_root {
            Some(web_root) => app.service(Files::new("/", web_root).index_file("index.html")),
            None => app,
        }
    });

    let address = format!("0.0.0.0:{}", config.ui.port);

    let server = match load_tls_config()? {
        Some(tls_config) => {
            info!("listening on https://{address}");
            server
                .bind_rustls_0_23(&address, tls_config)
                .context("failed to bind server")?
        }
        None => {
            info!("listening on http://{address}");
            server.bind(&address).context("failed to bind server")?
        }
    }
    .disable_signals()
    .run();

    Ok((server.handle(), tokio::spawn(server)))
}

fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_header()
        .allowed_methods(vec!["GET", "POST"])
        .max_age(3600)
}

fn load_tls_config() -> Result<Option<rustls::ServerConfig>> {
    let Some(paths) = &AppConfig::get().certificate else {
        return Ok(None);
    };

    let mut tls_certs = std::io::BufReader::new(
        std::fs::File::open(&paths.cert_path).context("failed to open certificate file")?,
    );

    let mut tls_key = std::io::BufReader::new(
        std::fs::File::open(&paths.key_path).context("failed to open key file")?,
    );

    let tls_certs = rustls_pemfile::certs(&mut tls_certs)
        .collect::<Result<Vec<_>, _>>()
        .context("failed to parse certificate pem")?;

    let key = rustls_pemfile::private_key(&mut tls_key)
        .context("failed to read key pem file")?
        .context("no valid key found in pem file")?;

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(tls_certs, key)
        .context("failed to create tls config")?;

    Ok(Some(config))
}
