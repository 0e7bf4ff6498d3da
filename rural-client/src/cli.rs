//! Définition et implémentation des commandes CLI
//!
//! - `import`: CSV → aperçu, puis envoi à l'API (sauf `--dry-run`)
//! - `list`, `create`, `update`, `delete`: gestion des propriétés
//! - `analysis`, `report`: résultats d'analyse et rapport PDF
//! - `listen`: notifications d'analyse en temps réel
//! - `whoami`, `metrics`: outils locaux, sans appel réseau

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::{info, warn};

use rural_csv::{metrics, Coordinate, PropertyRecord, PropertyType};

use crate::api::{AnalysisResponse, ApiClient, PropertyUpdate};
use crate::auth::AuthToken;
use crate::config::ClientConfig;
use crate::dashboard::Dashboard;
use crate::export::geojson;
use crate::report::ImportReport;

#[derive(Subcommand)]
pub enum Commands {
    /// Import properties from a CSV file
    Import {
        /// CSV file (header: nome,tipo,area,perimetro,coordenadas[,descricao])
        #[arg(short, long)]
        file: PathBuf,

        /// Validate and preview only, do not submit
        #[arg(long)]
        dry_run: bool,

        /// Write the valid rows as a GeoJSON FeatureCollection
        #[arg(long)]
        geojson: Option<PathBuf>,

        /// Save the import report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List properties with their analysis status
    List {
        /// Also write the properties as GeoJSON
        #[arg(long)]
        geojson: Option<PathBuf>,
    },

    /// Create a property from a boundary (area and perimeter computed locally)
    Create {
        #[arg(long)]
        name: String,

        /// fazenda, sitio, chacara, terreno, outros
        #[arg(long = "type", default_value = "fazenda")]
        property_type: PropertyType,

        /// Boundary as JSON: [[lng,lat],[lng,lat],...]
        #[arg(long)]
        coords: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Update a property
    Update {
        #[arg(long)]
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long = "type")]
        property_type: Option<PropertyType>,

        #[arg(long)]
        description: Option<String>,

        /// New boundary as JSON; area and perimeter are recomputed
        #[arg(long)]
        coords: Option<String>,
    },

    /// Delete a property
    Delete {
        #[arg(long)]
        id: String,
    },

    /// Show the geospatial analysis of a property
    Analysis {
        #[arg(long)]
        id: String,
    },

    /// Generate a PDF report for one or more properties
    Report {
        /// Property id (repeatable)
        #[arg(long = "id", required_unless_present = "all", conflicts_with = "all")]
        ids: Vec<String>,

        /// Report on every registered property
        #[arg(long)]
        all: bool,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Print analysis notifications until Ctrl-C
    Listen,

    /// Show the user and expiry of the configured token
    Whoami,

    /// Compute area and perimeter of a boundary
    Metrics {
        /// Boundary as JSON: [[lng,lat],[lng,lat],...]
        #[arg(long)]
        coords: String,
    },
}

/// Exécute une commande
pub async fn run(command: Commands, config: &ClientConfig) -> Result<()> {
    match command {
        Commands::Import {
            file,
            dry_run,
            geojson,
            report,
        } => cmd_import(config, &file, dry_run, geojson.as_deref(), report.as_deref()).await,
        Commands::List { geojson } => cmd_list(config, geojson.as_deref()).await,
        Commands::Create {
            name,
            property_type,
            coords,
            description,
        } => cmd_create(config, name, property_type, &coords, description).await,
        Commands::Update {
            id,
            name,
            property_type,
            description,
            coords,
        } => {
            let update = PropertyUpdate {
                name,
                property_type,
                description,
                ..Default::default()
            };
            cmd_update(config, &id, update, coords.as_deref()).await
        }
        Commands::Delete { id } => cmd_delete(config, &id).await,
        Commands::Analysis { id } => cmd_analysis(config, &id).await,
        Commands::Report { ids, all, output } => cmd_report(config, &ids, all, &output).await,
        Commands::Listen => cmd_listen(config).await,
        Commands::Whoami => cmd_whoami(config),
        Commands::Metrics { coords } => cmd_metrics(&coords),
    }
}

fn auth_token(config: &ClientConfig) -> Result<AuthToken> {
    AuthToken::from_option(config.token.as_deref())
        .context("A valid token is required (--token or RURAL_TOKEN)")
}

fn api_client(config: &ClientConfig) -> Result<ApiClient> {
    let token = auth_token(config)?;
    Ok(ApiClient::new(&config.api_base_url, token)?)
}

fn parse_coords(raw: &str) -> Result<Vec<Coordinate>> {
    serde_json::from_str(raw).context("Coordinates must be a JSON array of [lng, lat] pairs")
}

/// Exécute la commande import
pub async fn cmd_import(
    config: &ClientConfig,
    file: &Path,
    dry_run: bool,
    geojson_path: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<()> {
    let start = Instant::now();
    let source = file.display().to_string();

    info!(file = %source, dry_run, "Starting CSV import");

    let batch = match rural_csv::parse_file(file) {
        Ok(batch) => batch,
        Err(e) => {
            let mut report = ImportReport::failed(&source, &e);
            report.set_duration(start.elapsed());
            report.display();
            if let Some(path) = report_path {
                report.save_to_file(path)?;
            }
            return Err(e).context("CSV import aborted");
        }
    };

    if !batch.is_clean() {
        warn!(rejected = batch.errors.len(), "Some rows were rejected");
    }

    let mut report = ImportReport::from_batch(&source, &batch);

    if let Some(path) = geojson_path {
        geojson::export_records(&batch.records, path)?;
        println!("GeoJSON written to {}", path.display());
    }

    if dry_run {
        println!("Dry run: nothing submitted");
    } else {
        let mut dashboard = Dashboard::new(api_client(config)?, config.channel.clone());
        dashboard.stage(batch);
        let imported = dashboard.submit_import().await?;
        report.record_submission(imported);
        println!("✅ {} propriedades importadas com sucesso!", imported);
    }

    report.set_duration(start.elapsed());
    report.display();

    if let Some(path) = report_path {
        report.save_to_file(path)?;
        println!("Report saved to {}", path.display());
    }

    info!("{}", report.summary());
    Ok(())
}

/// Exécute la commande list
pub async fn cmd_list(config: &ClientConfig, geojson_path: Option<&Path>) -> Result<()> {
    let mut dashboard = Dashboard::new(api_client(config)?, config.channel.clone());
    dashboard.refresh().await?;

    let state = dashboard.state();
    if state.properties().is_empty() {
        println!("Nenhuma propriedade cadastrada");
    }

    for p in state.properties() {
        println!(
            "{}  {} ({})  {:.2} ha  {:.0} m  {}",
            p.id,
            p.name,
            p.property_type.label(),
            p.area,
            p.perimeter,
            p.analysis_status.badge()
        );
    }

    let stats = state.stats();
    println!(
        "\nTotal: {} propriedades, {:.2} ha, {:.2} km",
        stats.total_properties, stats.total_area, stats.total_perimeter_km
    );

    if let Some(path) = geojson_path {
        geojson::export_properties(state.properties(), path)?;
        println!("GeoJSON written to {}", path.display());
    }

    Ok(())
}

/// Exécute la commande create
pub async fn cmd_create(
    config: &ClientConfig,
    name: String,
    property_type: PropertyType,
    coords: &str,
    description: Option<String>,
) -> Result<()> {
    let coords = parse_coords(coords)?;
    let Some(m) = metrics::compute(&coords) else {
        bail!("A boundary needs at least 3 vertices");
    };

    let record = PropertyRecord {
        name,
        property_type,
        description: description.filter(|d| !d.trim().is_empty()),
        area: m.area_hectares,
        perimeter: m.perimeter_meters,
        coordinates: m.coordinates,
    };

    let mut dashboard = Dashboard::new(api_client(config)?, config.channel.clone());
    let property = dashboard.create_property(&record).await?;

    println!("✅ Propriedade salva: {} ({})", property.name, property.id);
    println!("   Tipo: {}", property.property_type.label());
    println!("   Área: {} hectares", property.area);
    println!("   Perímetro: {} metros", property.perimeter);
    Ok(())
}

/// Exécute la commande update
pub async fn cmd_update(
    config: &ClientConfig,
    id: &str,
    update: PropertyUpdate,
    coords: Option<&str>,
) -> Result<()> {
    let update = match coords {
        Some(raw) => {
            let coords = parse_coords(raw)?;
            update
                .with_coordinates(&coords)
                .context("A boundary needs at least 3 vertices")?
        }
        None => update,
    };

    if update.is_empty() {
        bail!("Nothing to update: pass --name, --type, --description or --coords");
    }

    let mut dashboard = Dashboard::new(api_client(config)?, config.channel.clone());
    let property = dashboard.update_property(id, &update).await?;
    println!("✅ Propriedade atualizada: {} ({})", property.name, property.id);
    Ok(())
}

/// Exécute la commande delete
pub async fn cmd_delete(config: &ClientConfig, id: &str) -> Result<()> {
    let mut dashboard = Dashboard::new(api_client(config)?, config.channel.clone());
    dashboard.delete_property(id).await?;
    println!("Propriedade excluída: {}", id);
    Ok(())
}

/// Exécute la commande analysis
pub async fn cmd_analysis(config: &ClientConfig, id: &str) -> Result<()> {
    let api = api_client(config)?;
    let analysis = api
        .get_analysis(id)
        .await
        .context("Erro ao carregar análise")?;
    print!("{}", render_analysis(&analysis));
    Ok(())
}

fn fmt_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
}

fn render_analysis(response: &AnalysisResponse) -> String {
    let mut out = format!("Análise Geoespacial - {}\n", response.property_id);

    let Some(results) = &response.analysis.analysis_results else {
        out.push_str("Dados de análise não disponíveis\n");
        return out;
    };

    if let Some(e) = &results.elevation {
        out.push_str(&format!(
            "\n🏔️ Elevação\n  Média: {}m  Máxima: {}m  Mínima: {}m\n",
            fmt_value(e.avg_elevation),
            fmt_value(e.max_elevation),
            fmt_value(e.min_elevation)
        ));
    }
    if let Some(n) = &results.ndvi {
        out.push_str(&format!(
            "\n🌱 Vegetação (NDVI)\n  NDVI médio: {}  Cobertura: {}%  Classificação: {}\n",
            fmt_value(n.avg_ndvi),
            fmt_value(n.vegetation_coverage),
            n.classification.as_deref().unwrap_or("-")
        ));
    }
    if let Some(s) = &results.slope {
        out.push_str(&format!(
            "\n📐 Declividade\n  Inclinação média: {}°  Máxima: {}°  Classificação: {}\n",
            fmt_value(s.avg_slope),
            fmt_value(s.max_slope),
            s.slope_classification.as_deref().unwrap_or("-")
        ));
    }
    if let Some(w) = &results.weather {
        out.push_str(&format!(
            "\n🌤️ Clima\n  Chuva anual: {}mm  Temperatura: {}°C  Zona climática: {}\n",
            fmt_value(w.annual_rainfall),
            fmt_value(w.avg_temperature),
            w.climate_zone.as_deref().unwrap_or("-")
        ));
    }
    if let Some(at) = response.analysis.completed_at {
        out.push_str(&format!("\nAnálise concluída em: {}\n", at.format("%d/%m/%Y")));
    }

    out
}

/// Exécute la commande report
pub async fn cmd_report(
    config: &ClientConfig,
    ids: &[String],
    all: bool,
    output: &Path,
) -> Result<()> {
    let mut dashboard = Dashboard::new(api_client(config)?, config.channel.clone());

    let ids = if all {
        dashboard.refresh().await?;
        dashboard.select_all()
    } else {
        ids.to_vec()
    };

    if ids.is_empty() {
        bail!("Selecione pelo menos uma propriedade");
    }

    std::fs::create_dir_all(output)
        .context(format!("Failed to create directory: {}", output.display()))?;

    let report = dashboard
        .api()
        .generate_report(&ids)
        .await
        .context("Erro ao gerar relatório")?;
    let path = report.save_to(output)?;

    println!("Relatório PDF gerado: {}", path.display());
    Ok(())
}

/// Exécute la commande listen
pub async fn cmd_listen(config: &ClientConfig) -> Result<()> {
    let mut dashboard = Dashboard::new(api_client(config)?, config.channel.clone());

    // La liste sert à marquer les propriétés notifiées; le canal reste utile sans elle
    if let Err(e) = dashboard.refresh().await {
        warn!(error = %e, "Could not load properties");
    }

    dashboard.connect_notifications(&config.websocket_url)?;
    let mut states = dashboard.notifications().subscribe_state();

    println!("Listening for analysis notifications (Ctrl-C to stop)");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            toast = dashboard.next_toast() => match toast {
                Some(toast) => println!("{}", toast),
                None => break,
            },
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                info!(?state, "Notification channel state");
            }
            _ = &mut ctrl_c => break,
        }
    }

    dashboard.close();
    Ok(())
}

/// Exécute la commande whoami
pub fn cmd_whoami(config: &ClientConfig) -> Result<()> {
    let token = auth_token(config)?;
    let user = token.user_info();

    println!("[{}] {}", user.initial(), user.username);
    if let Some(email) = &user.email {
        println!("Email: {}", email);
    }
    if let Some(name) = &user.name {
        println!("Name: {}", name);
    }
    match token.expires_at() {
        Some(at) if token.is_valid() => println!("Expires: {}", at),
        Some(at) => println!("Expired: {}", at),
        None => println!("Expires: unknown"),
    }
    Ok(())
}

/// Exécute la commande metrics
pub fn cmd_metrics(coords: &str) -> Result<()> {
    let coords = parse_coords(coords)?;
    let Some(m) = metrics::compute(&coords) else {
        bail!("A boundary needs at least 3 vertices");
    };

    println!("Área: {:.2} hectares", m.area_hectares);
    println!("Perímetro: {:.0} metros", m.perimeter_meters);
    println!("Vértices: {}", m.coordinates.len() - 1);
    Ok(())
}
