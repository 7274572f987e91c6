//! CLI mode
//!
//! `report` 在终端输出看板摘要，`config generate` 生成示例配置。

use colored::Colorize;

use crate::cli::{Commands, ConfigCommands, ReportArgs};
use crate::config::{StaticConfig, get_config};
use crate::errors::{FunnelError, Result};
use crate::runtime::lifetime;
use crate::services::{DashboardQuery, DashboardView};

const DEFAULT_SAMPLE_PATH: &str = "config.example.toml";

/// Run a non-server command
pub async fn run_cli(command: Commands) -> Result<()> {
    match command {
        Commands::Report(args) => run_report(args).await,
        Commands::Config {
            action: ConfigCommands::Generate { output_path, force },
        } => generate_config(output_path, force),
        // main 负责分发 Serve
        Commands::Serve => Err(FunnelError::internal(
            "serve is not a CLI command".to_string(),
        )),
    }
}

impl From<ReportArgs> for DashboardQuery {
    fn from(args: ReportArgs) -> Self {
        DashboardQuery {
            from: args.from,
            to: args.to,
            code: args.code,
            limit: args.limit,
            ..Default::default()
        }
    }
}

async fn run_report(args: ReportArgs) -> Result<()> {
    let as_json = args.json;
    let query = DashboardQuery::from(args);

    let config = get_config();
    let service = lifetime::startup::build_dashboard_service(&config)
        .await
        .map_err(|e| FunnelError::datastore_config(format!("{:#}", e)))?;

    let view = service.dashboard(&query).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_report(&view);
    }
    Ok(())
}

fn print_report(view: &DashboardView) {
    let m = &view.metrics;
    let c = &view.completion;

    println!("{}", "Funnel report".bold().magenta());
    println!(
        "  {} {}",
        "Generated at:".dimmed(),
        view.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();

    let rows = [
        ("Unique codes", m.unique_codes.to_string()),
        ("Code opens", m.total_opens.to_string()),
        ("Input events", m.total_input_events.to_string()),
        ("Fields filled", m.total_fields_filled.to_string()),
        ("Submissions", m.total_submissions.to_string()),
        ("Discount codes", m.total_discounts.to_string()),
        ("Referral codes", m.total_referrals.to_string()),
        ("Opens (recent)", m.recent_opens.to_string()),
    ];
    for (label, value) in rows {
        println!("  {:<18} {}", label, value.cyan());
    }
    println!();

    println!("{}", "Conversion:".bold());
    println!(
        "  {:<18} {}%",
        "Open -> filled",
        m.rates.open_to_filled_rate.green()
    );
    println!(
        "  {:<18} {}%",
        "Filled -> submit",
        m.rates.filled_to_submit_rate.green()
    );
    println!(
        "  {:<18} {}% ({} / {} codes)",
        "Completion",
        c.rate_percent.green(),
        c.success_codes_count,
        c.opened_codes_count
    );

    if !m.top_codes.is_empty() {
        println!();
        println!("{}", "Most active codes:".bold());
        for entry in &m.top_codes {
            println!(
                "  {} {}",
                entry.code.cyan(),
                format!("({} events)", entry.count).dimmed()
            );
        }
    }

    let failures = dataset_failures(view);
    if !failures.is_empty() {
        println!();
        for (dataset, message) in failures {
            println!(
                "{} {} {}",
                "Dataset error:".red().bold(),
                dataset.yellow(),
                message.white()
            );
        }
    }
}

fn dataset_failures(view: &DashboardView) -> Vec<(&'static str, &str)> {
    let e = &view.errors;
    [
        ("discounts", e.discounts.as_deref()),
        ("referrals", e.referrals.as_deref()),
        ("opens", e.opens.as_deref()),
        ("input_events", e.input_events.as_deref()),
        ("fields_filled", e.fields_filled.as_deref()),
        ("submissions", e.submissions.as_deref()),
    ]
    .into_iter()
    .filter_map(|(name, msg)| msg.map(|m| (name, m)))
    .collect()
}

/// Generate example configuration file
fn generate_config(output_path: Option<String>, force: bool) -> Result<()> {
    let path = output_path.unwrap_or_else(|| DEFAULT_SAMPLE_PATH.to_string());

    if std::path::Path::new(&path).exists() && !force {
        return Err(FunnelError::validation(format!(
            "{} already exists, use --force to overwrite",
            path
        )));
    }

    println!(
        "{} {}",
        "Generating configuration file...".yellow(),
        path.blue()
    );

    match StaticConfig::default().save_to_file(&path) {
        Ok(()) => {
            println!(
                "  {} {}",
                "Configuration file generated successfully".green(),
                path.blue()
            );
            println!(
                "  {}",
                "Fill in [datastore] url / service_key before starting the server".yellow()
            );
            Ok(())
        }
        Err(e) => {
            println!(
                "  {} {}",
                "Failed to generate configuration file".red(),
                e.to_string().red()
            );
            Err(FunnelError::internal(format!(
                "Unable to write configuration file: {}",
                e
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_config_writes_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("funnelboard.toml");
        let path_str = path.to_string_lossy().to_string();

        generate_config(Some(path_str.clone()), false).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[datastore]"));
        assert!(content.contains("[dashboard]"));

        // 已存在且未指定 --force
        let err = generate_config(Some(path_str.clone()), false).unwrap_err();
        assert!(matches!(err, FunnelError::Validation(_)));
        assert!(generate_config(Some(path_str), true).is_ok());
    }

    #[test]
    fn test_report_args_become_dashboard_query() {
        let query = DashboardQuery::from(ReportArgs {
            from: Some("2024-03-01".to_string()),
            code: Some("VIP".to_string()),
            limit: Some(10),
            json: true,
            ..Default::default()
        });
        assert_eq!(query.from.as_deref(), Some("2024-03-01"));
        assert_eq!(query.to, None);
        assert_eq!(query.code.as_deref(), Some("VIP"));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.opens_filter, None);
    }
}
