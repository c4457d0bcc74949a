// Entry point and interactive report flow.
//
// - Option [1] loads the fact CSV and prints what was accepted or rejected.
// - Option [2] builds every dimension's report, writes the files and prints
//   previews, then asks whether to go back to the menu.
use clap::Parser;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use ward_profile::config::AppConfig;
use ward_profile::dimensions::{all_dimensions, DimensionDefinition};
use ward_profile::loader::{self, FactTable};
use ward_profile::reports::{self, DimensionReport};
use ward_profile::{output, util, Result};

#[derive(Debug, Parser)]
#[command(about = "Ward-level profile reports from raw fact counts")]
struct Args {
    /// TOML configuration file (defaults to ward_profile.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,
}

// Loaded once per run so reports can be regenerated without re-reading.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { facts: None }));

struct AppState {
    facts: Option<FactTable>,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Returns `true` for `Y`, `false` for `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn handle_load(config: &AppConfig) {
    log::info!("Loading facts from {}", config.input_path.display());
    match loader::load_facts(&config.input_path) {
        Ok((facts, report)) => {
            println!(
                "Processing dataset... ({} rows read, {} loaded across {} dimensions)",
                util::format_int(report.total_rows),
                util::format_int(report.loaded_rows),
                report.dimensions
            );
            if report.rejected_rows > 0 {
                println!(
                    "Note: {} rows rejected due to invalid ward numbers or counts.",
                    util::format_int(report.rejected_rows)
                );
            }
            println!();
            state().facts = Some(facts);
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

fn write_dimension(
    dim: &DimensionDefinition,
    report: &DimensionReport,
    config: &AppConfig,
) -> Result<()> {
    let dir = &config.output_dir;
    let file = |suffix: &str| -> PathBuf { dir.join(format!("{}_{}", dim.name, suffix)) };

    let ranking = reports::ranking_rows(&report.top);
    let ranking_path = file("ranking.csv");
    output::write_csv(&ranking_path, &ranking)?;
    output::preview_table(
        &dim.title,
        Some(&format!("Top {} and {}", config.top_n, reports::OTHER_LABEL)),
        &ranking,
        config.preview_rows,
    );

    let wards = reports::ward_breakdown_rows(&report.aggregation);
    output::write_csv(&file("wards.csv"), &wards)?;
    output::preview_table(&format!("{} by Ward", dim.title), None, &wards, config.preview_rows);

    for (weights, indices) in dim.indices.iter().zip(&report.indices) {
        let rows = reports::index_rows(indices);
        output::write_csv(&file(&format!("{}.csv", weights.name())), &rows)?;
        output::preview_table(weights.name(), Some("ranked by score"), &rows, config.preview_rows);
    }

    if dim.is_bucketed() {
        let rows = reports::ward_flow_rows(&report.aggregation, &dim.registry);
        output::write_csv(&file("flows.csv"), &rows)?;
        output::preview_table(
            &format!("{} - Estimated Flows", dim.title),
            None,
            &rows,
            config.preview_rows,
        );
    }

    let summary = reports::generate_summary(dim, report);
    output::write_json(&file("summary.json"), &summary)?;
    for sentence in &report.narrative {
        println!("{}", sentence);
    }
    println!("(Full tables exported to {})\n", dir.display());
    Ok(())
}

fn generate_all(facts: &FactTable, config: &AppConfig) -> Result<()> {
    std::fs::create_dir_all(&config.output_dir)?;
    let dimensions = all_dimensions()?;

    for name in facts.keys() {
        if !dimensions.iter().any(|d| &d.name == name) {
            log::warn!("Skipping facts for unregistered dimension '{}'", name);
        }
    }

    for dim in &dimensions {
        let Some(dim_facts) = facts.get(&dim.name) else {
            log::debug!("No facts for '{}'", dim.name);
            continue;
        };
        log::info!("Building report for '{}' ({} facts)", dim.name, dim_facts.len());
        let report = match reports::build_report(dim, dim_facts, config.top_n) {
            Ok(r) => r,
            Err(e) => {
                log::error!("Skipping report for '{}': {}", dim.name, e);
                eprintln!("Report error for {}: {}", dim.name, e);
                continue;
            }
        };
        if let Err(e) = write_dimension(dim, &report, config) {
            eprintln!("Write error for {}: {}", dim.name, e);
        }
    }
    Ok(())
}

fn handle_generate_reports(config: &AppConfig) {
    let facts = state().facts.clone();
    let Some(facts) = facts else {
        println!("Error: No data loaded. Please load the fact file first (option 1).\n");
        return;
    };

    println!("Generating reports...");
    println!("Outputs saved to {}\n", config.output_dir.display());
    if let Err(e) = generate_all(&facts, config) {
        eprintln!("Report generation failed: {}\n", e);
    }
}

fn main() {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let args = Args::parse();

    let config = match AppConfig::resolve(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to read configuration: {}", e);
            std::process::exit(1);
        }
    };

    loop {
        println!("Ward Profile Reports");
        println!("[1] Load the fact file");
        println!("[2] Generate Reports\n");
        match read_choice().as_str() {
            "1" => handle_load(&config),
            "2" => {
                println!();
                handle_generate_reports(&config);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 1 or 2.\n"),
        }
    }
}
