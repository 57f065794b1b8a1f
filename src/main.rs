// Entry point and high-level CLI flow.
//
// - Option [1] loads and tidies the pollutant CSVs, printing diagnostics.
// - Option [2] generates the regional score reports and a JSON summary.
// - Option [3] shows the dashboard for one city.
// - Option [4] summarizes the soil pollution survey, with an optional
//   per-institution breakdown of one region.
// - Option [5] re-reads the pollutant CSVs, bypassing the cache.
// - After each report the user can go back to the menu or exit.
use air_quality_report::cache::TidyCache;
use air_quality_report::config::Config;
use air_quality_report::loader::LoadOutcome;
use air_quality_report::query::{self, Selection};
use air_quality_report::{output, reports, scoring, soil, util};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "air_quality_report")]
#[command(about = "Tidy and score monthly city air-quality tables", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

// The loaded table lives in the cache; `data` is the snapshot the menu works on.
struct App {
    config: Config,
    cache: TidyCache,
    data: Option<Arc<LoadOutcome>>,
}

/// Read a single line of input after printing `prompt`.
fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    read_line("Enter choice: ")
}

/// Ask the user whether to go back to the report selection menu.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        let resp = read_line("Back to Report Selection (Y/N): ").to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Let the user pick one entry of `options` by number.
fn pick(title: &str, options: &[String]) -> Option<String> {
    println!("{}", title);
    for (i, o) in options.iter().enumerate() {
        println!("[{}] {}", i + 1, o);
    }
    let idx: usize = read_choice().parse().ok()?;
    options.get(idx.checked_sub(1)?).cloned()
}

impl App {
    /// Handle options [1] and [5]: load the tidy table, reusing the cached
    /// snapshot unless `reload` asks for a fresh read from disk.
    fn handle_load(&mut self, reload: bool) {
        let sources = self.config.resolved_sources();
        let loaded = if reload {
            self.cache.refresh(&sources, &self.config.schema)
        } else {
            self.cache.get_or_load(&sources, &self.config.schema)
        };
        match loaded {
            Ok(outcome) => {
                let report = &outcome.report;
                println!(
                    "Processing dataset... ({} files read, {} long-form rows)",
                    report.files_read,
                    util::format_int(outcome.table.len())
                );
                println!(
                    "Note: {} total rows dropped, {} cells missing or non-numeric.",
                    util::format_int(report.total_rows_dropped),
                    util::format_int(report.missing_values)
                );
                for m in &report.missing_sources {
                    println!("Warning: file not found for {}: {}", m.pollutant, m.path.display());
                }
                println!();
                self.data = Some(outcome);
            }
            Err(e) => {
                eprintln!("Failed to load files: {}\n", e);
            }
        }
    }

    fn loaded(&self) -> Option<Arc<LoadOutcome>> {
        if self.data.is_none() {
            println!("Error: No data loaded. Please load the CSV files first (option 1).\n");
        }
        self.data.clone()
    }

    /// Handle option [2]: regional scores for the latest month, the tidy
    /// table export and the JSON summary.
    fn handle_generate_reports(&self) -> Result<()> {
        let Some(data) = self.loaded() else {
            return Ok(());
        };
        let table = &data.table;
        let Some(month) = query::latest_month(table) else {
            println!("(no months in data)\n");
            return Ok(());
        };

        println!("Generating reports...");
        println!("Outputs saved to individual files...\n");

        let scores = scoring::scores_by_region(table, month, self.config.strategy);
        let rows = reports::regional_score_rows(&scores);
        let file1 = self.config.output_path("report1_regional_scores.csv");
        output::write_csv(&file1, &rows)?;
        output::preview_table(
            1,
            "Regional Air Quality Scores",
            Some(format!("{}, {:?} scoring", month, self.config.strategy).as_str()),
            &rows,
            self.config.preview_rows,
        );
        println!("(Full table exported to {})\n", file1.display());

        let map = reports::score_map(&scores, None);
        let file2 = self.config.output_path("report2_score_map.json");
        output::write_json(&file2, &map)?;
        println!(
            "Report 2: Map markers for {} regions exported to {}\n",
            map.markers.len(),
            file2.display()
        );

        let file3 = self.config.output_path("report3_tidy_table.csv");
        output::write_csv(&file3, table.records())?;
        println!(
            "Report 3: Tidy table ({} rows) exported to {}\n",
            util::format_int(table.len()),
            file3.display()
        );

        let summary = reports::generate_summary(&data);
        output::write_json(&self.config.output_path("summary.json"), &summary)?;
        println!("Summary Stats (summary.json):");
        println!(
            "{{\"total_records\": {}, \"provinces\": {}, \"cities\": {}}}\n",
            util::format_int(summary.total_records),
            summary.total_provinces,
            summary.total_cities
        );
        Ok(())
    }

    /// Handle option [3]: the single-city dashboard.
    fn handle_city_dashboard(&self) -> Result<()> {
        let Some(data) = self.loaded() else {
            return Ok(());
        };
        let table = &data.table;
        let Some(province) = pick("Select province:", &query::provinces(table)) else {
            println!("Invalid choice.\n");
            return Ok(());
        };
        let Some(city) = pick("Select city:", &query::cities(table, &province)) else {
            println!("Invalid choice.\n");
            return Ok(());
        };

        let selection = Selection::city(province, city).with_pollutants(query::pollutants(table));
        let summary = match query::city_summary(table, &selection, self.config.strategy) {
            Ok(s) => s,
            Err(e) => {
                println!("{}\n", e);
                return Ok(());
            }
        };
        let title = format!(
            "{} {} Air Quality",
            summary.selection.province.as_deref().unwrap_or_default(),
            summary.selection.city.as_deref().unwrap_or_default()
        );
        let rows = reports::city_score_rows(&summary);
        output::preview_table(5, &title, Some("score out of 100"), &rows, rows.len());

        let records = query::filter(table, &selection);
        let pivot = reports::pivot_rows(&query::pivot_by_month(&records));
        let file = self.config.output_path("report5_city_monthly.csv");
        output::write_csv(&file, &pivot)?;
        output::preview_table_rows(&pivot, self.config.preview_rows);
        println!("(Full table exported to {})\n", file.display());
        Ok(())
    }

    /// Handle option [4]: soil survey means per region, then optionally the
    /// per-institution breakdown of one region.
    fn handle_soil(&self) -> Result<()> {
        let path = self.config.soil_path();
        let table = soil::load_soil(&path, &self.config.soil.schema)
            .with_context(|| format!("loading soil survey {}", path.display()))?;
        let means = soil::mean_by_region(&table);

        let (headers, rows) = reports::soil_mean_records(&table, &means, "region");
        let file = self.config.output_path("report6_soil_regional_means.csv");
        output::write_records(&file, &headers, &rows)?;
        println!("Report 6: Soil Pollution Means by Region\n");
        output::preview_records(&headers, &rows, self.config.preview_rows);
        println!("(Full table exported to {})\n", file.display());

        let regions: Vec<String> = means.iter().map(|m| m.name.clone()).collect();
        let selected = pick("Select region for details (any other input skips):", &regions);
        if let Some(region) = selected.as_deref() {
            let (headers, rows) = reports::soil_institution_records(&table, region);
            let file = self.config.output_path("report7_soil_institution_means.csv");
            output::write_records(&file, &headers, &rows)?;
            println!("Report 7: {} Soil Pollution by Institution\n", region);
            output::preview_records(&headers, &rows, rows.len());
            println!("(Full table exported to {})\n", file.display());
        }

        let map = reports::soil_map(
            &table,
            &means,
            &self.config.soil.color_metric,
            selected.as_deref(),
        );
        let map_file = self.config.output_path("report6_soil_map.json");
        output::write_json(&map_file, &map)?;
        println!("Soil map markers exported to {}\n", map_file.display());
        Ok(())
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("reading configuration")?;
    info!(strategy = ?config.strategy, sources = config.sources.len(), "Starting");

    let mut app = App {
        config,
        cache: TidyCache::new(),
        data: None,
    };

    loop {
        println!("Select an option:");
        println!("[1] Load the files");
        println!("[2] Generate Reports");
        println!("[3] City Dashboard");
        println!("[4] Soil Survey");
        println!("[5] Reload the files\n");
        let choice = read_choice();
        let result = match choice.as_str() {
            "1" | "5" => {
                app.handle_load(choice == "5");
                continue;
            }
            "2" => app.handle_generate_reports(),
            "3" => app.handle_city_dashboard(),
            "4" => app.handle_soil(),
            _ => {
                println!("Invalid choice. Please enter a number from 1 to 5.\n");
                continue;
            }
        };
        if let Err(e) = result {
            error!(error = %e, "Report failed");
            eprintln!("Report failed: {:#}\n", e);
        }
        if !prompt_back_to_menu() {
            println!("Exiting the program.");
            break;
        }
    }
    Ok(())
}
