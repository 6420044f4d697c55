use anyhow::Result;
use clap::{Parser, Subcommand};
use shared::{AllergenStatus, BabyActivityType};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use allergy_tracker::{open_store, TrackerStore};

#[derive(Parser)]
#[command(name = "allergy-tracker", version, about = "Allergen introduction and baby care tracker")]
struct Cli {
    /// Data directory (defaults to $ALLERGY_TRACKER_DATA_DIR or ~/Documents/Allergy Tracker)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and seed the allergen catalog
    Init,
    /// Show the status of every root allergen
    Status {
        /// Also list each sub-item
        #[arg(long)]
        sub_items: bool,
    },
    /// Today's activity summary
    Today,
    /// Print every record as JSON, or write it into a directory
    Export {
        #[arg(long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let store = open_store(cli.data_dir.as_deref())?;
    store.initialize().await?;

    let result = match cli.command {
        Commands::Init => {
            info!("Data directory ready at {:?}", store.connection().base_directory());
            println!("{}", store.connection().base_directory().display());
            Ok(())
        }
        Commands::Status { sub_items } => print_status(&store, sub_items),
        Commands::Today => print_today(&store),
        Commands::Export { output } => export(&store, output.as_deref()),
    };

    store.shutdown().await;
    result
}

fn status_label(status: AllergenStatus) -> &'static str {
    match status {
        AllergenStatus::Safe => "safe",
        AllergenStatus::Testing => "testing",
        AllergenStatus::Reaction => "REACTION",
    }
}

fn print_status(store: &TrackerStore, with_sub_items: bool) -> Result<()> {
    let snapshot = store.snapshot()?;
    let view = snapshot.status_view();

    for root in view.root_allergens() {
        println!(
            "{:<20} {:<9} {} trials",
            view.allergen_label(&root.id),
            status_label(view.status_of(&root.id)),
            view.trial_count_of(&root.id)
        );

        if with_sub_items {
            for sub_item in view.sub_items_of(&root.id) {
                println!(
                    "    {:<16} {:<9} {} trials",
                    sub_item.name,
                    status_label(view.status_of(&sub_item.id)),
                    view.trial_count_of(&sub_item.id)
                );
            }
        }
    }
    Ok(())
}

fn print_today(store: &TrackerStore) -> Result<()> {
    let summary = store.todays_activity_summary()?;
    for activity_type in BabyActivityType::ALL {
        println!("{:<6} {}", activity_type, summary.count(activity_type));
    }

    if let Some(sleep) = store.last_sleep()? {
        println!("last sleep: {}", sleep.timestamp.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"));
    }
    if let Some(feed) = store.last_activity_of_type(BabyActivityType::Feed)? {
        println!("last feed:  {}", feed.timestamp.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

fn export(store: &TrackerStore, output: Option<&str>) -> Result<()> {
    let export = store.export_all_data()?;
    let service = store.export_service();

    match output {
        Some(directory) => {
            let path = service.export_to_path(&export, directory)?;
            println!("{}", path.display());
        }
        None => println!("{}", service.to_json(&export)?),
    }
    Ok(())
}
