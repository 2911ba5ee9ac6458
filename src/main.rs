//! rowpipe CLI - thin caller over the streaming pipeline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::PathBuf;

use rowpipe::concurrent::fetch_users_concurrently;
use rowpipe::pipeline::Pipeline;
use rowpipe::row::UserRow;
use rowpipe::source::{SourceConfig, UserTable};

/// Memory-bounded streaming over the user_data table
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Data directory
    #[arg(short = 'D', long, default_value = "./rowpipe_data")]
    data_dir: PathBuf,

    /// Table name
    #[arg(long, default_value = "user_data")]
    table: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the table and load rows into it
    Seed {
        /// CSV file with user_id,name,email,age columns
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Number of generated sample users when no CSV is given
        #[arg(long, default_value = "50")]
        rows: usize,
    },
    /// Print rows one at a time
    Stream {
        /// Stop after this many rows
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print rows in fixed-size batches
    Batches {
        #[arg(short, long, default_value = "10")]
        batch_size: usize,
    },
    /// Print rows older than a cutoff, streamed in batches
    Filter {
        #[arg(short, long, default_value = "10")]
        batch_size: usize,

        /// Keep rows with age strictly above this
        #[arg(long, default_value = "25")]
        min_age: u32,
    },
    /// Print the table page by page
    Pages {
        #[arg(short, long, default_value = "10")]
        page_size: usize,
    },
    /// Average age over a single streamed column
    Average,
    /// Fetch all users and users 40+ concurrently
    Concurrent,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = SourceConfig::new(&args.data_dir).with_table(&args.table);

    match args.command {
        Command::Seed { csv, rows } => {
            let table = UserTable::create(&config).context("Failed to create table")?;
            let report = match csv {
                Some(path) => table.load_csv(&path).context("Failed to load CSV")?,
                None => table
                    .insert_many(generate_users(rows))
                    .context("Failed to insert generated users")?,
            };
            println!(
                "{} inserted, {} duplicates skipped, {} invalid skipped",
                report.inserted, report.duplicates, report.invalid
            );
        }
        command => {
            let table = UserTable::open(&config)
                .context("Failed to open table (run `rowpipe seed` first)")?;
            run_query(command, table, &config).await?;
        }
    }

    Ok(())
}

async fn run_query(command: Command, table: UserTable, config: &SourceConfig) -> Result<()> {
    let pipeline = Pipeline::new(table);
    match command {
        Command::Seed { .. } => unreachable!("handled by caller"),
        Command::Stream { limit } => {
            let mut stream = pipeline.stream_rows()?;
            let mut printed = 0;
            for row in stream.by_ref() {
                print_row(&row?);
                printed += 1;
                if limit.is_some_and(|n| printed >= n) {
                    break;
                }
            }
            // Early break above still releases the cursor here.
            stream.close()?;
        }
        Command::Batches { batch_size } => {
            for (i, batch) in pipeline.stream_batches(batch_size)?.enumerate() {
                let batch = batch?;
                println!("-- batch {} ({} rows)", i, batch.len());
                for row in &batch {
                    print_row(row);
                }
            }
        }
        Command::Filter {
            batch_size,
            min_age,
        } => {
            let filtered = pipeline.filter_rows(move |row| row.age > min_age, batch_size)?;
            for row in filtered {
                print_row(&row?);
            }
        }
        Command::Pages { page_size } => {
            for page in pipeline.paginate(page_size)? {
                let page = page?;
                println!("-- page at offset {} ({} rows)", page.offset, page.len());
                for row in &page.rows {
                    print_row(row);
                }
            }
        }
        Command::Average => match pipeline.average_age()? {
            Some(average) => println!("Average age of users: {:.2}", average),
            None => println!("No users in table."),
        },
        Command::Concurrent => {
            let fetched = fetch_users_concurrently(config).await?;
            println!(
                "{} users total, {} aged 40+",
                fetched.all_users.len(),
                fetched.older_users.len()
            );
        }
    }
    Ok(())
}

fn print_row(row: &UserRow) {
    println!(
        "{}  {:<20} {:<28} {}",
        row.user_id, row.name, row.email, row.age
    );
}

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bob", "Charlie", "Diana", "Eve", "Frank", "Grace", "Henry", "Iris", "Jack", "Kate",
    "Liam", "Maya", "Noah", "Olivia",
];
const LAST_NAMES: &[&str] = &[
    "Johnson", "Smith", "Brown", "Prince", "Wilson", "Miller", "Lee", "Davis", "Chen", "Williams",
    "Patel", "Garcia", "Martinez",
];

/// Synthetic users for seeding without a CSV. Emails carry the index, so
/// repeated seeds of growing size stay idempotent on the overlap.
fn generate_users(n: usize) -> Vec<UserRow> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|i| {
            let first = FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Alex");
            let last = LAST_NAMES.choose(&mut rng).copied().unwrap_or("Doe");
            UserRow::new(
                String::new(), // generated on insert
                format!("{} {}", first, last),
                format!("{}.{}.{}@example.com", first.to_lowercase(), last.to_lowercase(), i),
                rng.gen_range(18..=70),
            )
        })
        .collect()
}
