use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use placement::auth::password::hash_password;
use placement::config::Config;
use placement::db::Database;
use placement::models::Role;
use placement::reports::Scope;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "placement")]
#[command(about = "College placement management - students, companies, offers and reports")]
struct Cli {
    /// Database path (overrides PLACEMENT_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides PLACEMENT_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage placement staff accounts
    Staff {
        #[command(subcommand)]
        command: StaffCommands,
    },

    /// Show placement statistics
    Stats {
        /// Restrict to one department (e.g. ISE)
        #[arg(short, long)]
        dept: Option<String>,
    },

    /// Show placement percentage per department
    Departments,
}

#[derive(Subcommand)]
enum StaffCommands {
    /// Add a staff account
    Add {
        /// Login email
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (Admin, Coordinator, HOD, TPO, or legacy "coordinator")
        #[arg(short, long)]
        role: Role,

        /// Department name, or ALL
        #[arg(short, long)]
        dept: Option<String>,

        /// Initial password
        #[arg(short, long)]
        password: String,
    },

    /// List staff accounts
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(path) = cli.db {
        config.database_path = path;
    }

    match cli.command {
        Commands::Init => {
            let db = Database::open_at(&config.database_path)?;
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            placement::serve(config).await?;
        }

        Commands::Staff { command } => {
            let db = Database::open_at(&config.database_path)?;
            db.ensure_initialized()?;
            match command {
                StaffCommands::Add {
                    email,
                    name,
                    role,
                    dept,
                    password,
                } => {
                    if matches!(role, Role::Hod) && dept.is_none() {
                        return Err(anyhow!("HOD accounts need --dept"));
                    }
                    let hash = hash_password(&password)?;
                    match db.add_staff(&email, &hash, &name, role, dept.as_deref())? {
                        Some(id) => println!("Added {} #{} ({})", role, id, email),
                        None => println!("An account with email {} already exists.", email),
                    }
                }

                StaffCommands::List => {
                    let staff = db.list_staff()?;
                    if staff.is_empty() {
                        println!("No staff accounts.");
                    } else {
                        println!("{:<6} {:<12} {:<24} {:<30} {:<8}", "ID", "ROLE", "NAME", "EMAIL", "DEPT");
                        println!("{}", "-".repeat(82));
                        for member in staff {
                            println!(
                                "{:<6} {:<12} {:<24} {:<30} {:<8}",
                                member.id,
                                member.role,
                                truncate(&member.name, 22),
                                truncate(&member.email, 28),
                                member.dept.unwrap_or_else(|| "-".to_string())
                            );
                        }
                    }
                }
            }
        }

        Commands::Stats { dept } => {
            let db = Database::open_at(&config.database_path)?;
            db.ensure_initialized()?;
            let scope = match dept {
                Some(d) => Scope::Department(d),
                None => Scope::Global,
            };
            let stats = db.statistics(&scope)?;

            match scope.dept() {
                Some(d) => println!("Placement statistics for {}", d),
                None => println!("Placement statistics (all departments)"),
            }
            println!("Students:        {}", stats.total_students);
            println!("Companies:       {}", stats.total_companies);
            println!("Applications:    {}", stats.total_applications);
            println!("Placed:          {}", stats.placed_students);
            println!("Unplaced:        {}", stats.unplaced_students);
            println!("Avg package:     {:.2} LPA", stats.avg_package);
            println!("Highest package: {:.2} LPA", stats.highest_package);
        }

        Commands::Departments => {
            let db = Database::open_at(&config.database_path)?;
            db.ensure_initialized()?;
            let rows = db.department_breakdown()?;

            println!("{:<8} {:>8} {:>8} {:>10} {:>12}", "DEPT", "TOTAL", "PLACED", "PLACED %", "AVG LPA");
            println!("{}", "-".repeat(50));
            for row in rows {
                let pct = row
                    .placement_percentage
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_else(|| "-".to_string());
                let avg = row
                    .avg_package
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<8} {:>8} {:>8} {:>10} {:>12}",
                    truncate(&row.dept, 8),
                    row.total_students,
                    row.placed_students,
                    pct,
                    avg
                );
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
