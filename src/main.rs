// src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use pkgtools::{Database, Options, Package, Walk};
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "pkgtools")]
#[command(author, version, about = "Local package registry: install, remove and query packages", long_about = None)]
struct Cli {
    /// Set alternative installation root
    #[arg(short, long, global = true, default_value = "/")]
    root: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install packages from archives (gzip/bzip2/xz tar)
    Install {
        /// Package archive paths (name[#version].ext1.ext2)
        #[arg(required = true)]
        packages: Vec<PathBuf>,

        /// Override filesystem checks and force installation
        #[arg(short, long)]
        force: bool,
    },
    /// Remove installed packages
    Remove {
        /// Package names
        #[arg(required = true)]
        packages: Vec<String>,

        /// Also remove symlinks and prune empty directories
        #[arg(short, long)]
        force: bool,
    },
    /// Show which packages own the given files
    Owner {
        /// Files to look up
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List installed packages
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // -v raises the default log level; RUST_LOG still wins when set
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Install { packages, force } => {
            let mut db = Database::new(&cli.root)?;
            db.load()?;

            let opts = Options { force };
            for path in packages {
                info!("installing {}", path.display());
                let pkg = Package::from_archive(&db, &path)?;
                let name = pkg.manifest_name();
                if let Err(e) = db.install(pkg, opts) {
                    eprintln!("not installed {}", path.display());
                    return Err(e.into());
                }
                println!("installed {name}");
            }
            Ok(())
        }
        Commands::Remove { packages, force } => {
            let mut db = Database::new(&cli.root)?;
            db.load()?;

            let opts = Options { force };
            for name in packages {
                if db.remove(&name, opts)? {
                    println!("removed {name}");
                } else {
                    println!("{name} is not installed");
                }
            }
            Ok(())
        }
        Commands::Owner { files } => {
            let mut db = Database::new(&cli.root)?;
            db.load()?;

            for file in files {
                let path = fs::canonicalize(&file)?;
                for pkg in db.owners(&path)? {
                    println!("{} is owned by {}", path.display(), pkg.name);
                }
            }
            Ok(())
        }
        Commands::List => {
            let mut db = Database::new(&cli.root)?;
            db.load()?;

            db.walk(|pkg| {
                match &pkg.version {
                    Some(version) => println!("{}#{} ({} files)", pkg.name, version, pkg.entries.len()),
                    None => println!("{} ({} files)", pkg.name, pkg.entries.len()),
                }
                Ok(Walk::Continue)
            })?;
            Ok(())
        }
    }
}
