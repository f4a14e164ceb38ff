use dnf_dbus::config::BusKind;
use dnf_dbus::dbus::{BusClient, DnfDbusClient, DnfPkg};
use dnf_dbus::error::Result;

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "dnf-dbus-query")]
#[command(about = "Query packages through the dk.rasmil.DnfDbus daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Talk to a daemon on the session bus
    #[arg(long)]
    session: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the daemon version
    Version,

    /// Stop the daemon
    Quit,

    /// List configured repositories
    Repos,

    /// Packages matching a name or glob pattern (e.g. "bash", "lib*ssl*")
    Key { pattern: String },

    /// installed, available or updates
    Filter {
        name: String,

        /// Show summary and size
        #[arg(short, long)]
        info: bool,

        /// Custom output format (supports %{name}, %{epoch}, %{version},
        /// %{release}, %{arch}, %{repo}, %{summary}, %{size}, %{nevra})
        #[arg(long)]
        queryformat: Option<String>,
    },

    /// One attribute of the packages matching a pattern
    Attr {
        pattern: String,

        /// Attribute name (description, summary, changelog, size, ...)
        attribute: String,

        /// Limit to one repository
        #[arg(short, long, default_value = "")]
        repo: String,
    },

    /// List comps categories
    Categories,

    /// List the groups of a category
    Groups { category: String },

    /// List the packages of a group
    GroupPackages { group: String },
}

fn format_querystring(fmt: &str, pkg: &DnfPkg) -> String {
    fmt.replace("%{name}", pkg.name())
        .replace("%{epoch}", pkg.epoch())
        .replace("%{version}", pkg.version())
        .replace("%{release}", pkg.release())
        .replace("%{arch}", pkg.arch())
        .replace("%{repo}", &pkg.repo)
        .replace("%{summary}", pkg.summary.as_deref().unwrap_or(""))
        .replace(
            "%{size}",
            &pkg.size.map(|s| s.to_string()).unwrap_or_default(),
        )
        .replace("%{nevra}", &pkg.to_string())
        .replace("\\n", "\n")
        .replace("\\t", "\t")
}

fn print_value(value: &Value) {
    match value {
        Value::String(s) => println!("{}", s),
        Value::Null => println!("(none)"),
        other => match serde_json::to_string_pretty(other) {
            Ok(text) => println!("{}", text),
            Err(_) => println!("{}", other),
        },
    }
}

fn main() -> Result<()> {
    // Restore default SIGPIPE handling so piping to head/grep etc. exits cleanly
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let bus = if cli.session {
        BusKind::Session
    } else {
        BusKind::System
    };
    let client = DnfDbusClient::new(BusClient::connect(bus)?);

    match cli.command {
        Commands::Version => println!("{}", client.version()?),
        Commands::Quit => client.quit()?,
        Commands::Repos => {
            for repo in client.get_repositories()? {
                let state = if repo.enabled { "enabled" } else { "disabled" };
                println!("{:<30} {:<50} {}", repo.id, repo.name, state);
            }
        }
        Commands::Key { pattern } => {
            let pkgs = client.get_packages_by_key(&pattern)?;
            if pkgs.is_empty() {
                println!("No packages found matching '{}'", pattern);
            }
            for pkg in pkgs {
                println!("{:<60} {}", pkg, pkg.repo);
            }
        }
        Commands::Filter {
            name,
            info,
            queryformat,
        } => {
            let extra = info || queryformat.is_some();
            let pkgs = client.get_packages_by_filter(&name, extra)?;
            if let Some(fmt) = queryformat {
                for pkg in &pkgs {
                    print!("{}", format_querystring(&fmt, pkg));
                }
            } else if info {
                for pkg in &pkgs {
                    println!("Name        : {}", pkg.name());
                    println!("Epoch       : {}", pkg.epoch());
                    println!("Version     : {}", pkg.version());
                    println!("Release     : {}", pkg.release());
                    println!("Arch        : {}", pkg.arch());
                    println!("Size        : {}", pkg.size.unwrap_or(0));
                    println!("Repo        : {}", pkg.repo);
                    println!("Summary     : {}", pkg.summary.as_deref().unwrap_or(""));
                    println!();
                }
            } else {
                for pkg in &pkgs {
                    println!("{:<60} {}", pkg, pkg.repo);
                }
            }
        }
        Commands::Attr {
            pattern,
            attribute,
            repo,
        } => {
            let values = client.get_package_attribute(&pattern, &repo, &attribute)?;
            if values.is_empty() {
                println!("No packages found matching '{}'", pattern);
            }
            for (i, entry) in values.iter().enumerate() {
                if values.len() > 1 {
                    if i > 0 {
                        println!();
                    }
                    println!("# {} ({})", entry.pkg, entry.pkg.repo);
                }
                print_value(&entry.value);
            }
        }
        Commands::Categories => {
            for category in client.get_categories()? {
                println!("{:<30} {}", category.id, category.ui_name);
            }
        }
        Commands::Groups { category } => {
            for group in client.get_groups_by_category(&category)? {
                println!("{:<30} {}", group.id, group.ui_name);
            }
        }
        Commands::GroupPackages { group } => {
            for pkg in client.get_group_packages(&group)? {
                println!("{:<40} {}", pkg.name, pkg.option_type.as_str());
            }
        }
    }

    Ok(())
}
