//! CLI entry point for the QC station.
//!
//! Every role of the floor works from the same binary and database:
//!
//! - admins manage accounts (`user ...`)
//! - manufacturers define orders and their parameters (`order ...`)
//! - supervisors set acceptable ranges (`range set`)
//! - operators capture and commit measurements (`capture`)
//! - supervisors, manufacturers and admins read reports (`report`)
//!
//! # Usage
//!
//! ```bash
//! qc-station init-db
//! qc-station --user operator --password operator123 \
//!     capture --component Battery --part PN-100 --param Voltage --port COM3 --count 5
//! qc-station --user supervisor --password supervisor123 report --from 2025-04-01 --expand
//! ```

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use qc_station::auth;
use qc_station::capture::{
    AutoConfirm, CaptureSession, CommitOutcome, Confirm, PromptConfirm, Selection,
    ThresholdPolicy,
};
use qc_station::config::{StationConfig, DEFAULT_CONFIG_PATH};
use qc_station::instrument::mock::{SimulatedConnector, DEFAULT_SIMULATED_RANGE};
use qc_station::instrument::serial::{available_ports, SerialConnector};
use qc_station::instrument::{measure_command, Connector, LinkSettings};
use qc_station::logging;
use qc_station::model::{OrderDetails, Role, User};
use qc_station::report;
use qc_station::store::{MeasurementFilter, Store, UserUpdate};
use qc_station::validation;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "qc-station", version)]
#[command(about = "Factory-floor measurement capture and QC records", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Login name for commands that need a role
    #[arg(long, global = true)]
    user: Option<String>,

    /// Password for --user
    #[arg(long, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema and the default accounts
    InitDb,

    /// List serial ports on this machine
    Ports,

    /// Manage orders and their parameters (manufacturer)
    #[command(subcommand)]
    Order(OrderCommand),

    /// Manage acceptable ranges (supervisor)
    #[command(subcommand)]
    Range(RangeCommand),

    /// Manage user accounts (admin)
    #[command(subcommand)]
    User(UserCommand),

    /// Read, validate and commit measurements (operator)
    Capture(CaptureArgs),

    /// Show or export committed measurements
    Report(ReportArgs),
}

#[derive(Subcommand)]
enum OrderCommand {
    /// Create an order with its parameters
    Create {
        #[arg(long)]
        component: String,
        #[arg(long)]
        part: String,
        /// Parameter name (repeatable)
        #[arg(long = "param")]
        params: Vec<String>,
        /// Person or customer placing the order
        #[arg(long)]
        ordered_by: Option<String>,
        /// Order date, YYYY-MM-DD
        #[arg(long)]
        order_date: Option<String>,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due_date: Option<String>,
        /// Number of components ordered
        #[arg(long)]
        quantity: Option<i64>,
    },
    /// List orders with parameters and ranges
    List,
    /// List component names, or the part numbers of one component
    Components {
        #[arg(long)]
        component: Option<String>,
    },
    /// Add a parameter to an order
    AddParam {
        #[arg(long)]
        order: i64,
        #[arg(long)]
        param: String,
    },
    /// Remove a parameter from an order without measurements
    RemoveParam {
        #[arg(long)]
        order: i64,
        #[arg(long)]
        param: String,
    },
}

#[derive(Subcommand)]
enum RangeCommand {
    /// Set the acceptable range of a parameter; omitted sides are cleared
    Set {
        #[arg(long)]
        component: String,
        #[arg(long)]
        part: String,
        #[arg(long)]
        param: String,
        #[arg(long, allow_negative_numbers = true)]
        low: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        high: Option<f64>,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    /// Add an account
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long = "new-password")]
        new_password: String,
        #[arg(long)]
        role: Role,
    },
    /// List accounts
    List,
    /// Change an account
    Update {
        #[arg(long)]
        username: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        new_username: Option<String>,
        #[arg(long = "new-password")]
        new_password: Option<String>,
        #[arg(long)]
        role: Option<Role>,
    },
    /// Delete an account
    Remove {
        #[arg(long)]
        username: String,
    },
}

#[derive(Args)]
struct CaptureArgs {
    #[arg(long)]
    component: String,
    #[arg(long)]
    part: String,
    /// Parameter to read (repeatable, read in the given order)
    #[arg(long = "param", required = true)]
    params: Vec<String>,
    /// Serial port; defaults to serial.port from the configuration
    #[arg(long)]
    port: Option<String>,
    /// Baud rate; defaults to serial.baud_rate from the configuration
    #[arg(long)]
    baud: Option<u32>,
    /// Number of capture actions before committing
    #[arg(long, default_value_t = 1)]
    count: usize,
    /// Generate readings instead of talking to an instrument
    #[arg(long)]
    simulate: bool,
    /// Commit without asking for confirmation
    #[arg(long)]
    yes: bool,
}

#[derive(Args)]
struct ReportArgs {
    /// Earliest date, YYYY-MM-DD
    #[arg(long)]
    from: Option<String>,
    /// Latest date, YYYY-MM-DD
    #[arg(long)]
    to: Option<String>,
    /// Operator display name
    #[arg(long)]
    operator: Option<String>,
    /// Part number
    #[arg(long)]
    part: Option<String>,
    /// One row per parameter
    #[arg(long)]
    expand: bool,
    /// Export to a CSV file instead of printing
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
    /// List the operators and part numbers that can be filtered on
    #[arg(long)]
    list_filters: bool,
}

/// Credentials given on the command line.
struct Login {
    user: Option<String>,
    password: Option<String>,
}

impl Login {
    fn require(&self, store: &Store, allowed: &[Role], action: &str) -> Result<User> {
        let username = self
            .user
            .as_deref()
            .ok_or_else(|| anyhow!("--user is required to {action}"))?;
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| anyhow!("--password is required to {action}"))?;
        let user = auth::authenticate(store, username, password)?;
        auth::require(&user, allowed, action)?;
        Ok(user)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = StationConfig::load_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    logging::init_from_config(&config).map_err(|e| anyhow!(e))?;

    let store = Store::open(&config.database.path)
        .with_context(|| format!("opening {}", config.database.path.display()))?;
    info!(database = %store.path().display(), "{} started", config.application.name);

    let login = Login {
        user: cli.user,
        password: cli.password,
    };

    match cli.command {
        Commands::InitDb => init_db(&store),
        Commands::Ports => list_ports(),
        Commands::Order(cmd) => {
            let allowed: &[Role] = match cmd {
                OrderCommand::List | OrderCommand::Components { .. } => {
                    &[Role::Manufacturer, Role::Supervisor, Role::Admin]
                }
                _ => &[Role::Manufacturer],
            };
            login.require(&store, allowed, "manage orders")?;
            order_command(&store, cmd)
        }
        Commands::Range(cmd) => {
            login.require(&store, &[Role::Supervisor], "set ranges")?;
            range_command(&store, cmd)
        }
        Commands::User(cmd) => {
            login.require(&store, &[Role::Admin], "manage users")?;
            user_command(&store, cmd)
        }
        Commands::Capture(args) => {
            let operator = login.require(&store, &[Role::Operator], "capture measurements")?;
            capture(&store, &config, &operator, args)
        }
        Commands::Report(args) => {
            login.require(
                &store,
                &[Role::Supervisor, Role::Manufacturer, Role::Admin],
                "view reports",
            )?;
            report_command(&store, args)
        }
    }
}

fn init_db(store: &Store) -> Result<()> {
    let added = auth::seed_default_users(store)?;
    println!("Database ready at {}", store.path().display());
    println!("Default accounts added: {added}");
    Ok(())
}

fn list_ports() -> Result<()> {
    let ports = available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{port}");
    }
    Ok(())
}

fn order_command(store: &Store, cmd: OrderCommand) -> Result<()> {
    match cmd {
        OrderCommand::Create {
            component,
            part,
            params,
            ordered_by,
            order_date,
            due_date,
            quantity,
        } => {
            for (flag, date) in [("--order-date", &order_date), ("--due-date", &due_date)] {
                if let Some(date) = date {
                    validation::is_valid_date(date).map_err(|e| anyhow!("{flag}: {e}"))?;
                }
            }
            if quantity.is_some_and(|q| q < 1) {
                bail!("--quantity: must be at least 1");
            }
            let details = OrderDetails {
                ordered_by,
                order_date,
                due_date,
                quantity,
            };
            let summary = store.create_order_with(&component, &part, &params, &details)?;
            println!(
                "Order {} saved: {} / {} with {} parameter(s)",
                summary.order.id,
                summary.order.component_name,
                summary.order.part_number,
                summary.parameters.len()
            );
        }
        OrderCommand::List => {
            for summary in store.list_orders()? {
                let params: Vec<String> = summary
                    .parameters
                    .iter()
                    .map(|p| {
                        let bound = p.bound();
                        if bound.is_unbounded() {
                            p.name.clone()
                        } else {
                            format!("{} [{bound}]", p.name)
                        }
                    })
                    .collect();
                println!(
                    "{:>4}  {}  {}  {}",
                    summary.order.id,
                    summary.order.component_name,
                    summary.order.part_number,
                    params.join(", ")
                );
                let details = &summary.order.details;
                if !details.is_empty() {
                    let field = |value: Option<&str>| value.unwrap_or("-").to_string();
                    println!(
                        "      ordered by {}  on {}  due {}  qty {}",
                        field(details.ordered_by.as_deref()),
                        field(details.order_date.as_deref()),
                        field(details.due_date.as_deref()),
                        details
                            .quantity
                            .map_or_else(|| "-".to_string(), |q| q.to_string())
                    );
                }
            }
        }
        OrderCommand::Components { component } => {
            let names = match component {
                Some(component) => store.part_numbers(&component)?,
                None => store.component_names()?,
            };
            for name in names {
                println!("{name}");
            }
        }
        OrderCommand::AddParam { order, param } => {
            store.add_parameter(order, &param)?;
            println!("Parameter '{param}' added to order {order}");
        }
        OrderCommand::RemoveParam { order, param } => {
            store.remove_parameter(order, &param)?;
            println!("Parameter '{param}' removed from order {order}");
        }
    }
    Ok(())
}

fn range_command(store: &Store, cmd: RangeCommand) -> Result<()> {
    match cmd {
        RangeCommand::Set {
            component,
            part,
            param,
            low,
            high,
        } => {
            let spec = store.set_bounds(&component, &part, &param, low, high)?;
            println!(
                "Range saved: {component} / {part} / {} = [{}]",
                spec.name,
                spec.bound()
            );
        }
    }
    Ok(())
}

fn user_command(store: &Store, cmd: UserCommand) -> Result<()> {
    match cmd {
        UserCommand::Add {
            name,
            username,
            new_password,
            role,
        } => {
            let hash = auth::hash_password(&new_password)?;
            let user = store.create_user(&name, &username, &hash, role)?;
            println!("User '{}' added as {}", user.username, user.role);
        }
        UserCommand::List => {
            for user in store.list_users()? {
                println!(
                    "{:>4}  {:<16} {:<24} {}",
                    user.id, user.username, user.name, user.role
                );
            }
        }
        UserCommand::Update {
            username,
            name,
            new_username,
            new_password,
            role,
        } => {
            let update = UserUpdate {
                password_hash: new_password
                    .as_deref()
                    .map(auth::hash_password)
                    .transpose()?,
                name,
                username: new_username,
                role,
            };
            let user = store.update_user(&username, &update)?;
            println!("User '{}' updated", user.username);
        }
        UserCommand::Remove { username } => {
            store.delete_user(&username)?;
            println!("User '{username}' removed");
        }
    }
    Ok(())
}

fn connector_for(
    store: &Store,
    config: &StationConfig,
    args: &CaptureArgs,
) -> Result<Box<dyn Connector>> {
    if args.simulate {
        let mut simulator = SimulatedConnector::new(LinkSettings::new("SIMULATED", 0));
        if let Some(order) = store.find_order(&args.component, &args.part)? {
            for param in &args.params {
                let (low, high) = match store.parameter(order.id, param)? {
                    Some(spec) => (
                        spec.low.unwrap_or(DEFAULT_SIMULATED_RANGE.0),
                        spec.high.unwrap_or(DEFAULT_SIMULATED_RANGE.1),
                    ),
                    None => DEFAULT_SIMULATED_RANGE,
                };
                simulator = simulator.with_range(measure_command(param), low, high);
            }
        }
        return Ok(Box::new(simulator));
    }

    let port = args
        .port
        .clone()
        .or_else(|| config.serial.port.clone())
        .context("no serial port given; pass --port or set serial.port")?;
    let baud = args.baud.unwrap_or(config.serial.baud_rate);
    validation::is_valid_baud_rate(baud, false).map_err(|e| anyhow!("--baud: {e}"))?;

    let settings = LinkSettings::new(port, baud)
        .with_settle(config.serial.settle())
        .with_read_timeout(config.serial.read_timeout());
    Ok(Box::new(SerialConnector::new(settings)))
}

fn capture(
    store: &Store,
    config: &StationConfig,
    operator: &User,
    args: CaptureArgs,
) -> Result<()> {
    let connector = connector_for(store, config, &args)?;
    let mut session = CaptureSession::new(store.clone(), operator.name.clone())
        .with_policy(ThresholdPolicy::from(&config.validity));
    session.select(Selection {
        component: Some(args.component.clone()),
        part_number: Some(args.part.clone()),
        parameters: args.params.clone(),
    })?;

    if let Some(last) = session.previous_entries().first() {
        println!(
            "{} previous entries, last serial {} on {} {}",
            session.previous_entries().len(),
            last.serial_number,
            last.date,
            last.time
        );
    }

    for _ in 0..args.count {
        match session.capture(connector.as_ref()) {
            Ok(staged) => println!(
                "staged #{}  {}  {}  [{}]",
                staged.serial_number, staged.parameter_names, staged.values, staged.ranges
            ),
            // Capture errors leave the session ready for the next reading
            Err(e) => eprintln!("{e}"),
        }
    }

    if session.staging().is_empty() {
        println!("No new data to submit");
        return Ok(());
    }

    let mut confirm: Box<dyn Confirm> = if args.yes {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(PromptConfirm::stdio())
    };
    match session.commit(confirm.as_mut())? {
        CommitOutcome::Committed(rows) => {
            for row in &rows {
                println!(
                    "committed #{}  {}  {}  {}",
                    row.serial_number, row.parameter_names, row.values, row.validity
                );
            }
            println!("New data submitted successfully.");
        }
        CommitOutcome::Declined => println!("Submission cancelled; nothing was written."),
    }
    Ok(())
}

fn report_command(store: &Store, args: ReportArgs) -> Result<()> {
    if args.list_filters {
        let choices = report::filter_choices(store)?;
        println!("Operators: {}", choices.operators.join(", "));
        println!("Part numbers: {}", choices.part_numbers.join(", "));
        return Ok(());
    }

    let filter = MeasurementFilter {
        from: args.from,
        to: args.to,
        operator: args.operator,
        part_number: args.part,
    };
    let rows = report::generate(store, &filter, args.expand)?;

    if let Some(path) = args.csv {
        report::export_csv(&rows, &path)?;
        println!("Data exported to {}", path.display());
    } else if args.json {
        report::write_json(&rows, std::io::stdout().lock())?;
    } else {
        report::write_table(&rows, std::io::stdout().lock())?;
    }
    Ok(())
}
