use super::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(name = "warehouse", version, about = "Warehouse equipment tracking client")]
pub struct Cli {
    /// Settings file (defaults to settings/dev.toml or settings/release.toml)
    #[arg(long, global = true)]
    pub settings: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the token pair
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "WAREHOUSE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Close the session and forget stored tokens
    Logout,
    /// Show the current user's role
    Whoami,
    /// Check whether a view path may be opened
    Guard {
        path: String,
        /// `admin` or `manager`
        #[arg(long)]
        require: Option<String>,
    },
    /// Send an authenticated request and print the body
    Request {
        method: String,
        path: String,
        #[arg(long)]
        json: Option<String>,
    },
    /// Keep the session alive until interrupted
    Keepalive,
    /// List equipment
    Equipment,
    /// Look up equipment by QR payload
    Scan { qr: String },
    /// Issue equipment to a user
    Issue {
        #[arg(long)]
        equipment_id: String,
        #[arg(long)]
        target_user_id: i64,
        #[arg(long, default_value = "")]
        notes: String,
        /// RFC 3339 timestamp
        #[arg(long)]
        due_at: Option<String>,
    },
    /// Return equipment to stock
    Return {
        #[arg(long)]
        equipment_id: String,
        /// ok, need_repair or damaged
        #[arg(long)]
        condition: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Inventory rounds
    Inventory {
        #[command(subcommand)]
        action: InventoryAction,
    },
    /// Notifications
    Notifications {
        #[command(subcommand)]
        action: NotificationsAction,
    },
    /// Operation statistics
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum InventoryAction {
    /// Start a round, optionally limited to a location
    Start {
        #[arg(long)]
        location: Option<i64>,
    },
    /// Record a scanned item
    Scan {
        #[arg(long)]
        session: i64,
        #[arg(long)]
        equipment_id: String,
    },
    /// Close the round and print missing/extra items
    Finish {
        #[arg(long)]
        session: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum NotificationsAction {
    List,
    Read,
    Overdue,
}
