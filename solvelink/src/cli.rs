use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use solvelink_core::protocol::NodeRef;

/// solvelink - talk to solver backends, run tasks, replay traces
#[derive(Parser, Debug)]
#[command(name = "solvelink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe backends with checkConnection
    Check {
        /// Backend URLs (default: SOLVELINK_CONNECTIONS)
        #[arg(value_name = "URL")]
        urls: Vec<String>,
    },

    /// List what every connection offers
    Features {
        #[command(flatten)]
        connections: ConnectionArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Find the first connection able to run a task
    Find(FindCmd),

    /// Run a task on the first suitable connection and save its trace
    Solve(SolveCmd),

    /// Inspect a saved trace
    Trace(TraceCmd),

    /// Call a single method and print the raw result
    Call {
        #[arg(value_name = "URL")]
        url: String,

        /// Method name, e.g. features/algorithms
        #[arg(value_name = "METHOD")]
        method: String,

        /// JSON params (default: null)
        #[arg(value_name = "PARAMS_JSON")]
        params: Option<String>,

        /// Print long strings in full
        #[arg(long)]
        full: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Backend URL; repeat to add more, in priority order (default: SOLVELINK_CONNECTIONS)
    #[arg(long = "connection", short = 'c', value_name = "URL")]
    pub urls: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct TaskSelection {
    /// Algorithm id
    #[arg(long)]
    pub algorithm: String,

    /// Map format id
    #[arg(long)]
    pub format: String,

    /// Problem type id (default: pathfinding)
    #[arg(long)]
    pub problem_type: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct FindCmd {
    #[command(flatten)]
    pub selection: TaskSelection,

    #[command(flatten)]
    pub connections: ConnectionArgs,
}

#[derive(Args, Debug, Clone)]
pub struct SolveCmd {
    #[command(flatten)]
    pub selection: TaskSelection,

    /// Map file, sent inline
    #[arg(long, value_name = "FILE")]
    pub map: PathBuf,

    /// Start node: N or X,Y
    #[arg(long, allow_hyphen_values = true)]
    pub start: NodeRef,

    /// End node: N or X,Y
    #[arg(long, allow_hyphen_values = true)]
    pub end: NodeRef,

    /// Plant node with optional pour amount; repeatable
    #[arg(long = "plant", value_name = "N[=AMOUNT]", allow_hyphen_values = true)]
    pub plants: Vec<PlantArg>,

    /// Tap node; repeatable
    #[arg(long = "tap", value_name = "N", allow_hyphen_values = true)]
    pub taps: Vec<NodeRef>,

    /// Where to write the trace (default: <trace id>.trace.json)
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub connections: ConnectionArgs,
}

#[derive(Args, Debug, Clone)]
pub struct TraceCmd {
    /// Trace file written by `solvelink solve`
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Show this step
    #[arg(long, allow_hyphen_values = true)]
    pub step: Option<i64>,

    /// Show this many steps ending at the current one, fading out
    #[arg(long, value_name = "K")]
    pub onion: Option<usize>,

    /// Set a breakpoint; repeatable
    #[arg(long = "breakpoint", value_name = "N")]
    pub breakpoints: Vec<usize>,
}

/// `--plant N[=AMOUNT]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantArg {
    pub node: NodeRef,
    pub amount: Option<f64>,
}

impl FromStr for PlantArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (node, amount) = match s.split_once('=') {
            Some((node, amount)) => {
                let amount: f64 = amount
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid pour amount in '{}'", s))?;
                (node, Some(amount))
            }
            None => (s, None),
        };
        Ok(Self {
            node: node.parse()?,
            amount,
        })
    }
}
