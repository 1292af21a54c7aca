//! CLI for Android UI hierarchy inspection via droidlens.
//!
//! Captures snapshots over adb, hit-tests captured trees against screen
//! coordinates, and generates AutoJs6 script fragments from the node
//! under a point.
//!
//! # Usage
//!
//! ```bash
//! # List connected devices
//! droidlens devices
//!
//! # Capture screenshot + uiautomator dump into ./snapshot_<timestamp>/
//! droidlens capture
//!
//! # Capture via the AutoJs extraction script instead
//! droidlens capture --via-script
//!
//! # Show the node under a point in a captured tree
//! droidlens inspect snapshot_20250114_120301/window_dump.xml --at 540,960
//!
//! # Same, as JSON
//! droidlens inspect tree.json --at 540,960 --output json
//!
//! # Generate an AutoJs6 fragment for the node under a point
//! droidlens codegen tree.json --at 540,960 --mode find-one --click
//!
//! # Generate an existence-check function instead
//! droidlens codegen tree.json --at 540,960 --exists-fn
//!
//! # Launch an arbitrary on-device script through AutoJs
//! droidlens run-script /storage/emulated/0/Scripts/my_task.js
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use droidlens_core::capture::{CaptureConfig, CaptureError};
use droidlens_core::codegen::{self, Actions, LookupMode, SelectorFields};
use droidlens_core::config::DroidlensConfig;
use droidlens_core::inspect::{find_node_at, locate_by_identity};
use droidlens_core::node::{parse_tree_file, TreeFormat, TreeParseError, UiNode};
use droidlens_core::session::{parse_device_list, DeviceSession, SessionError};

/// CLI for Android UI hierarchy inspection via droidlens.
#[derive(Parser)]
#[command(name = "droidlens")]
#[command(about = "Inspect the UI hierarchy of a connected Android device over adb")]
#[command(version)]
struct Cli {
    /// Path to the adb executable (overrides the config file)
    #[arg(long, env = "DROIDLENS_ADB")]
    adb: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum FormatArg {
    Xml,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum ModeArg {
    FindOne,
    UntilFind,
    WaitFor,
    Exists,
}

impl From<ModeArg> for LookupMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::FindOne => LookupMode::FindOne,
            ModeArg::UntilFind => LookupMode::UntilFind,
            ModeArg::WaitFor => LookupMode::WaitFor,
            ModeArg::Exists => LookupMode::Exists,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List devices reported by `adb devices`
    Devices,

    /// Capture a screenshot plus a UI tree from the connected device
    Capture {
        /// Extract the tree with the AutoJs script instead of uiautomator
        #[arg(long)]
        via_script: bool,
        /// Output directory (default: ./snapshot_<timestamp>)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Parse the captured tree and report its node count
        #[arg(long)]
        parse: bool,
    },

    /// Show the node under a screen point in a captured tree file
    Inspect {
        /// Tree-source file (window_dump.xml or autojs_ui_tree.json)
        tree: PathBuf,
        /// Screen point as X,Y
        #[arg(long)]
        at: String,
        /// Tree format (default: inferred from the file extension)
        #[arg(long)]
        format: Option<FormatArg>,
        /// Output format
        #[arg(short = 'O', long, default_value = "text")]
        output: OutputFormat,
    },

    /// Generate an AutoJs6 fragment for the node under a screen point
    Codegen {
        /// Tree-source file (window_dump.xml or autojs_ui_tree.json)
        tree: PathBuf,
        /// Screen point as X,Y
        #[arg(long)]
        at: String,
        /// Tree format (default: inferred from the file extension)
        #[arg(long)]
        format: Option<FormatArg>,
        /// Lookup mode for the generated code
        #[arg(short, long)]
        mode: Option<ModeArg>,
        /// Emit a named existence-check function instead of a script
        #[arg(long, conflicts_with = "mode")]
        exists_fn: bool,
        /// Append a click() action
        #[arg(long)]
        click: bool,
        /// Append a longClick() action
        #[arg(long)]
        long_click: bool,
        /// Append a setText(...) action with this payload
        #[arg(long, value_name = "TEXT")]
        set_text: Option<String>,
        /// Append a scrollForward() action
        #[arg(long)]
        scroll_forward: bool,
        /// Append a scrollBackward() action
        #[arg(long)]
        scroll_backward: bool,
        /// Leave the resource id out of the selector
        #[arg(long)]
        no_id: bool,
        /// Leave the text out of the selector
        #[arg(long)]
        no_text: bool,
        /// Leave the content description out of the selector
        #[arg(long)]
        no_desc: bool,
        /// Leave the class name out of the selector
        #[arg(long)]
        no_class: bool,
    },

    /// Launch an on-device script through the AutoJs run intent
    RunScript {
        /// Device path of the script (default: the configured extraction script)
        remote_path: Option<String>,
    },
}

#[derive(Debug)]
enum CliError {
    Device(String),
    Capture(String),
    Parse(String),
    NoNodeAtPoint { x: i32, y: i32 },
    BadPoint(String),
    Io(std::io::Error),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::NoNodeAtPoint { .. } => ExitCode::from(1),
            CliError::Device(_) | CliError::Capture(_) => ExitCode::from(2),
            CliError::Parse(_) => ExitCode::from(3),
            CliError::BadPoint(_) => ExitCode::from(4),
            CliError::Io(_) => ExitCode::from(5),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Device(msg) => write!(f, "{msg}"),
            CliError::Capture(msg) => write!(f, "{msg}"),
            CliError::Parse(msg) => write!(f, "failed to parse tree: {msg}"),
            CliError::NoNodeAtPoint { x, y } => write!(f, "no node found at ({x}, {y})"),
            CliError::BadPoint(arg) => write!(f, "expected a point as X,Y, got: {arg}"),
            CliError::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Device(e.to_string())
    }
}

impl From<CaptureError> for CliError {
    fn from(e: CaptureError) -> Self {
        CliError::Capture(e.to_string())
    }
}

impl From<TreeParseError> for CliError {
    fn from(e: TreeParseError) -> Self {
        CliError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code()
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut user_config = DroidlensConfig::load();
    if let Some(adb) = cli.adb {
        user_config.adb_path = adb;
    }

    match cli.command {
        Command::Devices => devices(&user_config).await,
        Command::Capture {
            via_script,
            output,
            parse,
        } => capture(&user_config, via_script, output, parse).await,
        Command::Inspect {
            tree,
            at,
            format,
            output,
        } => inspect(&tree, &at, format, output),
        Command::Codegen {
            tree,
            at,
            format,
            mode,
            exists_fn,
            click,
            long_click,
            set_text,
            scroll_forward,
            scroll_backward,
            no_id,
            no_text,
            no_desc,
            no_class,
        } => {
            let actions = Actions {
                click,
                long_click,
                set_text,
                scroll_forward,
                scroll_backward,
            };
            let fields = SelectorFields {
                id: !no_id,
                text: !no_text,
                desc: !no_desc,
                class_name: !no_class,
            };
            generate(
                &tree,
                &at,
                format,
                mode.map(LookupMode::from),
                exists_fn,
                &actions,
                fields,
            )
        }
        Command::RunScript { remote_path } => run_script(&user_config, remote_path).await,
    }
}

async fn devices(config: &DroidlensConfig) -> Result<(), CliError> {
    let session = DeviceSession::from_config(config);
    let out = session
        .adb()
        .run_default(&["devices"])
        .await
        .map_err(|e| CliError::Device(e.to_string()))?;
    if !out.success() {
        return Err(CliError::Device(format!("adb devices failed: {}", out.message())));
    }

    let entries = parse_device_list(&out.stdout);
    if entries.is_empty() {
        println!("no devices attached");
        return Ok(());
    }
    for entry in entries {
        println!("{}\t{}", entry.serial, entry.status);
    }
    Ok(())
}

async fn capture(
    config: &DroidlensConfig,
    via_script: bool,
    output: Option<PathBuf>,
    parse: bool,
) -> Result<(), CliError> {
    let session = DeviceSession::from_config(config);
    let mut capture_config = CaptureConfig::from_user_config(config);
    capture_config.output_dir = Some(output.unwrap_or_else(default_output_dir));
    debug!(via_script, dir = ?capture_config.output_dir, "starting capture");

    let snapshot = if via_script {
        session.capture_snapshot_via_script(&capture_config).await?
    } else {
        session.capture_snapshot(&capture_config).await?
    };

    println!("screenshot: {}", snapshot.screenshot.display());
    println!("tree:       {}", snapshot.tree_source.display());

    if parse {
        let tree = parse_tree_file(&snapshot.tree_source, snapshot.tree_format())?;
        println!("nodes:      {}", count_nodes(&tree));
    }
    Ok(())
}

fn inspect(
    tree_path: &Path,
    at: &str,
    format: Option<FormatArg>,
    output: OutputFormat,
) -> Result<(), CliError> {
    let (x, y) = parse_point(at)?;
    let tree = parse_tree_file(tree_path, resolve_format(tree_path, format))?;
    let node = find_node_at(&tree, x, y).ok_or(CliError::NoNodeAtPoint { x, y })?;
    let path = locate_by_identity(&tree, node).unwrap_or_default();

    match output {
        OutputFormat::Text => print_node_text(node, &path),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&node_properties(node, &path))
                .expect("node properties serialize")
        ),
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn generate(
    tree_path: &Path,
    at: &str,
    format: Option<FormatArg>,
    mode: Option<LookupMode>,
    exists_fn: bool,
    actions: &Actions,
    fields: SelectorFields,
) -> Result<(), CliError> {
    let (x, y) = parse_point(at)?;
    let tree = parse_tree_file(tree_path, resolve_format(tree_path, format))?;
    let node = find_node_at(&tree, x, y).ok_or(CliError::NoNodeAtPoint { x, y })?;

    let code = if exists_fn {
        codegen::build_exists_function(node, fields)
    } else {
        codegen::build_action_script(node, mode, actions, fields)
    };
    println!("{code}");
    Ok(())
}

async fn run_script(
    config: &DroidlensConfig,
    remote_path: Option<String>,
) -> Result<(), CliError> {
    let session = DeviceSession::from_config(config);
    session.ensure_device_connected().await?;

    let capture_config = CaptureConfig::from_user_config(config);
    let remote = remote_path.unwrap_or_else(|| capture_config.script_remote_path.clone());
    session
        .launch_remote_script(&capture_config, &remote)
        .await?;
    println!("launched {remote}");
    Ok(())
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(format!(
        "snapshot_{}",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ))
}

fn parse_point(arg: &str) -> Result<(i32, i32), CliError> {
    let bad = || CliError::BadPoint(arg.to_string());
    let (x, y) = arg.split_once(',').ok_or_else(bad)?;
    Ok((
        x.trim().parse().map_err(|_| bad())?,
        y.trim().parse().map_err(|_| bad())?,
    ))
}

fn resolve_format(path: &Path, format: Option<FormatArg>) -> TreeFormat {
    match format {
        Some(FormatArg::Xml) => TreeFormat::UiAutomatorXml,
        Some(FormatArg::Json) => TreeFormat::AutojsJson,
        None => match path.extension().and_then(|e| e.to_str()) {
            Some("json") => TreeFormat::AutojsJson,
            _ => TreeFormat::UiAutomatorXml,
        },
    }
}

fn count_nodes(node: &UiNode) -> usize {
    1 + node.children.iter().map(count_nodes).sum::<usize>()
}

fn print_node_text(node: &UiNode, path: &[usize]) {
    let (cx, cy) = node.center();
    println!("{}", node.display_label());
    println!("  text:           {}", node.text);
    println!("  id:             {}", node.local_id());
    println!("  fullid:         {}", node.resource_id);
    println!("  class:          {}", node.class_name);
    println!("  package:        {}", node.package);
    println!("  desc:           {}", node.content_desc);
    println!("  clickable:      {}", node.clickable);
    println!("  enabled:        {}", node.enabled);
    println!("  scrollable:     {}", node.scrollable);
    println!("  long-clickable: {}", node.long_clickable);
    println!("  bounds:         {}", node.bounds);
    println!("  center:         [{cx},{cy}]");
    println!("  index:          {}", node.index);
    println!(
        "  path:           {}",
        path.iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join("/")
    );
}

fn node_properties(node: &UiNode, path: &[usize]) -> serde_json::Value {
    let (cx, cy) = node.center();
    serde_json::json!({
        "text": node.text,
        "id": node.local_id(),
        "fullid": node.resource_id,
        "class": node.class_name,
        "package": node.package,
        "desc": node.content_desc,
        "checkable": node.checkable == "true",
        "checked": node.checked == "true",
        "clickable": node.clickable == "true",
        "enabled": node.enabled == "true",
        "focusable": node.focusable == "true",
        "focused": node.focused == "true",
        "scrollable": node.scrollable == "true",
        "long_clickable": node.long_clickable == "true",
        "password": node.password == "true",
        "selected": node.selected == "true",
        "bounds": node.bounds,
        "rect": { "x": node.rect.x, "y": node.rect.y, "w": node.rect.width, "h": node.rect.height },
        "center": { "x": cx, "y": cy },
        "index": node.index,
        "path": path,
    })
}
