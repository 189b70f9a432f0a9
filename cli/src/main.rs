use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use msg2capnp_compiler::gen_capnp::DEFAULT_NAMESPACE;
use msg2capnp_compiler::provider::{FallbackProvider, MemoryProvider, PackagePathProvider};
use msg2capnp_compiler::{compile_types, CompileOptions, IdGenerator, MetadataProvider};
use msg2capnp_schema::QualifiedType;

mod bag;
mod error;
mod lists;
mod live;
mod output;
mod ros1bag;

use bag::BagProvider;
use error::CliError;
use live::{MasterClient, DEFAULT_MASTER_URI};

#[derive(Parser, Debug)]
#[command(name = "msg2capnp", version)]
#[command(about = "Generate Cap'n Proto schemas from ROS message types", long_about = None)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["live", "rosbag", "msg", "all"]),
))]
struct Cli {
    /// Generate schemas for every topic type on a running ROS system
    #[arg(short, long)]
    live: bool,

    /// Generate schemas for every type recorded in a ROS 1 bag or an MCAP file
    #[arg(short = 'b', long, value_name = "PATH")]
    rosbag: Option<PathBuf>,

    /// Generate the schema for one type (`sensor_msgs/Imu`, `sensor_msgs/Imu.msg` or a `.msg` file)
    #[arg(short, long, value_name = "TYPE")]
    msg: Option<String>,

    /// Generate schemas for every type on the package path
    #[arg(short, long)]
    all: bool,

    /// Packages or type names that are always generated
    #[arg(short, long, num_args = 0.., value_name = "NAME")]
    whitelist: Vec<String>,

    /// Packages or type names that are not generated unless required
    #[arg(long, num_args = 0.., value_name = "NAME")]
    blacklist: Vec<String>,

    /// Output root (defaults to the current directory)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Only generate the requested types, not the types they depend on
    #[arg(long)]
    no_subtypes: bool,

    /// Print debug diagnostics
    #[arg(short, long)]
    debug: bool,

    /// Roots searched for ROS packages
    #[arg(long = "package-path", env = "ROS_PACKAGE_PATH", value_name = "PATHS")]
    package_path: Vec<String>,

    #[arg(long, env = "ROS_MASTER_URI", default_value = DEFAULT_MASTER_URI)]
    master_uri: String,

    /// C++ namespace declared in every schema
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Write a JSON report of the generated files
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,
}

type Source = (Vec<QualifiedType>, Box<dyn MetadataProvider>);

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// `<package>/msg/<Name>.msg` or `<package>/<Name>.msg`.
fn type_from_msg_path(path: &Path) -> Result<QualifiedType, CliError> {
    let path = fs::canonicalize(path)?;
    let name = path.file_stem().and_then(|s| s.to_str());
    let mut dir = path.parent();
    if dir.and_then(Path::file_name).is_some_and(|d| d == "msg") {
        dir = dir.and_then(Path::parent);
    }
    let package = dir.and_then(Path::file_name).and_then(|s| s.to_str());

    match (package, name) {
        (Some(package), Some(name)) => Ok(format!("{}/{}", package, name).parse()?),
        _ => Err(CliError::InvalidArgument(format!(
            "cannot infer the message type of {}",
            path.display()
        ))),
    }
}

fn msg_source(arg: &str, packages: PackagePathProvider) -> Result<Source, CliError> {
    let path = Path::new(arg);
    if path.is_file() {
        let ty = type_from_msg_path(path)?;
        let mut local = MemoryProvider::new();
        local.insert_msg(&ty, &fs::read_to_string(path)?)?;
        debug!("Loaded {} from {}", ty, path.display());
        return Ok((vec![ty], Box::new(FallbackProvider::new(local, packages))));
    }

    let ty: QualifiedType = arg.strip_suffix(".msg").unwrap_or(arg).parse()?;
    Ok((vec![ty], Box::new(packages)))
}

fn source(cli: &Cli, packages: PackagePathProvider) -> Result<Source, CliError> {
    if cli.live {
        info!("Attempting to generate schemas from a running ROS system at {}", cli.master_uri);
        let seeds = MasterClient::new(cli.master_uri.as_str()).message_types()?;
        return Ok((seeds, Box::new(packages)));
    }
    if let Some(path) = &cli.rosbag {
        let recording = BagProvider::open(path)?;
        let seeds = recording.recorded_types().to_vec();
        return Ok((seeds, Box::new(FallbackProvider::new(recording, packages))));
    }
    if let Some(msg) = &cli.msg {
        return msg_source(msg, packages);
    }
    let seeds = packages.list_types()?;
    Ok((seeds, Box::new(packages)))
}

/// Returns `false` when some schemas could not be generated.
fn run(cli: &Cli) -> Result<bool, CliError> {
    let cwd = std::env::current_dir()?;
    let output = match &cli.output {
        Some(dir) => dir.clone(),
        None => {
            info!("No output directory specified. Defaulting to current directory {}", cwd.display());
            cwd.clone()
        }
    };

    let policy = lists::load_policy(&cwd, &cli.whitelist, &cli.blacklist)?;
    debug!("Allowed: {:?}", policy.allowed().collect::<Vec<_>>());
    debug!("Denied: {:?}", policy.denied().collect::<Vec<_>>());

    let roots: Vec<PathBuf> = cli
        .package_path
        .iter()
        .flat_map(|p| PackagePathProvider::split_search_path(p))
        .collect();
    let packages = PackagePathProvider::discover(&roots)?;
    debug!("Found {} message packages", packages.packages().count());

    let (seeds, provider) = source(cli, packages)?;
    if seeds.is_empty() {
        warn!("No message types to generate");
    }

    let options = CompileOptions {
        expand_subtypes: !cli.no_subtypes,
        namespace:       cli.namespace.clone(),
    };
    let mut ids = IdGenerator::from_entropy();
    let compilation = compile_types(seeds, &policy, &*provider, &options, &mut ids)?;

    let (written, failed) = output::write_all(&output, &compilation.schemas);
    if let Some(manifest) = &cli.manifest {
        output::write_manifest(manifest, &written)?;
    }

    let failures = compilation.failures.len() + failed;
    if failures > 0 {
        error!("{} schema(s) could not be generated", failures);
    }
    println!("Done. Generated {} schema(s).", written.len());
    Ok(failures == 0)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
