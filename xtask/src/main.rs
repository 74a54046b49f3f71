use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{exit, Command};

use batch_dispatch_core::template::{render_template, DeploymentSettings};
use batch_dispatch_core::topology::ConsumerSettings;
use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const RUNTIME_BINARY: &str = "pipeline_runtime";
const DIST_DIR: &str = "infra/dist";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the batch dispatch workspace",
    long_about = "Builds and packages the Lambda runtime, renders the deployment\n\
                  template, and runs CI checks for the batch dispatch workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CI checks (fmt, clippy, tests)
    Ci,
    /// Build and package the Rust Lambda artifact shared by both functions
    ServerlessPackage {
        /// Compilation target triple for Lambda binaries
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for binaries
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
    /// Render the SAM template with queue timing derived from the consumer timeout
    RenderTemplate {
        /// Primary queue name
        #[arg(long, default_value = "FileUploadManagerQueue")]
        queue_name: String,
        /// Dead-letter queue name
        #[arg(long, default_value = "FileUploadManagerDeadLetterQueue")]
        dead_letter_queue_name: String,
        /// Bucket the producer lists and the consumer copies within
        #[arg(long, env = "SOURCE_BUCKET")]
        source_bucket: String,
        /// Prefix the consumer copies objects under
        #[arg(long, default_value = "Destination/")]
        destination_prefix: String,
        /// Producer timeout in seconds
        #[arg(long, default_value_t = 900)]
        producer_timeout: u32,
        /// Producer memory in MB
        #[arg(long, default_value_t = 1024)]
        producer_memory: u32,
        /// Consumer timeout in seconds; the queue visibility timeout derives from it
        #[arg(long, default_value_t = 300)]
        consumer_timeout: u32,
        /// Consumer memory in MB
        #[arg(long, default_value_t = 512)]
        consumer_memory: u32,
        /// Output file path
        #[arg(long, default_value = "infra/template.json")]
        output: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn run_cargo(args: &[&str]) {
    eprintln!("+ cargo {}", args.join(" "));
    let status = Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo");
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn package_serverless_lambda(target: &str, profile: BuildProfile) {
    require_rust_target(target);

    step("Build pipeline runtime");
    let mut cargo_args = vec![
        "build",
        "-p",
        "batch_dispatch_lambda",
        "--bin",
        RUNTIME_BINARY,
        "--target",
        target,
    ];
    cargo_args.extend(profile.as_cargo_flag());
    run_cargo(&cargo_args);

    step("Zip runtime as bootstrap");
    let binary_path = Path::new("target")
        .join(target)
        .join(profile.dir_name())
        .join(RUNTIME_BINARY);
    let zip_path = Path::new(DIST_DIR).join("runtime.zip");
    fs::create_dir_all(DIST_DIR).expect("failed to create dist directory");
    write_bootstrap_zip(&binary_path, &zip_path);

    eprintln!("\nPackaged artifact: {}", zip_path.display());
}

/// Lambda targets are cross-compiled, so fail early with the install hint.
fn require_rust_target(target: &str) {
    let installed = match Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
    {
        Ok(output) if output.status.success() => output.stdout,
        Ok(_) | Err(_) => {
            eprintln!("warning: could not query installed rust targets; skipping preflight");
            return;
        }
    };

    if !String::from_utf8_lossy(&installed)
        .lines()
        .any(|line| line.trim() == target)
    {
        eprintln!("error: rust target `{target}` is missing; run `rustup target add {target}`");
        exit(2);
    }
}

fn write_bootstrap_zip(binary_path: &Path, zip_path: &Path) {
    let binary = fs::read(binary_path)
        .unwrap_or_else(|error| panic!("failed to read {}: {error}", binary_path.display()));
    let mut zip = ZipWriter::new(fs::File::create(zip_path).expect("failed to create zip"));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)
        .expect("failed to start bootstrap entry");
    zip.write_all(&binary).expect("failed to write bootstrap entry");
    zip.finish().expect("failed to finish zip");
}

fn write_template(settings: &DeploymentSettings, output: &Path) {
    let template = render_template(settings).unwrap_or_else(|error| {
        eprintln!("error: {error}");
        exit(2);
    });
    let rendered =
        serde_json::to_string_pretty(&template).expect("template should serialize to JSON");

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).expect("failed to create template directory");
    }
    fs::write(output, rendered).expect("failed to write template");
    eprintln!("Rendered template: {}", output.display());
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test batch_dispatch_core");
    run_cargo(&["test", "-p", "batch_dispatch_core"]);

    step("Test batch_dispatch_lambda");
    run_cargo(&["test", "-p", "batch_dispatch_lambda"]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci => {
            ci_check();
            eprintln!("\nCI job passed.");
        }
        Commands::ServerlessPackage { target, profile } => {
            package_serverless_lambda(&target, profile);
        }
        Commands::RenderTemplate {
            queue_name,
            dead_letter_queue_name,
            source_bucket,
            destination_prefix,
            producer_timeout,
            producer_memory,
            consumer_timeout,
            consumer_memory,
            output,
        } => {
            let consumer = ConsumerSettings::new(consumer_timeout, consumer_memory)
                .unwrap_or_else(|error| {
                    eprintln!("error: {error}");
                    exit(2);
                });
            let settings = DeploymentSettings {
                queue_name,
                dead_letter_queue_name,
                source_bucket,
                destination_prefix,
                code_uri: "dist/runtime.zip".to_string(),
                producer_timeout_seconds: producer_timeout,
                producer_memory_mb: producer_memory,
                consumer,
            };
            write_template(&settings, Path::new(&output));
        }
    }
}
