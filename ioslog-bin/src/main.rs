use chrono::Local;
use ioslog_core::{Channel, Level, LogFacadeSink, LogReassembler, ReassemblerDesc, attach};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::env;
use std::io;
use tokio::runtime::Runtime;

fn print_usage() {
    eprintln!("Usage: <forwarder> | ioslog [OPTIONS] <APP_NAME>");
    eprintln!();
    eprintln!("Reads forwarded device logs from stdin and prints one entry per message.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --err, -e       Treat stdin as the error channel (untagged lines are errors)");
    eprintln!("  --plain, -p     Print messages to stdout instead of the terminal logger");
    eprintln!("  --eager         Dispatch a chunk without a newline immediately");
    eprintln!("  --verbose, -v   Also show ioslog's own debug output");
    eprintln!("  --help, -h      Print this help message");
}

struct RunOptions {
    app_name: String,
    channel: Channel,
    plain: bool,
    eager: bool,
    verbose: bool,
}

enum UsageOptions {
    Run(RunOptions),
    Help,
}

impl UsageOptions {
    fn from_args(args: &[String]) -> Result<Self, io::Error> {
        let mut app_name = None;
        let mut opts = RunOptions {
            app_name: String::new(),
            channel: Channel::Out,
            plain: false,
            eager: false,
            verbose: false,
        };

        for arg in args {
            match arg.as_str() {
                "--err" | "-e" => opts.channel = Channel::Err,
                "--plain" | "-p" => opts.plain = true,
                "--eager" => opts.eager = true,
                "--verbose" | "-v" => opts.verbose = true,
                "--help" | "-h" => return Ok(Self::Help),
                other if other.starts_with('-') => {
                    print_usage();
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("Unknown option: {}", other),
                    ));
                }
                name => {
                    if app_name.replace(name.to_string()).is_some() {
                        print_usage();
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidInput,
                            "Only one application name is allowed",
                        ));
                    }
                }
            }
        }

        match app_name {
            Some(name) => {
                opts.app_name = name;
                Ok(Self::Run(opts))
            }
            None => {
                print_usage();
                Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "missing application name",
                ))
            }
        }
    }
}

fn setup_logger(opts: &RunOptions) {
    let mut builder = ConfigBuilder::new();
    if !opts.verbose {
        // hide the reassembler's own chatter, keep the device messages
        builder.add_filter_ignore_str("ioslog_core");
    }

    // plain mode owns stdout
    let mode = if opts.plain {
        TerminalMode::Stderr
    } else {
        TerminalMode::Mixed
    };

    if let Err(e) = TermLogger::init(LevelFilter::Trace, builder.build(), mode, ColorChoice::Auto) {
        eprintln!("Failed to set up logger: {}", e);
    }
}

fn print_plain(level: Level, message: &str) {
    println!(
        "{} [{}] {}",
        Local::now().format("%H:%M:%S%.3f"),
        level,
        message
    );
}

fn run(opts: RunOptions) -> anyhow::Result<()> {
    let desc = ReassemblerDesc {
        eager_unterminated: opts.eager,
        ..Default::default()
    };
    let mut reassembler = if opts.plain {
        LogReassembler::with_desc(&opts.app_name, print_plain, desc)?
    } else {
        LogReassembler::with_desc(&opts.app_name, LogFacadeSink::new(&opts.app_name), desc)?
    };

    let rt = Runtime::new()?;
    rt.block_on(async {
        match opts.channel {
            Channel::Out => attach(&mut reassembler, tokio::io::stdin(), tokio::io::empty()).await,
            Channel::Err => attach(&mut reassembler, tokio::io::empty(), tokio::io::stdin()).await,
        }
    })
}

fn main() -> io::Result<()> {
    // Collect args excluding the binary name
    let args: Vec<String> = env::args().skip(1).collect();
    let opts = match UsageOptions::from_args(&args)? {
        UsageOptions::Help => {
            print_usage();
            return Ok(());
        }
        UsageOptions::Run(opts) => opts,
    };

    setup_logger(&opts);

    if let Err(err) = run(opts) {
        eprintln!("Application Error: {:?}", err);
        std::process::exit(1);
    }

    Ok(())
}
