use std::env;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::thread;

use getopts::Options;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use apexdns::dns::config::{check_threads, parse_listen, ServerConfig};
use apexdns::dns::context::ServerContext;
use apexdns::dns::server::{DnsServer, DnsUdpServer};

fn print_usage(program: &str, opts: Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

fn fail(message: String) -> ! {
    log::error!("{}", message);
    process::exit(1);
}

/// Main entry point for the ApexDNS server
fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help menu");
    opts.optopt("c", "config", "Configuration file (TOML)", "FILE");
    opts.optopt(
        "l",
        "listen",
        "Address to listen on (default 0.0.0.0:53)",
        "ADDR",
    );
    opts.optopt("z", "zone", "Apex of the served zone", "APEX");
    opts.optopt(
        "t",
        "threads",
        "Number of worker threads (default 4)",
        "N",
    );
    opts.optopt(
        "",
        "log-level",
        "Log level: error, warn, info, debug or trace (default info)",
        "LEVEL",
    );

    let opt_matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => {
            eprintln!("{}", f);
            print_usage(&program, opts);
            process::exit(1);
        }
    };

    if opt_matches.opt_present("h") {
        print_usage(&program, opts);
        return;
    }

    let level = match opt_matches.opt_str("log-level") {
        Some(level) => match level.parse::<LevelFilter>() {
            Ok(level) => level,
            Err(_) => {
                eprintln!("Invalid log level: {}", level);
                process::exit(1);
            }
        },
        None => LevelFilter::Info,
    };

    if let Err(e) = SimpleLogger::new().with_level(level).env().init() {
        eprintln!("Failed to initialize logger: {}", e);
        process::exit(1);
    }

    let mut config = match opt_matches.opt_str("config") {
        Some(path) => match ServerConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => fail(format!("Failed to load {}: {}", path, e)),
        },
        None => {
            log::info!("No configuration file given, serving the built-in zone");
            ServerConfig::default()
        }
    };

    if let Some(listen) = opt_matches.opt_str("listen") {
        config.listen = parse_listen(&listen).unwrap_or_else(|e| fail(e.to_string()));
    }

    if let Some(zone) = opt_matches.opt_str("zone") {
        config.zone = zone;
    }

    if let Some(threads) = opt_matches.opt_str("threads") {
        config.threads = threads
            .parse::<usize>()
            .map_err(|_| format!("Invalid thread count: {}", threads))
            .and_then(|n| check_threads(n).map_err(|e| e.to_string()))
            .unwrap_or_else(|e| fail(e));
    }

    log::info!(
        "Serving zone {} with {} records",
        config.zone,
        config.records.len()
    );

    let context = Arc::new(ServerContext::from_config(config));

    let udp_server = DnsUdpServer::new(context.clone(), context.thread_count);
    match udp_server.run_server() {
        Ok(addr) => log::info!("ApexDNS listening on {}", addr),
        Err(e) => fail(format!("Failed to bind UDP listener: {}", e)),
    }

    loop {
        thread::park();
    }
}
