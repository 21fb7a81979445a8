use pingora_core::server::configuration::Opt;
use pingora_core::server::Server;

use consultd::{api::ApiHttpApp, config::Config, logging};

fn main() {
    // Read command-line arguments
    let opt = Opt::parse_args();

    let config = match Config::load_yaml_with_opt_override(&opt) {
        Ok(config) => config,
        Err(e) => {
            logging::init_stderr();
            log::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let file_logger = config.log.clone().map(logging::FileLogger::new);
    match &file_logger {
        Some(logger) => logger.install(),
        None => logging::init_stderr(),
    }

    log::info!("Loaded {} user account(s)", config.users.len());
    let api_service = ApiHttpApp::api_http_service(&config);

    let mut server = Server::new_with_opt_and_conf(Some(opt), config.pingora);

    log::info!("Bootstrapping...");
    server.bootstrap();

    log::info!("Bootstrapped. Adding Services...");
    if let Some(logger) = file_logger {
        server.add_service(logger);
    }
    server.add_service(api_service);

    log::info!("Listening on {}", config.api.address);
    server.run_forever();
}
