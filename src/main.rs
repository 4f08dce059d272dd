use clap::Parser;

use ftclient::cli::CLI;
use ftclient::client::{ClientConfig, FileTransferClient};

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = CLI::parse();

    let invocation = match cli.invocation() {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(e.exit_code());
        }
    };
    let config = ClientConfig {
        download_dir: cli.dir,
        on_conflict: cli.on_conflict,
    };

    match FileTransferClient::new(invocation, config).run().await {
        Ok(report) => println!("{}", report),
        Err(e) => {
            log::error!("Run failed: {:?}", e);
            eprintln!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}
