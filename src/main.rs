use file_relay::cli::{run, Args};

#[tokio::main]
async fn main() {
    let args = Args::parse_args();
    if let Err(e) = run(args).await {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}
