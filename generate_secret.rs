use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use clap::Parser;
use rand::RngCore;

/// Prints a random value suitable for JWT_SECRET.
#[derive(Parser, Debug)]
#[command(name = "generate_secret")]
struct Args {
    /// Number of random bytes before encoding
    #[arg(long, default_value_t = 48)]
    bytes: usize,
}

fn main() {
    let args = Args::parse();
    if args.bytes < 32 {
        eprintln!("Refusing to generate a secret shorter than 32 bytes");
        std::process::exit(1);
    }

    let mut secret = vec![0u8; args.bytes];
    rand::thread_rng().fill_bytes(&mut secret);

    println!("JWT_SECRET={}", URL_SAFE_NO_PAD.encode(&secret));
}
