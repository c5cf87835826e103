//! Key creation tool. Commands are intentionally small and auditable so
//! operators can see exactly how keys and secrets are handled.

use std::env;

use coffre::{create_random_key, decrypt_string, encrypt_string};

fn print_usage() {
    eprintln!(
        "Commands:\n  new-key\n  encrypt <key> <plaintext>\n  decrypt <key> <cipher-text>"
    );
}

fn main() {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        // Generating a key is the common case; make it the default.
        None | Some("new-key") => {
            println!("{}", create_random_key());
        }
        Some("encrypt") => {
            if args.len() != 4 {
                return print_usage();
            }
            match encrypt_string(&args[3], &args[2]) {
                Ok(cipher) => println!("{cipher}"),
                Err(err) => eprintln!("encryption failed: {err}"),
            }
        }
        Some("decrypt") => {
            if args.len() != 4 {
                return print_usage();
            }
            match decrypt_string(&args[3], &args[2]) {
                Ok(text) => println!("{text}"),
                Err(err) => eprintln!("decryption failed: {err}"),
            }
        }
        _ => print_usage(),
    }
}
