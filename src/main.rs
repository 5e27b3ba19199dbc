//! Minimal operator CLI for the MedSafe cryptographic core. Commands are
//! intentionally small and auditable so operators can see exactly how key
//! material and clinical fields are handled.

use std::env;

use medsafe_crypto::crypto::classic::{caesar, vigenere};
use medsafe_crypto::crypto::fields::{EncryptedField, RecordCipher};
use medsafe_crypto::crypto::integrity::digest_clinical_record;
use medsafe_crypto::crypto::keys::{generate_key_pair, DEFAULT_KEY_SIZE};
use medsafe_crypto::crypto::passwords::{hash_password, verify_password, DEFAULT_WORK_FACTOR};
use medsafe_crypto::service::generate_master_key;

fn print_usage() {
    eprintln!(
        "Commands:\n  generate-master-key\n  hash-password <plaintext> [work-factor]\n  verify-password <plaintext> <bcrypt-hash>\n  encrypt-field <env_var_with_base64_key> <plaintext>\n  decrypt-field <env_var_with_base64_key> <json-envelope>\n  digest-record <symptoms> <diagnosis> <treatment> <notes> <visit-date>\n  generate-keypair [bits]\n  caesar <shift> <text>\n  vigenere <encrypt|decrypt> <key> <text>"
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "generate-master-key" => {
            println!("{}", generate_master_key());
        }
        "hash-password" => {
            if args.len() < 3 || args.len() > 4 {
                return print_usage();
            }
            let work_factor = match args.get(3) {
                Some(raw) => match raw.parse::<u32>() {
                    Ok(value) => value,
                    Err(_) => return eprintln!("invalid work factor: {raw}"),
                },
                None => DEFAULT_WORK_FACTOR,
            };
            match hash_password(&args[2], work_factor) {
                Ok(hash) => println!("{hash}"),
                Err(err) => eprintln!("hashing failed: {err}"),
            }
        }
        "verify-password" => {
            if args.len() != 4 {
                return print_usage();
            }
            let matches = verify_password(&args[2], &args[3]);
            println!("{}", if matches { "match" } else { "no-match" });
        }
        "encrypt-field" => {
            if args.len() != 4 {
                return print_usage();
            }
            let cipher = match RecordCipher::from_env_var(&args[2]) {
                Ok(c) => c,
                Err(e) => return eprintln!("cipher setup failed: {e}"),
            };
            let field = cipher.encrypt(&args[3], None);
            println!("{}", serde_json::to_string_pretty(&field).unwrap());
        }
        "decrypt-field" => {
            if args.len() != 4 {
                return print_usage();
            }
            let cipher = match RecordCipher::from_env_var(&args[2]) {
                Ok(c) => c,
                Err(e) => return eprintln!("cipher setup failed: {e}"),
            };
            let envelope: EncryptedField = match serde_json::from_str(&args[3]) {
                Ok(env) => env,
                Err(err) => return eprintln!("invalid envelope json: {err}"),
            };
            match cipher.decrypt(&envelope.ciphertext, &envelope.iv) {
                Ok(text) => println!("{text}"),
                Err(err) => eprintln!("decryption failed: {err}"),
            }
        }
        "digest-record" => {
            if args.len() != 7 {
                return print_usage();
            }
            println!(
                "{}",
                digest_clinical_record(&args[2], &args[3], &args[4], &args[5], &args[6])
            );
        }
        "generate-keypair" => {
            let bits = match args.get(2) {
                Some(raw) => match raw.parse::<usize>() {
                    Ok(value) => value,
                    Err(_) => return eprintln!("invalid key size: {raw}"),
                },
                None => DEFAULT_KEY_SIZE,
            };
            match generate_key_pair(bits) {
                Ok(pair) => {
                    println!("{}", pair.public_pem);
                    println!("{}", pair.private_pem);
                }
                Err(err) => eprintln!("key generation failed: {err}"),
            }
        }
        "caesar" => {
            if args.len() != 4 {
                return print_usage();
            }
            let shift = match args[2].parse::<i32>() {
                Ok(value) => value,
                Err(_) => return eprintln!("invalid shift: {}", args[2]),
            };
            println!("{}", caesar(&args[3], shift));
        }
        "vigenere" => {
            if args.len() != 5 {
                return print_usage();
            }
            let decrypt = match args[2].as_str() {
                "encrypt" => false,
                "decrypt" => true,
                other => return eprintln!("expected encrypt or decrypt, got {other}"),
            };
            match vigenere(&args[4], &args[3], decrypt) {
                Ok(text) => println!("{text}"),
                Err(err) => eprintln!("vigenere failed: {err}"),
            }
        }
        _ => print_usage(),
    }
}
