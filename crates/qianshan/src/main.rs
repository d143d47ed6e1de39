#![forbid(unsafe_code)]

//! Qianshan CLI — decode GM/T SM2 and legacy PFX key containers.

use clap::{Parser, Subcommand};
use qianshan_core::Error;
use qianshan_envelope::DecodeOptions;
use qianshan_keys::{loader, ContainerFormat, PrivateKeyMaterial};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(
    name = "qianshan",
    about = "Qianshan — GM/T SM2 key-container decoding (.sm2, .pfx)",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a key container and print the recovered key material
    Decode {
        /// Container file (.sm2, .pfx or .p12)
        file: PathBuf,

        /// Container password
        #[arg(short, long)]
        password: String,

        /// Override the format hint taken from the file extension
        #[arg(long)]
        format: Option<String>,

        /// Base64-decode non-canonical encrypted key blobs before decryption
        #[arg(long = "base64-ciphertext")]
        base64_ciphertext: bool,

        /// Skip the scalar-to-certificate consistency check
        #[arg(long = "no-validate")]
        no_validate: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the SM2 public key of a PEM certificate
    Cert {
        /// PEM certificate file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Decode {
            file,
            password,
            format,
            base64_ciphertext,
            no_validate,
            verbose,
        } => cmd_decode(file, password, format, base64_ciphertext, no_validate, verbose),
        Commands::Cert { file } => cmd_cert(file),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn cmd_decode(
    file: PathBuf,
    password: String,
    format: Option<String>,
    base64_ciphertext: bool,
    no_validate: bool,
    verbose: bool,
) -> Result<(), Error> {
    let options = DecodeOptions {
        decode_base64_ciphertext: base64_ciphertext,
        validate_key_pair: !no_validate,
    };

    let material = match format {
        Some(hint) => {
            let format = ContainerFormat::from_extension(&hint)?;
            let data = std::fs::read(&file)?;
            loader::load_private_key(&data, format, &password, &options)
        }
        None => loader::load_private_key_file(&file, &password, &options),
    }?;

    if verbose {
        eprintln!("Decoded: {}", file.display());
    }

    match material {
        PrivateKeyMaterial::Sm2 {
            key, certificate, ..
        } => {
            println!("SM2 private key");
            println!("  public point: {}", to_hex(&key.public_point_bytes()));
            println!("  subject:      {}", certificate.tbs_certificate.subject);
        }
        PrivateKeyMaterial::Rsa(key) => {
            use rsa::traits::PublicKeyParts;
            println!("RSA private key ({} bits)", key.size() * 8);
        }
    }

    Ok(())
}

fn cmd_cert(file: PathBuf) -> Result<(), Error> {
    use sm2::elliptic_curve::sec1::ToEncodedPoint;

    let pem = std::fs::read(&file)?;
    let public = loader::certificate_public_key_pem(&pem)?;
    let point = public.to_encoded_point(false);
    println!("SM2 public key: {}", to_hex(point.as_bytes()));
    Ok(())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
