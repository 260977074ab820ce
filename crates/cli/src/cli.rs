//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use x509_envelope::CertificateId;

/// Seal and open files for the holder of an X.509 certificate.
///
/// Certificates and private keys are read from `ENVELOPE_CERT_DIR`.
#[derive(Debug, Parser)]
#[command(name = "x509-envelope", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Encrypt a file for a certificate holder.
    Encrypt(Transfer),
    /// Decrypt a file sealed for a certificate whose private key is available.
    Decrypt(Transfer),
    /// List the certificates found in the certificate directory.
    List,
}

#[derive(Debug, Args)]
pub struct Transfer {
    /// SHA-256 or SHA-1 thumbprint of the recipient certificate (hex; spaces and colons allowed).
    #[arg(long, env = "ENVELOPE_CERT")]
    pub cert: CertificateId,

    /// Input file, `-` for stdin.
    #[arg(short, long, default_value = "-")]
    pub input: PathBuf,

    /// Output file, `-` for stdout.
    #[arg(short, long, default_value = "-")]
    pub output: PathBuf,
}
