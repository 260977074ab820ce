//! Subcommand execution.
//!
//! File output is written to `<output>.partial` and renamed into place only
//! after the envelope operation succeeds, so a failed run never leaves a
//! half-written file under the requested name.

use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use tracing::{info, warn};
use x509_envelope::{
    decrypt_for, encrypt_for, CachingKeyProvider, DirectoryKeyProvider, EnvelopeError,
};

use crate::cli::{Command, Transfer};
use crate::config::Config;

const STDIO: &str = "-";
const PARTIAL_SUFFIX: &str = ".partial";

/// Run `command` against the certificate directory named in `cfg`.
pub fn execute(command: Command, cfg: &Config) -> Result<(), EnvelopeError> {
    let directory = DirectoryKeyProvider::open(&cfg.cert_dir)?;
    match command {
        Command::Encrypt(t) => {
            let cipher = cfg.cipher()?;
            let keys = CachingKeyProvider::new(directory);
            let n = transfer(&t, |input, output| {
                encrypt_for(&keys, &t.cert, input, output, cipher)
            })?;
            info!(cert = %t.cert, plaintext_bytes = n, output = %t.output.display(), "encrypted");
            Ok(())
        }
        Command::Decrypt(t) => {
            let cipher = cfg.cipher()?;
            let keys = CachingKeyProvider::new(directory);
            let n = transfer(&t, |input, output| {
                decrypt_for(&keys, &t.cert, input, output, cipher)
            })?;
            info!(cert = %t.cert, plaintext_bytes = n, output = %t.output.display(), "decrypted");
            Ok(())
        }
        Command::List => list(&directory, &mut io::stdout().lock()),
    }
}

/// Print one `THUMBPRINT  path` line per certificate.
fn list(directory: &DirectoryKeyProvider, out: &mut impl Write) -> Result<(), EnvelopeError> {
    for (id, path) in directory.certificates()? {
        writeln!(out, "{id}  {}", path.display())?;
    }
    out.flush()?;
    Ok(())
}

fn transfer<F>(t: &Transfer, op: F) -> Result<u64, EnvelopeError>
where
    F: FnOnce(&mut dyn Read, &mut dyn Write) -> Result<u64, EnvelopeError>,
{
    let mut input: Box<dyn Read> = if is_stdio(&t.input) {
        Box::new(io::stdin().lock())
    } else {
        Box::new(BufReader::new(File::open(&t.input)?))
    };

    if is_stdio(&t.output) {
        let mut out = BufWriter::new(io::stdout().lock());
        let n = op(&mut input, &mut out)?;
        out.flush()?;
        return Ok(n);
    }

    let partial = partial_path(&t.output);
    let mut out = BufWriter::new(File::create(&partial)?);
    let result = op(&mut input, &mut out).and_then(|n| {
        let file = out.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.sync_all()?;
        Ok(n)
    });

    match result {
        Ok(n) => {
            fs::rename(&partial, &t.output)?;
            Ok(n)
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&partial) {
                warn!(path = %partial.display(), error = %cleanup, "could not remove partial output");
            }
            Err(e)
        }
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == STDIO
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use x509_envelope::{CertificateId, ErrorKind};

    const RECIPIENT_CERT: &str = include_str!("../../envelope/testdata/recipient.crt");
    const RECIPIENT_KEY: &str = include_str!("../../envelope/testdata/recipient.key");
    const RECIPIENT_ID: &str = "96C765A4F90D9E59B5224099676CCD126BDBEB518E73B7B2C77C48FF9B2F653B";

    struct Workspace {
        certs: TempDir,
        files: TempDir,
        cfg: Config,
    }

    fn workspace(with_key: bool) -> Workspace {
        let certs = tempfile::tempdir().unwrap();
        fs::write(certs.path().join("recipient.crt"), RECIPIENT_CERT).unwrap();
        if with_key {
            fs::write(certs.path().join("recipient.key"), RECIPIENT_KEY).unwrap();
        }
        let cfg = Config {
            cert_dir: certs.path().to_path_buf(),
            algorithm: "aes".into(),
            key_size: 256,
            block_size: 128,
            log_level: "info".into(),
        };
        Workspace {
            certs,
            files: tempfile::tempdir().unwrap(),
            cfg,
        }
    }

    fn transfer_args(input: &Path, output: &Path) -> Transfer {
        Transfer {
            cert: RECIPIENT_ID.parse::<CertificateId>().unwrap(),
            input: input.to_path_buf(),
            output: output.to_path_buf(),
        }
    }

    #[test]
    fn encrypt_then_decrypt_files() {
        let ws = workspace(true);
        let plain = ws.files.path().join("name.txt");
        let sealed = ws.files.path().join("name.txt.env");
        let opened = ws.files.path().join("name.out.txt");
        fs::write(&plain, "JoyGeorgeKunjikkuru").unwrap();

        execute(Command::Encrypt(transfer_args(&plain, &sealed)), &ws.cfg).unwrap();
        assert_eq!(fs::metadata(&sealed).unwrap().len(), 552);
        assert!(!partial_path(&sealed).exists());

        execute(Command::Decrypt(transfer_args(&sealed, &opened)), &ws.cfg).unwrap();
        assert_eq!(fs::read_to_string(&opened).unwrap(), "JoyGeorgeKunjikkuru");
    }

    #[test]
    fn decrypt_does_not_need_sender_key_size() {
        let mut ws = workspace(true);
        let plain = ws.files.path().join("small.txt");
        let sealed = ws.files.path().join("small.env");
        let opened = ws.files.path().join("small.out");
        fs::write(&plain, "sealed with aes-128").unwrap();

        ws.cfg.key_size = 128;
        execute(Command::Encrypt(transfer_args(&plain, &sealed)), &ws.cfg).unwrap();
        ws.cfg.key_size = 256;
        execute(Command::Decrypt(transfer_args(&sealed, &opened)), &ws.cfg).unwrap();
        assert_eq!(fs::read_to_string(&opened).unwrap(), "sealed with aes-128");
    }

    #[test]
    fn failed_decrypt_leaves_no_output() {
        let ws = workspace(true);
        let bogus = ws.files.path().join("bogus.env");
        let opened = ws.files.path().join("bogus.txt");
        fs::write(&bogus, 9000i32.to_le_bytes()).unwrap();

        let err = execute(Command::Decrypt(transfer_args(&bogus, &opened)), &ws.cfg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FramingViolation);
        assert!(!opened.exists());
        assert!(!partial_path(&opened).exists());
    }

    #[test]
    fn decrypt_without_private_key_is_key_access_error() {
        let ws = workspace(false);
        let plain = ws.files.path().join("a.txt");
        let sealed = ws.files.path().join("a.env");
        let opened = ws.files.path().join("a.out");
        fs::write(&plain, "A").unwrap();

        execute(Command::Encrypt(transfer_args(&plain, &sealed)), &ws.cfg).unwrap();
        assert_eq!(fs::metadata(&sealed).unwrap().len(), 536);

        let err = execute(Command::Decrypt(transfer_args(&sealed, &opened)), &ws.cfg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyAccessError);
        assert_eq!(err.exit_code(), 5);
        assert!(!opened.exists());
    }

    #[test]
    fn missing_input_is_io_error() {
        let ws = workspace(true);
        let err = execute(
            Command::Encrypt(transfer_args(
                &ws.files.path().join("absent"),
                &ws.files.path().join("absent.env"),
            )),
            &ws.cfg,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn missing_cert_dir_is_argument_error() {
        let mut ws = workspace(true);
        ws.cfg.cert_dir = ws.certs.path().join("nope");
        let err = execute(Command::List, &ws.cfg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentInvalid);
    }

    #[test]
    fn list_prints_thumbprint_and_path() {
        let ws = workspace(true);
        let directory = DirectoryKeyProvider::open(ws.certs.path()).unwrap();
        let mut out = Vec::new();
        list(&directory, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with(RECIPIENT_ID));
        assert!(text.trim_end().ends_with("recipient.crt"));
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/tmp/report.env")),
            PathBuf::from("/tmp/report.env.partial")
        );
        assert!(is_stdio(Path::new("-")));
        assert!(!is_stdio(Path::new("./-")));
    }
}
