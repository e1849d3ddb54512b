//! [`KeyCapability`] backed by the GnuPG command-line tool.
//!
//! Every call spawns `gpg --batch` with the payload on stdin and reads
//! the result from stdout.  Failures are classified from gpg's stderr,
//! which is forced to the C locale so the messages are predictable.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use zeroize::Zeroizing;

use super::{CapabilityError, CapabilityResult, KeyCapability};

/// Drives an installed `gpg` binary.
#[derive(Debug, Clone)]
pub struct GpgCli {
    program: PathBuf,
    homedir: Option<PathBuf>,
    armor: bool,
}

impl Default for GpgCli {
    fn default() -> Self {
        Self::new("gpg")
    }
}

impl GpgCli {
    /// Use `program` (a path or a name looked up in `$PATH`).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            homedir: None,
            armor: true,
        }
    }

    /// Use a specific GnuPG home directory instead of the default one.
    pub fn with_homedir(mut self, homedir: impl Into<PathBuf>) -> Self {
        self.homedir = Some(homedir.into());
        self
    }

    /// Emit ASCII-armored ciphertext (the default) or raw binary packets.
    pub fn with_armor(mut self, armor: bool) -> Self {
        self.armor = armor;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.env("LC_ALL", "C")
            .arg("--batch")
            .arg("--yes")
            .arg("--quiet")
            .arg("--no-tty");
        if let Some(ref home) = self.homedir {
            cmd.arg("--homedir").arg(home);
        }
        cmd
    }

    /// Spawn `cmd`, feed `input` on stdin, and collect its output.
    ///
    /// Stdin is written from a scoped thread so a chatty child can never
    /// deadlock against us on a full pipe.
    fn run(&self, mut cmd: Command, input: &[u8]) -> CapabilityResult<Output> {
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CapabilityError::Unavailable(format!(
                    "failed to launch '{}': {e}",
                    self.program.display()
                ))
            })?;

        let stdin = child.stdin.take();
        std::thread::scope(|scope| {
            if let Some(mut stdin) = stdin {
                scope.spawn(move || {
                    // A write error means gpg exited early; its status says why.
                    let _ = stdin.write_all(input);
                });
            }
            child.wait_with_output()
        })
        .map_err(|e| CapabilityError::Unavailable(format!("gpg did not complete: {e}")))
    }
}

impl KeyCapability for GpgCli {
    fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> CapabilityResult<Vec<u8>> {
        let mut cmd = self.command();
        cmd.arg("--encrypt").arg("--recipient").arg(key_id);
        if self.armor {
            cmd.arg("--armor");
        }
        cmd.arg("--output").arg("-");

        let output = self.run(cmd, plaintext)?;
        if !output.status.success() {
            return Err(classify_encrypt_failure(
                key_id,
                &String::from_utf8_lossy(&output.stderr),
            ));
        }
        if output.stdout.is_empty() {
            return Err(CapabilityError::Failed(
                "gpg produced no ciphertext".into(),
            ));
        }
        Ok(output.stdout)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> CapabilityResult<Zeroizing<Vec<u8>>> {
        let mut cmd = self.command();
        cmd.arg("--decrypt").arg("--output").arg("-");

        let output = self.run(cmd, ciphertext)?;
        let plaintext = Zeroizing::new(output.stdout);
        if !output.status.success() {
            return Err(classify_decrypt_failure(&String::from_utf8_lossy(
                &output.stderr,
            )));
        }
        Ok(plaintext)
    }

    fn validate_key(&self, key_id: &str) -> CapabilityResult<()> {
        let mut cmd = self.command();
        cmd.arg("--with-colons").arg("--list-keys").arg(key_id);

        let output = self.run(cmd, &[])?;
        if !output.status.success() {
            return Err(CapabilityError::UnknownKey(key_id.to_string()));
        }

        match key_validity(&String::from_utf8_lossy(&output.stdout), key_id) {
            Some('u') => Ok(()),
            Some(_) => Err(CapabilityError::UntrustedKey(key_id.to_string())),
            None => Err(CapabilityError::UnknownKey(key_id.to_string())),
        }
    }
}

/// Find the validity flag of the primary key matching `key_id` in
/// `gpg --with-colons --list-keys` output.
///
/// `key_id` may be a short id, long id or full fingerprint, with or
/// without a `0x` prefix; it matches when it is a suffix of the key's
/// long id or fingerprint.
fn key_validity(colons: &str, key_id: &str) -> Option<char> {
    let wanted = normalize_key_id(key_id);
    if wanted.is_empty() {
        return None;
    }

    let mut current: Option<char> = None;
    for line in colons.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.first().copied() {
            Some("pub") => {
                current = fields.get(1).and_then(|v| v.chars().next());
                let long_id = fields.get(4).copied().unwrap_or_default();
                if long_id.to_ascii_uppercase().ends_with(&wanted) {
                    return current;
                }
            }
            // The fingerprint record directly follows its key record.
            Some("fpr") => {
                let fingerprint = fields.get(9).copied().unwrap_or_default();
                if current.is_some() && fingerprint.to_ascii_uppercase().ends_with(&wanted) {
                    return current;
                }
            }
            Some("sub") => current = None,
            _ => {}
        }
    }
    None
}

fn normalize_key_id(key_id: &str) -> String {
    let trimmed = key_id.trim();
    let stripped = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    stripped.to_ascii_uppercase()
}

/// Last meaningful line of gpg's stderr, for error messages.
fn summary(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or("gpg exited with an error")
        .to_string()
}

fn classify_encrypt_failure(key_id: &str, stderr: &str) -> CapabilityError {
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("no public key") || lower.contains("not found") {
        CapabilityError::UnknownKey(key_id.to_string())
    } else if lower.contains("unusable public key")
        || lower.contains("no assurance")
        || lower.contains("revoked")
        || lower.contains("expired")
    {
        CapabilityError::UntrustedKey(key_id.to_string())
    } else {
        CapabilityError::Failed(summary(stderr))
    }
}

fn classify_decrypt_failure(stderr: &str) -> CapabilityError {
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("no secret key") {
        CapabilityError::NoPrivateKey
    } else if lower.contains("no valid openpgp data")
        || lower.contains("invalid packet")
        || lower.contains("crc error")
        || lower.contains("invalid armor")
        || lower.contains("unexpected")
    {
        CapabilityError::Corrupted(summary(stderr))
    } else {
        CapabilityError::Failed(summary(stderr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
tru::1:1481595312:0:3:1:5
pub:u:2048:1:FD318753B0336C7B:1481595312:::u:::scESC::::::23::0:
fpr:::::::::5292CCC3690AB5714DA4769EFD318753B0336C7B:
uid:u::::1481595312::A1B2C3::Autogenerated Key <mattoufoutu@sherlock>::::::::::0:
sub:u:2048:1:0123456789ABCDEF:1481595312::::::e::::::23:
fpr:::::::::AAAABBBBCCCCDDDDEEEEFFFF0123456789ABCDEF:
pub:f:4096:1:1111222233334444:1481595312:::f:::scESC::::::23::0:
fpr:::::::::99998888777766665555444433332222111122223333444:
";

    #[test]
    fn validity_matches_short_long_and_fingerprint_ids() {
        assert_eq!(key_validity(LISTING, "B0336C7B"), Some('u'));
        assert_eq!(key_validity(LISTING, "FD318753B0336C7B"), Some('u'));
        assert_eq!(
            key_validity(LISTING, "5292CCC3690AB5714DA4769EFD318753B0336C7B"),
            Some('u')
        );
    }

    #[test]
    fn validity_is_case_and_prefix_insensitive() {
        assert_eq!(key_validity(LISTING, "0xb0336c7b"), Some('u'));
    }

    #[test]
    fn validity_reports_non_ultimate_keys() {
        assert_eq!(key_validity(LISTING, "33334444"), Some('f'));
    }

    #[test]
    fn subkey_ids_do_not_match() {
        assert_eq!(key_validity(LISTING, "89ABCDEF"), None);
        assert_eq!(key_validity(LISTING, "0123456789ABCDEF"), None);
    }

    #[test]
    fn empty_or_unknown_key_id_has_no_validity() {
        assert_eq!(key_validity(LISTING, ""), None);
        assert_eq!(key_validity(LISTING, "DEADBEEF"), None);
    }

    #[test]
    fn encrypt_failures_are_classified() {
        let missing = "gpg: nobody: skipped: No public key\ngpg: [stdin]: encryption failed: No public key\n";
        assert_eq!(
            classify_encrypt_failure("nobody", missing),
            CapabilityError::UnknownKey("nobody".into())
        );

        let revoked = "gpg: ABCD: skipped: Unusable public key\n";
        assert_eq!(
            classify_encrypt_failure("ABCD", revoked),
            CapabilityError::UntrustedKey("ABCD".into())
        );

        assert!(matches!(
            classify_encrypt_failure("ABCD", "gpg: something odd\n"),
            CapabilityError::Failed(msg) if msg == "gpg: something odd"
        ));
    }

    #[test]
    fn decrypt_failures_are_classified() {
        assert_eq!(
            classify_decrypt_failure("gpg: decryption failed: No secret key\n"),
            CapabilityError::NoPrivateKey
        );
        assert!(matches!(
            classify_decrypt_failure("gpg: no valid OpenPGP data found.\ngpg: decrypt_message failed: Unknown system error\n"),
            CapabilityError::Corrupted(_)
        ));
    }

    #[test]
    fn missing_program_is_unavailable() {
        let gpg = GpgCli::new("/nonexistent/passvault-test/gpg");
        assert!(matches!(
            gpg.encrypt("ABCD", b"data"),
            Err(CapabilityError::Unavailable(_))
        ));
        assert!(matches!(
            gpg.validate_key("ABCD"),
            Err(CapabilityError::Unavailable(_))
        ));
    }
}
