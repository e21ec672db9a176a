//! Test doubles and fixtures shared by the mux crates.
//!
//! Only for tests: everything here panics on unexpected failures.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use mux_events::{AuditEvent, AuditKind, AuditSink};
use mux_topology::FailoverInit;
use pkcs8::pkcs5::pbes2;
use tempfile::TempDir;

/// Audit sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn of_kind(&self, kind: AuditKind) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.kind == kind)
            .collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Failover initializer that records every call.
#[derive(Debug, Default)]
pub struct RecordingFailover {
    calls: Mutex<Vec<usize>>,
}

impl RecordingFailover {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shard counts passed to each `init_failover` call.
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

impl FailoverInit for RecordingFailover {
    fn init_failover(&self, num_shards: usize) {
        self.calls.lock().unwrap().push(num_shards);
    }
}

/// Write a descriptor file named `tnsnames.ora` under `dir` declaring each
/// entry in `names`, one multi-line definition per entry.
pub fn write_descriptor(dir: &Path, names: &[&str]) -> PathBuf {
    let mut text = String::from("# generated for tests\n");
    for (i, name) in names.iter().enumerate() {
        text.push_str(&format!(
            "{} =\n  (DESCRIPTION =\n    (ADDRESS = (PROTOCOL = TCP)(HOST = db{})(PORT = 1521))\n    (CONNECT_DATA = (SERVICE_NAME = {}))\n  )\n\n",
            name,
            i,
            name.to_lowercase()
        ));
    }
    let path = dir.join("tnsnames.ora");
    fs::write(&path, text).unwrap();
    path
}

/// Self-signed certificate and key written to a temporary directory.
pub struct TlsFixture {
    pub dir: TempDir,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub cert_der: Vec<u8>,
    pub key_der: Vec<u8>,
}

impl TlsFixture {
    /// Generate a certificate valid for `localhost`.
    pub fn generate() -> Self {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let dir = TempDir::new().unwrap();

        let cert_path = dir.path().join("srv.crt");
        let key_path = dir.path().join("srv.key");
        fs::write(&cert_path, certified.cert.pem()).unwrap();
        fs::write(&key_path, certified.key_pair.serialize_pem()).unwrap();

        Self {
            cert_der: certified.cert.der().to_vec(),
            key_der: certified.key_pair.serialize_der(),
            dir,
            cert_path,
            key_path,
        }
    }

    /// Write the key as a PBES2-encrypted PKCS#8 block and return its path.
    pub fn write_encrypted_key(&self, passphrase: &str) -> PathBuf {
        let salt = [7u8; 16];
        let iv = [9u8; 16];
        let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(2048, &salt, &iv).unwrap();
        let info = pkcs8::PrivateKeyInfo::try_from(self.key_der.as_slice()).unwrap();
        let encrypted = info.encrypt_with_params(params, passphrase).unwrap();

        let block = pem::Pem::new("ENCRYPTED PRIVATE KEY", encrypted.as_bytes().to_vec());
        let path = self.dir.path().join("srv-encrypted.key");
        fs::write(&path, pem::encode(&block)).unwrap();
        path
    }

    /// Write arbitrary bytes next to the fixture and return the path.
    pub fn write_file(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }
}
