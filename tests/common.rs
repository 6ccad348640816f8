use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;
use zip::write::FileOptions;

pub const PLATFORM: &str = "testos";
pub const EXE_NAME: &str = "kryer";

// Not every test binary uses every helper.
#[allow(dead_code)]
pub struct TestContext {
    pub _temp_dir: TempDir,
    pub config_path: PathBuf,
    pub install_root: PathBuf,
    pub path_profile: PathBuf,
    pub bin_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.json");
        let install_root = temp_dir.path().join("Kryer");
        let path_profile = temp_dir.path().join("profile.d").join("kryer.sh");

        let bin_path = PathBuf::from(env!("CARGO_BIN_EXE_kryer-installer"));

        Self {
            _temp_dir: temp_dir,
            config_path,
            install_root,
            path_profile,
            bin_path,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        cmd.arg("--no-pause");
        cmd.env("KRYER_INSTALLER_CONFIG", &self.config_path);
        cmd.env("KRYER_INSTALL_ROOT", &self.install_root);
        cmd.env("KRYER_PATH_PROFILE", &self.path_profile);
        cmd.env("KRYER_PLATFORM", PLATFORM);
        cmd.env("KRYER_EXE_NAME", EXE_NAME);
        cmd.env_remove("GITHUB_TOKEN");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    pub fn executable(&self) -> PathBuf {
        self.install_root.join(EXE_NAME)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.install_root.join("tmp")
    }

    /// Run `cmd`, feeding `input` on stdin.
    pub fn run_with_input(&self, mut cmd: Command, input: &str) -> CommandOutput {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = cmd.spawn().expect("Failed to run kryer-installer");
        child
            .stdin
            .take()
            .expect("stdin was piped")
            .write_all(input.as_bytes())
            .expect("Failed to write stdin");
        child
            .wait_with_output()
            .expect("Failed to wait for kryer-installer")
            .into()
    }
}

/// Zip with a single `<base_name>/kryer` entry. Byte-for-byte reproducible
/// so tests can recompute its digest.
#[allow(dead_code)]
pub fn release_archive(base_name: &str, binary: &[u8]) -> Vec<u8> {
    let options = FileOptions::default().last_modified_time(zip::DateTime::default());
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(format!("{}/{}", base_name, EXE_NAME), options)
        .expect("Failed to start zip entry");
    writer.write_all(binary).expect("Failed to write zip entry");
    writer
        .finish()
        .expect("Failed to finish zip")
        .into_inner()
}

#[allow(dead_code)]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Register the release, archive and checksum endpoints on `server`.
///
/// `checksum` overrides the published digest.
#[allow(dead_code)]
pub fn serve_release(
    server: &mut mockito::ServerGuard,
    binary: &[u8],
    checksum: Option<&str>,
) -> Vec<mockito::Mock> {
    let base_name = format!("kryer-{}-amd64", PLATFORM);
    let archive = release_archive(&base_name, binary);
    let digest = sha256_hex(&archive);
    let checksum = checksum.unwrap_or(&digest).to_string();
    let base = server.url();

    let release = format!(
        r#"{{
            "assets_url": "{base}/repos/cfschilham/kryer/releases/7/assets",
            "tag_name": "v0.3.0",
            "assets": [
                {{"name": "{base_name}.zip", "browser_download_url": "{base}/dl/{base_name}.zip"}},
                {{"name": "{base_name}.sha256", "browser_download_url": "{base}/dl/{base_name}.sha256"}}
            ]
        }}"#
    );

    vec![
        server
            .mock("GET", "/repos/cfschilham/kryer/releases/latest")
            .with_status(200)
            .with_body(release)
            .create(),
        server
            .mock("GET", format!("/dl/{}.zip", base_name).as_str())
            .with_status(200)
            .with_body(archive)
            .create(),
        server
            .mock("GET", format!("/dl/{}.sha256", base_name).as_str())
            .with_status(200)
            .with_body(format!("{} {}.zip\n", checksum, base_name))
            .create(),
    ]
}

#[allow(dead_code)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}

#[allow(dead_code)]
impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        if !self.status.success() {
            panic!(
                "Command failed with status {:?}\nstdout: {}\nstderr: {}",
                self.status.code(),
                self.stdout,
                self.stderr
            );
        }
        self
    }

    pub fn assert_exit_code(&self, code: i32) -> &Self {
        assert_eq!(
            self.status.code(),
            Some(code),
            "Unexpected exit status\nstdout: {}\nstderr: {}",
            self.stdout,
            self.stderr
        );
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Stdout did not contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Stderr did not contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}
