//! Shell script standing in for the real executable.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Builder for a fake yt-dlp script.
///
/// The script records each invocation's arguments, one line per call, in
/// `invocations.log` next to itself, then acts on its mode:
/// - `--version` and `-U` print fixed text
/// - `--print` prints a filename
/// - `-J` prints `metadata.json`, or `playlist.json` with `--flat-playlist`
/// - `--wait-for-video` prints `livestream.txt`, then sleeps if asked to
/// - anything else emits templated progress lines like a download
#[derive(Debug, Clone)]
pub struct FakeYtDlp {
    dir: PathBuf,
    start_delay: Duration,
    step_delay: Duration,
    emit_progress: bool,
    emit_filepath: bool,
    exit_code: i32,
    livestream_hold: Duration,
}

impl FakeYtDlp {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            start_delay: Duration::ZERO,
            step_delay: Duration::from_millis(50),
            emit_progress: true,
            emit_filepath: true,
            exit_code: 0,
            livestream_hold: Duration::ZERO,
        }
    }

    /// Sleep before the first output line.
    pub fn start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Sleep between progress lines.
    pub fn step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn emit_progress(mut self, emit: bool) -> Self {
        self.emit_progress = emit;
        self
    }

    /// Whether downloads report their final path themselves.
    pub fn emit_filepath(mut self, emit: bool) -> Self {
        self.emit_filepath = emit;
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Keep the livestream probe running after its output.
    pub fn livestream_hold(mut self, hold: Duration) -> Self {
        self.livestream_hold = hold;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn script_path(&self) -> PathBuf {
        self.dir.join("yt-dlp")
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join("invocations.log")
    }

    /// Path a download reports through the postprocess template.
    pub fn reported_file(&self) -> PathBuf {
        self.dir.join("downloaded.mp4")
    }

    /// Path printed in `--print filename` mode.
    pub fn printed_file(&self) -> PathBuf {
        self.dir.join("printed.mp4")
    }

    pub fn set_metadata(&self, json: &str) -> io::Result<()> {
        std::fs::write(self.dir.join("metadata.json"), json)
    }

    pub fn set_playlist(&self, json: &str) -> io::Result<()> {
        std::fs::write(self.dir.join("playlist.json"), json)
    }

    pub fn set_livestream_output(&self, output: &str) -> io::Result<()> {
        std::fs::write(self.dir.join("livestream.txt"), output)
    }

    /// Every recorded invocation.
    pub fn invocations(&self) -> Vec<String> {
        std::fs::read_to_string(self.log_path())
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn secs(duration: Duration) -> String {
        format!("{:.3}", duration.as_secs_f64())
    }

    fn render(&self) -> String {
        let dir = self.dir.display();
        let mut download = String::new();
        download.push_str(&format!("  sleep {}\n", Self::secs(self.start_delay)));
        download.push_str("  echo '[youtube] fake: Downloading webpage'\n");
        download.push_str("  echo 'WARNING: fake warning' >&2\n");
        if self.emit_progress {
            download.push_str(
                "  echo '{\"eta\":3,\"percentage\":\"  25.0%\",\"speed\":1024.5}'\n",
            );
            download.push_str(&format!("  sleep {}\n", Self::secs(self.step_delay)));
            download
                .push_str("  echo '{\"eta\":NA,\"percentage\":\" 75.0%\",\"speed\":NA}'\n");
            download.push_str(&format!("  sleep {}\n", Self::secs(self.step_delay)));
        }
        if self.emit_filepath {
            download.push_str(&format!(
                "  echo '{{\"filepath\":\"{}\"}}'\n",
                self.reported_file().display()
            ));
        }
        download.push_str(&format!("  exit {}\n", self.exit_code));

        format!(
            r#"#!/bin/sh
printf '%s\n' "$*" >> "{dir}/invocations.log"
mode=download
for arg in "$@"; do
  case "$arg" in
    --version) mode=version ;;
    -U) mode=update ;;
    --print) mode=print ;;
    --flat-playlist) mode=playlist ;;
    --wait-for-video) mode=wait ;;
    -J) if [ "$mode" = download ]; then mode=dump; fi ;;
  esac
done
case "$mode" in
  version)
    echo '2024.01.01'
    exit 0 ;;
  update)
    echo 'Latest version: 2024.01.01, yt-dlp is up to date'
    exit 0 ;;
  print)
    echo '{printed}'
    exit 0 ;;
  dump)
    if [ -f "{dir}/metadata.json" ]; then cat "{dir}/metadata.json"; exit 0; fi
    echo 'ERROR: no metadata' >&2
    exit 1 ;;
  playlist)
    if [ -f "{dir}/playlist.json" ]; then cat "{dir}/playlist.json"; exit 0; fi
    echo 'ERROR: no playlist' >&2
    exit 1 ;;
  wait)
    if [ -f "{dir}/livestream.txt" ]; then cat "{dir}/livestream.txt"; fi
    sleep {hold}
    exit 0 ;;
esac
{download}"#,
            dir = dir,
            printed = self.printed_file().display(),
            hold = Self::secs(self.livestream_hold),
            download = download,
        )
    }

    /// Write the script and make it executable. Returns its path.
    #[cfg(unix)]
    pub fn install(&self) -> io::Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        std::fs::create_dir_all(&self.dir)?;
        let path = self.script_path();
        let staging = self.dir.join(".yt-dlp.partial");
        std::fs::write(&staging, self.render())?;
        std::fs::set_permissions(&staging, std::fs::Permissions::from_mode(0o755))?;
        std::fs::rename(&staging, &path)?;
        Ok(path)
    }
}
