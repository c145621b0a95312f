// Runtime configuration: where ROMs and the trace log live, and the few
// behavior knobs the command line sets. Built once at startup and threaded
// through init; nothing in the core reaches for process globals.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub base_dir: PathBuf,
    /// OS sleep between frames instead of busy-waiting.
    pub sleep_mode: bool,
    pub trace: bool,
}

impl RuntimeConfig {
    pub fn discover() -> Self {
        let base_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        RuntimeConfig { base_dir, sleep_mode: false, trace: false }
    }

    pub fn rom_path(&self, rom_dir: &str, file: &str) -> PathBuf {
        self.base_dir.join("roms").join(rom_dir).join(file)
    }

    pub fn trace_path(&self) -> PathBuf {
        self.base_dir.join("trace.bin")
    }
}
