use std::path::PathBuf;
use std::process;

use log::error;
use structopt::StructOpt;

use em65xx::paths::RuntimeConfig;
use em65xx::platforms::{platform_by_id, Configuration};
use em65xx::Emulator;

#[derive(Debug, StructOpt)]
#[structopt(name = "myapple", about = "Apple II family emulator")]
struct Opt {
    /// Platform id (II=0, II+=1, IIe=2, IIe enhanced=3, IIgs=5)
    #[structopt(short = "p", default_value = "1")]
    platform: i32,

    /// Mount a disk image: s<slot>d<drive>=<path>, e.g. s6d1=dos33.dsk
    #[structopt(short = "d")]
    disks: Vec<String>,

    /// Use OS sleep between frames instead of busy-waiting
    #[structopt(short = "s")]
    sleep: bool,

    /// Record an instruction trace, saved to trace.bin on exit
    #[structopt(long)]
    trace: bool,
}

fn parse_disk_spec(spec: &str) -> Option<(u8, usize, PathBuf)> {
    // s<N>d<M>=<path>
    let rest = spec.strip_prefix('s')?;
    let d_at = rest.find('d')?;
    let slot: u8 = rest[..d_at].parse().ok()?;
    let rest = &rest[d_at + 1..];
    let eq_at = rest.find('=')?;
    let drive: usize = rest[..eq_at].parse().ok()?;
    if drive < 1 || drive > 2 {
        return None;
    }
    Some((slot, drive - 1, PathBuf::from(&rest[eq_at + 1..])))
}

fn main() {
    env_logger::init();
    let opt = Opt::from_args();

    let mut runtime = RuntimeConfig::discover();
    runtime.sleep_mode = opt.sleep;
    runtime.trace = opt.trace;

    let platform = match platform_by_id(opt.platform) {
        Ok(platform) => platform,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    let config = match Configuration::load(platform, &runtime) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    let mut emulator = match Emulator::new(config, runtime) {
        Ok(emulator) => emulator,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    for spec in &opt.disks {
        match parse_disk_spec(spec) {
            Some((slot, drive, path)) => {
                if slot != em65xx::platforms::DISK_SLOT {
                    error!("only slot {} carries a disk controller", em65xx::platforms::DISK_SLOT);
                    process::exit(1);
                }
                emulator.machine.mount_disk(drive, &path);
            }
            None => {
                error!("bad disk spec {:?}; expected s<N>d<M>=<path>", spec);
                process::exit(1);
            }
        }
    }

    emulator.run();
}
