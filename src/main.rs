extern crate log;
extern crate pretty_env_logger;

use log::{error, info, warn};
use std::env;
use std::fs;
use tms99105sim::flow::FlowState;
use tms99105sim::Simulation;

fn main() {
    pretty_env_logger::init();

    let path = env::args()
        .nth(1)
        .expect("usage: tms99105sim <file.asm|file.bin>");

    let mut sim = Simulation::new();
    load_program(&mut sim, &path);

    info!(target: "main", "Starting emulation...");
    loop {
        sim.step_instruction();
        if sim.flow_state() == FlowState::Error {
            error!(
                target: "main",
                "halted at pc={:#06x}: {:?}",
                sim.pc(),
                sim.last_error()
            );
            break;
        }
        info!(
            target: "main",
            "pc={:#06x} wp={:#06x} {}",
            sim.pc(),
            sim.wp(),
            sim.current_mnemonic().unwrap_or("?"),
        );
    }
}

/// `.bin` paths are loaded as a raw byte image; anything else is assembled
/// from TI-style source text first.
fn load_program(sim: &mut Simulation, path: &str) {
    if path.ends_with(".bin") {
        let image = fs::read(path).expect("could not read image file");
        info!(target: "main", "Loaded raw image from {:?} ({} bytes)", path, image.len());
        sim.load_bytes(&image);
        return;
    }

    let source = fs::read_to_string(path).expect("could not read source file");
    let out = sim.assemble(&source);
    for err in &out.errors {
        warn!(target: "main", "assembler: {:?}", err);
    }
    info!(target: "main", "Assembled {:?} ({} errors)", path, out.errors.len());
    sim.load_bytes(&out.image);
}
