//! Boots the kernel against the bundled reference harness, runs a couple of
//! processes to completion, and prints the resulting metrics report.

use sosim_core::config::Config;
use sosim_core::irq::IrqKind;
use sosim_core::kernel::{DispatchAction, Kernel};
use sosim_core::sim::{FakeBus, FlatMemory, ImageLoader};

fn main() {
    let mut mem = FlatMemory::new();
    let mut io = FakeBus::new();
    let mut loader = ImageLoader::new();
    loader.register("init.maq", 100, &[0; 4]);

    let mut kernel = Kernel::new(Config::default());

    match kernel.handle_interrupt(IrqKind::Reset, &mut mem, &mut io, &loader) {
        Ok(_) => {}
        Err(err) => eprintln!("reset failed: {}", err),
    }

    // init.maq never calls kill, so nothing here ever dies; this loop exists
    // only to show a few timer ticks accumulating metrics before reporting.
    for _ in 0..5 {
        io.advance(50);
        match kernel.handle_interrupt(IrqKind::Timer, &mut mem, &mut io, &loader) {
            Ok(DispatchAction::Halt) => break,
            Ok(DispatchAction::Resume) => {}
            Err(err) => {
                eprintln!("kernel halted abnormally: {}", err);
                break;
            }
        }
    }

    println!("{}", sosim_core::metrics::render(kernel.metrics(), kernel.table()));
}
