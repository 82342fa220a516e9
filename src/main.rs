//! # ttsched Example Firmware
//!
//! Flashes two LEDs while sending CAN messages on one port and polling for
//! them on another, all from a time-triggered schedule:
//!
//! | Task | Offset | Period | Behavior |
//! |------|--------|--------|----------|
//! | `link_led_toggle_task` | 0 | 500 | Toggle the link LED |
//! | `connect_led_toggle_task` | 100 | 500 | Toggle the connect LED |
//! | `can_write_task` | 3 | 250 | Queue one CAN frame |
//! | `can_read_task` | 5 | 100 | Poll for a received frame |
//!
//! Offsets keep the bodies on different ticks: at 1 kHz no two tasks share
//! a tick except where their periods line up (e.g. ticks 500, 1000).
//!
//! Board I/O is reduced to counters here; a board support package would
//! replace them with GPIO and CAN controller accesses.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use cortex_m_rt::entry;
use log::LevelFilter;
use panic_halt as _;

use ttsched::arch::cortex_m4::{self, SysTickSource};
use ttsched::task::TaskId;
use ttsched::timer::ms_to_ticks;
use ttsched::{kernel, logger};

// ---------------------------------------------------------------------------
// Board state
// ---------------------------------------------------------------------------

static LINK_LED: AtomicBool = AtomicBool::new(false);
static CONNECT_LED: AtomicBool = AtomicBool::new(false);
static TX_COUNT: AtomicU32 = AtomicU32::new(0);
static RX_COUNT: AtomicU32 = AtomicU32::new(0);

/// Frame last "received" by the loopback. `0` means no frame pending.
static RX_FRAME: AtomicU32 = AtomicU32::new(0);

// ---------------------------------------------------------------------------
// Task bodies
// ---------------------------------------------------------------------------

fn link_led_toggle_task() {
    LINK_LED.fetch_xor(true, Ordering::Relaxed);
}

fn connect_led_toggle_task() {
    CONNECT_LED.fetch_xor(true, Ordering::Relaxed);
}

/// Transmit the next frame; its payload is the running transmit count.
fn can_write_task() {
    let tx = TX_COUNT.load(Ordering::Relaxed).wrapping_add(1);
    // Loopback: port 1 is wired to port 2.
    RX_FRAME.store(tx, Ordering::Relaxed);
    TX_COUNT.store(tx, Ordering::Relaxed);
}

/// Poll the receive port; log a frame if one arrived.
fn can_read_task() {
    let frame = RX_FRAME.swap(0, Ordering::Relaxed);
    if frame != 0 {
        let rx = RX_COUNT.load(Ordering::Relaxed).wrapping_add(1);
        RX_COUNT.store(rx, Ordering::Relaxed);
        log::debug!("rx frame id 0x23 data {:#x} (rx {})", frame, rx);
    }
}

fn on_overrun(id: TaskId, missed: u32) {
    log::error!("task {} missed {} period(s)", id.index(), missed);
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Firmware entry point. Initializes the kernel, registers the tasks and
/// dispatches forever.
#[entry]
fn main() -> ! {
    let mut cp = cortex_m::Peripherals::take().expect("core peripherals already taken");

    // Logging is best effort: without a debugger attached, records are dropped.
    let _ = logger::init(LevelFilter::Info);

    kernel::init().expect("scheduler init failed");
    kernel::set_overrun_hook(on_overrun).expect("failed to set overrun hook");

    kernel::add_task(link_led_toggle_task, 0, ms_to_ticks(500))
        .expect("failed to add link LED task");
    kernel::add_task(connect_led_toggle_task, ms_to_ticks(100), ms_to_ticks(500))
        .expect("failed to add connect LED task");
    kernel::add_task(can_write_task, ms_to_ticks(3), ms_to_ticks(250))
        .expect("failed to add CAN write task");
    kernel::add_task(can_read_task, ms_to_ticks(5), ms_to_ticks(100))
        .expect("failed to add CAN read task");

    cortex_m4::set_interrupt_priorities(&mut cp.SCB);
    let mut systick = SysTickSource::new(cp.SYST);
    kernel::start(&mut systick).expect("scheduler start failed");

    kernel::run(cortex_m4::wait_for_tick)
}
