mod cartridge;
mod cpu;
mod error;
mod gb;
mod interrupts;
mod joypad;
mod mmu;
mod ppu;
mod timer;

use std::time::Duration;

use clap::{Arg, ArgAction, Command};
use log::{error, info, warn};
use minifb::{Key, Window, WindowOptions};

use joypad::ButtonState;
use ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Map a DMG 2-bit shade index to an ARGB32 pixel for `minifb`.
fn shade_to_argb(shade: u8) -> u32 {
    match shade & 0x03 {
        0 => 0xFFFFFFFF,
        1 => 0xFFAAAAAA,
        2 => 0xFF555555,
        3 => 0xFF000000,
        _ => unreachable!(),
    }
}

fn read_keys(window: &Window) -> ButtonState {
    ButtonState {
        right: window.is_key_down(Key::Right),
        left: window.is_key_down(Key::Left),
        up: window.is_key_down(Key::Up),
        down: window.is_key_down(Key::Down),
        a: window.is_key_down(Key::X),
        b: window.is_key_down(Key::Z),
        select: window.is_key_down(Key::RightShift),
        start: window.is_key_down(Key::Enter),
    }
}

fn main() {
    env_logger::init();
    info!("ferrum starting up");

    let matches = Command::new("ferrum")
        .version("0.1.0")
        .author("m0x <https://github.com/m0xsec/ferrum>")
        .about("A Gameboy emulator written in Rust.")
        .arg(
            Arg::new("testing")
                .short('t')
                .long("testing")
                .help("Enables testing mode.")
                .action(ArgAction::SetTrue)
                .default_value("false"),
        )
        .arg(
            Arg::new("rom")
                .short('r')
                .long("rom")
                .value_name("FILE")
                .help("Sets the ROM file to load.")
                .required(true),
        )
        .arg(
            Arg::new("boot-rom")
                .long("boot-rom")
                .value_name("FILE")
                .help("Sets the 256-byte DMG boot ROM to load. If omitted, execution starts from the documented post-boot register values."),
        )
        .arg(
            Arg::new("save")
                .long("save")
                .value_name("FILE")
                .help("Battery RAM save path: loaded at startup if present, written back at clean shutdown."),
        )
        .arg(
            Arg::new("scale")
                .long("scale")
                .value_name("N")
                .help("Integer framebuffer scale factor for the window.")
                .default_value("3"),
        )
        .arg_required_else_help(true)
        .get_matches();

    let testing = matches.get_flag("testing");
    let rom_path = matches.get_one::<String>("rom").unwrap();
    let boot_rom_path = matches.get_one::<String>("boot-rom").map(String::as_str);
    let save_path = matches.get_one::<String>("save").map(String::as_str);
    let scale: usize = matches
        .get_one::<String>("scale")
        .unwrap()
        .parse()
        .unwrap_or(3);

    if testing {
        warn!("testing mode enabled: the boot ROM is skipped regardless of --boot-rom");
    }
    let boot_rom_path = if testing { None } else { boot_rom_path };

    let (mut console, title) = match gb::load(rom_path, boot_rom_path, save_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("failed to load {rom_path}: {e}");
            std::process::exit(1);
        }
    };
    info!("loaded \"{title}\"");

    let mut window = Window::new(
        &format!("ferrum - {title}"),
        SCREEN_WIDTH * scale.max(1),
        SCREEN_HEIGHT * scale.max(1),
        WindowOptions::default(),
    )
    .expect("failed to open display window");
    window.limit_update_rate(Some(Duration::from_micros(16_600)));

    let mut argb_buffer = vec![0u32; SCREEN_WIDTH * SCREEN_HEIGHT];
    while window.is_open() && !window.is_key_down(Key::Escape) {
        console.set_buttons(read_keys(&window));

        let frame = match console.run_until_frame() {
            Ok(frame) => frame,
            Err(e) => {
                gb::report_decode_error(&e);
                break;
            }
        };

        for (dst, &shade) in argb_buffer.iter_mut().zip(frame.iter()) {
            *dst = shade_to_argb(shade);
        }
        window
            .update_with_buffer(&argb_buffer, SCREEN_WIDTH, SCREEN_HEIGHT)
            .expect("failed to present framebuffer");
    }

    if let Some(path) = save_path {
        let ram = console.save_ram();
        if !ram.is_empty() {
            if let Err(e) = std::fs::write(path, &ram) {
                error!("failed to write save RAM to {path}: {e}");
            } else {
                info!("saved battery RAM to {path}");
            }
        }
    }
}
